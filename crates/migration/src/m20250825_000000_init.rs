//! Initial schema migration - creates all tables from scratch.
//!
//! - `users`: API operators
//! - `counterparties`: buyers and sellers, told apart by `kind`
//! - `milk_entries`: milk purchases (buyer) and sales (seller)
//! - `payments`: buyer and seller payments
//! - `ledger_entries`: the income and expense books
//!
//! Money is stored in minor units, quantities in thousandths of a litre and
//! fat in hundredths of a percent, all as `BIGINT`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Password,
    CreatedAt,
}

#[derive(Iden)]
enum Counterparties {
    Table,
    Id,
    Kind,
    FullName,
    MobileNumber,
    City,
    CreatedAt,
    IsDeleted,
}

#[derive(Iden)]
enum MilkEntries {
    Table,
    Id,
    Kind,
    CounterpartyId,
    CounterpartyName,
    MilkType,
    PriceMinor,
    QuantityMilli,
    FatCenti,
    TotalAmountMinor,
    Date,
    CreatedAt,
    IsDeleted,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    Kind,
    CounterpartyId,
    CounterpartyName,
    AmountMinor,
    PaymentType,
    PaymentMethod,
    TransactionRef,
    Notes,
    Date,
    CreatedAt,
    IsDeleted,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    Kind,
    AmountMinor,
    Description,
    Party,
    Category,
    Date,
    MilkEntryId,
    CreatedAt,
    IsDeleted,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Counterparties
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Counterparties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Counterparties::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Counterparties::Kind).string().not_null())
                    .col(ColumnDef::new(Counterparties::FullName).string().not_null())
                    .col(
                        ColumnDef::new(Counterparties::MobileNumber)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Counterparties::City).string().not_null())
                    .col(
                        ColumnDef::new(Counterparties::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Counterparties::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // Uniqueness among live rows is checked by the engine: a plain unique
        // index would also cover soft-deleted rows.
        manager
            .create_index(
                Index::create()
                    .name("idx-counterparties-kind-mobile_number")
                    .table(Counterparties::Table)
                    .col(Counterparties::Kind)
                    .col(Counterparties::MobileNumber)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Milk entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(MilkEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MilkEntries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MilkEntries::Kind).string().not_null())
                    .col(
                        ColumnDef::new(MilkEntries::CounterpartyId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MilkEntries::CounterpartyName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MilkEntries::MilkType).string().not_null())
                    .col(
                        ColumnDef::new(MilkEntries::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MilkEntries::QuantityMilli)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MilkEntries::FatCenti).big_integer().not_null())
                    .col(
                        ColumnDef::new(MilkEntries::TotalAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MilkEntries::Date).date().not_null())
                    .col(
                        ColumnDef::new(MilkEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MilkEntries::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-milk_entries-counterparty_id")
                            .from(MilkEntries::Table, MilkEntries::CounterpartyId)
                            .to(Counterparties::Table, Counterparties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-milk_entries-kind-date")
                    .table(MilkEntries::Table)
                    .col(MilkEntries::Kind)
                    .col(MilkEntries::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-milk_entries-counterparty_id")
                    .table(MilkEntries::Table)
                    .col(MilkEntries::CounterpartyId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Payments::CounterpartyId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payments::CounterpartyName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Payments::PaymentType).string().not_null())
                    .col(ColumnDef::new(Payments::PaymentMethod).string().not_null())
                    .col(ColumnDef::new(Payments::TransactionRef).string())
                    .col(ColumnDef::new(Payments::Notes).text())
                    .col(ColumnDef::new(Payments::Date).date().not_null())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payments::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-counterparty_id")
                            .from(Payments::Table, Payments::CounterpartyId)
                            .to(Counterparties::Table, Counterparties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-kind-counterparty_id")
                    .table(Payments::Table)
                    .col(Payments::Kind)
                    .col(Payments::CounterpartyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-kind-date")
                    .table(Payments::Table)
                    .col(Payments::Kind)
                    .col(Payments::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Ledger entries (income + expense)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Kind).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Description).text().not_null())
                    .col(ColumnDef::new(LedgerEntries::Party).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::Category)
                            .string()
                            .not_null()
                            .default("other"),
                    )
                    .col(ColumnDef::new(LedgerEntries::Date).date().not_null())
                    .col(ColumnDef::new(LedgerEntries::MilkEntryId).big_integer())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-milk_entry_id")
                            .from(LedgerEntries::Table, LedgerEntries::MilkEntryId)
                            .to(MilkEntries::Table, MilkEntries::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-kind-date")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::Kind)
                    .col(LedgerEntries::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-milk_entry_id")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::MilkEntryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MilkEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Counterparties::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
