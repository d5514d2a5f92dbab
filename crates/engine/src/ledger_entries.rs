//! The module contains the `LedgerEntry` record backing both the income and
//! the expense books.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

use crate::{EngineError, LedgerKind, Money};

/// An income or expense row.
///
/// `party` is the income source or the expense payee. `milk_entry_id` links
/// rows posted automatically from a milk sale or purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i64,
    pub kind: LedgerKind,
    pub amount: Money,
    pub description: String,
    pub party: String,
    pub category: String,
    pub date: NaiveDate,
    pub milk_entry_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub kind: String,
    pub amount_minor: i64,
    pub description: String,
    pub party: String,
    pub category: String,
    pub date: Date,
    pub milk_entry_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::milk_entries::Entity",
        from = "Column::MilkEntryId",
        to = "super::milk_entries::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    MilkEntries,
}

impl Related<super::milk_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MilkEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            kind: LedgerKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            description: model.description,
            party: model.party,
            category: model.category,
            date: model.date,
            milk_entry_id: model.milk_entry_id,
            created_at: model.created_at,
        })
    }
}
