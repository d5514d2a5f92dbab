//! The module contains the `MilkEntry` record: a milk purchase from a buyer or
//! a milk sale to a seller.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

use crate::{
    Counterparty, CounterpartyKind, EngineError, FatPercentage, MilkType, Money, Quantity,
};

/// One milk transaction.
///
/// `counterparty_name` is a snapshot taken at creation and refreshed when the
/// entry is re-pointed to another counterparty. `total_amount` is always
/// `price * quantity`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilkEntry {
    pub id: i64,
    pub kind: CounterpartyKind,
    pub counterparty_id: i64,
    pub counterparty_name: String,
    pub milk_type: MilkType,
    pub price: Money,
    pub quantity: Quantity,
    pub fat: FatPercentage,
    pub total_amount: Money,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Populated only when details were requested.
    pub counterparty: Option<Counterparty>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "milk_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub kind: String,
    pub counterparty_id: i64,
    pub counterparty_name: String,
    pub milk_type: String,
    pub price_minor: i64,
    pub quantity_milli: i64,
    pub fat_centi: i64,
    pub total_amount_minor: i64,
    pub date: Date,
    pub created_at: DateTimeUtc,
    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::counterparties::Entity",
        from = "Column::CounterpartyId",
        to = "super::counterparties::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Counterparties,
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
}

impl Related<super::counterparties::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Counterparties.def()
    }
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for MilkEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            kind: CounterpartyKind::try_from(model.kind.as_str())?,
            counterparty_id: model.counterparty_id,
            counterparty_name: model.counterparty_name,
            milk_type: MilkType::try_from(model.milk_type.as_str())?,
            price: Money::new(model.price_minor),
            quantity: Quantity::from_milli(model.quantity_milli),
            fat: FatPercentage::from_centi(model.fat_centi),
            total_amount: Money::new(model.total_amount_minor),
            date: model.date,
            created_at: model.created_at,
            counterparty: None,
        })
    }
}
