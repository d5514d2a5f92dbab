//! The module contains the `Counterparty` record shared by buyers and sellers.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{CounterpartyKind, EngineError, Money, Quantity};

/// A buyer (farmer supplying milk) or a seller (customer buying milk).
///
/// Both live in the same table, told apart by [`CounterpartyKind`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counterparty {
    pub id: i64,
    pub kind: CounterpartyKind,
    pub full_name: String,
    pub mobile_number: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate over a counterparty's live milk entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MilkTotals {
    pub count: u64,
    pub quantity: Quantity,
    pub amount: Money,
    pub average_price: Money,
}

/// Aggregate over a counterparty's live payments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaymentTotals {
    pub count: u64,
    pub amount: Money,
}

/// A counterparty together with its running account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterpartyAccount {
    pub counterparty: Counterparty,
    pub milk: MilkTotals,
    pub payments: PaymentTotals,
    /// Milk total minus payments total; negative when overpaid.
    pub outstanding: Money,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "counterparties")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub kind: String,
    pub full_name: String,
    pub mobile_number: String,
    pub city: String,
    pub created_at: DateTimeUtc,
    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::milk_entries::Entity")]
    MilkEntries,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::milk_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MilkEntries.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Counterparty {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            kind: CounterpartyKind::try_from(model.kind.as_str())?,
            full_name: model.full_name,
            mobile_number: model.mobile_number,
            city: model.city,
            created_at: model.created_at,
        })
    }
}
