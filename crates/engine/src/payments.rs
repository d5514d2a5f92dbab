//! The module contains the `Payment` record: money paid to a buyer or
//! received from a seller.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

use crate::{CounterpartyKind, EngineError, Money, PaymentMethod, PaymentType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub id: i64,
    pub kind: CounterpartyKind,
    pub counterparty_id: i64,
    pub counterparty_name: String,
    pub amount: Money,
    pub payment_type: PaymentType,
    pub payment_method: PaymentMethod,
    /// External reference (UPI id, cheque number...).
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub kind: String,
    pub counterparty_id: i64,
    pub counterparty_name: String,
    pub amount_minor: i64,
    pub payment_type: String,
    pub payment_method: String,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
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
}

impl Related<super::counterparties::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Counterparties.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            kind: CounterpartyKind::try_from(model.kind.as_str())?,
            counterparty_id: model.counterparty_id,
            counterparty_name: model.counterparty_name,
            amount: Money::new(model.amount_minor),
            payment_type: PaymentType::try_from(model.payment_type.as_str())?,
            payment_method: PaymentMethod::try_from(model.payment_method.as_str())?,
            transaction_id: model.transaction_ref,
            notes: model.notes,
            date: model.date,
            created_at: model.created_at,
        })
    }
}
