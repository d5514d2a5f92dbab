use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Counterparty, CounterpartyKind, EngineError, Money, Payment, PaymentMethod, PaymentTotals,
    PaymentType, ResultEngine, payments,
};

use super::{
    DateRange, Engine, count_rows, count_u64, counterparties::require_counterparty, lower_like,
    normalize_optional_text, search_pattern, sum_i64, with_tx,
};

/// A new payment to a buyer or from a seller.
#[derive(Clone, Debug)]
pub struct PaymentInput {
    pub counterparty_id: i64,
    pub amount: Money,
    pub payment_type: PaymentType,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
}

/// Partial update; `None` leaves a field untouched. An empty
/// `transaction_id` or `notes` clears it.
#[derive(Clone, Debug, Default)]
pub struct PaymentPatch {
    pub amount: Option<Money>,
    pub payment_type: Option<PaymentType>,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub date: Option<NaiveDate>,
}

impl PaymentPatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.payment_type.is_none()
            && self.payment_method.is_none()
            && self.transaction_id.is_none()
            && self.notes.is_none()
            && self.date.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaymentFilter {
    #[default]
    All,
    Counterparty(i64),
    Range(DateRange),
}

/// Payments sharing a type and a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentGroup {
    pub payment_type: PaymentType,
    pub payment_method: PaymentMethod,
    pub totals: PaymentTotals,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentSummary {
    pub counterparty: Counterparty,
    pub totals: PaymentTotals,
    pub groups: Vec<PaymentGroup>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyPayments {
    pub date: NaiveDate,
    pub payments: Vec<Payment>,
    pub totals: PaymentTotals,
}

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    count: i64,
    amount: i64,
}

#[derive(Debug, FromQueryResult)]
struct GroupRow {
    payment_type: String,
    payment_method: String,
    count: i64,
    amount: i64,
}

fn ensure_positive(amount: Money) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::invalid("Payment amount must be greater than 0"));
    }
    Ok(())
}

fn live(kind: CounterpartyKind) -> Condition {
    Condition::all()
        .add(payments::Column::Kind.eq(kind.as_str()))
        .add(payments::Column::IsDeleted.eq(false))
}

fn in_range(range: DateRange) -> Condition {
    Condition::all().add(payments::Column::Date.between(range.start, range.end))
}

async fn require_payment<C: ConnectionTrait>(
    db: &C,
    kind: CounterpartyKind,
    id: i64,
) -> ResultEngine<payments::Model> {
    payments::Entity::find_by_id(id)
        .filter(live(kind))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::not_found("Payment not found"))
}

impl Engine {
    /// Records a payment against a live counterparty, snapshotting its name.
    pub async fn create_payment(
        &self,
        kind: CounterpartyKind,
        input: PaymentInput,
    ) -> ResultEngine<Payment> {
        ensure_positive(input.amount)?;
        with_tx!(self, |db_tx| {
            let counterparty = require_counterparty(&db_tx, kind, input.counterparty_id).await?;
            let model = payments::ActiveModel {
                id: ActiveValue::NotSet,
                kind: ActiveValue::Set(kind.as_str().to_string()),
                counterparty_id: ActiveValue::Set(counterparty.id),
                counterparty_name: ActiveValue::Set(counterparty.full_name),
                amount_minor: ActiveValue::Set(input.amount.minor()),
                payment_type: ActiveValue::Set(input.payment_type.as_str().to_string()),
                payment_method: ActiveValue::Set(input.payment_method.as_str().to_string()),
                transaction_ref: ActiveValue::Set(normalize_optional_text(
                    input.transaction_id.as_deref(),
                )),
                notes: ActiveValue::Set(normalize_optional_text(input.notes.as_deref())),
                date: ActiveValue::Set(input.date),
                created_at: ActiveValue::Set(Utc::now()),
                is_deleted: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(kind = kind.as_str(), id = model.id, "payment created");
            Payment::try_from(model)
        })
    }

    pub async fn payment(&self, kind: CounterpartyKind, id: i64) -> ResultEngine<Payment> {
        let model = require_payment(&self.database, kind, id).await?;
        Payment::try_from(model)
    }

    /// Live payments ordered by `date DESC, created_at DESC`.
    pub async fn list_payments(
        &self,
        kind: CounterpartyKind,
        filter: PaymentFilter,
    ) -> ResultEngine<Vec<Payment>> {
        let condition = match filter {
            PaymentFilter::All => live(kind),
            PaymentFilter::Counterparty(id) => {
                live(kind).add(payments::Column::CounterpartyId.eq(id))
            }
            PaymentFilter::Range(range) => live(kind).add(in_range(range)),
        };
        let models = payments::Entity::find()
            .filter(condition)
            .order_by_desc(payments::Column::Date)
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Payment::try_from).collect()
    }

    /// Matches the name snapshot, payment type, notes and transaction id.
    pub async fn search_payments(
        &self,
        kind: CounterpartyKind,
        term: &str,
    ) -> ResultEngine<Vec<Payment>> {
        let pattern = search_pattern(term)?;
        let models = payments::Entity::find()
            .filter(live(kind))
            .filter(
                Condition::any()
                    .add(lower_like(
                        Expr::col(payments::Column::CounterpartyName),
                        &pattern,
                    ))
                    .add(lower_like(Expr::col(payments::Column::PaymentType), &pattern))
                    .add(lower_like(Expr::col(payments::Column::Notes), &pattern))
                    .add(lower_like(
                        Expr::col(payments::Column::TransactionRef),
                        &pattern,
                    )),
            )
            .order_by_desc(payments::Column::Date)
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Payment::try_from).collect()
    }

    pub async fn update_payment(
        &self,
        kind: CounterpartyKind,
        id: i64,
        patch: PaymentPatch,
    ) -> ResultEngine<Payment> {
        if patch.is_empty() {
            return Err(EngineError::invalid("No valid fields to update"));
        }
        if let Some(amount) = patch.amount {
            ensure_positive(amount)?;
        }
        with_tx!(self, |db_tx| {
            let existing = require_payment(&db_tx, kind, id).await?;
            let mut model: payments::ActiveModel = existing.into();
            if let Some(amount) = patch.amount {
                model.amount_minor = ActiveValue::Set(amount.minor());
            }
            if let Some(payment_type) = patch.payment_type {
                model.payment_type = ActiveValue::Set(payment_type.as_str().to_string());
            }
            if let Some(payment_method) = patch.payment_method {
                model.payment_method = ActiveValue::Set(payment_method.as_str().to_string());
            }
            if let Some(transaction_id) = patch.transaction_id.as_deref() {
                model.transaction_ref =
                    ActiveValue::Set(normalize_optional_text(Some(transaction_id)));
            }
            if let Some(notes) = patch.notes.as_deref() {
                model.notes = ActiveValue::Set(normalize_optional_text(Some(notes)));
            }
            if let Some(date) = patch.date {
                model.date = ActiveValue::Set(date);
            }
            let model = model.update(&db_tx).await?;
            Payment::try_from(model)
        })
    }

    pub async fn delete_payment(&self, kind: CounterpartyKind, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let existing = require_payment(&db_tx, kind, id).await?;
            let mut model: payments::ActiveModel = existing.into();
            model.is_deleted = ActiveValue::Set(true);
            model.update(&db_tx).await?;
            tracing::info!(kind = kind.as_str(), id, "payment deleted");
            Ok(())
        })
    }

    /// Totals of a counterparty's payments, grouped by type and method.
    pub async fn payment_summary(
        &self,
        kind: CounterpartyKind,
        counterparty_id: i64,
    ) -> ResultEngine<PaymentSummary> {
        let counterparty = self.counterparty(kind, counterparty_id).await?;
        let condition = live(kind).add(payments::Column::CounterpartyId.eq(counterparty_id));
        let totals = self.payment_totals(condition.clone()).await?;
        let groups = self.payment_groups(condition).await?;
        Ok(PaymentSummary {
            counterparty,
            totals,
            groups,
        })
    }

    /// Every payment of a day with its totals.
    pub async fn payments_on(
        &self,
        kind: CounterpartyKind,
        date: NaiveDate,
    ) -> ResultEngine<DailyPayments> {
        let payments = self
            .list_payments(kind, PaymentFilter::Range(DateRange::day(date)))
            .await?;
        let totals = PaymentTotals {
            count: payments.len() as u64,
            amount: payments.iter().map(|payment| payment.amount).sum(),
        };
        Ok(DailyPayments {
            date,
            payments,
            totals,
        })
    }

    /// Payments over a range grouped by type and method.
    pub async fn payment_analytics(
        &self,
        kind: CounterpartyKind,
        range: DateRange,
    ) -> ResultEngine<Vec<PaymentGroup>> {
        self.payment_groups(live(kind).add(in_range(range))).await
    }

    pub async fn payment_totals_in(
        &self,
        kind: CounterpartyKind,
        range: DateRange,
    ) -> ResultEngine<PaymentTotals> {
        self.payment_totals(live(kind).add(in_range(range))).await
    }

    pub(super) async fn payment_totals_for(
        &self,
        kind: CounterpartyKind,
        counterparty_id: i64,
    ) -> ResultEngine<PaymentTotals> {
        self.payment_totals(live(kind).add(payments::Column::CounterpartyId.eq(counterparty_id)))
            .await
    }

    async fn payment_totals(&self, condition: Condition) -> ResultEngine<PaymentTotals> {
        let row = payments::Entity::find()
            .select_only()
            .column_as(count_rows(), "count")
            .column_as(sum_i64("amount_minor"), "amount")
            .filter(condition)
            .into_model::<TotalsRow>()
            .one(&self.database)
            .await?;
        Ok(row
            .map(|row| PaymentTotals {
                count: count_u64(row.count),
                amount: Money::new(row.amount),
            })
            .unwrap_or_default())
    }

    async fn payment_groups(&self, condition: Condition) -> ResultEngine<Vec<PaymentGroup>> {
        let rows = payments::Entity::find()
            .select_only()
            .column(payments::Column::PaymentType)
            .column(payments::Column::PaymentMethod)
            .column_as(count_rows(), "count")
            .column_as(sum_i64("amount_minor"), "amount")
            .filter(condition)
            .group_by(payments::Column::PaymentType)
            .group_by(payments::Column::PaymentMethod)
            .order_by_asc(payments::Column::PaymentType)
            .order_by_asc(payments::Column::PaymentMethod)
            .into_model::<GroupRow>()
            .all(&self.database)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(PaymentGroup {
                    payment_type: PaymentType::try_from(row.payment_type.as_str())?,
                    payment_method: PaymentMethod::try_from(row.payment_method.as_str())?,
                    totals: PaymentTotals {
                        count: count_u64(row.count),
                        amount: Money::new(row.amount),
                    },
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_emptiness() {
        assert!(PaymentPatch::default().is_empty());
        let patch = PaymentPatch {
            notes: Some(String::new()),
            ..PaymentPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(ensure_positive(Money::new(1)).is_ok());
        assert_eq!(
            ensure_positive(Money::ZERO),
            Err(EngineError::InvalidInput(
                "Payment amount must be greater than 0".to_string()
            ))
        );
    }
}
