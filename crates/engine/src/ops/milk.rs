use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Select, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Counterparty, CounterpartyKind, EngineError, FatPercentage, MilkEntry, MilkTotals, MilkType,
    Money, Quantity, ResultEngine, counterparties, milk_entries,
};

use super::{
    DateRange, Engine, count_rows, count_u64, counterparties::require_counterparty, ledger,
    lower_like, search_pattern, sum_i64, with_tx,
};

/// Fields of a milk purchase or sale. Updates replace all of them.
#[derive(Clone, Debug)]
pub struct MilkEntryInput {
    pub counterparty_id: i64,
    pub milk_type: MilkType,
    pub price: Money,
    pub quantity: Quantity,
    pub fat: FatPercentage,
    pub date: NaiveDate,
}

/// Selection for the list endpoint. At most one dimension applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MilkFilter {
    #[default]
    All,
    Counterparty(i64),
    MilkType(MilkType),
    Range(DateRange),
}

/// Per milk type totals for the summary endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MilkTypeSummary {
    pub milk_type: MilkType,
    pub count: u64,
    pub quantity: Quantity,
    pub amount: Money,
    pub average_price: Money,
    /// Distinct buyers (purchases) or sellers (sales).
    pub counterparties: u64,
}

/// Per milk type totals for one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MilkDayRow {
    pub milk_type: MilkType,
    pub count: u64,
    pub quantity: Quantity,
    pub amount: Money,
    pub average_price: Money,
    pub min_price: Money,
    pub max_price: Money,
}

/// Sales or purchases of one milk type over a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfitAnalysisRow {
    pub kind: CounterpartyKind,
    pub milk_type: MilkType,
    pub count: u64,
    pub quantity: Quantity,
    pub amount: Money,
    pub average_price: Money,
}

#[derive(Debug, FromQueryResult)]
struct MilkAggregate {
    count: i64,
    quantity: i64,
    amount: i64,
    price_sum: i64,
}

impl MilkAggregate {
    fn totals(self) -> MilkTotals {
        let count = count_u64(self.count);
        MilkTotals {
            count,
            quantity: Quantity::from_milli(self.quantity),
            amount: Money::new(self.amount),
            average_price: Money::new(self.price_sum).average(count),
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct MilkGroup {
    kind: String,
    milk_type: String,
    count: i64,
    quantity: i64,
    amount: i64,
    price_sum: i64,
    counterparties: i64,
    min_price: i64,
    max_price: i64,
}

fn grouped(query: Select<milk_entries::Entity>) -> Select<milk_entries::Entity> {
    query
        .select_only()
        .column(milk_entries::Column::Kind)
        .column(milk_entries::Column::MilkType)
        .column_as(count_rows(), "count")
        .column_as(sum_i64("quantity_milli"), "quantity")
        .column_as(sum_i64("total_amount_minor"), "amount")
        .column_as(sum_i64("price_minor"), "price_sum")
        .column_as(Expr::cust("COUNT(DISTINCT counterparty_id)"), "counterparties")
        .column_as(Expr::cust("COALESCE(MIN(price_minor), 0)"), "min_price")
        .column_as(Expr::cust("COALESCE(MAX(price_minor), 0)"), "max_price")
        .group_by(milk_entries::Column::Kind)
        .group_by(milk_entries::Column::MilkType)
        .order_by_asc(milk_entries::Column::Kind)
        .order_by_asc(milk_entries::Column::MilkType)
}

const NOT_POSITIVE: &str = "Price, quantity, and fat percentage must be greater than 0";

fn validate(input: &MilkEntryInput) -> ResultEngine<()> {
    if !input.price.is_positive() || !input.quantity.is_positive() || input.fat.centi() <= 0 {
        return Err(EngineError::invalid(NOT_POSITIVE));
    }
    if !input.fat.is_valid() {
        return Err(EngineError::invalid("Fat percentage cannot exceed 100"));
    }
    Ok(())
}

fn live(kind: CounterpartyKind) -> Condition {
    Condition::all()
        .add(milk_entries::Column::Kind.eq(kind.as_str()))
        .add(milk_entries::Column::IsDeleted.eq(false))
}

fn in_range(range: DateRange) -> Condition {
    Condition::all().add(milk_entries::Column::Date.between(range.start, range.end))
}

fn not_found(kind: CounterpartyKind) -> EngineError {
    EngineError::not_found(format!("{} record not found", kind.milk_label()))
}

async fn require_entry<C: ConnectionTrait>(
    db: &C,
    kind: CounterpartyKind,
    id: i64,
) -> ResultEngine<milk_entries::Model> {
    milk_entries::Entity::find_by_id(id)
        .filter(live(kind))
        .one(db)
        .await?
        .ok_or_else(|| not_found(kind))
}

fn with_counterparty(
    (model, counterparty): (milk_entries::Model, Option<counterparties::Model>),
) -> ResultEngine<MilkEntry> {
    let mut entry = MilkEntry::try_from(model)?;
    entry.counterparty = counterparty.map(Counterparty::try_from).transpose()?;
    Ok(entry)
}

impl Engine {
    /// Records a milk purchase (buyer) or sale (seller).
    ///
    /// The counterparty name is snapshotted and the total computed as
    /// `price * quantity`. With ledger auto-posting on, the matching expense
    /// or income row is written in the same transaction.
    pub async fn create_milk_entry(
        &self,
        kind: CounterpartyKind,
        input: MilkEntryInput,
    ) -> ResultEngine<MilkEntry> {
        validate(&input)?;
        let total = input.price.times(input.quantity)?;
        with_tx!(self, |db_tx| {
            let counterparty = require_counterparty(&db_tx, kind, input.counterparty_id).await?;
            let model = milk_entries::ActiveModel {
                id: ActiveValue::NotSet,
                kind: ActiveValue::Set(kind.as_str().to_string()),
                counterparty_id: ActiveValue::Set(counterparty.id),
                counterparty_name: ActiveValue::Set(counterparty.full_name),
                milk_type: ActiveValue::Set(input.milk_type.as_str().to_string()),
                price_minor: ActiveValue::Set(input.price.minor()),
                quantity_milli: ActiveValue::Set(input.quantity.milli()),
                fat_centi: ActiveValue::Set(input.fat.centi()),
                total_amount_minor: ActiveValue::Set(total.minor()),
                date: ActiveValue::Set(input.date),
                created_at: ActiveValue::Set(Utc::now()),
                is_deleted: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            if self.auto_post_ledger {
                ledger::post_milk_entry(&db_tx, &model).await?;
            }
            tracing::info!(kind = kind.as_str(), id = model.id, "milk entry created");
            MilkEntry::try_from(model)
        })
    }

    /// A live entry with its counterparty attached.
    pub async fn milk_entry(&self, kind: CounterpartyKind, id: i64) -> ResultEngine<MilkEntry> {
        let found = milk_entries::Entity::find_by_id(id)
            .filter(live(kind))
            .find_also_related(counterparties::Entity)
            .one(&self.database)
            .await?
            .ok_or_else(|| not_found(kind))?;
        with_counterparty(found)
    }

    /// Live entries ordered by `date DESC, created_at DESC`.
    ///
    /// `with_details` attaches the current counterparty record to each row.
    pub async fn list_milk_entries(
        &self,
        kind: CounterpartyKind,
        filter: MilkFilter,
        with_details: bool,
    ) -> ResultEngine<Vec<MilkEntry>> {
        let condition = match filter {
            MilkFilter::All => live(kind),
            MilkFilter::Counterparty(id) => {
                live(kind).add(milk_entries::Column::CounterpartyId.eq(id))
            }
            MilkFilter::MilkType(milk_type) => {
                live(kind).add(milk_entries::Column::MilkType.eq(milk_type.as_str()))
            }
            MilkFilter::Range(range) => live(kind).add(in_range(range)),
        };
        let query = milk_entries::Entity::find()
            .filter(condition)
            .order_by_desc(milk_entries::Column::Date)
            .order_by_desc(milk_entries::Column::CreatedAt)
            .order_by_desc(milk_entries::Column::Id);
        if with_details {
            let rows = query
                .find_also_related(counterparties::Entity)
                .all(&self.database)
                .await?;
            rows.into_iter().map(with_counterparty).collect()
        } else {
            let rows = query.all(&self.database).await?;
            rows.into_iter().map(MilkEntry::try_from).collect()
        }
    }

    /// Matches the name snapshot, the current counterparty name or its mobile
    /// number.
    pub async fn search_milk_entries(
        &self,
        kind: CounterpartyKind,
        term: &str,
    ) -> ResultEngine<Vec<MilkEntry>> {
        let pattern = search_pattern(term)?;
        let rows = milk_entries::Entity::find()
            .filter(live(kind))
            .find_also_related(counterparties::Entity)
            .filter(
                Condition::any()
                    .add(lower_like(
                        Expr::col((milk_entries::Entity, milk_entries::Column::CounterpartyName)),
                        &pattern,
                    ))
                    .add(lower_like(
                        Expr::col((counterparties::Entity, counterparties::Column::FullName)),
                        &pattern,
                    ))
                    .add(lower_like(
                        Expr::col((counterparties::Entity, counterparties::Column::MobileNumber)),
                        &pattern,
                    )),
            )
            .order_by_desc(milk_entries::Column::Date)
            .order_by_desc(milk_entries::Column::CreatedAt)
            .order_by_desc(milk_entries::Column::Id)
            .all(&self.database)
            .await?;
        rows.into_iter()
            .map(|(model, _)| MilkEntry::try_from(model))
            .collect()
    }

    /// Replaces every field of a live entry, re-snapshotting the counterparty
    /// name and recomputing the total. The linked ledger row follows.
    pub async fn update_milk_entry(
        &self,
        kind: CounterpartyKind,
        id: i64,
        input: MilkEntryInput,
    ) -> ResultEngine<MilkEntry> {
        validate(&input)?;
        let total = input.price.times(input.quantity)?;
        with_tx!(self, |db_tx| {
            let existing = require_entry(&db_tx, kind, id).await?;
            let counterparty = require_counterparty(&db_tx, kind, input.counterparty_id).await?;
            let mut model: milk_entries::ActiveModel = existing.into();
            model.counterparty_id = ActiveValue::Set(counterparty.id);
            model.counterparty_name = ActiveValue::Set(counterparty.full_name);
            model.milk_type = ActiveValue::Set(input.milk_type.as_str().to_string());
            model.price_minor = ActiveValue::Set(input.price.minor());
            model.quantity_milli = ActiveValue::Set(input.quantity.milli());
            model.fat_centi = ActiveValue::Set(input.fat.centi());
            model.total_amount_minor = ActiveValue::Set(total.minor());
            model.date = ActiveValue::Set(input.date);
            let model = model.update(&db_tx).await?;
            if self.auto_post_ledger {
                ledger::post_milk_entry(&db_tx, &model).await?;
            }
            MilkEntry::try_from(model)
        })
    }

    /// Soft-deletes an entry together with its linked ledger row.
    pub async fn delete_milk_entry(&self, kind: CounterpartyKind, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let existing = require_entry(&db_tx, kind, id).await?;
            let mut model: milk_entries::ActiveModel = existing.into();
            model.is_deleted = ActiveValue::Set(true);
            model.update(&db_tx).await?;
            ledger::retire_milk_entry(&db_tx, id).await?;
            tracing::info!(kind = kind.as_str(), id, "milk entry deleted");
            Ok(())
        })
    }

    /// Per milk type totals, optionally bounded by a date range.
    pub async fn milk_summary(
        &self,
        kind: CounterpartyKind,
        range: Option<DateRange>,
    ) -> ResultEngine<Vec<MilkTypeSummary>> {
        let mut condition = live(kind);
        if let Some(range) = range {
            condition = condition.add(in_range(range));
        }
        let groups = grouped(milk_entries::Entity::find().filter(condition))
            .into_model::<MilkGroup>()
            .all(&self.database)
            .await?;
        groups
            .into_iter()
            .map(|group| {
                let count = count_u64(group.count);
                Ok(MilkTypeSummary {
                    milk_type: MilkType::try_from(group.milk_type.as_str())?,
                    count,
                    quantity: Quantity::from_milli(group.quantity),
                    amount: Money::new(group.amount),
                    average_price: Money::new(group.price_sum).average(count),
                    counterparties: count_u64(group.counterparties),
                })
            })
            .collect()
    }

    /// Per milk type totals for a single day.
    pub async fn milk_daily_report(
        &self,
        kind: CounterpartyKind,
        date: NaiveDate,
    ) -> ResultEngine<Vec<MilkDayRow>> {
        let groups = grouped(
            milk_entries::Entity::find()
                .filter(live(kind))
                .filter(milk_entries::Column::Date.eq(date)),
        )
        .into_model::<MilkGroup>()
        .all(&self.database)
        .await?;
        groups
            .into_iter()
            .map(|group| {
                let count = count_u64(group.count);
                Ok(MilkDayRow {
                    milk_type: MilkType::try_from(group.milk_type.as_str())?,
                    count,
                    quantity: Quantity::from_milli(group.quantity),
                    amount: Money::new(group.amount),
                    average_price: Money::new(group.price_sum).average(count),
                    min_price: Money::new(group.min_price),
                    max_price: Money::new(group.max_price),
                })
            })
            .collect()
    }

    /// Sales and purchases per milk type, sales first.
    pub async fn milk_profit_analysis(
        &self,
        range: Option<DateRange>,
    ) -> ResultEngine<Vec<ProfitAnalysisRow>> {
        let mut condition = Condition::all().add(milk_entries::Column::IsDeleted.eq(false));
        if let Some(range) = range {
            condition = condition.add(in_range(range));
        }
        let groups = grouped(milk_entries::Entity::find().filter(condition))
            .into_model::<MilkGroup>()
            .all(&self.database)
            .await?;
        let mut rows = groups
            .into_iter()
            .map(|group| {
                let count = count_u64(group.count);
                Ok(ProfitAnalysisRow {
                    kind: CounterpartyKind::try_from(group.kind.as_str())?,
                    milk_type: MilkType::try_from(group.milk_type.as_str())?,
                    count,
                    quantity: Quantity::from_milli(group.quantity),
                    amount: Money::new(group.amount),
                    average_price: Money::new(group.price_sum).average(count),
                })
            })
            .collect::<ResultEngine<Vec<_>>>()?;
        rows.sort_by_key(|row| (row.kind == CounterpartyKind::Buyer, row.milk_type.as_str()));
        Ok(rows)
    }

    pub(super) async fn milk_totals_for(
        &self,
        kind: CounterpartyKind,
        counterparty_id: i64,
    ) -> ResultEngine<MilkTotals> {
        self.milk_totals(live(kind).add(milk_entries::Column::CounterpartyId.eq(counterparty_id)))
            .await
    }

    pub(super) async fn milk_totals_in(
        &self,
        kind: CounterpartyKind,
        range: DateRange,
    ) -> ResultEngine<MilkTotals> {
        self.milk_totals(live(kind).add(in_range(range))).await
    }

    async fn milk_totals(&self, condition: Condition) -> ResultEngine<MilkTotals> {
        let aggregate = milk_entries::Entity::find()
            .select_only()
            .column_as(count_rows(), "count")
            .column_as(sum_i64("quantity_milli"), "quantity")
            .column_as(sum_i64("total_amount_minor"), "amount")
            .column_as(sum_i64("price_minor"), "price_sum")
            .filter(condition)
            .into_model::<MilkAggregate>()
            .one(&self.database)
            .await?;
        Ok(aggregate.map(MilkAggregate::totals).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(price: i64, quantity: i64, fat: i64) -> MilkEntryInput {
        MilkEntryInput {
            counterparty_id: 1,
            milk_type: MilkType::Cow,
            price: Money::new(price),
            quantity: Quantity::from_milli(quantity),
            fat: FatPercentage::from_centi(fat),
            date: NaiveDate::from_ymd_opt(2025, 8, 25).unwrap(),
        }
    }

    #[test]
    fn validate_requires_positive_measures() {
        assert!(validate(&input(4550, 100_000, 350)).is_ok());
        for bad in [input(0, 100_000, 350), input(4550, 0, 350), input(4550, 1, 0)] {
            assert_eq!(
                validate(&bad),
                Err(EngineError::InvalidInput(NOT_POSITIVE.to_string()))
            );
        }
        assert!(validate(&input(4550, 1, 10_001)).is_err());
    }
}
