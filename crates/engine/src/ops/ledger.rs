//! Income and expense books.
//!
//! Both books share the `ledger_entries` table. `party` holds the income
//! source or the expense payee.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    CounterpartyKind, EngineError, LedgerEntry, LedgerKind, Money, Quantity, ResultEngine,
    ledger_entries, milk_entries,
};

use super::{
    DateRange, Engine, count_rows, count_u64, lower_like, normalize_optional_text,
    normalize_required, search_pattern, sum_i64, with_tx,
};

/// Category given to manual entries that omit one.
const DEFAULT_CATEGORY: &str = "other";

/// A new income or expense row.
#[derive(Clone, Debug)]
pub struct LedgerInput {
    pub amount: Money,
    pub description: String,
    /// Income source or expense payee.
    pub party: String,
    pub category: Option<String>,
    pub date: NaiveDate,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct LedgerPatch {
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub party: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
}

impl LedgerPatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.description.is_none()
            && self.party.is_none()
            && self.category.is_none()
            && self.date.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LedgerFilter {
    #[default]
    All,
    Category(String),
    Range(DateRange),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub count: u64,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub count: u64,
    pub amount: Money,
    pub average: Money,
}

/// Categories folded into the dashboard's three headline buckets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerBucket {
    pub label: &'static str,
    pub count: u64,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyLedger {
    pub date: NaiveDate,
    pub totals: LedgerTotals,
    /// Distinct sources (income) or categories (expense) seen that day.
    pub labels: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub totals: LedgerTotals,
}

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    count: i64,
    amount: i64,
}

impl From<TotalsRow> for LedgerTotals {
    fn from(row: TotalsRow) -> Self {
        Self {
            count: count_u64(row.count),
            amount: Money::new(row.amount),
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct CategoryRow {
    category: String,
    count: i64,
    amount: i64,
}

#[derive(Debug, FromQueryResult)]
struct DayRow {
    date: NaiveDate,
    count: i64,
    amount: i64,
}

fn bucket_label(kind: LedgerKind, category: &str) -> &'static str {
    match (kind, category) {
        (LedgerKind::Income, "milk_sale") => "Milk Sales",
        (LedgerKind::Income, "buyer_payment") => "Customer Payments",
        (LedgerKind::Income, _) => "Other Income",
        (LedgerKind::Expense, "milk_purchase") => "Milk Purchases",
        (LedgerKind::Expense, "seller_payment") => "Seller Payments",
        (LedgerKind::Expense, _) => "Other Expenses",
    }
}

fn required_message(kind: LedgerKind) -> &'static str {
    match kind {
        LedgerKind::Income => "Amount, description, source, and date are required",
        LedgerKind::Expense => "Amount, description, paid to, and date are required",
    }
}

fn ensure_positive(amount: Money) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::invalid("Amount must be greater than 0"));
    }
    Ok(())
}

fn live(kind: LedgerKind) -> Condition {
    Condition::all()
        .add(ledger_entries::Column::Kind.eq(kind.as_str()))
        .add(ledger_entries::Column::IsDeleted.eq(false))
}

fn in_range(range: DateRange) -> Condition {
    Condition::all().add(ledger_entries::Column::Date.between(range.start, range.end))
}

fn not_found(kind: LedgerKind) -> EngineError {
    EngineError::not_found(format!("{} record not found", kind.label()))
}

async fn require_entry<C: ConnectionTrait>(
    db: &C,
    kind: LedgerKind,
    id: i64,
) -> ResultEngine<ledger_entries::Model> {
    ledger_entries::Entity::find_by_id(id)
        .filter(live(kind))
        .one(db)
        .await?
        .ok_or_else(|| not_found(kind))
}

/// Writes (or rewrites) the ledger row mirroring a milk entry.
pub(super) async fn post_milk_entry<C: ConnectionTrait>(
    db: &C,
    entry: &milk_entries::Model,
) -> ResultEngine<()> {
    let kind = CounterpartyKind::try_from(entry.kind.as_str())?;
    let book = kind.ledger();
    let description = format!(
        "{} - {}L {} milk @ ₹{}/L",
        kind.milk_label(),
        Quantity::from_milli(entry.quantity_milli),
        entry.milk_type,
        Money::new(entry.price_minor)
    );

    let linked = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::MilkEntryId.eq(entry.id))
        .filter(ledger_entries::Column::IsDeleted.eq(false))
        .one(db)
        .await?;
    match linked {
        Some(row) => {
            let mut model: ledger_entries::ActiveModel = row.into();
            model.amount_minor = ActiveValue::Set(entry.total_amount_minor);
            model.description = ActiveValue::Set(description);
            model.party = ActiveValue::Set(entry.counterparty_name.clone());
            model.date = ActiveValue::Set(entry.date);
            model.update(db).await?;
        }
        None => {
            ledger_entries::ActiveModel {
                id: ActiveValue::NotSet,
                kind: ActiveValue::Set(book.as_str().to_string()),
                amount_minor: ActiveValue::Set(entry.total_amount_minor),
                description: ActiveValue::Set(description),
                party: ActiveValue::Set(entry.counterparty_name.clone()),
                category: ActiveValue::Set(book.milk_category().to_string()),
                date: ActiveValue::Set(entry.date),
                milk_entry_id: ActiveValue::Set(Some(entry.id)),
                created_at: ActiveValue::Set(Utc::now()),
                is_deleted: ActiveValue::Set(false),
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

/// Soft-deletes the ledger rows linked to a milk entry.
pub(super) async fn retire_milk_entry<C: ConnectionTrait>(
    db: &C,
    milk_entry_id: i64,
) -> ResultEngine<()> {
    ledger_entries::Entity::update_many()
        .col_expr(ledger_entries::Column::IsDeleted, Expr::value(true))
        .filter(ledger_entries::Column::MilkEntryId.eq(milk_entry_id))
        .filter(ledger_entries::Column::IsDeleted.eq(false))
        .exec(db)
        .await?;
    Ok(())
}

impl Engine {
    pub async fn create_ledger_entry(
        &self,
        kind: LedgerKind,
        input: LedgerInput,
    ) -> ResultEngine<LedgerEntry> {
        let required = required_message(kind);
        ensure_positive(input.amount)?;
        let description = normalize_required(&input.description, required)?;
        let party = normalize_required(&input.party, required)?;
        let category = normalize_optional_text(input.category.as_deref())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let model = ledger_entries::ActiveModel {
            id: ActiveValue::NotSet,
            kind: ActiveValue::Set(kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(input.amount.minor()),
            description: ActiveValue::Set(description),
            party: ActiveValue::Set(party),
            category: ActiveValue::Set(category),
            date: ActiveValue::Set(input.date),
            milk_entry_id: ActiveValue::Set(None),
            created_at: ActiveValue::Set(Utc::now()),
            is_deleted: ActiveValue::Set(false),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(kind = kind.as_str(), id = model.id, "ledger entry created");
        LedgerEntry::try_from(model)
    }

    pub async fn ledger_entry(&self, kind: LedgerKind, id: i64) -> ResultEngine<LedgerEntry> {
        let model = require_entry(&self.database, kind, id).await?;
        LedgerEntry::try_from(model)
    }

    /// Live rows ordered by `date DESC, created_at DESC`.
    pub async fn list_ledger_entries(
        &self,
        kind: LedgerKind,
        filter: LedgerFilter,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        let condition = match filter {
            LedgerFilter::All => live(kind),
            LedgerFilter::Category(category) => live(kind).add(
                Expr::cust("LOWER(category)").eq(category.trim().to_lowercase()),
            ),
            LedgerFilter::Range(range) => live(kind).add(in_range(range)),
        };
        let models = ledger_entries::Entity::find()
            .filter(condition)
            .order_by_desc(ledger_entries::Column::Date)
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .order_by_desc(ledger_entries::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// Matches description, source/payee and category.
    pub async fn search_ledger_entries(
        &self,
        kind: LedgerKind,
        term: &str,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        let pattern = search_pattern(term)?;
        let models = ledger_entries::Entity::find()
            .filter(live(kind))
            .filter(
                Condition::any()
                    .add(lower_like(
                        Expr::col(ledger_entries::Column::Description),
                        &pattern,
                    ))
                    .add(lower_like(Expr::col(ledger_entries::Column::Party), &pattern))
                    .add(lower_like(
                        Expr::col(ledger_entries::Column::Category),
                        &pattern,
                    )),
            )
            .order_by_desc(ledger_entries::Column::Date)
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .order_by_desc(ledger_entries::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(LedgerEntry::try_from).collect()
    }

    pub async fn update_ledger_entry(
        &self,
        kind: LedgerKind,
        id: i64,
        patch: LedgerPatch,
    ) -> ResultEngine<LedgerEntry> {
        if patch.is_empty() {
            return Err(EngineError::invalid("No valid fields to update"));
        }
        let required = required_message(kind);
        if let Some(amount) = patch.amount {
            ensure_positive(amount)?;
        }
        let description = patch
            .description
            .as_deref()
            .map(|value| normalize_required(value, required))
            .transpose()?;
        let party = patch
            .party
            .as_deref()
            .map(|value| normalize_required(value, required))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let existing = require_entry(&db_tx, kind, id).await?;
            let mut model: ledger_entries::ActiveModel = existing.into();
            if let Some(amount) = patch.amount {
                model.amount_minor = ActiveValue::Set(amount.minor());
            }
            if let Some(description) = description {
                model.description = ActiveValue::Set(description);
            }
            if let Some(party) = party {
                model.party = ActiveValue::Set(party);
            }
            if let Some(category) = patch.category.as_deref() {
                model.category = ActiveValue::Set(
                    normalize_optional_text(Some(category))
                        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                );
            }
            if let Some(date) = patch.date {
                model.date = ActiveValue::Set(date);
            }
            let model = model.update(&db_tx).await?;
            LedgerEntry::try_from(model)
        })
    }

    pub async fn delete_ledger_entry(&self, kind: LedgerKind, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let existing = require_entry(&db_tx, kind, id).await?;
            let mut model: ledger_entries::ActiveModel = existing.into();
            model.is_deleted = ActiveValue::Set(true);
            model.update(&db_tx).await?;
            tracing::info!(kind = kind.as_str(), id, "ledger entry deleted");
            Ok(())
        })
    }

    /// Totals per category, largest first.
    pub async fn ledger_categories(
        &self,
        kind: LedgerKind,
        range: Option<DateRange>,
    ) -> ResultEngine<Vec<CategoryTotal>> {
        let mut condition = live(kind);
        if let Some(range) = range {
            condition = condition.add(in_range(range));
        }
        let rows = ledger_entries::Entity::find()
            .select_only()
            .column(ledger_entries::Column::Category)
            .column_as(count_rows(), "count")
            .column_as(sum_i64("amount_minor"), "amount")
            .filter(condition)
            .group_by(ledger_entries::Column::Category)
            .into_model::<CategoryRow>()
            .all(&self.database)
            .await?;
        let mut totals: Vec<CategoryTotal> = rows
            .into_iter()
            .map(|row| {
                let count = count_u64(row.count);
                let amount = Money::new(row.amount);
                CategoryTotal {
                    category: row.category,
                    count,
                    amount,
                    average: amount.average(count),
                }
            })
            .collect();
        totals.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.category.cmp(&b.category)));
        Ok(totals)
    }

    /// Category totals folded into the three headline buckets of a book,
    /// largest first. Empty buckets are omitted.
    pub async fn ledger_buckets(
        &self,
        kind: LedgerKind,
        range: Option<DateRange>,
    ) -> ResultEngine<Vec<LedgerBucket>> {
        let mut buckets: Vec<LedgerBucket> = Vec::new();
        for total in self.ledger_categories(kind, range).await? {
            let label = bucket_label(kind, &total.category);
            match buckets.iter_mut().find(|bucket| bucket.label == label) {
                Some(bucket) => {
                    bucket.count += total.count;
                    bucket.amount += total.amount;
                }
                None => buckets.push(LedgerBucket {
                    label,
                    count: total.count,
                    amount: total.amount,
                }),
            }
        }
        buckets.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.label.cmp(b.label)));
        Ok(buckets)
    }

    /// Totals for one day plus the distinct sources (income) or categories
    /// (expense) involved.
    pub async fn ledger_daily(&self, kind: LedgerKind, date: NaiveDate) -> ResultEngine<DailyLedger> {
        let entries = self
            .list_ledger_entries(kind, LedgerFilter::Range(DateRange::day(date)))
            .await?;
        let mut labels: Vec<String> = entries
            .iter()
            .map(|entry| match kind {
                LedgerKind::Income => entry.party.clone(),
                LedgerKind::Expense => entry.category.clone(),
            })
            .collect();
        labels.sort();
        labels.dedup();
        let totals = LedgerTotals {
            count: entries.len() as u64,
            amount: entries.iter().map(|entry| entry.amount).sum(),
        };
        Ok(DailyLedger {
            date,
            totals,
            labels,
        })
    }

    /// Per-day totals of a calendar month, newest day first.
    pub async fn ledger_monthly(
        &self,
        kind: LedgerKind,
        year: i32,
        month: u32,
    ) -> ResultEngine<Vec<DayTotal>> {
        let mut days = self.ledger_days(kind, DateRange::month(year, month)?).await?;
        days.reverse();
        Ok(days)
    }

    /// Per-day totals over a range, oldest first. Days without rows are absent.
    pub(super) async fn ledger_days(
        &self,
        kind: LedgerKind,
        range: DateRange,
    ) -> ResultEngine<Vec<DayTotal>> {
        let rows = ledger_entries::Entity::find()
            .select_only()
            .column(ledger_entries::Column::Date)
            .column_as(count_rows(), "count")
            .column_as(sum_i64("amount_minor"), "amount")
            .filter(live(kind).add(in_range(range)))
            .group_by(ledger_entries::Column::Date)
            .order_by_asc(ledger_entries::Column::Date)
            .into_model::<DayRow>()
            .all(&self.database)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| DayTotal {
                date: row.date,
                totals: LedgerTotals {
                    count: count_u64(row.count),
                    amount: Money::new(row.amount),
                },
            })
            .collect())
    }

    /// Totals of a book over a range.
    pub async fn ledger_totals(
        &self,
        kind: LedgerKind,
        range: DateRange,
    ) -> ResultEngine<LedgerTotals> {
        let row = ledger_entries::Entity::find()
            .select_only()
            .column_as(count_rows(), "count")
            .column_as(sum_i64("amount_minor"), "amount")
            .filter(live(kind).add(in_range(range)))
            .into_model::<TotalsRow>()
            .one(&self.database)
            .await?;
        Ok(row.map(LedgerTotals::from).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_follow_category_names() {
        assert_eq!(bucket_label(LedgerKind::Income, "milk_sale"), "Milk Sales");
        assert_eq!(
            bucket_label(LedgerKind::Income, "buyer_payment"),
            "Customer Payments"
        );
        assert_eq!(bucket_label(LedgerKind::Income, "rent"), "Other Income");
        assert_eq!(
            bucket_label(LedgerKind::Expense, "milk_purchase"),
            "Milk Purchases"
        );
        assert_eq!(bucket_label(LedgerKind::Expense, "fuel"), "Other Expenses");
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(LedgerPatch::default().is_empty());
        let patch = LedgerPatch {
            amount: Some(Money::new(100)),
            ..LedgerPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
