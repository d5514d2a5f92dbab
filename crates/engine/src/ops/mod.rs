use chrono::{Datelike, NaiveDate};
use sea_orm::{
    DatabaseConnection,
    sea_query::{Expr, Func, SimpleExpr},
};

use crate::{EngineError, ResultEngine};

mod counterparties;
mod ledger;
mod milk;
mod payments;
mod reports;
mod users;

pub use counterparties::{CounterpartyFilter, CounterpartyInput};
pub use ledger::{
    CategoryTotal, DailyLedger, DayTotal, LedgerBucket, LedgerFilter, LedgerInput, LedgerPatch,
    LedgerTotals,
};
pub use milk::{MilkDayRow, MilkEntryInput, MilkFilter, MilkTypeSummary, ProfitAnalysisRow};
pub use payments::{
    DailyPayments, PaymentFilter, PaymentGroup, PaymentInput, PaymentPatch, PaymentSummary,
};
pub use reports::{
    DailyProfitLoss, DashboardSummary, FinancialOverview, MilkAnalytics, MonthlyTrends,
    PaymentAnalytics, ProfitSummary, TrendPoint,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Minimum length accepted by every search endpoint.
const MIN_SEARCH_LEN: usize = 2;

/// Bcrypt cost used when none is configured.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

const BCRYPT_COSTS: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    auto_post_ledger: bool,
    bcrypt_cost: u32,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Whether milk entries post their income/expense row automatically.
    pub fn auto_post_ledger(&self) -> bool {
        self.auto_post_ledger
    }
}

/// An inclusive calendar date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// From the first day of `today`'s month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let start = today.with_day(1).unwrap_or(today);
        Self::new(start, today)
    }

    /// The whole calendar month.
    pub fn month(year: i32, month: u32) -> ResultEngine<Self> {
        let invalid = || EngineError::invalid("Invalid year or month");
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        let end = next.pred_opt().ok_or_else(invalid)?;
        Ok(Self::new(start, end))
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

fn normalize_required(value: &str, message: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid(message));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Validates a search term and turns it into a lowercase `LIKE` pattern.
fn search_pattern(term: &str) -> ResultEngine<String> {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_LEN {
        return Err(EngineError::invalid(
            "Search term must be at least 2 characters",
        ));
    }
    Ok(format!("%{}%", term.to_lowercase()))
}

/// `LOWER(column) LIKE pattern`
fn lower_like<C>(column: C, pattern: &str) -> SimpleExpr
where
    C: Into<SimpleExpr>,
{
    Expr::expr(Func::lower(column.into())).like(pattern)
}

/// `SUM(column)` as a 64-bit integer, `0` over an empty set.
///
/// MySQL widens `SUM(BIGINT)` to `DECIMAL`, hence the cast.
fn sum_i64(column: &str) -> SimpleExpr {
    Expr::cust(format!("CAST(COALESCE(SUM({column}), 0) AS SIGNED)"))
}

fn count_rows() -> SimpleExpr {
    Expr::cust("COUNT(*)")
}

fn count_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    auto_post_ledger: bool,
    bcrypt_cost: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            auto_post_ledger: true,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Post an income/expense row for every milk sale/purchase.
    pub fn auto_post_ledger(mut self, enabled: bool) -> EngineBuilder {
        self.auto_post_ledger = enabled;
        self
    }

    pub fn bcrypt_cost(mut self, cost: u32) -> EngineBuilder {
        self.bcrypt_cost = cost;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if !BCRYPT_COSTS.contains(&self.bcrypt_cost) {
            return Err(EngineError::invalid(format!(
                "bcrypt cost must be between {} and {}",
                BCRYPT_COSTS.start(),
                BCRYPT_COSTS.end()
            )));
        }
        Ok(Engine {
            database: self.database,
            auto_post_ledger: self.auto_post_ledger,
            bcrypt_cost: self.bcrypt_cost,
        })
    }
}
