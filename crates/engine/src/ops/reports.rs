//! Dashboard read models.
//!
//! Each report composes a few independent aggregate queries; no transaction
//! spans them.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    CounterpartyKind, LedgerKind, MilkTotals, Money, PaymentTotals, Quantity, ResultEngine,
};

use super::{CategoryTotal, DateRange, DayTotal, Engine, LedgerBucket, PaymentGroup};

/// Income against expense over some period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfitSummary {
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    /// `net / income * 100` with two decimals, `"0"` without income.
    pub margin: String,
}

impl ProfitSummary {
    pub fn new(income: Money, expense: Money) -> Self {
        let net = income - expense;
        Self {
            income,
            expense,
            net,
            margin: net.percent_of(income),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardSummary {
    pub range: DateRange,
    pub buyers: u64,
    pub sellers: u64,
    pub finance: ProfitSummary,
    pub purchases: MilkTotals,
    pub sales: MilkTotals,
    pub buyer_payments: PaymentTotals,
    pub seller_payments: PaymentTotals,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinancialOverview {
    pub range: DateRange,
    pub summary: ProfitSummary,
    pub income_breakdown: Vec<LedgerBucket>,
    pub expense_breakdown: Vec<CategoryTotal>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyProfitLoss {
    pub date: NaiveDate,
    pub summary: ProfitSummary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub income: Money,
    pub expense: Money,
    pub profit: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthlyTrends {
    pub year: i32,
    pub month: u32,
    pub points: Vec<TrendPoint>,
}

/// Purchases against sales.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilkAnalytics {
    pub range: DateRange,
    pub purchases: MilkTotals,
    pub sales: MilkTotals,
    /// Sales amount minus purchases amount.
    pub milk_profit: Money,
    /// Milk profit as a percentage of sales.
    pub profit_margin: String,
    /// Litres bought minus litres sold.
    pub quantity_balance: Quantity,
    /// Average sale price minus average purchase price.
    pub price_spread: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentAnalytics {
    pub range: DateRange,
    pub buyer_payments: Vec<PaymentGroup>,
    pub seller_payments: Vec<PaymentGroup>,
}

/// Merges two per-day series, filling the missing side with zero.
fn merge_days(income: &[DayTotal], expense: &[DayTotal]) -> Vec<TrendPoint> {
    let mut days: BTreeMap<NaiveDate, (Money, Money)> = BTreeMap::new();
    for day in income {
        days.entry(day.date).or_default().0 += day.totals.amount;
    }
    for day in expense {
        days.entry(day.date).or_default().1 += day.totals.amount;
    }
    days.into_iter()
        .map(|(date, (income, expense))| TrendPoint {
            date,
            income,
            expense,
            profit: income - expense,
        })
        .collect()
}

impl Engine {
    async fn profit_summary(&self, range: DateRange) -> ResultEngine<ProfitSummary> {
        let income = self.ledger_totals(LedgerKind::Income, range).await?;
        let expense = self.ledger_totals(LedgerKind::Expense, range).await?;
        Ok(ProfitSummary::new(income.amount, expense.amount))
    }

    pub async fn dashboard_summary(&self, range: DateRange) -> ResultEngine<DashboardSummary> {
        Ok(DashboardSummary {
            range,
            buyers: self.count_counterparties(CounterpartyKind::Buyer).await?,
            sellers: self.count_counterparties(CounterpartyKind::Seller).await?,
            finance: self.profit_summary(range).await?,
            purchases: self.milk_totals_in(CounterpartyKind::Buyer, range).await?,
            sales: self.milk_totals_in(CounterpartyKind::Seller, range).await?,
            buyer_payments: self
                .payment_totals_in(CounterpartyKind::Buyer, range)
                .await?,
            seller_payments: self
                .payment_totals_in(CounterpartyKind::Seller, range)
                .await?,
        })
    }

    pub async fn financial_overview(&self, range: DateRange) -> ResultEngine<FinancialOverview> {
        Ok(FinancialOverview {
            range,
            summary: self.profit_summary(range).await?,
            income_breakdown: self.ledger_buckets(LedgerKind::Income, Some(range)).await?,
            expense_breakdown: self
                .ledger_categories(LedgerKind::Expense, Some(range))
                .await?,
        })
    }

    pub async fn daily_profit_loss(&self, date: NaiveDate) -> ResultEngine<DailyProfitLoss> {
        Ok(DailyProfitLoss {
            date,
            summary: self.profit_summary(DateRange::day(date)).await?,
        })
    }

    /// Days of the month with any income or expense, oldest first.
    pub async fn monthly_trends(&self, year: i32, month: u32) -> ResultEngine<MonthlyTrends> {
        let range = DateRange::month(year, month)?;
        let income = self.ledger_days(LedgerKind::Income, range).await?;
        let expense = self.ledger_days(LedgerKind::Expense, range).await?;
        Ok(MonthlyTrends {
            year,
            month,
            points: merge_days(&income, &expense),
        })
    }

    pub async fn milk_analytics(&self, range: DateRange) -> ResultEngine<MilkAnalytics> {
        let purchases = self.milk_totals_in(CounterpartyKind::Buyer, range).await?;
        let sales = self.milk_totals_in(CounterpartyKind::Seller, range).await?;
        let milk_profit = sales.amount - purchases.amount;
        Ok(MilkAnalytics {
            range,
            purchases,
            sales,
            milk_profit,
            profit_margin: milk_profit.percent_of(sales.amount),
            quantity_balance: purchases.quantity - sales.quantity,
            price_spread: sales.average_price - purchases.average_price,
        })
    }

    pub async fn dashboard_payment_analytics(
        &self,
        range: DateRange,
    ) -> ResultEngine<PaymentAnalytics> {
        Ok(PaymentAnalytics {
            range,
            buyer_payments: self
                .payment_analytics(CounterpartyKind::Buyer, range)
                .await?,
            seller_payments: self
                .payment_analytics(CounterpartyKind::Seller, range)
                .await?,
        })
    }
}
