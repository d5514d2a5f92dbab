//! Dashboard API endpoints. Ranges default to the current month to date.

use api_types::{
    common::DateRangeQuery,
    dashboard::{
        CounterpartyCounts, DailyProfitLoss, DashboardSummary, FinancialOverview, MilkAnalytics,
        MilkFlow, MilkMargins, MilkOverview, MonthlyTrends, PaymentAnalytics, PaymentOverview,
        ProfitSummary, TrendPoint,
    },
    envelope::ApiResponse,
};
use axum::{Json, Router, extract::State, routing::get};
use chrono::{Local, NaiveDate};
use engine::{DateRange, MilkTotals};

use crate::{
    ServerError,
    extract::{ApiPath, ApiQuery},
    ledger::{bucket_view, category_view},
    params::{parse_date, range_or_month_to_date, range_view},
    payments::{group_view, totals_view},
    server::ServerState,
};

fn milk_flow(totals: MilkTotals) -> MilkFlow {
    MilkFlow {
        total_transactions: totals.count,
        total_quantity: totals.quantity.to_litres(),
        total_amount: totals.amount.to_major(),
        average_price: totals.average_price.to_major(),
    }
}

fn profit_view(summary: engine::ProfitSummary) -> ProfitSummary {
    ProfitSummary {
        total_income: summary.income.to_major(),
        total_expense: summary.expense.to_major(),
        net_profit: summary.net.to_major(),
        profit_margin: summary.margin,
    }
}

fn range(query: &DateRangeQuery) -> DateRange {
    range_or_month_to_date(query, today())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn routes() -> Router<ServerState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/financial-overview", get(financial_overview))
        .route("/daily-profit-loss/{date}", get(daily_profit_loss))
        .route("/monthly-trends/{year}/{month}", get(monthly_trends))
        .route("/milk-analytics", get(milk_analytics))
        .route("/payment-analytics", get(payment_analytics))
}

async fn summary(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ServerError> {
    let summary = state.engine.dashboard_summary(range(&query)).await?;
    Ok(Json(ApiResponse::ok(
        "Dashboard summary retrieved successfully",
        DashboardSummary {
            date_range: range_view(summary.range),
            counterparties: CounterpartyCounts {
                total_buyers: summary.buyers,
                total_sellers: summary.sellers,
            },
            finance: profit_view(summary.finance),
            milk: MilkOverview {
                purchases: milk_flow(summary.purchases),
                sales: milk_flow(summary.sales),
            },
            payments: PaymentOverview {
                buyer_payments: totals_view(summary.buyer_payments),
                seller_payments: totals_view(summary.seller_payments),
            },
        },
    )))
}

async fn financial_overview(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<FinancialOverview>>, ServerError> {
    let overview = state.engine.financial_overview(range(&query)).await?;
    Ok(Json(ApiResponse::ok(
        "Financial overview retrieved successfully",
        FinancialOverview {
            date_range: range_view(overview.range),
            summary: profit_view(overview.summary),
            income_breakdown: overview
                .income_breakdown
                .into_iter()
                .map(bucket_view)
                .collect(),
            expense_breakdown: overview
                .expense_breakdown
                .into_iter()
                .map(category_view)
                .collect(),
        },
    )))
}

async fn daily_profit_loss(
    State(state): State<ServerState>,
    ApiPath(date): ApiPath<String>,
) -> Result<Json<ApiResponse<DailyProfitLoss>>, ServerError> {
    let date = parse_date(&date)?;
    let day = state.engine.daily_profit_loss(date).await?;
    Ok(Json(ApiResponse::ok(
        "Daily profit/loss retrieved successfully",
        DailyProfitLoss {
            date: day.date,
            daily_income: day.summary.income.to_major(),
            daily_expense: day.summary.expense.to_major(),
            daily_profit: day.summary.net.to_major(),
            profit_margin: day.summary.margin,
        },
    )))
}

async fn monthly_trends(
    State(state): State<ServerState>,
    ApiPath((year, month)): ApiPath<(i32, u32)>,
) -> Result<Json<ApiResponse<MonthlyTrends>>, ServerError> {
    let trends = state.engine.monthly_trends(year, month).await?;
    Ok(Json(ApiResponse::ok(
        "Monthly trends retrieved successfully",
        MonthlyTrends {
            year: trends.year,
            month: trends.month,
            trends: trends
                .points
                .into_iter()
                .map(|point| TrendPoint {
                    date: point.date,
                    income: point.income.to_major(),
                    expense: point.expense.to_major(),
                    profit: point.profit.to_major(),
                })
                .collect(),
        },
    )))
}

async fn milk_analytics(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<MilkAnalytics>>, ServerError> {
    let analytics = state.engine.milk_analytics(range(&query)).await?;
    Ok(Json(ApiResponse::ok(
        "Milk business analytics retrieved successfully",
        MilkAnalytics {
            date_range: range_view(analytics.range),
            purchases: milk_flow(analytics.purchases),
            sales: milk_flow(analytics.sales),
            analysis: MilkMargins {
                milk_profit: analytics.milk_profit.to_major(),
                profit_margin: analytics.profit_margin,
                quantity_balance: analytics.quantity_balance.to_litres(),
                price_spread: analytics.price_spread.to_major(),
            },
        },
    )))
}

async fn payment_analytics(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<PaymentAnalytics>>, ServerError> {
    let analytics = state
        .engine
        .dashboard_payment_analytics(range(&query))
        .await?;
    Ok(Json(ApiResponse::ok(
        "Payment analytics retrieved successfully",
        PaymentAnalytics {
            date_range: range_view(analytics.range),
            buyer_payments: analytics
                .buyer_payments
                .into_iter()
                .map(group_view)
                .collect(),
            seller_payments: analytics
                .seller_payments
                .into_iter()
                .map(group_view)
                .collect(),
        },
    )))
}
