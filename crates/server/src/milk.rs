//! Milk purchases (`/api/milk-store`) and sales (`/api/milk-distribution`).

use api_types::{
    common::{DateRangeQuery, SearchQuery},
    envelope::{ApiResponse, Keyed, KeyedList},
    milk::{
        MilkDailyReport, MilkDayRow, MilkListQuery, MilkSummary, MilkTypeSummary,
        ProfitAnalysis, ProfitAnalysisRow,
    },
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use engine::{CounterpartyKind, MilkFilter, MilkType};

use crate::{
    ServerError,
    extract::{ApiJson, ApiPath, ApiQuery},
    params::{optional_range, parse_date, range_view, search_term, single_filter},
    server::ServerState,
    side::Side,
};

/// The list filter and whether counterparty details were asked for.
fn list_filter(
    id_param: &str,
    counterparty: Option<i64>,
    query: &MilkListQuery,
) -> Result<(MilkFilter, bool), ServerError> {
    let range = optional_range(&DateRangeQuery {
        start_date: query.start_date,
        end_date: query.end_date,
    })?;
    let details = query.include_details.unwrap_or(false);
    single_filter(&[
        (id_param, counterparty.is_some()),
        ("milkType", query.milk_type.is_some()),
        ("startDate/endDate", range.is_some()),
        ("includeDetails", details),
    ])?;

    let filter = if let Some(id) = counterparty {
        MilkFilter::Counterparty(id)
    } else if let Some(milk_type) = query.milk_type.as_deref() {
        MilkFilter::MilkType(MilkType::from_input(milk_type)?)
    } else if let Some(range) = range {
        MilkFilter::Range(range)
    } else {
        MilkFilter::All
    };
    Ok((filter, details))
}

pub fn routes<K: Side>() -> Router<ServerState> {
    Router::new()
        .route("/", post(create::<K>).get(list::<K>))
        .route("/search", get(search::<K>))
        .route("/summary", get(summary::<K>))
        .route("/daily-report/{date}", get(daily_report::<K>))
        .route(
            "/{id}",
            get(get_one::<K>).put(update::<K>).delete(delete::<K>),
        )
}

async fn create<K: Side>(
    State(state): State<ServerState>,
    ApiJson(body): ApiJson<K::MilkNew>,
) -> Result<(StatusCode, Json<ApiResponse<Keyed<K::MilkRecord>>>), ServerError> {
    let entry = state
        .engine
        .create_milk_entry(K::KIND, K::milk_input(body)?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            format!("{} recorded successfully", K::KIND.milk_label()),
            Keyed {
                key: K::MILK_ONE,
                value: K::milk_record(entry),
            },
        )),
    ))
}

async fn list<K: Side>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<MilkListQuery>,
) -> Result<Json<ApiResponse<KeyedList<K::MilkRecord>>>, ServerError> {
    let id_param = format!("{}Id", K::ONE);
    let (filter, details) = list_filter(&id_param, K::milk_counterparty(&query), &query)?;
    let entries = state
        .engine
        .list_milk_entries(K::KIND, filter, details)
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{}s retrieved successfully", K::KIND.milk_label()),
        KeyedList::new(
            K::MILK_MANY,
            entries.into_iter().map(K::milk_record).collect(),
        ),
    )))
}

async fn search<K: Side>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<KeyedList<K::MilkRecord>>>, ServerError> {
    let term = search_term(query)?;
    let entries = state.engine.search_milk_entries(K::KIND, &term).await?;
    Ok(Json(ApiResponse::ok(
        "Search completed successfully",
        KeyedList::new(
            K::MILK_MANY,
            entries.into_iter().map(K::milk_record).collect(),
        ),
    )))
}

async fn summary<K: Side>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<MilkSummary>>, ServerError> {
    let range = optional_range(&query)?;
    let rows = state.engine.milk_summary(K::KIND, range).await?;
    let summary = rows
        .into_iter()
        .map(|row| MilkTypeSummary {
            milk_type: row.milk_type.to_string(),
            total_transactions: row.count,
            total_quantity: row.quantity.to_litres(),
            total_amount: row.amount.to_major(),
            avg_price: row.average_price.to_major(),
            unique_counterparties: row.counterparties,
        })
        .collect();
    Ok(Json(ApiResponse::ok(
        format!("{} summary retrieved successfully", K::KIND.milk_label()),
        MilkSummary {
            date_range: range.map(range_view),
            summary,
        },
    )))
}

async fn daily_report<K: Side>(
    State(state): State<ServerState>,
    ApiPath(date): ApiPath<String>,
) -> Result<Json<ApiResponse<MilkDailyReport>>, ServerError> {
    let date = parse_date(&date)?;
    let rows = state.engine.milk_daily_report(K::KIND, date).await?;
    let report = rows
        .into_iter()
        .map(|row| MilkDayRow {
            milk_type: row.milk_type.to_string(),
            total_transactions: row.count,
            total_quantity: row.quantity.to_litres(),
            total_amount: row.amount.to_major(),
            avg_price: row.average_price.to_major(),
            min_price: row.min_price.to_major(),
            max_price: row.max_price.to_major(),
        })
        .collect();
    Ok(Json(ApiResponse::ok(
        "Daily milk report retrieved successfully",
        MilkDailyReport { date, report },
    )))
}

async fn get_one<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Keyed<K::MilkRecord>>>, ServerError> {
    let entry = state.engine.milk_entry(K::KIND, id).await?;
    Ok(Json(ApiResponse::ok(
        format!("{} retrieved successfully", K::KIND.milk_label()),
        Keyed {
            key: K::MILK_ONE,
            value: K::milk_record(entry),
        },
    )))
}

async fn update<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<K::MilkNew>,
) -> Result<Json<ApiResponse<Keyed<K::MilkRecord>>>, ServerError> {
    let entry = state
        .engine
        .update_milk_entry(K::KIND, id, K::milk_input(body)?)
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{} updated successfully", K::KIND.milk_label()),
        Keyed {
            key: K::MILK_ONE,
            value: K::milk_record(entry),
        },
    )))
}

async fn delete<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<()>>, ServerError> {
    state.engine.delete_milk_entry(K::KIND, id).await?;
    Ok(Json(ApiResponse::done(format!(
        "{} deleted successfully",
        K::KIND.milk_label()
    ))))
}

/// Sales against purchases per milk type. Mounted under milk sales only.
pub async fn profit_analysis(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<ProfitAnalysis>>, ServerError> {
    let range = optional_range(&query)?;
    let rows = state.engine.milk_profit_analysis(range).await?;
    let analysis = rows
        .into_iter()
        .map(|row| ProfitAnalysisRow {
            kind: match row.kind {
                CounterpartyKind::Seller => "Sales",
                CounterpartyKind::Buyer => "Purchases",
            }
            .to_string(),
            milk_type: row.milk_type.to_string(),
            total_transactions: row.count,
            total_quantity: row.quantity.to_litres(),
            total_amount: row.amount.to_major(),
            avg_price: row.average_price.to_major(),
        })
        .collect();
    Ok(Json(ApiResponse::ok(
        "Profit analysis retrieved successfully",
        ProfitAnalysis {
            date_range: range.map(range_view),
            analysis,
        },
    )))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn single_filter_is_selected() {
        let query = MilkListQuery {
            milk_type: Some("Buffalo".to_string()),
            ..MilkListQuery::default()
        };
        let (filter, details) = list_filter("buyerId", None, &query).unwrap();
        assert_eq!(filter, MilkFilter::MilkType(MilkType::Buffalo));
        assert!(!details);

        let (filter, details) =
            list_filter("buyerId", None, &MilkListQuery::default()).unwrap();
        assert_eq!(filter, MilkFilter::All);
        assert!(!details);
    }

    #[test]
    fn combined_filters_are_rejected() {
        let day = NaiveDate::from_ymd_opt(2025, 8, 25);
        let query = MilkListQuery {
            buyer_id: Some(1),
            start_date: day,
            end_date: day,
            ..MilkListQuery::default()
        };
        assert!(list_filter("buyerId", Some(1), &query).is_err());

        let query = MilkListQuery {
            milk_type: Some("cow".to_string()),
            include_details: Some(true),
            ..MilkListQuery::default()
        };
        assert!(list_filter("buyerId", None, &query).is_err());
    }

    #[test]
    fn details_alone_lists_everything() {
        let query = MilkListQuery {
            include_details: Some(true),
            ..MilkListQuery::default()
        };
        let (filter, details) = list_filter("sellerId", None, &query).unwrap();
        assert_eq!(filter, MilkFilter::All);
        assert!(details);
    }
}
