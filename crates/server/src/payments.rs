//! Buyer and seller payments API endpoints.

use api_types::{
    common::{DateRangeQuery, SearchQuery},
    envelope::{ApiResponse, Keyed, KeyedList},
    payment::{DailyPayments, PaymentGroup, PaymentSummary, PaymentTotals, PaymentUpdate},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use engine::{Money, PaymentFilter, PaymentMethod, PaymentPatch, PaymentType};

use crate::{
    ServerError,
    extract::{ApiJson, ApiPath, ApiQuery},
    params::{parse_date, range_view, required_range, search_term},
    server::ServerState,
    side::Side,
};

pub(crate) fn group_view(group: engine::PaymentGroup) -> PaymentGroup {
    PaymentGroup {
        payment_type: group.payment_type.to_string(),
        payment_method: group.payment_method.to_string(),
        total_payments: group.totals.count,
        total_amount: group.totals.amount.to_major(),
    }
}

pub(crate) fn totals_view(totals: engine::PaymentTotals) -> PaymentTotals {
    PaymentTotals {
        total_payments: totals.count,
        total_amount: totals.amount.to_major(),
    }
}

fn patch(body: PaymentUpdate) -> Result<PaymentPatch, ServerError> {
    Ok(PaymentPatch {
        amount: body.payment_amount.map(Money::from_major).transpose()?,
        payment_type: body
            .payment_type
            .as_deref()
            .map(PaymentType::from_input)
            .transpose()?,
        payment_method: body
            .payment_method
            .as_deref()
            .map(PaymentMethod::from_input)
            .transpose()?,
        transaction_id: body.transaction_id,
        notes: body.notes,
        date: body.date,
    })
}

pub fn routes<K: Side>() -> Router<ServerState> {
    Router::new()
        .route("/", post(create::<K>).get(list::<K>))
        .route("/search", get(search::<K>))
        .route("/date-range", get(date_range::<K>))
        .route("/daily-report/{date}", get(daily_report::<K>))
        .route(&format!("/{}/{{id}}", K::ONE), get(by_counterparty::<K>))
        .route(&format!("/{}/{{id}}/summary", K::ONE), get(summary::<K>))
        .route(
            "/{id}",
            get(get_one::<K>).put(update::<K>).delete(delete::<K>),
        )
}

async fn create<K: Side>(
    State(state): State<ServerState>,
    ApiJson(body): ApiJson<K::PaymentNew>,
) -> Result<(StatusCode, Json<ApiResponse<Keyed<K::PaymentRecord>>>), ServerError> {
    let payment = state
        .engine
        .create_payment(K::KIND, K::payment_input(body)?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            format!("{} payment recorded successfully", K::KIND.label()),
            Keyed {
                key: "payment",
                value: K::payment_record(payment),
            },
        )),
    ))
}

async fn list<K: Side>(
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<KeyedList<K::PaymentRecord>>>, ServerError> {
    let payments = state
        .engine
        .list_payments(K::KIND, PaymentFilter::All)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Payments retrieved successfully",
        KeyedList::new(
            "payments",
            payments.into_iter().map(K::payment_record).collect(),
        ),
    )))
}

async fn search<K: Side>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<KeyedList<K::PaymentRecord>>>, ServerError> {
    let term = search_term(query)?;
    let payments = state.engine.search_payments(K::KIND, &term).await?;
    Ok(Json(ApiResponse::ok(
        "Search completed successfully",
        KeyedList::new(
            "payments",
            payments.into_iter().map(K::payment_record).collect(),
        ),
    )))
}

async fn date_range<K: Side>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<KeyedList<K::PaymentRecord>>>, ServerError> {
    let range = required_range(&query)?;
    let payments = state
        .engine
        .list_payments(K::KIND, PaymentFilter::Range(range))
        .await?;
    let total: Money = payments.iter().map(|payment| payment.amount).sum();
    Ok(Json(ApiResponse::ok(
        "Payments retrieved successfully",
        KeyedList::new(
            "payments",
            payments.into_iter().map(K::payment_record).collect(),
        )
        .with_range(total.to_major(), range_view(range)),
    )))
}

async fn daily_report<K: Side>(
    State(state): State<ServerState>,
    ApiPath(date): ApiPath<String>,
) -> Result<Json<ApiResponse<DailyPayments<K::PaymentRecord>>>, ServerError> {
    let date = parse_date(&date)?;
    let day = state.engine.payments_on(K::KIND, date).await?;
    Ok(Json(ApiResponse::ok(
        "Daily payment report retrieved successfully",
        DailyPayments {
            date: day.date,
            payments: day.payments.into_iter().map(K::payment_record).collect(),
            total_payments: day.totals.count,
            total_amount: day.totals.amount.to_major(),
        },
    )))
}

async fn by_counterparty<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<KeyedList<K::PaymentRecord>>>, ServerError> {
    state.engine.counterparty(K::KIND, id).await?;
    let payments = state
        .engine
        .list_payments(K::KIND, PaymentFilter::Counterparty(id))
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{} payments retrieved successfully", K::KIND.label()),
        KeyedList::new(
            "payments",
            payments.into_iter().map(K::payment_record).collect(),
        ),
    )))
}

async fn summary<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Keyed<PaymentSummary>>>, ServerError> {
    let summary = state.engine.payment_summary(K::KIND, id).await?;
    Ok(Json(ApiResponse::ok(
        "Payment summary retrieved successfully",
        Keyed {
            key: "summary",
            value: PaymentSummary {
                counterparty_id: summary.counterparty.id,
                counterparty_name: summary.counterparty.full_name,
                total_payments: summary.totals.count,
                total_amount: summary.totals.amount.to_major(),
                breakdown: summary.groups.into_iter().map(group_view).collect(),
            },
        },
    )))
}

async fn get_one<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Keyed<K::PaymentRecord>>>, ServerError> {
    let payment = state.engine.payment(K::KIND, id).await?;
    Ok(Json(ApiResponse::ok(
        "Payment retrieved successfully",
        Keyed {
            key: "payment",
            value: K::payment_record(payment),
        },
    )))
}

async fn update<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<PaymentUpdate>,
) -> Result<Json<ApiResponse<Keyed<K::PaymentRecord>>>, ServerError> {
    let payment = state
        .engine
        .update_payment(K::KIND, id, patch(body)?)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Payment updated successfully",
        Keyed {
            key: "payment",
            value: K::payment_record(payment),
        },
    )))
}

async fn delete<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<()>>, ServerError> {
    state.engine.delete_payment(K::KIND, id).await?;
    Ok(Json(ApiResponse::done("Payment deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_parses_present_fields_only() {
        let body = PaymentUpdate {
            payment_amount: Some(250.5),
            payment_method: Some("upi".to_string()),
            ..PaymentUpdate::default()
        };
        let patch = patch(body).unwrap();
        assert_eq!(patch.amount, Some(Money::new(25_050)));
        assert_eq!(patch.payment_method, Some(PaymentMethod::Upi));
        assert_eq!(patch.payment_type, None);
        assert!(!patch.is_empty());
    }

    #[test]
    fn patch_ignores_case() {
        let body = PaymentUpdate {
            payment_type: Some("Full".to_string()),
            payment_method: Some(" UPI ".to_string()),
            ..PaymentUpdate::default()
        };
        let patch = patch(body).unwrap();
        assert_eq!(patch.payment_type, Some(PaymentType::Full));
        assert_eq!(patch.payment_method, Some(PaymentMethod::Upi));
    }

    #[test]
    fn patch_rejects_unknown_method() {
        let body = PaymentUpdate {
            payment_method: Some("crypto".to_string()),
            ..PaymentUpdate::default()
        };
        assert!(patch(body).is_err());
    }
}
