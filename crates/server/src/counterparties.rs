//! Buyers and sellers API endpoints.

use api_types::{
    common::SearchQuery,
    counterparty::{
        Counterparty, CounterpartyAccount, CounterpartyGetQuery, CounterpartyListQuery,
        CounterpartyNew, CounterpartyView, MilkTransactions, PaymentsMade,
    },
    envelope::{ApiResponse, Keyed, KeyedList},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use engine::{CounterpartyFilter, CounterpartyInput};

use crate::{
    ServerError,
    extract::{ApiJson, ApiPath, ApiQuery},
    params::{search_term, single_filter},
    server::ServerState,
    side::Side,
};

pub(crate) fn counterparty_view(counterparty: engine::Counterparty) -> Counterparty {
    Counterparty {
        id: counterparty.id,
        full_name: counterparty.full_name,
        mobile_number: counterparty.mobile_number,
        city: counterparty.city,
        created_at: counterparty.created_at,
    }
}

fn account_view(account: engine::CounterpartyAccount) -> CounterpartyAccount {
    CounterpartyAccount {
        counterparty: counterparty_view(account.counterparty),
        milk_transactions: MilkTransactions {
            total_transactions: account.milk.count,
            total_quantity: account.milk.quantity.to_litres(),
            total_amount: account.milk.amount.to_major(),
            avg_price: account.milk.average_price.to_major(),
        },
        payments: PaymentsMade {
            total_payments: account.payments.count,
            total_paid: account.payments.amount.to_major(),
        },
        outstanding_amount: account.outstanding.to_major(),
    }
}

fn input(body: CounterpartyNew) -> CounterpartyInput {
    CounterpartyInput {
        full_name: body.full_name,
        mobile_number: body.mobile_number,
        city: body.city,
    }
}

fn list_filter(query: CounterpartyListQuery) -> Result<CounterpartyFilter, ServerError> {
    single_filter(&[
        ("city", query.city.is_some()),
        ("search", query.search.is_some()),
    ])?;
    Ok(match (query.city, query.search) {
        (Some(city), _) => CounterpartyFilter::City(city),
        (_, Some(term)) => CounterpartyFilter::Search(term),
        (None, None) => CounterpartyFilter::All,
    })
}

pub fn routes<K: Side>() -> Router<ServerState> {
    Router::new()
        .route("/", post(create::<K>).get(list::<K>))
        .route("/search", get(search::<K>))
        .route(
            "/{id}",
            get(get_one::<K>).put(update::<K>).delete(delete::<K>),
        )
}

async fn create<K: Side>(
    State(state): State<ServerState>,
    ApiJson(body): ApiJson<CounterpartyNew>,
) -> Result<(StatusCode, Json<ApiResponse<Keyed<Counterparty>>>), ServerError> {
    let counterparty = state
        .engine
        .create_counterparty(K::KIND, input(body))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            format!("{} created successfully", K::KIND.label()),
            Keyed {
                key: K::ONE,
                value: counterparty_view(counterparty),
            },
        )),
    ))
}

async fn list<K: Side>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<CounterpartyListQuery>,
) -> Result<Json<ApiResponse<KeyedList<Counterparty>>>, ServerError> {
    let filter = list_filter(query)?;
    let counterparties = state.engine.list_counterparties(K::KIND, filter).await?;
    Ok(Json(ApiResponse::ok(
        format!("{}s retrieved successfully", K::KIND.label()),
        KeyedList::new(
            K::MANY,
            counterparties.into_iter().map(counterparty_view).collect(),
        ),
    )))
}

async fn search<K: Side>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<KeyedList<Counterparty>>>, ServerError> {
    let term = search_term(query)?;
    let counterparties = state.engine.search_counterparties(K::KIND, &term).await?;
    Ok(Json(ApiResponse::ok(
        "Search completed successfully",
        KeyedList::new(
            K::MANY,
            counterparties.into_iter().map(counterparty_view).collect(),
        ),
    )))
}

async fn get_one<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<CounterpartyGetQuery>,
) -> Result<Json<ApiResponse<Keyed<CounterpartyView>>>, ServerError> {
    let view = if query.include_transactions.unwrap_or(false) {
        CounterpartyView::Account(account_view(
            state.engine.counterparty_account(K::KIND, id).await?,
        ))
    } else {
        CounterpartyView::Plain(counterparty_view(
            state.engine.counterparty(K::KIND, id).await?,
        ))
    };
    Ok(Json(ApiResponse::ok(
        format!("{} retrieved successfully", K::KIND.label()),
        Keyed {
            key: K::ONE,
            value: view,
        },
    )))
}

async fn update<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CounterpartyNew>,
) -> Result<Json<ApiResponse<Keyed<Counterparty>>>, ServerError> {
    let counterparty = state
        .engine
        .update_counterparty(K::KIND, id, input(body))
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{} updated successfully", K::KIND.label()),
        Keyed {
            key: K::ONE,
            value: counterparty_view(counterparty),
        },
    )))
}

async fn delete<K: Side>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<()>>, ServerError> {
    state.engine.delete_counterparty(K::KIND, id).await?;
    Ok(Json(ApiResponse::done(format!(
        "{} deleted successfully",
        K::KIND.label()
    ))))
}
