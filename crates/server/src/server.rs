use std::{future::Future, sync::Arc, time::Instant};

use api_types::{common::Welcome, envelope::ApiResponse};
use axum::{
    Json, Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use engine::Engine;
use tracing::Instrument;

use crate::{
    ServerError, TokenSigner, auth, counterparties, dashboard,
    ledger::{self, ExpenseBook, IncomeBook},
    milk, payments,
    side::{Buyers, Sellers},
};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub tokens: Arc<TokenSigner>,
}

impl ServerState {
    pub fn new(engine: Engine, tokens: TokenSigner) -> Self {
        Self {
            engine: Arc::new(engine),
            tokens: Arc::new(tokens),
        }
    }
}

/// Wraps each request in an `http.request` span and logs its outcome.
async fn trace_request(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        path = %request.uri().path(),
    );
    async move {
        let started = Instant::now();
        let response = next.run(request).await;
        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}

async fn welcome() -> Json<ApiResponse<Welcome>> {
    Json(ApiResponse::ok(
        "Welcome to the Milk Dairy API",
        Welcome {
            name: "milk-dairy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "running".to_string(),
        },
    ))
}

async fn not_found() -> ServerError {
    ServerError::Engine(engine::EngineError::KeyNotFound(
        "Route not found".to_string(),
    ))
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/auth/change-password", put(auth::change_password))
        .route("/api/auth/users", get(auth::list_users))
        .route("/api/auth/users/{id}", delete(auth::delete_user))
        .nest("/api/buyers", counterparties::routes::<Buyers>())
        .nest("/api/sellers", counterparties::routes::<Sellers>())
        .nest("/api/milk-store", milk::routes::<Buyers>())
        .nest(
            "/api/milk-distribution",
            milk::routes::<Sellers>().route("/profit-analysis", get(milk::profit_analysis)),
        )
        .nest("/api/buyer-payments", payments::routes::<Buyers>())
        .nest("/api/seller-payments", payments::routes::<Sellers>())
        .nest(
            "/api/income",
            ledger::routes::<IncomeBook>().route("/categories", get(ledger::buckets::<IncomeBook>)),
        )
        .nest(
            "/api/expense",
            ledger::routes::<ExpenseBook>()
                .route("/categories", get(ledger::categories::<ExpenseBook>))
                .route("/breakdown", get(ledger::buckets::<ExpenseBook>))
                .route("/category/{category}", get(ledger::by_category::<ExpenseBook>)),
        )
        .nest("/api/dashboard", dashboard::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_user,
        ));

    Router::new()
        .route("/", get(welcome))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .fallback(not_found)
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener, std::future::pending()).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
