//! HTTP surface of the milk dairy backend.
//!
//! Every success is wrapped in `{success: true, message, data}` and every
//! failure in `{success: false, message}`. All routes except `/`,
//! `/api/auth/register` and `/api/auth/login` need a bearer token.

use api_types::envelope::ApiFailure;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{ServerState, router, run_with_listener, spawn_with_listener};
pub use token::{Claims, TokenError, TokenSigner};

mod auth;
mod counterparties;
mod dashboard;
mod extract;
mod ledger;
mod milk;
mod params;
mod payments;
mod server;
mod side;
mod token;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// Malformed request, answered with 400.
    Generic(String),
    Unauthorized(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::Internal(_) | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            INTERNAL_MESSAGE.to_string()
        }
        EngineError::Internal(message) => {
            tracing::error!("internal error: {message}");
            INTERNAL_MESSAGE.to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(message) => (StatusCode::BAD_REQUEST, message),
            ServerError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
        };

        (status, Json(ApiFailure::new(message))).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<TokenError> for ServerError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Invalid | TokenError::Expired => Self::Unauthorized(value.to_string()),
            TokenError::Key(_) | TokenError::Encode(_) => {
                Self::Engine(EngineError::Internal(value.to_string()))
            }
        }
    }
}
