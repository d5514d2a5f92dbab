//! Account API endpoints and the bearer-token guard.

use api_types::{
    auth::{Credentials, Login, PasswordChange, User},
    envelope::{ApiResponse, Keyed, KeyedList},
};
use axum::{
    Extension, Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use engine::EngineError;

use crate::{
    ServerError,
    extract::{ApiJson, ApiPath},
    server::ServerState,
};

fn user_view(user: engine::User) -> User {
    User {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
    }
}

/// Resolves the bearer token to a live user and stores it in the request
/// extensions.
pub async fn require_user(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>()
    else {
        return Err(ServerError::Unauthorized(
            "Access denied. No token provided.".to_string(),
        ));
    };

    let claims = state.tokens.verify(bearer.token()).inspect_err(|err| {
        tracing::warn!(path = %request.uri().path(), "rejected bearer token: {err}");
    })?;

    let user = match state.engine.user(claims.user_id).await {
        Ok(user) => user,
        Err(EngineError::KeyNotFound(_)) => {
            return Err(ServerError::Unauthorized(
                "User no longer exists.".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub async fn register(
    State(state): State<ServerState>,
    ApiJson(body): ApiJson<Credentials>,
) -> Result<(StatusCode, Json<ApiResponse<Keyed<User>>>), ServerError> {
    let user = state
        .engine
        .register_user(&body.username, &body.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "User registered successfully",
            Keyed {
                key: "user",
                value: user_view(user),
            },
        )),
    ))
}

pub async fn login(
    State(state): State<ServerState>,
    ApiJson(body): ApiJson<Credentials>,
) -> Result<Json<ApiResponse<Login>>, ServerError> {
    let user = state
        .engine
        .authenticate(&body.username, &body.password)
        .await
        .inspect_err(|err| {
            if matches!(err, EngineError::Unauthorized(_)) {
                tracing::warn!(username = %body.username.trim(), "failed login");
            }
        })?;
    let token = state.tokens.issue(user.id, &user.username)?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(ApiResponse::ok(
        "Login successful",
        Login {
            user: user_view(user),
            token,
        },
    )))
}

pub async fn profile(
    Extension(user): Extension<engine::User>,
) -> Result<Json<ApiResponse<Keyed<User>>>, ServerError> {
    Ok(Json(ApiResponse::ok(
        "Profile retrieved successfully",
        Keyed {
            key: "user",
            value: user_view(user),
        },
    )))
}

pub async fn change_password(
    Extension(user): Extension<engine::User>,
    State(state): State<ServerState>,
    ApiJson(body): ApiJson<PasswordChange>,
) -> Result<Json<ApiResponse<()>>, ServerError> {
    state
        .engine
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(ApiResponse::done("Password changed successfully")))
}

pub async fn list_users(
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<KeyedList<User>>>, ServerError> {
    let users = state.engine.list_users().await?;
    Ok(Json(ApiResponse::ok(
        "Users retrieved successfully",
        KeyedList::new("users", users.into_iter().map(user_view).collect()),
    )))
}

pub async fn delete_user(
    Extension(user): Extension<engine::User>,
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<()>>, ServerError> {
    state.engine.delete_user(id, user.id).await?;
    Ok(Json(ApiResponse::done("User deleted successfully")))
}
