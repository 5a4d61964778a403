use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{create_token, Claims};
use crate::database::models::{Credentials, NewUser};
use crate::database::UserRepository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct Token {
    pub token: String,
}

/// POST /auth/token - exchange a username and password for a token
pub async fn token(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Token> {
    let Json(credentials) = payload?;
    let user = UserRepository::new(state.db.as_ref(), state.hasher.as_ref())
        .authenticate(&credentials.username, &credentials.password)
        .await?;
    let token = create_token(&Claims::new(&user.username, user.is_admin))?;
    Ok(ApiResponse::success(Token { token }))
}

/// POST /auth/register - self sign-up; never grants admin
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<Token> {
    let Json(mut user) = payload?;
    user.is_admin = false;
    user.validate()
        .map_err(|errors| ApiError::validation_error("Invalid user", Some(errors)))?;

    let created = UserRepository::new(state.db.as_ref(), state.hasher.as_ref())
        .register(&user)
        .await?;
    let token = create_token(&Claims::new(&created.username, false))?;
    Ok(ApiResponse::created(Token { token }))
}

/// GET /auth/whoami - the caller named by the bearer token
pub async fn whoami(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "username": user.username,
        "isAdmin": user.is_admin,
    })))
}
