use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use super::Deleted;
use crate::app::AppState;
use crate::auth::{create_token, Claims};
use crate::database::models::user::validate_changes;
use crate::database::models::{NewUser, User};
use crate::database::UserRepository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// A newly created user and a token for them.
#[derive(Debug, Serialize)]
pub struct UserToken {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct Applied {
    pub applied: i32,
}

/// POST /users - admin; may create other admins
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<UserToken> {
    let Json(user) = payload?;
    user.validate()
        .map_err(|errors| ApiError::validation_error("Invalid user", Some(errors)))?;

    let created = UserRepository::new(state.db.as_ref(), state.hasher.as_ref())
        .register(&user)
        .await?;
    let token = create_token(&Claims::new(&created.username, created.is_admin))?;
    Ok(ApiResponse::created(UserToken { user: created, token }))
}

/// GET /users - admin
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = UserRepository::new(state.db.as_ref(), state.hasher.as_ref()).list().await?;
    Ok(ApiResponse::success(users))
}

/// GET /users/:username - same user or admin; includes applied job ids
pub async fn get(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<User> {
    let user = UserRepository::new(state.db.as_ref(), state.hasher.as_ref())
        .get(&username)
        .await?;
    Ok(ApiResponse::success(user))
}

/// PATCH /users/:username - same user or admin; only admins change `isAdmin`
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(username): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<User> {
    let Json(fields) = payload?;
    if fields.contains_key("isAdmin") && !caller.is_admin {
        return Err(ApiError::unauthorized("Only admins can change admin rights"));
    }
    validate_changes(&fields).map_err(|errors| ApiError::validation_error("Invalid user", Some(errors)))?;

    let user = UserRepository::new(state.db.as_ref(), state.hasher.as_ref())
        .update(&username, &fields)
        .await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /users/:username - same user or admin
pub async fn remove(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<Deleted> {
    UserRepository::new(state.db.as_ref(), state.hasher.as_ref())
        .remove(&username)
        .await?;
    Ok(ApiResponse::success(Deleted { deleted: username }))
}

/// POST /users/:username/job/:id - same user or admin
pub async fn apply(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, i32)>,
) -> ApiResult<Applied> {
    UserRepository::new(state.db.as_ref(), state.hasher.as_ref())
        .apply_to_job(&username, id)
        .await?;
    Ok(ApiResponse::success(Applied { applied: id }))
}
