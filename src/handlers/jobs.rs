use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde_json::{Map, Value};

use super::Deleted;
use crate::app::AppState;
use crate::database::models::job::validate_changes;
use crate::database::models::{Job, JobFilter, NewJob};
use crate::database::JobRepository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /jobs - admin
pub async fn create(State(state): State<AppState>, payload: Result<Json<NewJob>, JsonRejection>) -> ApiResult<Job> {
    let Json(job) = payload?;
    job.validate()
        .map_err(|errors| ApiError::validation_error("Invalid job", Some(errors)))?;

    let created = JobRepository::new(state.db.as_ref()).create(&job).await?;
    Ok(ApiResponse::created(created))
}

/// GET /jobs?title=&minSalary=&hasEquity=
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<JobFilter>, QueryRejection>,
) -> ApiResult<Vec<Job>> {
    let Query(filter) = query?;
    let jobs = JobRepository::new(state.db.as_ref()).list(&filter).await?;
    Ok(ApiResponse::success(jobs))
}

/// GET /jobs/:title
pub async fn get(State(state): State<AppState>, Path(title): Path<String>) -> ApiResult<Job> {
    let job = JobRepository::new(state.db.as_ref()).get(&title).await?;
    Ok(ApiResponse::success(job))
}

/// PATCH /jobs/:title - admin
pub async fn update(
    State(state): State<AppState>,
    Path(title): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Job> {
    let Json(fields) = payload?;
    validate_changes(&fields).map_err(|errors| ApiError::validation_error("Invalid job", Some(errors)))?;

    let job = JobRepository::new(state.db.as_ref()).update(&title, &fields).await?;
    Ok(ApiResponse::success(job))
}

/// DELETE /jobs/:title - admin
pub async fn remove(State(state): State<AppState>, Path(title): Path<String>) -> ApiResult<Deleted> {
    JobRepository::new(state.db.as_ref()).remove(&title).await?;
    Ok(ApiResponse::success(Deleted { deleted: title }))
}
