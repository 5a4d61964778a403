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
use crate::database::models::company::validate_changes;
use crate::database::models::{Company, CompanyFilter, CompanySummary, NewCompany};
use crate::database::CompanyRepository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /companies - admin
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewCompany>, JsonRejection>,
) -> ApiResult<Company> {
    let Json(company) = payload?;
    company
        .validate()
        .map_err(|errors| ApiError::validation_error("Invalid company", Some(errors)))?;

    let created = CompanyRepository::new(state.db.as_ref()).create(&company).await?;
    Ok(ApiResponse::created(created))
}

/// GET /companies?minEmployees=&maxEmployees=&nameLike=
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<CompanyFilter>, QueryRejection>,
) -> ApiResult<Vec<CompanySummary>> {
    let Query(filter) = query?;
    let companies = CompanyRepository::new(state.db.as_ref()).list(&filter).await?;
    Ok(ApiResponse::success(companies))
}

/// GET /companies/:handle - includes the company's jobs
pub async fn get(State(state): State<AppState>, Path(handle): Path<String>) -> ApiResult<Company> {
    let company = CompanyRepository::new(state.db.as_ref()).get(&handle).await?;
    Ok(ApiResponse::success(company))
}

/// PATCH /companies/:handle - admin
pub async fn update(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Company> {
    let Json(fields) = payload?;
    validate_changes(&fields).map_err(|errors| ApiError::validation_error("Invalid company", Some(errors)))?;

    let company = CompanyRepository::new(state.db.as_ref()).update(&handle, &fields).await?;
    Ok(ApiResponse::success(company))
}

/// DELETE /companies/:handle - admin
pub async fn remove(State(state): State<AppState>, Path(handle): Path<String>) -> ApiResult<Deleted> {
    CompanyRepository::new(state.db.as_ref()).remove(&handle).await?;
    Ok(ApiResponse::success(Deleted { deleted: handle }))
}
