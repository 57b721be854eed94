//! Job Template API Handlers
//!
//! HTTP endpoints for registering and reading job templates. Templates are
//! managed by operators of the privileged side, not by tenants.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use dispatch_core::domain::job::JobTemplate;
use dispatch_core::domain::request::is_valid_job_name;
use dispatch_core::dto::template::CreateTemplate;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::repository::template_repository;

/// POST /template/create
/// Register or update a job template
pub async fn create_template(
    State(state): State<AppState>,
    Json(req): Json<CreateTemplate>,
) -> ApiResult<(StatusCode, Json<JobTemplate>)> {
    if !is_valid_job_name(&req.name) {
        return Err(ApiError::BadRequest(format!(
            "template name {:?} must match [a-z0-9]([-a-z0-9]*[a-z0-9])?",
            req.name
        )));
    }

    tracing::info!("Registering job template: {}", req.name);

    let template = template_repository::upsert(&state.pool, req).await?;

    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /template/{name}
/// Get a job template by name
pub async fn get_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<JobTemplate>> {
    tracing::debug!("Getting template: {}", name);

    let template = template_repository::find_by_name(&state.pool, &name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Template {} not found", name)))?;

    Ok(Json(template))
}

/// GET /template/list
/// List all job templates
pub async fn list_templates(State(state): State<AppState>) -> ApiResult<Json<Vec<JobTemplate>>> {
    tracing::debug!("Listing all templates");

    let templates = template_repository::list_all(&state.pool).await?;

    Ok(Json(templates))
}

/// DELETE /template/{name}
/// Delete a job template
pub async fn delete_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting template: {}", name);

    let deleted = template_repository::delete(&state.pool, &name).await?;

    if !deleted {
        return Err(ApiError::NotFound(format!("Template {} not found", name)));
    }

    Ok(StatusCode::NO_CONTENT)
}
