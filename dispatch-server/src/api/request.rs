//! Request API Handlers
//!
//! HTTP endpoints for creating and reading request records. This is the
//! storage-layer boundary: malformed job names are rejected here, before the
//! controller ever sees the record. The controller remains the only writer of
//! a record's status; callers can only read it back.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use dispatch_controller::worker::Trigger;
use dispatch_core::domain::request::{Request, is_valid_job_name};
use dispatch_core::dto::request::CreateRequest;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::repository::request_repository;

/// POST /request/create
/// Create a new request record and trigger its first reconciliation
pub async fn create_request(
    State(state): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<Request>)> {
    if req.requester.is_empty() {
        return Err(ApiError::BadRequest("requester cannot be empty".to_string()));
    }

    if !is_valid_job_name(&req.requested_job) {
        return Err(ApiError::BadRequest(format!(
            "requested_job {:?} must match [a-z0-9]([-a-z0-9]*[a-z0-9])?",
            req.requested_job
        )));
    }

    tracing::info!(
        "Creating request for job {} from {}",
        req.requested_job,
        req.requester
    );

    let record = request_repository::create(&state.pool, req).await?;

    // Record creation is one of the trigger sources; a full channel or a
    // stopped worker must not fail the create, resync will catch up.
    if state
        .triggers
        .send(Trigger {
            request_id: record.id,
        })
        .is_err()
    {
        tracing::warn!("Controller worker is not consuming triggers");
    }

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /request/{id}
/// Get a request record with its current status
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Request>> {
    tracing::debug!("Getting request: {}", id);

    let record = request_repository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Request {} not found", id)))?;

    Ok(Json(record))
}

/// GET /request/list
/// List all request records
pub async fn list_requests(State(state): State<AppState>) -> ApiResult<Json<Vec<Request>>> {
    tracing::debug!("Listing all requests");

    let records = request_repository::list_all(&state.pool).await?;

    Ok(Json(records))
}
