//! Request Repository
//!
//! Handles all database operations related to request records. The status
//! columns (condition, timestamps, results) are always written together in a
//! single UPDATE so a crash never leaves them half-updated.

use dispatch_core::domain::request::{
    Condition, ConditionReason, ConditionStatus, Request, RequestSpec, RequestStatus,
};
use dispatch_core::dto::request::CreateRequest;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new request record in the database
pub async fn create(pool: &PgPool, req: CreateRequest) -> Result<Request, sqlx::Error> {
    let record = Request::new(
        req.requester,
        RequestSpec {
            requested_job: req.requested_job,
            parameters: req.parameters,
        },
    );

    sqlx::query(
        r#"
        INSERT INTO requests (id, requester, requested_job, parameters, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(record.id)
    .bind(&record.requester)
    .bind(&record.spec.requested_job)
    .bind(serde_json::to_value(&record.spec.parameters).unwrap())
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(record)
}

/// Find a request by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Request>, sqlx::Error> {
    let row = sqlx::query_as::<_, RequestRow>(
        r#"
        SELECT id, requester, requested_job, parameters, created_at,
               start_time, completion_time, condition_status, condition_reason,
               condition_message, results
        FROM requests
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all requests
pub async fn list_all(pool: &PgPool) -> Result<Vec<Request>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequestRow>(
        r#"
        SELECT id, requester, requested_job, parameters, created_at,
               start_time, completion_time, condition_status, condition_reason,
               condition_message, results
        FROM requests
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// List requests that have not reached a terminal state
pub async fn list_incomplete(pool: &PgPool) -> Result<Vec<Request>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequestRow>(
        r#"
        SELECT id, requester, requested_job, parameters, created_at,
               start_time, completion_time, condition_status, condition_reason,
               condition_message, results
        FROM requests
        WHERE condition_status IS NULL OR condition_reason = 'Running'
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Persist the status fields of a request in one write
pub async fn update_status(pool: &PgPool, request: &Request) -> Result<(), sqlx::Error> {
    let condition = request.status.condition.as_ref();

    sqlx::query(
        r#"
        UPDATE requests
        SET start_time = $1, completion_time = $2, condition_status = $3,
            condition_reason = $4, condition_message = $5, results = $6
        WHERE id = $7
        "#,
    )
    .bind(request.status.start_time)
    .bind(request.status.completion_time)
    .bind(condition.map(|c| status_to_string(c.status)))
    .bind(condition.map(|c| reason_to_string(c.reason)))
    .bind(condition.map(|c| c.message.as_str()))
    .bind(serde_json::to_value(&request.status.results).unwrap())
    .bind(request.id)
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn status_to_string(status: ConditionStatus) -> &'static str {
    match status {
        ConditionStatus::True => "True",
        ConditionStatus::False => "False",
        ConditionStatus::Unknown => "Unknown",
    }
}

fn string_to_status(s: &str) -> ConditionStatus {
    match s {
        "True" => ConditionStatus::True,
        "False" => ConditionStatus::False,
        _ => ConditionStatus::Unknown,
    }
}

fn reason_to_string(reason: ConditionReason) -> &'static str {
    match reason {
        ConditionReason::Running => "Running",
        ConditionReason::Succeeded => "Succeeded",
        ConditionReason::Failed => "Failed",
        ConditionReason::Rejected => "Rejected",
    }
}

fn string_to_reason(s: &str) -> ConditionReason {
    match s {
        "Succeeded" => ConditionReason::Succeeded,
        "Failed" => ConditionReason::Failed,
        "Rejected" => ConditionReason::Rejected,
        _ => ConditionReason::Running,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    requester: String,
    requested_job: String,
    parameters: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
    start_time: Option<chrono::DateTime<chrono::Utc>>,
    completion_time: Option<chrono::DateTime<chrono::Utc>>,
    condition_status: Option<String>,
    condition_reason: Option<String>,
    condition_message: Option<String>,
    results: serde_json::Value,
}

impl From<RequestRow> for Request {
    fn from(row: RequestRow) -> Self {
        let condition = match (row.condition_status, row.condition_reason) {
            (Some(status), Some(reason)) => Some(Condition {
                status: string_to_status(&status),
                reason: string_to_reason(&reason),
                message: row.condition_message.unwrap_or_default(),
            }),
            _ => None,
        };

        let parameters = serde_json::from_value(row.parameters).unwrap_or_default();
        let results = serde_json::from_value(row.results).unwrap_or_default();

        Request {
            id: row.id,
            requester: row.requester,
            created_at: row.created_at,
            spec: RequestSpec {
                requested_job: row.requested_job,
                parameters,
            },
            status: RequestStatus {
                start_time: row.start_time,
                completion_time: row.completion_time,
                condition,
                results,
            },
        }
    }
}
