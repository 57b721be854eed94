//! Job Template Repository
//!
//! Handles all database operations related to job templates.

use dispatch_core::domain::job::JobTemplate;
use dispatch_core::dto::template::CreateTemplate;
use sqlx::PgPool;

/// Create or update a job template
pub async fn upsert(pool: &PgPool, req: CreateTemplate) -> Result<JobTemplate, sqlx::Error> {
    let now = chrono::Utc::now();

    let template = JobTemplate {
        name: req.name.clone(),
        description: req.description.clone(),
        payload: req.payload.clone(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO job_templates (name, description, payload, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (name) DO UPDATE
        SET description = $2, payload = $3, updated_at = $5
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.payload)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(template)
}

/// Find a template by name
pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<JobTemplate>, sqlx::Error> {
    let row = sqlx::query_as::<_, TemplateRow>(
        r#"
        SELECT name, description, payload, created_at, updated_at
        FROM job_templates
        WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all templates
pub async fn list_all(pool: &PgPool) -> Result<Vec<JobTemplate>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TemplateRow>(
        r#"
        SELECT name, description, payload, created_at, updated_at
        FROM job_templates
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Delete a template by name
pub async fn delete(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM job_templates WHERE name = $1")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct TemplateRow {
    name: String,
    description: Option<String>,
    payload: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<TemplateRow> for JobTemplate {
    fn from(row: TemplateRow) -> Self {
        JobTemplate {
            name: row.name,
            description: row.description,
            payload: row.payload,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
