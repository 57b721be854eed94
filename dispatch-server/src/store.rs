//! Postgres-backed collaborator implementations
//!
//! Adapts the repositories to the controller's storage traits.

use async_trait::async_trait;
use dispatch_controller::store::{RequestStore, StoreError, TemplateResolver};
use dispatch_core::domain::job::JobTemplate;
use dispatch_core::domain::request::Request;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{request_repository, template_repository};

fn store_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Record storage backed by the requests table
#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn get(&self, id: Uuid) -> Result<Option<Request>, StoreError> {
        request_repository::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)
    }

    async fn update_status(&self, request: &Request) -> Result<(), StoreError> {
        request_repository::update_status(&self.pool, request)
            .await
            .map_err(store_error)
    }

    async fn list_incomplete(&self) -> Result<Vec<Request>, StoreError> {
        request_repository::list_incomplete(&self.pool)
            .await
            .map_err(store_error)
    }
}

/// Template lookup backed by the job_templates table
#[derive(Clone)]
pub struct PgTemplateResolver {
    pool: PgPool,
}

impl PgTemplateResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateResolver for PgTemplateResolver {
    async fn resolve(&self, name: &str) -> Result<Option<JobTemplate>, StoreError> {
        template_repository::find_by_name(&self.pool, name)
            .await
            .map_err(store_error)
    }
}
