//! Storage collaborator interfaces
//!
//! Record persistence and template lookup are external; the controller calls
//! them through these traits. The record's status is only written by the
//! reconciliation pipeline (single writer), and only after a step completed
//! cleanly.

use async_trait::async_trait;
use dispatch_core::domain::job::JobTemplate;
use dispatch_core::domain::request::Request;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request {0} not found")]
    NotFound(Uuid),

    #[error("store call timed out")]
    Timeout,

    #[error("store error: {0}")]
    Backend(String),
}

/// Persistent record storage
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Fetches the current record snapshot.
    async fn get(&self, id: Uuid) -> Result<Option<Request>, StoreError>;

    /// Persists the record's status fields in one write.
    async fn update_status(&self, request: &Request) -> Result<(), StoreError>;

    /// Lists records that have not reached a terminal state, for resync.
    async fn list_incomplete(&self) -> Result<Vec<Request>, StoreError>;
}

/// Maps a `requested_job` name to an executable template
#[async_trait]
pub trait TemplateResolver: Send + Sync {
    /// Returns the template, or None when no template carries this name.
    async fn resolve(&self, name: &str) -> Result<Option<JobTemplate>, StoreError>;
}
