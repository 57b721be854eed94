//! Job execution engine interface
//!
//! The engine is an external service that runs jobs by name. The controller
//! only creates, observes and deletes named jobs through this seam.

use async_trait::async_trait;
use dispatch_core::domain::job::{JobHandle, JobOutcome, JobSpec};
use thiserror::Error;

/// Errors returned by the job execution engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// A job with this name already exists. Under concurrent reconciliation
    /// this is the losing side of a create race, and callers treat it as
    /// success.
    #[error("job {0} already exists")]
    AlreadyExists(String),

    /// No job with this name is known to the engine.
    #[error("job {0} not found")]
    NotFound(String),

    /// The call exceeded its time bound.
    #[error("engine call timed out")]
    Timeout,

    /// Any other engine-side failure. Transient; the invocation is requeued.
    #[error("engine error: {0}")]
    Backend(String),
}

impl EngineError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Backend for the job correlator
#[async_trait]
pub trait JobEngine: Send + Sync {
    /// Looks up a job by name. Never creates.
    async fn find_job(&self, name: &str) -> Result<Option<JobHandle>, EngineError>;

    /// Creates a named job. Returns `AlreadyExists` when the name is taken.
    async fn create_job(&self, spec: JobSpec) -> Result<JobHandle, EngineError>;

    /// Reports the job's current observed state.
    async fn observe_job(&self, handle: &JobHandle) -> Result<JobOutcome, EngineError>;

    /// Deletes a job. Returns `NotFound` when it is already gone.
    async fn delete_job(&self, handle: &JobHandle) -> Result<(), EngineError>;
}
