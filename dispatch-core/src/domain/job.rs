//! Job domain types
//!
//! Types describing the external execution unit launched for a request. The
//! engine itself is out of process; these types cross its API boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Handle to a job known to the execution engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Deterministic name derived from the owning request. Unique per record.
    pub name: String,
}

/// Specification sent to the engine when creating a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    /// Identity of the owning request, attached as a label so the job can be
    /// traced back to its record.
    pub request_id: Uuid,
}

/// Observed state of a job, as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// Accepted but not yet started.
    Pending,
    Running,
    Succeeded { results: HashMap<String, String> },
    Failed { reason: String },
}

impl JobOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. } | JobOutcome::Failed { .. })
    }
}

/// Executable job template
///
/// Resolved from a request's `requested_job` name; the payload is opaque to
/// the controller and interpreted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    pub name: String,
    pub description: Option<String>,
    /// Engine-side definition of the job.
    pub payload: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_terminality() {
        assert!(!JobOutcome::Pending.is_terminal());
        assert!(!JobOutcome::Running.is_terminal());
        assert!(
            JobOutcome::Succeeded {
                results: HashMap::new()
            }
            .is_terminal()
        );
        assert!(
            JobOutcome::Failed {
                reason: "exit 1".to_string()
            }
            .is_terminal()
        );
    }
}
