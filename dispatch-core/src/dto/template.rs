//! Job template DTOs

use serde::{Deserialize, Serialize};

/// Inbound payload to register or update a job template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    /// Engine-side definition of the job.
    pub payload: String,
}
