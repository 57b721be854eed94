//! Request DTOs for the caller-facing API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inbound payload to create a new request record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Identity of the creating tenant.
    pub requester: String,
    /// Name of the job template to run. Must match
    /// `[a-z0-9]([-a-z0-9]*[a-z0-9])?`.
    pub requested_job: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}
