//! Authorization gate
//!
//! Pure decision over the configured allow list. Denial is a defined terminal
//! outcome for the request, not an error.

use crate::config::ControllerConfig;

/// Authorization decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(String),
}

/// Evaluates whether `requester` may run `requested_job`
///
/// Deterministic for identical inputs; consults only the supplied config.
pub fn evaluate(requested_job: &str, requester: &str, config: &ControllerConfig) -> Decision {
    if config.allow_list.iter().any(|r| r == requester) {
        Decision::Allowed
    } else {
        Decision::Denied(format!(
            "unauthorized namespace {requester} for job {requested_job}"
        ))
    }
}
