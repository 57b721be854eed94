//! Request domain types
//!
//! The request record is the persistent entity created by a tenant and driven
//! to completion by the controller. Its status carries a single condition
//! slot; all lifecycle transitions go through the guarded `mark_*` methods so
//! a terminal outcome is never overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Automation request record
///
/// Structure shared between the server (persists) and the controller
/// (drives status).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    /// Identity of the tenant that created the request. Immutable.
    pub requester: String,
    pub created_at: DateTime<Utc>,
    pub spec: RequestSpec,
    pub status: RequestStatus,
}

/// Caller-provided half of the record. Write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Name of the job template to execute.
    pub requested_job: String,
    /// Opaque parameters forwarded to the job.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Controller-owned half of the record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestStatus {
    /// Set exactly once, on the first transition into Running.
    pub start_time: Option<DateTime<Utc>>,
    /// Set exactly once, on the first transition into Succeeded or Failed.
    /// Never set for Rejected.
    pub completion_time: Option<DateTime<Utc>>,
    /// Single authoritative lifecycle indicator. Absent means "not yet
    /// started".
    pub condition: Option<Condition>,
    /// Output values copied from the completed job.
    #[serde(default)]
    pub results: HashMap<String, String>,
}

/// Lifecycle condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub status: ConditionStatus,
    pub reason: ConditionReason,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    pub fn new(status: ConditionStatus, reason: ConditionReason) -> Self {
        Self {
            status,
            reason,
            message: String::new(),
        }
    }

    pub fn with_message(
        status: ConditionStatus,
        reason: ConditionReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            reason,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionReason {
    Running,
    Succeeded,
    Failed,
    Rejected,
}

/// Completion notification produced by a terminal transition
///
/// Returned by `mark_succeeded`/`mark_failed` instead of being emitted
/// inline, so the status write never depends on delivery. The caller forwards
/// it over a channel best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub request_id: Uuid,
    pub requested_job: String,
    pub requester: String,
    pub reason: ConditionReason,
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
}

impl Request {
    /// Creates a fresh record with an empty status.
    pub fn new(requester: impl Into<String>, spec: RequestSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester: requester.into(),
            created_at: Utc::now(),
            spec,
            status: RequestStatus::default(),
        }
    }

    /// Checks whether the request has reached a terminal state
    /// (Succeeded, Failed or Rejected).
    pub fn has_completed(&self) -> bool {
        match &self.status.condition {
            None => false,
            Some(c) if c.status == ConditionStatus::True => true,
            Some(c) => {
                c.status == ConditionStatus::False && c.reason != ConditionReason::Running
            }
        }
    }

    /// Checks whether the request completed without succeeding.
    /// Failed and Rejected both count.
    pub fn has_failed(&self) -> bool {
        match &self.status.condition {
            None => false,
            Some(c) if c.status == ConditionStatus::True => false,
            Some(c) => {
                c.status == ConditionStatus::False && c.reason != ConditionReason::Running
            }
        }
    }

    /// Checks whether the request has succeeded.
    pub fn has_succeeded(&self) -> bool {
        matches!(
            &self.status.condition,
            Some(c) if c.status == ConditionStatus::True
        )
    }

    /// Checks whether the request is currently running.
    pub fn is_running(&self) -> bool {
        matches!(
            &self.status.condition,
            Some(c) if c.status != ConditionStatus::True && c.reason == ConditionReason::Running
        )
    }

    /// Registers the start time and moves the condition to Running.
    ///
    /// `start_time` is only written on the first entry into Running;
    /// re-observing a still-running job leaves it untouched.
    pub fn mark_running(&mut self) {
        if self.has_completed() {
            return;
        }

        if !self.is_running() {
            self.status.start_time = Some(Utc::now());
        }

        self.status.condition = Some(Condition::new(
            ConditionStatus::False,
            ConditionReason::Running,
        ));
    }

    /// Registers the completion time and moves the condition to Succeeded.
    ///
    /// Returns the completion event to forward, or None if the request was
    /// already terminal and nothing changed.
    pub fn mark_succeeded(&mut self) -> Option<CompletionEvent> {
        if self.has_completed() {
            return None;
        }

        self.status.completion_time = Some(Utc::now());
        self.status.condition = Some(Condition::new(
            ConditionStatus::True,
            ConditionReason::Succeeded,
        ));

        Some(self.completion_event(ConditionReason::Succeeded))
    }

    /// Registers the completion time and moves the condition to Failed with
    /// the provided message.
    pub fn mark_failed(&mut self, message: impl Into<String>) -> Option<CompletionEvent> {
        if self.has_completed() {
            return None;
        }

        self.status.completion_time = Some(Utc::now());
        self.status.condition = Some(Condition::with_message(
            ConditionStatus::False,
            ConditionReason::Failed,
            message,
        ));

        Some(self.completion_event(ConditionReason::Failed))
    }

    /// Moves the condition to Rejected with the provided message.
    ///
    /// Rejection happens before any execution, so neither timestamp is set.
    pub fn mark_rejected(&mut self, message: impl Into<String>) {
        if self.has_completed() {
            return;
        }

        self.status.condition = Some(Condition::with_message(
            ConditionStatus::False,
            ConditionReason::Rejected,
            message,
        ));
    }

    fn completion_event(&self, reason: ConditionReason) -> CompletionEvent {
        CompletionEvent {
            request_id: self.id,
            requested_job: self.spec.requested_job.clone(),
            requester: self.requester.clone(),
            reason,
            start_time: self.status.start_time,
            completion_time: self.status.completion_time,
        }
    }
}

/// Validates a requested job name against `[a-z0-9]([-a-z0-9]*[a-z0-9])?`.
///
/// The storage layer rejects records whose name does not match, before the
/// controller ever sees them.
pub fn is_valid_job_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    let bytes = name.as_bytes();
    let inner_ok = bytes
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-');

    inner_ok && bytes[0] != b'-' && bytes[bytes.len() - 1] != b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::new(
            "tenant-a",
            RequestSpec {
                requested_job: "deploy-x".to_string(),
                parameters: HashMap::new(),
            },
        )
    }

    #[test]
    fn test_fresh_request_has_no_state() {
        let r = request();
        assert!(!r.has_completed());
        assert!(!r.has_failed());
        assert!(!r.has_succeeded());
        assert!(!r.is_running());
        assert!(r.status.start_time.is_none());
        assert!(r.status.completion_time.is_none());
    }

    #[test]
    fn test_mark_running_sets_start_time_once() {
        let mut r = request();
        r.mark_running();
        assert!(r.is_running());
        let first = r.status.start_time;
        assert!(first.is_some());

        // Re-entering Running must not reset the start time.
        r.mark_running();
        assert_eq!(r.status.start_time, first);
        assert!(r.status.completion_time.is_none());
    }

    #[test]
    fn test_mark_succeeded_is_terminal() {
        let mut r = request();
        r.mark_running();
        let event = r.mark_succeeded();

        assert!(r.has_completed());
        assert!(r.has_succeeded());
        assert!(!r.has_failed());
        assert!(!r.is_running());
        assert!(r.status.completion_time.is_some());

        let event = event.expect("first terminal transition emits an event");
        assert_eq!(event.reason, ConditionReason::Succeeded);
        assert_eq!(event.requested_job, "deploy-x");
    }

    #[test]
    fn test_mark_failed_records_message() {
        let mut r = request();
        r.mark_running();
        let event = r.mark_failed("boom");

        assert!(r.has_completed());
        assert!(r.has_failed());
        assert!(!r.has_succeeded());
        assert_eq!(r.status.condition.as_ref().unwrap().message, "boom");
        assert!(event.is_some());
    }

    #[test]
    fn test_rejected_has_no_timestamps() {
        let mut r = request();
        r.mark_rejected("unauthorized namespace tenant-a");

        assert!(r.has_completed());
        assert!(r.has_failed());
        assert!(r.status.start_time.is_none());
        assert!(r.status.completion_time.is_none());
        assert_eq!(
            r.status.condition.as_ref().unwrap().reason,
            ConditionReason::Rejected
        );
    }

    #[test]
    fn test_terminal_state_is_immutable() {
        let mut r = request();
        r.mark_running();
        assert!(r.mark_succeeded().is_some());

        let snapshot = r.status.clone();

        // Every later mutator call in any order is a no-op.
        assert!(r.mark_failed("too late").is_none());
        r.mark_rejected("too late");
        r.mark_running();
        assert!(r.mark_succeeded().is_none());

        assert_eq!(r.status.condition, snapshot.condition);
        assert_eq!(r.status.start_time, snapshot.start_time);
        assert_eq!(r.status.completion_time, snapshot.completion_time);
    }

    #[test]
    fn test_failed_then_anything_is_noop() {
        let mut r = request();
        assert!(r.mark_failed("job template not found").is_some());
        let snapshot = r.status.clone();

        r.mark_running();
        assert!(r.mark_succeeded().is_none());
        r.mark_rejected("late rejection");

        assert_eq!(r.status.condition, snapshot.condition);
        assert!(r.status.start_time.is_none());
    }

    #[test]
    fn test_rejected_blocks_later_transitions() {
        let mut r = request();
        r.mark_rejected("denied");
        r.mark_running();
        assert!(r.mark_succeeded().is_none());

        assert_eq!(
            r.status.condition.as_ref().unwrap().reason,
            ConditionReason::Rejected
        );
        assert!(r.status.start_time.is_none());
        assert!(r.status.completion_time.is_none());
    }

    #[test]
    fn test_job_name_validation() {
        assert!(is_valid_job_name("deploy-x"));
        assert!(is_valid_job_name("a"));
        assert!(is_valid_job_name("0"));
        assert!(is_valid_job_name("release-2024-01"));

        assert!(!is_valid_job_name(""));
        assert!(!is_valid_job_name("-deploy"));
        assert!(!is_valid_job_name("deploy-"));
        assert!(!is_valid_job_name("Deploy"));
        assert!(!is_valid_job_name("deploy_x"));
        assert!(!is_valid_job_name("deploy x"));
    }
}
