//! Dispatch Controller
//!
//! Drives request records through their lifecycle: authorization, job
//! launch, completion tracking and cleanup. The controller owns nothing but
//! the record's status; storage, configuration, templates and the job engine
//! sit behind collaborator traits.
//!
//! The reconciliation pipeline is re-entrant and idempotent: triggers are
//! delivered at least once, every step tolerates partial progress from a
//! prior attempt, and terminal outcomes are never overwritten.

pub mod auth;
pub mod config;
pub mod correlator;
pub mod engine;
pub mod reconcile;
pub mod store;
pub mod worker;
