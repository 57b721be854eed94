//! Dispatch Core
//!
//! Core types and abstractions for the Dispatch automation-request system.
//!
//! This crate contains:
//! - Domain types: Core business entities (Request, JobTemplate, etc.)
//! - DTOs: Data transfer objects for the caller-facing API

pub mod domain;
pub mod dto;
