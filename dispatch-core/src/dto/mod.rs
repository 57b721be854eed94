//! DTOs for the caller-facing API.

pub mod request;
pub mod template;
