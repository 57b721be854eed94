//! Repository Module
//!
//! Data access layer for the server.
//! Each repository handles database operations for a specific domain entity.

pub mod request;
pub mod template;

// Re-export for convenience
pub use request as request_repository;
pub use template as template_repository;
