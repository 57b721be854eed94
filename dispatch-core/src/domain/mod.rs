//! Domain types shared across the dispatch crates.

pub mod job;
pub mod request;
