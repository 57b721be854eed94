//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod request;
pub mod template;

use axum::{
    Router,
    routing::{delete, get, post},
};
use dispatch_controller::worker::Trigger;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Trigger source feeding the controller worker.
    pub triggers: mpsc::UnboundedSender<Trigger>,
}

/// Create the main API router with all endpoints
pub fn create_router(pool: PgPool, triggers: mpsc::UnboundedSender<Trigger>) -> Router {
    let state = AppState { pool, triggers };

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Request endpoints
        .route("/request/create", post(request::create_request))
        .route("/request/list", get(request::list_requests))
        .route("/request/{id}", get(request::get_request))
        // Template endpoints
        .route("/template/create", post(template::create_template))
        .route("/template/list", get(template::list_templates))
        .route("/template/{name}", get(template::get_template))
        .route("/template/{name}", delete(template::delete_template))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
