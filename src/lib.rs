//! Ponder Server
//!
//! HTTP surface of the structured-reasoning chat backend: accepts a
//! conversation, optionally augments the system prompt through the context
//! patch engine, drives a provider adapter, and re-serializes the canonical
//! chunk stream as an outbound SSE response.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod routes;
pub mod state;
pub mod tools;

pub use config::ServerConfig;
pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(routes::chat::chat_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
