//! Application State
//!
//! Shared, read-only state handed to every request handler.

use crate::config::ServerConfig;

pub struct AppState {
    pub config: ServerConfig,
    /// Shared HTTP client for the detection sub-call and server-side tools.
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            client: ponder_llm::http_client::build_http_client(),
        }
    }
}
