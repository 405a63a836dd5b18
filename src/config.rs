//! Server Configuration
//!
//! Environment-derived configuration, resolved once at startup. Per-request
//! settings in the chat payload override these defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Default provider API key (`OPENAI_API_KEY`).
    pub api_key: Option<String>,
    /// Default provider base URL (`OPENAI_BASE_URL`).
    pub base_url: Option<String>,
    /// Default model identifier (`OPENAI_MODEL`).
    pub model: String,
    /// Tavily key for the server-executed `web_search` tool.
    pub tavily_api_key: Option<String>,
    /// Directory of context patch documents.
    pub patches_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            api_key: None,
            base_url: None,
            model: "gpt-4.1".to_string(),
            tavily_api_key: None,
            patches_dir: PathBuf::from("patches/context"),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: parse_socket("PONDER_BIND", defaults.bind),
            api_key: env_nonempty("OPENAI_API_KEY"),
            base_url: env_nonempty("OPENAI_BASE_URL"),
            model: env_nonempty("OPENAI_MODEL").unwrap_or(defaults.model),
            tavily_api_key: env_nonempty("TAVILY_API_KEY"),
            patches_dir: env_nonempty("PONDER_PATCHES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.patches_dir),
        }
    }
}

fn parse_socket(key: &str, default: SocketAddr) -> SocketAddr {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
