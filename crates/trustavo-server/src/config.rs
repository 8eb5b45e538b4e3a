//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;

use trustavo_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_SHARE_BASE_URL, DEFAULT_TRENDING_LIMIT,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Human-readable name for this instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Trustavo Node"`
    pub instance_name: String,

    /// Prefix of the links handed out by `/signals/{id}/share`.
    /// Env: `SHARE_BASE_URL`
    /// Default: `https://trustavo.com`
    pub share_base_url: String,

    /// Length of `/feed/trending` and `/tags/trending` when the request
    /// gives no `limit`.
    /// Env: `TRENDING_LIMIT`
    /// Default: `20`
    pub trending_limit: usize,

    /// Post the demo identities and signals on start.
    /// Env: `SEED_DEMO` (true/false)
    /// Default: `false`
    pub seed_demo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            instance_name: "Trustavo Node".to_string(),
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            trending_limit: DEFAULT_TRENDING_LIMIT,
            seed_demo: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            if !name.trim().is_empty() {
                config.instance_name = name;
            }
        }

        if let Some(url) = lookup("SHARE_BASE_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.share_base_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid SHARE_BASE_URL, using default");
            }
        }

        if let Some(val) = lookup("TRENDING_LIMIT") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.trending_limit = n,
                _ => tracing::warn!(value = %val, "Invalid TRENDING_LIMIT, using default"),
            }
        }

        if let Some(val) = lookup("SEED_DEMO") {
            config.seed_demo = val == "true" || val == "1";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}
