//! Server configuration from `EVENT_CONSOLE_*` environment variables.

use std::net::SocketAddr;
use tracing::warn;

const DEFAULT_BIND: &str = "127.0.0.1:8000";
const DEFAULT_DATABASE_URL: &str = "sqlite:event_console.db";
const DEFAULT_LOCAL_CURRENCY: &str = "UZS";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Code printed for amounts whose currency flag is false
    pub local_currency: String,
    /// Deliver notices through this webhook; when unset they are only written to the log
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            local_currency: DEFAULT_LOCAL_CURRENCY.to_string(),
            webhook_url: None,
            webhook_token: None,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = match read("EVENT_CONSOLE_BIND") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid EVENT_CONSOLE_BIND={:?}, using {}", raw, DEFAULT_BIND);
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        Self {
            bind_addr,
            database_url: read("EVENT_CONSOLE_DATABASE_URL").unwrap_or(defaults.database_url),
            local_currency: read("EVENT_CONSOLE_LOCAL_CURRENCY")
                .map(|code| code.to_uppercase())
                .unwrap_or(defaults.local_currency),
            webhook_url: read("EVENT_CONSOLE_WEBHOOK_URL"),
            webhook_token: read("EVENT_CONSOLE_WEBHOOK_TOKEN"),
            cors_origin: read("EVENT_CONSOLE_CORS_ORIGIN").unwrap_or(defaults.cors_origin),
        }
    }
}
