//! Client configuration, read from the environment with sensible local defaults.

use std::time::Duration;
use tracing::warn;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";
const DEFAULT_LOCAL_CURRENCY: &str = "UZS";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the event API, without a trailing slash
    pub api_base_url: String,
    /// Exchange-rate endpoint returning `{"rates": {...}}` quoted against USD
    pub rates_url: String,
    /// ISO code of the local currency (the "false" side of every currency flag)
    pub local_currency: String,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            local_currency: DEFAULT_LOCAL_CURRENCY.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Build the configuration from `EVENT_CONSOLE_*` variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let http_timeout = match read("EVENT_CONSOLE_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!("Ignoring invalid EVENT_CONSOLE_HTTP_TIMEOUT_SECS={:?}", raw);
                    defaults.http_timeout
                }
            },
            None => defaults.http_timeout,
        };

        Self {
            api_base_url: read("EVENT_CONSOLE_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            rates_url: read("EVENT_CONSOLE_RATES_URL").unwrap_or(defaults.rates_url),
            local_currency: read("EVENT_CONSOLE_LOCAL_CURRENCY")
                .map(|code| code.trim().to_uppercase())
                .unwrap_or(defaults.local_currency),
            http_timeout,
        }
    }
}
