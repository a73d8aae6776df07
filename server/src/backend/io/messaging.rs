//! Outbound messaging channels for client notices.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel answered and refused the message; the text is shown to the operator
    #[error("{0}")]
    Rejected(String),

    #[error("Messaging service unreachable: {0}")]
    Unavailable(String),
}

/// Delivers a rendered notice to one phone number
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, phone: &str, text: &str) -> Result<(), ChannelError>;
}

/// Writes notices to the log instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

#[async_trait]
impl MessageChannel for LogChannel {
    async fn send(&self, phone: &str, text: &str) -> Result<(), ChannelError> {
        info!("Notice for {}:\n{}", phone, text);
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    phone: &'a str,
    text: &'a str,
}

/// POSTs `{phone, text}` to a messaging gateway
#[derive(Clone)]
pub struct WebhookChannel {
    url: String,
    token: Option<String>,
    http: Client,
}

impl WebhookChannel {
    pub fn new(url: String, token: Option<String>) -> Result<Self, ChannelError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;
        Ok(Self { url, token, http })
    }
}

#[async_trait]
impl MessageChannel for WebhookChannel {
    async fn send(&self, phone: &str, text: &str) -> Result<(), ChannelError> {
        let mut request = self.http.post(&self.url).json(&WebhookMessage { phone, text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Messaging gateway answered {}: {}", status, body);
        Err(ChannelError::Rejected(gateway_error(&body).unwrap_or_else(|| {
            format!("Messaging service returned {}", status.as_u16())
        })))
    }
}

/// Gateways report failures as `{"error": "..."}` or `{"detail": "..."}`
fn gateway_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "detail"]
        .iter()
        .filter_map(|field| value.get(field).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_extraction() {
        assert_eq!(
            gateway_error(r#"{"ok": false, "error": "Client not found"}"#),
            Some("Client not found".to_string())
        );
        assert_eq!(
            gateway_error(r#"{"detail": "Rate limited"}"#),
            Some("Rate limited".to_string())
        );
        assert_eq!(gateway_error(r#"{"error": ""}"#), None);
        assert_eq!(gateway_error("Bad Gateway"), None);
    }

    #[tokio::test]
    async fn test_log_channel_always_delivers() {
        assert!(LogChannel.send("+998901234567", "hello").await.is_ok());
    }
}
