use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    AdvanceUpdateResponse, CreateEventRequest, Event, NotificationAttempt,
    SendNotificationRequest, SendNotificationResponse, UpdateAdvanceRequest,
    IDEMPOTENCY_KEY_HEADER,
};
use std::time::Duration;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// The REST boundary the ledger and the dispatcher depend on
#[async_trait]
pub trait EventsApi: Send + Sync {
    /// Full event record including the advance history
    async fn get_event(&self, event_id: i64) -> Result<Event, ApiError>;

    /// Submit one add/subtract movement. `idempotency_key` lets the server drop replays.
    async fn update_advance(
        &self,
        event_id: i64,
        request: &UpdateAdvanceRequest,
        idempotency_key: Option<&str>,
    ) -> Result<AdvanceUpdateResponse, ApiError>;

    /// Server-side notification log for the event, newest first
    async fn get_notification_log(&self, event_id: i64) -> Result<Vec<NotificationAttempt>, ApiError>;

    async fn send_notification(
        &self,
        event_id: i64,
        phone: &str,
    ) -> Result<SendNotificationResponse, ApiError>;
}

/// API client for the event console backend
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl ApiClient {
    /// Create a client from configuration, applying the configured request timeout
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.http_timeout,
            http,
        })
    }

    /// Create a client against a custom base URL (e.g. `http://127.0.0.1:8000/api`)
    /// with the default request timeout
    pub fn with_base_url(base_url: String) -> Result<Self, ApiError> {
        Self::new(&ClientConfig {
            api_base_url: base_url,
            ..ClientConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create an event. Not part of the ledger boundary; used for seeding and tooling.
    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<Event, ApiError> {
        let response = self.http.post(self.url("/events/")).json(request).send().await?;
        parse_response(response).await
    }
}

/// Decode a success body, or turn an error response into `ApiError::Status`
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    debug!("Request failed with {}: {}", status, body);
    Err(ApiError::Status {
        status: status.as_u16(),
        detail: extract_detail(&body),
    })
}

/// Pull the `detail` message out of an error envelope like `{"detail": "..."}`
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl EventsApi for ApiClient {
    async fn get_event(&self, event_id: i64) -> Result<Event, ApiError> {
        let url = self.url(&format!("/events/{}/", event_id));
        let response = self.http.get(&url).send().await?;
        parse_response(response).await
    }

    async fn update_advance(
        &self,
        event_id: i64,
        request: &UpdateAdvanceRequest,
        idempotency_key: Option<&str>,
    ) -> Result<AdvanceUpdateResponse, ApiError> {
        let url = self.url(&format!("/events/{}/update_advance/", event_id));
        let mut builder = self.http.post(&url).json(request);
        if let Some(key) = idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }

        let response = builder.send().await?;
        parse_response(response).await
    }

    async fn get_notification_log(&self, event_id: i64) -> Result<Vec<NotificationAttempt>, ApiError> {
        let url = self.url(&format!("/events/{}/advance-notifications/", event_id));
        let response = self.http.get(&url).send().await?;
        parse_response(response).await
    }

    async fn send_notification(
        &self,
        event_id: i64,
        phone: &str,
    ) -> Result<SendNotificationResponse, ApiError> {
        let url = self.url(&format!("/events/{}/send-advance-notification/", event_id));
        let body = SendNotificationRequest {
            phone: phone.to_string(),
        };
        let response = self.http.post(&url).json(&body).send().await?;
        parse_response(response).await
    }
}
