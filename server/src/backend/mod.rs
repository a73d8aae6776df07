//! # Backend Module
//!
//! Everything behind the event console's HTTP surface.
//!
//! ```text
//! IO Layer (REST handlers, messaging channels)
//!     ↓
//! Domain Layer (event, advance and notification services)
//!     ↓
//! Storage Layer (SQLite repositories)
//! ```
//!
//! `initialize_backend` wires the layers from a [`ServerConfig`];
//! `create_router` exposes them under `/api`.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::backend::config::ServerConfig;
use crate::backend::domain::{AdvanceService, EventService, NotificationService};
use crate::backend::io::messaging::{LogChannel, MessageChannel, WebhookChannel};
use crate::backend::storage::{DbConnection, EventRepository, NotificationRepository};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub event_service: EventService,
    pub advance_service: AdvanceService,
    pub notification_service: NotificationService,
    pub config: Arc<ServerConfig>,
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &ServerConfig) -> Result<AppState> {
    info!("Setting up database");
    let db = DbConnection::new(&config.database_url).await?;

    info!("Setting up messaging");
    let channel: Arc<dyn MessageChannel> = match &config.webhook_url {
        Some(url) => {
            info!("Advance notices go to {}", url);
            Arc::new(WebhookChannel::new(url.clone(), config.webhook_token.clone())?)
        }
        None => {
            warn!("No webhook configured; advance notices are only logged");
            Arc::new(LogChannel)
        }
    };

    info!("Setting up application state");
    Ok(build_state(db, channel, config.clone()))
}

/// Wire services over an open database and a delivery channel
pub fn build_state(
    db: DbConnection,
    channel: Arc<dyn MessageChannel>,
    config: ServerConfig,
) -> AppState {
    let events = Arc::new(EventRepository::new(db.clone()));
    let log = Arc::new(NotificationRepository::new(db));

    AppState {
        event_service: EventService::new(events.clone()),
        advance_service: AdvanceService::new(events.clone(), config.local_currency.clone()),
        notification_service: NotificationService::new(
            events,
            log,
            channel,
            config.local_currency.clone(),
        ),
        config: Arc::new(config),
    }
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| {
            warn!(
                "Invalid CORS origin {:?}, falling back to http://localhost:8080",
                app_state.config.cors_origin
            );
            HeaderValue::from_static("http://localhost:8080")
        });

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api_routes = Router::new()
        .merge(io::rest::event_apis::router())
        .merge(io::rest::notification_apis::router());

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt; // for `oneshot`

    #[tokio::test]
    async fn test_routes_are_nested_under_api() {
        let db = DbConnection::in_memory().await.unwrap();
        let config = ServerConfig {
            cors_origin: "not a valid\norigin".to_string(),
            ..ServerConfig::default()
        };
        let app = create_router(build_state(db, Arc::new(LogChannel), config));

        let request = Request::builder()
            .uri("/api/events/1/")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: shared::ApiErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.detail, "Event 1 not found");

        let request = Request::builder()
            .uri("/events/1/")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
