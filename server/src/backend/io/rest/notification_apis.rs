//! # REST API for Advance Notices
//!
//! - `GET /api/events/{id}/advance-notifications/`: attempt log, newest first
//! - `POST /api/events/{id}/send-advance-notification/`: send the notice to one phone

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use shared::{
    NotificationAttempt, NotificationStatus, SendNotificationRequest, SendNotificationResponse,
};
use tracing::{info, warn};

use super::mappers::notification_mapper::NotificationMapper;
use super::{error_response, ApiError};
use crate::backend::domain::commands::notifications::SendNotificationCommand;
use crate::backend::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/events/:id/advance-notifications/",
            get(list_advance_notifications),
        )
        .route(
            "/events/:id/send-advance-notification/",
            post(send_advance_notification),
        )
}

pub async fn list_advance_notifications(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<NotificationAttempt>>, ApiError> {
    info!("GET /api/events/{}/advance-notifications/", event_id);

    state
        .notification_service
        .list_log(event_id)
        .await
        .map(|records| Json(NotificationMapper::to_log_dto(records)))
        .map_err(|e| error_response("Failed to list advance notifications", e))
}

/// Failures answer with `{"status": "error", "detail": ...}` so the
/// operator sees the gateway's reason
pub async fn send_advance_notification(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, (StatusCode, Json<SendNotificationResponse>)> {
    info!(
        "POST /api/events/{}/send-advance-notification/ - request: {:?}",
        event_id, request
    );

    let command = SendNotificationCommand {
        event_id,
        phone: request.phone,
    };

    match state.notification_service.send(command).await {
        Ok(()) => Ok(Json(SendNotificationResponse {
            status: NotificationStatus::Success,
            detail: None,
        })),
        Err(e) => {
            warn!("Advance notice for event {} not sent: {}", event_id, e);
            Err((
                e.status_code(),
                Json(SendNotificationResponse {
                    status: NotificationStatus::Error,
                    detail: Some(e.public_message()),
                }),
            ))
        }
    }
}
