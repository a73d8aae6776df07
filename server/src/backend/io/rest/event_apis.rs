//! # REST API for Events and their Advance
//!
//! - `POST /api/events/`: create an event
//! - `GET /api/events/{id}/`: event with its advance history
//! - `POST /api/events/{id}/update_advance/`: apply one add or subtract movement

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use shared::{
    AdvanceUpdateResponse, CreateEventRequest, Event, UpdateAdvanceRequest, IDEMPOTENCY_KEY_HEADER,
};
use tracing::info;

use super::mappers::event_mapper::EventMapper;
use super::{error_response, ApiError};
use crate::backend::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/", post(create_event))
        .route("/events/:id/", get(get_event))
        .route("/events/:id/update_advance/", post(update_advance))
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    info!("POST /api/events/ - request: {:?}", request);

    let command = EventMapper::to_create_command(request);
    match state.event_service.create_event(command).await {
        Ok(event) => Ok((StatusCode::CREATED, Json(EventMapper::to_dto(event)))),
        Err(e) => Err(error_response("Failed to create event", e)),
    }
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Event>, ApiError> {
    info!("GET /api/events/{}/", event_id);

    state
        .event_service
        .get_event(event_id)
        .await
        .map(|event| Json(EventMapper::to_dto(event)))
        .map_err(|e| error_response("Failed to get event", e))
}

pub async fn update_advance(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<UpdateAdvanceRequest>,
) -> Result<Json<AdvanceUpdateResponse>, ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string);
    info!(
        "POST /api/events/{}/update_advance/ - request: {:?}, key: {:?}",
        event_id, request, idempotency_key
    );

    let command = EventMapper::to_update_command(event_id, request, idempotency_key);
    state
        .advance_service
        .update_advance(command)
        .await
        .map(|advance| Json(EventMapper::to_advance_update_dto(advance)))
        .map_err(|e| error_response("Failed to update advance", e))
}
