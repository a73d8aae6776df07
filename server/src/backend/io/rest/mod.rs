//! # REST API Interface Layer
//!
//! Axum handlers for the `/api` surface. Handlers translate between the
//! `shared` DTOs and domain commands, call one service and turn domain errors
//! into `{"detail": ...}` responses with the matching status code.

pub mod event_apis;
pub mod mappers;
pub mod notification_apis;

use axum::{http::StatusCode, response::Json};
use shared::ApiErrorBody;
use tracing::{error, warn};

use crate::backend::domain::DomainError;

pub type ApiError = (StatusCode, Json<ApiErrorBody>);

/// Log `e` and build the error response for it
pub(crate) fn error_response(context: &str, e: DomainError) -> ApiError {
    let status = e.status_code();
    if status.is_server_error() {
        error!("{}: {}", context, e);
    } else {
        warn!("{}: {}", context, e);
    }

    (
        status,
        Json(ApiErrorBody {
            detail: e.public_message(),
        }),
    )
}
