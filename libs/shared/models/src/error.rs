use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Validation rejection with a stable machine-readable reason code.
    #[error("Validation error [{reason}]: {message}")]
    Rejection { reason: &'static str, message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, reason, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, None, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, None, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, None, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, None, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, None, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, None, msg.clone()),
            AppError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, None, msg.clone()),
            AppError::Rejection { reason, message } => {
                // A booked-out slot is a conflict; every other rejection is a
                // plain bad request the client can fix by picking another slot.
                let status = if *reason == "slot_already_booked" {
                    StatusCode::CONFLICT
                } else {
                    StatusCode::BAD_REQUEST
                };
                (status, Some(*reason), message.clone())
            }
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = match reason {
            Some(reason) => Json(json!({
                "error": message,
                "reason": reason,
            })),
            None => Json(json!({
                "error": message
            })),
        };

        (status, body).into_response()
    }
}
