use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::chat::ChatError;
use crate::hub::HubError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Hub error: {0}")]
    Hub(#[from] HubError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

/// Hide internal detail from clients in production
fn redact(detail: String, generic: &str) -> String {
    if is_production() {
        generic.to_string()
    } else {
        detail
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, String) {
        match self {
            AppError::Config(e) => {
                let log_msg = e.to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    redact(log_msg.clone(), "Configuration error"),
                    log_msg,
                )
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Chat(e) => {
                let log_msg = e.to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    redact(log_msg.clone(), "Message store temporarily unavailable"),
                    log_msg,
                )
            }
            AppError::Hub(HubError::EmptyUsername) => {
                let msg = HubError::EmptyUsername.to_string();
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), msg)
            }
            AppError::Hub(e) => {
                let log_msg = e.to_string();
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "HUB_UNAVAILABLE",
                    redact(log_msg.clone(), "Service shutting down"),
                    log_msg,
                )
            }
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                redact(e.clone(), "Internal server error"),
                e.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, client_message, log_message) = self.parts();

        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::debug!(code = %code, message = %log_message, "Rejected request");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
