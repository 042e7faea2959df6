//! Error taxonomy for the HTTP surface.
//!
//! Every failure a handler can produce maps to exactly one variant, and every
//! variant renders as `{"error": "..."}` with a fixed status code. Messages
//! stay generic so responses never reveal which internal check failed.

use crate::api::observe::Outcome;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

static DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Switches 500 bodies to include the error detail. Set once at startup from
/// `--diagnostics`, off otherwise.
pub fn set_diagnostics(enabled: bool) {
    DIAGNOSTICS.store(enabled, Ordering::Relaxed);
}

fn diagnostics_enabled() -> bool {
    DIAGNOSTICS.load(Ordering::Relaxed)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited { retry_after_seconds: u64 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Terminal accounting bucket for this error. Expected rejections count
    /// as failures, rate limiting as blocked, everything else as an error.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::RateLimited { .. } => Outcome::Blocked,
            Self::Internal(_) => Outcome::Error,
            _ => Outcome::Failure,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            Self::RateLimited {
                retry_after_seconds,
            } => {
                let mut response =
                    (status, Json(json!({"error": "Too many requests"}))).into_response();

                if let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }

                response
            }

            Self::Internal(err) => {
                error!("Internal error: {err:#}");

                let body = if diagnostics_enabled() {
                    json!({"error": "Internal server error", "detail": format!("{err:#}")})
                } else {
                    json!({"error": "Internal server error"})
                };

                (status, Json(body)).into_response()
            }

            other => (status, Json(json!({"error": other.to_string()}))).into_response(),
        }
    }
}
