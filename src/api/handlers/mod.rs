//! HTTP handlers.

pub mod auth;
pub mod files;
pub mod health;
pub mod me;
pub mod users;

use crate::api::error::ApiError;

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
