//! Health endpoint, answers 200 only when the store responds.

use crate::api::handlers::auth::AuthState;
use crate::{built_info, GIT_COMMIT_HASH};
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    pub status: String,
    pub name: String,
    pub version: String,
    pub build: String,
}

fn short_commit() -> &'static str {
    GIT_COMMIT_HASH.get(..7).unwrap_or(GIT_COMMIT_HASH)
}

/// `X-App: <name>:<version>:<commit>` so deployments are identifiable from
/// any probe response.
fn app_header() -> HeaderMap {
    let mut headers = HeaderMap::new();

    let app = format!(
        "{}:{}:{}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        short_commit()
    );

    if let Ok(value) = HeaderValue::from_str(&app) {
        headers.insert("x-app", value);
    }

    headers
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = Health),
        (status = 503, description = "Store unreachable", body = Health)
    ),
    tag = "health"
)]
pub async fn health(Extension(state): Extension<Arc<AuthState>>) -> impl IntoResponse {
    let headers = app_header();

    let status = match state.store().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            error!("Health check failed: {err}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    let body = Health {
        status: if status == StatusCode::OK { "ok" } else { "error" }.to_string(),
        name: built_info::PKG_NAME.to_string(),
        version: built_info::PKG_VERSION.to_string(),
        build: short_commit().to_string(),
    };

    (status, headers, Json(body))
}
