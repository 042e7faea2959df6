//! Authenticated file download from a flat storage directory.

use crate::api::error::ApiError;
use crate::api::handlers::auth::{utils::request_id, AuthState, Identity};
use crate::api::observe::{observed, op};
use axum::{
    extract::{Extension, Query},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, info_span};

const MAX_FILE_NAME_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    name: Option<String>,
}

/// Allow-list for download names: one simple stem, one approved extension,
/// no separators or dot segments anywhere.
fn valid_file_name(name: &str) -> bool {
    if name.chars().count() > MAX_FILE_NAME_CHARS {
        return false;
    }

    Regex::new(r"^[A-Za-z0-9_-]+\.(jpg|png|pdf|txt)$").is_ok_and(|re| re.is_match(name))
}

/// The joined path must stay directly under the root. The allow-list leaves
/// no room for separators, this is the fail-safe behind it.
fn contained(root: &Path, path: &Path) -> bool {
    path.starts_with(root) && path.components().count() == root.components().count() + 1
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[utoipa::path(
    get,
    path = "/files",
    params(
        ("name" = String, Query, description = "File name, stem plus approved extension")
    ),
    responses(
        (status = 200, description = "File contents"),
        (status = 400, description = "Invalid file name", body = String),
        (status = 401, description = "Missing or invalid token", body = String),
        (status = 404, description = "File not found", body = String)
    ),
    tag = "files"
)]
pub async fn download(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let request_id = request_id(&headers);
    let span = info_span!(
        "file.download",
        request_id = %request_id,
        user_id = %identity.id
    );

    observed(op::FILE_DOWNLOAD, span, async move {
        let Some(name) = query.name else {
            return Err(ApiError::validation("Invalid file name"));
        };

        if !valid_file_name(&name) {
            debug!("Rejected file name");
            return Err(ApiError::validation("Invalid file name"));
        }

        let root = state.config().storage_root();
        let path = root.join(&name);

        if !contained(root, &path) {
            debug!("Rejected file path outside storage root");
            return Err(ApiError::validation("Invalid file name"));
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                info!(user_id = %identity.id, file = %name, "File served");

                Ok((
                    [(header::CONTENT_TYPE, content_type_for(&name))],
                    bytes,
                )
                    .into_response())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %name, "File not found");
                Err(ApiError::not_found("File not found"))
            }
            Err(err) => Err(ApiError::Internal(
                anyhow::Error::new(err).context("failed to read file"),
            )),
        }
    })
    .await
}
