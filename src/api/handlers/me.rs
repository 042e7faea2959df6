//! Identity echo for authenticated callers.

use crate::api::handlers::auth::{types::MeResponse, Identity};
use axum::{extract::Extension, Json};

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Caller identity from the presented token", body = MeResponse),
        (status = 401, description = "Missing or invalid token", body = String)
    ),
    tag = "auth"
)]
pub async fn me(Extension(identity): Extension<Identity>) -> Json<MeResponse> {
    Json(MeResponse { user: identity })
}
