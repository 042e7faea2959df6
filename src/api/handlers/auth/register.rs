//! Self-registration endpoint. New accounts always get the `user` role.

use crate::api::error::ApiError;
use crate::api::handlers::auth::{
    provision_account,
    state::AuthState,
    types::{AuthResponse, RegisterRequest},
    utils::request_id,
};
use crate::api::observe::{self, observed, op};
use crate::store::Role;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::info_span;

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, token issued", body = AuthResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 409, description = "User already exists", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let request_id = request_id(&headers);
    let span = info_span!(
        "auth.register",
        request_id = %request_id,
        user_id = tracing::field::Empty
    );

    observed(op::REGISTER, span, async move {
        let Some(Json(request)) = payload else {
            return Err(ApiError::validation("Missing payload"));
        };

        let user = provision_account(&state, &request.email, &request.password, Role::User).await?;

        let token = state.signer().issue(&user, state.config().token_ttl())?;

        observe::record_user(user.id);

        Ok((
            StatusCode::CREATED,
            Json(AuthResponse {
                token,
                user: user.into(),
            }),
        ))
    })
    .await
}
