//! Login endpoint.

use crate::api::error::ApiError;
use crate::api::handlers::auth::{
    state::AuthState,
    types::{AuthResponse, LoginRequest},
    utils::{request_id, valid_password, valid_username},
};
use crate::api::observe::{self, observed, op};
use crate::store::StoreError;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, info_span};

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let request_id = request_id(&headers);
    let span = info_span!(
        "auth.login",
        request_id = %request_id,
        user_id = tracing::field::Empty
    );

    observed(op::LOGIN, span, async move {
        let Some(Json(request)) = payload else {
            return Err(ApiError::validation("Missing payload"));
        };

        if !valid_username(&request.username) || !valid_password(&request.password) {
            return Err(ApiError::validation("Invalid payload"));
        }

        let user = match state.store().find_by_username(&request.username).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => None,
            Err(err) => {
                return Err(ApiError::Internal(
                    anyhow::Error::new(err).context("failed to look up account"),
                ));
            }
        };

        let Some(user) = user else {
            // Unknown username burns a verification so the timing matches a
            // wrong password.
            state.hasher().verify_discard(&request.password).await?;
            debug!("Login failed: unknown username");
            return Err(ApiError::unauthorized("Invalid credentials"));
        };

        let matched = state
            .hasher()
            .verify(&request.password, &user.password_hash)
            .await?;

        if !matched {
            debug!(user_id = %user.id, "Login failed: password mismatch");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }

        let token = state.signer().issue(&user, state.config().token_ttl())?;

        observe::record_user(user.id);
        info!(user_id = %user.id, "Login succeeded");

        Ok((
            StatusCode::OK,
            Json(AuthResponse {
                token,
                user: user.into(),
            }),
        ))
    })
    .await
}
