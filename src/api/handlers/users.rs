//! Privileged account creation, admin only.

use crate::api::error::ApiError;
use crate::api::handlers::auth::{
    provision_account,
    types::{CreateUserRequest, UserResponse},
    utils::request_id,
    AuthState, Identity,
};
use crate::api::observe::{observed, op};
use crate::store::Role;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{info, info_span};

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Missing or invalid token", body = String),
        (status = 403, description = "Caller is not an admin", body = String),
        (status = 409, description = "User already exists", body = String)
    ),
    tag = "users"
)]
pub async fn create_user(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
    Extension(identity): Extension<Identity>,
    payload: Option<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let request_id = request_id(&headers);
    let span = info_span!(
        "user.create",
        request_id = %request_id,
        user_id = %identity.id
    );

    observed(op::USER_CREATE, span, async move {
        let Some(Json(request)) = payload else {
            return Err(ApiError::validation("Missing payload"));
        };

        let role = request.role.unwrap_or(Role::User);

        let user = provision_account(&state, &request.email, &request.password, role).await?;

        info!(
            created_user_id = %user.id,
            created_role = %user.role,
            by = %identity.id,
            "Privileged account creation"
        );

        Ok((
            StatusCode::CREATED,
            Json(UserResponse { user: user.into() }),
        ))
    })
    .await
}
