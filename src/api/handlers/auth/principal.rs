//! Request authentication and role authorization middleware.

use crate::api::error::ApiError;
use crate::api::handlers::auth::{state::AuthState, tokens::Claims};
use crate::store::Role;
use axum::{
    extract::{Extension, Request},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Verified caller, attached to the request by [`authenticate`].
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Verifies the bearer token and attaches the caller as an [`Identity`]
/// extension. Missing, malformed, expired and mis-signed tokens all get the
/// same 401, the distinction only reaches the debug log.
pub async fn authenticate(
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(request.headers()) else {
        return ApiError::unauthorized("Unauthorized").into_response();
    };

    match state.signer().verify(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(Identity::from(claims));
            next.run(request).await
        }
        Err(err) => {
            debug!("Rejected bearer token: {err}");
            ApiError::unauthorized("Unauthorized").into_response()
        }
    }
}

/// Role gate, must run after [`authenticate`]. A missing identity extension
/// is a wiring bug, not a client error.
pub async fn authorize(allowed: &'static [Role], request: Request, next: Next) -> Response {
    let Some(identity) = request.extensions().get::<Identity>() else {
        error!("Missing identity extension, authorize must run after authenticate");
        return ApiError::Internal(anyhow::anyhow!("missing identity extension")).into_response();
    };

    if !allowed.contains(&identity.role) {
        debug!(
            "Denied {} with role {} access to {}",
            identity.username,
            identity.role,
            request.uri().path()
        );
        return ApiError::forbidden("Forbidden").into_response();
    }

    next.run(request).await
}

/// Pulls the token out of `Authorization: Bearer <token>`. Surrounding
/// whitespace is tolerated, an empty token is treated as absent.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?;

    let token = token.trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
