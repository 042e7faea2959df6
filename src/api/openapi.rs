//! OpenAPI document assembled from the annotated handlers.

use crate::api::handlers::{
    auth::{
        principal::Identity,
        types::{
            AuthResponse, CreateUserRequest, LoginRequest, MeResponse, PublicUser,
            RegisterRequest, UserResponse,
        },
    },
    files, health, me, users,
};
use crate::store::Role;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::auth::login::login,
        crate::api::handlers::auth::register::register,
        me::me,
        users::create_user,
        files::download,
        health::health
    ),
    components(schemas(
        LoginRequest,
        RegisterRequest,
        CreateUserRequest,
        AuthResponse,
        UserResponse,
        MeResponse,
        PublicUser,
        Identity,
        Role,
        health::Health
    )),
    tags(
        (name = "auth", description = "Credential verification and token issuing"),
        (name = "users", description = "Privileged account management"),
        (name = "files", description = "Authenticated file downloads"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn doc() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
