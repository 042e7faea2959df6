//! Wire types for the auth endpoints.
//!
//! Requests carrying a password implement `Debug` by hand so credentials can
//! never ride into a log line through a formatting shortcut.

use crate::api::handlers::auth::principal::Identity;
use crate::store::{Role, User};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("role", &self.role)
            .finish()
    }
}

/// Account view safe to hand to clients, the hash stays server-side.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: Identity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use serde_json::json;

    #[test]
    fn test_login_request_round_trip() -> Result<()> {
        let request: LoginRequest =
            serde_json::from_value(json!({"username": "ana", "password": "secret-pass"}))
                .context("deserialize login request")?;

        assert_eq!(request.username, "ana");
        assert_eq!(request.password, "secret-pass");

        Ok(())
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let login = LoginRequest {
            username: "ana".to_string(),
            password: "secret-pass".to_string(),
        };
        let register = RegisterRequest {
            email: "ana@example.com".to_string(),
            password: "secret-pass".to_string(),
        };
        let create = CreateUserRequest {
            email: "ana@example.com".to_string(),
            password: "secret-pass".to_string(),
            role: Some(Role::Admin),
        };

        for rendered in [
            format!("{login:?}"),
            format!("{register:?}"),
            format!("{create:?}"),
        ] {
            assert!(!rendered.contains("secret-pass"));
            assert!(rendered.contains("***"));
        }
    }

    #[test]
    fn test_create_user_role_is_optional() -> Result<()> {
        let without: CreateUserRequest = serde_json::from_value(
            json!({"email": "a@b.cd", "password": "longenough"}),
        )
        .context("deserialize without role")?;
        assert!(without.role.is_none());

        let with: CreateUserRequest = serde_json::from_value(
            json!({"email": "a@b.cd", "password": "longenough", "role": "admin"}),
        )
        .context("deserialize with role")?;
        assert_eq!(with.role, Some(Role::Admin));

        Ok(())
    }

    #[test]
    fn test_public_user_exposes_no_hash() -> Result<()> {
        let user = User {
            id: Uuid::new_v4(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$2b$04$stub".to_string(),
            role: Role::User,
        };

        let value = serde_json::to_value(PublicUser::from(user)).context("serialize user")?;
        let keys: Vec<&str> = value
            .as_object()
            .context("expected object")?
            .keys()
            .map(String::as_str)
            .collect();

        assert_eq!(keys.len(), 4);
        for key in ["id", "username", "email", "role"] {
            assert!(keys.contains(&key));
        }

        Ok(())
    }

    #[test]
    fn test_auth_response_shape() -> Result<()> {
        let response = AuthResponse {
            token: "abc.def.ghi".to_string(),
            user: PublicUser {
                id: Uuid::new_v4(),
                username: "ana".to_string(),
                email: "ana@example.com".to_string(),
                role: Role::User,
            },
        };

        let value = serde_json::to_value(&response).context("serialize response")?;

        assert_eq!(value["token"], "abc.def.ghi");
        assert_eq!(value["user"]["role"], "user");

        Ok(())
    }
}
