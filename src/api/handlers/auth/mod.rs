//! Credential endpoints and the building blocks behind them.
//!
//! ## Rate Limiting
//!
//! `/login` and `/register` sit behind a fixed-window limiter keyed by client
//! IP. Every request counts against the window, including ones rejected for
//! bad credentials, so a brute-force run cannot reset its own budget.
//!
//! ## Timing Parity
//!
//! Login burns a bcrypt verification against a precomputed filler hash when
//! the username does not exist. Unknown-user and wrong-password rejections
//! share the same status, message and timing profile.

pub(crate) mod login;
pub(crate) mod password;
pub(crate) mod principal;
pub(crate) mod rate_limit;
pub(crate) mod register;
mod state;
pub(crate) mod tokens;
pub(crate) mod types;
pub(crate) mod utils;

pub use password::{PasswordHasher, DEFAULT_COST};
pub use principal::{authenticate, authorize, Identity, ADMIN_ONLY};
pub use rate_limit::{
    throttle, FixedWindowLimiter, NoopRateLimiter, RateLimitDecision, RateLimiter,
};
pub use state::{AuthConfig, AuthState, DEFAULT_STORAGE_ROOT, DEFAULT_TOKEN_TTL};
pub use tokens::{Claims, TokenSigner, VerifyError};

use crate::api::error::ApiError;
use crate::store::{NewUser, Role, StoreError, User};
use tracing::info;

/// Validates, hashes and inserts a new account. Shared by self-registration
/// and privileged creation; the username is the normalized email.
pub(crate) async fn provision_account(
    state: &AuthState,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, ApiError> {
    let email = utils::normalize_email(email);

    if !utils::valid_email(&email) {
        return Err(ApiError::validation("Invalid email"));
    }

    if !utils::valid_password(password) {
        return Err(ApiError::validation("Invalid password"));
    }

    let password_hash = state.hasher().hash(password).await?;

    let user = state
        .store()
        .insert_user(NewUser {
            username: email.clone(),
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict => ApiError::conflict("User already exists"),
            other => ApiError::Internal(
                anyhow::Error::new(other).context("failed to create account"),
            ),
        })?;

    info!(user_id = %user.id, role = %user.role, "Account created");

    Ok(user)
}
