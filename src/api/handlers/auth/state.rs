//! Shared state wired into the router as `Extension<Arc<AuthState>>`.

use crate::api::handlers::auth::{
    password::PasswordHasher, rate_limit::RateLimiter, tokens::TokenSigner,
};
use crate::store::UserStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(900);
pub const DEFAULT_STORAGE_ROOT: &str = "uploads";

/// Tunables the handlers read at request time.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    token_ttl: Duration,
    storage_root: PathBuf,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_ttl: DEFAULT_TOKEN_TTL,
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
        }
    }

    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    #[must_use]
    pub const fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    #[must_use]
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Store, hasher, signer and limiter behind one handle.
pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    signer: TokenSigner,
    limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        signer: TokenSigner,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            config,
            store,
            hasher,
            signer,
            limiter,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    #[must_use]
    pub const fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    #[must_use]
    pub fn limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AuthConfig::new();

        assert_eq!(config.token_ttl(), Duration::from_secs(900));
        assert_eq!(config.storage_root(), Path::new("uploads"));
    }

    #[test]
    fn test_config_builders() {
        let config = AuthConfig::new()
            .with_token_ttl(Duration::from_secs(60))
            .with_storage_root("/srv/files");

        assert_eq!(config.token_ttl(), Duration::from_secs(60));
        assert_eq!(config.storage_root(), Path::new("/srv/files"));
    }
}
