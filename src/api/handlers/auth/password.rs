//! Password hashing, bcrypt offloaded to the blocking pool.

use anyhow::{Context, Result};
use tracing::debug;

pub const DEFAULT_COST: u32 = 12;

/// bcrypt wrapper. Hashing and verification run via `spawn_blocking` so a
/// cost-12 round never stalls the async runtime.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    filler_hash: String,
}

impl PasswordHasher {
    /// Builds a hasher and precomputes a filler hash used to equalize timing
    /// for logins against unknown usernames.
    pub fn new(cost: u32) -> Result<Self> {
        let filler_hash =
            bcrypt::hash("timing-parity-filler", cost).context("failed to precompute filler hash")?;

        Ok(Self { cost, filler_hash })
    }

    pub async fn hash(&self, password: &str) -> Result<String> {
        let cost = self.cost;
        let password = password.to_string();

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("hashing task panicked")?
            .context("failed to hash password")
    }

    /// Checks a candidate against a stored hash. A malformed stored hash is
    /// a mismatch, not an error.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();

        let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("verification task panicked")?;

        match result {
            Ok(matched) => Ok(matched),
            Err(err) => {
                debug!("Failed to verify password hash: {err}");
                Ok(false)
            }
        }
    }

    /// Burns one verification against the filler hash so an unknown username
    /// costs the same as a wrong password.
    pub async fn verify_discard(&self, password: &str) -> Result<()> {
        let filler = self.filler_hash.clone();
        let _ = self.verify(password, &filler).await?;

        Ok(())
    }
}
