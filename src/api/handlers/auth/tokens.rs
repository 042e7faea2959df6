//! Bearer token issue and verify, HS256 over a shared secret.

use crate::store::{Role, User};
use anyhow::{bail, Context, Result};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Claims embedded in every issued token. `sub` is the account id, the
/// username and role ride along so request handling never needs a store
/// lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Verification failures, kept distinct for logging while the HTTP response
/// stays a uniform 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("token expired")]
    Expired,

    #[error("invalid signature")]
    Signature,

    #[error("malformed token")]
    Malformed,
}

pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Builds a signer from the shared secret. An empty secret is refused,
    /// there is no unsigned mode.
    pub fn new(secret: &SecretString) -> Result<Self> {
        let secret = secret.expose_secret();

        if secret.trim().is_empty() {
            bail!("token secret must not be empty");
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn issue(&self, user: &User, ttl: Duration) -> Result<String> {
        let iat = unix_now()?;

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat,
            exp: iat + ttl.as_secs(),
        };

        encode(&Header::default(), &claims, &self.encoding).context("failed to sign token")
    }

    /// Checks signature and expiry with zero leeway, a token expiring now is
    /// already invalid everywhere.
    pub fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => Err(match err.kind() {
                ErrorKind::ExpiredSignature => VerifyError::Expired,
                ErrorKind::InvalidSignature => VerifyError::Signature,
                _ => VerifyError::Malformed,
            }),
        }
    }
}

fn unix_now() -> Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?;

    Ok(now.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn signer() -> TokenSigner {
        TokenSigner::new(&SecretString::from("unit-test-secret".to_string())).unwrap()
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$2b$04$stub".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert!(TokenSigner::new(&SecretString::from(String::new())).is_err());
        assert!(TokenSigner::new(&SecretString::from("   ".to_string())).is_err());
    }

    #[test]
    fn test_issue_then_verify() -> Result<()> {
        let signer = signer();
        let user = test_user();

        let token = signer.issue(&user, Duration::from_secs(900))?;
        let claims = signer.verify(&token).map_err(anyhow::Error::new)?;

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp, claims.iat + 900);

        Ok(())
    }

    #[test]
    fn test_expired_token_is_rejected() -> Result<()> {
        let signer = signer();
        let user = test_user();

        // Craft claims that expired a minute ago, signed with the same key.
        let iat = unix_now()? - 120;
        let claims = Claims {
            sub: user.id,
            username: user.username,
            role: user.role,
            iat,
            exp: iat + 60,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )?;

        assert_eq!(signer.verify(&token), Err(VerifyError::Expired));

        Ok(())
    }

    #[test]
    fn test_foreign_signature_is_rejected() -> Result<()> {
        let signer = signer();
        let other = TokenSigner::new(&SecretString::from("other-secret".to_string()))?;
        let user = test_user();

        let token = other.issue(&user, Duration::from_secs(900))?;

        assert_eq!(signer.verify(&token), Err(VerifyError::Signature));

        Ok(())
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let signer = signer();

        assert_eq!(signer.verify("not-a-token"), Err(VerifyError::Malformed));
        assert_eq!(signer.verify(""), Err(VerifyError::Malformed));
    }
}
