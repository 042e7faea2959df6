//! Server action, wires the store, auth state and router together.

use crate::api::{self, handlers::auth};
use crate::cli::telemetry;
use crate::store::{NewUser, PgStore, Role, StoreError, UserStore};
use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: SecretString,
    pub token_ttl_seconds: u64,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_max_requests: u32,
    pub cors_origins: Vec<String>,
    pub storage_root: PathBuf,
    pub diagnostics: bool,
}

impl Args {
    /// Cross-argument checks beyond what clap enforces per flag.
    pub fn validate(&self) -> Result<()> {
        if self.token_secret.expose_secret().trim().is_empty() {
            bail!("token secret must not be empty");
        }

        if self.storage_root.as_os_str().is_empty() {
            bail!("storage root must not be empty");
        }

        Ok(())
    }
}

pub async fn execute(args: Args) -> Result<()> {
    api::set_diagnostics(args.diagnostics);

    let metrics = telemetry::install_metrics_recorder()?;

    let store = PgStore::connect(&args.dsn).await?;
    store.ensure_schema().await?;

    let hasher = auth::PasswordHasher::new(auth::DEFAULT_COST)?;

    if store.is_empty().await? {
        seed_demo_accounts(&store, &hasher).await?;
    }

    ensure_storage_root(&args.storage_root).await?;

    let signer = auth::TokenSigner::new(&args.token_secret)?;

    let limiter = auth::FixedWindowLimiter::new(
        Duration::from_secs(args.rate_limit_window_seconds),
        args.rate_limit_max_requests,
    );

    let config = auth::AuthConfig::new()
        .with_token_ttl(Duration::from_secs(args.token_ttl_seconds))
        .with_storage_root(args.storage_root.clone());

    let state = Arc::new(auth::AuthState::new(
        config,
        Arc::new(store),
        hasher,
        signer,
        Arc::new(limiter),
    ));

    api::new(args.port, state, metrics, &args.cors_origins).await?;

    telemetry::shutdown_tracer();

    Ok(())
}

/// Demo accounts so a fresh environment is usable out of the box. Runs only
/// when the users table is empty.
async fn seed_demo_accounts(store: &PgStore, hasher: &auth::PasswordHasher) -> Result<()> {
    let seeds = [
        ("admin", "admin@example.com", "admin123", Role::Admin),
        ("user", "user@example.com", "password", Role::User),
    ];

    for (username, email, password, role) in seeds {
        let password_hash = hasher.hash(password).await?;

        let result = store
            .insert_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role,
            })
            .await;

        match result {
            Ok(user) => info!(user_id = %user.id, username, "Seeded demo account"),
            Err(StoreError::Conflict) => {}
            Err(err) => {
                return Err(anyhow::Error::new(err).context("failed to seed demo accounts"));
            }
        }
    }

    Ok(())
}

/// Creates the storage root with two placeholder files on first run.
async fn ensure_storage_root(root: &Path) -> Result<()> {
    if tokio::fs::metadata(root).await.is_ok() {
        return Ok(());
    }

    tokio::fs::create_dir_all(root)
        .await
        .with_context(|| format!("failed to create storage root {}", root.display()))?;

    tokio::fs::write(root.join("photo.jpg"), b"fake image content")
        .await
        .context("failed to write placeholder photo.jpg")?;

    tokio::fs::write(root.join("document.pdf"), b"fake pdf content")
        .await
        .context("failed to write placeholder document.pdf")?;

    info!("Created storage root {}", root.display());

    Ok(())
}
