//! PostgreSQL-backed user store.

use crate::store::{NewUser, Role, StoreError, StoreResult, User, UserStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};
use uuid::Uuid;

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects with a small pool, connections are recycled every 2 minutes
    /// and verified before being handed out.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(120))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Creates the users table when missing. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE",
            db.statement = CREATE_USERS_TABLE
        );

        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to create users table")?;

        Ok(())
    }

    /// True when no accounts exist yet, used to gate demo seeding.
    pub async fn is_empty(&self) -> Result<bool> {
        let query = "SELECT COUNT(*) FROM users";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let count: i64 = sqlx::query_scalar(query)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to count users")?;

        Ok(count == 0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<User> {
        let query = "SELECT id, username, email, password_hash, role FROM users WHERE username = $1";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up user")?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let query =
            "INSERT INTO users (id, username, email, password_hash, role) VALUES ($1, $2, $3, $4, $5)";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        let id = Uuid::new_v4();

        let result = sqlx::query(query)
            .bind(id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(User {
                id,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                role: user.role,
            }),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(StoreError::Unexpected(
                anyhow::Error::new(err).context("failed to insert user"),
            )),
        }
    }

    async fn health_check(&self) -> StoreResult<()> {
        let acquire_span = info_span!("db.acquire");

        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire connection")?;

        let ping_span = info_span!("db.ping");

        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")?;

        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: String = row.try_get("role").context("missing role column")?;

    Ok(User {
        id: row.try_get("id").context("missing id column")?,
        username: row.try_get("username").context("missing username column")?,
        email: row.try_get("email").context("missing email column")?,
        password_hash: row
            .try_get("password_hash")
            .context("missing password_hash column")?,
        role: role.parse::<Role>()?,
    })
}

/// SQLSTATE 23505 is a unique constraint violation, surfaced as a conflict so
/// duplicate registrations map to 409 instead of 500.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == "23505")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<String>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl std::error::Error for TestDbError {}

    impl sqlx::error::DatabaseError for TestDbError {
        fn message(&self) -> &str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.as_deref().map(Cow::Borrowed)
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn test_unique_violation_detected() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505".to_string()),
        }));

        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_other_database_error_is_not_unique_violation() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("42P01".to_string()),
        }));

        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_missing_code_is_not_unique_violation() {
        let err = sqlx::Error::Database(Box::new(TestDbError { code: None }));

        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
