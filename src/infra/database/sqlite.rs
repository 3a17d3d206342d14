//! SQLite token store implementation.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

use crate::domain::{AccountCredential, AppError, DatabaseError, TokenStore};

/// File created inside the data directory
pub const DATABASE_FILE_NAME: &str = "time-is-money.db";

/// SQLite connection pool configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(3),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Token store backed by a single SQLite file
pub struct SqliteTokenStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteTokenStore {
    /// Open (creating if needed) `<data_dir>/time-is-money.db`
    pub async fn open(data_dir: impl AsRef<Path>, config: SqliteConfig) -> Result<Self, AppError> {
        let path = data_dir.as_ref().join(DATABASE_FILE_NAME);
        info!(path = %path.display(), "Opening SQLite token store...");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;

        info!("Opened SQLite token store");
        Ok(Self { pool, path })
    }

    /// Open with default pool settings
    pub async fn with_defaults(data_dir: impl AsRef<Path>) -> Result<Self, AppError> {
        Self::open(data_dir, SqliteConfig::default()).await
    }

    /// Create the `account_tokens` table if it does not exist yet
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Migration(e.to_string())))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the pool, flushing pending writes
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, account_id: &str) -> Result<Option<AccountCredential>, AppError> {
        let row = sqlx::query(
            "SELECT access_token, refresh_token FROM account_tokens WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(DatabaseError::Query(e.to_string())))?;

        Ok(row.map(|row| AccountCredential {
            account_id: account_id.to_string(),
            access_token: SecretString::from(row.get::<String, _>("access_token")),
            refresh_token: SecretString::from(row.get::<String, _>("refresh_token")),
        }))
    }

    #[instrument(skip(self, credential), fields(account_id = %credential.account_id))]
    async fn put(&self, credential: &AccountCredential) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO account_tokens (account_id, access_token, refresh_token, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&credential.account_id)
        .bind(credential.access_token.expose_secret())
        .bind(credential.refresh_token.expose_secret())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(DatabaseError::from(e)))?;
        Ok(())
    }
}
