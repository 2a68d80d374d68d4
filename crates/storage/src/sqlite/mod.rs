//! `SQLite` backend. A single [`SqliteRepository`] implements every repository
//! trait over one shared pool.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod content_repo;
mod label_repo;
mod mapping;
mod migrate;
mod plan_repo;
mod subject_repo;

/// Pool sizing and lock waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("invalid database url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("schema migration failed: {0}")]
    Migration(#[source] sqlx::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect with [`PoolSettings::default`].
    ///
    /// # Errors
    ///
    /// See [`SqliteRepository::connect_with`].
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::connect_with(database_url, PoolSettings::default()).await
    }

    /// Open a pool with foreign keys enforced and WAL journaling.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::InvalidUrl` if the URL does not parse, or
    /// `SqliteInitError::Sqlx` if the first connection cannot be opened.
    pub async fn connect_with(
        database_url: &str,
        settings: PoolSettings,
    ) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|source| SqliteInitError::InvalidUrl {
                url: database_url.to_string(),
                source,
            })?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(settings.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await?;
        tracing::debug!(
            database_url,
            max_connections = settings.max_connections,
            "sqlite pool ready"
        );
        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending schema versions. Already-applied versions are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::Migration` if a migration statement fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool)
            .await
            .map_err(SqliteInitError::Migration)
    }

    /// Serve every repository trait from this pool.
    #[must_use]
    pub fn into_storage(self) -> Storage {
        let repo = Arc::new(self);
        Storage {
            labels: Arc::clone(&repo) as _,
            contents: Arc::clone(&repo) as _,
            subjects: Arc::clone(&repo) as _,
            plans: repo,
        }
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`, migrated and ready to query.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        Ok(SqliteRepository::open(database_url).await?.into_storage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::LabelRepository;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[tokio::test]
    async fn unknown_open_mode_is_an_invalid_url() {
        let err = SqliteRepository::connect("sqlite:file:memdb_bad_mode?mode=sideways")
            .await
            .err()
            .expect("bad mode");
        assert!(matches!(err, SqliteInitError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn open_applies_schema() {
        let repo = SqliteRepository::open("sqlite:file:memdb_open?mode=memory&cache=shared")
            .await
            .unwrap();
        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(applied, 1);

        let storage = repo.into_storage();
        assert!(storage.labels.fetch_labels("Physics").await.unwrap().is_empty());
    }
}
