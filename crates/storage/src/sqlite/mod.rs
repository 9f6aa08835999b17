use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;
use tracing::debug;

use crate::repository::{DecisionRepository, LessonRepository, ProgressRepository, Storage};

mod decision_repo;
mod lesson_repo;
mod mapping;
mod migrate;
mod progress_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Pool and pragma settings derived from a database URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
    pub in_memory: bool,
}

impl SqliteSettings {
    /// Defaults for `database_url`; `:memory:` and `mode=memory` URLs are in-memory.
    #[must_use]
    pub fn for_url(database_url: &str) -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            in_memory: database_url.contains(":memory:") || database_url.contains("mode=memory"),
        }
    }

    /// An in-memory database is dropped with its last connection, so one stays open.
    #[must_use]
    pub fn min_connections(&self) -> u32 {
        u32::from(self.in_memory)
    }

    #[must_use]
    pub fn journal_mode(&self) -> SqliteJournalMode {
        if self.in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        }
    }
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL and the settings it implies.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or the connection
    /// cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::connect_with(database_url, &SqliteSettings::for_url(database_url)).await
    }

    /// Connect with explicit pool settings.
    ///
    /// Foreign keys are always enforced.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or the connection
    /// cannot be established.
    pub async fn connect_with(
        database_url: &str,
        settings: &SqliteSettings,
    ) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .foreign_keys(true)
            .busy_timeout(settings.busy_timeout)
            .journal_mode(settings.journal_mode());
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections())
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await?;
        debug!(database_url, in_memory = settings.in_memory, "connected to sqlite");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let decisions: Arc<dyn DecisionRepository> = Arc::new(repo);
        Ok(Self {
            progress,
            lessons,
            decisions,
        })
    }
}
