use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates learner progress, completed lessons, course lessons and user decisions.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS learner_progress (
                    learner_id TEXT PRIMARY KEY,
                    experience INTEGER NOT NULL CHECK (experience >= 0),
                    level INTEGER NOT NULL CHECK (level >= 1),
                    streak INTEGER NOT NULL CHECK (streak >= 0),
                    last_activity_at TEXT,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS completed_lessons (
                    learner_id TEXT NOT NULL,
                    lesson_id TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    PRIMARY KEY (learner_id, lesson_id),
                    FOREIGN KEY (learner_id) REFERENCES learner_progress(learner_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lessons (
                    id TEXT PRIMARY KEY,
                    course_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    kind TEXT NOT NULL,
                    xp_reward INTEGER NOT NULL CHECK (xp_reward >= 0),
                    UNIQUE (course_id, position)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_decisions (
                    learner_id TEXT NOT NULL,
                    decision_id TEXT NOT NULL,
                    lesson_id TEXT NOT NULL,
                    option_id TEXT NOT NULL,
                    decided_at TEXT NOT NULL,
                    PRIMARY KEY (learner_id, decision_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_user_decisions_learner_decided
                    ON user_decisions (learner_id, decided_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(version = 1, "applied sqlite migration");
    }

    Ok(())
}
