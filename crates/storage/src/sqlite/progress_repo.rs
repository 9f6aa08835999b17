use chrono::Utc;
use pathway_core::model::{LearnerId, LearnerProgress};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, map_progress_row};
use crate::repository::{ProgressRecord, ProgressRepository, StorageError, ser};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Option<LearnerProgress>, StorageError> {
        let learner = learner_id.to_string();
        // Read the row and its completed lessons from one snapshot.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query(
            r"
            SELECT learner_id, experience, level, streak, last_activity_at
            FROM learner_progress WHERE learner_id = ?1
            ",
        )
        .bind(&learner)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            tx.commit().await.map_err(db_err)?;
            return Ok(None);
        };

        let lesson_rows = sqlx::query(
            r"
            SELECT lesson_id FROM completed_lessons
            WHERE learner_id = ?1
            ORDER BY completed_at ASC, lesson_id ASC
            ",
        )
        .bind(&learner)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        let mut completed = Vec::with_capacity(lesson_rows.len());
        for lesson_row in &lesson_rows {
            completed.push(lesson_row.try_get::<String, _>("lesson_id").map_err(ser)?);
        }

        map_progress_row(&row, completed)?.into_progress().map(Some)
    }

    async fn put_progress(&self, progress: &LearnerProgress) -> Result<(), StorageError> {
        let record = ProgressRecord::from_progress(progress)?;
        let completed_at = record.last_activity_at.unwrap_or_else(Utc::now);
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO learner_progress (learner_id, experience, level, streak, last_activity_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(learner_id) DO UPDATE SET
                experience = excluded.experience,
                level = excluded.level,
                streak = excluded.streak,
                last_activity_at = excluded.last_activity_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&record.learner_id)
        .bind(record.experience)
        .bind(record.level)
        .bind(record.streak)
        .bind(record.last_activity_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        // The completed set only grows; rows already present keep their first timestamp.
        for lesson_id in &record.completed_lessons {
            sqlx::query(
                r"
                INSERT INTO completed_lessons (learner_id, lesson_id, completed_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(learner_id, lesson_id) DO NOTHING
                ",
            )
            .bind(&record.learner_id)
            .bind(lesson_id)
            .bind(completed_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
