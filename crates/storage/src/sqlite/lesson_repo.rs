use pathway_core::model::{CourseId, LessonSummary};

use super::SqliteRepository;
use super::mapping::{db_err, map_lesson_row};
use crate::repository::{LessonRepository, StorageError};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &LessonSummary) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, course_id, title, position, kind, xp_reward)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                position = excluded.position,
                kind = excluded.kind,
                xp_reward = excluded.xp_reward
            ",
        )
        .bind(lesson.id.as_str())
        .bind(lesson.course_id.as_str())
        .bind(&lesson.title)
        .bind(i64::from(lesson.order))
        .bind(lesson.kind.as_str())
        .bind(i64::from(lesson.xp_reward))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn lessons_for_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<LessonSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, position, kind, xp_reward
            FROM lessons
            WHERE course_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(course_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            lessons.push(map_lesson_row(&row)?);
        }
        Ok(lessons)
    }
}
