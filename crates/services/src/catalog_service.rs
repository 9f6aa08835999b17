use std::sync::Arc;

use tracing::debug;

use pathway_core::model::{CourseId, LessonId, LessonSummary};
use storage::repository::{LessonRepository, StorageError};

/// Publishes lesson summaries for the content layer.
#[derive(Clone)]
pub struct CatalogService {
    lessons: Arc<dyn LessonRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(lessons: Arc<dyn LessonRepository>) -> Self {
        Self { lessons }
    }

    /// Publish a linear course of `count` lessons numbered from zero.
    ///
    /// Re-publishing the same course updates titles in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another lesson already holds one of
    /// the positions, or any other `StorageError` from the repository.
    pub async fn publish_linear_course(
        &self,
        course_id: &CourseId,
        count: u32,
        xp_reward: u32,
    ) -> Result<Vec<LessonSummary>, StorageError> {
        let mut published = Vec::new();
        for order in 0..count {
            let lesson_id = LessonId::new(format!("{course_id}-{:02}", order + 1))
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            let lesson = LessonSummary::new(
                lesson_id,
                course_id.clone(),
                format!("Lesson {}", order + 1),
                order,
            )
            .with_xp_reward(xp_reward);
            self.lessons.upsert_lesson(&lesson).await?;
            published.push(lesson);
        }
        debug!(course = %course_id, lessons = count, "course published");
        Ok(published)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn lessons(&self, course_id: &CourseId) -> Result<Vec<LessonSummary>, StorageError> {
        self.lessons.lessons_for_course(course_id).await
    }
}
