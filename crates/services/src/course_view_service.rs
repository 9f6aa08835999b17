use std::sync::Arc;

use tracing::debug;

use pathway_core::model::{CourseId, LearnerId, LessonNode};
use pathway_core::unlock::{self, CourseProgress};
use storage::repository::{LessonRepository, ProgressRepository};

use crate::error::CourseViewError;

/// Builds a learner's view of a course path from lessons and stored progress.
#[derive(Clone)]
pub struct CourseViewService {
    lessons: Arc<dyn LessonRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl CourseViewService {
    #[must_use]
    pub fn new(lessons: Arc<dyn LessonRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { lessons, progress }
    }

    /// Lessons of `course_id` in order, with completed/unlocked flags for `learner_id`.
    ///
    /// A learner with no recorded progress sees only the first lesson unlocked.
    ///
    /// # Errors
    ///
    /// Returns `CourseViewError::Storage` if lessons or progress cannot be read.
    /// Returns `CourseViewError::Unlock` if the stored lessons are not a valid linear path.
    pub async fn course_lesson_view(
        &self,
        learner_id: LearnerId,
        course_id: &CourseId,
    ) -> Result<Vec<LessonNode>, CourseViewError> {
        let lessons = self.lessons.lessons_for_course(course_id).await?;
        let completed = self
            .progress
            .get_progress(learner_id)
            .await?
            .map(|p| p.completed_lessons().clone())
            .unwrap_or_default();

        let nodes = unlock::resolve(&lessons, &completed)?;
        debug!(
            learner = %learner_id,
            course = %course_id,
            lessons = nodes.len(),
            completed = nodes.iter().filter(|n| n.is_completed).count(),
            "course view built"
        );
        Ok(nodes)
    }

    /// Completion roll-up for a course card.
    ///
    /// # Errors
    ///
    /// See [`CourseViewService::course_lesson_view`].
    pub async fn course_progress(
        &self,
        learner_id: LearnerId,
        course_id: &CourseId,
    ) -> Result<CourseProgress, CourseViewError> {
        let nodes = self.course_lesson_view(learner_id, course_id).await?;
        Ok(CourseProgress::from_nodes(&nodes))
    }
}
