use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pathway_core::model::{
    CourseId, DecisionId, LearnerId, LearnerProgress, LessonId, LessonSummary, UserDecision,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a learner's progress.
///
/// Rows arrive with signed integers and free-form strings; `into_progress`
/// is the only way back into the domain and rejects anything the engine
/// could not hold (negative counters, blank ids, a level out of step with
/// experience).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub learner_id: String,
    pub experience: i64,
    pub level: i64,
    pub streak: i64,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub completed_lessons: Vec<String>,
}

impl ProgressRecord {
    /// Build a record from domain progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if experience does not fit in `i64`.
    pub fn from_progress(progress: &LearnerProgress) -> Result<Self, StorageError> {
        Ok(Self {
            learner_id: progress.learner_id().to_string(),
            experience: i64::try_from(progress.experience())
                .map_err(|_| StorageError::Serialization("experience overflow".into()))?,
            level: i64::from(progress.level()),
            streak: i64::from(progress.streak()),
            last_activity_at: progress.last_activity_at(),
            completed_lessons: progress
                .completed_lessons()
                .iter()
                .map(ToString::to_string)
                .collect(),
        })
    }

    /// Convert the record back into domain `LearnerProgress`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if any field fails validation.
    pub fn into_progress(self) -> Result<LearnerProgress, StorageError> {
        let learner_id: LearnerId = self.learner_id.parse().map_err(ser)?;
        let experience = u64::try_from(self.experience).map_err(|_| {
            StorageError::Serialization(format!("invalid experience: {}", self.experience))
        })?;
        let level = u32::try_from(self.level)
            .map_err(|_| StorageError::Serialization(format!("invalid level: {}", self.level)))?;
        let streak = u32::try_from(self.streak)
            .map_err(|_| StorageError::Serialization(format!("invalid streak: {}", self.streak)))?;
        let completed = self
            .completed_lessons
            .iter()
            .map(|raw| raw.parse::<LessonId>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ser)?;

        LearnerProgress::from_persisted(
            learner_id,
            experience,
            level,
            streak,
            self.last_activity_at,
            completed,
        )
        .map_err(ser)
    }
}

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Repository contract for learner progress. The only persistence boundary the engine sees.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch a learner's progress.
    ///
    /// Returns `Ok(None)` for a learner with no recorded activity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the stored row is invalid.
    async fn get_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Option<LearnerProgress>, StorageError>;

    /// Persist a learner's full progress in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the progress cannot be stored; nothing is
    /// written in that case.
    async fn put_progress(&self, progress: &LearnerProgress) -> Result<(), StorageError>;
}

/// Read access to the lessons of a course, as published by the content layer.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or update a lesson summary.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another lesson already holds the
    /// same position in the course.
    async fn upsert_lesson(&self, lesson: &LessonSummary) -> Result<(), StorageError>;

    /// Lessons of a course sorted by ascending order. Unknown courses yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn lessons_for_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<LessonSummary>, StorageError>;
}

#[async_trait]
pub trait DecisionRepository: Send + Sync {
    /// Store the learner's choice for a decision, replacing an earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the decision cannot be stored.
    async fn record_decision(&self, decision: &UserDecision) -> Result<(), StorageError>;

    /// All choices a learner made, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn decisions_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<UserDecision>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<LearnerId, LearnerProgress>>>,
    lessons: Arc<Mutex<HashMap<LessonId, LessonSummary>>>,
    decisions: Arc<Mutex<HashMap<(LearnerId, DecisionId), UserDecision>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner_id: LearnerId,
    ) -> Result<Option<LearnerProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&learner_id).cloned())
    }

    async fn put_progress(&self, progress: &LearnerProgress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(progress.learner_id(), progress.clone());
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &LessonSummary) -> Result<(), StorageError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let taken = guard.values().any(|existing| {
            existing.id != lesson.id
                && existing.course_id == lesson.course_id
                && existing.order == lesson.order
        });
        if taken {
            return Err(StorageError::Conflict);
        }
        guard.insert(lesson.id.clone(), lesson.clone());
        Ok(())
    }

    async fn lessons_for_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<LessonSummary>, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut lessons: Vec<LessonSummary> = guard
            .values()
            .filter(|lesson| &lesson.course_id == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|lesson| lesson.order);
        Ok(lessons)
    }
}

#[async_trait]
impl DecisionRepository for InMemoryRepository {
    async fn record_decision(&self, decision: &UserDecision) -> Result<(), StorageError> {
        let mut guard = self
            .decisions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (decision.learner_id, decision.decision_id.clone()),
            decision.clone(),
        );
        Ok(())
    }

    async fn decisions_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<UserDecision>, StorageError> {
        let guard = self
            .decisions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<UserDecision> = guard
            .values()
            .filter(|d| d.learner_id == learner_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.decided_at
                .cmp(&b.decided_at)
                .then_with(|| a.decision_id.cmp(&b.decision_id))
        });
        Ok(found)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub decisions: Arc<dyn DecisionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let decisions: Arc<dyn DecisionRepository> = Arc::new(repo);
        Self {
            progress,
            lessons,
            decisions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pathway_core::model::XpAward;
    use pathway_core::time::fixed_now;
    use pathway_core::Calendar;

    fn learner() -> LearnerId {
        "6f1c2a9e-2d7b-4c1e-9a55-0b8f3f1d2c44".parse().unwrap()
    }

    fn progressed() -> LearnerProgress {
        let mut progress = LearnerProgress::new(learner());
        progress.apply_completion("L1".parse().unwrap(), XpAward::new(120), fixed_now(), &Calendar::utc());
        progress
    }

    #[tokio::test]
    async fn round_trips_progress() {
        let repo = InMemoryRepository::new();
        let progress = progressed();
        repo.put_progress(&progress).await.unwrap();

        let fetched = repo.get_progress(learner()).await.unwrap();
        assert_eq!(fetched, Some(progress));
    }

    #[tokio::test]
    async fn unknown_learner_has_no_progress() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get_progress(LearnerId::random()).await.unwrap(), None);
    }

    #[test]
    fn record_round_trips_through_domain() {
        let progress = progressed();
        let record = ProgressRecord::from_progress(&progress).unwrap();
        assert_eq!(record.level, 2);
        assert_eq!(record.completed_lessons, vec!["L1".to_string()]);
        assert_eq!(record.into_progress().unwrap(), progress);
    }

    #[test]
    fn record_rejects_negative_counters() {
        let mut record = ProgressRecord::from_progress(&progressed()).unwrap();
        record.streak = -1;
        assert!(matches!(
            record.into_progress(),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn record_rejects_stale_level() {
        let mut record = ProgressRecord::from_progress(&progressed()).unwrap();
        record.level = 1;
        assert!(matches!(
            record.into_progress(),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn record_rejects_blank_lesson_ids() {
        let mut record = ProgressRecord::from_progress(&progressed()).unwrap();
        record.completed_lessons.push("  ".into());
        assert!(record.into_progress().is_err());
    }

    #[test]
    fn record_deserializes_from_loose_json() {
        let json = r#"{
            "learner_id": "6f1c2a9e-2d7b-4c1e-9a55-0b8f3f1d2c44",
            "experience": 40,
            "level": 1,
            "streak": 2,
            "last_activity_at": null,
            "completed_lessons": ["a", "b"]
        }"#;
        let record: ProgressRecord = serde_json::from_str(json).unwrap();
        let progress = record.into_progress().unwrap();
        assert_eq!(progress.experience(), 40);
        assert_eq!(progress.completed_lessons().len(), 2);
    }

    #[tokio::test]
    async fn lessons_come_back_sorted_and_scoped() {
        let repo = InMemoryRepository::new();
        for (id, order) in [("b", 1), ("a", 0), ("c", 2)] {
            let lesson = LessonSummary::new(id.parse().unwrap(), "course".parse().unwrap(), id, order);
            repo.upsert_lesson(&lesson).await.unwrap();
        }
        repo.upsert_lesson(&LessonSummary::new("x".parse().unwrap(), "other".parse().unwrap(), "x", 0))
            .await
            .unwrap();

        let lessons = repo.lessons_for_course(&"course".parse().unwrap()).await.unwrap();
        let ids: Vec<&str> = lessons.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn duplicate_position_conflicts() {
        let repo = InMemoryRepository::new();
        repo.upsert_lesson(&LessonSummary::new("a".parse().unwrap(), "c".parse().unwrap(), "A", 0))
            .await
            .unwrap();
        let err = repo
            .upsert_lesson(&LessonSummary::new("b".parse().unwrap(), "c".parse().unwrap(), "B", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn later_decision_replaces_earlier_choice() {
        let repo = InMemoryRepository::new();
        let first = UserDecision {
            learner_id: learner(),
            lesson_id: "L1".parse().unwrap(),
            decision_id: "d1".parse().unwrap(),
            option_id: "o1".parse().unwrap(),
            decided_at: fixed_now(),
        };
        let second = UserDecision {
            option_id: "o2".parse().unwrap(),
            decided_at: fixed_now() + Duration::minutes(1),
            ..first.clone()
        };
        repo.record_decision(&first).await.unwrap();
        repo.record_decision(&second).await.unwrap();

        let stored = repo.decisions_for_learner(learner()).await.unwrap();
        assert_eq!(stored, vec![second]);
    }
}
