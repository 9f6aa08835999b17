use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use pathway_core::model::{
    CompletionOutcome, LearnerId, LearnerProgress, LessonId, ProgressEvent, XpAward,
};
use pathway_core::Calendar;
use storage::repository::{ProgressRepository, StorageError};

use crate::error::ProgressServiceError;
use crate::Clock;

/// Snapshot after a completion together with what the completion changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub progress: LearnerProgress,
    pub outcome: CompletionOutcome,
}

impl Completion {
    /// `false` when the lesson had already been completed and nothing was written.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.outcome.is_applied()
    }

    #[must_use]
    pub fn events(&self) -> &[ProgressEvent] {
        self.outcome.events()
    }
}

type LearnerLocks = Arc<Mutex<HashMap<LearnerId, Arc<AsyncMutex<()>>>>>;

/// Applies lesson completions to learner progress and persists the result.
///
/// Completions for the same learner are serialized behind a per-learner async
/// lock held across the read-modify-write; different learners never contend.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    calendar: Calendar,
    progress: Arc<dyn ProgressRepository>,
    locks: LearnerLocks,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, calendar: Calendar, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            calendar,
            progress,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Current progress for a learner, or the zero state if nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the read fails or the stored
    /// progress is invalid.
    pub async fn snapshot(
        &self,
        learner_id: LearnerId,
    ) -> Result<LearnerProgress, ProgressServiceError> {
        let progress = self
            .progress
            .get_progress(learner_id)
            .await
            .inspect_err(|err| warn!(learner = %learner_id, error = %err, "progress read failed"))?;
        Ok(progress.unwrap_or_else(|| LearnerProgress::new(learner_id)))
    }

    /// Record a finished lesson at the service clock's current time.
    ///
    /// # Errors
    ///
    /// See [`ProgressService::complete_lesson_detailed`].
    pub async fn on_lesson_finished(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        earned_xp: i64,
    ) -> Result<Completion, ProgressServiceError> {
        let now = self.clock.now();
        self.complete_lesson_detailed(learner_id, lesson_id, earned_xp, now)
            .await
    }

    /// Complete a lesson and return the resulting snapshot.
    ///
    /// # Errors
    ///
    /// See [`ProgressService::complete_lesson_detailed`].
    pub async fn complete_lesson(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        xp_award: i64,
        now: DateTime<Utc>,
    ) -> Result<LearnerProgress, ProgressServiceError> {
        let completion = self
            .complete_lesson_detailed(learner_id, lesson_id, xp_award, now)
            .await?;
        Ok(completion.progress)
    }

    /// Complete a lesson: award experience, recompute level, advance the
    /// streak, mark the lesson completed and persist it all in one write.
    ///
    /// Completing a lesson that is already completed returns the current
    /// snapshot and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for a negative award, before
    /// any read or write.
    /// Returns `ProgressServiceError::Storage` if the read or write fails; the
    /// stored progress is left untouched in that case.
    pub async fn complete_lesson_detailed(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        xp_award: i64,
        now: DateTime<Utc>,
    ) -> Result<Completion, ProgressServiceError> {
        let award = XpAward::try_from(xp_award)?;

        let lock = self.learner_lock(learner_id)?;
        let result = {
            let _guard = lock.lock().await;
            self.apply_completion(learner_id, lesson_id, award, now)
                .await
        };
        drop(lock);
        self.release_lock(learner_id);
        result
    }

    async fn apply_completion(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
        award: XpAward,
        now: DateTime<Utc>,
    ) -> Result<Completion, ProgressServiceError> {
        let mut progress = self.snapshot(learner_id).await?;
        let outcome = progress.apply_completion(lesson_id.clone(), award, now, &self.calendar);

        if !outcome.is_applied() {
            debug!(learner = %learner_id, lesson = %lesson_id, "lesson already completed");
            return Ok(Completion { progress, outcome });
        }

        self.progress
            .put_progress(&progress)
            .await
            .inspect_err(|err| {
                warn!(learner = %learner_id, lesson = %lesson_id, error = %err, "progress write failed");
            })?;

        info!(
            learner = %learner_id,
            lesson = %lesson_id,
            xp = award.points(),
            experience = progress.experience(),
            level = progress.level(),
            streak = progress.streak(),
            "lesson completed"
        );
        for event in outcome.events() {
            if let ProgressEvent::LevelUp { from, to } = event {
                info!(learner = %learner_id, from, to, "level up");
            }
        }

        Ok(Completion { progress, outcome })
    }

    fn learner_lock(&self, learner_id: LearnerId) -> Result<Arc<AsyncMutex<()>>, StorageError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Arc::clone(locks.entry(learner_id).or_default()))
    }

    fn release_lock(&self, learner_id: LearnerId) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        if locks
            .get(&learner_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&learner_id);
        }
    }

    #[cfg(test)]
    fn tracked_learners(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}
