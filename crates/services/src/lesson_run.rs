use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use pathway_core::model::{Exercise, ExerciseId, ExerciseOutcome, LearnerId, LessonId};

use crate::error::LessonRunError;
use crate::progress_service::{Completion, ProgressService};

//
// ─── RUN ───────────────────────────────────────────────────────────────────────
//

/// One recorded exercise outcome and the experience it earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseResult {
    pub exercise_id: ExerciseId,
    pub outcome: ExerciseOutcome,
    pub earned_xp: u64,
}

/// Aggregated view of a lesson run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonRunProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub earned_xp: u64,
    pub is_complete: bool,
}

/// In-memory walk through a lesson's exercises, in exercise order.
///
/// The run only tallies experience. Nothing is persisted until the run is
/// handed to [`LessonRunService::finish`].
#[derive(Debug, Clone)]
pub struct LessonRun {
    lesson_id: LessonId,
    exercises: Vec<Exercise>,
    results: Vec<ExerciseResult>,
}

impl LessonRun {
    /// Start a run over `exercises`, sorted by their `order`.
    ///
    /// # Errors
    ///
    /// Returns `LessonRunError::Empty` if the lesson has no exercises.
    pub fn new(lesson_id: LessonId, mut exercises: Vec<Exercise>) -> Result<Self, LessonRunError> {
        if exercises.is_empty() {
            return Err(LessonRunError::Empty);
        }
        exercises.sort_by_key(|e| e.order);
        Ok(Self {
            lesson_id,
            exercises,
            results: Vec::new(),
        })
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn results(&self) -> &[ExerciseResult] {
        &self.results
    }

    /// The exercise awaiting an outcome, or `None` once every exercise is answered.
    #[must_use]
    pub fn current(&self) -> Option<&Exercise> {
        self.exercises.get(self.results.len())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.results.len() >= self.exercises.len()
    }

    #[must_use]
    pub fn earned_xp(&self) -> u64 {
        self.results
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.earned_xp))
    }

    #[must_use]
    pub fn progress(&self) -> LessonRunProgress {
        let total = self.exercises.len();
        let answered = self.results.len();
        LessonRunProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            earned_xp: self.earned_xp(),
            is_complete: self.is_complete(),
        }
    }

    /// Record the outcome of the current exercise and advance.
    ///
    /// Returns the experience the outcome earned.
    ///
    /// # Errors
    ///
    /// Returns `LessonRunError::Completed` if every exercise already has an outcome.
    /// Returns `LessonRunError::Outcome` if the outcome does not fit the exercise
    /// kind; the run does not advance in that case.
    pub fn record(&mut self, outcome: ExerciseOutcome) -> Result<u64, LessonRunError> {
        let exercise = self.current().ok_or(LessonRunError::Completed)?;
        let earned_xp = exercise.score(&outcome)?;
        let exercise_id = exercise.id.clone();

        debug!(lesson = %self.lesson_id, exercise = %exercise_id, earned_xp, "exercise recorded");
        self.results.push(ExerciseResult {
            exercise_id,
            outcome,
            earned_xp,
        });
        Ok(earned_xp)
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Turns a finished lesson run into a lesson completion.
#[derive(Clone)]
pub struct LessonRunService {
    progress: Arc<ProgressService>,
}

impl LessonRunService {
    #[must_use]
    pub fn new(progress: Arc<ProgressService>) -> Self {
        Self { progress }
    }

    /// Complete the run's lesson for `learner_id`, awarding the run's earned XP.
    ///
    /// # Errors
    ///
    /// Returns `LessonRunError::Incomplete` if some exercise has no outcome yet.
    /// Returns `LessonRunError::Progress` if the completion fails.
    pub async fn finish(
        &self,
        learner_id: LearnerId,
        run: &LessonRun,
    ) -> Result<Completion, LessonRunError> {
        if !run.is_complete() {
            let progress = run.progress();
            return Err(LessonRunError::Incomplete {
                answered: progress.answered,
                total: progress.total,
            });
        }

        let earned = i64::try_from(run.earned_xp()).unwrap_or(i64::MAX);
        let completion = self
            .progress
            .on_lesson_finished(learner_id, run.lesson_id().clone(), earned)
            .await?;
        Ok(completion)
    }
}
