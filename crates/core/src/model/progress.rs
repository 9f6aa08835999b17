use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::leveling::{LevelProgress, level_for_experience};
use crate::model::ids::{LearnerId, LessonId};
use crate::streak::{next_streak, streak_is_active};
use crate::time::Calendar;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("experience cannot be negative: {0}")]
    NegativeExperience(i64),

    #[error("xp award cannot be negative: {0}")]
    NegativeXpAward(i64),

    #[error("stored level {stored} does not match experience {experience} (expected {expected})")]
    LevelMismatch {
        experience: u64,
        stored: u32,
        expected: u32,
    },
}

//
// ─── XP AWARD ──────────────────────────────────────────────────────────────────
//

/// Experience granted by one lesson completion. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct XpAward(u64);

impl XpAward {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn new(points: u64) -> Self {
        Self(points)
    }

    #[must_use]
    pub fn points(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for XpAward {
    type Error = ProgressError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| ProgressError::NegativeXpAward(value))
    }
}

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Something a completion changed, for toasts and activity feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    XpAwarded { amount: u64 },
    LevelUp { from: u32, to: u32 },
    StreakStarted,
    StreakExtended { days: u32 },
    StreakReset { previous: u32 },
}

/// Result of applying a lesson completion to a learner's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The lesson was already in the completed set; nothing changed.
    AlreadyCompleted,
    Applied(Vec<ProgressEvent>),
}

impl CompletionOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub fn events(&self) -> &[ProgressEvent] {
        match self {
            Self::AlreadyCompleted => &[],
            Self::Applied(events) => events,
        }
    }
}

//
// ─── LEARNER PROGRESS ──────────────────────────────────────────────────────────
//

/// One learner's cumulative experience, level, streak and completed lessons.
///
/// `level` is always derived from `experience`; the completed set only grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearnerProgress {
    learner_id: LearnerId,
    experience: u64,
    level: u32,
    streak: u32,
    last_activity_at: Option<DateTime<Utc>>,
    completed_lessons: BTreeSet<LessonId>,
}

impl LearnerProgress {
    /// Zero state for a learner with no recorded activity.
    #[must_use]
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            experience: 0,
            level: 1,
            streak: 0,
            last_activity_at: None,
            completed_lessons: BTreeSet::new(),
        }
    }

    /// Rehydrate progress from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::LevelMismatch` if the stored level disagrees
    /// with the stored experience.
    pub fn from_persisted(
        learner_id: LearnerId,
        experience: u64,
        level: u32,
        streak: u32,
        last_activity_at: Option<DateTime<Utc>>,
        completed_lessons: impl IntoIterator<Item = LessonId>,
    ) -> Result<Self, ProgressError> {
        let expected = level_for_experience(experience);
        if level != expected {
            return Err(ProgressError::LevelMismatch {
                experience,
                stored: level,
                expected,
            });
        }

        Ok(Self {
            learner_id,
            experience,
            level,
            streak,
            last_activity_at,
            completed_lessons: completed_lessons.into_iter().collect(),
        })
    }

    // Accessors
    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn experience(&self) -> u64 {
        self.experience
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Stored streak as of the last completion.
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_activity_at
    }

    #[must_use]
    pub fn completed_lessons(&self) -> &BTreeSet<LessonId> {
        &self.completed_lessons
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: &LessonId) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    #[must_use]
    pub fn level_progress(&self) -> LevelProgress {
        LevelProgress::for_experience(self.experience)
    }

    /// Streak to display at `now`: the stored streak while it is still alive, 0 once it lapsed.
    #[must_use]
    pub fn current_streak(&self, now: DateTime<Utc>, calendar: &Calendar) -> u32 {
        if streak_is_active(self.last_activity_at, now, calendar) {
            self.streak
        } else {
            0
        }
    }

    /// Record `lesson_id` as completed at `now`, awarding `award` experience.
    ///
    /// Completing an already-completed lesson is a no-op: no experience, no
    /// streak movement, no timestamp update.
    pub fn apply_completion(
        &mut self,
        lesson_id: LessonId,
        award: XpAward,
        now: DateTime<Utc>,
        calendar: &Calendar,
    ) -> CompletionOutcome {
        if self.completed_lessons.contains(&lesson_id) {
            return CompletionOutcome::AlreadyCompleted;
        }

        let mut events = Vec::new();

        let previous_level = self.level;
        self.experience = self.experience.saturating_add(award.points());
        self.level = level_for_experience(self.experience);
        if award.points() > 0 {
            events.push(ProgressEvent::XpAwarded {
                amount: award.points(),
            });
        }
        if self.level > previous_level {
            events.push(ProgressEvent::LevelUp {
                from: previous_level,
                to: self.level,
            });
        }

        let previous_streak = self.streak;
        self.streak = next_streak(previous_streak, self.last_activity_at, now, calendar);
        if self.last_activity_at.is_none() {
            events.push(ProgressEvent::StreakStarted);
        } else if self.streak > previous_streak {
            events.push(ProgressEvent::StreakExtended { days: self.streak });
        } else if self.streak < previous_streak {
            events.push(ProgressEvent::StreakReset {
                previous: previous_streak,
            });
        }

        self.completed_lessons.insert(lesson_id);
        self.last_activity_at = Some(now);

        CompletionOutcome::Applied(events)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn learner() -> LearnerId {
        "6f1c2a9e-2d7b-4c1e-9a55-0b8f3f1d2c44".parse().unwrap()
    }

    #[test]
    fn new_progress_is_zero_state() {
        let p = LearnerProgress::new(learner());
        assert_eq!(p.experience(), 0);
        assert_eq!(p.level(), 1);
        assert_eq!(p.streak(), 0);
        assert_eq!(p.last_activity_at(), None);
        assert!(p.completed_lessons().is_empty());
    }

    #[test]
    fn negative_award_is_rejected() {
        let err = XpAward::try_from(-5).unwrap_err();
        assert_eq!(err, ProgressError::NegativeXpAward(-5));
        assert_eq!(XpAward::try_from(20).unwrap().points(), 20);
    }

    #[test]
    fn from_persisted_rejects_level_mismatch() {
        let err =
            LearnerProgress::from_persisted(learner(), 150, 1, 0, None, Vec::new()).unwrap_err();
        assert_eq!(
            err,
            ProgressError::LevelMismatch {
                experience: 150,
                stored: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn scenario_walks_through_three_completions() {
        let cal = Calendar::utc();
        let t0 = fixed_now();
        let mut p = LearnerProgress::new(learner());

        let first = p.apply_completion("L1".parse().unwrap(), XpAward::new(20), t0, &cal);
        assert_eq!(
            first.events(),
            &[
                ProgressEvent::XpAwarded { amount: 20 },
                ProgressEvent::StreakStarted
            ]
        );
        assert_eq!((p.experience(), p.level(), p.streak()), (20, 1, 1));
        assert_eq!(p.last_activity_at(), Some(t0));

        let t1 = t0 + Duration::days(1);
        let second = p.apply_completion("L2".parse().unwrap(), XpAward::new(90), t1, &cal);
        assert!(second.events().contains(&ProgressEvent::LevelUp { from: 1, to: 2 }));
        assert!(second.events().contains(&ProgressEvent::StreakExtended { days: 2 }));
        assert_eq!((p.experience(), p.level(), p.streak()), (110, 2, 2));
        assert_eq!(p.completed_lessons().len(), 2);

        let t2 = t1 + Duration::days(3);
        let third = p.apply_completion("L3".parse().unwrap(), XpAward::new(10), t2, &cal);
        assert!(third.events().contains(&ProgressEvent::StreakReset { previous: 2 }));
        assert_eq!((p.experience(), p.level(), p.streak()), (120, 2, 1));
    }

    #[test]
    fn completing_twice_is_a_no_op() {
        let cal = Calendar::utc();
        let t0 = fixed_now();
        let mut p = LearnerProgress::new(learner());
        p.apply_completion("L1".parse().unwrap(), XpAward::new(20), t0, &cal);
        let before = p.clone();

        let again = p.apply_completion(
            "L1".parse().unwrap(),
            XpAward::new(20),
            t0 + Duration::days(1),
            &cal,
        );
        assert_eq!(again, CompletionOutcome::AlreadyCompleted);
        assert_eq!(p, before);
    }

    #[test]
    fn same_day_completion_keeps_streak() {
        let cal = Calendar::utc();
        let t0 = fixed_now();
        let mut p = LearnerProgress::new(learner());
        p.apply_completion("L1".parse().unwrap(), XpAward::ZERO, t0, &cal);
        let out = p.apply_completion("L2".parse().unwrap(), XpAward::ZERO, t0 + Duration::minutes(5), &cal);
        assert_eq!(out, CompletionOutcome::Applied(Vec::new()));
        assert_eq!(p.streak(), 1);
    }

    #[test]
    fn current_streak_lapses_for_display_only() {
        let cal = Calendar::utc();
        let t0 = fixed_now();
        let mut p = LearnerProgress::new(learner());
        p.apply_completion("L1".parse().unwrap(), XpAward::new(5), t0, &cal);
        assert_eq!(p.current_streak(t0 + Duration::days(1), &cal), 1);
        assert_eq!(p.current_streak(t0 + Duration::days(2), &cal), 0);
        assert_eq!(p.streak(), 1);
    }
}
