use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ExerciseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutcomeError {
    #[error("exercise {0} expects a reflection, not an answer")]
    ReflectionExpected(ExerciseId),

    #[error("exercise {0} expects an answer, not a reflection")]
    AnswerExpected(ExerciseId),
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// The closed set of exercise types a lesson can contain.
///
/// Rendering and answer checking belong to the presentation layer; progress
/// only needs to know which kind of outcome to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    Reflection,
}

impl ExerciseKind {
    /// Reflections are open-ended and have no right or wrong answer.
    #[must_use]
    pub fn is_graded(self) -> bool {
        !matches!(self, Self::Reflection)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub order: u32,
    pub xp_reward: u32,
    pub kind: ExerciseKind,
}

impl Exercise {
    #[must_use]
    pub fn new(id: ExerciseId, order: u32, kind: ExerciseKind, xp_reward: u32) -> Self {
        Self {
            id,
            order,
            xp_reward,
            kind,
        }
    }

    /// Experience earned for `outcome`.
    ///
    /// A correct answer or a non-blank reflection earns the full reward;
    /// anything else earns nothing.
    ///
    /// # Errors
    ///
    /// Returns `OutcomeError` if the outcome shape does not match the exercise kind.
    pub fn score(&self, outcome: &ExerciseOutcome) -> Result<u64, OutcomeError> {
        let earned = match (self.kind.is_graded(), outcome) {
            (true, ExerciseOutcome::Answered { correct }) => *correct,
            (false, ExerciseOutcome::Reflected { text }) => !text.trim().is_empty(),
            (true, ExerciseOutcome::Reflected { .. }) => {
                return Err(OutcomeError::AnswerExpected(self.id.clone()));
            }
            (false, ExerciseOutcome::Answered { .. }) => {
                return Err(OutcomeError::ReflectionExpected(self.id.clone()));
            }
        };
        Ok(if earned { u64::from(self.xp_reward) } else { 0 })
    }
}

/// What the presentation layer reports once a learner is done with an exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExerciseOutcome {
    Answered { correct: bool },
    Reflected { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(kind: ExerciseKind) -> Exercise {
        Exercise::new("e1".parse().unwrap(), 0, kind, 10)
    }

    #[test]
    fn correct_answer_earns_reward() {
        let ex = exercise(ExerciseKind::TrueFalse);
        assert_eq!(ex.score(&ExerciseOutcome::Answered { correct: true }).unwrap(), 10);
        assert_eq!(ex.score(&ExerciseOutcome::Answered { correct: false }).unwrap(), 0);
    }

    #[test]
    fn reflection_needs_text() {
        let ex = exercise(ExerciseKind::Reflection);
        let written = ExerciseOutcome::Reflected {
            text: "I will call my brother".into(),
        };
        let blank = ExerciseOutcome::Reflected { text: "  ".into() };
        assert_eq!(ex.score(&written).unwrap(), 10);
        assert_eq!(ex.score(&blank).unwrap(), 0);
    }

    #[test]
    fn mismatched_outcome_is_rejected() {
        let graded = exercise(ExerciseKind::FillBlank);
        let err = graded
            .score(&ExerciseOutcome::Reflected { text: "x".into() })
            .unwrap_err();
        assert!(matches!(err, OutcomeError::AnswerExpected(_)));

        let reflection = exercise(ExerciseKind::Reflection);
        let err = reflection
            .score(&ExerciseOutcome::Answered { correct: true })
            .unwrap_err();
        assert!(matches!(err, OutcomeError::ReflectionExpected(_)));
    }

    #[test]
    fn outcome_is_tagged_on_the_wire() {
        let json = serde_json::to_string(&ExerciseOutcome::Answered { correct: true }).unwrap();
        assert_eq!(json, r#"{"type":"answered","correct":true}"#);
    }
}
