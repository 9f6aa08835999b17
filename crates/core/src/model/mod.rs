mod decision;
mod exercise;
mod ids;
mod lesson;
mod progress;

pub use ids::{CourseId, DecisionId, ExerciseId, LearnerId, LessonId, OptionId, ParseIdError};

pub use decision::{Decision, DecisionOption, UserDecision};
pub use exercise::{Exercise, ExerciseKind, ExerciseOutcome, OutcomeError};
pub use lesson::{LessonKind, LessonNode, LessonStatus, LessonSummary};
pub use progress::{CompletionOutcome, LearnerProgress, ProgressError, ProgressEvent, XpAward};
