use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LessonId};

/// Visual weight of a lesson on the course path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    #[default]
    Normal,
    Challenge,
}

impl LessonKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Challenge => "challenge",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "normal" => Some(Self::Normal),
            "challenge" => Some(Self::Challenge),
            _ => None,
        }
    }
}

/// The slice of a lesson the progress engine needs: identity, position and reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub id: LessonId,
    pub course_id: CourseId,
    pub title: String,
    /// Zero-based position within the course.
    pub order: u32,
    pub kind: LessonKind,
    pub xp_reward: u32,
}

impl LessonSummary {
    #[must_use]
    pub fn new(id: LessonId, course_id: CourseId, title: impl Into<String>, order: u32) -> Self {
        Self {
            id,
            course_id,
            title: title.into(),
            order,
            kind: LessonKind::Normal,
            xp_reward: 0,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: LessonKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_xp_reward(mut self, xp_reward: u32) -> Self {
        self.xp_reward = xp_reward;
        self
    }
}

/// How a lesson appears on the learner's course path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Locked,
    Unlocked,
    Completed,
}

/// A lesson's status for one learner within a course traversal. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonNode {
    pub id: LessonId,
    pub course_id: CourseId,
    pub order: u32,
    pub title: String,
    pub kind: LessonKind,
    pub is_completed: bool,
    pub is_unlocked: bool,
}

impl LessonNode {
    #[must_use]
    pub fn status(&self) -> LessonStatus {
        if self.is_completed {
            LessonStatus::Completed
        } else if self.is_unlocked {
            LessonStatus::Unlocked
        } else {
            LessonStatus::Locked
        }
    }
}
