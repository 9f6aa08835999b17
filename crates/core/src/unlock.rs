//! Linear unlock policy for a course's lesson path.
//!
//! The first lesson is always open; every other lesson opens once the lesson
//! right before it is completed. There is no prerequisite graph.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::model::{CourseId, LessonId, LessonNode, LessonSummary};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UnlockError {
    #[error("lessons must be sorted by strictly ascending order: {previous} then {found} at index {index}")]
    OutOfOrder {
        index: usize,
        previous: u32,
        found: u32,
    },

    #[error("lesson {lesson} belongs to course {found}, expected {expected}")]
    MixedCourses {
        lesson: LessonId,
        expected: CourseId,
        found: CourseId,
    },
}

/// Compute completed/unlocked flags for a course's lessons.
///
/// `lessons` must already be sorted by `order` with unique values and come
/// from a single course; the resolver checks but never re-sorts.
///
/// # Errors
///
/// Returns `UnlockError::OutOfOrder` for unsorted or duplicate orders and
/// `UnlockError::MixedCourses` if lessons span more than one course.
pub fn resolve(
    lessons: &[LessonSummary],
    completed: &BTreeSet<LessonId>,
) -> Result<Vec<LessonNode>, UnlockError> {
    validate(lessons)?;

    let mut nodes = Vec::with_capacity(lessons.len());
    let mut previous_completed = true;
    for lesson in lessons {
        let is_completed = completed.contains(&lesson.id);
        nodes.push(LessonNode {
            id: lesson.id.clone(),
            course_id: lesson.course_id.clone(),
            order: lesson.order,
            title: lesson.title.clone(),
            kind: lesson.kind,
            is_completed,
            is_unlocked: previous_completed,
        });
        previous_completed = is_completed;
    }
    Ok(nodes)
}

fn validate(lessons: &[LessonSummary]) -> Result<(), UnlockError> {
    let Some(first) = lessons.first() else {
        return Ok(());
    };

    for (index, pair) in lessons.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.order <= prev.order {
            return Err(UnlockError::OutOfOrder {
                index: index + 1,
                previous: prev.order,
                found: next.order,
            });
        }
        if next.course_id != first.course_id {
            return Err(UnlockError::MixedCourses {
                lesson: next.id.clone(),
                expected: first.course_id.clone(),
                found: next.course_id.clone(),
            });
        }
    }
    Ok(())
}

/// Index of the lesson the learner should take next, if any remain.
#[must_use]
pub fn unlock_frontier(nodes: &[LessonNode]) -> Option<usize> {
    nodes
        .iter()
        .position(|node| node.is_unlocked && !node.is_completed)
}

/// Roll-up of a resolved course for course cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    pub total: usize,
    pub completed: usize,
    /// Rounded completion percentage; 0 for an empty course.
    pub percent: u8,
    pub is_complete: bool,
    pub next_lesson: Option<LessonId>,
}

impl CourseProgress {
    #[must_use]
    pub fn from_nodes(nodes: &[LessonNode]) -> Self {
        let total = nodes.len();
        let completed = nodes.iter().filter(|n| n.is_completed).count();
        let percent = if total == 0 {
            0
        } else {
            u8::try_from((completed * 100 + total / 2) / total).unwrap_or(100)
        };
        Self {
            total,
            completed,
            percent,
            is_complete: total > 0 && completed == total,
            next_lesson: unlock_frontier(nodes).map(|i| nodes[i].id.clone()),
        }
    }
}
