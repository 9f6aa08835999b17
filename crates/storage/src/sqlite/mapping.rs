use pathway_core::model::{
    CourseId, DecisionId, LearnerId, LessonId, LessonKind, LessonSummary, OptionId, UserDecision,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ProgressRecord, StorageError, ser};

/// Unique-constraint violations become `Conflict`; everything else is a backend failure.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_progress_row(
    row: &SqliteRow,
    completed_lessons: Vec<String>,
) -> Result<ProgressRecord, StorageError> {
    Ok(ProgressRecord {
        learner_id: row.try_get("learner_id").map_err(ser)?,
        experience: row.try_get("experience").map_err(ser)?,
        level: row.try_get("level").map_err(ser)?,
        streak: row.try_get("streak").map_err(ser)?,
        last_activity_at: row.try_get("last_activity_at").map_err(ser)?,
        completed_lessons,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<LessonSummary, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = LessonKind::parse(&kind_str)
        .ok_or_else(|| StorageError::Serialization(format!("invalid lesson kind: {kind_str}")))?;

    Ok(LessonSummary {
        id: row
            .try_get::<String, _>("id")
            .map_err(ser)?
            .parse::<LessonId>()
            .map_err(ser)?,
        course_id: row
            .try_get::<String, _>("course_id")
            .map_err(ser)?
            .parse::<CourseId>()
            .map_err(ser)?,
        title: row.try_get("title").map_err(ser)?,
        order: i64_to_u32("position", row.try_get("position").map_err(ser)?)?,
        kind,
        xp_reward: i64_to_u32("xp_reward", row.try_get("xp_reward").map_err(ser)?)?,
    })
}

pub(crate) fn map_decision_row(row: &SqliteRow) -> Result<UserDecision, StorageError> {
    Ok(UserDecision {
        learner_id: row
            .try_get::<String, _>("learner_id")
            .map_err(ser)?
            .parse::<LearnerId>()
            .map_err(ser)?,
        lesson_id: row
            .try_get::<String, _>("lesson_id")
            .map_err(ser)?
            .parse::<LessonId>()
            .map_err(ser)?,
        decision_id: row
            .try_get::<String, _>("decision_id")
            .map_err(ser)?
            .parse::<DecisionId>()
            .map_err(ser)?,
        option_id: row
            .try_get::<String, _>("option_id")
            .map_err(ser)?
            .parse::<OptionId>()
            .map_err(ser)?,
        decided_at: row.try_get("decided_at").map_err(ser)?,
    })
}
