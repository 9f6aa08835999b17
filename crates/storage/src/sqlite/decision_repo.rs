use pathway_core::model::{LearnerId, UserDecision};

use super::SqliteRepository;
use super::mapping::{db_err, map_decision_row};
use crate::repository::{DecisionRepository, StorageError};

#[async_trait::async_trait]
impl DecisionRepository for SqliteRepository {
    async fn record_decision(&self, decision: &UserDecision) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_decisions (learner_id, decision_id, lesson_id, option_id, decided_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(learner_id, decision_id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                option_id = excluded.option_id,
                decided_at = excluded.decided_at
            ",
        )
        .bind(decision.learner_id.to_string())
        .bind(decision.decision_id.as_str())
        .bind(decision.lesson_id.as_str())
        .bind(decision.option_id.as_str())
        .bind(decision.decided_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn decisions_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<UserDecision>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT learner_id, decision_id, lesson_id, option_id, decided_at
            FROM user_decisions
            WHERE learner_id = ?1
            ORDER BY decided_at ASC, decision_id ASC
            ",
        )
        .bind(learner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut decisions = Vec::with_capacity(rows.len());
        for row in rows {
            decisions.push(map_decision_row(&row)?);
        }
        Ok(decisions)
    }
}
