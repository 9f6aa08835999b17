use std::sync::Arc;

use tracing::info;

use pathway_core::model::{Decision, LearnerId, OptionId, UserDecision};
use storage::repository::DecisionRepository;

use crate::error::DecisionServiceError;
use crate::Clock;

/// Records the personal decisions learners make at the end of a lesson.
#[derive(Clone)]
pub struct DecisionService {
    clock: Clock,
    decisions: Arc<dyn DecisionRepository>,
}

impl DecisionService {
    #[must_use]
    pub fn new(clock: Clock, decisions: Arc<dyn DecisionRepository>) -> Self {
        Self { clock, decisions }
    }

    /// Persist the learner's choice of `option_id` for `decision`.
    ///
    /// Choosing again for the same decision replaces the earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `DecisionServiceError::UnknownOption` if `option_id` is not one of
    /// the decision's options.
    /// Returns `DecisionServiceError::Storage` if persistence fails.
    pub async fn record(
        &self,
        learner_id: LearnerId,
        decision: &Decision,
        option_id: OptionId,
    ) -> Result<UserDecision, DecisionServiceError> {
        if decision.option(&option_id).is_none() {
            return Err(DecisionServiceError::UnknownOption {
                decision: decision.id.clone(),
                option: option_id,
            });
        }

        let record = UserDecision {
            learner_id,
            lesson_id: decision.lesson_id.clone(),
            decision_id: decision.id.clone(),
            option_id,
            decided_at: self.clock.now(),
        };
        self.decisions.record_decision(&record).await?;
        info!(
            learner = %learner_id,
            decision = %record.decision_id,
            option = %record.option_id,
            "decision recorded"
        );
        Ok(record)
    }

    /// Every decision the learner has made, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DecisionServiceError::Storage` if repository access fails.
    pub async fn decisions_for(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<UserDecision>, DecisionServiceError> {
        let decisions = self.decisions.decisions_for_learner(learner_id).await?;
        Ok(decisions)
    }
}
