use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{DecisionId, LearnerId, LessonId, OptionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: OptionId,
    pub text: String,
}

/// A personal commitment prompt shown at the end of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub lesson_id: LessonId,
    pub title: String,
    pub description: String,
    pub options: Vec<DecisionOption>,
}

impl Decision {
    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&DecisionOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}

/// The option a learner picked for a lesson's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDecision {
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub decision_id: DecisionId,
    pub option_id: OptionId,
    pub decided_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_options_by_id() {
        let decision = Decision {
            id: "d1".parse().unwrap(),
            lesson_id: "L1".parse().unwrap(),
            title: "This week".into(),
            description: "Pick one".into(),
            options: vec![
                DecisionOption {
                    id: "o1".parse().unwrap(),
                    text: "Forgive".into(),
                },
                DecisionOption {
                    id: "o2".parse().unwrap(),
                    text: "Pray".into(),
                },
            ],
        };
        assert_eq!(decision.option(&"o2".parse().unwrap()).map(|o| o.text.as_str()), Some("Pray"));
        assert!(decision.option(&"o3".parse().unwrap()).is_none());
    }
}
