// Actions available to the student's strategy policy
// The set is closed: every strategy the student can pick is a variant below

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::TutorError;

/// A member of a fixed, finite action set usable by a tabular policy
pub trait Action: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Every action in the set, in a stable order
    fn all() -> Vec<Self>;
}

/// Symbolic answering strategies the student can pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyStrategy {
    /// Give a short, direct answer
    AnswerConcisely,
    /// Give a thorough answer with explanation
    AnswerInDetail,
    /// Ask the teacher to clarify the problem first
    AskForClarification,
}

impl StudyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyStrategy::AnswerConcisely => "answer_concisely",
            StudyStrategy::AnswerInDetail => "answer_in_detail",
            StudyStrategy::AskForClarification => "ask_for_clarification",
        }
    }
}

impl Action for StudyStrategy {
    fn all() -> Vec<Self> {
        vec![
            StudyStrategy::AnswerConcisely,
            StudyStrategy::AnswerInDetail,
            StudyStrategy::AskForClarification,
        ]
    }
}

impl fmt::Display for StudyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyStrategy {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StudyStrategy::all()
            .into_iter()
            .find(|strategy| strategy.as_str() == s.trim())
            .ok_or_else(|| TutorError::parse_error(format!("unknown study strategy '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names_round_trip() {
        for strategy in StudyStrategy::all() {
            let parsed: StudyStrategy = strategy.to_string().parse().unwrap();
            assert_eq!(parsed, strategy);
        }
        assert!("answer_loudly".parse::<StudyStrategy>().is_err());
    }

    #[test]
    fn test_strategy_serializes_snake_case() {
        let json = serde_json::to_string(&StudyStrategy::AskForClarification).unwrap();
        assert_eq!(json, "\"ask_for_clarification\"");
    }
}
