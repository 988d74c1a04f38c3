// Teacher and student roles driven by the simulation
// The simulation only sees the traits below; the Llm* types back them with a language model

pub mod student;
pub mod teacher;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Difficulty;
use crate::integrations::ModelError;

pub use student::LlmStudent;
pub use teacher::LlmTeacher;

/// Marker that older text-only collaborators put in failed replies
pub const ERROR_MARKER: &str = "Error";

/// Failure reported by a teacher or student
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    /// This request failed; the round can be skipped and the run continues
    #[error("{0}")]
    Failed(String),

    /// The collaborator can no longer serve requests; the run must stop
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

impl CollaboratorError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, CollaboratorError::Failed(_))
    }

    /// Classify a model failure for the request described by `what`
    pub fn from_model(what: &str, error: ModelError) -> Self {
        if error.is_unreachable() {
            Self::Unavailable(format!("{}: {}", what, error))
        } else {
            Self::Failed(format!("{}: {}", what, error))
        }
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Turn a marker-carrying text reply into a tagged result
pub fn classify_reply(text: String) -> CollaboratorResult<String> {
    if text.contains(ERROR_MARKER) {
        Err(CollaboratorError::Failed(text))
    } else {
        Ok(text)
    }
}

/// The content-generating role
#[async_trait]
pub trait Teacher: Send + Sync {
    /// Pose a problem on `topic` at the requested difficulty
    async fn generate_problem(&self, topic: &str, difficulty: Difficulty)
        -> CollaboratorResult<String>;

    /// Produce feedback on the student's attempt at `problem`
    async fn evaluate(&self, problem: &str, attempt: &str) -> CollaboratorResult<String>;

    /// Propose a follow-up topic given the latest topic and a performance summary
    async fn synthesize_topic(
        &self,
        current_topic: &str,
        performance_summary: &str,
    ) -> CollaboratorResult<String>;

    /// Adapt to the mean reward of the last evolution window
    async fn evolve(&mut self, mean_reward: f64);
}

/// The problem-solving role
#[async_trait]
pub trait Student: Send + Sync {
    /// Attempt a solution to `problem`
    async fn solve(&self, problem: &str) -> CollaboratorResult<String>;

    /// Take in the teacher's feedback on an attempt
    async fn process_feedback(&mut self, problem: &str, attempt: &str, feedback: &str);

    /// Adapt to the mean reward of the last evolution window
    async fn evolve(&mut self, mean_reward: f64);
}
