use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::agents::{classify_reply, CollaboratorError, CollaboratorResult, Student};
use crate::integrations::LanguageModel;

/// Student backed by a language model
pub struct LlmStudent {
    model: Arc<dyn LanguageModel>,
    /// Overrides the client's default model
    student_model: Option<String>,
    /// Reflection produced after the most recent feedback
    last_reflection: Option<String>,
    performance_history: Vec<f64>,
}

impl LlmStudent {
    pub fn new(model: Arc<dyn LanguageModel>, student_model: Option<String>) -> Self {
        info!(
            "StudentAgent initialized with model: {}",
            student_model.as_deref().unwrap_or(model.default_model())
        );
        Self {
            model,
            student_model,
            last_reflection: None,
            performance_history: Vec::new(),
        }
    }

    pub fn last_reflection(&self) -> Option<&str> {
        self.last_reflection.as_deref()
    }

    pub fn performance_history(&self) -> &[f64] {
        &self.performance_history
    }

    /// Reflect privately on an attempt and the feedback it received
    pub async fn reflect_on_feedback(
        &self,
        problem: &str,
        attempt: &str,
        feedback: &str,
    ) -> CollaboratorResult<String> {
        let prompt = format!(
            "You are a student. You attempted to solve the following problem:\n\
             Problem: {problem}\n\n\
             Your response was: {attempt}\n\n\
             The teacher provided the following feedback: {feedback}\n\n\
             Based on this, reflect on what you learned, what you could have done better, \
             and how you will approach similar problems in the future. Be concise."
        );

        match self
            .model
            .generate(&prompt, self.student_model.as_deref())
            .await
        {
            Ok(reply) => classify_reply(reply),
            Err(e) => Err(CollaboratorError::from_model("generate reflection", e)),
        }
    }
}

#[async_trait]
impl Student for LlmStudent {
    async fn solve(&self, problem: &str) -> CollaboratorResult<String> {
        let prompt = format!(
            "You are a student. Here is a problem: {problem}\n\n\
             Provide a clear and concise answer or solution to the problem."
        );
        info!(
            "Student is thinking about problem: {}...",
            problem.chars().take(50).collect::<String>()
        );

        match self
            .model
            .generate(&prompt, self.student_model.as_deref())
            .await
        {
            Ok(reply) => classify_reply(reply),
            Err(e) => {
                error!("Student failed to generate a response: {}", e);
                Err(CollaboratorError::from_model("solve problem", e))
            }
        }
    }

    async fn process_feedback(&mut self, problem: &str, attempt: &str, feedback: &str) {
        info!(
            "Student received feedback for its response to problem: '{}...'",
            problem.chars().take(50).collect::<String>()
        );

        // Reflection is best effort; the round result does not depend on it
        match self.reflect_on_feedback(problem, attempt, feedback).await {
            Ok(reflection) => {
                info!(
                    "Student's reflection: '{}...'",
                    reflection.chars().take(100).collect::<String>()
                );
                self.last_reflection = Some(reflection);
            }
            Err(e) => error!("Student failed to generate a reflection: {}", e),
        }
    }

    async fn evolve(&mut self, mean_reward: f64) {
        info!(
            "Student is evolving its learning strategy based on its recent performance (metric: {:.2}).",
            mean_reward
        );
        self.performance_history.push(mean_reward);
    }
}
