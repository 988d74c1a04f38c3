use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::agents::{classify_reply, CollaboratorError, CollaboratorResult, Teacher};
use crate::config::Difficulty;
use crate::integrations::LanguageModel;

/// Teacher backed by a language model
pub struct LlmTeacher {
    model: Arc<dyn LanguageModel>,
    /// Overrides the client's default model
    teacher_model: Option<String>,
    /// Mean rewards reported at each evolution point
    performance_history: Vec<f64>,
}

impl LlmTeacher {
    pub fn new(model: Arc<dyn LanguageModel>, teacher_model: Option<String>) -> Self {
        info!(
            "TeacherAgent initialized with model: {}",
            teacher_model.as_deref().unwrap_or(model.default_model())
        );
        Self {
            model,
            teacher_model,
            performance_history: Vec::new(),
        }
    }

    pub fn performance_history(&self) -> &[f64] {
        &self.performance_history
    }

    async fn ask(&self, what: &str, prompt: &str) -> CollaboratorResult<String> {
        match self
            .model
            .generate(prompt, self.teacher_model.as_deref())
            .await
        {
            Ok(reply) => classify_reply(reply),
            Err(e) => {
                error!("Teacher failed to {}: {}", what, e);
                Err(CollaboratorError::from_model(what, e))
            }
        }
    }
}

fn problem_prompt(topic: &str, difficulty: Difficulty) -> String {
    format!(
        "As an expert teacher, create a {difficulty} difficulty learning problem on the topic of '{topic}'.\n\
         The problem should be self-contained and answerable in a few paragraphs. \
         Provide only the problem statement."
    )
}

fn evaluation_prompt(problem: &str, attempt: &str) -> String {
    format!(
        "Evaluate the following student response to the problem below.\n\
         Problem: {problem}\n\n\
         Student response: {attempt}\n\n\
         State clearly whether the response is correct or incorrect. \
         Describe its strengths and any areas for improvement. Be concise and constructive."
    )
}

fn topic_prompt(current_topic: &str, performance_summary: &str) -> String {
    format!(
        "As an expert educator, you are teaching a student about '{current_topic}'.\n\
         Based on the student's overall performance '{performance_summary}', \
         propose a new, related learning topic that would be a logical next step or \
         address a knowledge gap. Provide only the topic name, concisely."
    )
}

#[async_trait]
impl Teacher for LlmTeacher {
    async fn generate_problem(
        &self,
        topic: &str,
        difficulty: Difficulty,
    ) -> CollaboratorResult<String> {
        info!("Teacher is generating a {} problem on '{}'", difficulty, topic);
        self.ask("generate learning material", &problem_prompt(topic, difficulty))
            .await
    }

    async fn evaluate(&self, problem: &str, attempt: &str) -> CollaboratorResult<String> {
        self.ask(
            "evaluate student response",
            &evaluation_prompt(problem, attempt),
        )
        .await
    }

    async fn synthesize_topic(
        &self,
        current_topic: &str,
        performance_summary: &str,
    ) -> CollaboratorResult<String> {
        let reply = self
            .ask(
                "synthesize new topic",
                &topic_prompt(current_topic, performance_summary),
            )
            .await?;

        // Models tend to wrap the name in quotes or trailing newlines
        let topic = reply.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if topic.is_empty() {
            return Err(CollaboratorError::failed("teacher proposed an empty topic"));
        }
        Ok(topic.to_string())
    }

    async fn evolve(&mut self, mean_reward: f64) {
        info!(
            "Teacher is evolving its teaching strategy based on student performance (metric: {:.2}).",
            mean_reward
        );
        self.performance_history.push(mean_reward);
    }
}
