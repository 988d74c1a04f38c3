use tracing::{error, info};

use crate::agents::{CollaboratorResult, Student, Teacher};
use crate::config::Difficulty;
use crate::error::TutorResult;
use crate::reinforcement::{extract_reward, Action, Policy};
use crate::simulation::{LearningEnvironment, RoundRecord};

/// Keep recoverable failures inside the round; anything else ends the run
fn recoverable<V>(result: CollaboratorResult<V>, failure: &str) -> TutorResult<Option<V>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recoverable() => {
            error!("{} Skipping this round. ({})", failure, e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn preview(text: &str, len: usize) -> String {
    text.chars().take(len).collect()
}

impl<T, St, P, A> LearningEnvironment<T, St, P, A>
where
    T: Teacher,
    St: Student,
    P: Policy<String, A>,
    A: Action,
{
    /// Run one problem → attempt → evaluation → feedback → update cycle on `topic`.
    ///
    /// Returns `Ok(None)` when a collaborator failed in a recoverable way: nothing is
    /// recorded and the policy is left untouched. Unrecoverable failures are returned
    /// as errors.
    pub async fn run_interaction_round(
        &mut self,
        topic: &str,
        difficulty: Difficulty,
        total_rounds: usize,
    ) -> TutorResult<Option<RoundRecord<A>>> {
        self.rounds_attempted += 1;
        let round_number = self.rounds_attempted;
        info!(
            "--- Starting a new learning round ({}/{}) on: '{}' ---",
            round_number, total_rounds, topic
        );

        let Some(problem) = recoverable(
            self.teacher.generate_problem(topic, difficulty).await,
            "Teacher failed to generate a problem.",
        )?
        else {
            return Ok(None);
        };

        let state = topic.to_string();
        let action = self.policy.choose_action(&state);
        info!("Student decided to try the strategy: '{}'.", action);

        // The chosen strategy is not passed to the student; see DESIGN.md
        let Some(response) = recoverable(
            self.student.solve(&problem).await,
            "Student failed to generate a response.",
        )?
        else {
            return Ok(None);
        };
        info!("Student's response: '{}...'", preview(&response, 50));

        let Some(feedback) = recoverable(
            self.teacher.evaluate(&problem, &response).await,
            "Teacher failed to evaluate the student's response.",
        )?
        else {
            return Ok(None);
        };
        info!("Teacher provides feedback: '{}...'", preview(&feedback, 100));

        self.student
            .process_feedback(&problem, &response, &feedback)
            .await;

        let reward = extract_reward(&feedback);
        info!("Student received a reward of {:.2} for this round.", reward);

        // Single-step episode per topic: the transition lands back on the same topic
        self.policy.update(&state, &action, reward, Some(&state));

        let record = RoundRecord {
            round_number,
            topic: state,
            difficulty,
            problem,
            action,
            response,
            feedback,
            reward,
        };
        self.results.push(record.clone());
        info!(
            "--- Learning round completed. Reward for this round: {:.2} ---",
            reward
        );
        Ok(Some(record))
    }
}
