use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agents::{Student, Teacher};
use crate::config::{Difficulty, SimulationConfig};
use crate::error::{TutorError, TutorResult};
use crate::reinforcement::{Action, Policy};
use crate::simulation::{
    Curriculum, LearningEnvironment, SimulationEvent, SummaryStatistics,
};

/// Shape of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationPlan {
    pub num_rounds: usize,
    /// Rounds between evolution points; topic synthesis runs every half interval
    pub evolution_interval: usize,
    pub difficulty: Difficulty,
}

impl From<&SimulationConfig> for SimulationPlan {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            num_rounds: config.num_rounds,
            evolution_interval: config.evolution_interval,
            difficulty: config.difficulty,
        }
    }
}

/// Outcome of [`LearningEnvironment::run_simulation`]
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub summary: SummaryStatistics,
    /// Curriculum after any growth during the run
    pub curriculum: Curriculum,
    /// Rounds that completed and were recorded during this run
    pub completed_rounds: usize,
    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
}

fn performance_summary(window: &[f64]) -> String {
    if window.is_empty() {
        return "No recent performance data.".to_string();
    }
    format!(
        "Student's average reward over last {} rounds was {:.2}",
        window.len(),
        mean(window)
    )
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl<T, St, P, A> LearningEnvironment<T, St, P, A>
where
    T: Teacher,
    St: Student,
    P: Policy<String, A>,
    A: Action,
{
    /// Run `plan.num_rounds` rounds over `curriculum`, growing it and evolving both
    /// roles along the way. The (possibly grown) curriculum is handed back in the report.
    pub async fn run_simulation(
        &mut self,
        plan: &SimulationPlan,
        mut curriculum: Curriculum,
        cancel: &CancellationToken,
    ) -> TutorResult<SimulationReport> {
        if plan.evolution_interval == 0 {
            return Err(TutorError::invalid_argument(
                "evolution_interval must be at least 1",
            ));
        }
        info!(
            "--- Starting a full learning simulation for {} rounds ---",
            plan.num_rounds
        );

        // Round numbers restart at 1 for every run
        self.rounds_attempted = 0;
        let recorded_before = self.results.len();
        let growth_interval = plan.evolution_interval / 2;
        let mut reward_window: Vec<f64> = Vec::new();
        let mut cancelled = false;

        for i in 0..plan.num_rounds {
            if cancel.is_cancelled() {
                warn!("Simulation cancelled before round {}", i + 1);
                cancelled = true;
                break;
            }

            self.events.emit(SimulationEvent::Progress {
                current_round: i + 1,
                total_rounds: plan.num_rounds,
            });

            if i > 0 && growth_interval > 0 && i % growth_interval == 0 {
                self.grow_curriculum(&mut curriculum, &reward_window).await?;
            }

            let topic = curriculum.choose(&mut self.rng).to_string();
            if let Some(record) = self
                .run_interaction_round(&topic, plan.difficulty, plan.num_rounds)
                .await?
            {
                reward_window.push(record.reward);
            }

            if (i + 1) % plan.evolution_interval == 0 && !reward_window.is_empty() {
                let avg_reward = mean(&reward_window);
                info!("--- Evolution Point (End of Round {}) ---", i + 1);
                info!(
                    "Agents are evolving! Average reward over the last {} rounds was: {:.2}.",
                    reward_window.len(),
                    avg_reward
                );
                self.teacher.evolve(avg_reward).await;
                self.student.evolve(avg_reward).await;
                reward_window.clear();
            }
        }

        info!("--- Learning Simulation Completed ---");
        let summary = self.summary_statistics();
        info!("--- Final Simulation Summary ---\n{}", summary);

        Ok(SimulationReport {
            summary,
            curriculum,
            completed_rounds: self.results.len() - recorded_before,
            cancelled,
        })
    }

    async fn grow_curriculum(
        &self,
        curriculum: &mut Curriculum,
        reward_window: &[f64],
    ) -> TutorResult<()> {
        info!("Teacher is considering student's past performance to synthesize a new topic.");
        let summary = performance_summary(reward_window);

        match self
            .teacher
            .synthesize_topic(curriculum.latest(), &summary)
            .await
        {
            Ok(topic) => {
                if curriculum.append_if_absent(topic.clone()) {
                    info!(
                        "Teacher synthesized a new topic: '{}'. It joins the curriculum.",
                        topic
                    );
                } else {
                    info!(
                        "Teacher proposed '{}', which the curriculum already covers.",
                        topic
                    );
                }
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                warn!(
                    "Teacher could not synthesize a new topic ({}). Continuing with existing topics.",
                    e
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Statistics over every recorded round; zeros and no topics when nothing completed
    pub fn summary_statistics(&self) -> SummaryStatistics {
        if self.results.is_empty() {
            return SummaryStatistics::default();
        }

        let rewards: Vec<f64> = self.results.iter().map(|r| r.reward).collect();
        SummaryStatistics {
            total_rounds: rewards.len(),
            average_reward: mean(&rewards),
            min_reward: rewards.iter().copied().fold(f64::INFINITY, f64::min),
            max_reward: rewards.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            topics_covered: self
                .results
                .iter()
                .map(|r| r.topic.clone())
                .collect::<BTreeSet<_>>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{ScriptedStudent, ScriptedTeacher};
    use crate::agents::CollaboratorError;
    use crate::reinforcement::{QLearningParams, QLearningPolicy, StudyStrategy};
    use crate::simulation::events::RecordingSink;
    use std::sync::Arc;

    type TestEnv = LearningEnvironment<
        ScriptedTeacher,
        ScriptedStudent,
        QLearningPolicy<String, StudyStrategy>,
        StudyStrategy,
    >;

    fn environment(teacher: ScriptedTeacher, student: ScriptedStudent) -> TestEnv {
        let policy =
            QLearningPolicy::with_seed(StudyStrategy::all(), QLearningParams::default(), 11);
        LearningEnvironment::new(teacher, student, policy).with_seed(5)
    }

    fn plan(num_rounds: usize, evolution_interval: usize) -> SimulationPlan {
        SimulationPlan {
            num_rounds,
            evolution_interval,
            difficulty: Difficulty::Medium,
        }
    }

    #[tokio::test]
    async fn test_four_rounds_interval_two() {
        let teacher = ScriptedTeacher::new("problem", "Correct.").with_topics(&[
            "Advanced Math",
            "Fractions",
            "Linear Algebra",
        ]);
        let mut env = environment(teacher, ScriptedStudent::new("4"));
        let curriculum = Curriculum::new(["Basic Math"]).unwrap();

        let report = env
            .run_simulation(&plan(4, 2), curriculum, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(env.teacher().problem_calls(), 4);
        assert_eq!(env.student().solve_calls(), 4);
        assert_eq!(env.student().feedback_seen.len(), 4);
        assert!(!env.policy().is_empty());

        // Every reward is 1.0, so each evolution sees a mean of 1.0
        assert_eq!(env.teacher().evolutions, vec![1.0, 1.0]);
        assert_eq!(env.student().evolutions, vec![1.0, 1.0]);

        // Growth at i = 1, 2, 3
        assert_eq!(env.teacher().synthesize_calls().len(), 3);
        assert_eq!(
            report.curriculum.topics(),
            &["Basic Math", "Advanced Math", "Fractions", "Linear Algebra"]
        );
        assert_eq!(report.completed_rounds, 4);
        assert!(!report.cancelled);
        assert_eq!(report.summary.total_rounds, 4);
        assert_eq!(report.summary.average_reward, 1.0);
    }

    #[tokio::test]
    async fn test_synthesis_sees_latest_topic_and_window() {
        let teacher = ScriptedTeacher::new("problem", "Correct.")
            .with_topics(&["Basic Math", "Fractions"]);
        let mut env = environment(teacher, ScriptedStudent::new("4"));
        let curriculum = Curriculum::new(["Basic Math"]).unwrap();

        let report = env
            .run_simulation(&plan(3, 2), curriculum, &CancellationToken::new())
            .await
            .unwrap();

        let calls = env.teacher().synthesize_calls();
        // i = 1: one reward in the window, duplicate proposal is ignored
        assert_eq!(calls[0].0, "Basic Math");
        assert_eq!(
            calls[0].1,
            "Student's average reward over last 1 rounds was 1.00"
        );
        // i = 2: the window was cleared by the evolution at the end of round 2
        assert_eq!(calls[1].0, "Basic Math");
        assert_eq!(calls[1].1, "No recent performance data.");
        assert_eq!(report.curriculum.topics(), &["Basic Math", "Fractions"]);
    }

    #[tokio::test]
    async fn test_failed_rounds_stay_out_of_window_and_results() {
        let mut teacher = ScriptedTeacher::new("problem", "unused");
        teacher.feedback = Err(CollaboratorError::failed("Error: evaluation"));
        let mut env = environment(teacher, ScriptedStudent::new("4"));
        let curriculum = Curriculum::new(["Basic Math"]).unwrap();

        let report = env
            .run_simulation(&plan(4, 2), curriculum, &CancellationToken::new())
            .await
            .unwrap();

        assert!(env.results().is_empty());
        assert!(env.policy().is_empty());
        assert!(env.teacher().evolutions.is_empty());
        assert!(env.student().evolutions.is_empty());
        assert_eq!(report.summary, SummaryStatistics::default());
        assert_eq!(report.completed_rounds, 0);
    }

    #[tokio::test]
    async fn test_failed_synthesis_keeps_curriculum() {
        // No scripted topics: every synthesis fails recoverably
        let teacher = ScriptedTeacher::new("problem", "Incorrect.");
        let mut env = environment(teacher, ScriptedStudent::new("5"));
        let curriculum = Curriculum::new(["Basic Math", "Geometry"]).unwrap();

        let report = env
            .run_simulation(&plan(5, 4), curriculum, &CancellationToken::new())
            .await
            .unwrap();

        // Growth at i = 2, 4
        assert_eq!(env.teacher().synthesize_calls().len(), 2);
        assert_eq!(report.curriculum.topics(), &["Basic Math", "Geometry"]);
        // One evolution, after round 4
        assert_eq!(env.teacher().evolutions, vec![-1.0]);
        assert_eq!(report.summary.min_reward, -1.0);
        assert_eq!(report.summary.max_reward, -1.0);
    }

    #[tokio::test]
    async fn test_interval_of_one_never_grows() {
        let teacher = ScriptedTeacher::new("problem", "Correct.").with_topics(&["New"]);
        let mut env = environment(teacher, ScriptedStudent::new("4"));
        let curriculum = Curriculum::new(["Basic Math"]).unwrap();

        env.run_simulation(&plan(3, 1), curriculum, &CancellationToken::new())
            .await
            .unwrap();

        assert!(env.teacher().synthesize_calls().is_empty());
        assert_eq!(env.teacher().evolutions.len(), 3);
    }

    #[tokio::test]
    async fn test_progress_events_precede_each_round() {
        let sink = Arc::new(RecordingSink::default());
        let teacher = ScriptedTeacher::new("problem", "Correct.");
        let mut env = environment(teacher, ScriptedStudent::new("4")).with_events(sink.clone());
        let curriculum = Curriculum::new(["Basic Math"]).unwrap();

        env.run_simulation(&plan(3, 5), curriculum, &CancellationToken::new())
            .await
            .unwrap();

        let progress: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|event| match event {
                SimulationEvent::Progress {
                    current_round,
                    total_rounds,
                } => Some((current_round, total_rounds)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_round() {
        let teacher = ScriptedTeacher::new("problem", "Correct.");
        let mut env = environment(teacher, ScriptedStudent::new("4"));
        let curriculum = Curriculum::new(["Basic Math"]).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = env
            .run_simulation(&plan(3, 2), curriculum, &cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(env.teacher().problem_calls(), 0);
    }

    #[tokio::test]
    async fn test_fatal_synthesis_error_ends_run() {
        let mut teacher = ScriptedTeacher::new("problem", "Correct.");
        teacher.fallback_topic = Err(CollaboratorError::unavailable("service down"));
        let mut env = environment(teacher, ScriptedStudent::new("4"));
        let curriculum = Curriculum::new(["Basic Math"]).unwrap();

        let result = env
            .run_simulation(&plan(4, 2), curriculum, &CancellationToken::new())
            .await;

        assert!(result.is_err());
        // Round 1 ran; round 2 aborted at the growth check
        assert_eq!(env.teacher().problem_calls(), 1);
    }

    #[tokio::test]
    async fn test_summary_statistics_over_mixed_rewards() {
        let teacher = ScriptedTeacher::new("problem", "Correct, good strengths.");
        let mut env = environment(teacher, ScriptedStudent::new("4"));
        assert_eq!(env.summary_statistics(), SummaryStatistics::default());

        env.run_interaction_round("a", Difficulty::Medium, 3)
            .await
            .unwrap();
        env.teacher.feedback = Ok("Incorrect, needs improvement.".to_string());
        env.run_interaction_round("b", Difficulty::Medium, 3)
            .await
            .unwrap();
        env.teacher.feedback = Ok("Needs improvement.".to_string());
        env.run_interaction_round("b", Difficulty::Medium, 3)
            .await
            .unwrap();

        let summary = env.summary_statistics();
        assert_eq!(summary.total_rounds, 3);
        assert!((summary.average_reward - (1.5 - 1.5 - 0.5) / 3.0).abs() < 1e-9);
        assert_eq!(summary.min_reward, -1.5);
        assert_eq!(summary.max_reward, 1.5);
        assert_eq!(
            summary.topics_covered.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_round_numbers_restart_each_run() {
        let teacher = ScriptedTeacher::new("problem", "Correct.");
        let mut env = environment(teacher, ScriptedStudent::new("4"));

        for _ in 0..2 {
            let curriculum = Curriculum::new(["Basic Math"]).unwrap();
            env.run_simulation(&plan(2, 5), curriculum, &CancellationToken::new())
                .await
                .unwrap();
        }

        let numbers: Vec<usize> = env.results().iter().map(|r| r.round_number).collect();
        assert_eq!(numbers, vec![1, 2, 1, 2]);
    }

    #[test]
    fn test_performance_summary_text() {
        assert_eq!(performance_summary(&[]), "No recent performance data.");
        assert_eq!(
            performance_summary(&[1.0, 0.5]),
            "Student's average reward over last 2 rounds was 0.75"
        );
    }
}
