// Teacher/student simulation: round orchestration, the multi-round controller,
// the curriculum, event publishing and the host that runs simulations in the background

pub mod controller;
pub mod curriculum;
pub mod events;
pub mod host;
pub mod round;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::agents::{Student, Teacher};
use crate::config::Difficulty;
use crate::reinforcement::{Action, Policy};

pub use controller::{SimulationPlan, SimulationReport};
pub use curriculum::Curriculum;
pub use events::{EventSink, NullSink, RunStatus, SimulationEvent};
pub use host::{RunReport, SimulationHost};

/// Snapshot of one completed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord<A> {
    pub round_number: usize,
    pub topic: String,
    pub difficulty: Difficulty,
    pub problem: String,
    /// Strategy chosen by the policy for this round
    pub action: A,
    pub response: String,
    pub feedback: String,
    pub reward: f64,
}

/// Aggregate statistics over completed rounds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_rounds: usize,
    pub average_reward: f64,
    pub min_reward: f64,
    pub max_reward: f64,
    pub topics_covered: BTreeSet<String>,
}

impl fmt::Display for SummaryStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- Total Rounds: {}", self.total_rounds)?;
        writeln!(f, "- Average Reward: {:.2}", self.average_reward)?;
        writeln!(f, "- Min Reward: {:.2}", self.min_reward)?;
        writeln!(f, "- Max Reward: {:.2}", self.max_reward)?;
        write!(
            f,
            "- Unique Topics Covered: {}",
            self.topics_covered
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Teacher, student and the student's policy, plus everything recorded so far
pub struct LearningEnvironment<T, St, P, A> {
    teacher: T,
    student: St,
    policy: P,
    events: Arc<dyn EventSink>,
    results: Vec<RoundRecord<A>>,
    rounds_attempted: usize,
    rng: StdRng,
}

impl<T, St, P, A> LearningEnvironment<T, St, P, A>
where
    T: Teacher,
    St: Student,
    P: Policy<String, A>,
    A: Action,
{
    pub fn new(teacher: T, student: St, policy: P) -> Self {
        tracing::info!("LearningEnvironment initialized.");
        Self {
            teacher,
            student,
            policy,
            events: Arc::new(NullSink),
            results: Vec::new(),
            rounds_attempted: 0,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Publish progress to `events`
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Make topic sampling reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn teacher(&self) -> &T {
        &self.teacher
    }

    pub fn student(&self) -> &St {
        &self.student
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Completed rounds, in order
    pub fn results(&self) -> &[RoundRecord<A>] {
        &self.results
    }

    pub fn into_results(self) -> Vec<RoundRecord<A>> {
        self.results
    }
}
