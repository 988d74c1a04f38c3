// Reinforcement learning components for the student's strategy selection

pub mod action;
pub mod q_learning;
pub mod reward;

// Re-export main components for easier access
pub use action::{Action, StudyStrategy};
pub use q_learning::{QLearningParams, QLearningPolicy};
pub use reward::extract_reward;

/// Initialize the student's strategy policy over every study strategy
pub fn initialize_policy(
    params: QLearningParams,
    seed: Option<u64>,
) -> QLearningPolicy<String, StudyStrategy> {
    match seed {
        Some(seed) => QLearningPolicy::with_seed(StudyStrategy::all(), params, seed),
        None => QLearningPolicy::for_all_actions(params),
    }
}

/// Trait defining the interface for a reinforcement learning policy
pub trait Policy<S, A> {
    /// Selects an action for a given state
    fn choose_action(&mut self, state: &S) -> A;

    /// Applies one learning step for the observed transition.
    /// `next_state` is `None` for a terminal transition.
    fn update(&mut self, state: &S, action: &A, reward: f64, next_state: Option<&S>);

    /// Returns the probability of taking an action given a state
    fn action_probability(&self, state: &S, action: &A) -> f64;
}
