// Q-Learning implementation for the student's strategy selection
// Flat tabular values, epsilon-greedy selection, one-step TD updates

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, info};

use crate::error::{TutorError, TutorResult};
use crate::reinforcement::{action::Action, Policy};

/// Hyperparameters of a Q-learning policy, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningParams {
    /// Learning rate (α) - how quickly new information overrides old
    pub learning_rate: f64,
    /// Discount factor (γ) - importance of future rewards
    pub discount_factor: f64,
    /// Exploration rate (ε) - probability of taking a random action
    pub exploration_rate: f64,
}

impl QLearningParams {
    pub fn new(learning_rate: f64, discount_factor: f64, exploration_rate: f64) -> Self {
        Self {
            learning_rate,
            discount_factor,
            exploration_rate,
        }
    }

    /// Check α ∈ (0,1], γ ∈ [0,1], ε ∈ [0,1]
    pub fn validate(&self) -> TutorResult<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(TutorError::invalid_argument(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(TutorError::invalid_argument(format!(
                "discount_factor must be in [0, 1], got {}",
                self.discount_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration_rate) {
            return Err(TutorError::invalid_argument(format!(
                "exploration_rate must be in [0, 1], got {}",
                self.exploration_rate
            )));
        }
        Ok(())
    }
}

impl Default for QLearningParams {
    fn default() -> Self {
        Self::new(0.1, 0.9, 0.5)
    }
}

/// Q-Learning system for action selection and learning
#[derive(Debug, Clone)]
pub struct QLearningPolicy<S, A> {
    /// Q-table mapping state-action pairs to expected future rewards
    q_table: HashMap<(S, A), f64>,
    /// Fixed action set
    actions: Vec<A>,
    params: QLearningParams,
    rng: StdRng,
}

impl<S, A> QLearningPolicy<S, A>
where
    S: Clone + Eq + Hash,
    A: Action,
{
    /// Create a policy over an explicit action set, seeded from the OS.
    ///
    /// # Panics
    /// Panics if `actions` is empty.
    pub fn new(actions: Vec<A>, params: QLearningParams) -> Self {
        Self::with_rng(actions, params, StdRng::from_os_rng())
    }

    /// Create a policy with a fixed seed, for reproducible runs
    pub fn with_seed(actions: Vec<A>, params: QLearningParams, seed: u64) -> Self {
        Self::with_rng(actions, params, StdRng::seed_from_u64(seed))
    }

    /// Create a policy over every variant of `A`
    pub fn for_all_actions(params: QLearningParams) -> Self {
        Self::new(A::all(), params)
    }

    fn with_rng(actions: Vec<A>, params: QLearningParams, rng: StdRng) -> Self {
        assert!(!actions.is_empty(), "a policy needs at least one action");
        info!(
            "Q-learning policy initialized with alpha={}, gamma={}, epsilon={}",
            params.learning_rate, params.discount_factor, params.exploration_rate
        );
        Self {
            q_table: HashMap::new(),
            actions,
            params,
            rng,
        }
    }

    /// Get the Q-value for a state-action pair
    pub fn q_value(&self, state: &S, action: &A) -> f64 {
        // Lookup needs an owned key; states are small (topic names)
        self.q_table
            .get(&(state.clone(), action.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Maximum Q-value over the action set at `state`
    fn max_q_value(&self, state: &S) -> f64 {
        self.actions
            .iter()
            .map(|a| self.q_value(state, a))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// All actions sharing the maximum Q-value at `state`
    fn best_actions(&self, state: &S) -> (Vec<A>, f64) {
        let max_q = self.max_q_value(state);
        let best = self
            .actions
            .iter()
            .filter(|a| self.q_value(state, a) == max_q)
            .cloned()
            .collect();
        (best, max_q)
    }

    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    pub fn params(&self) -> QLearningParams {
        self.params
    }

    /// Number of visited state-action pairs
    pub fn len(&self) -> usize {
        self.q_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q_table.is_empty()
    }

    /// Iterate over every learned entry
    pub fn entries(&self) -> impl Iterator<Item = (&S, &A, f64)> {
        self.q_table.iter().map(|((s, a), q)| (s, a, *q))
    }
}

impl<S, A> Policy<S, A> for QLearningPolicy<S, A>
where
    S: Clone + Eq + Hash + std::fmt::Debug + Send,
    A: Action,
{
    fn choose_action(&mut self, state: &S) -> A {
        // Exploration: with probability ε, choose a random action
        if self.rng.random::<f64>() < self.params.exploration_rate {
            let action = self.actions[self.rng.random_range(0..self.actions.len())].clone();
            debug!("Exploring: chose random action '{}' for state {:?}", action, state);
            return action;
        }

        // Exploitation: break ties uniformly among the best actions
        let (best, max_q) = self.best_actions(state);
        let action = best
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| self.actions[0].clone());
        debug!(
            "Exploiting: chose action '{}' with Q-value {} for state {:?}",
            action, max_q, state
        );
        action
    }

    fn update(&mut self, state: &S, action: &A, reward: f64, next_state: Option<&S>) {
        let current_q = self.q_value(state, action);

        // Terminal transitions do not bootstrap
        let max_next_q = next_state.map_or(0.0, |next| self.max_q_value(next));

        // Q(s,a) ← Q(s,a) + α[r + γ·max_a' Q(s',a') - Q(s,a)]
        let target = reward + self.params.discount_factor * max_next_q;
        let new_q = current_q + self.params.learning_rate * (target - current_q);

        self.q_table.insert((state.clone(), action.clone()), new_q);
        debug!(
            "Updated Q-value for ({:?}, {}): {:.4} -> {:.4}. Reward: {:.2}, Next Max Q: {:.4}",
            state, action, current_q, new_q, reward, max_next_q
        );
    }

    fn action_probability(&self, state: &S, action: &A) -> f64 {
        if !self.actions.contains(action) {
            return 0.0;
        }

        let n = self.actions.len() as f64;
        let epsilon = self.params.exploration_rate;
        let (best, _) = self.best_actions(state);

        let greedy_share = if best.contains(action) {
            (1.0 - epsilon) / best.len() as f64
        } else {
            0.0
        };
        epsilon / n + greedy_share
    }
}
