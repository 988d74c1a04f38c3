// Configuration module for pedagogue
// Model backend, policy hyperparameters and simulation settings

#[allow(clippy::module_inception)]
pub mod config;
pub mod config_loader;

// Re-export main types for easier access
pub use config::{AppConfig, Difficulty, ModelConfig, ModelProvider, SimulationConfig};
pub use config_loader::ConfigLoader;
