// Pedagogue - a self-improving teacher/student learning loop
// A teacher poses problems, a student answers with a Q-learning strategy policy,
// and both adapt as the curriculum grows

pub mod agents;
pub mod config;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod reinforcement;
pub mod simulation;

pub use error::{TutorError, TutorResult};
pub use logging::init_with_logger;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
