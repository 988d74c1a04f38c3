use std::path::PathBuf;
use thiserror::Error;

use crate::agents::CollaboratorError;
use crate::integrations::ModelError;

/// Main error type for pedagogue
#[derive(Error, Debug)]
pub enum TutorError {
    #[error("IO error: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Language model error: {0}")]
    Model(#[from] ModelError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Simulation already running (run {run_id})")]
    SimulationAlreadyRunning { run_id: uuid::Uuid },

    #[error("No simulation has been started")]
    NoActiveRun,

    #[error("Simulation task failed: {message}")]
    TaskFailed { message: String },

    #[error("{0}")]
    Other(String),
}

impl TutorError {
    /// Create a new IO error with path context
    pub fn io_error(err: std::io::Error, path: Option<impl Into<PathBuf>>) -> Self {
        Self::Io {
            source: err,
            path: path.map(|p| p.into()),
        }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a new task failure error
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<std::io::Error> for TutorError {
    fn from(error: std::io::Error) -> Self {
        TutorError::io_error(error, None::<PathBuf>)
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(error: serde_json::Error) -> Self {
        TutorError::parse_error(error.to_string())
    }
}

impl From<toml::de::Error> for TutorError {
    fn from(error: toml::de::Error) -> Self {
        TutorError::parse_error(error.to_string())
    }
}

impl From<toml::ser::Error> for TutorError {
    fn from(error: toml::ser::Error) -> Self {
        TutorError::parse_error(error.to_string())
    }
}

impl From<reqwest::Error> for TutorError {
    fn from(error: reqwest::Error) -> Self {
        TutorError::Model(ModelError::from(error))
    }
}

/// Result type alias using TutorError
pub type TutorResult<T> = Result<T, TutorError>;

/// Contextual error mapping function
pub fn map_io_err<P: Into<PathBuf>>(path: P) -> impl FnOnce(std::io::Error) -> TutorError {
    let path = path.into();
    move |err| TutorError::io_error(err, Some(path))
}
