use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{map_io_err, TutorError, TutorResult};
use crate::reinforcement::QLearningParams;

/// Backend used to generate teacher and student text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
}

/// Difficulty requested from the teacher for each problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        })
    }
}

impl FromStr for Difficulty {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(TutorError::parse_error(format!(
                "unknown difficulty '{}'",
                other
            ))),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    /// Server address (Ollama only)
    pub host: String,
    /// Default model for both roles
    pub model: String,
    /// Model override for the teacher
    pub teacher_model: Option<String>,
    /// Model override for the student
    pub student_model: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// API key (OpenAI only; OPENAI_API_KEY is used when absent)
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Ollama,
            host: "http://localhost:11434".to_string(),
            model: "llama2".to_string(),
            teacher_model: None,
            student_model: None,
            timeout_seconds: 120,
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Simulation run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of interaction rounds
    pub num_rounds: usize,
    /// Initial curriculum
    pub topics: Vec<String>,
    /// Rounds between evolution points
    pub evolution_interval: usize,
    pub difficulty: Difficulty,
    /// Seed for topic and action sampling; random when absent
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_rounds: 10,
            topics: vec![
                "Reinforcement Learning".to_string(),
                "Neural Networks".to_string(),
                "Generative AI".to_string(),
                "Computer Vision".to_string(),
            ],
            evolution_interval: 5,
            difficulty: Difficulty::Medium,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> TutorResult<()> {
        if self.num_rounds == 0 {
            return Err(TutorError::config_error("num_rounds must be at least 1"));
        }
        if self.evolution_interval == 0 {
            return Err(TutorError::config_error(
                "evolution_interval must be at least 1",
            ));
        }
        if self.topics.iter().all(|t| t.trim().is_empty()) {
            return Err(TutorError::config_error(
                "at least one non-empty topic is required",
            ));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub policy: QLearningParams,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Read a configuration file
    pub fn load(path: &Path) -> TutorResult<Self> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(map_io_err(path))?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write the configuration as pretty TOML, creating parent directories
    pub fn save(&self, path: &Path) -> TutorResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(map_io_err(parent))?;
        }
        fs::write(path, self.to_toml()?).map_err(map_io_err(path))?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn to_toml(&self) -> TutorResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> TutorResult<()> {
        self.policy
            .validate()
            .map_err(|e| TutorError::config_error(format!("policy: {}", e)))?;
        self.simulation.validate()?;
        if self.model.model.trim().is_empty() {
            return Err(TutorError::config_error("model name must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.evolution_interval, 5);
        assert_eq!(config.policy.exploration_rate, 0.5);
        assert_eq!(config.model.host, "http://localhost:11434");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[model]
provider = "openai"
model = "gpt-4o"

[simulation]
num_rounds = 4
topics = ["Basic Math"]
difficulty = "hard"
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.model.provider, ModelProvider::OpenAi);
        assert_eq!(config.model.timeout_seconds, 120);
        assert_eq!(config.simulation.num_rounds, 4);
        assert_eq!(config.simulation.difficulty, Difficulty::Hard);
        assert_eq!(config.simulation.evolution_interval, 5);
        assert_eq!(config.policy, QLearningParams::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.simulation.seed = Some(42);
        config.model.teacher_model = Some("mistral".to_string());

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.simulation.num_rounds = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.simulation.topics = vec!["  ".to_string()];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.simulation.evolution_interval = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.policy.learning_rate = 0.0;
        assert!(matches!(config.validate(), Err(TutorError::Config { .. })));
    }

    #[test]
    fn test_difficulty_parsing() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(Difficulty::Medium.to_string(), "medium");
        assert!("impossible".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = AppConfig::load(Path::new("/nonexistent/pedagogue.toml")).unwrap_err();
        assert!(matches!(err, TutorError::Io { path: Some(_), .. }));
    }
}
