use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::TutorResult;

/// Resolves, loads and validates the effective configuration
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    explicit: bool,
}

impl ConfigLoader {
    /// Create a loader that looks in the user's config directory
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            explicit: false,
        }
    }

    /// Use a specific configuration file, which must exist
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
            explicit: true,
        }
    }

    /// `<config_dir>/pedagogue/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pedagogue").join("config.toml"))
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load `.env`, the configuration file (if any), env overrides, then validate
    pub fn load(&self) -> TutorResult<AppConfig> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let mut config = match &self.config_path {
            Some(path) if self.explicit || path.exists() => AppConfig::load(path)?,
            _ => {
                info!("No configuration file found, using defaults");
                AppConfig::default()
            }
        };

        apply_env_overrides(&mut config, |key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply OLLAMA_HOST, OLLAMA_MODEL and OPENAI_API_KEY on top of the file values
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("OLLAMA_HOST").filter(|v| !v.is_empty()) {
        config.model.host = host;
    }
    if let Some(model) = lookup("OLLAMA_MODEL").filter(|v| !v.is_empty()) {
        config.model.model = model;
    }
    if config.model.api_key.is_none() {
        config.model.api_key = lookup("OPENAI_API_KEY").filter(|v| !v.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_env_overrides_win_over_file() {
        let vars: HashMap<&str, &str> = [
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("OLLAMA_MODEL", "mistral"),
            ("OPENAI_API_KEY", ""),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.model.host, "http://gpu-box:11434");
        assert_eq!(config.model.model, "mistral");
        assert_eq!(config.model.api_key, None);
    }

    #[test]
    fn test_configured_api_key_is_kept() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("from-file".to_string());
        apply_env_overrides(&mut config, |_| Some("from-env".to_string()));
        assert_eq!(config.model.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let loader = ConfigLoader::with_path("/nonexistent/pedagogue/config.toml");
        assert!(loader.load().is_err());
    }

    #[test]
    fn test_explicit_path_is_validated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[simulation]\nnum_rounds = 0\n").unwrap();

        assert!(ConfigLoader::with_path(&path).load().is_err());
    }
}
