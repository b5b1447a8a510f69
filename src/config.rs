// Layered settings: built-in defaults, then an optional TOML file, then
// BRD_* environment variables. CLI flags are applied last by the binary.

use crate::error::{BrdError, Result};
use crate::RenderOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_API_KEY: &str = "BRD_API_KEY";
pub const ENV_ENDPOINT: &str = "BRD_LLM_ENDPOINT";
pub const ENV_MODEL: &str = "BRD_LLM_MODEL";
pub const ENV_TIMEOUT: &str = "BRD_LLM_TIMEOUT_SECS";

/// OpenAI-compatible chat completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    /// Never defaulted; supply via file, `BRD_API_KEY` or `--api-key`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama3-70b-8192".to_string(),
            api_key: None,
            timeout_secs: 120,
            temperature: 0.2,
        }
    }
}

impl LlmConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(BrdError::MissingApiKey)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub render: RenderOptions,
}

impl AppConfig {
    /// Defaults, overlaid with `path` when given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BrdError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| BrdError::Config(format!("'{}': {}", path.display(), e)))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| BrdError::Config(e.to_string()))
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.llm.endpoint = endpoint;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.llm.model = model;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            self.llm.timeout_secs = timeout.trim().parse().map_err(|_| {
                BrdError::Config(format!("{ENV_TIMEOUT} must be a number of seconds, got {timeout:?}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_have_no_api_key() {
        let config = AppConfig::default();
        assert!(config.llm.api_key.is_none());
        assert!(matches!(config.llm.require_api_key(), Err(BrdError::MissingApiKey)));
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [llm]
            model = "gpt-4o-mini"

            [render]
            prune_empty_columns = true
            title = "Payments BRD"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.endpoint, LlmConfig::default().endpoint);
        assert!(config.render.prune_empty_columns);
        assert!(config.render.page_breaks);
        assert_eq!(config.render.title, "Payments BRD");
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = [(ENV_API_KEY, "sk-test"), (ENV_TIMEOUT, "30")].into();
        let mut config = AppConfig::from_toml("[llm]\ntimeout_secs = 5\n").unwrap();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.llm.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.llm.timeout_secs, 30);
    }

    #[test]
    fn bad_timeout_is_config_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|k| (k == ENV_TIMEOUT).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, BrdError::Config(_)));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("  ".into());
        assert!(config.llm.require_api_key().is_err());
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/brd.toml")).unwrap_err();
        assert!(matches!(err, BrdError::Config(_)));
    }
}
