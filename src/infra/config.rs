// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default, rename = "loop")]
    pub engine: LoopConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// OpenAI-compatible endpoint. `OPENAI_BASE_URL` overrides it.
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-4o".into(),
            base_url: None,
            temperature: None,
            max_tokens: Some(2048),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    120
}

/// Iteration bounds shared by every pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Augmentation cycles allowed before the budget policy stops (reflexion).
    pub max_iterations: usize,
    /// Hard cap on passes through the stage sequence. `None` = max_iterations + 1.
    pub hard_cap: Option<usize>,
    /// Basic reflection stops once the history holds more than this many entries.
    pub history_limit: usize,
    /// Counter target for the state walkthrough.
    pub counter_target: i64,
    /// Pass cap for the counter and ReAct patterns.
    pub recursion_limit: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            hard_cap: None,
            history_limit: 2,
            counter_target: 5,
            recursion_limit: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub max_results: u32,
    /// "basic" or "advanced"
    pub search_depth: String,
    /// Issue the lookups of one batch concurrently (results stay in query order).
    pub parallel: bool,
    pub timeout_seconds: u64,
    pub base_url: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 2,
            search_depth: "basic".into(),
            parallel: false,
            timeout_seconds: 30,
            base_url: None,
        }
    }
}

/// Backoff applied by the provider wrapper. The loop driver itself never retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetrySettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        match paths::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.model.name, "gpt-4o");
        assert_eq!(c.engine.max_iterations, 2);
        assert!(c.engine.hard_cap.is_none());
        assert_eq!(c.engine.history_limit, 2);
        assert_eq!(c.engine.counter_target, 5);
        assert_eq!(c.engine.recursion_limit, 25);
        assert_eq!(c.search.max_results, 2);
        assert!(!c.search.parallel);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_iterations, 2);
        assert_eq!(config.search.search_depth, "basic");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[model]
name = "gpt-4.1-mini"
base_url = "http://localhost:11434/v1"
temperature = 0.2
max_tokens = 1024

[loop]
max_iterations = 4
hard_cap = 6
history_limit = 6
counter_target = 10
recursion_limit = 50

[search]
max_results = 5
search_depth = "advanced"
parallel = true
timeout_seconds = 10

[retry]
max_retries = 2
initial_delay_ms = 500
max_delay_ms = 4000
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.name, "gpt-4.1-mini");
        assert_eq!(
            config.model.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.model.timeout_seconds, 120);
        assert_eq!(config.engine.max_iterations, 4);
        assert_eq!(config.engine.hard_cap, Some(6));
        assert_eq!(config.engine.counter_target, 10);
        assert_eq!(config.search.max_results, 5);
        assert!(config.search.parallel);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_delay(), Duration::from_millis(500));
        assert_eq!(config.retry.max_delay(), Duration::from_secs(4));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("[loop]"));
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            deserialized.engine.max_iterations,
            config.engine.max_iterations
        );
        assert_eq!(deserialized.model.name, config.model.name);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[loop]\nmax_iterations = 7\nhistory_limit = 2\ncounter_target = 5\nrecursion_limit = 25").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.engine.max_iterations, 7);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_partial_section() {
        // Sections without serde defaults must be complete.
        let result: Result<Config, _> = toml::from_str("[search]\nmax_results = 3\n");
        assert!(result.is_err());
    }
}
