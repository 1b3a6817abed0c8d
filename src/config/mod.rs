//! Configuration for the completion client, retry policy, cache, and catalog.
//!
//! Every section deserializes with defaults, so a partial `config.toml` (or
//! none at all) is valid. Environment variables override file values.
//! The core never reads configuration on its own: these structs are handed
//! to constructors by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BenderError, Result};

/// Default location of the conversation log, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "logs/conversations.jsonl";

/// Default completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/completions";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub completion: CompletionConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
}

/// Remote completion service parameters.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Completions endpoint URL.
    pub api_url: String,
    /// Bearer credential. Usually supplied via `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-attempt HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 100,
            temperature: 0.7,
            request_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl CompletionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Backoff parameters for rate-limited completion calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (so `max_retries + 1` attempts total).
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each subsequent retry.
    pub initial_delay_ms: u64,
    /// Upper bound on total time spent across all attempts. `None` = unbounded.
    pub deadline_secs: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            deadline_secs: Some(120),
        }
    }
}

/// What to do when appending to the conversation log fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityPolicy {
    /// Log a warning and hand the response back uncached (default).
    #[default]
    BestEffort,
    /// Fail the save with `BenderError::Persistence`.
    Strict,
}

/// Response cache and conversation log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path of the JSONL conversation log.
    pub path: PathBuf,
    pub durability: DurabilityPolicy,
    /// Responses kept in memory per prompt; older ones stay only in the log.
    /// Clamped to a minimum of 1.
    pub max_history_per_prompt: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_PATH),
            durability: DurabilityPolicy::BestEffort,
            max_history_per_prompt: 10,
        }
    }
}

/// Prompt catalog source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// TOML file with `[[prompts]]` entries. Built-in prompts are used when unset or missing.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Directory holding user-level bender files (`~/.bender`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bender")
    }

    /// Config file path: `$BENDER_CONFIG` or `~/.bender/config.toml`.
    pub fn path() -> PathBuf {
        std::env::var_os("BENDER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::dir().join("config.toml"))
    }

    /// Load `.env`, then the config file if present, then environment overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = Self::path();
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BenderError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| BenderError::Config(format!("Invalid {}: {}", path.display(), e)))
    }

    /// Apply environment overrides through `lookup` so tests need not touch the real environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("BENDER_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.completion.api_key = Some(key);
        }
        if let Some(url) = non_empty("BENDER_API_URL") {
            self.completion.api_url = url;
        }
        if let Some(model) = non_empty("BENDER_MODEL") {
            self.completion.model = model;
        }
        if let Some(path) = non_empty("BENDER_CACHE_PATH") {
            self.cache.path = PathBuf::from(path);
        }
    }

    /// Check the settings required before any remote call is attempted.
    pub fn validate(&self) -> Result<()> {
        if self
            .completion
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            return Err(BenderError::Config(
                "API key is not set; export OPENAI_API_KEY or set completion.api_key".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(BenderError::Config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.completion.temperature
            )));
        }
        if self.completion.max_tokens == 0 {
            return Err(BenderError::Config("max_tokens must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.completion.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.completion.max_tokens, 100);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.initial_delay_ms, 1000);
        assert_eq!(cfg.cache.path, PathBuf::from("logs/conversations.jsonl"));
        assert_eq!(cfg.cache.durability, DurabilityPolicy::BestEffort);
        assert!(cfg.catalog.path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [completion]
            model = "my-model"

            [cache]
            durability = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.completion.model, "my-model");
        assert_eq!(cfg.completion.max_tokens, 100);
        assert_eq!(cfg.cache.durability, DurabilityPolicy::Strict);
        assert_eq!(cfg.cache.max_history_per_prompt, 10);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-openai"),
            ("BENDER_MODEL", "other-model"),
            ("BENDER_CACHE_PATH", "/tmp/bender.jsonl"),
            ("BENDER_API_URL", "  "),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.completion.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(cfg.completion.model, "other-model");
        assert_eq!(cfg.cache.path, PathBuf::from("/tmp/bender.jsonl"));
        // Blank values are ignored
        assert_eq!(cfg.completion.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_bender_key_beats_openai_key() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(|k| match k {
            "BENDER_API_KEY" => Some("sk-bender".into()),
            "OPENAI_API_KEY" => Some("sk-openai".into()),
            _ => None,
        });
        assert_eq!(cfg.completion.api_key.as_deref(), Some("sk-bender"));
    }

    #[test]
    fn test_validate_requires_key() {
        let mut cfg = Config::default();
        assert!(matches!(cfg.validate(), Err(BenderError::Config(_))));
        cfg.completion.api_key = Some("sk-test".into());
        assert!(cfg.validate().is_ok());
        cfg.completion.temperature = 5.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let cfg = CompletionConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_load_from_path_reports_bad_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[completion\nmodel=").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(BenderError::Config(_))
        ));
    }
}
