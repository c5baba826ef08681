//! Configuration management for reelforge
//!
//! Settings load from environment variables with defaults through
//! `ReelforgeConfig::default()`. Call [`ReelforgeConfig::validate`] before
//! wiring collaborators.
//!
//! # Environment Variables
//!
//! - `YOUTUBE_API_KEY`: YouTube Data API key (video and channel requests)
//! - `GITHUB_TOKEN`: GitHub token; anonymous access is heavily rate limited
//! - `REELFORGE_PROVIDER`: LLM provider (genai adapter name) - default: "ollama"
//! - `REELFORGE_MODEL`: model name - default: "qwen2.5-coder:7b"
//! - `REELFORGE_MAX_ATTEMPTS`: attempts per task - default: 3
//! - `REELFORGE_BACKOFF_MS` / `REELFORGE_MAX_BACKOFF_MS`: retry backoff - default: 500 / 8000
//! - `REELFORGE_RUN_TIMEOUT`: whole-run deadline in seconds - default: 900
//! - `REELFORGE_REQUEST_TIMEOUT`: HTTP and LLM timeout in seconds - default: 30
//! - `REELFORGE_BUILD_TIMEOUT`: clone plus build budget in seconds - default: 600
//! - `REELFORGE_WORK_DIR`: checkout directory - default: system temp dir + "reelforge-work"
//! - `REELFORGE_CHANNEL_CONCURRENCY`: parallel video runs in channel mode - default: 2
//! - `REELFORGE_MAX_REPOSITORIES`: repositories analyzed per video - default: 3
//! - `REELFORGE_LOG_LEVEL`: logging level - default: "info"
//!
//! Provider credentials (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `OLLAMA_HOST`,
//! ...) are read by the genai library itself.

use crate::pipeline::{PipelineConfig, RetryPolicy};
use genai::adapter::AdapterKind;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 500;
const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 900;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CHANNEL_CONCURRENCY: usize = 2;
const DEFAULT_MAX_REPOSITORIES: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: ollama, openai, anthropic, gemini, groq, xai, deepseek")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone)]
pub struct ReelforgeConfig {
    pub youtube_api_key: Option<String>,
    pub github_token: Option<String>,

    /// LLM provider used by the strategy generator
    pub provider: AdapterKind,
    pub model: String,

    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,

    pub run_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub build_timeout_secs: u64,

    pub work_dir: PathBuf,
    pub channel_concurrency: usize,
    pub max_repositories: usize,

    /// trace, debug, info, warn or error
    pub log_level: String,
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse::<T>().ok())
}

pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    let lower = name.trim().to_lowercase();
    let lower = match lower.as_str() {
        "claude" => "anthropic",
        "grok" => "xai",
        other => other,
    };
    AdapterKind::from_lower_str(lower).ok_or_else(|| ConfigError::InvalidProvider(name.to_string()))
}

impl Default for ReelforgeConfig {
    /// Loads from `REELFORGE_*` and credential variables, falling back to
    /// defaults. Unparseable values are ignored here and caught by
    /// [`ReelforgeConfig::from_env`].
    fn default() -> Self {
        let provider = env_string("REELFORGE_PROVIDER")
            .and_then(|p| parse_provider(&p).ok())
            .unwrap_or(AdapterKind::Ollama);

        Self {
            youtube_api_key: env_string("YOUTUBE_API_KEY"),
            github_token: env_string("GITHUB_TOKEN"),
            provider,
            model: env_string("REELFORGE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_attempts: env_parse("REELFORGE_MAX_ATTEMPTS").unwrap_or(DEFAULT_MAX_ATTEMPTS),
            initial_backoff_ms: env_parse("REELFORGE_BACKOFF_MS").unwrap_or(DEFAULT_BACKOFF_MS),
            max_backoff_ms: env_parse("REELFORGE_MAX_BACKOFF_MS").unwrap_or(DEFAULT_MAX_BACKOFF_MS),
            run_timeout_secs: env_parse("REELFORGE_RUN_TIMEOUT").unwrap_or(DEFAULT_RUN_TIMEOUT_SECS),
            request_timeout_secs: env_parse("REELFORGE_REQUEST_TIMEOUT")
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            build_timeout_secs: env_parse("REELFORGE_BUILD_TIMEOUT")
                .unwrap_or(DEFAULT_BUILD_TIMEOUT_SECS),
            work_dir: env_string("REELFORGE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("reelforge-work")),
            channel_concurrency: env_parse("REELFORGE_CHANNEL_CONCURRENCY")
                .unwrap_or(DEFAULT_CHANNEL_CONCURRENCY),
            max_repositories: env_parse("REELFORGE_MAX_REPOSITORIES")
                .unwrap_or(DEFAULT_MAX_REPOSITORIES),
            log_level: env_string("REELFORGE_LOG_LEVEL")
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
        }
    }
}

impl ReelforgeConfig {
    /// Like `default()`, but a set variable that does not parse is an error
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Some(provider) = env_string("REELFORGE_PROVIDER") {
            parse_provider(&provider)?;
        }
        const NUMERIC: [&str; 8] = [
            "REELFORGE_MAX_ATTEMPTS",
            "REELFORGE_BACKOFF_MS",
            "REELFORGE_MAX_BACKOFF_MS",
            "REELFORGE_RUN_TIMEOUT",
            "REELFORGE_REQUEST_TIMEOUT",
            "REELFORGE_BUILD_TIMEOUT",
            "REELFORGE_CHANNEL_CONCURRENCY",
            "REELFORGE_MAX_REPOSITORIES",
        ];
        for key in NUMERIC {
            if let Some(value) = env_string(key) {
                value.trim().parse::<u64>().map_err(|e| ConfigError::ParseError {
                    field: key.to_string(),
                    error: format!("'{}': {}", value, e),
                })?;
            }
        }

        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Range checks on every tunable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10).contains(&self.max_attempts) {
            return Err(ConfigError::ValidationFailed(format!(
                "Max attempts must be between 1 and 10, got {}",
                self.max_attempts
            )));
        }
        if self.initial_backoff_ms == 0 || self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::ValidationFailed(
                "Initial backoff must be positive and not exceed the max backoff".to_string(),
            ));
        }
        if self.max_backoff_ms > 300_000 {
            return Err(ConfigError::ValidationFailed(
                "Max backoff cannot exceed 5 minutes".to_string(),
            ));
        }

        check_timeout("Run timeout", self.run_timeout_secs, 86_400)?;
        check_timeout("Request timeout", self.request_timeout_secs, 600)?;
        check_timeout("Build timeout", self.build_timeout_secs, 7_200)?;

        if !(1..=16).contains(&self.channel_concurrency) {
            return Err(ConfigError::ValidationFailed(format!(
                "Channel concurrency must be between 1 and 16, got {}",
                self.channel_concurrency
            )));
        }
        if !(1..=20).contains(&self.max_repositories) {
            return Err(ConfigError::ValidationFailed(format!(
                "Max repositories must be between 1 and 20, got {}",
                self.max_repositories
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_retry(self.retry_policy())
            .with_run_timeout(Some(Duration::from_secs(self.run_timeout_secs)))
            .with_max_repositories(self.max_repositories)
            .with_channel_concurrency(self.channel_concurrency)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    /// Flat view for JSON/YAML output. Credentials are reported as set or not.
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("youtube_api_key".to_string(), redact(&self.youtube_api_key));
        map.insert("github_token".to_string(), redact(&self.github_token));
        map.insert("provider".to_string(), self.provider.as_lower_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        map.insert("max_attempts".to_string(), self.max_attempts.to_string());
        map.insert("initial_backoff_ms".to_string(), self.initial_backoff_ms.to_string());
        map.insert("max_backoff_ms".to_string(), self.max_backoff_ms.to_string());
        map.insert("run_timeout_secs".to_string(), self.run_timeout_secs.to_string());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("build_timeout_secs".to_string(), self.build_timeout_secs.to_string());
        map.insert("work_dir".to_string(), self.work_dir.display().to_string());
        map.insert(
            "channel_concurrency".to_string(),
            self.channel_concurrency.to_string(),
        );
        map.insert("max_repositories".to_string(), self.max_repositories.to_string());
        map.insert("log_level".to_string(), self.log_level.clone());
        map
    }
}

fn check_timeout(name: &str, secs: u64, max: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must be at least 1 second",
            name
        )));
    }
    if secs > max {
        return Err(ConfigError::ValidationFailed(format!(
            "{} cannot exceed {} seconds",
            name, max
        )));
    }
    Ok(())
}

fn redact(secret: &Option<String>) -> String {
    match secret {
        Some(_) => "set".to_string(),
        None => "not set".to_string(),
    }
}

impl fmt::Display for ReelforgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reelforge Configuration:")?;
        writeln!(f, "  YouTube API Key: {}", redact(&self.youtube_api_key))?;
        writeln!(f, "  GitHub Token: {}", redact(&self.github_token))?;
        writeln!(f, "  Provider: {}", self.provider.as_lower_str())?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(
            f,
            "  Retry: {} attempts, backoff {}ms..{}ms",
            self.max_attempts, self.initial_backoff_ms, self.max_backoff_ms
        )?;
        writeln!(f, "  Run Timeout: {}s", self.run_timeout_secs)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Build Timeout: {}s", self.build_timeout_secs)?;
        writeln!(f, "  Work Dir: {}", self.work_dir.display())?;
        writeln!(f, "  Channel Concurrency: {}", self.channel_concurrency)?;
        writeln!(f, "  Max Repositories: {}", self.max_repositories)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
