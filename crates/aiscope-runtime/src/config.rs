//! Runtime configuration.
//!
//! Read once at startup and treated as immutable afterwards. Every field has
//! a default, so an empty YAML document is a valid configuration:
//!
//! ```yaml
//! models:
//!   primary: gemini-2.5-flash
//!   fallbacks: [gemini-2.0-flash-exp, gemini-1.5-pro, gemini-pro]
//! retry:
//!   max_attempts: 3
//!   initial_delay: 2s
//!   multiplier: 2.0
//!   max_delay: 1m
//! discovery:
//!   enabled: true
//!   max_candidates: 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use aiscope_core::{CandidateSource, GenerationConfig, ModelCandidate, GENERATE_CONTENT};

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider API key; falls back to `GEMINI_API_KEY` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub models: ModelChainConfig,

    pub retry: RetryPolicy,

    pub discovery: DiscoveryConfig,

    pub generation: GenerationConfig,

    /// Per-request HTTP timeout
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            models: ModelChainConfig::default(),
            retry: RetryPolicy::default(),
            discovery: DiscoveryConfig::default(),
            generation: GenerationConfig::default(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Ordered model chain: primary first, then fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelChainConfig {
    pub primary: String,
    pub fallbacks: Vec<String>,
}

impl Default for ModelChainConfig {
    fn default() -> Self {
        Self {
            primary: "gemini-2.5-flash".to_string(),
            fallbacks: vec![
                "gemini-2.0-flash-exp".to_string(),
                "gemini-1.5-pro".to_string(),
                // Legacy fallback
                "gemini-pro".to_string(),
            ],
        }
    }
}

/// Per-model retry budget for transient failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total calls allowed per model, first call included
    pub max_attempts: u32,

    /// Sleep before the second call
    #[serde(with = "duration_str")]
    pub initial_delay: Duration,

    /// Factor applied to the delay after every retry
    pub multiplier: f32,

    #[serde(with = "duration_str")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// The sleeps a model will see if every call fails transiently.
    ///
    /// Growth stops at `max_delay`, so long budgets never overflow.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..self.max_attempts {
            delays.push(delay);
            if delay < self.max_delay {
                delay = Duration::try_from_secs_f64(delay.as_secs_f64() * f64::from(self.multiplier))
                    .map_or(self.max_delay, |next| next.min(self.max_delay));
            }
        }
        delays
    }
}

/// Catalog-based fallback after the configured chain is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,

    /// Discovered candidates actually tried
    pub max_candidates: usize,

    /// Case-insensitive substrings marking fast/cheap models
    pub fast_tier_markers: Vec<String>,

    /// Generation method a catalog entry must declare
    pub required_method: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_candidates: 3,
            fast_tier_markers: vec!["flash".to_string()],
            required_method: GENERATE_CONTENT.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parse from YAML and validate.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file and validate.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject configurations the resolver cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.primary.trim().is_empty() {
            return Err(ConfigError::Invalid("models.primary must not be empty".into()));
        }
        if self.models.fallbacks.iter().any(|m| m.trim().is_empty()) {
            return Err(ConfigError::Invalid("models.fallbacks contains an empty name".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if !(self.retry.multiplier >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.retry.multiplier
            )));
        }
        if self.retry.max_delay < self.retry.initial_delay {
            return Err(ConfigError::Invalid(
                "retry.max_delay must not be shorter than retry.initial_delay".into(),
            ));
        }

        let generation = &self.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::Invalid(format!(
                "generation.temperature must be in 0.0..=2.0, got {}",
                generation.temperature
            )));
        }
        if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "generation.top_p must be in (0.0, 1.0], got {}",
                generation.top_p
            )));
        }
        if generation.max_output_tokens == 0 {
            return Err(ConfigError::Invalid("generation.max_output_tokens must be positive".into()));
        }

        if self.discovery.enabled && self.discovery.required_method.trim().is_empty() {
            return Err(ConfigError::Invalid("discovery.required_method must not be empty".into()));
        }

        Ok(())
    }

    /// The configured chain as ranked candidates.
    pub fn candidates(&self) -> Vec<ModelCandidate> {
        ModelCandidate::chain(
            std::iter::once(self.models.primary.as_str())
                .chain(self.models.fallbacks.iter().map(String::as_str)),
            CandidateSource::Configured,
        )
    }
}

/// Durations as humantime strings (`2s`, `1m 30s`).
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
        assert_eq!(config.discovery.max_candidates, 3);
        assert_eq!(config.generation.max_output_tokens, 8192);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_chain_order() {
        let ids: Vec<String> = RuntimeConfig::default()
            .candidates()
            .into_iter()
            .map(|c| c.identifier)
            .collect();
        assert_eq!(
            ids,
            vec!["gemini-2.5-flash", "gemini-2.0-flash-exp", "gemini-1.5-pro", "gemini-pro"]
        );
    }

    #[test]
    fn test_schedule_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );

        let capped = RetryPolicy {
            max_attempts: 5,
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        assert_eq!(capped.schedule().last(), Some(&Duration::from_secs(5)));
    }

    #[test]
    fn test_schedule_long_budget_plateaus() {
        let policy = RetryPolicy {
            max_attempts: 200,
            ..RetryPolicy::default()
        };

        let schedule = policy.schedule();

        assert_eq!(schedule.len(), 199);
        assert!(schedule.iter().all(|d| *d <= policy.max_delay));
        assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(schedule.last(), Some(&policy.max_delay));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
models:
  primary: gemini-1.5-flash
  fallbacks: []
retry:
  initial_delay: 500ms
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.models.primary, "gemini-1.5-flash");
        assert!(config.models.fallbacks.is_empty());
        assert_eq!(config.retry.initial_delay, Duration::from_millis(500));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.discovery.enabled);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = RuntimeConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("initial_delay: 2s"));
        assert!(!yaml.contains("api_key"));

        let parsed = RuntimeConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = RuntimeConfig::from_yaml("retry:\n  initial_delay: soon\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = RuntimeConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.retry.multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.models.primary = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.generation.top_p = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = RuntimeConfig::from_yaml_file("/nonexistent/aiscope.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/aiscope.yaml"));
    }
}
