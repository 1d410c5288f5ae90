//! # aiscope-runtime
//!
//! Resilient LLM runtime for the aiscope AI-content detector.
//!
//! A single [`Analyzer::analyze`] call assembles the request, then walks the
//! configured model chain with bounded exponential retry per model. If every
//! configured model fails it ranks the provider's model catalog and tries a
//! few more. If those fail too, the caller gets a diagnostic report as
//! ordinary text.
//!
//! ## Important
//!
//! `analyze` never returns an error. Configuration problems (a missing API
//! key, an empty model chain) surface earlier, when the provider and
//! analyzer are built.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aiscope_runtime::{AnalyzerBuilder, GeminiProvider, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("aiscope.yaml")?;
//! let provider = GeminiProvider::from_env(config.request_timeout)?;
//! let analyzer = AnalyzerBuilder::new()
//!     .provider(Arc::new(provider))
//!     .config(config)
//!     .build()?;
//!
//! let text = analyzer.analyze("The sky is blue.", &[], &[]).await;
//! ```

use thiserror::Error;

pub mod analyzer;
pub mod config;
pub mod prompts;
pub mod providers;
pub mod report;
pub mod resilience;
pub mod uploads;

pub use analyzer::{Analysis, Analyzer, AnalyzerBuilder};
pub use config::{ConfigError, DiscoveryConfig, ModelChainConfig, RetryPolicy, RuntimeConfig};
pub use providers::{
    ApiCredential, CredentialSource, FileStore, GenerativeProvider, ProviderError, ScriptedCall,
    ScriptedProvider,
};
pub use report::ResponseReporter;
pub use resilience::{BackoffExecutor, ModelChainResolver, ModelDiscovery, Resolution};
pub use uploads::ReferenceUploader;

#[cfg(feature = "gemini")]
pub use providers::{GeminiProvider, GEMINI_API_KEY_ENV, GEMINI_BASE_URL};

/// Errors from building or querying the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}
