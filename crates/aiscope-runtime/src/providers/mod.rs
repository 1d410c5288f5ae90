//! LLM provider abstractions for aiscope-runtime.
//!
//! This module defines the provider seams the resilience core calls through:
//! [`GenerativeProvider`] for generation and catalog listing, and
//! [`FileStore`] for the reference-upload collaborator. It includes the
//! Gemini REST implementation (feature `gemini`) and an in-process
//! [`ScriptedProvider`] for deterministic runs.
//!
//! ## Security
//!
//! Providers hold their API key in an [`ApiCredential`], see [`secrets`].

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use aiscope_core::{FileReference, GenerationRequest, ModelCatalogEntry};

mod scripted;
pub mod secrets;

#[cfg(feature = "gemini")]
mod gemini;

pub use scripted::{ScriptedCall, ScriptedProvider};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GEMINI_API_KEY_ENV, GEMINI_BASE_URL};

/// Errors from LLM providers.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Quota exhausted (429): {message}")]
    QuotaExhausted { message: String },

    #[error("Service unavailable (503): {0}")]
    Unavailable(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Empty response from {model}: {reason}")]
    EmptyResponse { model: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Provider abstraction for content generation.
///
/// Implementations make exactly one provider call per method invocation;
/// retry and fallback live in [`crate::resilience`].
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Generate a response from `model` for the assembled request.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError>;

    /// List the provider's full model catalog.
    async fn list_models(&self) -> Result<Vec<ModelCatalogEntry>, ProviderError>;

    /// Get provider name for logs.
    fn name(&self) -> &str;
}

/// Provider-side file storage used by the upload collaborator.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload a local file. The returned reference may still be pending.
    async fn upload(
        &self,
        path: &Path,
        display_name: Option<&str>,
    ) -> Result<FileReference, ProviderError>;

    /// Fetch the current state of an uploaded file.
    async fn get(&self, name: &str) -> Result<FileReference, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_status() {
        let err = ProviderError::QuotaExhausted {
            message: "Resource has been exhausted".to_string(),
        };
        assert!(err.to_string().contains("429"));

        let err = ProviderError::ApiError {
            status: 400,
            message: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 400 - bad");
    }
}
