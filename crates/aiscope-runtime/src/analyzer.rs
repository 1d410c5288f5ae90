//! Analysis entry point.
//!
//! The analyzer ties the pieces together for one request:
//! - Assemble the request (system instruction, history, attachments, prompt)
//! - Resolve it against the configured chain, then discovered models
//! - On total failure, render the diagnostic report instead
//!
//! `analyze` always returns text. Errors never reach the caller.

use serde::Serialize;
use std::sync::Arc;

use aiscope_core::{
    ChatTurn, FileReference, ModelCatalogEntry, RequestAssembler, ResolutionTrace,
};

use crate::config::RuntimeConfig;
use crate::prompts::DETECTION_SYSTEM_PROMPT;
use crate::providers::GenerativeProvider;
use crate::report::ResponseReporter;
use crate::resilience::{BackoffExecutor, ModelChainResolver, ModelDiscovery, Resolution};
use crate::RuntimeError;

/// Text returned to the caller plus how it was obtained.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Model output, or a diagnostic when no model answered
    pub text: String,

    /// Model that answered, if any
    pub model: Option<String>,

    pub trace: ResolutionTrace,
}

impl Analysis {
    pub fn is_answered(&self) -> bool {
        self.model.is_some()
    }
}

/// Runs detection requests against a provider with retry and fallback.
///
/// Holds only read-only state, so one analyzer can serve concurrent
/// requests.
pub struct Analyzer {
    provider: Arc<dyn GenerativeProvider>,
    config: Arc<RuntimeConfig>,
    assembler: RequestAssembler,
    resolver: ModelChainResolver,
    reporter: ResponseReporter,
}

impl Analyzer {
    /// Create an analyzer with the built-in system instruction.
    ///
    /// Fails if `config` does not pass [`RuntimeConfig::validate`].
    pub fn new(
        provider: Arc<dyn GenerativeProvider>,
        config: RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        Ok(Self::with_system_instruction(
            provider,
            config,
            DETECTION_SYSTEM_PROMPT.trim(),
        ))
    }

    fn with_system_instruction(
        provider: Arc<dyn GenerativeProvider>,
        config: RuntimeConfig,
        system_instruction: &str,
    ) -> Self {
        let assembler = RequestAssembler::new(system_instruction, config.generation);
        let discovery = config
            .discovery
            .enabled
            .then(|| ModelDiscovery::new(config.discovery.clone()));
        let resolver = ModelChainResolver::new(
            BackoffExecutor::new(config.retry.clone()),
            config.candidates(),
            discovery,
        );

        Self {
            provider,
            config: Arc::new(config),
            assembler,
            resolver,
            reporter: ResponseReporter::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Analyze `prompt` and return the model's answer or a diagnostic.
    ///
    /// May take several seconds while transient failures are retried.
    pub async fn analyze(
        &self,
        prompt: &str,
        history: &[ChatTurn],
        attachments: &[FileReference],
    ) -> String {
        self.analyze_detailed(prompt, history, attachments).await.text
    }

    /// Like [`Analyzer::analyze`], keeping the answering model and trace.
    pub async fn analyze_detailed(
        &self,
        prompt: &str,
        history: &[ChatTurn],
        attachments: &[FileReference],
    ) -> Analysis {
        let request = match self.assembler.build(prompt, history, attachments) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected analysis input");
                return Analysis {
                    text: format!("⚠️ **Input Error / 輸入錯誤**: {}", e),
                    model: None,
                    trace: ResolutionTrace::new(),
                };
            }
        };

        tracing::debug!(
            provider = self.provider.name(),
            history = request.history.len(),
            attachments = request.attachments.len(),
            "Resolving analysis request"
        );

        match self.resolver.resolve(self.provider.as_ref(), &request).await {
            Resolution::Answered { model, text, trace } => Analysis {
                text,
                model: Some(model),
                trace,
            },
            Resolution::Exhausted(trace) => Analysis {
                text: self.reporter.report(&trace),
                model: None,
                trace,
            },
        }
    }

    /// Catalog entries usable for generation.
    pub async fn supported_models(&self) -> Result<Vec<ModelCatalogEntry>, RuntimeError> {
        let method = &self.config.discovery.required_method;
        let catalog = self.provider.list_models().await?;
        Ok(catalog.into_iter().filter(|m| m.supports(method)).collect())
    }
}

/// Builder for [`Analyzer`].
pub struct AnalyzerBuilder {
    provider: Option<Arc<dyn GenerativeProvider>>,
    config: RuntimeConfig,
    system_instruction: Option<String>,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: RuntimeConfig::default(),
            system_instruction: None,
        }
    }

    /// Set the provider.
    pub fn provider(mut self, provider: Arc<dyn GenerativeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the built-in system instruction.
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Build the analyzer, validating the configuration.
    pub fn build(self) -> Result<Analyzer, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::ProviderNotConfigured("No provider set".to_string()))?;
        self.config.validate()?;

        let instruction = self
            .system_instruction
            .unwrap_or_else(|| DETECTION_SYSTEM_PROMPT.trim().to_string());
        Ok(Analyzer::with_system_instruction(
            provider,
            self.config,
            &instruction,
        ))
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
