//! Model chain resolution: configured chain first, discovered models last.

use aiscope_core::{
    AttemptOutcome, DiscoveryStatus, GenerationRequest, ModelCandidate, ResolutionTrace,
};

use super::backoff::BackoffExecutor;
use super::discovery::ModelDiscovery;
use crate::providers::GenerativeProvider;

/// Result of resolving a request against the candidate chains.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A model answered
    Answered {
        model: String,
        text: String,
        trace: ResolutionTrace,
    },

    /// Every candidate failed
    Exhausted(ResolutionTrace),
}

impl Resolution {
    pub fn trace(&self) -> &ResolutionTrace {
        match self {
            Resolution::Answered { trace, .. } | Resolution::Exhausted(trace) => trace,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Resolution::Answered { .. })
    }
}

/// Walks candidates strictly in order and stops at the first answer.
///
/// Worst case is bounded by the number of candidates times the executor's
/// retry budget; discovery adds one catalog call and at most
/// `max_candidates` more models.
#[derive(Debug, Clone)]
pub struct ModelChainResolver {
    executor: BackoffExecutor,
    chain: Vec<ModelCandidate>,
    discovery: Option<ModelDiscovery>,
}

impl ModelChainResolver {
    pub fn new(
        executor: BackoffExecutor,
        chain: Vec<ModelCandidate>,
        discovery: Option<ModelDiscovery>,
    ) -> Self {
        Self {
            executor,
            chain,
            discovery,
        }
    }

    pub fn chain(&self) -> &[ModelCandidate] {
        &self.chain
    }

    pub async fn resolve(
        &self,
        provider: &dyn GenerativeProvider,
        request: &GenerationRequest,
    ) -> Resolution {
        let mut trace = ResolutionTrace::new();

        if let Some((model, text)) = self
            .try_candidates(provider, &self.chain, request, &mut trace)
            .await
        {
            return Resolution::Answered { model, text, trace };
        }

        let Some(discovery) = &self.discovery else {
            tracing::warn!("Configured models exhausted, discovery disabled");
            trace.discovery = DiscoveryStatus::Disabled;
            return Resolution::Exhausted(trace);
        };

        tracing::warn!("Configured models exhausted, listing catalog");
        let found = match discovery.discover(provider).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(error = %e, "Model catalog query failed");
                trace.discovery = DiscoveryStatus::ListFailed {
                    message: e.to_string(),
                };
                return Resolution::Exhausted(trace);
            }
        };

        trace.discovery = DiscoveryStatus::Listed {
            catalog: found.catalog,
            candidates: found
                .candidates
                .iter()
                .map(|c| c.identifier.clone())
                .collect(),
        };

        match self
            .try_candidates(provider, &found.candidates, request, &mut trace)
            .await
        {
            Some((model, text)) => Resolution::Answered { model, text, trace },
            None => {
                tracing::error!(attempted = trace.attempts.len(), "All models failed");
                Resolution::Exhausted(trace)
            }
        }
    }

    /// Try each candidate in order, recording reports into `trace`.
    async fn try_candidates(
        &self,
        provider: &dyn GenerativeProvider,
        candidates: &[ModelCandidate],
        request: &GenerationRequest,
        trace: &mut ResolutionTrace,
    ) -> Option<(String, String)> {
        for candidate in candidates {
            let report = self.executor.attempt(provider, candidate, request).await;
            let answer = match &report.outcome {
                AttemptOutcome::Success { text } => Some((candidate.identifier.clone(), text.clone())),
                _ => {
                    tracing::info!(
                        model = %candidate.identifier,
                        source = %candidate.source,
                        "Advancing to next candidate"
                    );
                    None
                }
            };
            trace.record(report);

            if answer.is_some() {
                return answer;
            }
        }
        None
    }
}
