//! Bounded exponential retry for a single model.

use backon::{ExponentialBuilder, Retryable};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use aiscope_core::{AttemptOutcome, CandidateReport, GenerationRequest, ModelCandidate};

use super::classify::classify;
use crate::config::RetryPolicy;
use crate::providers::GenerativeProvider;

/// Calls one model until it answers, fails fatally, or the retry budget runs out.
///
/// Quota and availability failures share a single schedule: the first
/// sleep is `initial_delay`, each later sleep is multiplied by
/// `multiplier`, capped at `max_delay`. Fatal failures are never retried.
#[derive(Debug, Clone)]
pub struct BackoffExecutor {
    policy: RetryPolicy,
}

impl BackoffExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.policy.initial_delay)
            .with_factor(self.policy.multiplier)
            .with_max_delay(self.policy.max_delay)
            .with_max_times(self.policy.max_attempts.saturating_sub(1) as usize)
    }

    /// Try `candidate` and report every call and sleep it took.
    pub async fn attempt(
        &self,
        provider: &dyn GenerativeProvider,
        candidate: &ModelCandidate,
        request: &GenerationRequest,
    ) -> CandidateReport {
        let model = candidate.identifier.as_str();
        let calls = AtomicU32::new(0);
        let mut waits: Vec<Duration> = Vec::new();

        let result = {
            let calls = &calls;
            (move || async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(model, attempt, provider = provider.name(), "Calling model");
                provider.generate_content(model, request).await
            })
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(|e| classify(e).is_transient())
            .notify(|e, wait| {
                tracing::warn!(
                    model,
                    attempt = calls.load(Ordering::SeqCst),
                    kind = %classify(e),
                    wait = ?wait,
                    error = %e,
                    "Transient failure, backing off"
                );
                waits.push(wait);
            })
            .await
        };

        let calls = calls.into_inner();
        let outcome = match result {
            Ok(text) => {
                tracing::info!(model, calls, "Model answered");
                AttemptOutcome::Success { text }
            }
            Err(e) => {
                let kind = classify(&e);
                tracing::warn!(model, calls, kind = %kind, error = %e, "Model failed");
                AttemptOutcome::failure(kind, e.to_string())
            }
        };

        CandidateReport::new(candidate, calls, waits, outcome)
    }
}

impl Default for BackoffExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
