//! Attempt outcomes and the resolution trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::candidate::{CandidateSource, ModelCatalogEntry, ModelCandidate};

/// Failure classes that drive retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rate or quota limit hit
    QuotaExhausted,

    /// Transient infrastructure fault
    ServiceUnavailable,

    /// Anything else; never retried
    Fatal,
}

impl FailureKind {
    /// Transient kinds are retried with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::QuotaExhausted | FailureKind::ServiceUnavailable
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::QuotaExhausted => write!(f, "quota exhausted"),
            FailureKind::ServiceUnavailable => write!(f, "service unavailable"),
            FailureKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Final result of trying one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { text: String },

    /// Transient failure that outlived the retry budget
    TransientFailure { kind: FailureKind, message: String },

    FatalFailure { message: String },
}

impl AttemptOutcome {
    /// Build a failure outcome for the given kind.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        if kind.is_transient() {
            AttemptOutcome::TransientFailure { kind, message }
        } else {
            AttemptOutcome::FatalFailure { message }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }

    /// Raw error text, if this is a failure.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            AttemptOutcome::Success { .. } => None,
            AttemptOutcome::TransientFailure { message, .. }
            | AttemptOutcome::FatalFailure { message } => Some(message),
        }
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub identifier: String,
    pub source: CandidateSource,

    /// Provider calls made for this candidate
    pub calls: u32,

    /// Backoff sleeps taken between calls, in order
    pub waits: Vec<Duration>,

    pub outcome: AttemptOutcome,

    pub finished_at: DateTime<Utc>,
}

impl CandidateReport {
    pub fn new(
        candidate: &ModelCandidate,
        calls: u32,
        waits: Vec<Duration>,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            identifier: candidate.identifier.clone(),
            source: candidate.source,
            calls,
            waits,
            outcome,
            finished_at: Utc::now(),
        }
    }
}

/// State of the auto-discovery step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscoveryStatus {
    /// The configured chain answered first
    NotAttempted,

    /// Turned off in configuration
    Disabled,

    /// Catalog listed; `candidates` is the ranked, truncated list
    Listed {
        catalog: Vec<ModelCatalogEntry>,
        candidates: Vec<String>,
    },

    /// The catalog query itself failed
    ListFailed { message: String },
}

/// Full record of one resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionTrace {
    pub attempts: Vec<CandidateReport>,
    pub discovery: DiscoveryStatus,
}

impl Default for ResolutionTrace {
    fn default() -> Self {
        Self {
            attempts: Vec::new(),
            discovery: DiscoveryStatus::NotAttempted,
        }
    }
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: CandidateReport) {
        self.attempts.push(report);
    }

    /// Reports for one candidate source, in attempt order.
    pub fn attempts_from(&self, source: CandidateSource) -> impl Iterator<Item = &CandidateReport> {
        self.attempts.iter().filter(move |r| r.source == source)
    }

    /// Identifiers attempted, in order.
    pub fn attempted_models(&self) -> Vec<&str> {
        self.attempts.iter().map(|r| r.identifier.as_str()).collect()
    }

    /// Total provider calls across every candidate.
    pub fn total_calls(&self) -> u32 {
        self.attempts.iter().map(|r| r.calls).sum()
    }

    /// The successful report, if any.
    pub fn success(&self) -> Option<&CandidateReport> {
        self.attempts.iter().find(|r| r.outcome.is_success())
    }
}
