//! Diagnostic text for total failure.
//!
//! When no model answers, the caller still gets a successful return: this
//! report, listing what was tried, what the catalog showed, and what to do.

use aiscope_core::{DiscoveryStatus, ResolutionTrace};

use crate::prompts::REMEDIATION_GUIDANCE;

/// Shown instead of the catalog when the catalog query failed.
pub const LIST_FAILED_SENTINEL: &str = "List failed";

/// Shown when the catalog query returned nothing.
pub const EMPTY_CATALOG: &str = "No models returned by ListModels.";

const DEFAULT_MAX_ERROR_CHARS: usize = 100;

/// Renders a [`ResolutionTrace`] into a bilingual diagnostic.
#[derive(Debug, Clone)]
pub struct ResponseReporter {
    max_error_chars: usize,
}

impl ResponseReporter {
    pub fn new() -> Self {
        Self {
            max_error_chars: DEFAULT_MAX_ERROR_CHARS,
        }
    }

    /// Build the diagnostic. Never fails.
    pub fn report(&self, trace: &ResolutionTrace) -> String {
        let mut lines = vec![
            "⚠️ **System Error / 系統錯誤**:".to_string(),
            "All AI models are currently unavailable.".to_string(),
            String::new(),
            "**Diagnosis**:".to_string(),
        ];

        if trace.attempts.is_empty() {
            lines.push("No models were attempted.".to_string());
        }
        for report in &trace.attempts {
            let error = report.outcome.error_message().unwrap_or("no error recorded");
            lines.push(format!(
                "- {} ({}, {} call{}): {}",
                report.identifier,
                report.source,
                report.calls,
                if report.calls == 1 { "" } else { "s" },
                truncate(error, self.max_error_chars)
            ));
        }

        lines.push(String::new());
        lines.push("**Available Models on your Account**:".to_string());
        lines.push("```".to_string());
        lines.push(self.catalog_section(&trace.discovery));
        lines.push("```".to_string());

        lines.push(String::new());
        lines.push("**Action**:".to_string());
        lines.push(REMEDIATION_GUIDANCE.to_string());

        lines.join("\n")
    }

    fn catalog_section(&self, discovery: &DiscoveryStatus) -> String {
        match discovery {
            DiscoveryStatus::Listed { catalog, .. } if catalog.is_empty() => EMPTY_CATALOG.to_string(),
            DiscoveryStatus::Listed { catalog, .. } => catalog
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            DiscoveryStatus::ListFailed { message } => format!(
                "{} ({})",
                LIST_FAILED_SENTINEL,
                truncate(message, self.max_error_chars)
            ),
            DiscoveryStatus::Disabled => "Model discovery is disabled in configuration.".to_string(),
            DiscoveryStatus::NotAttempted => "Model catalog was not queried.".to_string(),
        }
    }
}

impl Default for ResponseReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Cut `text` to `max` chars, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiscope_core::{
        AttemptOutcome, CandidateReport, CandidateSource, FailureKind, ModelCandidate,
        ModelCatalogEntry, GENERATE_CONTENT,
    };
    use proptest::prelude::*;

    fn failed(id: &str, source: CandidateSource, message: &str) -> CandidateReport {
        CandidateReport::new(
            &ModelCandidate::new(id, 0, source),
            3,
            Vec::new(),
            AttemptOutcome::failure(FailureKind::QuotaExhausted, message),
        )
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("short", 100), "short");

        let long = "配額".repeat(80);
        let cut = truncate(&long, 100);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_lists_attempts_with_truncated_errors() {
        let long_error = format!("Quota exhausted (429): {}", "x".repeat(300));
        let mut trace = ResolutionTrace::new();
        trace.record(failed("gemini-2.5-flash", CandidateSource::Configured, &long_error));
        trace.record(failed("gemini-pro", CandidateSource::Configured, "not found"));
        trace.discovery = DiscoveryStatus::Listed {
            catalog: vec![ModelCatalogEntry::new(
                "models/gemini-1.5-flash",
                [GENERATE_CONTENT, "countTokens"],
            )],
            candidates: vec!["models/gemini-1.5-flash".to_string()],
        };

        let text = ResponseReporter::new().report(&trace);

        assert!(text.contains("System Error / 系統錯誤"));
        assert!(text.contains("- gemini-2.5-flash (configured, 3 calls): Quota exhausted (429): xxx"));
        assert!(!text.contains(&"x".repeat(150)));
        assert!(text.contains("- gemini-pro (configured, 3 calls): not found"));
        assert!(text.contains("models/gemini-1.5-flash (generateContent, countTokens)"));
        assert!(text.contains("aistudio.google.com"));
    }

    #[test]
    fn test_list_failed_sentinel() {
        let mut trace = ResolutionTrace::new();
        trace.record(failed("A", CandidateSource::Configured, "boom"));
        trace.discovery = DiscoveryStatus::ListFailed {
            message: "HTTP request failed: dns error".to_string(),
        };

        let text = ResponseReporter::new().report(&trace);
        assert!(text.contains(LIST_FAILED_SENTINEL));
        assert!(text.contains("dns error"));
    }

    #[test]
    fn test_empty_catalog_and_disabled() {
        let mut trace = ResolutionTrace::new();
        trace.discovery = DiscoveryStatus::Listed {
            catalog: Vec::new(),
            candidates: Vec::new(),
        };
        assert!(ResponseReporter::new().report(&trace).contains(EMPTY_CATALOG));

        trace.discovery = DiscoveryStatus::Disabled;
        let text = ResponseReporter::new().report(&trace);
        assert!(text.contains("disabled"));
        assert!(text.contains("No models were attempted."));
    }

    proptest! {
        #[test]
        fn prop_truncate_bounded_prefix(text in "\\PC{0,300}", max in 1usize..150) {
            let cut = truncate(&text, max);
            let kept = cut.strip_suffix("...").unwrap_or(&cut);

            prop_assert!(text.starts_with(kept));
            prop_assert!(kept.chars().count() <= max);
            if text.chars().count() <= max {
                prop_assert_eq!(cut, text);
            }
        }
    }
}
