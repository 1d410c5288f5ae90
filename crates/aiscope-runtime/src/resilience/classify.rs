//! Failure classification.

use lazy_static::lazy_static;
use regex::Regex;

use aiscope_core::FailureKind;

use crate::providers::ProviderError;

lazy_static! {
    /// Quota signal embedded in an otherwise unstructured error message.
    static ref QUOTA_TEXT: Regex = Regex::new(r"\b429\b|RESOURCE_EXHAUSTED").unwrap();

    /// Transport faults that usually clear on a second call.
    static ref TRANSPORT_TEXT: Regex =
        Regex::new(r"(?i)connection (refused|reset|closed)|broken pipe|timed out").unwrap();
}

/// Map a provider error onto the retry taxonomy.
///
/// Structured variants decide first; the message text is only searched for
/// errors the provider could not classify itself.
pub fn classify(error: &ProviderError) -> FailureKind {
    match error {
        ProviderError::QuotaExhausted { .. } | ProviderError::ApiError { status: 429, .. } => {
            FailureKind::QuotaExhausted
        }
        ProviderError::Unavailable(_)
        | ProviderError::ApiError { status: 503, .. }
        | ProviderError::Timeout(_) => FailureKind::ServiceUnavailable,
        ProviderError::HttpError(message) | ProviderError::Other(message)
            if QUOTA_TEXT.is_match(message) =>
        {
            FailureKind::QuotaExhausted
        }
        ProviderError::HttpError(message) if TRANSPORT_TEXT.is_match(message) => {
            FailureKind::ServiceUnavailable
        }
        _ => FailureKind::Fatal,
    }
}
