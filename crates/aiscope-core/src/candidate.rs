//! Model candidates and catalog ranking.
//!
//! The resolver walks two ordered candidate lists: the configured chain
//! (primary then fallbacks) and, as a last resort, a list ranked from the
//! provider's model catalog. Ranking is pure so it can be tested without a
//! provider.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Primary or fallback from configuration
    Configured,

    /// Ranked from the provider catalog
    Discovered,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Configured => write!(f, "configured"),
            CandidateSource::Discovered => write!(f, "discovered"),
        }
    }
}

/// A model identifier with its position in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub identifier: String,

    /// Zero-based rank; lower is tried first
    pub priority: usize,

    pub source: CandidateSource,
}

impl ModelCandidate {
    pub fn new(identifier: impl Into<String>, priority: usize, source: CandidateSource) -> Self {
        Self {
            identifier: identifier.into(),
            priority,
            source,
        }
    }

    /// Build an ordered chain from identifiers, ranks following input order.
    pub fn chain<I, S>(identifiers: I, source: CandidateSource) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        identifiers
            .into_iter()
            .enumerate()
            .map(|(priority, id)| Self::new(id, priority, source))
            .collect()
    }
}

/// One row of the provider's model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalogEntry {
    /// Full resource name, e.g. `models/gemini-1.5-flash`
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelCatalogEntry {
    pub fn new<I, S>(name: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            display_name: None,
            supported_generation_methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods.iter().any(|m| m == method)
    }
}

impl fmt::Display for ModelCatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.name,
            self.supported_generation_methods.join(", ")
        )
    }
}

/// Whether an identifier signals a fast/cheap tier.
///
/// Markers are matched as case-insensitive substrings.
pub fn is_fast_tier(identifier: &str, markers: &[String]) -> bool {
    let lower = identifier.to_lowercase();
    markers
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

/// Rank catalog entries into discovery candidates.
///
/// Keeps entries supporting `method`, puts fast-tier identifiers first while
/// preserving catalog order inside each tier, and truncates to `limit`.
pub fn rank_catalog(
    catalog: &[ModelCatalogEntry],
    method: &str,
    fast_markers: &[String],
    limit: usize,
) -> Vec<ModelCandidate> {
    let (fast, other): (Vec<&ModelCatalogEntry>, Vec<&ModelCatalogEntry>) = catalog
        .iter()
        .filter(|entry| entry.supports(method))
        .partition(|entry| is_fast_tier(&entry.name, fast_markers));

    ModelCandidate::chain(
        fast.into_iter()
            .chain(other)
            .take(limit)
            .map(|entry| entry.name.clone()),
        CandidateSource::Discovered,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GENERATE: &str = "generateContent";

    fn flash() -> Vec<String> {
        vec!["flash".to_string()]
    }

    fn ids(candidates: &[ModelCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.identifier.as_str()).collect()
    }

    #[test]
    fn test_chain_ranks_follow_order() {
        let chain = ModelCandidate::chain(["a", "b", "c"], CandidateSource::Configured);
        assert_eq!(ids(&chain), vec!["a", "b", "c"]);
        assert_eq!(chain[2].priority, 2);
        assert!(chain.iter().all(|c| c.source == CandidateSource::Configured));
    }

    #[test]
    fn test_rank_fast_tier_first_and_filtered() {
        let catalog = vec![
            ModelCatalogEntry::new("slow-x", [GENERATE]),
            ModelCatalogEntry::new("fast-y", [GENERATE]),
            ModelCatalogEntry::new("other-z", ["embedContent"]),
        ];

        let ranked = rank_catalog(&catalog, GENERATE, &["fast".to_string()], 3);
        assert_eq!(ids(&ranked), vec!["fast-y", "slow-x"]);
        assert_eq!(ranked[0].priority, 0);
        assert_eq!(ranked[0].source, CandidateSource::Discovered);
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        let catalog = vec![
            ModelCatalogEntry::new("models/gemini-1.0-pro", [GENERATE]),
            ModelCatalogEntry::new("models/gemini-1.5-flash", [GENERATE]),
            ModelCatalogEntry::new("models/gemini-1.5-pro", [GENERATE]),
            ModelCatalogEntry::new("models/gemini-2.0-flash", [GENERATE]),
        ];

        let ranked = rank_catalog(&catalog, GENERATE, &flash(), 3);
        assert_eq!(
            ids(&ranked),
            vec![
                "models/gemini-1.5-flash",
                "models/gemini-2.0-flash",
                "models/gemini-1.0-pro"
            ]
        );
    }

    #[test]
    fn test_fast_tier_case_insensitive() {
        assert!(is_fast_tier("models/Gemini-FLASH-8b", &flash()));
        assert!(!is_fast_tier("models/gemini-pro", &flash()));
        assert!(!is_fast_tier("anything", &[]));
    }

    #[test]
    fn test_catalog_entry_display() {
        let entry = ModelCatalogEntry::new("models/m", [GENERATE, "countTokens"]);
        assert_eq!(entry.to_string(), "models/m (generateContent, countTokens)");
    }

    fn arb_entry() -> impl Strategy<Value = ModelCatalogEntry> {
        ("[a-z]{1,6}", any::<bool>(), any::<bool>()).prop_map(|(stem, fast, generates)| {
            let name = if fast {
                format!("{}-flash", stem)
            } else {
                format!("{}-pro", stem)
            };
            let methods = if generates { vec![GENERATE] } else { vec!["embedContent"] };
            ModelCatalogEntry::new(name, methods)
        })
    }

    proptest! {
        #[test]
        fn prop_ranking_is_bounded_filtered_and_stable(
            catalog in prop::collection::vec(arb_entry(), 0..12),
            limit in 0usize..6,
        ) {
            let ranked = rank_catalog(&catalog, GENERATE, &flash(), limit);

            prop_assert!(ranked.len() <= limit);

            let eligible: Vec<&ModelCatalogEntry> =
                catalog.iter().filter(|e| e.supports(GENERATE)).collect();
            prop_assert_eq!(ranked.len(), eligible.len().min(limit));

            // Fast tier never follows the other tier.
            let tiers: Vec<bool> = ranked
                .iter()
                .map(|c| is_fast_tier(&c.identifier, &flash()))
                .collect();
            prop_assert!(tiers.windows(2).all(|w| w[0] || !w[1]));

            // Expected order: stable partition of the eligible entries.
            let expected: Vec<&str> = eligible
                .iter()
                .filter(|e| is_fast_tier(&e.name, &flash()))
                .chain(eligible.iter().filter(|e| !is_fast_tier(&e.name, &flash())))
                .take(limit)
                .map(|e| e.name.as_str())
                .collect();
            prop_assert_eq!(ids(&ranked), expected);
        }
    }
}
