//! Catalog-based model discovery.

use aiscope_core::{rank_catalog, ModelCandidate, ModelCatalogEntry};

use crate::config::DiscoveryConfig;
use crate::providers::{GenerativeProvider, ProviderError};

/// Catalog listing plus the candidates ranked from it.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub catalog: Vec<ModelCatalogEntry>,
    pub candidates: Vec<ModelCandidate>,
}

/// Ranks the provider catalog into a short list of last-resort candidates.
#[derive(Debug, Clone)]
pub struct ModelDiscovery {
    config: DiscoveryConfig,
}

impl ModelDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Query the catalog once and rank it.
    ///
    /// Entries lacking the required generation method are dropped, fast-tier
    /// names move to the front, and the list is cut to `max_candidates`.
    pub async fn discover(
        &self,
        provider: &dyn GenerativeProvider,
    ) -> Result<Discovery, ProviderError> {
        let catalog = provider.list_models().await?;
        let candidates = rank_catalog(
            &catalog,
            &self.config.required_method,
            &self.config.fast_tier_markers,
            self.config.max_candidates,
        );

        tracing::info!(
            listed = catalog.len(),
            candidates = ?candidates.iter().map(|c| c.identifier.as_str()).collect::<Vec<_>>(),
            "Model catalog ranked"
        );

        Ok(Discovery { catalog, candidates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedProvider;
    use aiscope_core::{CandidateSource, GENERATE_CONTENT};

    #[tokio::test]
    async fn test_fast_tier_first_and_unsupported_dropped() {
        let provider = ScriptedProvider::new().with_catalog(Ok(vec![
            ModelCatalogEntry::new("slow-x", [GENERATE_CONTENT]),
            ModelCatalogEntry::new("fast-y", [GENERATE_CONTENT]),
            ModelCatalogEntry::new("other-z", Vec::<String>::new()),
        ]));
        let discovery = ModelDiscovery::new(DiscoveryConfig {
            fast_tier_markers: vec!["fast".to_string()],
            ..DiscoveryConfig::default()
        });

        let found = discovery.discover(&provider).await.unwrap();

        let ids: Vec<&str> = found.candidates.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(ids, vec!["fast-y", "slow-x"]);
        assert!(found.candidates.iter().all(|c| c.source == CandidateSource::Discovered));
        assert_eq!(found.catalog.len(), 3);
        assert_eq!(provider.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_truncated_to_limit() {
        let catalog = (0..6)
            .map(|i| ModelCatalogEntry::new(format!("models/gemini-{i}-pro"), [GENERATE_CONTENT]))
            .collect();
        let provider = ScriptedProvider::new().with_catalog(Ok(catalog));

        let found = ModelDiscovery::new(DiscoveryConfig::default())
            .discover(&provider)
            .await
            .unwrap();

        assert_eq!(found.candidates.len(), 3);
        assert_eq!(found.candidates[0].identifier, "models/gemini-0-pro");
    }

    #[tokio::test]
    async fn test_list_failure_propagates() {
        let provider = ScriptedProvider::new()
            .with_catalog(Err(ProviderError::AuthError("API key not valid".to_string())));

        let result = ModelDiscovery::new(DiscoveryConfig::default())
            .discover(&provider)
            .await;

        assert!(matches!(result, Err(ProviderError::AuthError(_))));
    }
}
