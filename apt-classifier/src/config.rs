//! Configuration wiring for apt-classifier
//!
//! Turns the resolved [`TomlConfig`] plus CLI overrides into the concrete
//! pipeline components. External services are optional: a missing API key
//! or a disabled section simply removes that strategy/connector.

use apt_common::config::{resolve_ai_api_key, TomlConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::classifier::ArtistClassifier;
use crate::derivation::TypeWeights;
use crate::enrichment::{wikipedia::WikipediaSource, Enricher};
use crate::error::ClassifyResult;
use crate::orchestrator::BatchConfig;
use crate::rebalancer::RebalanceConfig;
use crate::scoring::ai_assisted::AiScorer;
use crate::scoring::generative_client::OpenAiCompatibleClient;
use crate::scoring::ScoringEngine;

/// Per-invocation overrides from the `run` subcommand
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub limit: Option<usize>,
    pub seed: Option<u64>,
    pub no_ai: bool,
    pub no_enrichment: bool,
}

/// Everything a batch run needs, resolved from config
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub toml: TomlConfig,
    pub batch: BatchConfig,
    pub rebalance: RebalanceConfig,
    pub weights: TypeWeights,
    pub ai_api_key: Option<String>,
    pub use_ai: bool,
    pub use_enrichment: bool,
}

impl ClassifierSettings {
    pub fn resolve(toml: TomlConfig, overrides: &RunOverrides) -> Self {
        let mut batch = BatchConfig::from(&toml.batch);
        if let Some(limit) = overrides.limit {
            batch.limit = limit;
        }

        let mut rebalance = RebalanceConfig::from(&toml.rebalancer);
        if let Some(seed) = overrides.seed {
            rebalance.seed = seed;
        }

        let ai_api_key = resolve_ai_api_key(&toml);
        let use_ai = toml.ai.enabled && !overrides.no_ai && ai_api_key.is_some();
        if toml.ai.enabled && !overrides.no_ai && ai_api_key.is_none() {
            warn!("No AI API key configured; AI-assisted scoring disabled");
        }

        Self {
            weights: TypeWeights::from(&toml.derivation),
            use_enrichment: toml.enrichment.enabled && !overrides.no_enrichment,
            toml,
            batch,
            rebalance,
            ai_api_key,
            use_ai,
        }
    }

    /// Build the per-record classifier with the configured connectors
    pub fn build_classifier(&self) -> ClassifyResult<ArtistClassifier> {
        let scoring = match (&self.ai_api_key, self.use_ai) {
            (Some(key), true) => {
                let ai = &self.toml.ai;
                let timeout = Duration::from_secs(ai.timeout_secs.max(1));
                let client = OpenAiCompatibleClient::new(
                    &ai.base_url,
                    key,
                    &ai.model,
                    timeout,
                    ai.requests_per_second,
                )?;
                info!(model = %ai.model, base_url = %ai.base_url, "AI-assisted scoring enabled");
                ScoringEngine::new(Some(AiScorer::new(Arc::new(client), timeout)))
            }
            _ => ScoringEngine::offline(),
        };

        let enricher = if self.use_enrichment {
            let section = &self.toml.enrichment;
            let timeout = Duration::from_secs(section.timeout_secs.max(1));
            let source = WikipediaSource::new(
                &section.base_url,
                &section.user_agent,
                timeout,
                section.requests_per_second,
            )?;
            info!(base_url = %section.base_url, "Reference enrichment enabled");
            Some(Enricher::new(Arc::new(source), timeout))
        } else {
            None
        };

        Ok(ArtistClassifier::new(scoring, enricher, self.weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_overrides_apply() {
        std::env::remove_var(apt_common::config::AI_API_KEY_ENV_VAR);
        let settings = ClassifierSettings::resolve(
            TomlConfig::default(),
            &RunOverrides {
                limit: Some(25),
                seed: Some(7),
                no_ai: true,
                no_enrichment: true,
            },
        );
        assert_eq!(settings.batch.limit, 25);
        assert_eq!(settings.rebalance.seed, 7);
        assert!(!settings.use_ai);
        assert!(!settings.use_enrichment);
    }

    #[test]
    #[serial]
    fn test_missing_key_disables_ai() {
        std::env::remove_var(apt_common::config::AI_API_KEY_ENV_VAR);
        let settings = ClassifierSettings::resolve(TomlConfig::default(), &RunOverrides::default());
        assert!(settings.ai_api_key.is_none());
        assert!(!settings.use_ai);
        assert!(settings.use_enrichment);
    }

    #[test]
    #[serial]
    fn test_toml_key_enables_ai() {
        std::env::remove_var(apt_common::config::AI_API_KEY_ENV_VAR);
        let mut toml = TomlConfig::default();
        toml.ai.api_key = Some("sk-test".to_string());
        let settings = ClassifierSettings::resolve(toml, &RunOverrides::default());
        assert!(settings.use_ai);
        assert!(settings.build_classifier().is_ok());
    }
}
