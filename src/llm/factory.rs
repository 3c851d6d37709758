use std::sync::Arc;

use super::concepts::LlmConceptService;
use super::embeddings::EmbeddingGenerator;
use super::providers::base::{LlmProvider, LlmProviderError};
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiProvider;
use crate::core::config::{LlmProviderKind, PeerlensConfig};

pub struct LlmProviderFactory;

impl LlmProviderFactory {
    pub fn create(
        kind: LlmProviderKind,
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
        timeout_secs: u64,
    ) -> Result<Arc<dyn LlmProvider>, LlmProviderError> {
        let provider: Arc<dyn LlmProvider> = match kind {
            LlmProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                api_key.unwrap_or_default(),
                base_url,
                model,
                temperature,
                timeout_secs,
            )?),
            LlmProviderKind::Ollama => Arc::new(OllamaProvider::new(
                base_url.unwrap_or(crate::DEFAULT_OLLAMA_URL),
                model,
                temperature,
                timeout_secs,
            )?),
        };
        Ok(provider)
    }

    /// Configured primary provider, wrapped with the local Ollama fallback when enabled.
    pub fn from_config(config: &PeerlensConfig) -> crate::Result<Arc<dyn LlmProvider>> {
        let primary = Self::create(
            config.llm_kind()?,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_base_url.as_deref(),
            config.llm_temperature,
            config.timeout,
        )?;

        if !config.llm_fallback_enabled {
            return Ok(primary);
        }

        let fallback: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::new(
            config.llm_fallback_url.clone(),
            config.llm_fallback_model.clone(),
            config.llm_temperature,
            config.timeout,
        )?);

        Ok(Arc::new(LlmProviderWithFallback::new(primary, Some(fallback))))
    }
}

/// Everything the analysis pipeline needs from the outside world.
pub struct ExternalServices {
    pub embeddings: Arc<EmbeddingGenerator>,
    pub concepts: Arc<LlmConceptService>,
}

impl ExternalServices {
    pub fn from_config(config: &PeerlensConfig) -> crate::Result<Self> {
        let llm = LlmProviderFactory::from_config(config)?;
        Ok(Self {
            embeddings: Arc::new(EmbeddingGenerator::from_config(config)?),
            concepts: Arc::new(LlmConceptService::new(llm)),
        })
    }
}
