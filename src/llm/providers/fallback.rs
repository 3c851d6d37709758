use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::base::{LlmMetadata, LlmProvider, LlmProviderError};

/// Primary provider with an optional secondary tried on any primary error.
pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback: Option<Arc<dyn LlmProvider>>,
    using_fallback: AtomicBool,
    /// Consecutive primary failures, reset on the next primary success.
    primary_failures: AtomicUsize,
}

impl LlmProviderWithFallback {
    pub fn new(primary: Arc<dyn LlmProvider>, fallback: Option<Arc<dyn LlmProvider>>) -> Self {
        match fallback {
            Some(ref fb) => info!(
                "LlmProviderWithFallback initialized: primary={}/{}, fallback={}/{}",
                primary.provider_name(),
                primary.model_name(),
                fb.provider_name(),
                fb.model_name()
            ),
            None => info!(
                "LlmProviderWithFallback initialized without fallback: primary={}",
                primary.provider_name()
            ),
        }

        Self {
            primary,
            fallback,
            using_fallback: AtomicBool::new(false),
            primary_failures: AtomicUsize::new(0),
        }
    }

    async fn fallback_generate(
        &self,
        fallback: &Arc<dyn LlmProvider>,
        system_prompt: &str,
        user_prompt: &str,
        original_error: &LlmProviderError,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        warn!(
            "Falling back to {}/{} due to: {}",
            fallback.provider_name(),
            fallback.model_name(),
            original_error
        );

        let (content, mut metadata) = fallback.generate(system_prompt, user_prompt).await?;

        metadata.fallback_used = true;
        metadata.original_error = Some(original_error.to_string());

        self.using_fallback.store(true, Ordering::SeqCst);
        info!("Fallback successful via {}", fallback.provider_name());

        Ok((content, metadata))
    }

    fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        match self.primary.generate(system_prompt, user_prompt).await {
            Ok(reply) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                self.primary_failures.store(0, Ordering::SeqCst);
                Ok(reply)
            }
            Err(e) => {
                let failures = self.primary_failures.fetch_add(1, Ordering::SeqCst) + 1;
                warn!("Primary LLM provider failed ({}x): {}", failures, e);

                match self.fallback {
                    Some(ref fallback) => {
                        self.fallback_generate(fallback, system_prompt, user_prompt, &e)
                            .await
                    }
                    None => Err(e),
                }
            }
        }
    }

    fn provider_name(&self) -> &str {
        match self.fallback {
            Some(ref fb) if self.is_using_fallback() => fb.provider_name(),
            _ => self.primary.provider_name(),
        }
    }

    fn model_name(&self) -> &str {
        match self.fallback {
            Some(ref fb) if self.is_using_fallback() => fb.model_name(),
            _ => self.primary.model_name(),
        }
    }
}
