use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::providers::base::LlmProviderError;

/// Maps one summary to its key noun-phrase concepts.
///
/// `Ok(vec![])` means "nothing found"; `Err` is a transport/provider failure.
#[async_trait]
pub trait ConceptExtractor: Send + Sync {
    async fn extract_concepts(&self, text: &str) -> Result<Vec<String>, LlmProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationVerdict {
    pub related: bool,
    #[serde(default)]
    pub reason: String,
}

impl RelationVerdict {
    pub fn related(reason: impl Into<String>) -> Self {
        Self {
            related: true,
            reason: reason.into(),
        }
    }

    pub fn unrelated(reason: impl Into<String>) -> Self {
        Self {
            related: false,
            reason: reason.into(),
        }
    }
}

/// Judges whether two concepts are semantically related.
///
/// Callers treat `Err` as "keep the edge unchanged".
#[async_trait]
pub trait RelationVerifier: Send + Sync {
    async fn verify_relation(
        &self,
        concept_a: &str,
        concept_b: &str,
    ) -> Result<RelationVerdict, LlmProviderError>;
}
