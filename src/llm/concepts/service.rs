use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::models::{ConceptExtractor, RelationVerdict, RelationVerifier};
use super::prompt::{
    build_extraction_prompt, build_verification_prompt, EXTRACTION_SYSTEM_PROMPT,
    VERIFICATION_SYSTEM_PROMPT,
};
use crate::llm::providers::base::{LlmProvider, LlmProviderError};

/// Accepts `{"concepts": [...]}` (or the singular `concept` key); anything that
/// is not a non-blank string is dropped. Unparseable replies yield `None`.
pub fn parse_concepts(response: &str) -> Option<Vec<String>> {
    let parsed: Value = serde_json::from_str(response).ok()?;
    let concepts = parsed.get("concepts").or_else(|| parsed.get("concept"));

    let list = match concepts {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Some(list)
}

/// Only a literal JSON `true` in `related` counts as related.
pub fn parse_verdict(response: &str) -> Result<RelationVerdict, serde_json::Error> {
    let parsed: Value = serde_json::from_str(response)?;
    let related = matches!(parsed.get("related"), Some(Value::Bool(true)));
    let reason = parsed
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(RelationVerdict { related, reason })
}

/// Concept extraction and relation checks backed by a chat model.
pub struct LlmConceptService {
    llm: Arc<dyn LlmProvider>,
}

impl LlmConceptService {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        info!(
            "LlmConceptService initialized: provider={}, model={}",
            llm.provider_name(),
            llm.model_name()
        );
        Self { llm }
    }
}

#[async_trait]
impl ConceptExtractor for LlmConceptService {
    async fn extract_concepts(&self, text: &str) -> Result<Vec<String>, LlmProviderError> {
        debug!("Extracting concepts from: {}...", crate::safe_truncate(text, 50));

        let (response, _metadata) = self
            .llm
            .generate(EXTRACTION_SYSTEM_PROMPT, &build_extraction_prompt(text))
            .await?;

        match parse_concepts(&response) {
            Some(concepts) => {
                debug!("Extracted {} concepts", concepts.len());
                Ok(concepts)
            }
            None => {
                warn!(
                    "Failed to parse concept extraction reply: {}",
                    crate::safe_truncate(&response, 200)
                );
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl RelationVerifier for LlmConceptService {
    async fn verify_relation(
        &self,
        concept_a: &str,
        concept_b: &str,
    ) -> Result<RelationVerdict, LlmProviderError> {
        let (response, _metadata) = self
            .llm
            .generate(
                VERIFICATION_SYSTEM_PROMPT,
                &build_verification_prompt(concept_a, concept_b),
            )
            .await?;

        let verdict = parse_verdict(&response)?;
        debug!(
            "Relation {} - {}: related={} ({})",
            concept_a, concept_b, verdict.related, verdict.reason
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::base::LlmMetadata;

    struct CannedLlm {
        reply: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl LlmProvider for CannedLlm {
        async fn generate(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> Result<(String, LlmMetadata), LlmProviderError> {
            self.reply
                .map(|r| (r.to_string(), LlmMetadata::default()))
                .map_err(|e| LlmProviderError::Provider(e.to_string()))
        }

        fn provider_name(&self) -> &str {
            "canned"
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn service(reply: Result<&'static str, &'static str>) -> LlmConceptService {
        LlmConceptService::new(Arc::new(CannedLlm { reply }))
    }

    #[test]
    fn test_parse_concepts_filters_and_trims() {
        let concepts = parse_concepts(r#"{"concepts": ["  해양 오염 ", "", 3, null, "플라스틱 쓰레기"]}"#).unwrap();
        assert_eq!(concepts, vec!["해양 오염", "플라스틱 쓰레기"]);
    }

    #[test]
    fn test_parse_concepts_singular_key_and_missing_key() {
        assert_eq!(parse_concepts(r#"{"concept": ["a b"]}"#).unwrap(), vec!["a b"]);
        assert!(parse_concepts(r#"{"keywords": ["a b"]}"#).unwrap().is_empty());
        assert!(parse_concepts(r#"{"concepts": "a b"}"#).unwrap().is_empty());
        assert!(parse_concepts("not json").is_none());
    }

    #[test]
    fn test_parse_verdict_requires_literal_true() {
        assert!(parse_verdict(r#"{"related": true, "reason": "same topic"}"#).unwrap().related);
        assert!(!parse_verdict(r#"{"related": "true"}"#).unwrap().related);
        assert!(!parse_verdict(r#"{}"#).unwrap().related);
        assert!(parse_verdict("oops").is_err());
    }

    #[tokio::test]
    async fn test_extract_unparseable_reply_is_empty_not_error() {
        let concepts = service(Ok("I cannot do that")).extract_concepts("텍스트").await.unwrap();
        assert!(concepts.is_empty());
    }

    #[tokio::test]
    async fn test_extract_transport_error_propagates() {
        assert!(service(Err("timeout")).extract_concepts("텍스트").await.is_err());
    }

    #[tokio::test]
    async fn test_verify_relation() {
        let verdict = service(Ok(r#"{"related": false, "reason": "different domains"}"#))
            .verify_relation("사과", "운동")
            .await
            .unwrap();
        assert_eq!(verdict, RelationVerdict::unrelated("different domains"));

        assert!(service(Ok("garbage")).verify_relation("a", "b").await.is_err());
    }
}
