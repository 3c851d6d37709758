use thiserror::Error;

use crate::llm::embeddings::EmbeddingError;
use crate::llm::providers::base::LlmProviderError;

#[derive(Error, Debug)]
pub enum PeerlensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(#[from] LlmProviderError),

    #[error("Embedding generation error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for PeerlensError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PeerlensError>;
