pub mod concepts;
pub mod embeddings;
pub mod factory;
pub mod providers;

pub use concepts::{ConceptExtractor, LlmConceptService, RelationVerdict, RelationVerifier};
pub use embeddings::{EmbeddingError, EmbeddingGenerator, EmbeddingProvider, EmbeddingSettings};
pub use factory::{ExternalServices, LlmProviderFactory};
pub use providers::{LlmProvider, LlmProviderError};
