mod models;
mod prompt;
mod service;

pub use models::{ConceptExtractor, RelationVerdict, RelationVerifier};
pub use service::{parse_concepts, parse_verdict, LlmConceptService};
