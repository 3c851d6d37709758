//! Request-scoped analysis pipeline over a list of summaries.

pub mod batching;
pub mod models;
pub mod orchestrator;
pub mod positions;

pub use batching::{BatchFailurePolicy, BatchedEmbeddings, embed_in_batches};
pub use models::{AnalysisError, AnalysisRequest, AnalysisResult, Diagnostics, ErrorResponse};
pub use orchestrator::SimilarityAnalyzer;
pub use positions::{SentenceRecord, SentenceTable};
