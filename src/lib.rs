pub mod core;
pub mod llm;
pub mod mcp;
pub mod toolkit;
pub mod utils;

pub use utils::{round_to, safe_truncate};

pub use core::config::{AnalysisConfig, PeerlensConfig};
pub use core::error::{PeerlensError, Result};
pub use core::services::segment;
pub use llm::embeddings::EmbeddingGenerator;
pub use toolkit::{AnalysisError, AnalysisResult, SimilarityAnalyzer};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

pub const DEFAULT_LLM_MODEL: &str = "llama3.2";

pub const DEFAULT_CACHE_SIZE: usize = 1000;

pub const DEFAULT_CACHE_TTL: u64 = 300;
