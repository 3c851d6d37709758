pub mod config;
pub mod error;
pub mod services;

pub use config::{AnalysisConfig, EmbeddingProviderKind, LlmProviderKind, PeerlensConfig};
pub use error::{PeerlensError, Result};
pub use services::segment;
