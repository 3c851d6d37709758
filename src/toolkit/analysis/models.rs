use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::toolkit::concept_graph::{ConceptGraph, GraphStats};
use crate::toolkit::similarity::PairResult;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding provider unavailable: {0}")]
    ProviderFatal(String),

    #[error("Internal analysis error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// HTTP-style status class.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::ProviderFatal(_) | Self::Internal(_) => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            Self::InvalidInput(message) => ErrorResponse {
                error: message.clone(),
                details: None,
            },
            Self::ProviderFatal(details) => ErrorResponse {
                error: "Embedding provider unavailable".to_string(),
                details: Some(details.clone()),
            },
            Self::Internal(_) => ErrorResponse {
                error: "An error occurred during analysis".to_string(),
                details: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

/// Request input as received at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub summaries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub sentence_count: usize,
    pub missing_sentence_embeddings: usize,
    pub embedding_mismatches: usize,
    pub embedding_dimension_mismatches: usize,
    pub failed_embedding_batches: usize,
    pub extraction_failures: usize,
    pub concept_count: usize,
    #[serde(flatten)]
    pub graph: GraphStats,
    pub node_count: usize,
    pub edge_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub results: Vec<PairResult>,
    pub total_summaries: usize,
    pub concept_graph: ConceptGraph,
    /// Parallel to the input; entries are empty where extraction found nothing or failed.
    pub concepts_by_summary: Vec<Vec<String>>,
    pub diagnostics: Diagnostics,
}
