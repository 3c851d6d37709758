pub mod analysis;
pub mod concept_graph;
pub mod similarity;

pub use analysis::{AnalysisError, AnalysisRequest, AnalysisResult, ErrorResponse, SimilarityAnalyzer};
pub use concept_graph::{ConceptEdge, ConceptGraph, ConceptNode};
pub use similarity::PairResult;
