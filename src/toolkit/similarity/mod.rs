//! Sentence-level bidirectional mean-max similarity between summaries.

pub mod models;
pub mod scorer;

pub use models::PairResult;
pub use scorer::{
    PairSide, SimilarityError, bidirectional_mean_max, cosine_similarity, mean_max, row_maxima,
    score_pair, similarity_matrix, transpose,
};
