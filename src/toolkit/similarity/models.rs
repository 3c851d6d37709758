use serde::{Deserialize, Serialize};

/// Similarity report for one unordered summary pair `(i, j)` with `i < j`.
///
/// Directional fields are absent when the pair degraded to similarity 0
/// because one side had no usable embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResult {
    pub summary_index_1: usize,
    pub summary_index_2: usize,
    pub similarity: f64,
    pub sentence_count_1: usize,
    pub sentence_count_2: usize,
    pub sentences_1: Vec<String>,
    pub sentences_2: Vec<String>,
    pub similarity_matrix: Vec<Vec<f64>>,

    #[serde(rename = "similarityMatrixJtoI", skip_serializing_if = "Option::is_none", default)]
    pub similarity_matrix_j_to_i: Option<Vec<Vec<f64>>>,

    #[serde(rename = "meanMaxItoJ", skip_serializing_if = "Option::is_none", default)]
    pub mean_max_i_to_j: Option<f64>,

    #[serde(rename = "meanMaxJtoI", skip_serializing_if = "Option::is_none", default)]
    pub mean_max_j_to_i: Option<f64>,

    #[serde(rename = "maxValuesItoJ", skip_serializing_if = "Option::is_none", default)]
    pub max_values_i_to_j: Option<Vec<f64>>,

    #[serde(rename = "maxValuesJtoI", skip_serializing_if = "Option::is_none", default)]
    pub max_values_j_to_i: Option<Vec<f64>>,
}

impl PairResult {
    pub fn degraded(
        summary_index_1: usize,
        summary_index_2: usize,
        sentences_1: Vec<String>,
        sentences_2: Vec<String>,
    ) -> Self {
        Self {
            summary_index_1,
            summary_index_2,
            similarity: 0.0,
            sentence_count_1: sentences_1.len(),
            sentence_count_2: sentences_2.len(),
            sentences_1,
            sentences_2,
            similarity_matrix: Vec::new(),
            similarity_matrix_j_to_i: None,
            mean_max_i_to_j: None,
            mean_max_j_to_i: None,
            max_values_i_to_j: None,
            max_values_j_to_i: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.mean_max_i_to_j.is_none()
    }
}
