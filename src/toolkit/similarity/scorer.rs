use thiserror::Error;
use tracing::{debug, warn};

use super::models::PairResult;
use crate::utils::{round_all, round_to};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("Vectors must have the same length: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("Cannot aggregate an empty similarity matrix")]
    EmptyMatrix,
}

/// Cosine similarity accumulated in f64. A zero-norm input yields 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::LengthMismatch(a.len(), b.len()));
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / denominator)
}

/// Rows follow `rows`, columns follow `cols`. Mismatched dimensions score 0.
pub fn similarity_matrix(rows: &[&[f32]], cols: &[&[f32]]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| {
            cols.iter()
                .map(|col| {
                    cosine_similarity(row, col).unwrap_or_else(|e| {
                        warn!("Cosine similarity error: {}", e);
                        0.0
                    })
                })
                .collect()
        })
        .collect()
}

pub fn transpose(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = matrix.first().map(Vec::len).unwrap_or(0);
    (0..width)
        .map(|c| matrix.iter().map(|row| row[c]).collect())
        .collect()
}

/// Maximum of each row; an empty row has no maximum and yields `None`.
pub fn row_maxima(matrix: &[Vec<f64>]) -> Option<Vec<f64>> {
    matrix
        .iter()
        .map(|row| {
            if row.is_empty() {
                None
            } else {
                Some(row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            }
        })
        .collect()
}

/// Average over rows of each row's maximum.
pub fn mean_max(matrix: &[Vec<f64>]) -> Result<f64, SimilarityError> {
    if matrix.is_empty() {
        return Err(SimilarityError::EmptyMatrix);
    }
    let maxima = row_maxima(matrix).ok_or(SimilarityError::EmptyMatrix)?;
    Ok(maxima.iter().sum::<f64>() / maxima.len() as f64)
}

pub fn bidirectional_mean_max(
    matrix_a_to_b: &[Vec<f64>],
    matrix_b_to_a: &[Vec<f64>],
) -> Result<f64, SimilarityError> {
    Ok((mean_max(matrix_a_to_b)? + mean_max(matrix_b_to_a)?) / 2.0)
}

struct Aggregate {
    mean_max_i_to_j: f64,
    mean_max_j_to_i: f64,
    similarity: f64,
    maxima_i_to_j: Vec<f64>,
    maxima_j_to_i: Vec<f64>,
}

fn aggregate(matrix_i_to_j: &[Vec<f64>], matrix_j_to_i: &[Vec<f64>]) -> Result<Aggregate, SimilarityError> {
    Ok(Aggregate {
        mean_max_i_to_j: mean_max(matrix_i_to_j)?,
        mean_max_j_to_i: mean_max(matrix_j_to_i)?,
        similarity: bidirectional_mean_max(matrix_i_to_j, matrix_j_to_i)?,
        maxima_i_to_j: row_maxima(matrix_i_to_j).ok_or(SimilarityError::EmptyMatrix)?,
        maxima_j_to_i: row_maxima(matrix_j_to_i).ok_or(SimilarityError::EmptyMatrix)?,
    })
}

/// Borrowed view of one summary's side of a pair.
#[derive(Debug, Clone, Copy)]
pub struct PairSide<'a> {
    pub summary_index: usize,
    pub sentences: &'a [String],
    /// Embeddings of the sentences that have one, in sentence order.
    pub embeddings: &'a [&'a [f32]],
}

/// Score one summary pair. Sides without usable embeddings degrade to similarity 0.
pub fn score_pair(left: PairSide<'_>, right: PairSide<'_>, precision: u32) -> PairResult {
    let (i, j) = (left.summary_index, right.summary_index);

    if left.embeddings.is_empty() || right.embeddings.is_empty() {
        warn!(
            "Skipping pair {}-{}: empty embeddings (I={}, J={}, sentences I={}, J={})",
            i,
            j,
            left.embeddings.len(),
            right.embeddings.len(),
            left.sentences.len(),
            right.sentences.len()
        );
        return PairResult::degraded(i, j, left.sentences.to_vec(), right.sentences.to_vec());
    }

    let matrix_i_to_j = similarity_matrix(left.embeddings, right.embeddings);
    let matrix_j_to_i = transpose(&matrix_i_to_j);

    let Aggregate {
        mean_max_i_to_j,
        mean_max_j_to_i,
        similarity,
        maxima_i_to_j,
        maxima_j_to_i,
    } = match aggregate(&matrix_i_to_j, &matrix_j_to_i) {
        Ok(values) => values,
        Err(e) => {
            warn!("Pair {}-{} could not be aggregated: {}", i, j, e);
            return PairResult::degraded(i, j, left.sentences.to_vec(), right.sentences.to_vec());
        }
    };

    debug!(
        "Pair {}-{}: {}x{} matrix, meanMax I->J={:.4}, J->I={:.4}, similarity={:.4}",
        i,
        j,
        matrix_i_to_j.len(),
        matrix_j_to_i.len(),
        mean_max_i_to_j,
        mean_max_j_to_i,
        similarity
    );

    PairResult {
        summary_index_1: i,
        summary_index_2: j,
        similarity: round_to(similarity, precision),
        sentence_count_1: left.sentences.len(),
        sentence_count_2: right.sentences.len(),
        sentences_1: left.sentences.to_vec(),
        sentences_2: right.sentences.to_vec(),
        similarity_matrix: round_matrix(&matrix_i_to_j, precision),
        similarity_matrix_j_to_i: Some(round_matrix(&matrix_j_to_i, precision)),
        mean_max_i_to_j: Some(round_to(mean_max_i_to_j, precision)),
        mean_max_j_to_i: Some(round_to(mean_max_j_to_i, precision)),
        max_values_i_to_j: Some(round_all(&maxima_i_to_j, precision)),
        max_values_j_to_i: Some(round_all(&maxima_j_to_i, precision)),
    }
}

fn round_matrix(matrix: &[Vec<f64>], precision: u32) -> Vec<Vec<f64>> {
    matrix.iter().map(|row| round_all(row, precision)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_cosine_identity_and_opposite() {
        let v = [0.3f32, -1.2, 2.5];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&v, &neg).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch() {
        assert_eq!(
            cosine_similarity(&[1.0], &[1.0, 0.0]),
            Err(SimilarityError::LengthMismatch(1, 2))
        );
    }

    #[test]
    fn test_mean_max_bounds() {
        let matrix = vec![vec![0.1, 0.9, 0.3], vec![0.4, 0.2, 0.5], vec![-0.2, 0.0, 0.05]];
        let value = mean_max(&matrix).unwrap();
        let maxima = row_maxima(&matrix).unwrap();
        let global_max = maxima.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_row_max = maxima.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(value <= global_max + EPS);
        assert!(value >= min_row_max - EPS);
        assert!((value - (0.9 + 0.5 + 0.05) / 3.0).abs() < EPS);
    }

    #[test]
    fn test_mean_max_empty_is_error() {
        assert_eq!(mean_max(&[]), Err(SimilarityError::EmptyMatrix));
        assert_eq!(mean_max(&[vec![]]), Err(SimilarityError::EmptyMatrix));
    }

    #[test]
    fn test_bidirectional_is_average_of_directions() {
        // meanMax I->J = 0.8, meanMax J->I = 0.6
        let a_to_b = vec![vec![0.8, 0.1], vec![0.2, 0.8]];
        let b_to_a = vec![vec![0.6], vec![0.6]];
        let combined = bidirectional_mean_max(&a_to_b, &b_to_a).unwrap();
        assert!((combined - 0.70).abs() < EPS);
    }

    #[test]
    fn test_transpose_consistency() {
        let a: Vec<&[f32]> = vec![&[1.0, 0.0], &[0.6, 0.8]];
        let b: Vec<&[f32]> = vec![&[0.0, 1.0], &[0.8, 0.6], &[1.0, 0.0]];
        let forward = similarity_matrix(&a, &b);
        let backward = similarity_matrix(&b, &a);
        let transposed = transpose(&forward);
        assert_eq!(transposed.len(), backward.len());
        for (r1, r2) in transposed.iter().zip(&backward) {
            for (x, y) in r1.iter().zip(r2) {
                assert!((x - y).abs() < EPS);
            }
        }
        let direct = bidirectional_mean_max(&forward, &backward).unwrap();
        let via_transpose = bidirectional_mean_max(&forward, &transposed).unwrap();
        assert!((direct - via_transpose).abs() < EPS);
    }

    #[test]
    fn test_score_pair_asymmetric_sizes() {
        let sentences_i = vec!["short".to_string()];
        let sentences_j = vec!["long one".to_string(), "long two".to_string()];
        let emb_i: Vec<&[f32]> = vec![&[1.0, 0.0]];
        let emb_j: Vec<&[f32]> = vec![&[1.0, 0.0], &[0.0, 1.0]];

        let result = score_pair(
            PairSide { summary_index: 0, sentences: &sentences_i, embeddings: &emb_i },
            PairSide { summary_index: 1, sentences: &sentences_j, embeddings: &emb_j },
            4,
        );

        // I->J: the single sentence matches perfectly; J->I: one of two matches
        assert_eq!(result.mean_max_i_to_j, Some(1.0));
        assert_eq!(result.mean_max_j_to_i, Some(0.5));
        assert_eq!(result.similarity, 0.75);
        assert_eq!(result.similarity_matrix, vec![vec![1.0, 0.0]]);
        assert_eq!(result.similarity_matrix_j_to_i, Some(vec![vec![1.0], vec![0.0]]));
        assert_eq!(result.max_values_j_to_i, Some(vec![1.0, 0.0]));
        assert_eq!(result.sentence_count_2, 2);
    }

    #[test]
    fn test_score_pair_degrades_on_missing_embeddings() {
        let sentences = vec!["문장".to_string()];
        let emb: Vec<&[f32]> = vec![&[1.0, 0.0]];
        let result = score_pair(
            PairSide { summary_index: 0, sentences: &sentences, embeddings: &emb },
            PairSide { summary_index: 2, sentences: &[], embeddings: &[] },
            4,
        );
        assert_eq!(result.similarity, 0.0);
        assert!(result.similarity_matrix.is_empty());
        assert!(result.mean_max_i_to_j.is_none());
        assert_eq!(result.summary_index_2, 2);
        assert_eq!(result.sentence_count_1, 1);
    }

    #[test]
    fn test_scores_rounded_to_precision() {
        let sentences = vec!["a".to_string()];
        let emb_i: Vec<&[f32]> = vec![&[1.0, 2.0, 3.0]];
        let emb_j: Vec<&[f32]> = vec![&[3.0, 1.0, 2.0]];
        let result = score_pair(
            PairSide { summary_index: 0, sentences: &sentences, embeddings: &emb_i },
            PairSide { summary_index: 1, sentences: &sentences, embeddings: &emb_j },
            4,
        );
        // 11 / 14
        assert_eq!(result.similarity, 0.7857);
        assert_eq!(result.similarity_matrix, vec![vec![0.7857]]);
    }

    #[test]
    fn test_score_pair_matches_bidirectional_mean_max() {
        let sentences_i = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let sentences_j = vec!["d".to_string(), "e".to_string()];
        let emb_i: Vec<&[f32]> = vec![&[0.9, 0.1, 0.3], &[0.2, 0.8, 0.1], &[0.4, 0.4, 0.7]];
        let emb_j: Vec<&[f32]> = vec![&[0.7, 0.3, 0.2], &[0.1, 0.2, 0.9]];

        let result = score_pair(
            PairSide { summary_index: 0, sentences: &sentences_i, embeddings: &emb_i },
            PairSide { summary_index: 1, sentences: &sentences_j, embeddings: &emb_j },
            4,
        );

        let matrix = similarity_matrix(&emb_i, &emb_j);
        let transposed = transpose(&matrix);
        let expected = bidirectional_mean_max(&matrix, &transposed).unwrap();
        assert_eq!(result.similarity, round_to(expected, 4));
        assert_eq!(result.mean_max_i_to_j, Some(round_to(mean_max(&matrix).unwrap(), 4)));
        assert_eq!(result.mean_max_j_to_i, Some(round_to(mean_max(&transposed).unwrap(), 4)));
    }
}
