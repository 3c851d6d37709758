use tracing::{debug, error, warn};

use crate::llm::embeddings::{EmbeddingError, EmbeddingProvider};

/// What a failed sub-batch means for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFailurePolicy {
    /// A failing first sub-batch means the provider is down; abort.
    AbortOnFirstBatch,
    /// Every failure only blanks the affected slots.
    Degrade,
}

/// Embeddings aligned 1:1 with the input texts.
#[derive(Debug, Clone, Default)]
pub struct BatchedEmbeddings {
    pub vectors: Vec<Option<Vec<f32>>>,
    pub mismatches: usize,
    pub failed_batches: usize,
    /// Vectors dropped because their dimension differs from the run's first vector.
    pub dimension_mismatches: usize,
}

impl BatchedEmbeddings {
    pub fn missing(&self) -> usize {
        self.vectors.iter().filter(|v| v.is_none()).count()
    }
}

/// Embed `texts` in sequential sub-batches of `batch_size`, preserving order.
///
/// A sub-batch that returns the wrong number of vectors is logged as an
/// integrity mismatch; its returned prefix is kept and the rest left empty.
/// All kept vectors share the dimension of the first one returned; a vector
/// of another dimension (e.g. from a fallback model) is dropped and counted.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    policy: BatchFailurePolicy,
) -> Result<BatchedEmbeddings, EmbeddingError> {
    let mut out = BatchedEmbeddings {
        vectors: Vec::with_capacity(texts.len()),
        ..BatchedEmbeddings::default()
    };

    let mut dimension: Option<usize> = None;

    for (batch_no, chunk) in texts.chunks(batch_size.max(1)).enumerate() {
        debug!(
            "Embedding batch {} ({} texts) with {}",
            batch_no,
            chunk.len(),
            provider.model_name()
        );

        match provider.embed(chunk).await {
            Ok(vectors) => {
                if vectors.len() != chunk.len() {
                    error!(
                        "Embedding count mismatch in batch {}: expected {}, got {}",
                        batch_no,
                        chunk.len(),
                        vectors.len()
                    );
                    out.mismatches += 1;
                }
                let returned = vectors.len().min(chunk.len());
                let mut dropped = 0;
                for vector in vectors.into_iter().take(chunk.len()) {
                    let expected = *dimension.get_or_insert(vector.len());
                    if vector.len() == expected {
                        out.vectors.push(Some(vector));
                    } else {
                        dropped += 1;
                        out.vectors.push(None);
                    }
                }
                if dropped > 0 {
                    error!(
                        "Embedding dimension mismatch in batch {}: {} vectors differ from {} dims",
                        batch_no,
                        dropped,
                        dimension.unwrap_or_default()
                    );
                    out.dimension_mismatches += dropped;
                }
                out.vectors.extend(std::iter::repeat_n(None, chunk.len() - returned));
            }
            Err(e) if batch_no == 0 && policy == BatchFailurePolicy::AbortOnFirstBatch => {
                return Err(e);
            }
            Err(e) => {
                warn!("Embedding batch {} failed, {} texts left without vectors: {}", batch_no, chunk.len(), e);
                out.failed_batches += 1;
                out.vectors.extend(std::iter::repeat_n(None, chunk.len()));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Vector `[len, call]`; call number `fail_on` errors, `short_on` drops the last vector.
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_on: Option<usize>,
        short_on: Option<usize>,
    }

    impl CountingEmbedder {
        fn new(fail_on: Option<usize>, short_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
                short_on,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(call) {
                return Err(EmbeddingError::InvalidResponse("model not loaded".to_string()));
            }
            let mut vectors: Vec<Vec<f32>> = batch
                .iter()
                .map(|t| vec![t.len() as f32, call as f32])
                .collect();
            if self.short_on == Some(call) {
                vectors.pop();
            }
            Ok(vectors)
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| "x".repeat(i + 1)).collect()
    }

    #[tokio::test]
    async fn test_sub_batches_preserve_order() {
        let embedder = CountingEmbedder::new(None, None);
        let out = embed_in_batches(&embedder, &texts(70), 32, BatchFailurePolicy::AbortOnFirstBatch)
            .await
            .unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out.vectors.len(), 70);
        assert_eq!(out.vectors[0], Some(vec![1.0, 0.0]));
        assert_eq!(out.vectors[32], Some(vec![33.0, 1.0]));
        assert_eq!(out.vectors[69], Some(vec![70.0, 2.0]));
        assert_eq!(out.missing(), 0);
    }

    #[tokio::test]
    async fn test_first_batch_failure_aborts() {
        let embedder = CountingEmbedder::new(Some(0), None);
        let result = embed_in_batches(&embedder, &texts(5), 32, BatchFailurePolicy::AbortOnFirstBatch).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_later_failure_degrades() {
        let embedder = CountingEmbedder::new(Some(1), None);
        let out = embed_in_batches(&embedder, &texts(40), 32, BatchFailurePolicy::AbortOnFirstBatch)
            .await
            .unwrap();
        assert_eq!(out.vectors.len(), 40);
        assert_eq!(out.missing(), 8);
        assert_eq!(out.failed_batches, 1);
        assert!(out.vectors[31].is_some());
        assert!(out.vectors[32].is_none());
    }

    #[tokio::test]
    async fn test_degrade_policy_never_aborts() {
        let embedder = CountingEmbedder::new(Some(0), None);
        let out = embed_in_batches(&embedder, &texts(3), 32, BatchFailurePolicy::Degrade)
            .await
            .unwrap();
        assert_eq!(out.vectors, vec![None, None, None]);
    }

    #[tokio::test]
    async fn test_count_mismatch_keeps_alignment() {
        let embedder = CountingEmbedder::new(None, Some(0));
        let out = embed_in_batches(&embedder, &texts(34), 32, BatchFailurePolicy::AbortOnFirstBatch)
            .await
            .unwrap();

        assert_eq!(out.mismatches, 1);
        assert_eq!(out.vectors.len(), 34);
        assert!(out.vectors[30].is_some());
        assert!(out.vectors[31].is_none());
        assert_eq!(out.vectors[32], Some(vec![33.0, 1.0]));
    }

    /// Sub-batches after the first come back from a smaller model.
    struct SwitchingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for SwitchingEmbedder {
        async fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let dims = if call == 0 { 3 } else { 2 };
            Ok(batch.iter().map(|_| vec![1.0; dims]).collect())
        }

        fn model_name(&self) -> &str {
            "switching"
        }
    }

    #[tokio::test]
    async fn test_dimension_change_is_dropped_and_counted() {
        let embedder = SwitchingEmbedder { calls: AtomicUsize::new(0) };
        let out = embed_in_batches(&embedder, &texts(40), 32, BatchFailurePolicy::AbortOnFirstBatch)
            .await
            .unwrap();

        assert_eq!(out.vectors.len(), 40);
        assert_eq!(out.dimension_mismatches, 8);
        assert_eq!(out.missing(), 8);
        assert_eq!(out.mismatches, 0);
        assert!(out.vectors[..32].iter().all(|v| v.as_ref().map(Vec::len) == Some(3)));
    }
}
