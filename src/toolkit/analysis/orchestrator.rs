use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::batching::{BatchFailurePolicy, embed_in_batches};
use super::models::{AnalysisError, AnalysisResult, Diagnostics};
use super::positions::SentenceTable;
use crate::core::config::AnalysisConfig;
use crate::llm::concepts::{ConceptExtractor, RelationVerifier};
use crate::llm::embeddings::EmbeddingProvider;
use crate::llm::factory::ExternalServices;
use crate::toolkit::concept_graph::{ConceptGraphBuilder, ConceptRegistry, CooccurrenceIndex};
use crate::toolkit::similarity::{PairResult, PairSide, score_pair};

/// Runs one full analysis: sentence similarity for every summary pair plus the
/// concept graph.
pub struct SimilarityAnalyzer {
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn ConceptExtractor>,
    graph_builder: ConceptGraphBuilder,
    config: AnalysisConfig,
}

impl SimilarityAnalyzer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: Arc<dyn ConceptExtractor>,
        verifier: Arc<dyn RelationVerifier>,
        config: AnalysisConfig,
    ) -> Self {
        info!(
            "SimilarityAnalyzer initialized: embedding_model={}, batch_size={}, top_k={}",
            embedder.model_name(),
            config.batch_size,
            config.top_k
        );

        Self {
            embedder,
            extractor,
            graph_builder: ConceptGraphBuilder::new(verifier, config.clone()),
            config,
        }
    }

    pub fn from_services(services: &ExternalServices, config: AnalysisConfig) -> Self {
        let embedder: Arc<dyn EmbeddingProvider> = services.embeddings.clone();
        let extractor: Arc<dyn ConceptExtractor> = services.concepts.clone();
        let verifier: Arc<dyn RelationVerifier> = services.concepts.clone();
        Self::new(embedder, extractor, verifier, config)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn analyze(&self, summaries: &[String]) -> Result<AnalysisResult, AnalysisError> {
        let analysis_id = Uuid::new_v4();
        let span = info_span!("analysis", id = %analysis_id);
        self.run(analysis_id, summaries).instrument(span).await
    }

    async fn run(&self, analysis_id: Uuid, summaries: &[String]) -> Result<AnalysisResult, AnalysisError> {
        let usable = summaries.iter().filter(|s| !s.trim().is_empty()).count();
        if usable < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "At least 2 non-empty summaries are required (got {})",
                usable
            )));
        }

        let table = SentenceTable::build(summaries);
        if table.is_empty() {
            return Err(AnalysisError::InvalidInput("No analyzable content".to_string()));
        }
        info!(
            "Analyzing {} summaries ({} usable), {} sentences",
            summaries.len(),
            usable,
            table.len()
        );

        let sentence_embeddings = embed_in_batches(
            self.embedder.as_ref(),
            &table.texts(),
            self.config.batch_size,
            BatchFailurePolicy::AbortOnFirstBatch,
        )
        .await
        .map_err(|e| AnalysisError::ProviderFatal(e.to_string()))?;

        let results = self.score_all_pairs(&table, &sentence_embeddings.vectors);

        let (concepts_by_summary, extraction_failures) = self.extract_all(summaries).await;
        let registry = ConceptRegistry::from_extractions(&concepts_by_summary);
        let concept_embeddings = embed_in_batches(
            self.embedder.as_ref(),
            &registry.labels(),
            self.config.batch_size,
            BatchFailurePolicy::Degrade,
        )
        .await
        .map_err(|e| AnalysisError::Internal(e.to_string()))?;

        let cooccurrence = CooccurrenceIndex::build(&registry, &table);
        let (concept_graph, graph_stats) = self
            .graph_builder
            .build(&registry, &concept_embeddings.vectors, &cooccurrence)
            .await;

        let diagnostics = Diagnostics {
            analysis_id,
            generated_at: Utc::now(),
            sentence_count: table.len(),
            missing_sentence_embeddings: sentence_embeddings.missing(),
            embedding_mismatches: sentence_embeddings.mismatches + concept_embeddings.mismatches,
            embedding_dimension_mismatches: sentence_embeddings.dimension_mismatches
                + concept_embeddings.dimension_mismatches,
            failed_embedding_batches: sentence_embeddings.failed_batches + concept_embeddings.failed_batches,
            extraction_failures,
            concept_count: registry.len(),
            graph: graph_stats,
            node_count: concept_graph.nodes.len(),
            edge_count: concept_graph.edges.len(),
        };

        info!(
            "Analysis complete: {} pairs, {} concepts, {} edges",
            results.len(),
            diagnostics.concept_count,
            diagnostics.edge_count
        );

        Ok(AnalysisResult {
            results,
            total_summaries: summaries.len(),
            concept_graph,
            concepts_by_summary,
            diagnostics,
        })
    }

    fn score_all_pairs(&self, table: &SentenceTable, vectors: &[Option<Vec<f32>>]) -> Vec<PairResult> {
        let per_summary: Vec<(Vec<String>, Vec<&[f32]>)> = (0..table.summary_count())
            .map(|s| {
                let embedded = table
                    .range_of(s)
                    .filter_map(|pos| vectors.get(pos).and_then(|v| v.as_deref()))
                    .collect();
                (table.sentences_of(s), embedded)
            })
            .collect();

        let mut results = Vec::new();
        for i in 0..per_summary.len() {
            for j in (i + 1)..per_summary.len() {
                let (sentences_i, embeddings_i) = &per_summary[i];
                let (sentences_j, embeddings_j) = &per_summary[j];
                results.push(score_pair(
                    PairSide {
                        summary_index: i,
                        sentences: sentences_i,
                        embeddings: embeddings_i,
                    },
                    PairSide {
                        summary_index: j,
                        sentences: sentences_j,
                        embeddings: embeddings_j,
                    },
                    self.config.report_precision,
                ));
            }
        }
        results
    }

    /// Concepts per summary, in input order. Blank summaries are not sent.
    async fn extract_all(&self, summaries: &[String]) -> (Vec<Vec<String>>, usize) {
        let calls = summaries.iter().enumerate().map(|(idx, summary)| async move {
            if summary.trim().is_empty() {
                return (Vec::new(), false);
            }
            match self.extractor.extract_concepts(summary).await {
                Ok(concepts) => {
                    debug!("Summary {}: {} concepts", idx, concepts.len());
                    (concepts, false)
                }
                Err(e) => {
                    warn!("Concept extraction failed for summary {}: {}", idx, e);
                    (Vec::new(), true)
                }
            }
        });

        let outcomes = join_all(calls).await;
        let failures = outcomes.iter().filter(|(_, failed)| *failed).count();
        (outcomes.into_iter().map(|(concepts, _)| concepts).collect(), failures)
    }
}
