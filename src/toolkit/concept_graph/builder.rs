use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::cooccurrence::CooccurrenceIndex;
use super::models::{CandidateEdge, ConceptGraph, GraphStats};
use super::refinement::refine_edges;
use super::registry::ConceptRegistry;
use crate::core::config::AnalysisConfig;
use crate::llm::concepts::RelationVerifier;
use crate::toolkit::similarity::cosine_similarity;

/// Phase 1: hybrid candidate edges, directed, grouped by source concept.
///
/// `embeddings[c]` is `None` for concepts the provider could not embed; such
/// concepts stay in the graph as isolated nodes.
pub fn build_candidate_edges(
    registry: &ConceptRegistry,
    embeddings: &[Option<Vec<f32>>],
    cooccurrence: &CooccurrenceIndex,
    config: &AnalysisConfig,
) -> Vec<CandidateEdge> {
    let mut edges = Vec::new();

    for source in 0..registry.len() {
        let Some(Some(source_vec)) = embeddings.get(source) else {
            continue;
        };

        let mut candidates: Vec<(f64, CandidateEdge)> = Vec::new();
        for target in 0..registry.len() {
            if target == source {
                continue;
            }
            let Some(Some(target_vec)) = embeddings.get(target) else {
                continue;
            };

            let similarity = match cosine_similarity(source_vec, target_vec) {
                Ok(s) if s.is_finite() && s > 0.0 => s,
                _ => continue,
            };

            let cooccurrence_count = cooccurrence.count(source, target);
            let cooccurrence_score =
                (cooccurrence_count as f64 * config.cooccurrence_step).min(config.cooccurrence_cap);
            let combined_score = similarity + cooccurrence_score;
            let same_summary = registry.share_summary(source, target);
            let rank = combined_score + if same_summary { config.same_summary_bonus } else { 0.0 };

            candidates.push((
                rank,
                CandidateEdge {
                    source,
                    target,
                    similarity,
                    cooccurrence_count,
                    combined_score,
                    weight: combined_score.max(config.edge_weight_floor),
                    same_summary,
                    needs_refinement: !same_summary && config.in_refinement_band(similarity),
                    llm_verified: false,
                },
            ));
        }

        // stable: ties keep target order
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        let (same, other): (Vec<_>, Vec<_>) =
            candidates.into_iter().map(|(_, e)| e).partition(|e| e.same_summary);
        let remaining = config.top_k.saturating_sub(same.len());

        debug!(
            "Concept {} ({}): {} same-summary, {} of {} other candidates kept",
            source,
            crate::safe_truncate(registry.label(source), 30),
            same.len(),
            remaining.min(other.len()),
            other.len()
        );

        edges.extend(same);
        edges.extend(other.into_iter().take(remaining));
    }

    edges
}

/// Collapse `i -> j` and `j -> i` into one edge, keeping first-seen order.
///
/// Every edge attribute is symmetric in its endpoints, so the merge loses nothing.
pub fn symmetrize(edges: Vec<CandidateEdge>) -> Vec<CandidateEdge> {
    let mut seen = HashSet::with_capacity(edges.len());
    edges.into_iter().filter(|edge| seen.insert(edge.key())).collect()
}

/// Two-phase concept graph construction.
pub struct ConceptGraphBuilder {
    verifier: Arc<dyn RelationVerifier>,
    config: AnalysisConfig,
}

impl ConceptGraphBuilder {
    pub fn new(verifier: Arc<dyn RelationVerifier>, config: AnalysisConfig) -> Self {
        Self { verifier, config }
    }

    pub async fn build(
        &self,
        registry: &ConceptRegistry,
        embeddings: &[Option<Vec<f32>>],
        cooccurrence: &CooccurrenceIndex,
    ) -> (ConceptGraph, GraphStats) {
        let mut stats = GraphStats {
            concepts_without_embedding: (0..registry.len())
                .filter(|&c| !matches!(embeddings.get(c), Some(Some(_))))
                .count(),
            ..GraphStats::default()
        };

        let directed = build_candidate_edges(registry, embeddings, cooccurrence, &self.config);
        let candidates = symmetrize(directed);
        stats.candidate_edges = candidates.len();

        let (edges, refinement) =
            refine_edges(candidates, registry, self.verifier.as_ref(), &self.config).await;
        stats.flagged_for_refinement = refinement.flagged;
        stats.verified = refinement.verified;
        stats.removed = refinement.removed;
        stats.failed_open = refinement.failed_open;
        stats.unverified_over_cap = refinement.unverified_over_cap;

        info!(
            "Concept graph: {} nodes, {} candidate edges, {} final edges ({} verified, {} removed)",
            registry.len(),
            stats.candidate_edges,
            edges.len(),
            stats.verified,
            stats.removed
        );

        (
            ConceptGraph::assemble(registry, &edges, self.config.report_precision),
            stats,
        )
    }
}
