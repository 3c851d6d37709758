use futures::future::join_all;
use tracing::{debug, info, warn};

use super::models::CandidateEdge;
use super::registry::ConceptRegistry;
use crate::core::config::AnalysisConfig;
use crate::llm::concepts::RelationVerifier;

/// Result of asking the verifier about one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Related,
    Unrelated,
    /// The call failed; the edge is kept as it was.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefinementStats {
    pub flagged: usize,
    pub verified: usize,
    pub removed: usize,
    pub failed_open: usize,
    pub unverified_over_cap: usize,
}

/// Positions of the first `cap` edges flagged for refinement.
pub fn select_for_refinement(edges: &[CandidateEdge], cap: usize) -> Vec<usize> {
    edges
        .iter()
        .enumerate()
        .filter(|(_, e)| e.needs_refinement)
        .map(|(i, _)| i)
        .take(cap)
        .collect()
}

/// Apply verifier outcomes to the edges at the given positions.
///
/// Unrelated edges are dropped, related ones boosted and marked verified.
/// Edges without an outcome pass through untouched.
pub fn apply_verdicts(
    edges: Vec<CandidateEdge>,
    outcomes: &[(usize, VerificationOutcome)],
    config: &AnalysisConfig,
) -> (Vec<CandidateEdge>, RefinementStats) {
    let mut slots: Vec<Option<VerificationOutcome>> = vec![None; edges.len()];
    for &(position, outcome) in outcomes {
        if let Some(slot) = slots.get_mut(position) {
            *slot = Some(outcome);
        }
    }

    let mut stats = RefinementStats {
        flagged: edges.iter().filter(|e| e.needs_refinement).count(),
        ..RefinementStats::default()
    };

    let mut kept = Vec::with_capacity(edges.len());
    for (mut edge, outcome) in edges.into_iter().zip(slots) {
        match outcome {
            Some(VerificationOutcome::Unrelated) => {
                stats.removed += 1;
                continue;
            }
            Some(VerificationOutcome::Related) => {
                edge.weight = (edge.weight * config.verified_boost).min(config.verified_weight_cap);
                edge.llm_verified = true;
                stats.verified += 1;
            }
            Some(VerificationOutcome::Failed) => stats.failed_open += 1,
            None if edge.needs_refinement => stats.unverified_over_cap += 1,
            None => {}
        }
        kept.push(edge);
    }

    (kept, stats)
}

/// Phase 2: verify the capped set of ambiguous edges concurrently.
pub async fn refine_edges(
    edges: Vec<CandidateEdge>,
    registry: &ConceptRegistry,
    verifier: &dyn RelationVerifier,
    config: &AnalysisConfig,
) -> (Vec<CandidateEdge>, RefinementStats) {
    let selected = select_for_refinement(&edges, config.refinement_cap);
    if selected.is_empty() {
        return apply_verdicts(edges, &[], config);
    }

    info!(
        "Verifying {} ambiguous concept edges (cap {})",
        selected.len(),
        config.refinement_cap
    );

    let calls = selected.iter().map(|&position| {
        let edge = &edges[position];
        let (a, b) = (registry.label(edge.source), registry.label(edge.target));
        async move {
            let outcome = match verifier.verify_relation(a, b).await {
                Ok(verdict) if verdict.related => VerificationOutcome::Related,
                Ok(verdict) => {
                    debug!("Dropping edge {} - {}: {}", a, b, verdict.reason);
                    VerificationOutcome::Unrelated
                }
                Err(e) => {
                    warn!("Relation check failed for {} - {}, keeping edge: {}", a, b, e);
                    VerificationOutcome::Failed
                }
            };
            (position, outcome)
        }
    });
    let outcomes = join_all(calls).await;

    let (kept, stats) = apply_verdicts(edges, &outcomes, config);
    info!(
        "Refinement: {} flagged, {} verified, {} removed, {} failed open, {} over cap",
        stats.flagged, stats.verified, stats.removed, stats.failed_open, stats.unverified_over_cap
    );
    (kept, stats)
}
