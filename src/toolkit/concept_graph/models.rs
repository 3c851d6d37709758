use serde::{Deserialize, Serialize};

use super::registry::ConceptRegistry;
use crate::utils::round_to;

/// Concept-pair edge in working form, addressed by registry index.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEdge {
    pub source: usize,
    pub target: usize,
    pub similarity: f64,
    pub cooccurrence_count: usize,
    pub combined_score: f64,
    pub weight: f64,
    pub same_summary: bool,
    pub needs_refinement: bool,
    pub llm_verified: bool,
}

impl CandidateEdge {
    /// Unordered endpoint key.
    pub fn key(&self) -> (usize, usize) {
        if self.source <= self.target {
            (self.source, self.target)
        } else {
            (self.target, self.source)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptNode {
    pub id: String,
    pub label: String,
    pub summary_indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptEdge {
    pub source: String,
    pub target: String,
    pub similarity: f64,
    pub weight: f64,
    pub combined_score: f64,
    pub cooccurrence_count: usize,
    pub summary_indices: Vec<usize>,
    pub same_summary_indices: Vec<usize>,
    pub llm_verified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptGraph {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

impl ConceptGraph {
    pub fn assemble(registry: &ConceptRegistry, edges: &[CandidateEdge], precision: u32) -> Self {
        let nodes = registry
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| ConceptNode {
                id: ConceptRegistry::node_id(idx),
                label: entry.label.clone(),
                summary_indices: entry.summaries.iter().copied().collect(),
            })
            .collect();

        let edges = edges
            .iter()
            .map(|edge| ConceptEdge {
                source: ConceptRegistry::node_id(edge.source),
                target: ConceptRegistry::node_id(edge.target),
                similarity: round_to(edge.similarity, precision),
                weight: round_to(edge.weight, precision),
                combined_score: round_to(edge.combined_score, precision),
                cooccurrence_count: edge.cooccurrence_count,
                summary_indices: registry.union_summaries(edge.source, edge.target),
                same_summary_indices: registry.shared_summaries(edge.source, edge.target),
                llm_verified: edge.llm_verified,
            })
            .collect();

        Self { nodes, edges }
    }
}

/// Counters describing how the graph was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub concepts_without_embedding: usize,
    pub candidate_edges: usize,
    pub flagged_for_refinement: usize,
    pub verified: usize,
    pub removed: usize,
    pub failed_open: usize,
    pub unverified_over_cap: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_uses_node_ids_and_summary_sets() {
        let registry = ConceptRegistry::from_extractions(&[
            vec!["a".to_string(), "b".to_string()],
            vec!["b".to_string()],
        ]);
        let edge = CandidateEdge {
            source: 1,
            target: 0,
            similarity: 0.123456,
            cooccurrence_count: 1,
            combined_score: 0.223456,
            weight: 0.223456,
            same_summary: true,
            needs_refinement: false,
            llm_verified: false,
        };
        assert_eq!(edge.key(), (0, 1));

        let graph = ConceptGraph::assemble(&registry, &[edge], 4);
        assert_eq!(graph.nodes[1].id, "concept_1");
        assert_eq!(graph.nodes[1].summary_indices, vec![0, 1]);

        let json = serde_json::to_value(&graph.edges[0]).unwrap();
        assert_eq!(json["source"], "concept_1");
        assert_eq!(json["target"], "concept_0");
        assert_eq!(json["similarity"], 0.1235);
        assert_eq!(json["combinedScore"], 0.2235);
        assert_eq!(json["cooccurrenceCount"], 1);
        assert_eq!(json["summaryIndices"], serde_json::json!([0, 1]));
        assert_eq!(json["sameSummaryIndices"], serde_json::json!([0]));
        assert_eq!(json["llmVerified"], false);
    }
}
