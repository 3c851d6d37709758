//! Weighted concept graph: hybrid candidate edges, then capped LLM verification
//! of the ambiguous ones.

pub mod builder;
pub mod cooccurrence;
pub mod models;
pub mod refinement;
pub mod registry;

pub use builder::{ConceptGraphBuilder, build_candidate_edges, symmetrize};
pub use cooccurrence::CooccurrenceIndex;
pub use models::{CandidateEdge, ConceptEdge, ConceptGraph, ConceptNode, GraphStats};
pub use refinement::{
    RefinementStats, VerificationOutcome, apply_verdicts, refine_edges, select_for_refinement,
};
pub use registry::{ConceptEntry, ConceptRegistry};
