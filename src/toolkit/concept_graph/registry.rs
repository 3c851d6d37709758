use std::collections::{BTreeSet, HashMap};

/// A deduplicated concept and every summary it was extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptEntry {
    pub label: String,
    pub summaries: BTreeSet<usize>,
}

/// Request-scoped concept set. Identity is exact string equality and ids
/// follow first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct ConceptRegistry {
    entries: Vec<ConceptEntry>,
    by_label: HashMap<String, usize>,
}

impl ConceptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `extractions[s]` holds the concepts extracted from summary `s`.
    pub fn from_extractions(extractions: &[Vec<String>]) -> Self {
        let mut registry = Self::new();
        for (summary_index, concepts) in extractions.iter().enumerate() {
            for concept in concepts {
                registry.insert(concept, summary_index);
            }
        }
        registry
    }

    pub fn insert(&mut self, label: &str, summary_index: usize) -> usize {
        if let Some(&idx) = self.by_label.get(label) {
            self.entries[idx].summaries.insert(summary_index);
            return idx;
        }

        let idx = self.entries.len();
        self.entries.push(ConceptEntry {
            label: label.to_string(),
            summaries: BTreeSet::from([summary_index]),
        });
        self.by_label.insert(label.to_string(), idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ConceptEntry> {
        self.entries.get(idx)
    }

    pub fn entries(&self) -> &[ConceptEntry] {
        &self.entries
    }

    pub fn label(&self, idx: usize) -> &str {
        &self.entries[idx].label
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    pub fn node_id(idx: usize) -> String {
        format!("concept_{}", idx)
    }

    pub fn share_summary(&self, a: usize, b: usize) -> bool {
        !self.entries[a].summaries.is_disjoint(&self.entries[b].summaries)
    }

    pub fn shared_summaries(&self, a: usize, b: usize) -> Vec<usize> {
        self.entries[a]
            .summaries
            .intersection(&self.entries[b].summaries)
            .copied()
            .collect()
    }

    pub fn union_summaries(&self, a: usize, b: usize) -> Vec<usize> {
        self.entries[a]
            .summaries
            .union(&self.entries[b].summaries)
            .copied()
            .collect()
    }
}
