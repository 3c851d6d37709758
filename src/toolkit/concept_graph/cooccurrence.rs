use std::collections::BTreeSet;

use super::registry::ConceptRegistry;
use crate::toolkit::analysis::positions::SentenceTable;

/// For every concept, the `(summary, sentence)` positions whose text contains
/// the concept as a case-insensitive substring.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceIndex {
    positions: Vec<BTreeSet<(usize, usize)>>,
}

impl CooccurrenceIndex {
    pub fn build(registry: &ConceptRegistry, sentences: &SentenceTable) -> Self {
        let lowered: Vec<(usize, usize, String)> = sentences
            .records()
            .iter()
            .map(|r| (r.summary_index, r.sentence_index, r.text.to_lowercase()))
            .collect();

        let positions = registry
            .entries()
            .iter()
            .map(|entry| {
                let needle = entry.label.to_lowercase();
                lowered
                    .iter()
                    .filter(|(_, _, text)| !needle.is_empty() && text.contains(&needle))
                    .map(|(s, n, _)| (*s, *n))
                    .collect()
            })
            .collect();

        Self { positions }
    }

    pub fn positions_of(&self, concept: usize) -> Option<&BTreeSet<(usize, usize)>> {
        self.positions.get(concept)
    }

    /// Number of sentences containing both concepts.
    pub fn count(&self, a: usize, b: usize) -> usize {
        match (self.positions.get(a), self.positions.get(b)) {
            (Some(pa), Some(pb)) => pa.intersection(pb).count(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_substring_positions() {
        let table = SentenceTable::build(&[
            "Ocean Plastic is rising. Fishing gear adds ocean plastic.".to_string(),
            "Fishing gear is lost at sea.".to_string(),
        ]);
        let registry = ConceptRegistry::from_extractions(&[
            vec!["ocean plastic".to_string(), "fishing gear".to_string()],
            vec!["sea".to_string()],
        ]);
        let index = CooccurrenceIndex::build(&registry, &table);

        assert_eq!(
            index.positions_of(0).unwrap(),
            &BTreeSet::from([(0, 0), (0, 1)])
        );
        assert_eq!(
            index.positions_of(1).unwrap(),
            &BTreeSet::from([(0, 1), (1, 0)])
        );
        assert_eq!(index.count(0, 1), 1);
        assert_eq!(index.count(1, 2), 1);
        assert_eq!(index.count(0, 2), 0);
        assert_eq!(index.count(0, 99), 0);
    }
}
