use serde::Serialize;

use crate::core::services::segmentation::segment;

/// One sentence and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceRecord {
    pub summary_index: usize,
    pub sentence_index: usize,
    pub text: String,
}

/// Positional mapping from the flat embedding batch back to summaries.
///
/// Records are stored in batch order: summary by summary, sentence by sentence.
/// Blank summaries keep their slot and simply own no records.
#[derive(Debug, Clone, Default)]
pub struct SentenceTable {
    records: Vec<SentenceRecord>,
    /// `ranges[s]` is the slice of `records` owned by summary `s`.
    ranges: Vec<std::ops::Range<usize>>,
}

impl SentenceTable {
    pub fn build(summaries: &[String]) -> Self {
        let mut records = Vec::new();
        let mut ranges = Vec::with_capacity(summaries.len());

        for (summary_index, summary) in summaries.iter().enumerate() {
            let start = records.len();
            for (sentence_index, text) in segment(summary).into_iter().enumerate() {
                records.push(SentenceRecord {
                    summary_index,
                    sentence_index,
                    text,
                });
            }
            ranges.push(start..records.len());
        }

        Self { records, ranges }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn records(&self) -> &[SentenceRecord] {
        &self.records
    }

    /// Texts in batch order, ready for the embedding provider.
    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.text.clone()).collect()
    }

    /// Batch positions owned by one summary.
    pub fn range_of(&self, summary_index: usize) -> std::ops::Range<usize> {
        self.ranges.get(summary_index).cloned().unwrap_or(0..0)
    }

    pub fn sentences_of(&self, summary_index: usize) -> Vec<String> {
        self.records[self.range_of(summary_index)]
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }
}
