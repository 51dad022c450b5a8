//! Result types for batch runs.

use crate::error::ImageError;
use crate::pipeline::synthesis::FlashcardCandidate;
use serde::{Deserialize, Serialize};

/// Outcome for one input of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    /// Position of the input in the caller's list (0-indexed).
    pub index: usize,
    /// The path or URL as given.
    pub source: String,
    /// Generated cards; empty on failure.
    pub cards: Vec<FlashcardCandidate>,
    /// Wall-clock time from input resolution to the final decode.
    pub duration_ms: u64,
    pub error: Option<ImageError>,
}

impl ImageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counts for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_inputs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_cards: usize,
    pub total_duration_ms: u64,
}

impl BatchStats {
    /// Tally `results`; `total_duration_ms` is left for the caller.
    pub fn from_results(results: &[ImageResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            total_inputs: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            total_cards: results.iter().map(|r| r.cards.len()).sum(),
            total_duration_ms: 0,
        }
    }
}

/// Every result of a batch, in input order, plus totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<ImageResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// All cards from successful inputs, in input order.
    pub fn cards(&self) -> impl Iterator<Item = &FlashcardCandidate> {
        self.results.iter().flat_map(|r| r.cards.iter())
    }

    /// `true` when there was at least one input and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.stats.total_inputs > 0 && self.stats.succeeded == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn ok(index: usize, n: usize) -> ImageResult {
        ImageResult {
            index,
            source: format!("img{index}.jpg"),
            cards: (0..n)
                .map(|i| FlashcardCandidate::new(format!("Q{i}"), format!("A{i}")))
                .collect(),
            duration_ms: 10,
            error: None,
        }
    }

    fn failed(index: usize) -> ImageResult {
        ImageResult {
            index,
            source: format!("img{index}.jpg"),
            cards: Vec::new(),
            duration_ms: 5,
            error: Some(ImageError::Pipeline(PipelineError::Cancelled)),
        }
    }

    #[test]
    fn stats_tally() {
        let results = vec![ok(0, 2), failed(1), ok(2, 3)];
        let stats = BatchStats::from_results(&results);
        assert_eq!(stats.total_inputs, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_cards, 5);
    }

    #[test]
    fn all_failed_needs_inputs() {
        let empty = BatchOutput {
            results: vec![],
            stats: BatchStats::default(),
        };
        assert!(!empty.all_failed());

        let results = vec![failed(0)];
        let out = BatchOutput {
            stats: BatchStats::from_results(&results),
            results,
        };
        assert!(out.all_failed());
    }

    #[test]
    fn serialises_error_variant() {
        let json = serde_json::to_string(&failed(0)).unwrap();
        assert!(json.contains("Cancelled"), "got: {json}");
    }
}
