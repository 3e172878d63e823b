//! Class balance of the reference set.

use raterstat_core::ReferenceSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceBalance {
    /// Entries labelled `true`.
    pub positive: usize,
    /// Entries labelled `false`.
    pub negative: usize,
    /// Share of positive entries, `None` for an empty set.
    pub positive_share: Option<f64>,
    /// Positive-to-negative ratio, `None` when there are no negatives.
    pub ratio: Option<f64>,
}

impl ReferenceBalance {
    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

pub fn reference_balance(reference: &ReferenceSet) -> ReferenceBalance {
    let total = reference.len();
    let positive = reference.entries().iter().filter(|e| e.is_bicycle).count();
    let negative = total - positive;
    ReferenceBalance {
        positive,
        negative,
        positive_share: (total > 0).then(|| positive as f64 / total as f64),
        ratio: (negative > 0).then(|| positive as f64 / negative as f64),
    }
}
