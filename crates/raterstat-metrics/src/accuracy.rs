//! Per-annotator accuracy against the reference set.
//!
//! The table is pivoted to one response per `(annotator, item)`, keeping the
//! first occurrence in ingestion order, then joined with the reference labels
//! by image id. Only boolean answers to referenced items are comparable;
//! `Undecided` and `Corrupted_Image` responses and unreferenced items count
//! neither as a match nor as a mismatch.

use std::collections::BTreeMap;

use raterstat_core::{AnnotationTable, ReferenceSet, Response};
use serde::Serialize;
use tracing::warn;

use crate::MetricError;

/// One response per `(annotator, item)`; the first one seen wins.
pub struct ResponsePivot<'a> {
    cells: BTreeMap<&'a str, BTreeMap<&'a str, Response>>,
}

impl<'a> ResponsePivot<'a> {
    pub fn from_table(table: &'a AnnotationTable) -> Self {
        let mut cells: BTreeMap<&str, BTreeMap<&str, Response>> = BTreeMap::new();
        for row in table {
            cells
                .entry(row.annotator_id.as_str())
                .or_default()
                .entry(row.image_id.as_str())
                .or_insert(row.response);
        }
        Self { cells }
    }

    /// Annotators in id order.
    pub fn annotators(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.cells.keys().copied()
    }

    /// An annotator's responses in image-id order.
    pub fn responses(&self, annotator_id: &str) -> impl Iterator<Item = (&'a str, Response)> + '_ {
        self.cells
            .get(annotator_id)
            .into_iter()
            .flat_map(|row| row.iter().map(|(&image, &r)| (image, r)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub annotator_id: String,
    pub matched: usize,
    pub unmatched: usize,
    /// Comparable responses, `matched + unmatched`.
    pub total: usize,
    /// All of the annotator's rows, duplicates and uncomparable ones included.
    pub responses: usize,
    /// `matched / total`; `None` when nothing was comparable.
    pub proficiency: Option<f64>,
}

impl AccuracySummary {
    pub fn require_proficiency(&self) -> Result<f64, MetricError> {
        self.proficiency
            .ok_or_else(|| MetricError::NoComparableResponses(self.annotator_id.clone()))
    }
}

/// Accuracy summary for every annotator, sorted by annotator id.
pub fn accuracy_by_annotator(
    table: &AnnotationTable,
    reference: &ReferenceSet,
) -> Vec<AccuracySummary> {
    let mut rows: BTreeMap<&str, usize> = BTreeMap::new();
    for row in table {
        *rows.entry(row.annotator_id.as_str()).or_default() += 1;
    }

    let pivot = ResponsePivot::from_table(table);
    pivot
        .annotators()
        .map(|annotator| {
            let mut matched = 0;
            let mut unmatched = 0;
            for (image, response) in pivot.responses(annotator) {
                let (Some(answer), Some(label)) = (response.as_bool(), reference.label(image))
                else {
                    continue;
                };
                if answer == label {
                    matched += 1;
                } else {
                    unmatched += 1;
                }
            }

            let total = matched + unmatched;
            let summary = AccuracySummary {
                annotator_id: annotator.to_string(),
                matched,
                unmatched,
                total,
                responses: rows.get(annotator).copied().unwrap_or(0),
                proficiency: (total > 0).then(|| matched as f64 / total as f64),
            };
            if let Err(e) = summary.require_proficiency() {
                warn!(annotator, error = %e, "proficiency undefined");
            }
            summary
        })
        .collect()
}
