//! Response throughput per annotator and per category.

use std::collections::{BTreeMap, BTreeSet};

use raterstat_core::{AnnotationTable, Response};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatorCount {
    pub annotator_id: String,
    pub responses: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub response: Response,
    pub count: usize,
}

/// How often an annotator fell back to `cant_solve` or `corrupt_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncertainCount {
    pub annotator_id: String,
    pub undecided: usize,
    pub corrupted: usize,
}

impl UncertainCount {
    pub fn total(&self) -> usize {
        self.undecided + self.corrupted
    }
}

/// Number of distinct annotators.
pub fn annotator_count(table: &AnnotationTable) -> usize {
    table
        .iter()
        .map(|r| r.annotator_id.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Responses per annotator, sorted by annotator id.
pub fn response_counts(table: &AnnotationTable) -> Vec<AnnotatorCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in table {
        *counts.entry(row.annotator_id.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(id, responses)| AnnotatorCount {
            annotator_id: id.to_string(),
            responses,
        })
        .collect()
}

/// Row count per response category, in [`Response::CATEGORIES`] order.
pub fn category_totals(table: &AnnotationTable) -> Vec<CategoryCount> {
    let mut totals = [0usize; 4];
    for row in table {
        totals[row.response.category_index()] += 1;
    }
    Response::CATEGORIES
        .into_iter()
        .zip(totals)
        .map(|(response, count)| CategoryCount { response, count })
        .collect()
}

/// Annotators with at least one `Undecided` or `Corrupted_Image` response,
/// most uncertain first (ties by id).
pub fn uncertain_responses(table: &AnnotationTable) -> Vec<UncertainCount> {
    let mut by_annotator: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for row in table.iter().filter(|r| r.response.is_uncertain()) {
        let entry = by_annotator.entry(row.annotator_id.as_str()).or_default();
        match row.response {
            Response::Undecided => entry.0 += 1,
            _ => entry.1 += 1,
        }
    }

    let mut out: Vec<UncertainCount> = by_annotator
        .into_iter()
        .map(|(id, (undecided, corrupted))| UncertainCount {
            annotator_id: id.to_string(),
            undecided,
            corrupted,
        })
        .collect();
    // Stable sort keeps the id order for ties.
    out.sort_by(|a, b| b.total().cmp(&a.total()));
    out
}
