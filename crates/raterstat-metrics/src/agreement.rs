//! Inter-annotator agreement (Fleiss' kappa).
//!
//! The annotation table is first counted into an [`AgreementMatrix`]: one row
//! per item, one column per [`Response`] category, each cell the number of
//! raters who chose that category for that item. An annotator who answered
//! an item more than once counts once, with their first response.
//!
//! # Rater counts
//!
//! Fleiss' kappa assumes every item was rated by the same number of raters.
//! Crowd exports rarely guarantee that. Under
//! [`RaterCountPolicy::Generalized`] each item's observed agreement is
//! computed against its own rater count and items with a single rater are
//! skipped; with a constant count this reduces to the textbook statistic.
//! [`RaterCountPolicy::Strict`] refuses to score a matrix with varying counts.

use std::collections::{BTreeMap, HashSet};

use raterstat_core::{AnnotationTable, RaterCountPolicy, Response};
use serde::Serialize;
use tracing::{debug, warn};

use crate::MetricError;

const CATEGORY_COUNT: usize = Response::CATEGORIES.len();

/// Item × category rating counts, rows sorted by image id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgreementMatrix {
    rows: Vec<(String, [usize; CATEGORY_COUNT])>,
}

impl AgreementMatrix {
    pub fn from_table(table: &AnnotationTable) -> Self {
        let mut counts: BTreeMap<&str, [usize; CATEGORY_COUNT]> = BTreeMap::new();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        for row in table {
            if !seen.insert((row.image_id.as_str(), row.annotator_id.as_str())) {
                continue;
            }
            counts.entry(row.image_id.as_str()).or_default()[row.response.category_index()] += 1;
        }
        Self {
            rows: counts
                .into_iter()
                .map(|(id, c)| (id.to_string(), c))
                .collect(),
        }
    }

    /// Build from pre-counted rows. Columns follow [`Response::CATEGORIES`].
    pub fn from_counts(rows: Vec<(String, [usize; CATEGORY_COUNT])>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[usize; CATEGORY_COUNT])> {
        self.rows.iter().map(|(id, c)| (id.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column sums.
    pub fn category_totals(&self) -> [usize; CATEGORY_COUNT] {
        let mut totals = [0; CATEGORY_COUNT];
        for (_, counts) in &self.rows {
            for (t, c) in totals.iter_mut().zip(counts) {
                *t += c;
            }
        }
        totals
    }
}

/// Conventional reading of a kappa value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementBand {
    Poor,
    Slight,
    Fair,
    Moderate,
    Substantial,
    AlmostPerfect,
}

impl AgreementBand {
    pub fn from_kappa(kappa: f64) -> Self {
        match kappa {
            k if k < 0.0 => Self::Poor,
            k if k <= 0.20 => Self::Slight,
            k if k <= 0.40 => Self::Fair,
            k if k <= 0.60 => Self::Moderate,
            k if k <= 0.80 => Self::Substantial,
            _ => Self::AlmostPerfect,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Slight => "slight",
            Self::Fair => "fair",
            Self::Moderate => "moderate",
            Self::Substantial => "substantial",
            Self::AlmostPerfect => "almost perfect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgreementScore {
    pub kappa: f64,
    pub band: AgreementBand,
    /// Items that contributed to the score.
    pub items: usize,
    /// Items skipped for having fewer than two raters.
    pub skipped_items: usize,
    pub raters_min: usize,
    pub raters_max: usize,
}

/// Agreement among all annotators over the whole table.
pub fn inter_annotator_agreement(
    table: &AnnotationTable,
    policy: RaterCountPolicy,
) -> Result<AgreementScore, MetricError> {
    if table.is_empty() {
        return Err(MetricError::EmptyTable);
    }
    fleiss_kappa(&AgreementMatrix::from_table(table), policy)
}

pub fn fleiss_kappa(
    matrix: &AgreementMatrix,
    policy: RaterCountPolicy,
) -> Result<AgreementScore, MetricError> {
    let used_categories = matrix.category_totals().iter().filter(|&&t| t > 0).count();
    if used_categories < 2 {
        return Err(MetricError::DegenerateMatrix(
            "fewer than two response categories in use",
        ));
    }

    let raters: Vec<usize> = matrix.rows().map(|(_, c)| c.iter().sum()).collect();
    let raters_min = raters.iter().copied().min().unwrap_or(0);
    let raters_max = raters.iter().copied().max().unwrap_or(0);
    if raters_min != raters_max {
        if policy == RaterCountPolicy::Strict {
            return Err(MetricError::UnequalRaterCounts {
                min: raters_min,
                max: raters_max,
            });
        }
        warn!(raters_min, raters_max, "items have varying rater counts");
    }

    let mut totals = [0usize; CATEGORY_COUNT];
    let mut agreement_sum = 0.0;
    let mut items = 0usize;
    for ((_, counts), &n) in matrix.rows().zip(&raters) {
        if n < 2 {
            continue;
        }
        let squares: usize = counts.iter().map(|c| c * c).sum();
        agreement_sum += (squares - n) as f64 / (n * (n - 1)) as f64;
        for (t, c) in totals.iter_mut().zip(counts) {
            *t += c;
        }
        items += 1;
    }
    if items == 0 {
        return Err(MetricError::DegenerateMatrix(
            "no item has at least two raters",
        ));
    }

    let ratings: usize = totals.iter().sum();
    let observed = agreement_sum / items as f64;
    let expected: f64 = totals
        .iter()
        .map(|&t| {
            let p = t as f64 / ratings as f64;
            p * p
        })
        .sum();
    if 1.0 - expected <= f64::EPSILON {
        return Err(MetricError::DegenerateMatrix(
            "fewer than two response categories among multiply-rated items",
        ));
    }

    let kappa = (observed - expected) / (1.0 - expected);
    debug!(observed, expected, kappa, items, "fleiss kappa");

    Ok(AgreementScore {
        kappa,
        band: AgreementBand::from_kappa(kappa),
        items,
        skipped_items: matrix.len() - items,
        raters_min,
        raters_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use raterstat_core::AnnotationRecord;

    const T: Response = Response::Answer(true);
    const F: Response = Response::Answer(false);

    fn record(image: &str, annotator: &str, response: Response) -> AnnotationRecord {
        AnnotationRecord {
            image_id: image.into(),
            annotator_id: annotator.into(),
            response,
            duration_ms: 1.0,
        }
    }

    fn matrix(rows: &[[usize; 4]]) -> AgreementMatrix {
        AgreementMatrix::from_counts(
            rows.iter()
                .enumerate()
                .map(|(i, c)| (format!("img{i}"), *c))
                .collect(),
        )
    }

    #[test]
    fn matrix_counts_per_item() {
        let table: AnnotationTable = vec![
            record("b", "A1", T),
            record("a", "A1", F),
            record("a", "A2", F),
            record("a", "A3", Response::Undecided),
        ]
        .into_iter()
        .collect();
        let m = AgreementMatrix::from_table(&table);
        let rows: Vec<(&str, [usize; 4])> = m.rows().map(|(id, c)| (id, *c)).collect();
        assert_eq!(rows, [("a", [0, 2, 1, 0]), ("b", [1, 0, 0, 0])]);
        assert_eq!(m.category_totals(), [1, 2, 1, 0]);
    }

    #[test]
    fn repeated_rater_counts_once() {
        let table: AnnotationTable = vec![
            record("img1", "A1", T),
            record("img1", "A1", F),
            record("img1", "A2", T),
        ]
        .into_iter()
        .collect();
        let m = AgreementMatrix::from_table(&table);
        let rows: Vec<(&str, [usize; 4])> = m.rows().map(|(id, c)| (id, *c)).collect();
        assert_eq!(rows, [("img1", [2, 0, 0, 0])]);
    }

    #[test]
    fn perfect_agreement_is_one() {
        let m = matrix(&[[3, 0, 0, 0], [0, 3, 0, 0], [0, 0, 3, 0], [3, 0, 0, 0]]);
        let score = fleiss_kappa(&m, RaterCountPolicy::Strict).unwrap();
        assert!((score.kappa - 1.0).abs() < 1e-12);
        assert_eq!(score.band, AgreementBand::AlmostPerfect);
        assert_eq!(score.items, 4);
    }

    #[test]
    fn hand_computed_value() {
        // P̄ = 7/9, P_e = 41/81, kappa = 22/40.
        let m = matrix(&[[3, 0, 0, 0], [0, 3, 0, 0], [2, 1, 0, 0]]);
        let score = fleiss_kappa(&m, RaterCountPolicy::Strict).unwrap();
        assert!((score.kappa - 0.55).abs() < 1e-12, "{}", score.kappa);
        assert_eq!(score.band, AgreementBand::Moderate);
    }

    #[test]
    fn random_assignment_is_near_zero() {
        // Deterministic LCG; 400 items x 10 raters, four categories.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut rows = Vec::new();
        for _ in 0..400 {
            let mut counts = [0usize; 4];
            for _ in 0..10 {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                counts[((state >> 33) % 4) as usize] += 1;
            }
            rows.push(counts);
        }
        let score = fleiss_kappa(&matrix(&rows), RaterCountPolicy::Strict).unwrap();
        assert!(score.kappa.abs() < 0.05, "{}", score.kappa);
    }

    #[test]
    fn single_category_is_degenerate() {
        let m = matrix(&[[2, 0, 0, 0], [3, 0, 0, 0]]);
        assert!(matches!(
            fleiss_kappa(&m, RaterCountPolicy::Generalized),
            Err(MetricError::DegenerateMatrix(_))
        ));
    }

    #[test]
    fn strict_rejects_varying_raters() {
        let m = matrix(&[[2, 0, 0, 0], [0, 3, 0, 0], [1, 0, 0, 0]]);
        assert_eq!(
            fleiss_kappa(&m, RaterCountPolicy::Strict),
            Err(MetricError::UnequalRaterCounts { min: 1, max: 3 })
        );
    }

    #[test]
    fn generalized_skips_single_rater_items() {
        let m = matrix(&[[2, 0, 0, 0], [0, 3, 0, 0], [1, 0, 0, 0]]);
        let score = fleiss_kappa(&m, RaterCountPolicy::Generalized).unwrap();
        assert!((score.kappa - 1.0).abs() < 1e-12);
        assert_eq!(score.items, 2);
        assert_eq!(score.skipped_items, 1);
        assert_eq!((score.raters_min, score.raters_max), (1, 3));
    }

    #[test]
    fn only_single_rater_items_is_degenerate() {
        let m = matrix(&[[1, 0, 0, 0], [0, 1, 0, 0]]);
        assert_eq!(
            fleiss_kappa(&m, RaterCountPolicy::Generalized),
            Err(MetricError::DegenerateMatrix("no item has at least two raters"))
        );
    }

    #[test]
    fn empty_table_fails() {
        assert_eq!(
            inter_annotator_agreement(&AnnotationTable::default(), RaterCountPolicy::Generalized),
            Err(MetricError::EmptyTable)
        );
    }

    #[test]
    fn bands() {
        assert_eq!(AgreementBand::from_kappa(-0.1), AgreementBand::Poor);
        assert_eq!(AgreementBand::from_kappa(0.0), AgreementBand::Slight);
        assert_eq!(AgreementBand::from_kappa(0.20), AgreementBand::Slight);
        assert_eq!(AgreementBand::from_kappa(0.35), AgreementBand::Fair);
        assert_eq!(AgreementBand::from_kappa(0.5), AgreementBand::Moderate);
        assert_eq!(AgreementBand::from_kappa(0.61), AgreementBand::Substantial);
        assert_eq!(AgreementBand::from_kappa(0.95), AgreementBand::AlmostPerfect);
    }
}
