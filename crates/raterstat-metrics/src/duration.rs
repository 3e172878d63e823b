//! Annotation time statistics.

use raterstat_core::AnnotationTable;
use serde::Serialize;

use crate::MetricError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Min, max, and mean of `duration_ms` over every row.
pub fn duration_stats(table: &AnnotationTable) -> Result<DurationStats, MetricError> {
    if table.is_empty() {
        return Err(MetricError::EmptyTable);
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for (i, row) in table.iter().enumerate() {
        if !row.duration_ms.is_finite() || row.duration_ms < 0.0 {
            return Err(MetricError::InvalidDuration { row: i });
        }
        min = min.min(row.duration_ms);
        max = max.max(row.duration_ms);
        sum += row.duration_ms;
    }
    let count = table.len();
    // Summation rounding can push the mean just past an extreme.
    let mean = (sum / count as f64).clamp(min, max);

    Ok(DurationStats {
        count,
        min,
        max,
        mean,
    })
}
