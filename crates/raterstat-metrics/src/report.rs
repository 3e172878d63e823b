//! One-shot analysis over an annotation table and its reference set.

use raterstat_core::{AnnotationTable, PipelineConfig, RaterCountPolicy, ReferenceSet};
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::{
    AccuracySummary, AgreementScore, AnnotatorCount, CategoryCount, DurationStats, MetricError,
    ReferenceBalance, UncertainCount, accuracy_by_annotator, annotator_count, category_totals,
    duration_stats, inter_annotator_agreement, reference_balance, response_counts,
    uncertain_responses,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub rater_count_policy: RaterCountPolicy,
}

impl From<&PipelineConfig> for AnalysisOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            rater_count_policy: config.rater_count_policy,
        }
    }
}

/// Results of every metric. Fallible metrics keep their own error.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub rows: usize,
    pub annotator_count: usize,
    #[serde(serialize_with = "outcome")]
    pub durations: Result<DurationStats, MetricError>,
    pub response_counts: Vec<AnnotatorCount>,
    pub category_totals: Vec<CategoryCount>,
    pub uncertain_responses: Vec<UncertainCount>,
    #[serde(serialize_with = "outcome")]
    pub agreement: Result<AgreementScore, MetricError>,
    pub reference_balance: ReferenceBalance,
    pub accuracy: Vec<AccuracySummary>,
}

impl AnalysisReport {
    /// Failed metrics as `(metric name, error)` pairs.
    pub fn failures(&self) -> Vec<(&'static str, &MetricError)> {
        let mut out = Vec::new();
        if let Err(e) = &self.durations {
            out.push(("duration stats", e));
        }
        if let Err(e) = &self.agreement {
            out.push(("inter-annotator agreement", e));
        }
        out
    }
}

pub fn analyze(
    table: &AnnotationTable,
    reference: &ReferenceSet,
    options: AnalysisOptions,
) -> AnalysisReport {
    let report = AnalysisReport {
        rows: table.len(),
        annotator_count: annotator_count(table),
        durations: duration_stats(table),
        response_counts: response_counts(table),
        category_totals: category_totals(table),
        uncertain_responses: uncertain_responses(table),
        agreement: inter_annotator_agreement(table, options.rater_count_policy),
        reference_balance: reference_balance(reference),
        accuracy: accuracy_by_annotator(table, reference),
    };

    for (metric, error) in report.failures() {
        warn!(metric, %error, "metric failed");
    }
    info!(
        rows = report.rows,
        annotators = report.annotator_count,
        failed = report.failures().len(),
        "analysis complete"
    );
    report
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome<'a, T> {
    Ok(&'a T),
    Error(String),
}

fn outcome<T: Serialize, S: Serializer>(
    value: &Result<T, MetricError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Ok(v) => Outcome::Ok(v),
        Err(e) => Outcome::Error(e.to_string()),
    }
    .serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raterstat_core::{AnnotationRecord, ReferenceEntry, Response};

    fn record(image: &str, annotator: &str, response: Response, ms: f64) -> AnnotationRecord {
        AnnotationRecord {
            image_id: image.into(),
            annotator_id: annotator.into(),
            response,
            duration_ms: ms,
        }
    }

    fn reference() -> ReferenceSet {
        ReferenceSet::try_from_entries(vec![
            ReferenceEntry {
                image_id: "img1".into(),
                is_bicycle: true,
            },
            ReferenceEntry {
                image_id: "img2".into(),
                is_bicycle: false,
            },
        ])
        .unwrap()
    }

    #[test]
    fn full_report() {
        let table: AnnotationTable = vec![
            record("img1", "A1", Response::Answer(true), 100.0),
            record("img2", "A1", Response::Answer(false), 300.0),
            record("img1", "A2", Response::Answer(true), 200.0),
            record("img2", "A2", Response::Answer(true), 400.0),
        ]
        .into_iter()
        .collect();

        let report = analyze(&table, &reference(), AnalysisOptions::default());
        assert!(report.failures().is_empty());
        assert_eq!(report.rows, 4);
        assert_eq!(report.annotator_count, 2);
        assert_eq!(report.durations.as_ref().unwrap().mean, 250.0);
        assert_eq!(report.accuracy[1].proficiency, Some(0.5));
        assert_eq!(report.reference_balance.positive, 1);
        assert!(report.agreement.is_ok());
    }

    #[test]
    fn failures_do_not_hide_other_metrics() {
        let report = analyze(
            &AnnotationTable::default(),
            &reference(),
            AnalysisOptions::default(),
        );
        let failed: Vec<&str> = report.failures().iter().map(|(m, _)| *m).collect();
        assert_eq!(failed, ["duration stats", "inter-annotator agreement"]);
        assert_eq!(report.reference_balance.total(), 2);
        assert!(report.accuracy.is_empty());
    }

    #[test]
    fn json_carries_errors_inline() {
        let table: AnnotationTable = vec![record("img1", "A1", Response::Answer(true), 5.0)]
            .into_iter()
            .collect();
        let report = analyze(&table, &reference(), AnalysisOptions::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["durations"]["ok"]["max"], 5.0);
        assert!(
            json["agreement"]["error"]
                .as_str()
                .unwrap()
                .contains("fewer than two")
        );
        assert_eq!(json["category_totals"][0]["response"], "True");
    }

    #[test]
    fn options_from_config() {
        let config = PipelineConfig {
            rater_count_policy: RaterCountPolicy::Strict,
            ..PipelineConfig::default()
        };
        assert_eq!(
            AnalysisOptions::from(&config).rater_count_policy,
            RaterCountPolicy::Strict
        );
    }
}
