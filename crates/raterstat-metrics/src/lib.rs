//! Annotation-quality metrics over the canonical annotation and reference tables.
//!
//! Every metric is a pure function of its input tables. [`analyze`] runs them
//! all and keeps each outcome separately, so one failing metric does not hide
//! the rest.

mod accuracy;
mod agreement;
mod balance;
mod counts;
mod duration;
mod error;
mod report;

pub use accuracy::{AccuracySummary, ResponsePivot, accuracy_by_annotator};
pub use agreement::{
    AgreementBand, AgreementMatrix, AgreementScore, fleiss_kappa, inter_annotator_agreement,
};
pub use balance::{ReferenceBalance, reference_balance};
pub use counts::{
    AnnotatorCount, CategoryCount, UncertainCount, annotator_count, category_totals,
    response_counts, uncertain_responses,
};
pub use duration::{DurationStats, duration_stats};
pub use error::MetricError;
pub use report::{AnalysisOptions, AnalysisReport, analyze};
