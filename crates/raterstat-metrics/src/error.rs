use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    #[error("annotation table is empty")]
    EmptyTable,

    #[error("agreement is undefined: {0}")]
    DegenerateMatrix(&'static str),

    #[error("annotator {0} has no responses comparable with the reference set")]
    NoComparableResponses(String),

    #[error("row {row} has a negative or non-finite duration")]
    InvalidDuration { row: usize },

    #[error("items have between {min} and {max} raters; strict Fleiss' kappa needs a constant count")]
    UnequalRaterCounts { min: usize, max: usize },
}
