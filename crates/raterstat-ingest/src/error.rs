use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed export at {location}: {reason}")]
    MalformedExport { location: String, reason: String },

    #[error("malformed reference set: {0}")]
    MalformedReference(String),

    #[error("invalid record path {path:?}: {reason}")]
    InvalidRecordPath { path: String, reason: &'static str },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    pub(crate) fn malformed_export(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedExport {
            location: location.into(),
            reason: reason.into(),
        }
    }
}
