//! Ingestion: flatten the annotation export and load the reference set.

mod error;
mod extract;
mod normalize;
mod path;
mod reference;

pub use error::IngestError;
pub use extract::{ExtractedRecord, RawRecord, extract_records, read_export};
pub use normalize::{Normalized, RejectedRecord, normalize_records};
pub use path::{RecordPath, Segment, lookup};
pub use reference::{load_reference, parse_reference};

use std::path::Path;

use raterstat_core::PipelineConfig;
use serde_json::Value;
use tracing::info;

/// Extract and normalise an already-parsed export.
pub fn annotations_from_value(
    export: &Value,
    config: &PipelineConfig,
) -> Result<Normalized, IngestError> {
    let path: RecordPath = config.record_path.parse()?;
    let records = extract_records(export, &path)?;
    info!(records = records.len(), path = %path, "extracted task records");

    let normalized = normalize_records(&records, &config.fields)?;
    info!(
        rows = normalized.table.len(),
        rejected = normalized.rejected.len(),
        "normalized annotation table"
    );
    Ok(normalized)
}

/// Read an export file and build the canonical annotation table.
pub fn load_annotations(path: &Path, config: &PipelineConfig) -> Result<Normalized, IngestError> {
    let export = read_export(path)?;
    annotations_from_value(&export, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raterstat_core::Response;
    use serde_json::json;
    use std::io::Write;

    fn task(url: &str, user: &str, answer: &str, duration: i64) -> Value {
        json!({
            "task_input": {"image_url": url},
            "task_output": {
                "answer": answer,
                "cant_solve": false,
                "corrupt_data": false,
                "duration_ms": duration
            },
            "user": {"vendor_user_id": user}
        })
    }

    #[test]
    fn end_to_end_from_file() {
        let export = json!({
            "results": {"root_node": {"results": {
                "n1": {"results": [
                    task("https://cdn/x/img1.jpg", "A1", "yes", 100),
                    task("https://cdn/x/img2.jpg", "A1", "no", 200)
                ]},
                "n2": {"results": [
                    task("https://cdn/x/img1.jpg", "A2", "yes", -1)
                ]}
            }}}
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{export}").unwrap();

        let out = load_annotations(file.path(), &PipelineConfig::default()).unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].index, 2);
        assert_eq!(out.table.records()[1].response, Response::Answer(false));
    }

    #[test]
    fn malformed_record_located_in_export() {
        let mut bad = task("https://cdn/x/img3.jpg", "A3", "yes", 10);
        bad["task_output"]["answer"] = Value::Null;
        let export = json!({
            "results": {"root_node": {"results": {
                "n1": {"results": [task("https://cdn/x/img1.jpg", "A1", "yes", 100)]},
                "n2": {"results": [bad]}
            }}}
        });
        let err = annotations_from_value(&export, &PipelineConfig::default()).unwrap_err();
        match err {
            IngestError::MalformedExport { location, .. } => assert_eq!(
                location,
                "$.results.root_node.results.n2.results[0].task_output.answer"
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_record_path_in_config() {
        let config = PipelineConfig {
            record_path: "results..x".into(),
            ..PipelineConfig::default()
        };
        let err = annotations_from_value(&json!({}), &config).unwrap_err();
        assert!(matches!(err, IngestError::InvalidRecordPath { .. }));
    }
}
