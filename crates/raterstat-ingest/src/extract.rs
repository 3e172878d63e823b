//! Record extraction: flattens the export's task hierarchy into raw records.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::IngestError;
use crate::path::{RecordPath, Segment, kind};

/// One annotation event exactly as it appears in the export.
pub type RawRecord = Map<String, Value>;

/// A raw record and where it sits in the export, e.g.
/// `$.results.root_node.results.n1.results[0]`.
#[derive(Debug, Clone)]
pub struct ExtractedRecord<'a> {
    pub location: String,
    pub record: &'a RawRecord,
}

/// Read and parse an export document.
pub fn read_export(path: &Path) -> Result<Value, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Collect every record found under `path`, in document order.
///
/// Each wildcard level visits object values in the order they appear in the
/// file. Fails if any level along the way is missing or has the wrong type.
pub fn extract_records<'a>(
    export: &'a Value,
    path: &RecordPath,
) -> Result<Vec<ExtractedRecord<'a>>, IngestError> {
    let mut out = Vec::new();
    walk(export, path.segments(), "$", &mut out)?;
    Ok(out)
}

fn walk<'a>(
    value: &'a Value,
    segments: &[Segment],
    location: &str,
    out: &mut Vec<ExtractedRecord<'a>>,
) -> Result<(), IngestError> {
    let Some((segment, rest)) = segments.split_first() else {
        let items = value.as_array().ok_or_else(|| {
            IngestError::malformed_export(
                location,
                format!("expected an array of records, found {}", kind(value)),
            )
        })?;
        for (i, item) in items.iter().enumerate() {
            let location = format!("{location}[{i}]");
            let Some(record) = item.as_object() else {
                return Err(IngestError::malformed_export(
                    location,
                    format!("record is a {}, not an object", kind(item)),
                ));
            };
            out.push(ExtractedRecord { location, record });
        }
        return Ok(());
    };

    let obj = value.as_object().ok_or_else(|| {
        IngestError::malformed_export(location, format!("expected an object, found {}", kind(value)))
    })?;

    match segment {
        Segment::Key(key) => {
            let child = obj
                .get(key)
                .ok_or_else(|| IngestError::malformed_export(location, format!("missing key {key:?}")))?;
            walk(child, rest, &format!("{location}.{key}"), out)
        }
        Segment::Wildcard => {
            for (key, child) in obj {
                let before = out.len();
                walk(child, rest, &format!("{location}.{key}"), out)?;
                debug!(node = %key, records = out.len() - before, "extracted node");
            }
            Ok(())
        }
    }
}
