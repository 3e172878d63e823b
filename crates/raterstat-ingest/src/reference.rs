//! Ground-truth reference set loading.
//!
//! The reference document is a JSON object keyed by item id, one single-label
//! object per item:
//!
//! ```json
//! { "img_0001": { "is_bicycle": true }, "img_0002": { "is_bicycle": false } }
//! ```
//!
//! A bare boolean per item is accepted as the same thing. Repeated keys are
//! an error; JSON parsers would otherwise keep only the last one.

use std::fmt;
use std::path::Path;

use raterstat_core::{ReferenceEntry, ReferenceSet};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use serde_json::error::Category;
use tracing::info;

use crate::IngestError;
use crate::path::kind;

/// Parse a reference document. `label_key` names the boolean in each entry.
pub fn parse_reference(json: &str, label_key: &str) -> Result<ReferenceSet, IngestError> {
    let RawEntries(raw) = serde_json::from_str::<RawEntries>(json).map_err(|e| match e.classify() {
        Category::Data => IngestError::MalformedReference(e.to_string()),
        _ => IngestError::Json(e),
    })?;

    let mut entries = Vec::with_capacity(raw.len());
    for (image_id, value) in raw {
        let is_bicycle = match &value {
            Value::Bool(b) => *b,
            Value::Object(obj) => match obj.get(label_key) {
                Some(Value::Bool(b)) => *b,
                Some(other) => {
                    return Err(IngestError::MalformedReference(format!(
                        "{image_id:?}: {label_key} is a {}, not a boolean",
                        kind(other)
                    )));
                }
                None => {
                    return Err(IngestError::MalformedReference(format!(
                        "{image_id:?}: missing {label_key}"
                    )));
                }
            },
            other => {
                return Err(IngestError::MalformedReference(format!(
                    "{image_id:?}: expected an object, found {}",
                    kind(other)
                )));
            }
        };
        entries.push(ReferenceEntry {
            image_id,
            is_bicycle,
        });
    }

    ReferenceSet::try_from_entries(entries)
        .map_err(|dup| IngestError::MalformedReference(dup.to_string()))
}

/// Read and parse a reference file.
pub fn load_reference(path: &Path, label_key: &str) -> Result<ReferenceSet, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let set = parse_reference(&text, label_key)?;
    info!(count = set.len(), path = %path.display(), "loaded reference set");
    Ok(set)
}

/// Object entries in document order, duplicates included.
struct RawEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by image id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawEntries, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    out.push((key, value));
                }
                Ok(RawEntries(out))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_and_sorts() {
        let set = parse_reference(
            r#"{"img3": {"is_bicycle": false}, "img1": {"is_bicycle": true}, "img2": {"is_bicycle": true}}"#,
            "is_bicycle",
        )
        .unwrap();
        let ids: Vec<&str> = set.entries().iter().map(|e| e.image_id.as_str()).collect();
        assert_eq!(ids, ["img1", "img2", "img3"]);
        assert_eq!(set.label("img3"), Some(false));
    }

    #[test]
    fn extra_fields_ignored_and_bare_booleans_accepted() {
        let set = parse_reference(
            r#"{"a": {"is_bicycle": true, "note": "x"}, "b": false}"#,
            "is_bicycle",
        )
        .unwrap();
        assert_eq!(set.label("a"), Some(true));
        assert_eq!(set.label("b"), Some(false));
    }

    #[test]
    fn custom_label_key() {
        let set = parse_reference(r#"{"a": {"is_cat": true}}"#, "is_cat").unwrap();
        assert_eq!(set.label("a"), Some(true));
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = parse_reference(
            r#"{"a": {"is_bicycle": true}, "a": {"is_bicycle": false}}"#,
            "is_bicycle",
        )
        .unwrap_err();
        match err {
            IngestError::MalformedReference(msg) => assert!(msg.contains("duplicate")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schema_mismatch_is_malformed() {
        for doc in [
            r#"[{"is_bicycle": true}]"#,
            r#"{"a": {"is_bicycle": "yes"}}"#,
            r#"{"a": {}}"#,
            r#"{"a": 1}"#,
        ] {
            assert!(
                matches!(
                    parse_reference(doc, "is_bicycle"),
                    Err(IngestError::MalformedReference(_))
                ),
                "{doc}"
            );
        }
    }

    #[test]
    fn syntax_error_is_json_error() {
        assert!(matches!(
            parse_reference("{\"a\": ", "is_bicycle"),
            Err(IngestError::Json(_))
        ));
    }

    #[test]
    fn empty_object_is_empty_set() {
        assert!(parse_reference("{}", "is_bicycle").unwrap().is_empty());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"img1": {{"is_bicycle": true}}}}"#).unwrap();
        let set = load_reference(file.path(), "is_bicycle").unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn load_missing_file_errors() {
        let err = load_reference(Path::new("/nonexistent/references.json"), "is_bicycle").unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }
}
