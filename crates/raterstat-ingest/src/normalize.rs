//! Table normalisation: raw export records → canonical annotation table.
//!
//! Each raw record contributes exactly six fields (see [`FieldMap`]); all
//! other fields are ignored. The three response signals collapse into one
//! [`Response`], and the image URL becomes an item id.
//!
//! Records with a missing, negative, or non-finite duration are rejected and
//! reported alongside the table rather than failing the run. Any other
//! problem (no image URL, no annotator, no answer where one is needed) is a
//! hard [`IngestError::MalformedExport`].

use raterstat_core::{AnnotationRecord, AnnotationTable, FieldMap, Response, image_id_from_url};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::IngestError;
use crate::extract::{ExtractedRecord, RawRecord};
use crate::path::{kind, lookup};

/// A record left out of the table because its duration was unusable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    /// Position in the extracted record sequence.
    pub index: usize,
    pub image_id: String,
    pub annotator_id: String,
    pub reason: String,
}

/// Normaliser output. `table.len() + rejected.len()` equals the input count.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub table: AnnotationTable,
    pub rejected: Vec<RejectedRecord>,
}

pub fn normalize_records(
    records: &[ExtractedRecord<'_>],
    fields: &FieldMap,
) -> Result<Normalized, IngestError> {
    let mut rows = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for (index, extracted) in records.iter().enumerate() {
        let raw = RecordView {
            raw: extracted.record,
            location: &extracted.location,
        };

        let url = raw.required_str(&fields.image_url)?;
        let image_id = image_id_from_url(url).ok_or_else(|| {
            raw.malformed(&fields.image_url, format!("no file name in image url {url:?}"))
        })?;
        let annotator_id = raw.required_str(&fields.annotator_id)?.to_string();

        let corrupt_data = raw.flag(&fields.corrupt_data)?;
        let cant_solve = raw.flag(&fields.cant_solve)?;
        // The answer only matters when neither flag overrides it.
        let answer = if corrupt_data || cant_solve {
            None
        } else {
            Some(raw.answer(&fields.answer)?)
        };
        let response = Response::from_signals(answer, cant_solve, corrupt_data)
            .ok_or_else(|| raw.malformed(&fields.answer, "no answer"))?;

        match raw.duration(&fields.duration_ms) {
            Ok(duration_ms) => rows.push(AnnotationRecord {
                image_id,
                annotator_id,
                response,
                duration_ms,
            }),
            Err(reason) => {
                warn!(index, %image_id, %annotator_id, %reason, "rejected record");
                rejected.push(RejectedRecord {
                    index,
                    image_id,
                    annotator_id,
                    reason,
                });
            }
        }
    }

    Ok(Normalized {
        table: AnnotationTable::from_records(rows),
        rejected,
    })
}

/// Field accessors over one raw record, with error locations filled in.
struct RecordView<'a> {
    raw: &'a RawRecord,
    location: &'a str,
}

impl<'a> RecordView<'a> {
    fn get(&self, field: &str) -> Option<&'a Value> {
        let (head, tail) = match field.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (field, None),
        };
        let top = self.raw.get(head)?;
        match tail {
            Some(tail) => lookup(top, tail),
            None => Some(top),
        }
    }

    fn malformed(&self, field: &str, reason: impl Into<String>) -> IngestError {
        IngestError::malformed_export(format!("{}.{field}", self.location), reason)
    }

    fn required_str(&self, field: &str) -> Result<&'a str, IngestError> {
        match self.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
            Some(Value::String(_)) => Err(self.malformed(field, "empty string")),
            None | Some(Value::Null) => Err(self.malformed(field, "missing")),
            Some(other) => Err(self.malformed(field, format!("expected a string, found {}", kind(other)))),
        }
    }

    /// Missing or null flags count as unset.
    fn flag(&self, field: &str) -> Result<bool, IngestError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.malformed(field, format!("expected a boolean, found {}", kind(other)))),
        }
    }

    fn answer(&self, field: &str) -> Result<bool, IngestError> {
        match self.get(field) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" => Ok(true),
                "no" => Ok(false),
                _ => Err(self.malformed(field, format!("unrecognised answer {s:?}"))),
            },
            None | Some(Value::Null) => Err(self.malformed(field, "missing answer")),
            Some(other) => Err(self.malformed(field, format!("expected yes/no, found {}", kind(other)))),
        }
    }

    /// `Err` carries the rejection reason.
    fn duration(&self, field: &str) -> Result<f64, String> {
        let ms = match self.get(field) {
            None | Some(Value::Null) => return Err(format!("missing {field}")),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| format!("{field} is not representable"))?,
            Some(other) => return Err(format!("{field} is a {}, not a number", kind(other))),
        };
        if !ms.is_finite() {
            return Err(format!("{field} is not finite"));
        }
        if ms < 0.0 {
            return Err(format!("negative {field}: {ms}"));
        }
        Ok(ms)
    }
}
