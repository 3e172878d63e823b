//! Arrow schema definitions for the canonical tables.

use std::sync::Arc;

use arrow::array::{Array, BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use thiserror::Error;

use crate::record::{AnnotationRecord, AnnotationTable, ReferenceSet, Response};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("missing column: {0}")]
    MissingColumn(&'static str),

    #[error("column {column} has type {found}, expected {expected}")]
    UnexpectedType {
        column: &'static str,
        found: DataType,
        expected: DataType,
    },

    #[error("null {column} at row {row}")]
    NullValue { column: &'static str, row: usize },

    #[error("unknown response {label:?} at row {row}")]
    UnknownResponse { label: String, row: usize },

    #[error("duration_ms {value} at row {row} is negative or not finite")]
    InvalidDuration { value: f64, row: usize },
}

/// Schema for the canonical annotation table, one row per response.
pub fn annotation_table_schema() -> Schema {
    Schema::new(vec![
        Field::new("image_id", DataType::Utf8, false),
        Field::new("annotator_id", DataType::Utf8, false),
        Field::new("response", DataType::Utf8, false),
        Field::new("duration_ms", DataType::Float64, false),
    ])
}

/// Schema for the reference (ground-truth) table.
pub fn reference_schema() -> Schema {
    Schema::new(vec![
        Field::new("image_id", DataType::Utf8, false),
        Field::new("is_bicycle", DataType::Boolean, false),
    ])
}

impl AnnotationTable {
    pub fn to_record_batch(&self) -> Result<RecordBatch, TableError> {
        let rows = self.records();
        let image_ids = StringArray::from_iter_values(rows.iter().map(|r| r.image_id.as_str()));
        let annotators =
            StringArray::from_iter_values(rows.iter().map(|r| r.annotator_id.as_str()));
        let responses = StringArray::from_iter_values(rows.iter().map(|r| r.response.label()));
        let durations = Float64Array::from_iter_values(rows.iter().map(|r| r.duration_ms));

        Ok(RecordBatch::try_new(
            Arc::new(annotation_table_schema()),
            vec![
                Arc::new(image_ids),
                Arc::new(annotators),
                Arc::new(responses),
                Arc::new(durations),
            ],
        )?)
    }

    /// Rebuild a table from a batch with the [`annotation_table_schema`] columns.
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self, TableError> {
        let image_ids = utf8_column(batch, "image_id")?;
        let annotators = utf8_column(batch, "annotator_id")?;
        let responses = utf8_column(batch, "response")?;
        let durations = batch
            .column_by_name("duration_ms")
            .ok_or(TableError::MissingColumn("duration_ms"))?;
        let durations = durations
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| TableError::UnexpectedType {
                column: "duration_ms",
                found: durations.data_type().clone(),
                expected: DataType::Float64,
            })?;

        let mut records = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let label = non_null_str(responses, "response", row)?;
            let response = Response::from_label(label).ok_or_else(|| {
                TableError::UnknownResponse {
                    label: label.to_string(),
                    row,
                }
            })?;
            if durations.is_null(row) {
                return Err(TableError::NullValue {
                    column: "duration_ms",
                    row,
                });
            }
            let duration_ms = durations.value(row);
            if !duration_ms.is_finite() || duration_ms < 0.0 {
                return Err(TableError::InvalidDuration {
                    value: duration_ms,
                    row,
                });
            }
            records.push(AnnotationRecord {
                image_id: non_null_str(image_ids, "image_id", row)?.to_string(),
                annotator_id: non_null_str(annotators, "annotator_id", row)?.to_string(),
                response,
                duration_ms,
            });
        }
        Ok(Self::from_records(records))
    }
}

impl ReferenceSet {
    pub fn to_record_batch(&self) -> Result<RecordBatch, TableError> {
        let entries = self.entries();
        let ids = StringArray::from_iter_values(entries.iter().map(|e| e.image_id.as_str()));
        let labels: BooleanArray = entries.iter().map(|e| Some(e.is_bicycle)).collect();

        Ok(RecordBatch::try_new(
            Arc::new(reference_schema()),
            vec![Arc::new(ids), Arc::new(labels)],
        )?)
    }
}

fn utf8_column<'a>(batch: &'a RecordBatch, name: &'static str) -> Result<&'a StringArray, TableError> {
    let col = batch
        .column_by_name(name)
        .ok_or(TableError::MissingColumn(name))?;
    col.as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| TableError::UnexpectedType {
            column: name,
            found: col.data_type().clone(),
            expected: DataType::Utf8,
        })
}

fn non_null_str<'a>(
    arr: &'a StringArray,
    column: &'static str,
    row: usize,
) -> Result<&'a str, TableError> {
    if arr.is_null(row) {
        return Err(TableError::NullValue { column, row });
    }
    Ok(arr.value(row))
}
