//! Rendering of analysis results: human-readable text or JSON.
//!
//! Text output is grouped into sections; per-annotator results are printed as
//! Arrow pretty tables. A metric that failed prints its reason in place of
//! its values.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{DateTime, Utc};
use raterstat_core::ReferenceSet;
use raterstat_ingest::{Normalized, RejectedRecord};
use raterstat_metrics::{
    AccuracySummary, AnalysisReport, AnnotatorCount, CategoryCount, UncertainCount,
};
use serde::Serialize;

/// Everything a reporter may show about one run.
pub struct Run<'a> {
    pub export: &'a Path,
    pub reference_path: &'a Path,
    pub normalized: &'a Normalized,
    pub reference: &'a ReferenceSet,
    pub report: &'a AnalysisReport,
    pub generated_at: DateTime<Utc>,
}

pub trait Reporter {
    fn render(&self, run: &Run<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub struct JsonReporter;

#[derive(Serialize)]
struct JsonDocument<'a> {
    generated_at: DateTime<Utc>,
    export: &'a Path,
    reference: &'a Path,
    reference_entries: usize,
    rejected: &'a [RejectedRecord],
    #[serde(flatten)]
    report: &'a AnalysisReport,
}

impl Reporter for JsonReporter {
    fn render(&self, run: &Run<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let doc = JsonDocument {
            generated_at: run.generated_at,
            export: run.export,
            reference: run.reference_path,
            reference_entries: run.reference.len(),
            rejected: &run.normalized.rejected,
            report: run.report,
        };
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        writeln!(out)?;
        Ok(())
    }
}

pub struct TextReporter {
    /// Canonical rows to print before the metrics; 0 for none.
    pub preview: usize,
}

impl Reporter for TextReporter {
    fn render(&self, run: &Run<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let report = run.report;
        let table = &run.normalized.table;

        writeln!(out, "=== raterstat report ===")?;
        writeln!(out, "{}", run.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out)?;

        writeln!(out, "Annotation Table")?;
        field(out, "export", run.export.display())?;
        field(out, "rows", report.rows)?;
        field(out, "rejected", run.normalized.rejected.len())?;
        field(out, "annotators", report.annotator_count)?;
        for r in &run.normalized.rejected {
            writeln!(out, "    #{} {} / {}: {}", r.index, r.image_id, r.annotator_id, r.reason)?;
        }
        writeln!(out)?;

        if self.preview > 0 && !table.is_empty() {
            let batch = table.to_record_batch()?;
            let head = batch.slice(0, self.preview.min(batch.num_rows()));
            writeln!(out, "Preview")?;
            writeln!(out, "{}", pretty_format_batches(&[head])?)?;
            writeln!(out)?;
        }

        writeln!(out, "Annotation Duration (ms)")?;
        match &report.durations {
            Ok(d) => {
                field(out, "min", format!("{:.1}", d.min))?;
                field(out, "max", format!("{:.1}", d.max))?;
                field(out, "mean", format!("{:.1}", d.mean))?;
            }
            Err(e) => failed(out, "duration stats", e)?,
        }
        writeln!(out)?;

        writeln!(out, "Responses per Annotator")?;
        writeln!(out, "{}", pretty_format_batches(&[counts_batch(&report.response_counts)?])?)?;
        writeln!(out)?;

        writeln!(out, "Response Categories")?;
        print_categories(out, &report.category_totals)?;
        writeln!(out)?;

        writeln!(out, "Cant Solve / Corrupt Data by Annotator")?;
        if report.uncertain_responses.is_empty() {
            writeln!(out, "  (none)")?;
        } else {
            writeln!(
                out,
                "{}",
                pretty_format_batches(&[uncertain_batch(&report.uncertain_responses)?])?
            )?;
        }
        writeln!(out)?;

        writeln!(out, "Inter-Annotator Agreement")?;
        match &report.agreement {
            Ok(a) => {
                field(out, "fleiss kappa", format!("{:.3} ({})", a.kappa, a.band.as_str()))?;
                field(out, "items scored", a.items)?;
                if a.skipped_items > 0 {
                    field(out, "items skipped", a.skipped_items)?;
                }
                field(out, "raters per item", format!("{}-{}", a.raters_min, a.raters_max))?;
            }
            Err(e) => failed(out, "inter-annotator agreement", e)?,
        }
        writeln!(out)?;

        writeln!(out, "Reference Balance")?;
        let b = &report.reference_balance;
        field(out, "true", b.positive)?;
        field(out, "false", b.negative)?;
        if let Some(share) = b.positive_share {
            field(out, "true share", format!("{:.1}%", share * 100.0))?;
        }
        if let Some(ratio) = b.ratio {
            field(out, "true:false ratio", format!("{ratio:.3}"))?;
        }
        writeln!(out)?;

        writeln!(out, "Accuracy against Reference")?;
        if report.accuracy.is_empty() {
            writeln!(out, "  (no annotators)")?;
        } else {
            writeln!(out, "{}", pretty_format_batches(&[accuracy_batch(&report.accuracy)?])?)?;
        }

        Ok(())
    }
}

// ── Section helpers ──

fn field(out: &mut dyn Write, name: &str, value: impl std::fmt::Display) -> std::io::Result<()> {
    writeln!(out, "  {name:<26} {value}")
}

fn failed(out: &mut dyn Write, metric: &str, error: &impl std::fmt::Display) -> std::io::Result<()> {
    writeln!(out, "  {metric}: failed: {error}")
}

fn print_categories(out: &mut dyn Write, totals: &[CategoryCount]) -> std::io::Result<()> {
    let all: usize = totals.iter().map(|c| c.count).sum();
    for c in totals {
        let share = if all > 0 {
            c.count as f64 / all as f64 * 100.0
        } else {
            0.0
        };
        field(out, c.response.label(), format!("{} ({share:.1}%)", c.count))?;
    }
    Ok(())
}

// ── Arrow tables ──

fn counts_batch(counts: &[AnnotatorCount]) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_from_iter(vec![
        (
            "annotator_id",
            Arc::new(StringArray::from_iter_values(
                counts.iter().map(|c| c.annotator_id.as_str()),
            )) as ArrayRef,
        ),
        (
            "responses",
            Arc::new(UInt64Array::from_iter_values(
                counts.iter().map(|c| c.responses as u64),
            )) as ArrayRef,
        ),
    ])
}

fn uncertain_batch(counts: &[UncertainCount]) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_from_iter(vec![
        (
            "annotator_id",
            Arc::new(StringArray::from_iter_values(
                counts.iter().map(|c| c.annotator_id.as_str()),
            )) as ArrayRef,
        ),
        (
            "cant_solve",
            Arc::new(UInt64Array::from_iter_values(
                counts.iter().map(|c| c.undecided as u64),
            )) as ArrayRef,
        ),
        (
            "corrupt_data",
            Arc::new(UInt64Array::from_iter_values(
                counts.iter().map(|c| c.corrupted as u64),
            )) as ArrayRef,
        ),
    ])
}

fn accuracy_batch(rows: &[AccuracySummary]) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_from_iter(vec![
        (
            "annotator_id",
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.annotator_id.as_str()),
            )) as ArrayRef,
        ),
        (
            "matched",
            Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.matched as u64)))
                as ArrayRef,
        ),
        (
            "unmatched",
            Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.unmatched as u64)))
                as ArrayRef,
        ),
        (
            "total",
            Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.total as u64)))
                as ArrayRef,
        ),
        (
            "responses",
            Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.responses as u64)))
                as ArrayRef,
        ),
        (
            "proficiency",
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.proficiency).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
    ])
}
