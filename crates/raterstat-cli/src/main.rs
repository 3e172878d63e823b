mod dump;
mod report;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use raterstat_core::{PipelineConfig, RaterCountPolicy};
use raterstat_metrics::{AnalysisOptions, analyze};
use tracing::info;

use crate::report::{JsonReporter, Reporter, Run, TextReporter};

/// Annotation-quality statistics for a crowd-annotation export.
#[derive(Debug, Parser)]
#[command(name = "raterstat", version)]
struct Cli {
    /// Annotation export (JSON).
    #[arg(long, env = "RATERSTAT_EXPORT")]
    export: PathBuf,

    /// Reference labels (JSON object keyed by image id).
    #[arg(long, env = "RATERSTAT_REFERENCE")]
    reference: PathBuf,

    /// Pipeline configuration (JSON). Defaults suit the bicycle export.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Fail the agreement metric when items have different rater counts.
    #[arg(long)]
    strict_raters: bool,

    /// Print the first N rows of the canonical table.
    #[arg(long, default_value_t = 0)]
    preview: usize,

    /// Write the canonical table to an Arrow IPC file.
    #[arg(long)]
    dump_table: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    info!("raterstat v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if cli.strict_raters {
        config.rater_count_policy = RaterCountPolicy::Strict;
    }

    let normalized = raterstat_ingest::load_annotations(&cli.export, &config)
        .with_context(|| format!("loading annotations from {}", cli.export.display()))?;
    let reference = raterstat_ingest::load_reference(&cli.reference, &config.reference_label_key)
        .with_context(|| format!("loading reference set from {}", cli.reference.display()))?;

    if let Some(path) = &cli.dump_table {
        dump::write_table(&normalized.table, path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), rows = normalized.table.len(), "wrote canonical table");
    }

    let report = analyze(&normalized.table, &reference, AnalysisOptions::from(&config));

    let run = Run {
        export: &cli.export,
        reference_path: &cli.reference,
        normalized: &normalized,
        reference: &reference,
        report: &report,
        generated_at: chrono::Utc::now(),
    };
    let reporter: Box<dyn Reporter> = match cli.format {
        Format::Text => Box::new(TextReporter {
            preview: cli.preview,
        }),
        Format::Json => Box::new(JsonReporter),
    };
    let mut out = std::io::stdout().lock();
    reporter.render(&run, &mut out)?;
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    PipelineConfig::from_json_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))
}
