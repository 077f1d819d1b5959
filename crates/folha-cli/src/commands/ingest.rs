//! Ingest command - split, extract and store every page of one or more batches.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use folha_core::{BatchReport, BatchSummary, DocumentClass, PageStatus, Pipeline, StorageOutcome};

use super::{ClassArg, load_config};
use crate::store::DirectoryStore;

/// Arguments for the ingest command.
#[derive(Args)]
pub struct IngestArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Kind of document in the batches
    #[arg(short = 't', long = "type", value_enum, default_value = "holerite")]
    class: ClassArg,

    /// Storage root directory (default: from config)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Replace pages that were already stored
    #[arg(long)]
    overwrite: bool,

    /// Write a per-page summary CSV to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

pub async fn run(args: IngestArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} batches to ingest",
        style("ℹ").blue(),
        files.len()
    );

    let root = args.root.clone().unwrap_or_else(|| config.storage.root.clone());
    let store = DirectoryStore::new(&root).with_overwrite(args.overwrite || config.storage.overwrite);
    let pipeline = Pipeline::new(&config);
    let class = DocumentClass::from(args.class);

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches")?
            .progress_chars("=>-"),
    );

    let mut reports: Vec<(PathBuf, BatchReport)> = Vec::with_capacity(files.len());
    let mut unreadable: Vec<(PathBuf, String)> = Vec::new();

    for path in files {
        let loaded = fs::read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|data| Ok(pipeline.load(&data)?));

        match loaded {
            Ok(source) => {
                info!("Ingesting {} ({} pages)", path.display(), source.page_count());
                let report = pipeline.run(&source, class, &store).await;
                reports.push((path, report));
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                unreadable.push((path, e.to_string()));
            }
        }

        progress.inc(1);
    }

    progress.finish_and_clear();

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &reports)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let mut total = BatchSummary::default();
    for (path, report) in &reports {
        total.merge(&report.summary);
        print_report(path, report);
    }

    println!();
    println!(
        "{} Ingested {} pages from {} batches into {} in {:?}",
        style("✓").green(),
        total.total,
        reports.len(),
        root.display(),
        start.elapsed()
    );
    println!(
        "   {} stored, {} duplicate, {} overwritten, {} failed",
        style(total.success).green(),
        style(total.duplicate).yellow(),
        style(total.overwrite).cyan(),
        style(total.failed).red()
    );

    if !unreadable.is_empty() {
        println!();
        println!("{}", style("Unreadable batches:").red());
        for (path, error) in &unreadable {
            println!("  - {}: {}", path.display(), error);
        }
    }

    Ok(())
}

fn status_label(status: &PageStatus) -> String {
    match status {
        PageStatus::Stored(outcome) => serde_json::to_value(outcome)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        PageStatus::Failed(failure) => serde_json::to_value(failure.reason)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
    }
}

fn print_report(path: &Path, report: &BatchReport) {
    println!();
    println!("{}", style(path.display()).bold());

    for page in &report.pages {
        let label = status_label(&page.status);
        let label = match &page.status {
            PageStatus::Stored(StorageOutcome::Success) => style(label).green(),
            PageStatus::Stored(StorageOutcome::Duplicate) => style(label).yellow(),
            PageStatus::Stored(StorageOutcome::Overwrite) => style(label).cyan(),
            PageStatus::Stored(StorageOutcome::Failure) | PageStatus::Failed(_) => {
                style(label).red()
            }
        };

        println!(
            "  page {:>3}  {}  {}",
            page.page_index + 1,
            label,
            page.file_name.as_deref().unwrap_or("-")
        );
        if let Some(error) = &page.error {
            println!("             {}", style(error).dim());
        }
    }
}

fn write_summary(path: &Path, reports: &[(PathBuf, BatchReport)]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "batch",
        "page",
        "status",
        "national_id",
        "file_name",
        "error",
    ])?;

    for (batch, report) in reports {
        let batch = batch.file_name().and_then(|s| s.to_str()).unwrap_or("");
        for page in &report.pages {
            let page_number = (page.page_index + 1).to_string();
            let status = status_label(&page.status);
            wtr.write_record([
                batch,
                page_number.as_str(),
                status.as_str(),
                page.record
                    .as_ref()
                    .and_then(|r| r.national_id())
                    .unwrap_or_default(),
                page.file_name.as_deref().unwrap_or_default(),
                page.error.as_deref().unwrap_or_default(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
