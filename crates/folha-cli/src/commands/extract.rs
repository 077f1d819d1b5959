//! Extract command - read beneficiary fields from every page of a batch.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, info};

use folha_core::statement::RuleHit;
use folha_core::{DocumentClass, ExtractedRecord, FailureReason, FailureReport, Pipeline};

use super::{ClassArg, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF batch
    #[arg(required = true)]
    input: PathBuf,

    /// Kind of document in the batch
    #[arg(short = 't', long = "type", value_enum, default_value = "holerite")]
    class: ClassArg,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include the rule that resolved each field and the fields left empty
    #[arg(long)]
    diagnostics: bool,

    /// Skip national IDs whose check digits do not match
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

/// One page of extract output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageEntry {
    page_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<ExtractedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rule_hits: Vec<RuleHit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.validate {
        config.extraction.validate_national_id = true;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting fields from {}", args.input.display());

    let data = fs::read(&args.input)?;
    let pipeline = Pipeline::new(&config);
    let source = pipeline.load(&data)?;
    let class = DocumentClass::from(args.class);

    let entries: Vec<PageEntry> = pipeline
        .extract_pages(&source, class)
        .into_iter()
        .enumerate()
        .map(|(page_index, result)| match result {
            Ok(result) => PageEntry {
                page_index,
                file_name: Some(result.record.file_name()),
                failure: (!result.record.is_usable())
                    .then(|| FailureReport::new(page_index, FailureReason::NoNationalIdFound)),
                record: Some(result.record),
                rule_hits: if args.diagnostics { result.rule_hits } else { Vec::new() },
                warnings: if args.diagnostics { result.warnings } else { Vec::new() },
            },
            Err(failure) => PageEntry {
                page_index,
                record: None,
                file_name: None,
                failure: Some(failure),
                rule_hits: Vec::new(),
                warnings: Vec::new(),
            },
        })
        .collect();

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&entries)?,
        OutputFormat::Csv => format_csv(&entries)?,
        OutputFormat::Text => format_text(&entries),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_csv(entries: &[PageEntry]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "page",
        "document_class",
        "national_id",
        "full_name",
        "enrollment_number",
        "pay_month",
        "pay_year",
        "file_name",
        "failure",
    ])?;

    for entry in entries {
        let page = (entry.page_index + 1).to_string();
        match (&entry.record, &entry.failure) {
            (Some(record), _) => {
                let enrollment = record
                    .enrollment_number()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                let month = record.pay_month().map(|m| m.to_string()).unwrap_or_default();
                let year = record.pay_year().map(|y| y.to_string()).unwrap_or_default();
                wtr.write_record([
                    page.as_str(),
                    record.class().as_str(),
                    record.national_id().unwrap_or_default(),
                    record.full_name().unwrap_or_default(),
                    enrollment.as_str(),
                    month.as_str(),
                    year.as_str(),
                    entry.file_name.as_deref().unwrap_or_default(),
                    if record.is_usable() { "" } else { "NO_NATIONAL_ID_FOUND" },
                ])?;
            }
            (None, failure) => {
                let reason = failure
                    .as_ref()
                    .map(|f| serde_json::to_value(f.reason))
                    .transpose()?
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                wtr.write_record([page.as_str(), "", "", "", "", "", "", "", reason.as_str()])?;
            }
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(entries: &[PageEntry]) -> String {
    let mut lines = Vec::new();

    for entry in entries {
        let page = entry.page_index + 1;
        match (&entry.record, &entry.failure) {
            (Some(record), _) => {
                lines.push(format!("Page {}: {}", page, style(record.class()).bold()));
                lines.push(format!(
                    "  CPF:        {}",
                    record.national_id().unwrap_or("-")
                ));
                lines.push(format!("  Name:       {}", record.full_name().unwrap_or("-")));
                if let Some(enrollment) = record.enrollment_number() {
                    lines.push(format!("  Matrícula:  {}", enrollment));
                }
                if let Some(month) = record.pay_month() {
                    lines.push(format!("  Month:      {} ({})", month, month.label()));
                }
                if let Some(year) = record.pay_year() {
                    lines.push(format!("  Year:       {}", year));
                }
                for hit in &entry.rule_hits {
                    lines.push(format!("  · {} via {}", hit.field, hit.rule));
                }
                for warning in &entry.warnings {
                    lines.push(format!("  {} {}", style("!").yellow(), warning));
                }
                if !record.is_usable() {
                    lines.push(format!("  {}", style("not routable: no CPF").red()));
                }
            }
            (None, Some(failure)) => {
                lines.push(format!(
                    "Page {}: {} {:?}{}",
                    page,
                    style("failed").red(),
                    failure.reason,
                    failure
                        .detail
                        .as_ref()
                        .map(|d| format!(" ({})", d))
                        .unwrap_or_default()
                ));
            }
            (None, None) => {}
        }
    }

    lines.join("\n")
}
