//! Split command - write each page of a batch as its own PDF.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::debug;

use folha_core::PageSplitter;

use super::load_config;

/// Arguments for the split command.
#[derive(Args)]
pub struct SplitArgs {
    /// Input PDF batch
    #[arg(required = true)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of threads copying pages (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

pub async fn run(args: SplitArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let data = fs::read(&args.input)?;
    let source = folha_core::SourceDocument::load_with(&data, config.pdf.decrypt_empty_password)?;
    let workers = args.jobs.unwrap_or(config.pipeline.split_workers);
    let pages = PageSplitter::new().with_workers(workers).split(&source);

    fs::create_dir_all(&args.output_dir)?;
    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");

    let mut written = 0;
    let mut failed = Vec::new();
    for page in pages {
        match page {
            Ok(page) => {
                let path = args
                    .output_dir
                    .join(format!("{}_page_{:03}.pdf", stem, page.page_number()));
                fs::write(&path, &page.bytes)?;
                debug!("Wrote {}", path.display());
                written += 1;
            }
            Err(e) => failed.push(e),
        }
    }

    println!(
        "{} Wrote {} of {} pages to {} in {:?}",
        style("✓").green(),
        written,
        source.page_count(),
        args.output_dir.display(),
        start.elapsed()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed pages:").red());
        for e in &failed {
            println!("  - {}", e);
        }
    }

    Ok(())
}
