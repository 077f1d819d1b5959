//! Subcommands of the `folha` binary.

pub mod config;
pub mod extract;
pub mod ingest;
pub mod split;

use std::path::{Path, PathBuf};

use tracing::debug;

use folha_core::DocumentClass;
use folha_core::models::config::FolhaConfig;

/// Document class as typed on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ClassArg {
    /// Monthly payslips (holerites)
    #[value(alias = "payslip")]
    Holerite,
    /// Annual income statements (demonstrativos anuais)
    #[value(alias = "demonstrativo-anual")]
    Annual,
}

impl From<ClassArg> for DocumentClass {
    fn from(class: ClassArg) -> Self {
        match class {
            ClassArg::Holerite => DocumentClass::Payslip,
            ClassArg::Annual => DocumentClass::AnnualStatement,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folha")
        .join("config.json")
}

/// Configuration from `--config`, else the default file when present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FolhaConfig> {
    if let Some(path) = config_path {
        return Ok(FolhaConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        Ok(FolhaConfig::from_file(&default_path)?)
    } else {
        Ok(FolhaConfig::default())
    }
}
