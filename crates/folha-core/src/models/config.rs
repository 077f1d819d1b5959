//! Configuration structures for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FolhaError, Result};
use crate::pdf::TextMode;

/// Main configuration for the folha pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolhaConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Orchestration configuration.
    pub pipeline: PipelineConfig,

    /// Local storage configuration (used by the CLI directory store).
    pub storage: StorageConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Primary backend for page text.
    pub text_mode: TextMode,

    /// Try the empty user password on encrypted sources.
    pub decrypt_empty_password: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            text_mode: TextMode::ContentStream,
            decrypt_empty_password: true,
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Skip national ID candidates whose check digits do not match.
    pub validate_national_id: bool,

    /// Longest captured text still accepted as a person's name.
    pub max_name_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            validate_national_id: false,
            max_name_length: 100,
        }
    }
}

/// Orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pages extracted and uploaded at the same time.
    pub max_concurrent_pages: usize,

    /// Threads used to copy pages out of the source document.
    pub split_workers: usize,

    /// Per-page extraction deadline in milliseconds (0 = no deadline).
    pub page_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: 4,
            split_workers: 4,
            page_timeout_ms: 30_000,
        }
    }
}

/// Directory store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for stored pages.
    pub root: PathBuf,

    /// Replace files that already exist instead of reporting duplicates.
    pub overwrite: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            overwrite: false,
        }
    }
}

impl FolhaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON text. Missing sections take their defaults.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| FolhaError::Config(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| FolhaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: FolhaConfig =
            serde_json::from_str(r#"{"pipeline": {"max_concurrent_pages": 8}}"#).unwrap();

        assert_eq!(config.pipeline.max_concurrent_pages, 8);
        assert_eq!(config.pipeline.page_timeout_ms, 30_000);
        assert!(!config.extraction.validate_national_id);
        assert_eq!(config.pdf.text_mode, TextMode::ContentStream);
    }

    #[test]
    fn test_text_mode_names() {
        let config: FolhaConfig = serde_json::from_str(r#"{"pdf": {"text_mode": "layout"}}"#).unwrap();
        assert_eq!(config.pdf.text_mode, TextMode::Layout);
    }

    #[test]
    fn test_invalid_json_is_a_config_error() {
        let err = FolhaConfig::from_json(r#"{"pipeline": {"max_concurrent_pages": "many"}}"#)
            .unwrap_err();
        assert!(matches!(err, FolhaError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = FolhaConfig::from_file(Path::new("/nonexistent/folha/config.json")).unwrap_err();
        assert!(matches!(err, FolhaError::Io(_)));
    }
}
