//! Error types for the folha-core library.

use thiserror::Error;

/// Errors that stop a whole operation: loading a source batch or a configuration file.
///
/// Per-page problems never surface here; they become a [`PageCopyError`] or an
/// [`ExtractionError`] and end up in the batch report.
#[derive(Error, Debug)]
pub enum FolhaError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`crate::FolhaConfig`].
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The supplied bytes are not a valid PDF container.
    #[error("malformed PDF document: {0}")]
    MalformedDocument(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF page tree has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Neither text backend could read the page.
    #[error("failed to extract text from page {}: {reason}", page_index + 1)]
    TextExtraction { page_index: usize, reason: String },
}

/// A page whose internal structure could not be isolated.
///
/// Recoverable: the rest of the batch keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to copy page {}: {reason}", page_index + 1)]
pub struct PageCopyError {
    /// Zero-based page index in the source document.
    pub page_index: usize,
    /// What went wrong.
    pub reason: String,
}

impl PageCopyError {
    pub fn new(page_index: usize, reason: impl Into<String>) -> Self {
        Self {
            page_index,
            reason: reason.into(),
        }
    }
}

/// Errors related to field extraction.
///
/// A field that is not found is not an error; it resolves to `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The page text is structurally empty.
    #[error("page text is empty")]
    EmptyText,

    /// The record has no national ID and cannot be routed to a beneficiary.
    #[error("no national ID found on page {}", page_index + 1)]
    UnusableRecord { page_index: usize },
}

/// Errors raised by a storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O failure in the storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Result type for the folha library.
pub type Result<T> = std::result::Result<T, FolhaError>;
