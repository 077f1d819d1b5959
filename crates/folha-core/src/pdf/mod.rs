//! PDF processing module: page splitting and page text.

mod splitter;
mod text;

pub use splitter::{PageSplitter, SourceDocument};
pub use text::TextMode;

use serde::{Deserialize, Serialize};

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, crate::error::PdfError>;

/// A single-page PDF copied out of a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    /// Serialized single-page PDF.
    pub bytes: Vec<u8>,
    /// Zero-based index of the page in its source document.
    pub page_index: usize,
}

impl PageDocument {
    /// One-based page number, for messages.
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }
}

/// Plain text of one page, in content-stream order.
///
/// Content-stream order is not necessarily reading order; rules that depend on
/// adjacency inherit that ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Zero-based index of the page in its source document.
    pub page_index: usize,
    /// Extracted text.
    pub text: String,
}

impl PageText {
    pub fn new(page_index: usize, text: impl Into<String>) -> Self {
        Self {
            page_index,
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
