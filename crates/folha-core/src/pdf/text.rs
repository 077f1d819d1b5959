//! Page text extraction using lopdf and pdf-extract.

use std::panic::{self, AssertUnwindSafe};

use lopdf::Document;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{PageDocument, PageText, Result};
use crate::error::PdfError;

/// Primary text backend. The other one is tried when the primary fails or reads
/// nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// Text operators in content-stream order (lopdf).
    #[default]
    ContentStream,
    /// Positioned text layout (pdf-extract).
    Layout,
}

impl TextMode {
    fn fallback(self) -> Self {
        match self {
            TextMode::ContentStream => TextMode::Layout,
            TextMode::Layout => TextMode::ContentStream,
        }
    }

    fn read(self, bytes: &[u8]) -> std::result::Result<String, String> {
        match self {
            TextMode::ContentStream => content_stream_text(bytes),
            TextMode::Layout => layout_text(bytes),
        }
    }
}

impl PageText {
    /// Read the text of a single-page document.
    ///
    /// A page with no text at all yields an empty [`PageText`], not an error.
    pub fn from_page(page: &PageDocument, mode: TextMode) -> Result<PageText> {
        let primary = mode.read(&page.bytes);
        match &primary {
            Ok(text) if !text.trim().is_empty() => {
                trace!("Page {}: {} chars via {:?}", page.page_number(), text.len(), mode);
                return Ok(PageText::new(page.page_index, text.as_str()));
            }
            Ok(_) => debug!("Page {}: no text via {:?}", page.page_number(), mode),
            Err(e) => debug!("Page {}: {:?} failed: {}", page.page_number(), mode, e),
        }

        let fallback = mode.fallback();
        match (primary, fallback.read(&page.bytes)) {
            (_, Ok(text)) if !text.trim().is_empty() => {
                debug!("Page {}: read via fallback {:?}", page.page_number(), fallback);
                Ok(PageText::new(page.page_index, text))
            }
            (Ok(text), _) | (Err(_), Ok(text)) => Ok(PageText::new(page.page_index, text)),
            (Err(primary), Err(secondary)) => Err(PdfError::TextExtraction {
                page_index: page.page_index,
                reason: format!("{}; {}", primary, secondary),
            }),
        }
    }
}

fn content_stream_text(bytes: &[u8]) -> std::result::Result<String, String> {
    let doc = Document::load_mem(bytes).map_err(|e| e.to_string())?;
    doc.extract_text(&[1]).map_err(|e| e.to_string())
}

fn layout_text(bytes: &[u8]) -> std::result::Result<String, String> {
    // pdf-extract panics on some malformed fonts.
    panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
        .map_err(|_| "text layout panicked".to_string())?
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_mode_serde_names() {
        assert_eq!(serde_json::to_string(&TextMode::Layout).unwrap(), "\"layout\"");
        let mode: TextMode = serde_json::from_str("\"content_stream\"").unwrap();
        assert_eq!(mode, TextMode::ContentStream);
    }

    #[test]
    fn test_garbage_page_is_an_error() {
        let page = PageDocument {
            bytes: b"definitely not a pdf".to_vec(),
            page_index: 4,
        };
        let err = PageText::from_page(&page, TextMode::ContentStream).unwrap_err();
        assert!(matches!(err, PdfError::TextExtraction { page_index: 4, .. }));
    }
}
