//! Payloads exchanged with the storage collaborator.

use serde::{Deserialize, Serialize};

use super::record::{DocumentClass, ExtractedRecord, PayMonth};
use crate::error::ExtractionError;
use crate::pdf::PageDocument;

/// One page ready to hand to the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub national_id: String,
    pub full_name: Option<String>,
    pub enrollment_number: Option<u64>,
    pub file_name: String,
    pub document_class: DocumentClass,
    pub pay_year: Option<i32>,
    pub pay_month: Option<PayMonth>,
    #[serde(with = "base64_bytes")]
    pub file_bytes: Vec<u8>,
}

impl UploadRequest {
    /// Pair a page with its extracted record.
    ///
    /// Fails with [`ExtractionError::UnusableRecord`] when the record has no national ID.
    pub fn compose(record: &ExtractedRecord, page: PageDocument) -> Result<Self, ExtractionError> {
        let national_id = record
            .national_id()
            .ok_or(ExtractionError::UnusableRecord {
                page_index: page.page_index,
            })?
            .to_string();

        Ok(Self {
            national_id,
            full_name: record.full_name().map(str::to_string),
            enrollment_number: record.enrollment_number().and_then(|e| e.value()),
            file_name: record.file_name(),
            document_class: record.class(),
            pay_year: record.pay_year(),
            pay_month: record.pay_month(),
            file_bytes: page.bytes,
        })
    }

    /// Digits of the national ID, suitable for keys and directory names.
    pub fn national_id_digits(&self) -> String {
        self.national_id.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

/// Decision returned by the storage collaborator for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageOutcome {
    /// Stored as a new file.
    Success,
    /// A file with the same name already exists; nothing written.
    Duplicate,
    /// An existing file was replaced.
    Overwrite,
    /// The collaborator could not store the page.
    Failure,
}

/// Why a page was excluded from upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The page could not be isolated or its text could not be read.
    MalformedPage,
    /// Extraction produced no national ID.
    NoNationalIdFound,
    /// Extraction did not finish within the page deadline.
    ExtractionTimeout,
}

/// Per-page failure entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub page_index: usize,
    pub reason: FailureReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FailureReport {
    pub fn new(page_index: usize, reason: FailureReason) -> Self {
        Self {
            page_index,
            reason,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
