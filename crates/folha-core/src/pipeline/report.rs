//! Per-page outcomes of a pipeline run.

use serde::Serialize;

use crate::models::record::ExtractedRecord;
use crate::models::upload::{FailureReport, StorageOutcome};

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PageStatus {
    /// The store took a decision on the page.
    Stored(StorageOutcome),
    /// The page never reached the store.
    Failed(FailureReport),
}

/// Outcome for one page slot of the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub page_index: usize,
    /// Name the page was offered to the store under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Extracted fields, when extraction ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ExtractedRecord>,
    pub status: PageStatus,
    /// Message from a store that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageReport {
    pub fn failed(failure: FailureReport) -> Self {
        Self {
            page_index: failure.page_index,
            file_name: None,
            record: None,
            status: PageStatus::Failed(failure),
            error: None,
        }
    }

    pub fn with_record(mut self, record: ExtractedRecord) -> Self {
        self.file_name = Some(record.file_name());
        self.record = Some(record);
        self
    }

    /// Whether the page counts as failed in the batch summary.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            PageStatus::Failed(_) | PageStatus::Stored(StorageOutcome::Failure)
        )
    }
}

/// Per-status counts, as rendered next to each uploaded batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub duplicate: usize,
    pub overwrite: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_pages(pages: &[PageReport]) -> Self {
        let mut summary = Self {
            total: pages.len(),
            ..Default::default()
        };

        for page in pages {
            match page.status {
                PageStatus::Stored(StorageOutcome::Success) => summary.success += 1,
                PageStatus::Stored(StorageOutcome::Duplicate) => summary.duplicate += 1,
                PageStatus::Stored(StorageOutcome::Overwrite) => summary.overwrite += 1,
                PageStatus::Stored(StorageOutcome::Failure) | PageStatus::Failed(_) => {
                    summary.failed += 1
                }
            }
        }

        summary
    }

    /// Fold another batch into this one.
    pub fn merge(&mut self, other: &BatchSummary) {
        self.total += other.total;
        self.success += other.success;
        self.duplicate += other.duplicate;
        self.overwrite += other.overwrite;
        self.failed += other.failed;
    }
}

/// Result of one pipeline run. Always partial-success: one entry per page slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Page reports in page order.
    pub pages: Vec<PageReport>,
    pub summary: BatchSummary,
    pub processing_time_ms: u64,
}

impl BatchReport {
    pub fn new(mut pages: Vec<PageReport>, processing_time_ms: u64) -> Self {
        pages.sort_by_key(|page| page.page_index);
        let summary = BatchSummary::from_pages(&pages);
        Self {
            pages,
            summary,
            processing_time_ms,
        }
    }

    /// Pages excluded before reaching the store.
    pub fn failures(&self) -> Vec<&FailureReport> {
        self.pages
            .iter()
            .filter_map(|page| match &page.status {
                PageStatus::Failed(failure) => Some(failure),
                PageStatus::Stored(_) => None,
            })
            .collect()
    }
}
