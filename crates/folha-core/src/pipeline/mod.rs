//! Orchestration: split a batch, extract every page and hand usable pages to a
//! storage collaborator.

mod report;

pub use report::{BatchReport, BatchSummary, PageReport, PageStatus};

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, info, warn};

use crate::error::{FolhaError, PageCopyError, StorageError};
use crate::models::config::FolhaConfig;
use crate::models::record::DocumentClass;
use crate::models::upload::{FailureReason, FailureReport, StorageOutcome, UploadRequest};
use crate::pdf::{PageDocument, PageSplitter, PageText, SourceDocument, TextMode};
use crate::statement::{ExtractionResult, FieldExtractor};

/// Storage collaborator. Decides per page whether it is new, a duplicate or a
/// replacement, following its own naming policy.
pub trait DocumentStore {
    fn store(
        &self,
        request: UploadRequest,
    ) -> impl Future<Output = Result<StorageOutcome, StorageError>>;
}

/// Batch ingestion pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    splitter: PageSplitter,
    extractor: Arc<FieldExtractor>,
    text_mode: TextMode,
    decrypt_empty_password: bool,
    max_concurrent_pages: usize,
    page_timeout: Option<Duration>,
}

impl Pipeline {
    /// Create a pipeline from configuration.
    pub fn new(config: &FolhaConfig) -> Self {
        let timeout_ms = config.pipeline.page_timeout_ms;
        Self {
            splitter: PageSplitter::new().with_workers(config.pipeline.split_workers),
            extractor: Arc::new(FieldExtractor::from_config(&config.extraction)),
            text_mode: config.pdf.text_mode,
            decrypt_empty_password: config.pdf.decrypt_empty_password,
            max_concurrent_pages: config.pipeline.max_concurrent_pages.max(1),
            page_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        }
    }

    /// Parse a source document with the configured decryption policy.
    pub fn load(&self, data: &[u8]) -> Result<SourceDocument, FolhaError> {
        Ok(SourceDocument::load_with(data, self.decrypt_empty_password)?)
    }

    /// Split `source` and extract every page, without storing anything.
    ///
    /// Returns one entry per page slot in page order.
    pub fn extract_pages(
        &self,
        source: &SourceDocument,
        class: DocumentClass,
    ) -> Vec<Result<ExtractionResult, FailureReport>> {
        self.splitter
            .split(source)
            .into_iter()
            .map(|page| {
                let page = page.map_err(copy_failure)?;
                read_page(&page, self.text_mode, &self.extractor, class)
            })
            .collect()
    }

    /// Run the whole batch against `store`.
    ///
    /// Pages are extracted and stored concurrently, at most `max_concurrent_pages` at
    /// a time. A failing page never stops the others.
    pub async fn run<S: DocumentStore>(
        &self,
        source: &SourceDocument,
        class: DocumentClass,
        store: &S,
    ) -> BatchReport {
        let start = Instant::now();
        info!("Processing {} pages as {}", source.page_count(), class);

        // Pages are copied inside the stream so only in-flight pages hold their bytes.
        let reports: Vec<PageReport> = stream::iter((0..source.page_count()).map(move |page_index| {
            async move {
                let page = self.splitter.page(source, page_index);
                self.process_page(page, class, store).await
            }
        }))
        .buffer_unordered(self.max_concurrent_pages)
        .collect()
        .await;

        let report = BatchReport::new(reports, start.elapsed().as_millis() as u64);
        info!(
            "Batch done: {} stored, {} duplicate, {} overwritten, {} failed",
            report.summary.success,
            report.summary.duplicate,
            report.summary.overwrite,
            report.summary.failed
        );
        report
    }

    async fn process_page<S: DocumentStore>(
        &self,
        page: Result<PageDocument, PageCopyError>,
        class: DocumentClass,
        store: &S,
    ) -> PageReport {
        let page = match page {
            Ok(page) => page,
            Err(e) => return PageReport::failed(copy_failure(e)),
        };
        let page_index = page.page_index;

        let extractor = Arc::clone(&self.extractor);
        let mode = self.text_mode;
        let task = tokio::task::spawn_blocking(move || {
            let result = read_page(&page, mode, &extractor, class);
            (page, result)
        });

        // A timed-out task keeps running on the blocking pool; its result is dropped.
        let joined = match self.page_timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Page {} exceeded {:?}", page_index + 1, limit);
                    return PageReport::failed(
                        FailureReport::new(page_index, FailureReason::ExtractionTimeout)
                            .with_detail(format!("no result after {} ms", limit.as_millis())),
                    );
                }
            },
            None => task.await,
        };

        let (page, extraction) = match joined {
            Ok((page, Ok(extraction))) => (page, extraction),
            Ok((_, Err(failure))) => return PageReport::failed(failure),
            Err(e) => {
                warn!("Page {} worker failed: {}", page_index + 1, e);
                return PageReport::failed(
                    FailureReport::new(page_index, FailureReason::MalformedPage)
                        .with_detail(e.to_string()),
                );
            }
        };

        let record = extraction.record;
        let request = match UploadRequest::compose(&record, page) {
            Ok(request) => request,
            Err(e) => {
                warn!("{}", e);
                return PageReport::failed(
                    FailureReport::new(page_index, FailureReason::NoNationalIdFound)
                        .with_detail(extraction.warnings.join("; ")),
                )
                .with_record(record);
            }
        };

        let (outcome, error) = match store.store(request).await {
            Ok(outcome) => (outcome, None),
            Err(e) => {
                warn!("Page {} could not be stored: {}", page_index + 1, e);
                (StorageOutcome::Failure, Some(e.to_string()))
            }
        };
        debug!("Page {} -> {:?}", page_index + 1, outcome);

        PageReport {
            page_index,
            file_name: None,
            record: None,
            status: PageStatus::Stored(outcome),
            error,
        }
        .with_record(record)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&FolhaConfig::default())
    }
}

fn copy_failure(e: PageCopyError) -> FailureReport {
    FailureReport::new(e.page_index, FailureReason::MalformedPage).with_detail(e.reason)
}

/// Text and field extraction for one page.
fn read_page(
    page: &PageDocument,
    mode: TextMode,
    extractor: &FieldExtractor,
    class: DocumentClass,
) -> Result<ExtractionResult, FailureReport> {
    let text = PageText::from_page(page, mode).map_err(|e| {
        warn!("{}", e);
        FailureReport::new(page.page_index, FailureReason::MalformedPage).with_detail(e.to_string())
    })?;

    extractor.extract(&text, class).map_err(|e| {
        warn!("Page {}: {}", page.page_number(), e);
        FailureReport::new(page.page_index, FailureReason::NoNationalIdFound).with_detail(e.to_string())
    })
}
