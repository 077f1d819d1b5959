//! Core library for payroll PDF ingestion.
//!
//! This crate provides:
//! - PDF processing (page splitting and page text)
//! - Payslip and annual statement field extraction (CPF, name, matrícula, period, years)
//! - Record and upload models exchanged with the storage collaborator
//! - A batch pipeline with bounded page concurrency

pub mod error;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod statement;

pub use error::{FolhaError, Result};
pub use models::{
    DocumentClass, ExtractedRecord, FailureReason, FailureReport, FolhaConfig, PayMonth,
    StorageOutcome, UploadRequest,
};
pub use pdf::{PageDocument, PageSplitter, PageText, SourceDocument, TextMode};
pub use pipeline::{BatchReport, BatchSummary, DocumentStore, PageReport, PageStatus, Pipeline};
pub use statement::{ExtractionResult, FieldExtractor};
