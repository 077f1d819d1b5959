//! Data models shared by the extractor, the pipeline and its collaborators.

pub mod config;
pub mod record;
pub mod upload;

pub use config::FolhaConfig;
pub use record::{
    AnnualStatementRecord, DocumentClass, EnrollmentNumber, ExtractedRecord, MonthKind, PayMonth,
    PayslipRecord,
};
pub use upload::{FailureReason, FailureReport, StorageOutcome, UploadRequest};
