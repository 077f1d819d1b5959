//! Field extraction for payslips and annual statements.

mod parser;
pub mod rules;

pub use parser::{ExtractionResult, FieldExtractor, RuleHit};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
