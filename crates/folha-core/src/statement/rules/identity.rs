//! Beneficiary name and enrollment number (matrícula) extraction.
//!
//! On payslips the name sits between the enrollment digits and the `Matrícula`
//! label in the flattened text. Older layouts print the digits first, newer ones the
//! label first, so both orders are tried.

use regex::Regex;

use super::patterns::{ENROLLMENT_BEFORE_LABEL, FULL_NAME_BLOCK, LABEL_BEFORE_ENROLLMENT, NAME_LINE};
use super::{Cascade, ExtractionMatch, FieldRule, Strategy, TextView, title_case};
use crate::models::record::EnrollmentNumber;

/// Name and enrollment number found together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Title-cased name.
    pub full_name: String,
    /// Present only when the rule captured digits next to the name.
    pub enrollment_number: Option<EnrollmentNumber>,
}

/// Identity field extractor.
#[derive(Debug, Clone)]
pub struct IdentityExtractor {
    max_name_length: usize,
    cascade: Cascade<Identity>,
}

impl IdentityExtractor {
    /// Rules for payslips: Matrícula adjacency in both orders, then a `nome:` line.
    pub fn payslip() -> Self {
        Self::with_strategies(vec![
            Strategy::new("identity/enrollment-before-label", enrollment_before_label),
            Strategy::new("identity/label-before-enrollment", label_before_enrollment),
            Strategy::new("identity/name-line", name_line),
        ])
    }

    /// Rules for annual statements: the beneficiary block first, then the payslip rules.
    pub fn annual_statement() -> Self {
        Self::with_strategies(vec![
            Strategy::new("identity/full-name-block", full_name_block),
            Strategy::new("identity/name-line", name_line),
            Strategy::new("identity/enrollment-before-label", enrollment_before_label),
            Strategy::new("identity/label-before-enrollment", label_before_enrollment),
        ])
    }

    fn with_strategies(strategies: Vec<Strategy<Identity>>) -> Self {
        Self {
            max_name_length: 100,
            cascade: Cascade::new(strategies),
        }
    }

    /// Set the longest capture still accepted as a name.
    pub fn with_max_name_length(mut self, max_name_length: usize) -> Self {
        self.max_name_length = max_name_length;
        self
    }

    fn accept(&self, identity: &Identity) -> bool {
        identity.full_name.chars().count() <= self.max_name_length
    }
}

impl FieldRule for IdentityExtractor {
    type Output = ExtractionMatch<Identity>;

    fn extract(&self, text: &TextView<'_>) -> Option<Self::Output> {
        self.cascade.first(text, |identity| self.accept(identity))
    }

    fn extract_all(&self, text: &TextView<'_>) -> Vec<Self::Output> {
        self.cascade.all(text, |identity| self.accept(identity))
    }
}

/// Run `re` over `haystack`, turning the `name` and `digits` groups into identities.
fn scan(
    re: &Regex,
    haystack: &str,
    rule: &'static str,
    name: usize,
    digits: Option<usize>,
) -> Vec<ExtractionMatch<Identity>> {
    re.captures_iter(haystack)
        .filter_map(|caps| {
            let full_name = title_case(caps.get(name)?.as_str())?;
            let enrollment_number = digits
                .and_then(|group| caps.get(group))
                .and_then(|m| EnrollmentNumber::parse(m.as_str()));
            let whole = caps.get(0)?;

            Some(
                ExtractionMatch::new(
                    Identity {
                        full_name,
                        enrollment_number,
                    },
                    rule,
                    whole.as_str(),
                )
                .with_position(whole.start(), whole.end()),
            )
        })
        .collect()
}

fn enrollment_before_label(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<Identity>> {
    scan(&ENROLLMENT_BEFORE_LABEL, text.flat(), rule, 2, Some(1))
}

fn label_before_enrollment(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<Identity>> {
    scan(&LABEL_BEFORE_ENROLLMENT, text.flat(), rule, 1, Some(2))
}

fn name_line(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<Identity>> {
    scan(&NAME_LINE, text.raw(), rule, 1, None)
}

fn full_name_block(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<Identity>> {
    scan(&FULL_NAME_BLOCK, text.flat(), rule, 1, None)
}
