//! CPF (Brazilian taxpayer ID) extraction and validation.

use super::patterns::{CPF_ANCHORED, CPF_BARE};
use super::{Cascade, ExtractionMatch, FieldRule, Strategy, TextView};

/// CPF field extractor.
///
/// The labeled form is preferred; any CPF-shaped token is the fallback. The value
/// keeps its punctuation exactly as printed.
#[derive(Debug, Clone)]
pub struct CpfExtractor {
    validate: bool,
    cascade: Cascade<String>,
}

impl CpfExtractor {
    /// Create a new CPF extractor. Check digits are not validated.
    pub fn new() -> Self {
        Self {
            validate: false,
            cascade: Cascade::new(vec![
                Strategy::new("cpf/anchored", anchored),
                Strategy::new("cpf/bare", bare),
            ]),
        }
    }

    /// Set whether to skip candidates with wrong check digits.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

impl Default for CpfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for CpfExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &TextView<'_>) -> Option<Self::Output> {
        self.cascade
            .first(text, |cpf| !self.validate || validate_cpf(cpf))
    }

    fn extract_all(&self, text: &TextView<'_>) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();
        for found in self.cascade.all(text, |cpf| !self.validate || validate_cpf(cpf)) {
            if !results.iter().any(|r| r.value == found.value) {
                results.push(found);
            }
        }
        results
    }
}

fn anchored(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<String>> {
    CPF_ANCHORED
        .captures_iter(text.flat())
        .filter_map(|caps| {
            let cpf = caps.get(1)?;
            Some(ExtractionMatch::new(cpf.as_str().to_string(), rule, &caps[0]).with_position(cpf.start(), cpf.end()))
        })
        .collect()
}

fn bare(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<String>> {
    CPF_BARE
        .find_iter(text.flat())
        .map(|m| ExtractionMatch::new(m.as_str().to_string(), rule, m.as_str()).with_position(m.start(), m.end()))
        .collect()
}

/// Extract the first CPF from text, without validation.
pub fn extract_cpf(text: &str) -> Option<String> {
    CpfExtractor::new().extract(&TextView::new(text)).map(|m| m.value)
}

/// Validate a CPF using its two mod-11 check digits.
///
/// Punctuation is ignored. Sequences of one repeated digit pass the arithmetic but
/// are never issued, so they are rejected.
pub fn validate_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 11 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let check = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .zip((2..=len as u32 + 1).rev())
            .map(|(d, w)| d * w)
            .sum();
        match sum % 11 {
            r if r < 2 => 0,
            r => 11 - r,
        }
    };

    check(9) == digits[9] && check(10) == digits[10]
}

/// Format a CPF as XXX.XXX.XXX-XX.
pub fn format_cpf(cpf: &str) -> String {
    let digits: String = cpf.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != 11 {
        return cpf.to_string();
    }

    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}
