//! Record assembly from the per-field rule cascades.

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::record::{AnnualStatementRecord, DocumentClass, ExtractedRecord, PayslipRecord};
use crate::pdf::PageText;

use super::Result;
use super::rules::{
    CpfExtractor, ExtractionMatch, FieldRule, IdentityExtractor, PeriodExtractor, TextView,
    YearExtractor,
};

/// Which rule resolved a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub field: &'static str,
    pub rule: &'static str,
    /// Text the rule matched.
    pub source: String,
}

/// Result of extracting one page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Extracted record.
    pub record: ExtractedRecord,
    /// Rules that resolved each field, in field order.
    pub rule_hits: Vec<RuleHit>,
    /// One entry per field that resolved to nothing.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Rule-based extractor for payslip and annual statement pages.
///
/// Stateless apart from its settings; one instance can serve many pages and threads.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    cpf: CpfExtractor,
    payslip_identity: IdentityExtractor,
    annual_identity: IdentityExtractor,
    period: PeriodExtractor,
    years: YearExtractor,
}

/// Collects rule hits and warnings while a record is assembled.
#[derive(Default)]
struct Trail {
    hits: Vec<RuleHit>,
    warnings: Vec<String>,
}

impl Trail {
    fn note<T>(&mut self, field: &'static str, found: Option<ExtractionMatch<T>>) -> Option<T> {
        match found {
            Some(m) => {
                self.hits.push(RuleHit {
                    field,
                    rule: m.rule,
                    source: m.source,
                });
                Some(m.value)
            }
            None => {
                self.warnings.push(format!("no {} found", field));
                None
            }
        }
    }
}

impl FieldExtractor {
    /// Create an extractor with default settings.
    pub fn new() -> Self {
        Self {
            cpf: CpfExtractor::new(),
            payslip_identity: IdentityExtractor::payslip(),
            annual_identity: IdentityExtractor::annual_statement(),
            period: PeriodExtractor::new(),
            years: YearExtractor::new(),
        }
    }

    /// Create an extractor from configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_validation(config.validate_national_id)
            .with_max_name_length(config.max_name_length)
    }

    /// Set national ID check-digit validation.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.cpf = self.cpf.with_validation(validate);
        self
    }

    /// Set the longest capture still accepted as a name.
    pub fn with_max_name_length(mut self, max_name_length: usize) -> Self {
        self.payslip_identity = self.payslip_identity.with_max_name_length(max_name_length);
        self.annual_identity = self.annual_identity.with_max_name_length(max_name_length);
        self
    }

    /// Extract a record from page text using the rules for `class`.
    ///
    /// Fails only on empty text. Fields that are not found are `None`.
    pub fn extract(&self, text: &PageText, class: DocumentClass) -> Result<ExtractionResult> {
        let result = self.extract_str(&text.text, class)?;
        debug!(
            "Page {}: {} fields resolved, {} missing",
            text.page_index + 1,
            result.rule_hits.len(),
            result.warnings.len()
        );
        Ok(result)
    }

    /// Extract a record from a plain string.
    pub fn extract_str(&self, text: &str, class: DocumentClass) -> Result<ExtractionResult> {
        let start = Instant::now();

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }

        let view = TextView::new(text);
        let mut trail = Trail::default();

        let record = match class {
            DocumentClass::Payslip => ExtractedRecord::Payslip(self.payslip(&view, &mut trail)),
            DocumentClass::AnnualStatement => {
                ExtractedRecord::AnnualStatement(self.annual_statement(&view, &mut trail))
            }
        };

        Ok(ExtractionResult {
            record,
            rule_hits: trail.hits,
            warnings: trail.warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn payslip(&self, view: &TextView<'_>, trail: &mut Trail) -> PayslipRecord {
        let national_id = trail.note("national ID", self.cpf.extract(view));
        let identity = trail.note("name", self.payslip_identity.extract(view));
        let period = trail.note("pay period", self.period.extract(view));

        let pay_year = match period.and_then(|p| p.year) {
            Some(year) => Some(year),
            None => trail.note("pay year", self.years.bare_year(view)),
        };

        let (full_name, enrollment_number) = match identity {
            Some(identity) => (Some(identity.full_name), identity.enrollment_number),
            None => (None, None),
        };
        if full_name.is_some() && enrollment_number.is_none() {
            trail.warnings.push("no enrollment number found".to_string());
        }

        PayslipRecord {
            national_id,
            full_name,
            enrollment_number,
            pay_month: period.map(|p| p.month),
            pay_year,
        }
    }

    fn annual_statement(&self, view: &TextView<'_>, trail: &mut Trail) -> AnnualStatementRecord {
        let national_id = trail.note("national ID", self.cpf.extract(view));
        let full_name = trail
            .note("name", self.annual_identity.extract(view))
            .map(|identity| identity.full_name);
        let years = self.years.statement_years(view);

        AnnualStatementRecord {
            national_id,
            full_name,
            fiscal_year: trail.note("fiscal year", years.fiscal),
            calendar_year: trail.note("calendar year", years.calendar),
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{EnrollmentNumber, PayMonth};
    use pretty_assertions::assert_eq;

    const PAYSLIP: &str = "PREFEITURA MUNICIPAL\nRecibo de Pagamento\nMensal Março de 2023\n\
        CPF: 123.456.789-09\n12345JOÃO DA SILVA\nMatrícula\nProventos 1.234,56";

    const ANNUAL: &str = "Comprovante de Rendimentos Pagos\nExercício de 2024\nAno-calendário de 2023\n\
        Nome Completo123.456.789-09MARIA DAS DORES\nNatureza do RendimentoAposentadoria";

    fn payslip(text: &str) -> PayslipRecord {
        match FieldExtractor::new().extract_str(text, DocumentClass::Payslip).unwrap().record {
            ExtractedRecord::Payslip(record) => record,
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_extract_payslip() {
        assert_eq!(
            payslip(PAYSLIP),
            PayslipRecord {
                national_id: Some("123.456.789-09".to_string()),
                full_name: Some("João Da Silva".to_string()),
                enrollment_number: EnrollmentNumber::parse("12345"),
                pay_month: PayMonth::new(3),
                pay_year: Some(2023),
            }
        );
    }

    #[test]
    fn test_extract_annual_statement() {
        let result = FieldExtractor::new()
            .extract_str(ANNUAL, DocumentClass::AnnualStatement)
            .unwrap();

        assert_eq!(
            result.record,
            ExtractedRecord::AnnualStatement(AnnualStatementRecord {
                national_id: Some("123.456.789-09".to_string()),
                full_name: Some("Maria Das Dores".to_string()),
                fiscal_year: Some(2024),
                calendar_year: Some(2023),
            })
        );
        assert!(result.warnings.is_empty());
        assert_eq!(result.record.pay_year(), Some(2023));
    }

    #[test]
    fn test_empty_text_is_an_error() {
        let extractor = FieldExtractor::new();
        assert_eq!(
            extractor.extract_str("", DocumentClass::Payslip).unwrap_err(),
            ExtractionError::EmptyText
        );
        assert_eq!(
            extractor
                .extract(&PageText::new(3, " \n "), DocumentClass::AnnualStatement)
                .unwrap_err(),
            ExtractionError::EmptyText
        );
    }

    #[test]
    fn test_missing_fields_degrade_to_none() {
        let result = FieldExtractor::new()
            .extract_str("Pagina sem dados relevantes", DocumentClass::Payslip)
            .unwrap();

        assert!(result.record.is_empty());
        assert!(!result.record.is_usable());
        assert!(result.rule_hits.is_empty());
        assert!(result.warnings.iter().any(|w| w == "no national ID found"));
    }

    #[test]
    fn test_id_survives_noise() {
        let record = payslip("@@@#!x 987654321 -- 529.982.247-25~~ lixo Matricula");
        assert_eq!(record.national_id.as_deref(), Some("529.982.247-25"));
    }

    #[test]
    fn test_year_falls_back_to_bare_year() {
        let record = payslip("CPF 123.456.789-09 Pagamento de 2021");
        assert_eq!(record.pay_month, None);
        assert_eq!(record.pay_year, Some(2021));
    }

    #[test]
    fn test_thirteenth_salary_preserved() {
        let record = payslip("CPF 123.456.789-09 Adiantamento 13º Salário de 2022");
        assert_eq!(record.pay_month, PayMonth::new(14));
        assert_eq!(record.pay_year, Some(2022));
    }

    #[test]
    fn test_thirteenth_earnings_keep_the_monthly_period() {
        for line in ["13º Salário 2500,00", "Adiantamento 13º Salário 1800,00"] {
            let text = format!("CPF: 123.456.789-09\nMensal Novembro de 2023\n{}", line);
            let record = payslip(&text);
            assert_eq!(record.pay_month, PayMonth::new(11), "{}", line);
            assert_eq!(record.pay_year, Some(2023), "{}", line);
            assert_eq!(
                ExtractedRecord::Payslip(record).file_name(),
                "123.456.789-09_null_null_11_2023.pdf"
            );
        }
    }

    #[test]
    fn test_rule_hits_name_the_rules() {
        let result = FieldExtractor::new()
            .extract_str(PAYSLIP, DocumentClass::Payslip)
            .unwrap();
        let rules: Vec<&str> = result.rule_hits.iter().map(|h| h.rule).collect();
        assert_eq!(
            rules,
            vec!["cpf/anchored", "identity/enrollment-before-label", "period/named-month"]
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = FieldExtractor::new();
        let first = extractor.extract_str(PAYSLIP, DocumentClass::Payslip).unwrap();
        let second = extractor.extract_str(PAYSLIP, DocumentClass::Payslip).unwrap();
        assert_eq!(first.record, second.record);
        assert_eq!(first.rule_hits, second.rule_hits);
    }

    #[test]
    fn test_validation_from_config() {
        let config = ExtractionConfig {
            validate_national_id: true,
            ..Default::default()
        };
        let result = FieldExtractor::from_config(&config)
            .extract_str("CPF: 123.456.789-00", DocumentClass::Payslip)
            .unwrap();
        assert_eq!(result.record.national_id(), None);
    }
}
