//! Structured records extracted from payslip and annual statement pages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of document in an upload, declared by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentClass {
    /// Monthly pay statement (holerite).
    #[serde(rename = "HOLERITE")]
    Payslip,
    /// Yearly income statement (demonstrativo anual).
    #[serde(rename = "ANNUAL_STATEMENT", alias = "DEMOSTRATIVO_ANUAL")]
    AnnualStatement,
}

impl DocumentClass {
    /// Wire name used by the storage collaborator.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentClass::Payslip => "HOLERITE",
            DocumentClass::AnnualStatement => "ANNUAL_STATEMENT",
        }
    }
}

impl fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Employer-assigned payroll registration number (matrícula).
///
/// Keeps the digits as printed so leading zeros survive; [`EnrollmentNumber::value`]
/// gives the numeric form sent downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentNumber(String);

impl EnrollmentNumber {
    /// Accepts a non-empty run of ASCII digits.
    pub fn parse(digits: &str) -> Option<Self> {
        let digits = digits.trim();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self(digits.to_string()))
    }

    /// Digits exactly as printed on the page.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value; leading zeros are lost here.
    pub fn value(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for EnrollmentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Month code of a pay period.
///
/// 1-12 are calendar months. 13 and 14 are the 13th-salary disbursements and are kept
/// as their own codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PayMonth(u8);

/// What a [`PayMonth`] code stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthKind {
    /// A calendar month (1-12).
    Calendar(u32),
    /// 13th salary (code 13).
    ThirteenthSalary,
    /// 13th salary advance (code 14).
    ThirteenthSalaryAdvance,
}

pub const MONTH_NAMES: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

impl PayMonth {
    pub const THIRTEENTH_SALARY: PayMonth = PayMonth(13);
    pub const THIRTEENTH_SALARY_ADVANCE: PayMonth = PayMonth(14);

    /// Accepts codes 1 through 14.
    pub fn new(code: u8) -> Option<Self> {
        (1..=14).contains(&code).then_some(Self(code))
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn kind(&self) -> MonthKind {
        match self.0 {
            13 => MonthKind::ThirteenthSalary,
            14 => MonthKind::ThirteenthSalaryAdvance,
            m => MonthKind::Calendar(u32::from(m)),
        }
    }

    /// Portuguese label shown to beneficiaries.
    pub fn label(&self) -> &'static str {
        match self.kind() {
            MonthKind::Calendar(m) => MONTH_NAMES[(m - 1) as usize],
            MonthKind::ThirteenthSalary => "13º salário",
            MonthKind::ThirteenthSalaryAdvance => "adiantamento 13º salário",
        }
    }
}

impl TryFrom<u8> for PayMonth {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        PayMonth::new(code).ok_or_else(|| format!("invalid month code: {}", code))
    }
}

impl From<PayMonth> for u8 {
    fn from(month: PayMonth) -> u8 {
        month.0
    }
}

impl fmt::Display for PayMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields extracted from a payslip page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayslipRecord {
    pub national_id: Option<String>,
    pub full_name: Option<String>,
    pub enrollment_number: Option<EnrollmentNumber>,
    pub pay_month: Option<PayMonth>,
    pub pay_year: Option<i32>,
}

/// Fields extracted from an annual statement page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualStatementRecord {
    pub national_id: Option<String>,
    pub full_name: Option<String>,
    /// Exercício (filing year).
    pub fiscal_year: Option<i32>,
    /// Ano-calendário (income year).
    pub calendar_year: Option<i32>,
}

/// Structured output of the field extractor for one page.
///
/// Every field is independently optional. A record without a national ID cannot be
/// routed to a beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "documentClass")]
pub enum ExtractedRecord {
    #[serde(rename = "HOLERITE")]
    Payslip(PayslipRecord),
    #[serde(rename = "ANNUAL_STATEMENT")]
    AnnualStatement(AnnualStatementRecord),
}

impl ExtractedRecord {
    pub fn class(&self) -> DocumentClass {
        match self {
            ExtractedRecord::Payslip(_) => DocumentClass::Payslip,
            ExtractedRecord::AnnualStatement(_) => DocumentClass::AnnualStatement,
        }
    }

    pub fn national_id(&self) -> Option<&str> {
        match self {
            ExtractedRecord::Payslip(r) => r.national_id.as_deref(),
            ExtractedRecord::AnnualStatement(r) => r.national_id.as_deref(),
        }
    }

    pub fn full_name(&self) -> Option<&str> {
        match self {
            ExtractedRecord::Payslip(r) => r.full_name.as_deref(),
            ExtractedRecord::AnnualStatement(r) => r.full_name.as_deref(),
        }
    }

    pub fn enrollment_number(&self) -> Option<&EnrollmentNumber> {
        match self {
            ExtractedRecord::Payslip(r) => r.enrollment_number.as_ref(),
            ExtractedRecord::AnnualStatement(_) => None,
        }
    }

    pub fn pay_month(&self) -> Option<PayMonth> {
        match self {
            ExtractedRecord::Payslip(r) => r.pay_month,
            ExtractedRecord::AnnualStatement(_) => None,
        }
    }

    /// Year the document is filed under: the pay year for payslips, the calendar
    /// year (or the fiscal year when absent) for annual statements.
    pub fn pay_year(&self) -> Option<i32> {
        match self {
            ExtractedRecord::Payslip(r) => r.pay_year,
            ExtractedRecord::AnnualStatement(r) => r.calendar_year.or(r.fiscal_year),
        }
    }

    /// A record can be uploaded only when it carries a national ID.
    pub fn is_usable(&self) -> bool {
        self.national_id().is_some()
    }

    /// True when no field resolved at all.
    pub fn is_empty(&self) -> bool {
        match self {
            ExtractedRecord::Payslip(r) => *r == PayslipRecord::default(),
            ExtractedRecord::AnnualStatement(r) => *r == AnnualStatementRecord::default(),
        }
    }

    /// `{nationalId}_{fullName}_{enrollmentNumber}_{payMonth}_{payYear}.pdf`.
    ///
    /// Unresolved fields become the literal `null`; downstream parsers rely on it.
    pub fn file_name(&self) -> String {
        fn or_null<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
        }

        format!(
            "{}_{}_{}_{}_{}.pdf",
            or_null(self.national_id()),
            or_null(self.full_name()),
            or_null(self.enrollment_number()),
            or_null(self.pay_month()),
            or_null(self.pay_year()),
        )
    }
}
