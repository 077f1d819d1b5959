//! Year extraction: fiscal and calendar years of annual statements, and the bare
//! year fallback for payslips.

use regex::Regex;

use super::patterns::{BARE_YEAR, CALENDAR_YEAR, FISCAL_YEAR};
use super::{Cascade, ExtractionMatch, Strategy, TextView, plausible_year};

/// Years printed on an annual statement. Each is independent of the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementYears {
    /// Exercício (filing year).
    pub fiscal: Option<ExtractionMatch<i32>>,
    /// Ano-calendário (income year).
    pub calendar: Option<ExtractionMatch<i32>>,
}

/// Year extractor.
#[derive(Debug, Clone)]
pub struct YearExtractor {
    fiscal: Cascade<i32>,
    calendar: Cascade<i32>,
    bare: Cascade<i32>,
}

impl YearExtractor {
    pub fn new() -> Self {
        Self {
            fiscal: Cascade::new(vec![Strategy::new("year/fiscal", fiscal)]),
            calendar: Cascade::new(vec![Strategy::new("year/calendar", calendar)]),
            bare: Cascade::new(vec![Strategy::new("year/bare", bare)]),
        }
    }

    /// `Exercício de <year>` and `calendário de <year>`.
    pub fn statement_years(&self, text: &TextView<'_>) -> StatementYears {
        StatementYears {
            fiscal: self.fiscal.first(text, |year| plausible_year(*year)),
            calendar: self.calendar.first(text, |year| plausible_year(*year)),
        }
    }

    /// First `de <year>` anywhere in the text.
    pub fn bare_year(&self, text: &TextView<'_>) -> Option<ExtractionMatch<i32>> {
        self.bare.first(text, |year| plausible_year(*year))
    }
}

impl Default for YearExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn scan(re: &Regex, haystack: &str, rule: &'static str) -> Vec<ExtractionMatch<i32>> {
    re.captures_iter(haystack)
        .filter_map(|caps| {
            let year = caps.get(1)?.as_str().parse().ok()?;
            let whole = caps.get(0)?;
            Some(ExtractionMatch::new(year, rule, whole.as_str()).with_position(whole.start(), whole.end()))
        })
        .collect()
}

fn fiscal(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<i32>> {
    scan(&FISCAL_YEAR, text.flat(), rule)
}

fn calendar(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<i32>> {
    scan(&CALENDAR_YEAR, text.flat(), rule)
}

fn bare(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<i32>> {
    scan(&BARE_YEAR, text.flat(), rule)
}
