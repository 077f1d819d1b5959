//! Pay period (month code and year) extraction for payslips.

use regex::Captures;

use super::patterns::{NAMED_MONTH, NUMERIC_PERIOD, THIRTEENTH, THIRTEENTH_ADVANCE};
use super::{Cascade, ExtractionMatch, FieldRule, Strategy, TextView, plausible_year};
use crate::models::record::{MONTH_NAMES, PayMonth};

/// A pay period phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub month: PayMonth,
    pub year: Option<i32>,
}

/// Pay period extractor.
///
/// 13th salary phrases are checked before month names, since a 13th salary slip
/// usually also prints the month it was paid in.
#[derive(Debug, Clone)]
pub struct PeriodExtractor {
    cascade: Cascade<Period>,
}

impl PeriodExtractor {
    pub fn new() -> Self {
        Self {
            cascade: Cascade::new(vec![
                Strategy::new("period/thirteenth-advance", thirteenth_advance),
                Strategy::new("period/thirteenth", thirteenth),
                Strategy::new("period/named-month", named_month),
                Strategy::new("period/numeric", numeric),
            ]),
        }
    }
}

impl Default for PeriodExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for PeriodExtractor {
    type Output = ExtractionMatch<Period>;

    fn extract(&self, text: &TextView<'_>) -> Option<Self::Output> {
        self.cascade.first(text, acceptable)
    }

    fn extract_all(&self, text: &TextView<'_>) -> Vec<Self::Output> {
        self.cascade.all(text, acceptable)
    }
}

/// A period whose "year" is really an amount falls through to the next strategy.
fn acceptable(period: &Period) -> bool {
    period.year.is_none_or(plausible_year)
}

fn year_group(caps: &Captures<'_>, group: usize) -> Option<i32> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

fn period_match(caps: &Captures<'_>, period: Period, rule: &'static str) -> Option<ExtractionMatch<Period>> {
    let whole = caps.get(0)?;
    Some(ExtractionMatch::new(period, rule, whole.as_str()).with_position(whole.start(), whole.end()))
}

fn fixed_month(text: &TextView<'_>, rule: &'static str, month: PayMonth, re: &regex::Regex) -> Vec<ExtractionMatch<Period>> {
    re.captures_iter(text.flat())
        .filter_map(|caps| {
            let period = Period {
                month,
                year: year_group(&caps, 1),
            };
            period_match(&caps, period, rule)
        })
        .collect()
}

fn thirteenth_advance(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<Period>> {
    fixed_month(text, rule, PayMonth::THIRTEENTH_SALARY_ADVANCE, &THIRTEENTH_ADVANCE)
}

fn thirteenth(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<Period>> {
    fixed_month(text, rule, PayMonth::THIRTEENTH_SALARY, &THIRTEENTH)
}

fn named_month(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<Period>> {
    NAMED_MONTH
        .captures_iter(text.flat())
        .filter_map(|caps| {
            // Groups 1-12 are the month names in calendar order.
            let index = (1..=MONTH_NAMES.len()).find(|i| caps.get(*i).is_some())?;
            let period = Period {
                month: PayMonth::new(index as u8)?,
                year: year_group(&caps, MONTH_NAMES.len() + 1),
            };
            period_match(&caps, period, rule)
        })
        .collect()
}

fn numeric(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<Period>> {
    NUMERIC_PERIOD
        .captures_iter(text.flat())
        .filter_map(|caps| {
            let period = Period {
                month: PayMonth::new(caps.get(1)?.as_str().parse().ok()?)?,
                year: year_group(&caps, 2),
            };
            period_match(&caps, period, rule)
        })
        .collect()
}
