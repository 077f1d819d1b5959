//! Rule-based field extractors for payslips and annual statements.
//!
//! Each field is resolved by a [`Cascade`]: an ordered list of named strategies,
//! tried in turn until one produces an accepted candidate.

pub mod cpf;
pub mod identity;
pub mod patterns;
pub mod period;
pub mod years;

pub use cpf::{CpfExtractor, extract_cpf, format_cpf, validate_cpf};
pub use identity::{Identity, IdentityExtractor};
pub use period::{Period, PeriodExtractor};
pub use years::{StatementYears, YearExtractor};

/// Trait for field extractors.
pub trait FieldRule {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &TextView<'_>) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// Extract every accepted candidate, in cascade order.
    fn extract_all(&self, text: &TextView<'_>) -> Vec<Self::Output>;
}

/// Page text as seen by the rules.
///
/// `flat` joins the lines with single spaces, so labels and values printed on
/// separate lines become neighbours while digit runs from different lines stay apart.
#[derive(Debug, Clone)]
pub struct TextView<'a> {
    raw: &'a str,
    flat: String,
}

impl<'a> TextView<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            flat: raw.lines().collect::<Vec<_>>().join(" "),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn flat(&self) -> &str {
        &self.flat
    }
}

/// A value found by a named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Name of the strategy that produced it.
    pub rule: &'static str,
    /// Position in the text the rule ran on.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, rule: &'static str, source: impl Into<String>) -> Self {
        Self {
            value,
            rule,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractionMatch<U> {
        ExtractionMatch {
            value: f(self.value),
            rule: self.rule,
            position: self.position,
            source: self.source,
        }
    }
}

/// One named heuristic. `scan` returns its candidates in document order.
pub struct Strategy<T> {
    pub name: &'static str,
    scan: fn(&TextView<'_>, &'static str) -> Vec<ExtractionMatch<T>>,
}

impl<T> Strategy<T> {
    pub const fn new(
        name: &'static str,
        scan: fn(&TextView<'_>, &'static str) -> Vec<ExtractionMatch<T>>,
    ) -> Self {
        Self { name, scan }
    }

    pub fn scan(&self, text: &TextView<'_>) -> Vec<ExtractionMatch<T>> {
        (self.scan)(text, self.name)
    }
}

impl<T> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            scan: self.scan,
        }
    }
}

impl<T> std::fmt::Debug for Strategy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Strategy").field(&self.name).finish()
    }
}

/// Ordered strategies for one field. First accepted match wins.
#[derive(Debug, Clone)]
pub struct Cascade<T> {
    strategies: Vec<Strategy<T>>,
}

impl<T> Cascade<T> {
    pub fn new(strategies: Vec<Strategy<T>>) -> Self {
        Self { strategies }
    }

    /// Names of the strategies in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    /// First candidate that `accept` allows, trying strategies in order.
    pub fn first(
        &self,
        text: &TextView<'_>,
        accept: impl Fn(&T) -> bool,
    ) -> Option<ExtractionMatch<T>> {
        self.strategies.iter().find_map(|strategy| {
            let found = strategy.scan(text).into_iter().find(|m| accept(&m.value));
            if let Some(m) = &found {
                tracing::trace!("Rule {} matched {:?}", m.rule, m.source);
            }
            found
        })
    }

    /// Every candidate `accept` allows, strategy by strategy.
    pub fn all(&self, text: &TextView<'_>, accept: impl Fn(&T) -> bool) -> Vec<ExtractionMatch<T>> {
        self.strategies
            .iter()
            .flat_map(|strategy| strategy.scan(text))
            .filter(|m| accept(&m.value))
            .collect()
    }
}

/// Years a payroll document can plausibly refer to.
pub(crate) fn plausible_year(year: i32) -> bool {
    (1900..=2100).contains(&year)
}

/// Collapse a captured name to title case.
///
/// Leading and trailing non-letters are dropped, words are re-joined with single
/// spaces. Returns `None` when nothing alphabetic remains.
pub fn title_case(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| !c.is_alphabetic());
    if trimmed.is_empty() {
        return None;
    }

    let words: Vec<String> = trimmed
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();

    Some(words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_view_flattens_line_breaks() {
        let view = TextView::new("CPF:\r\n123.456.789-09\nJOSE");
        assert_eq!(view.flat(), "CPF: 123.456.789-09 JOSE");
        assert_eq!(view.raw(), "CPF:\r\n123.456.789-09\nJOSE");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("  JOÃO DA  SILVA "), Some("João Da Silva".to_string()));
        assert_eq!(title_case(": maria souza -"), Some("Maria Souza".to_string()));
        assert_eq!(title_case(" - : "), None);
    }

    fn first_digit(text: &TextView<'_>, rule: &'static str) -> Vec<ExtractionMatch<u32>> {
        text.flat()
            .char_indices()
            .filter_map(|(i, c)| c.to_digit(10).map(|d| ExtractionMatch::new(d, rule, c).with_position(i, i + 1)))
            .collect()
    }

    fn nothing(_: &TextView<'_>, _: &'static str) -> Vec<ExtractionMatch<u32>> {
        Vec::new()
    }

    #[test]
    fn test_cascade_first_match_wins() {
        let cascade = Cascade::new(vec![
            Strategy::new("none", nothing),
            Strategy::new("digit", first_digit),
        ]);
        let text = TextView::new("a7b3");

        let found = cascade.first(&text, |_| true).unwrap();
        assert_eq!(found.value, 7);
        assert_eq!(found.rule, "digit");
        assert_eq!(found.position, Some((1, 2)));

        let below_five = cascade.first(&text, |d| *d < 5).unwrap();
        assert_eq!(below_five.value, 3);

        assert_eq!(cascade.names(), vec!["none", "digit"]);
        assert_eq!(cascade.all(&text, |_| true).len(), 2);
    }
}
