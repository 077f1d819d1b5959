//! Common regex patterns for payslip and annual statement extraction.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::record::MONTH_NAMES;

/// Regex fragment matching `word` with every accented letter relaxed.
///
/// An accented letter also matches its unaccented base, the Latin-1 reading of its
/// UTF-8 bytes in either case (`ç` read as `Ã§`) and the replacement character.
/// Combine with `(?i)` for case-insensitive matching.
pub fn tolerant(word: &str) -> String {
    let mut pattern = String::new();
    for c in word.chars() {
        if c.is_ascii() {
            pattern.push_str(&regex::escape(&c.to_string()));
            continue;
        }

        let mut variants: Vec<String> = vec![literal(&c.to_string())];
        if let Some(base) = ascii_base(c) {
            variants.push(base.to_string());
        }
        let lower: String = c.to_lowercase().collect();
        let upper: String = c.to_uppercase().collect();
        for form in [lower, upper] {
            let mojibake: String = form.bytes().map(char::from).collect();
            variants.push(literal(&mojibake));
        }
        variants.push(literal("\u{FFFD}"));
        variants.dedup();

        pattern.push_str("(?:");
        pattern.push_str(&variants.join("|"));
        pattern.push(')');
    }
    pattern
}

/// Escape non-ASCII characters as `\x{..}` so control characters survive in patterns.
fn literal(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii() {
                regex::escape(&c.to_string())
            } else {
                format!("\\x{{{:X}}}", c as u32)
            }
        })
        .collect()
}

fn ascii_base(c: char) -> Option<char> {
    let lower = c.to_lowercase().next()?;
    let base = match lower {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        _ => return None,
    };
    Some(base)
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {}: {}", pattern, e))
}

lazy_static! {
    // CPF (Brazilian taxpayer ID)
    pub static ref CPF_ANCHORED: Regex = Regex::new(
        r"(?i)C\.?P\.?F[\s:.\-]*(\d{3}\.\d{3}\.\d{3}-\d{2})"
    ).unwrap();

    pub static ref CPF_BARE: Regex = Regex::new(
        r"\d{3}\.\d{3}\.\d{3}-\d{2}"
    ).unwrap();

    // Matrícula adjacency, both layouts seen in the wild.
    // The enrollment digits must not continue a CPF (`...-09` or `.789`).
    pub static ref ENROLLMENT_BEFORE_LABEL: Regex = compile(&format!(
        r"(?i)(?:^|[^\d.\-])(\d+)(\D+?){}",
        tolerant("Matrícula")
    ));

    pub static ref LABEL_BEFORE_ENROLLMENT: Regex = compile(&format!(
        r"(?i){}[\s:.]*(\D+?)(\d+)",
        tolerant("Matrícula")
    ));

    // Line-oriented name label, run on raw text.
    pub static ref NAME_LINE: Regex = Regex::new(
        r"(?i)\bnome[ \t]*:[ \t]*([^\r\n]+)"
    ).unwrap();

    // Annual statement beneficiary block.
    pub static ref FULL_NAME_BLOCK: Regex = Regex::new(
        r"(?i)Nome\s*Completo\s*(?:\d{3}\.\d{3}\.\d{3}-\d{2})?(.+?)Natureza\s*do\s*Rendimento"
    ).unwrap();

    // Pay period
    // 13th salary phrases only count when a standalone 4-digit year follows, so
    // earnings lines such as "13º Salário 1.234,56" are not taken for the period.
    // Amounts like "2500,00" still match here and are dropped by the year range check.
    pub static ref THIRTEENTH_ADVANCE: Regex = compile(&format!(
        r"(?i){}\s*(?:d[oe]\s*)?(?:13\s*[º°ªo]?|{}\s*{})\s*{}\s*(?:de\s*|/\s*)?(\d{{4}})(?:\D|$)",
        tolerant("adiantamento"),
        tolerant("décimo"),
        tolerant("terceiro"),
        tolerant("salário")
    ));

    pub static ref THIRTEENTH: Regex = compile(&format!(
        r"(?i)(?:^|\D)(?:13\s*[º°ªo]?|{}\s*{})\s*{}\s*(?:de\s*|/\s*)?(\d{{4}})(?:\D|$)",
        tolerant("décimo"),
        tolerant("terceiro"),
        tolerant("salário")
    ));

    pub static ref NAMED_MONTH: Regex = compile(&format!(
        r"(?i)(?:Mensal\s*)?(?:{})\s*de\s*(\d{{4}})",
        MONTH_NAMES
            .iter()
            .map(|name| format!("({})", tolerant(name)))
            .collect::<Vec<_>>()
            .join("|")
    ));

    pub static ref NUMERIC_PERIOD: Regex = compile(&format!(
        r"(?i)(?:{}|{})[\s:.]*(\d{{1,2}})\s*/\s*(\d{{4}})",
        tolerant("Competência"),
        tolerant("Referência")
    ));

    // Years
    pub static ref BARE_YEAR: Regex = Regex::new(
        r"\bde\s+(\d{4})"
    ).unwrap();

    pub static ref FISCAL_YEAR: Regex = compile(&format!(
        r"(?i){}\s*de\s*(\d{{4}})",
        tolerant("Exercício")
    ));

    pub static ref CALENDAR_YEAR: Regex = compile(&format!(
        r"(?i){}\s*de\s*(\d{{4}})",
        tolerant("calendário")
    ));
}
