//! Employment date formatting: `M/YY` -> `Mon YYYY`, bare years untouched,
//! ranges formatted half by half and joined with an en-dash.

use chrono::Month;

const RANGE_DASH: &str = " – ";

/// Formats a matched employment date, falling back to the raw text when the
/// shape is not one this module understands.
pub fn format_date(raw: &str) -> String {
    try_format_date(raw).unwrap_or_else(|| raw.to_string())
}

/// `None` when the date cannot be formatted.
pub fn try_format_date(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if is_year(&compact) {
        return Some(compact);
    }

    let parts: Vec<&str> = compact.split(['/', '-', '–']).collect();
    match parts.as_slice() {
        [a, b] if is_year(a) && is_year(b) => Some(format!("{a}{RANGE_DASH}{b}")),
        [month, year] => month_year(month, year),
        [month, year, end] if is_year(end) => {
            Some(format!("{}{RANGE_DASH}{end}", month_year(month, year)?))
        }
        [start, month, year] if is_year(start) => {
            Some(format!("{start}{RANGE_DASH}{}", month_year(month, year)?))
        }
        [m1, y1, m2, y2] => Some(format!(
            "{}{RANGE_DASH}{}",
            month_year(m1, y1)?,
            month_year(m2, y2)?
        )),
        _ => None,
    }
}

/// Three-letter English month name for `1..=12`, empty for anything else.
pub fn month_abbrev(month: &str) -> &'static str {
    month
        .parse::<u8>()
        .ok()
        .and_then(|n| Month::try_from(n).ok())
        .map(|m| &m.name()[..3])
        .unwrap_or("")
}

/// An invalid month keeps its slot as an empty token; a non-numeric year
/// cannot be formatted at all.
fn month_year(month: &str, year: &str) -> Option<String> {
    Some(format!("{} {}", month_abbrev(month), expand_year(year)?))
}

fn expand_year(year: &str) -> Option<String> {
    if year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if year.len() == 2 {
        Some(format!("20{year}"))
    } else {
        Some(year.to_string())
    }
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}
