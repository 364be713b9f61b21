use once_cell::sync::Lazy;
use regex::Regex;

/// Separator symbols that always get exactly one space on each side.
static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*([/|\-•])\s*").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapses extracted text into one line.
///
/// Line breaks become spaces, `/ | - •` are padded with one space on each
/// side, whitespace runs collapse to a single space and the ends are trimmed.
/// Total over any input and idempotent.
pub fn normalize_text(text: &str) -> String {
    let single_line = text.replace(['\r', '\n'], " ");
    let padded = SYMBOL_RE.replace_all(&single_line, " $1 ");
    WHITESPACE_RE.replace_all(&padded, " ").trim().to_string()
}
