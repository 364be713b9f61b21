//! Field Parser — regex heuristics mapping one normalized line of résumé text
//! onto the fixed set of template fields.
//!
//! Every field is an independent scan over the same text. Singular fields take
//! the first match; EDUCATION and EMPLOYMENT_HISTORY collect all
//! non-overlapping matches in textual order. No match means an empty value,
//! never an error.

pub mod casing;
pub mod dates;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use casing::{capitalize, title_case};
use dates::format_date;

static NATIONALITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Nationality[:-]?\s*([A-Za-z]+)").unwrap());
static LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Location[:-]?\s*([A-Za-z\s]+)").unwrap());
static LANGUAGES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Languages[:-]?\s*([^\n]+)").unwrap());
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").unwrap());
/// year, separator, institution, `:`/`,`, degree
static EDUCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,4})\D+?([^:,\n]+)[:,]\s*([^\n]+)").unwrap());
/// date (M/YY[YY] or YYYY, optionally a range), separator, company/position
static EMPLOYMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2}\s*[/-]\s*\d{2,4}(?:\s*[-–]\s*(?:\d{1,2}\s*[/-]\s*\d{2,4}|\d{4}))?|\d{4}(?:\s*[-–]\s*\d{4})?)\D+?([^\n]+)",
    )
    .unwrap()
});

/// Indentation used inside EDUCATION / EMPLOYMENT_HISTORY blocks.
const INDENT: &str = "    ";

/// Parsed fields, serialized under the template's placeholder names.
/// Every field is always present; unmatched fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FieldMap {
    pub full_name: String,
    pub nationality: String,
    pub location: String,
    pub languages: String,
    pub education: String,
    pub employment_history: String,
}

/// Runs every heuristic over `text`.
pub fn parse_fields(text: &str) -> FieldMap {
    FieldMap {
        full_name: parse_full_name(text),
        nationality: parse_nationality(text),
        location: parse_location(text),
        languages: parse_languages(text),
        education: parse_education(text),
        employment_history: parse_employment_history(text),
    }
}

/// First two tokens, each capitalized.
pub fn parse_full_name(text: &str) -> String {
    text.split_whitespace()
        .take(2)
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_nationality(text: &str) -> String {
    first_capture(&NATIONALITY_RE, text)
        .map(capitalize)
        .unwrap_or_default()
}

/// Captured place up to the first comma.
pub fn parse_location(text: &str) -> String {
    first_capture(&LOCATION_RE, text)
        .and_then(|place| place.split(',').next())
        .map(|place| capitalize(place.trim()))
        .unwrap_or_default()
}

pub fn parse_languages(text: &str) -> String {
    first_capture(&LANGUAGES_RE, text)
        .map(|segment| {
            WORD_RE
                .find_iter(segment)
                .map(|m| capitalize(m.as_str()))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

pub fn parse_education(text: &str) -> String {
    EDUCATION_RE
        .captures_iter(text)
        .map(|caps| {
            let year = &caps[1];
            let institution = title_case(caps[2].trim());
            let degree = caps[3].trim();
            format!("{year}{INDENT}{institution}:\n{INDENT}{degree}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn parse_employment_history(text: &str) -> String {
    EMPLOYMENT_RE
        .captures_iter(text)
        .map(|caps| {
            let date = format_date(&caps[1]);
            let (company, position) = split_company_position(&caps[2]);
            format!("{date}{INDENT}{company}\n{INDENT}{position}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Company is everything before the first comma; the rest is the position.
fn split_company_position(remainder: &str) -> (String, String) {
    match remainder.split_once(',') {
        Some((company, position)) => (title_case(company.trim()), title_case(position.trim())),
        None => (title_case(remainder.trim()), String::new()),
    }
}

fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
