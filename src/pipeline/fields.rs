//! Field parsing: pattern matching over OCR text.
//!
//! Every function here is pure (`&str → value`), so the heuristics can be
//! tested and swapped without touching I/O. They are heuristics, with known
//! blind spots:
//!
//! - The **last** date printed on a passport, visa or insurance document is
//!   taken as its expiry date. A document that prints its issue date after
//!   its expiry date, or carries unrelated dates, gets the wrong expiry.
//! - Dates are matched as `DD?MM?YYYY`. A matched date that is not a valid
//!   day-first date (`12/31/2025`) is retried month-first; a date valid both
//!   ways (`01/02/2025`) is always read day-first.
//! - No OCR error correction (`O` vs `0`, `I` vs `1`).

use crate::model::{DocumentCategory, ExtractedFields, Suggestions};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2})[/.\-](\d{2})[/.\-](\d{4})\b").unwrap());

static RE_DOCUMENT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{1,2}\d{6,8}\b").unwrap());

static RE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][A-Za-z]+) ([A-Z][A-Za-z]+)\b").unwrap());

/// Extract structured fields from OCR text for a document of `category`.
///
/// 1. Collect every `DD?MM?YYYY` date in textual order.
/// 2. For passports, visas and insurance documents, parse the last one as
///    the expiry date; omit the field if it does not parse.
/// 3. For passports, the first `[A-Z]{1,2}\d{6,8}` token is the document number.
/// 4. Every `Firstname Lastname` pair is a name; the first is the primary name.
pub fn parse_fields(text: &str, category: DocumentCategory) -> ExtractedFields {
    let mut fields = ExtractedFields::default();

    if category.carries_expiry() {
        fields.expiry_date = find_dates(text)
            .last()
            .and_then(|raw| parse_date(raw));
    }

    if category == DocumentCategory::Passport {
        fields.document_number = RE_DOCUMENT_NUMBER
            .find(text)
            .map(|m| m.as_str().to_string());
    }

    fields.names = find_names(text);
    fields.primary_name = fields.names.first().cloned();

    fields
}

/// All date-like substrings, in order of appearance.
pub fn find_dates(text: &str) -> Vec<&str> {
    RE_DATE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Parse a `DD?MM?YYYY` match, falling back to `MM?DD?YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let caps = RE_DATE.captures(raw)?;
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, second, first)
        .or_else(|| NaiveDate::from_ymd_opt(year, first, second))
}

/// Two capitalised words separated by one space, title-cased.
pub fn find_names(text: &str) -> Vec<String> {
    RE_NAME
        .captures_iter(text)
        .map(|caps| format!("{} {}", title_case(&caps[1]), title_case(&caps[2])))
        .collect()
}

/// `JOHN` → `John`. Mixed-case words (`McArthur`) are left alone.
fn title_case(word: &str) -> String {
    if word.chars().any(|c| c.is_lowercase()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Guess a category from keywords in the text.
///
/// Checks, in priority order: `passport`, `visa`, `insurance`/`policy`,
/// `vaccination`/`vaccine`. Anything else is [`DocumentCategory::Other`].
pub fn detect_category(text: &str) -> DocumentCategory {
    let lower = text.to_lowercase();
    if lower.contains("passport") {
        DocumentCategory::Passport
    } else if lower.contains("visa") {
        DocumentCategory::Visa
    } else if lower.contains("insurance") || lower.contains("policy") {
        DocumentCategory::Insurance
    } else if lower.contains("vaccination") || lower.contains("vaccine") {
        DocumentCategory::Vaccination
    } else {
        DocumentCategory::Other
    }
}

/// Suggested name and tags for a scanned document.
pub fn suggest(category: DocumentCategory, fields: &ExtractedFields) -> Suggestions {
    let name = match &fields.primary_name {
        Some(person) => format!("{} - {}", category.label(), person),
        None => category.label().to_string(),
    };

    let mut tags = vec![category.as_str().to_string()];
    if fields.expiry_date.is_some() {
        tags.push("expires".to_string());
    }

    Suggestions { name, tags }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn passport_sample_extracts_all_fields() {
        let text = "PASSPORT\nJOHN DOE\nA12345678\nEXP: 12/31/2025\nUSA";
        let fields = parse_fields(text, DocumentCategory::Passport);
        assert_eq!(fields.document_number.as_deref(), Some("A12345678"));
        assert_eq!(fields.primary_name.as_deref(), Some("John Doe"));
        assert_eq!(fields.expiry_date, Some(date(2025, 12, 31)));
        assert_eq!(fields.names, vec!["John Doe".to_string()]);
    }

    #[test]
    fn last_date_wins_not_latest() {
        let text = "Issued 01/01/2020\nExpires 31/12/2025";
        let fields = parse_fields(text, DocumentCategory::Passport);
        assert_eq!(fields.expiry_date, Some(date(2025, 12, 31)));

        // Textually last, chronologically earliest: still chosen.
        let text = "Expires 31/12/2030\nIssued 15-06-2020";
        let fields = parse_fields(text, DocumentCategory::Visa);
        assert_eq!(fields.expiry_date, Some(date(2020, 6, 15)));
    }

    #[test]
    fn unparseable_last_date_is_omitted() {
        let text = "Valid from 01/01/2024 to 99/99/2025";
        let fields = parse_fields(text, DocumentCategory::Insurance);
        assert_eq!(find_dates(text).len(), 2);
        assert_eq!(fields.expiry_date, None);
    }

    #[test]
    fn other_categories_have_no_expiry_or_number() {
        let text = "Vaccine lot A1234567 given 05.03.2021";
        let fields = parse_fields(text, DocumentCategory::Vaccination);
        assert_eq!(fields.expiry_date, None);
        assert_eq!(fields.document_number, None);
    }

    #[test]
    fn document_number_only_for_passports() {
        let text = "VISA\nNo AB1234567";
        assert_eq!(parse_fields(text, DocumentCategory::Visa).document_number, None);
        assert_eq!(
            parse_fields(text, DocumentCategory::Passport).document_number.as_deref(),
            Some("AB1234567")
        );
    }

    #[test]
    fn day_first_with_month_first_fallback() {
        assert_eq!(parse_date("02/03/2024"), Some(date(2024, 3, 2)));
        assert_eq!(parse_date("03/25/2024"), Some(date(2024, 3, 25)));
        assert_eq!(parse_date("31.12.2025"), Some(date(2025, 12, 31)));
        assert_eq!(parse_date("32/13/2025"), None);
    }

    #[test]
    fn names_in_order_with_primary_first() {
        let text = "Insured: Maria Lopez\nBeneficiary: Carlos Lopez";
        let fields = parse_fields(text, DocumentCategory::Insurance);
        assert_eq!(fields.names, vec!["Maria Lopez", "Carlos Lopez"]);
        assert_eq!(fields.primary_name.as_deref(), Some("Maria Lopez"));
    }

    #[test]
    fn names_do_not_span_lines() {
        assert!(find_names("JOHN\nDOE").is_empty());
    }

    #[test]
    fn mixed_case_names_keep_their_casing() {
        assert_eq!(find_names("Holder: Ewan McGregor"), vec!["Ewan McGregor"]);
    }

    #[test]
    fn empty_text_yields_empty_fields() {
        let fields = parse_fields("", DocumentCategory::Passport);
        assert!(fields.is_empty());
    }

    #[test]
    fn parser_is_pure() {
        let text = "PASSPORT\nJane Roe\nX1234567\n01/02/2019 10/02/2029";
        let a = parse_fields(text, DocumentCategory::Passport);
        let b = parse_fields(text, DocumentCategory::Passport);
        assert_eq!(a, b);
    }

    #[test]
    fn category_detection_priority() {
        assert_eq!(detect_category("Passport / Visa page"), DocumentCategory::Passport);
        assert_eq!(detect_category("SCHENGEN VISA"), DocumentCategory::Visa);
        assert_eq!(detect_category("Travel policy number 9"), DocumentCategory::Insurance);
        assert_eq!(detect_category("Yellow fever vaccine"), DocumentCategory::Vaccination);
        assert_eq!(detect_category("Boarding pass"), DocumentCategory::Other);
        assert_eq!(detect_category(""), DocumentCategory::Other);
    }

    #[test]
    fn suggestions_use_primary_name_and_expiry() {
        let fields = ExtractedFields {
            primary_name: Some("John Doe".into()),
            expiry_date: Some(date(2025, 12, 31)),
            ..Default::default()
        };
        let s = suggest(DocumentCategory::Passport, &fields);
        assert_eq!(s.name, "Passport - John Doe");
        assert_eq!(s.tags, vec!["passport", "expires"]);

        let s = suggest(DocumentCategory::Other, &ExtractedFields::default());
        assert_eq!(s.name, "Document");
        assert_eq!(s.tags, vec!["other"]);
    }
}
