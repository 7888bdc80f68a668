//! External metadata lookup contract.
//!
//! # Responsibility
//! - Define the `BookSource` seam for ISBN lookups (online catalogs, fixtures).
//! - Map a raw volume record onto `BookInput` so imports go through the
//!   regular create path, validation and normalization included.
//!
//! No network client lives here; implementations are supplied by callers.

use crate::model::book::{BookDetails, BookInput};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static NON_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid digit regex"));
static ISBN_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]{10}|[0-9]{13})$").expect("valid isbn regex"));
static LEADING_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]{4})").expect("valid year regex"));

/// Identifier attached to a volume record, e.g. `ISBN_13` / `9780441013593`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

/// Volume metadata as returned by an external catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceRecord {
    pub title: String,
    /// Full names in display order (`"Frank Herbert"`); the first one wins.
    pub authors: Vec<String>,
    /// Free-form date, usually `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    pub published_date: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub industry_identifiers: Vec<SourceIdentifier>,
}

impl SourceRecord {
    /// Maps the record onto create input.
    ///
    /// ISBN-13 is preferred over ISBN-10; when neither parses, the ISBN that
    /// was looked up is kept. Years outside the catalog range are kept as-is
    /// and rejected later by validation.
    pub fn into_input(self, requested_isbn: i64) -> BookInput {
        let (author_last, author_first) = self
            .authors
            .first()
            .map(String::as_str)
            .map(split_author_name)
            .unwrap_or_default();
        let isbn = self.preferred_isbn().unwrap_or(requested_isbn);
        let year = self.published_date.as_deref().and_then(leading_year);

        BookInput {
            title: self.title,
            author_last,
            author_first,
            details: BookDetails {
                year,
                language: self.language,
                publisher: self.publisher,
                isbn: Some(isbn),
                ..BookDetails::default()
            },
        }
    }

    fn preferred_isbn(&self) -> Option<i64> {
        let by_kind = |kind: &str| {
            self.industry_identifiers
                .iter()
                .filter(|id| id.kind == kind)
                .find_map(|id| parse_isbn(&id.identifier))
        };
        by_kind("ISBN_13").or_else(|| by_kind("ISBN_10"))
    }
}

/// Error reported by a `BookSource` implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source could not be reached or refused the request.
    Unavailable(String),
    /// The source answered with something that is not a volume record.
    Malformed(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "book source unavailable: {message}"),
            Self::Malformed(message) => write!(f, "malformed book source response: {message}"),
        }
    }
}

impl Error for SourceError {}

/// Metadata lookup by ISBN.
pub trait BookSource {
    /// Returns `Ok(None)` when the source has no record for `isbn`.
    fn lookup_isbn(&self, isbn: i64) -> Result<Option<SourceRecord>, SourceError>;
}

/// Parses a printed ISBN (`978-0-441-01359-3`) into its integer form.
///
/// Only all-digit ISBN-10/13 values qualify; an ISBN-10 with an `X` check
/// digit has no integer form and yields `None`.
pub fn parse_isbn(text: &str) -> Option<i64> {
    if text.trim().chars().last().is_some_and(|c| c == 'X' || c == 'x') {
        return None;
    }
    let digits = NON_DIGIT_RE.replace_all(text, "");
    if !ISBN_SHAPE_RE.is_match(&digits) {
        return None;
    }
    digits.parse().ok()
}

fn leading_year(date: &str) -> Option<i64> {
    LEADING_YEAR_RE
        .captures(date)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Splits `"First Middle Last"` into `("Last", "First Middle")`.
///
/// A `"Last, First"` form is honoured as written; a single word is a last name.
fn split_author_name(name: &str) -> (String, String) {
    let name = name.trim();
    if let Some((last, first)) = name.split_once(',') {
        return (last.trim().to_string(), first.trim().to_string());
    }
    match name.rsplit_once(char::is_whitespace) {
        Some((first, last)) => (last.trim().to_string(), first.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_isbn, split_author_name, SourceIdentifier, SourceRecord};

    fn identifier(kind: &str, value: &str) -> SourceIdentifier {
        SourceIdentifier {
            kind: kind.to_string(),
            identifier: value.to_string(),
        }
    }

    #[test]
    fn parse_isbn_accepts_printed_forms() {
        assert_eq!(parse_isbn("978-0-441-01359-3"), Some(9_780_441_013_593));
        assert_eq!(parse_isbn("0441013597"), Some(441_013_597));
        assert_eq!(parse_isbn("044101359X"), None);
        assert_eq!(parse_isbn("12345"), None);
    }

    #[test]
    fn split_author_name_handles_display_and_catalog_order() {
        assert_eq!(
            split_author_name("Frank Herbert"),
            ("Herbert".to_string(), "Frank".to_string())
        );
        assert_eq!(
            split_author_name("  Isaac   Asimov "),
            ("Asimov".to_string(), "Isaac".to_string())
        );
        assert_eq!(
            split_author_name("Le Guin, Ursula"),
            ("Le Guin".to_string(), "Ursula".to_string())
        );
        assert_eq!(
            split_author_name("Moebius"),
            ("Moebius".to_string(), String::new())
        );
    }

    #[test]
    fn into_input_prefers_isbn_13_and_extracts_year() {
        let record = SourceRecord {
            title: "Dune".to_string(),
            authors: vec!["Frank Herbert".to_string()],
            published_date: Some("1965-08-01".to_string()),
            language: Some("en".to_string()),
            publisher: Some("Chilton Books".to_string()),
            industry_identifiers: vec![
                identifier("ISBN_10", "0441013597"),
                identifier("ISBN_13", "9780441013593"),
            ],
        };

        let input = record.into_input(441_013_597);
        assert_eq!(input.author_last, "Herbert");
        assert_eq!(input.author_first, "Frank");
        assert_eq!(input.details.year, Some(1965));
        assert_eq!(input.details.isbn, Some(9_780_441_013_593));
        assert_eq!(input.details.publisher.as_deref(), Some("Chilton Books"));
    }

    #[test]
    fn into_input_falls_back_to_requested_isbn() {
        let record = SourceRecord {
            title: "Untitled".to_string(),
            ..SourceRecord::default()
        };
        let input = record.into_input(9_781_234_567_897);
        assert_eq!(input.details.isbn, Some(9_781_234_567_897));
        assert!(input.author_last.is_empty());
    }

    #[test]
    fn record_deserializes_from_volume_info_json() {
        let record: SourceRecord = serde_json::from_str(
            r#"{
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "publishedDate": "1965",
                "industryIdentifiers": [{"type": "ISBN_13", "identifier": "9780441013593"}]
            }"#,
        )
        .unwrap();
        assert_eq!(record.published_date.as_deref(), Some("1965"));
        assert_eq!(record.industry_identifiers[0].kind, "ISBN_13");
    }
}
