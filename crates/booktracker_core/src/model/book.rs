//! Book aggregate and its input shape.
//!
//! # Responsibility
//! - Define the joined `Book` value handed to callers (book + author + status).
//! - Define `BookInput`, the caller-provided data for create/update.
//! - Own field validation and normalization rules.
//!
//! # Invariants
//! - A book always names exactly one author; `author_last` is never blank.
//! - `year`, when set, is within `YEAR_MIN..=YEAR_MAX`.
//! - `volume`, when set, is at least `VOLUME_MIN`.
//! - A missing reading status is `None`, never a default variant.

use crate::model::normalize::NormalizationPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Surrogate key of a `books` row.
pub type BookId = i64;
/// Surrogate key of an `authors` row.
pub type AuthorId = i64;

pub const YEAR_MIN: i64 = 1000;
pub const YEAR_MAX: i64 = 2100;
pub const VOLUME_MIN: i64 = 1;

/// Author row as joined into a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub last_name: String,
    /// Empty when the author is known by a single name.
    pub first_name: String,
}

impl Author {
    /// `Last, First`, or just `Last` for single-name authors.
    pub fn display_name(&self) -> String {
        if self.first_name.is_empty() {
            self.last_name.clone()
        } else {
            format!("{}, {}", self.last_name, self.first_name)
        }
    }
}

/// Reading state stored in the `read_status` side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    Read,
    NotRead,
}

impl ReadStatus {
    /// Storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::NotRead => "not_read",
        }
    }

    /// Parses the storage/wire representation. Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "read" => Some(Self::Read),
            "not_read" => Some(Self::NotRead),
            _ => None,
        }
    }
}

impl Display for ReadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional bibliographic metadata shared by input and aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookDetails {
    pub series: Option<String>,
    pub volume: Option<i64>,
    pub year: Option<i64>,
    pub language: Option<String>,
    pub genre: Option<String>,
    pub written_form: Option<String>,
    pub publisher: Option<String>,
    pub collection: Option<String>,
    pub isbn: Option<i64>,
}

/// Caller-provided data for creating or overwriting a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author_last: String,
    #[serde(default)]
    pub author_first: String,
    #[serde(flatten)]
    pub details: BookDetails,
}

impl BookInput {
    /// Input with the required fields set and no metadata.
    pub fn new(
        title: impl Into<String>,
        author_last: impl Into<String>,
        author_first: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author_last: author_last.into(),
            author_first: author_first.into(),
            details: BookDetails::default(),
        }
    }

    /// Returns a copy with every text field cleaned up according to `policy`.
    pub fn normalized(&self, policy: NormalizationPolicy) -> Self {
        let details = &self.details;
        Self {
            title: policy.text(&self.title),
            author_last: policy.name(&self.author_last),
            author_first: policy.name(&self.author_first),
            details: BookDetails {
                series: policy.optional_text(details.series.as_deref()),
                volume: details.volume,
                year: details.year,
                language: policy.optional_name(details.language.as_deref()),
                genre: policy.optional_name(details.genre.as_deref()),
                written_form: policy.optional_text(details.written_form.as_deref()),
                publisher: policy.optional_text(details.publisher.as_deref()),
                collection: policy.optional_text(details.collection.as_deref()),
                isbn: details.isbn,
            },
        }
    }

    /// Checks required fields and numeric ranges, reporting every problem at once.
    ///
    /// Expects normalized input: whitespace-only values count as blank.
    pub fn validate(&self) -> Result<(), BookValidationError> {
        let mut issues = Vec::new();

        if self.title.trim().is_empty() {
            issues.push(FieldIssue::new("title", "must not be blank"));
        }
        if self.author_last.trim().is_empty() {
            issues.push(FieldIssue::new("author_last", "must not be blank"));
        }
        if let Some(volume) = self.details.volume {
            if volume < VOLUME_MIN {
                issues.push(FieldIssue::new(
                    "volume",
                    format!("must be at least {VOLUME_MIN}, got {volume}"),
                ));
            }
        }
        if let Some(year) = self.details.year {
            if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
                issues.push(FieldIssue::new(
                    "year",
                    format!("must be between {YEAR_MIN} and {YEAR_MAX}, got {year}"),
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(BookValidationError { issues })
        }
    }
}

/// Joined view of one book as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: Author,
    #[serde(flatten)]
    pub details: BookDetails,
    /// `None` until a status has been assigned.
    pub status: Option<ReadStatus>,
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Caller input rejected before touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookValidationError {
    issues: Vec<FieldIssue>,
}

impl BookValidationError {
    /// Error for a single field.
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Whether `field` is among the rejected fields.
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl Display for BookValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid book data: ")?;
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

impl Error for BookValidationError {}
