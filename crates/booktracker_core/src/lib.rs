//! Core data-access logic for the book tracker.
//! This crate owns the catalog invariants: no duplicate or orphaned authors,
//! one status row per book, atomic multi-step writes.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod source;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::book::{
    Author, AuthorId, Book, BookDetails, BookId, BookInput, BookValidationError, FieldIssue,
    ReadStatus,
};
pub use model::normalize::NormalizationPolicy;
pub use repo::book_repo::{
    BookRepository, CatalogCounts, RepoError, RepoResult, SqliteBookRepository,
};
pub use service::book_service::{
    BookService, BookServiceError, CatalogStats, ErrorKind, ServiceResult,
};
pub use source::{parse_isbn, BookSource, SourceError, SourceIdentifier, SourceRecord};

/// Minimal health-check API for boundary smoke tests.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
