//! Book use-case service.
//!
//! # Responsibility
//! - Expose the catalog operations callers use: create, read, update, delete,
//!   set status, list, stats, and lookup or import from an external source.
//! - Normalize and validate input before any storage access.
//! - Sequence record store and author reconciliation inside one transaction.
//!
//! # Invariants
//! - Author release always runs before the book's author reference changes
//!   or the book row disappears.
//! - A failed step rolls back every earlier step of the same operation.
//! - Errors are terminal; nothing here retries.

use crate::model::book::{Book, BookId, BookInput, BookValidationError, ReadStatus};
use crate::model::normalize::NormalizationPolicy;
use crate::repo::book_repo::{BookRepository, RepoError};
use crate::source::{BookSource, SourceError};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Coarse failure class used by boundary layers to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Source,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
            Self::Source => "source",
        }
    }
}

/// Service error for book use-cases.
#[derive(Debug)]
pub enum BookServiceError {
    /// Caller input rejected before touching storage.
    Validation(BookValidationError),
    /// Target book does not exist.
    NotFound(BookId),
    /// External source has no record for this ISBN.
    SourceNotFound { isbn: i64 },
    /// External source failed.
    Source(SourceError),
    /// Persistence failure, tagged with the operation that hit it.
    Storage {
        operation: &'static str,
        source: RepoError,
    },
}

impl BookServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) | Self::SourceNotFound { .. } => ErrorKind::NotFound,
            Self::Source(_) => ErrorKind::Source,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    fn storage(operation: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |err| match err {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage {
                operation,
                source: other,
            },
        }
    }
}

impl Display for BookServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "book not found: {id}"),
            Self::SourceNotFound { isbn } => write!(f, "no book found for isbn {isbn}"),
            Self::Source(err) => write!(f, "{err}"),
            Self::Storage { operation, source } => write!(f, "{operation} failed: {source}"),
        }
    }
}

impl Error for BookServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Source(err) => Some(err),
            Self::Storage { source, .. } => Some(source),
            Self::NotFound(_) | Self::SourceNotFound { .. } => None,
        }
    }
}

impl From<BookValidationError> for BookServiceError {
    fn from(value: BookValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ServiceResult<T> = Result<T, BookServiceError>;

/// Catalog totals for the statistics view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub books: u64,
    pub authors: u64,
    pub read: u64,
    pub not_read: u64,
    /// Books with no status row yet.
    pub unknown: u64,
}

/// Book service facade over a record store.
pub struct BookService<R: BookRepository> {
    repo: R,
    policy: NormalizationPolicy,
}

impl<R: BookRepository> BookService<R> {
    /// Creates a service with the default normalization policy.
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, NormalizationPolicy::default())
    }

    pub fn with_policy(repo: R, policy: NormalizationPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> NormalizationPolicy {
        self.policy
    }

    /// Creates a book and returns its id.
    ///
    /// The author row is found or created in the same transaction.
    pub fn create(&self, input: &BookInput) -> ServiceResult<BookId> {
        let started_at = Instant::now();
        let input = self.prepare(input)?;

        let book_id = self
            .repo
            .atomic(|repo| {
                let author_id = repo.ensure_author(&input.author_last, &input.author_first)?;
                repo.insert_book(&input, author_id)
            })
            .map_err(BookServiceError::storage("create book"))
            .inspect_err(|err| log_failure("book_create", err))?;

        info!(
            "event=book_create module=service status=ok book_id={book_id} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(book_id)
    }

    /// Loads one book with its author and status.
    pub fn read(&self, id: BookId) -> ServiceResult<Book> {
        self.repo
            .find_book(id)
            .map_err(BookServiceError::storage("read book"))?
            .ok_or(BookServiceError::NotFound(id))
    }

    /// Overwrites every field of an existing book.
    ///
    /// Order is release old author, ensure new author, overwrite row. When the
    /// author does not change the row is re-found (or re-created) inside the
    /// same transaction, so readers never see it missing.
    pub fn update(&self, id: BookId, input: &BookInput) -> ServiceResult<()> {
        let started_at = Instant::now();
        let input = self.prepare(input)?;

        let released = self
            .repo
            .atomic(|repo| {
                let released = repo.release_author_if_orphaned(id)?;
                let author_id = repo.ensure_author(&input.author_last, &input.author_first)?;
                repo.update_book(id, &input, author_id)?;
                Ok(released)
            })
            .map_err(BookServiceError::storage("update book"))
            .inspect_err(|err| log_failure("book_update", err))?;

        info!(
            "event=book_update module=service status=ok book_id={id} author_released={} duration_ms={}",
            released.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Deletes a book, its status row, and its author when no other book
    /// references it.
    pub fn delete(&self, id: BookId) -> ServiceResult<()> {
        let released = self
            .repo
            .atomic(|repo| {
                let released = repo.release_author_if_orphaned(id)?;
                repo.delete_book(id)?;
                Ok(released)
            })
            .map_err(BookServiceError::storage("delete book"))
            .inspect_err(|err| log_failure("book_delete", err))?;

        info!(
            "event=book_delete module=service status=ok book_id={id} author_released={}",
            released.is_some()
        );
        Ok(())
    }

    /// Sets the reading status from its wire form (`read` / `not_read`).
    pub fn set_status(&self, id: BookId, status: &str) -> ServiceResult<()> {
        let parsed = ReadStatus::parse(status).ok_or_else(|| {
            BookValidationError::field("status", "must be one of `read` or `not_read`")
        })?;
        self.set_read_status(id, parsed)
    }

    /// Sets the reading status. Repeated calls keep a single status row.
    pub fn set_read_status(&self, id: BookId, status: ReadStatus) -> ServiceResult<()> {
        self.repo
            .atomic(|repo| {
                if !repo.book_exists(id)? {
                    return Err(RepoError::NotFound(id));
                }
                repo.upsert_status(id, status)
            })
            .map_err(BookServiceError::storage("set status"))
            .inspect_err(|err| log_failure("book_status", err))?;

        info!("event=book_status module=service status=ok book_id={id} value={status}");
        Ok(())
    }

    /// Lists every book by author last name, first name, then year (unknown
    /// years last).
    pub fn list(&self) -> ServiceResult<Vec<Book>> {
        self.repo
            .list_books()
            .map_err(BookServiceError::storage("list books"))
    }

    /// Computes catalog totals.
    pub fn stats(&self) -> ServiceResult<CatalogStats> {
        let counts = self
            .repo
            .catalog_counts()
            .map_err(BookServiceError::storage("catalog stats"))?;
        Ok(CatalogStats {
            books: counts.books,
            authors: counts.authors,
            read: counts.read,
            not_read: counts.not_read,
            unknown: counts
                .books
                .saturating_sub(counts.read)
                .saturating_sub(counts.not_read),
        })
    }

    /// Looks `isbn` up in `source` and returns the normalized input it maps
    /// to, without saving anything.
    ///
    /// The result is not validated; an incomplete record is still returned so
    /// callers can show it for editing before [`BookService::create`].
    ///
    /// # Errors
    /// - `SourceNotFound` when the source has no record.
    /// - `Source` when the lookup itself fails.
    pub fn lookup_from_source<S: BookSource + ?Sized>(
        &self,
        source: &S,
        isbn: i64,
    ) -> ServiceResult<BookInput> {
        let record = source
            .lookup_isbn(isbn)
            .map_err(BookServiceError::Source)
            .inspect_err(|err| log_failure("book_lookup", err))?
            .ok_or(BookServiceError::SourceNotFound { isbn })?;
        info!("event=book_lookup module=service status=ok isbn={isbn}");
        Ok(record.into_input(isbn).normalized(self.policy))
    }

    /// Looks `isbn` up in `source` and creates the resulting book.
    ///
    /// # Errors
    /// - Any [`BookService::lookup_from_source`] error.
    /// - Any `create` error, e.g. validation of an incomplete record.
    pub fn create_from_source<S: BookSource + ?Sized>(
        &self,
        source: &S,
        isbn: i64,
    ) -> ServiceResult<BookId> {
        let input = self.lookup_from_source(source, isbn)?;
        self.create(&input)
    }

    fn prepare(&self, input: &BookInput) -> ServiceResult<BookInput> {
        let normalized = input.normalized(self.policy);
        normalized.validate()?;
        Ok(normalized)
    }
}

fn log_failure(event: &str, err: &BookServiceError) {
    warn!(
        "event={event} module=service status=error error_kind={} error={err}",
        err.kind().as_str()
    );
}
