//! Author reconciliation against book references.
//!
//! # Responsibility
//! - Find-or-create author rows for a `(last, first)` name pair.
//! - Delete an author row once the last book pointing at it lets go.
//!
//! # Invariants
//! - At most one row per `(author_last, author_first)` (UNIQUE constraint).
//! - `release_author_if_orphaned` must run while the book still references
//!   its current author; the reference count it checks includes that book.
//! - Both functions run inside the caller's transaction. They never open or
//!   commit one themselves.

use crate::model::book::{AuthorId, BookId};
use crate::repo::book_repo::{RepoError, RepoResult};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};

/// Upper bound for insert-then-select rounds before giving up.
const ENSURE_AUTHOR_MAX_ATTEMPTS: u32 = 3;

/// Returns the id of the author named `(last, first)`, inserting it if absent.
///
/// A concurrent writer can make the insert a no-op and then remove the row
/// before the select sees it; that round is retried rather than reported.
pub fn ensure_author(conn: &Connection, last: &str, first: &str) -> RepoResult<AuthorId> {
    for attempt in 1..=ENSURE_AUTHOR_MAX_ATTEMPTS {
        let inserted = conn.execute(
            "INSERT INTO authors (author_last, author_first)
             VALUES (?1, ?2)
             ON CONFLICT (author_last, author_first) DO NOTHING;",
            params![last, first],
        )?;

        let found: Option<AuthorId> = conn
            .query_row(
                "SELECT id
                 FROM authors
                 WHERE author_last = ?1
                   AND author_first = ?2;",
                params![last, first],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(author_id) = found {
            debug!(
                "event=author_ensure module=repo status=ok author_id={author_id} created={} attempt={attempt}",
                inserted > 0
            );
            return Ok(author_id);
        }

        warn!("event=author_ensure module=repo status=retry attempt={attempt}");
    }

    Err(RepoError::AuthorConflict {
        attempts: ENSURE_AUTHOR_MAX_ATTEMPTS,
    })
}

/// Deletes the current author of `book_id` when that book is its only reference.
///
/// Returns the id of the removed author, or `None` when other books still
/// reference it.
///
/// # Errors
/// - `RepoError::NotFound` when `book_id` does not exist.
pub fn release_author_if_orphaned(
    conn: &Connection,
    book_id: BookId,
) -> RepoResult<Option<AuthorId>> {
    let author_id: AuthorId = conn
        .query_row(
            "SELECT author_id FROM books WHERE id = ?1;",
            [book_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(RepoError::NotFound(book_id))?;

    let removed = conn.execute(
        "DELETE FROM authors
         WHERE id = ?1
           AND (SELECT COUNT(*) FROM books WHERE author_id = ?1) = 1;",
        [author_id],
    )?;

    debug!(
        "event=author_release module=repo status=ok book_id={book_id} author_id={author_id} removed={}",
        removed > 0
    );
    Ok((removed > 0).then_some(author_id))
}
