//! Book record store: contracts and SQLite implementation.
//!
//! # Responsibility
//! - Raw CRUD over `books` and `read_status`, plus author reconciliation hooks.
//! - Own the transaction boundary that makes one service call atomic.
//! - Map joined rows into the `Book` aggregate.
//!
//! # Invariants
//! - Listing order is `author_last, author_first, year` ascending with NULL
//!   years last, then `id` to make ties deterministic.
//! - Deleting a book removes its status row in the same statement sequence.
//! - Read paths reject unknown status values instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::book::{Author, AuthorId, Book, BookDetails, BookId, BookInput, ReadStatus};
use crate::repo::author_repo;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const BOOK_SELECT_SQL: &str = "SELECT
    b.id,
    b.title,
    b.series,
    b.volume,
    b.year,
    b.language,
    b.genre,
    b.written_form,
    b.publisher,
    b.collection,
    b.isbn,
    a.id AS author_id,
    a.author_last,
    a.author_first,
    rs.status
FROM books b
INNER JOIN authors a ON a.id = b.author_id
LEFT JOIN read_status rs ON rs.book_id = b.id";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("authors", &["id", "author_last", "author_first"]),
    (
        "books",
        &[
            "id",
            "title",
            "author_id",
            "series",
            "volume",
            "year",
            "language",
            "genre",
            "written_form",
            "publisher",
            "collection",
            "isbn",
        ],
    ),
    ("read_status", &["book_id", "status"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for catalog persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// SQLite or bootstrap failure, including constraint violations.
    Db(DbError),
    /// No book with this id.
    NotFound(BookId),
    /// Persisted row cannot be mapped onto the domain model.
    InvalidData(String),
    /// `ensure_author` kept losing the row to concurrent writers.
    AuthorConflict { attempts: u32 },
    /// Connection schema is not at the expected version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "book not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted book data: {message}"),
            Self::AuthorConflict { attempts } => write!(
                f,
                "author row kept disappearing after {attempts} insert attempts"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "book repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "book repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "book repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row counts backing the catalog statistics view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub books: u64,
    pub authors: u64,
    pub read: u64,
    pub not_read: u64,
}

/// Record store for books, their status rows and author reconciliation.
///
/// Unit operations never open their own transaction; callers group them with
/// [`BookRepository::atomic`].
pub trait BookRepository {
    /// Runs `operation` as one transaction: commit on `Ok`, roll back otherwise.
    ///
    /// Not reentrant: calling `atomic` from inside `operation` fails.
    fn atomic<T, F>(&self, operation: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>;

    /// Inserts a book row pointing at `author_id` and returns its id.
    fn insert_book(&self, input: &BookInput, author_id: AuthorId) -> RepoResult<BookId>;
    /// Loads one book joined with its author and status.
    fn find_book(&self, id: BookId) -> RepoResult<Option<Book>>;
    /// Loads every book in catalog order.
    fn list_books(&self) -> RepoResult<Vec<Book>>;
    /// Overwrites every mutable column of one book.
    fn update_book(&self, id: BookId, input: &BookInput, author_id: AuthorId) -> RepoResult<()>;
    /// Deletes one book and its status row.
    fn delete_book(&self, id: BookId) -> RepoResult<()>;
    /// Sets the reading status, inserting the row on first use.
    fn upsert_status(&self, id: BookId, status: ReadStatus) -> RepoResult<()>;
    fn book_exists(&self, id: BookId) -> RepoResult<bool>;
    fn catalog_counts(&self) -> RepoResult<CatalogCounts>;

    /// See [`author_repo::ensure_author`].
    fn ensure_author(&self, last: &str, first: &str) -> RepoResult<AuthorId>;
    /// See [`author_repo::release_author_if_orphaned`].
    fn release_author_if_orphaned(&self, book_id: BookId) -> RepoResult<Option<AuthorId>>;
}

/// SQLite-backed record store borrowing one connection.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    /// Creates a repository over a connection returned by `open_db*`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version does not match.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` for a foreign schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_catalog_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn atomic<T, F>(&self, operation: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>,
    {
        // Dropping an uncommitted transaction rolls it back.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let value = operation(self)?;
        tx.commit()?;
        Ok(value)
    }

    fn insert_book(&self, input: &BookInput, author_id: AuthorId) -> RepoResult<BookId> {
        let details = &input.details;
        self.conn.execute(
            "INSERT INTO books (
                title,
                author_id,
                series,
                volume,
                year,
                language,
                genre,
                written_form,
                publisher,
                collection,
                isbn
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                input.title.as_str(),
                author_id,
                details.series.as_deref(),
                details.volume,
                details.year,
                details.language.as_deref(),
                details.genre.as_deref(),
                details.written_form.as_deref(),
                details.publisher.as_deref(),
                details.collection.as_deref(),
                details.isbn,
            ],
        )?;

        let book_id = self.conn.last_insert_rowid();
        debug!("event=book_insert module=repo status=ok book_id={book_id} author_id={author_id}");
        Ok(book_id)
    }

    fn find_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOK_SELECT_SQL} WHERE b.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_book_row(row)?));
        }
        Ok(None)
    }

    fn list_books(&self) -> RepoResult<Vec<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL}
             ORDER BY
                a.author_last ASC,
                a.author_first ASC,
                b.year ASC NULLS LAST,
                b.id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }
        Ok(books)
    }

    fn update_book(&self, id: BookId, input: &BookInput, author_id: AuthorId) -> RepoResult<()> {
        let details = &input.details;
        let changed = self.conn.execute(
            "UPDATE books
             SET
                title = ?1,
                author_id = ?2,
                series = ?3,
                volume = ?4,
                year = ?5,
                language = ?6,
                genre = ?7,
                written_form = ?8,
                publisher = ?9,
                collection = ?10,
                isbn = ?11
             WHERE id = ?12;",
            params![
                input.title.as_str(),
                author_id,
                details.series.as_deref(),
                details.volume,
                details.year,
                details.language.as_deref(),
                details.genre.as_deref(),
                details.written_form.as_deref(),
                details.publisher.as_deref(),
                details.collection.as_deref(),
                details.isbn,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_book(&self, id: BookId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM read_status WHERE book_id = ?1;", [id])?;
        let changed = self.conn.execute("DELETE FROM books WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn upsert_status(&self, id: BookId, status: ReadStatus) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO read_status (book_id, status)
             VALUES (?1, ?2)
             ON CONFLICT (book_id) DO UPDATE SET status = excluded.status;",
            params![id, status.as_str()],
        )?;
        Ok(())
    }

    fn book_exists(&self, id: BookId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM books WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn catalog_counts(&self) -> RepoResult<CatalogCounts> {
        let counts = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM books),
                (SELECT COUNT(*) FROM authors),
                (SELECT COUNT(*) FROM read_status WHERE status = 'read'),
                (SELECT COUNT(*) FROM read_status WHERE status = 'not_read');",
            [],
            |row| {
                Ok(CatalogCounts {
                    books: row.get(0)?,
                    authors: row.get(1)?,
                    read: row.get(2)?,
                    not_read: row.get(3)?,
                })
            },
        )?;
        Ok(counts)
    }

    fn ensure_author(&self, last: &str, first: &str) -> RepoResult<AuthorId> {
        author_repo::ensure_author(self.conn, last, first)
    }

    fn release_author_if_orphaned(&self, book_id: BookId) -> RepoResult<Option<AuthorId>> {
        author_repo::release_author_if_orphaned(self.conn, book_id)
    }
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let status = match row.get::<_, Option<String>>("status")? {
        Some(value) => Some(ReadStatus::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid status `{value}` in read_status.status"))
        })?),
        None => None,
    };

    Ok(Book {
        id: row.get("id")?,
        title: row.get("title")?,
        author: Author {
            id: row.get("author_id")?,
            last_name: row.get("author_last")?,
            first_name: row.get("author_first")?,
        },
        details: BookDetails {
            series: row.get("series")?,
            volume: row.get("volume")?,
            year: row.get("year")?,
            language: row.get("language")?,
            genre: row.get("genre")?,
            written_form: row.get("written_form")?,
            publisher: row.get("publisher")?,
            collection: row.get("collection")?,
            isbn: row.get("isbn")?,
        },
        status,
    })
}

fn ensure_catalog_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for (table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(*table));
        }
        for column in columns.iter() {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn {
                    table: *table,
                    column: *column,
                });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
