//! Catalog storage: connection setup and embedded schema.
//!
//! Every connection handed out by [`open_db`] / [`open_db_in_memory`] has
//! foreign keys enforced and the catalog schema at the latest version.
//!
//! # Invariants
//! - `books.author_id` is checked at commit, not per statement. Author
//!   reconciliation relies on this to release and re-ensure an author inside
//!   one transaction.
//! - `read_status` rows disappear with their book (`ON DELETE CASCADE`).
//! - The schema version lives in `PRAGMA user_version`; a file written by a
//!   newer build is refused, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or upgrading a catalog database.
#[derive(Debug)]
pub enum DbError {
    /// Connection or pragma failure.
    Sqlite(rusqlite::Error),
    /// One schema step failed; the upgrade was rolled back as a whole.
    SchemaStep {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The file carries a schema this build does not know.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "catalog database error: {err}"),
            Self::SchemaStep {
                version,
                name,
                source,
            } => write!(f, "schema step {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "catalog schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::SchemaStep { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
