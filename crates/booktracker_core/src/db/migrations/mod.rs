//! Embedded catalog schema and its versioned upgrade steps.
//!
//! # Responsibility
//! - Own the SQL that defines `authors`, `books` and `read_status`.
//! - Bring a connection from any older schema version to the latest one.
//!
//! # Invariants
//! - Step versions are strictly increasing, starting at 1.
//! - The applied version lives in `PRAGMA user_version` and is bumped inside
//!   the same transaction as the step SQL.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "catalog_init",
    sql: include_str!("0001_init.sql"),
}];

/// Returns the schema version this build writes and expects.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Reads the schema version recorded on the connection.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Applies every step newer than the recorded version and returns how many
/// steps ran.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the file was written by a newer
///   build. The database is left untouched in that case.
/// - `DbError::SchemaStep` naming the first step that failed; earlier steps of
///   the same run are rolled back with it.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let recorded = schema_version(conn)?;
    let latest = latest_version();

    if recorded > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: recorded,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > recorded)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::SchemaStep {
                version: step.version,
                name: step.name,
                source,
            })?;
        info!(
            "event=schema_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    Ok(pending.len())
}
