//! Repository layer: record store and author reconciliation.
//!
//! # Responsibility
//! - Keep SQLite query details out of the service layer.
//! - Report semantic errors (`NotFound`) alongside transport errors.
//!
//! # Invariants
//! - Repository calls join the caller's transaction; only
//!   `BookRepository::atomic` opens one.

pub mod author_repo;
pub mod book_repo;
