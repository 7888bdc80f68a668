//! Domain model for the book catalog.
//!
//! # Invariants
//! - Authors have no lifecycle of their own; they exist while referenced.
//! - Reading status is optional per book and owned by it.

pub mod book;
pub mod normalize;
