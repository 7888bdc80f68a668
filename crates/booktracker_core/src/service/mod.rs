//! Core use-case services.
//!
//! # Responsibility
//! - Turn record-store primitives into atomic catalog operations.
//! - Keep boundary layers (API envelopes, CLI) free of storage details.

pub mod book_service;
