//! Boundary facade over `booktracker_core`.
//!
//! Transport adapters (HTTP handlers, CLI) call `BookApi` and forward the
//! `ApiResponse` envelopes; status-code mapping stays on their side.

pub mod api;
pub mod config;

pub use api::{ApiError, ApiResponse, BookApi, Created};
pub use config::ApiConfig;
