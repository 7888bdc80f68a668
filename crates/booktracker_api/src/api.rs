//! Use-case API consumed by transport adapters.
//!
//! # Responsibility
//! - Expose `list_books`, `get_book`, `create_book`, `update_book`,
//!   `delete_book`, `set_status` and the ISBN lookups as stable
//!   envelope-returning calls.
//! - Translate core errors into `{kind, message}` without losing the class.
//!
//! # Invariants
//! - Calls never panic; every failure is an `ok=false` envelope.
//! - Each call opens its own connection and drops it before returning.

use crate::config::ApiConfig;
use booktracker_core::db::open_db;
use booktracker_core::{
    init_logging, Book, BookId, BookInput, BookService, BookServiceError, BookSource,
    CatalogStats, ErrorKind, ServiceResult, SqliteBookRepository,
};
use log::{debug, warn};
use serde::Serialize;

/// Failure half of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    fn storage(message: String) -> Self {
        Self {
            kind: ErrorKind::Storage,
            message,
        }
    }

    /// Conventional HTTP status for this failure class.
    pub fn http_status(&self) -> u16 {
        match self.kind {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Storage => 500,
            ErrorKind::Source => 502,
        }
    }
}

impl From<BookServiceError> for ApiError {
    fn from(value: BookServiceError) -> Self {
        Self {
            kind: value.kind(),
            message: value.to_string(),
        }
    }
}

/// Response envelope: `data` on success, `error` on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(error: ApiError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(error),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Serializes the envelope for the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            serde_json::json!({
                "ok": false,
                "error": {
                    "kind": ErrorKind::Storage.as_str(),
                    "message": format!("response encoding failed: {err}"),
                },
            })
            .to_string()
        })
    }
}

/// Payload of a successful create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Created {
    pub id: BookId,
}

/// Entry point for boundary layers.
#[derive(Debug, Clone)]
pub struct BookApi {
    config: ApiConfig,
}

impl BookApi {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    /// API configured from `BOOKTRACKER_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env())
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when logging is not configured.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(log_dir) = self.config.log_dir.as_ref() else {
            return Ok(false);
        };
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| format!("log_dir is not valid UTF-8: {}", log_dir.display()))?;
        init_logging(&self.config.log_level, log_dir)?;
        Ok(true)
    }

    /// All books in catalog order.
    pub fn list_books(&self) -> ApiResponse<Vec<Book>> {
        ApiResponse::from_result(self.with_service("list_books", |service| service.list()))
    }

    pub fn get_book(&self, id: BookId) -> ApiResponse<Book> {
        ApiResponse::from_result(self.with_service("get_book", |service| service.read(id)))
    }

    pub fn create_book(&self, input: &BookInput) -> ApiResponse<Created> {
        ApiResponse::from_result(self.with_service("create_book", |service| {
            service.create(input).map(|id| Created { id })
        }))
    }

    /// Like [`BookApi::create_book`] for a JSON request body.
    ///
    /// A body that does not decode is a validation failure.
    pub fn create_book_json(&self, body: &str) -> ApiResponse<Created> {
        match decode_input(body) {
            Ok(input) => self.create_book(&input),
            Err(error) => ApiResponse::failure(error),
        }
    }

    pub fn update_book(&self, id: BookId, input: &BookInput) -> ApiResponse<()> {
        ApiResponse::from_result(
            self.with_service("update_book", |service| service.update(id, input)),
        )
    }

    /// Like [`BookApi::update_book`] for a JSON request body.
    pub fn update_book_json(&self, id: BookId, body: &str) -> ApiResponse<()> {
        match decode_input(body) {
            Ok(input) => self.update_book(id, &input),
            Err(error) => ApiResponse::failure(error),
        }
    }

    pub fn delete_book(&self, id: BookId) -> ApiResponse<()> {
        ApiResponse::from_result(self.with_service("delete_book", |service| service.delete(id)))
    }

    /// Sets `status` (`read` / `not_read`) on one book.
    pub fn set_status(&self, id: BookId, status: &str) -> ApiResponse<()> {
        ApiResponse::from_result(
            self.with_service("set_status", |service| service.set_status(id, status)),
        )
    }

    pub fn stats(&self) -> ApiResponse<CatalogStats> {
        ApiResponse::from_result(self.with_service("stats", |service| service.stats()))
    }

    /// Fetches metadata for `isbn` from `source` for review; nothing is saved.
    ///
    /// No record is `not_found`; a failing source is `source`.
    pub fn lookup_isbn(&self, source: &dyn BookSource, isbn: i64) -> ApiResponse<BookInput> {
        ApiResponse::from_result(self.with_service("lookup_isbn", |service| {
            service.lookup_from_source(source, isbn)
        }))
    }

    /// Looks `isbn` up in `source` and saves the result as a new book.
    pub fn create_book_from_source(
        &self,
        source: &dyn BookSource,
        isbn: i64,
    ) -> ApiResponse<Created> {
        ApiResponse::from_result(self.with_service("create_book_from_source", |service| {
            service
                .create_from_source(source, isbn)
                .map(|id| Created { id })
        }))
    }

    fn with_service<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&BookService<SqliteBookRepository<'_>>) -> ServiceResult<T>,
    ) -> Result<T, ApiError> {
        let conn = open_db(&self.config.db_path)
            .map_err(|err| ApiError::storage(format!("{operation} failed: database open: {err}")))?;
        let repo = SqliteBookRepository::try_new(&conn)
            .map_err(|err| ApiError::storage(format!("{operation} failed: {err}")))?;
        let service = BookService::with_policy(repo, self.config.normalization);

        match f(&service) {
            Ok(value) => {
                debug!("event=api_call module=api status=ok op={operation}");
                Ok(value)
            }
            Err(err) => {
                let error = ApiError::from(err);
                warn!(
                    "event=api_call module=api status=error op={operation} error_kind={}",
                    error.kind.as_str()
                );
                Err(error)
            }
        }
    }
}

fn decode_input(body: &str) -> Result<BookInput, ApiError> {
    serde_json::from_str(body).map_err(|err| ApiError {
        kind: ErrorKind::Validation,
        message: format!("invalid book payload: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::{ApiResponse, Created};
    use serde::ser::Error as _;
    use serde::{Serialize, Serializer};

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("bad \"value\"\nhere"))
        }
    }

    #[test]
    fn encoding_failure_still_yields_valid_json() {
        let response = ApiResponse {
            ok: true,
            data: Some(Unencodable),
            error: None,
        };

        let json: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["kind"], "storage");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("bad \"value\""));
    }

    #[test]
    fn success_envelope_omits_error() {
        let json = ApiResponse::success(Created { id: 7 }).to_json();
        assert_eq!(json, r#"{"ok":true,"data":{"id":7}}"#);
    }
}
