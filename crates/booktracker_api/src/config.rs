//! Environment-driven settings for the boundary API.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `BOOKTRACKER_DB_PATH` | catalog database file | `<temp>/booktracker.sqlite3` |
//! | `BOOKTRACKER_LOG_LEVEL` | `trace..error` | `debug` (debug build) / `info` |
//! | `BOOKTRACKER_LOG_DIR` | absolute log directory | unset: no file logging |
//! | `BOOKTRACKER_CAPITALIZE_NAMES` | `0/false/off` disables name capitalization | on |

use booktracker_core::{default_log_level, NormalizationPolicy};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "BOOKTRACKER_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "BOOKTRACKER_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "BOOKTRACKER_LOG_DIR";
pub const CAPITALIZE_NAMES_ENV: &str = "BOOKTRACKER_CAPITALIZE_NAMES";

const DEFAULT_DB_FILE_NAME: &str = "booktracker.sqlite3";

/// Resolved settings for one `BookApi` instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub normalization: NormalizationPolicy,
}

impl ApiConfig {
    /// Settings for `db_path` with every other value at its default.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            normalization: NormalizationPolicy::default(),
        }
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let mut config = Self::new(db_path);

        if let Some(level) = read(LOG_LEVEL_ENV) {
            config.log_level = level;
        }
        config.log_dir = read(LOG_DIR_ENV).map(PathBuf::from);
        if let Some(capitalize) = read(CAPITALIZE_NAMES_ENV).and_then(|raw| parse_flag(&raw)) {
            config.normalization.capitalize_names = capitalize;
        }

        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
