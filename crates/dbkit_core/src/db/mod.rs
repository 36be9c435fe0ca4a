//! SQLite connection bootstrap and shared error types.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the dbkit facade.
//! - Define the error surface shared by every facade operation.
//!
//! # Invariants
//! - Caller-supplied values are bound through driver placeholders; the
//!   error variants here exist so identifier and fragment checks can
//!   reject everything else before it reaches SQL text.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Error surface for every facade operation.
#[derive(Debug)]
pub enum DbError {
    /// Driver-level failure, passed through unchanged.
    Sqlite(rusqlite::Error),
    /// A caller-supplied SQL fragment matched the injection blocklist.
    UnsafeSql {
        fragment: String,
        reason: &'static str,
    },
    /// A table or column name failed identifier validation.
    InvalidIdentifier(String),
    /// An update or delete was issued with no filter conditions.
    EmptyFilter { operation: &'static str },
    /// Input that is structurally unusable (empty row data, zero page size).
    InvalidData(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsafeSql { fragment, reason } => {
                write!(f, "unsafe sql fragment rejected ({reason}): `{fragment}`")
            }
            Self::InvalidIdentifier(name) => write!(f, "invalid sql identifier: `{name}`"),
            Self::EmptyFilter { operation } => {
                write!(
                    f,
                    "{operation} requires at least one filter condition; use truncate_table for full clears"
                )
            }
            Self::InvalidData(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Connection configuration consumed by [`open_db`].
///
/// Serde-derived so host applications can load it straight from their
/// own config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database file path.
    pub path: PathBuf,
    /// Busy handler timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// Whether to enforce foreign keys on the connection.
    pub foreign_keys: bool,
}

impl Config {
    /// Creates a config for the given path with default pragmas.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dbkit.db"),
            busy_timeout_ms: 5_000,
            foreign_keys: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, DbError};

    #[test]
    fn config_default_enables_foreign_keys() {
        let config = Config::default();
        assert!(config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = Config::new("/tmp/app.db");
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.path, config.path);
        assert_eq!(back.busy_timeout_ms, config.busy_timeout_ms);
    }

    #[test]
    fn driver_errors_propagate_through_question_mark() {
        fn run() -> super::DbResult<()> {
            let conn = rusqlite::Connection::open_in_memory()?;
            conn.execute("SELECT * FROM missing_table", [])?;
            Ok(())
        }
        assert!(matches!(run().unwrap_err(), DbError::Sqlite(_)));
    }

    #[test]
    fn empty_filter_message_names_the_operation() {
        let err = DbError::EmptyFilter {
            operation: "delete",
        };
        assert!(err.to_string().contains("delete"));
    }
}
