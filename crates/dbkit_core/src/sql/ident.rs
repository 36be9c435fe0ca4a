//! Identifier validation and quoting.
//!
//! # Responsibility
//! - Gate every table/column name before it is interpolated into SQL.
//!
//! # Invariants
//! - Only `[A-Za-z_][A-Za-z0-9_]*` names pass; everything else is an
//!   `InvalidIdentifier` error, never a silent rewrite.
//! - Accepted names are emitted double-quoted, so reserved words stay
//!   usable as table or column names.

use crate::db::{DbError, DbResult};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile"));

/// Validates a single table or column identifier.
pub fn check_ident(name: &str) -> DbResult<()> {
    if IDENT.is_match(name) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

/// Validates and double-quotes an identifier for emission into SQL text.
pub fn quote_ident(name: &str) -> DbResult<String> {
    check_ident(name)?;
    Ok(format!("\"{name}\""))
}

/// Validates a list of column names, quoting each one.
pub fn quote_idents<'a>(names: impl IntoIterator<Item = &'a str>) -> DbResult<Vec<String>> {
    names.into_iter().map(quote_ident).collect()
}
