//! Data-cleaning helpers built on the facade.
//!
//! # Responsibility
//! - In-place hygiene passes over existing tables: whitespace trimming,
//!   empty-string normalization, duplicate-row removal.
//!
//! # Invariants
//! - Multi-statement passes run inside one transaction per call.
//! - Table and column names pass the same identifier checks as queries.

use crate::client::DbClient;
use crate::db::{DbError, DbResult};
use crate::sql::ident::quote_ident;
use log::debug;

/// Strips leading/trailing whitespace from the given text columns.
///
/// Returns the number of changed rows across all columns; an empty
/// column list is a no-op. NULL cells are left untouched.
pub fn trim_text_columns(db: &DbClient, table: &str, columns: &[&str]) -> DbResult<usize> {
    if columns.is_empty() {
        return Ok(0);
    }
    let table_sql = quote_ident(table)?;

    db.transaction(|db| {
        let mut changed = 0;
        for column in columns {
            let col = quote_ident(column)?;
            changed += db.execute(
                &format!("UPDATE {table_sql} SET {col} = trim({col}) WHERE {col} <> trim({col})"),
                &[],
            )?;
        }
        debug!("event=clean_op module=clean status=ok op=trim table={table} changed={changed}");
        Ok(changed)
    })
}

/// Replaces empty-string cells with NULL in the given columns.
///
/// Returns the number of changed rows across all columns.
pub fn nullify_empty_strings(db: &DbClient, table: &str, columns: &[&str]) -> DbResult<usize> {
    if columns.is_empty() {
        return Ok(0);
    }
    let table_sql = quote_ident(table)?;

    db.transaction(|db| {
        let mut changed = 0;
        for column in columns {
            let col = quote_ident(column)?;
            changed += db.execute(
                &format!("UPDATE {table_sql} SET {col} = NULL WHERE {col} = ''"),
                &[],
            )?;
        }
        debug!("event=clean_op module=clean status=ok op=nullify table={table} changed={changed}");
        Ok(changed)
    })
}

/// Deletes rows duplicating earlier rows on `key_columns`, keeping the
/// row with the lowest rowid in each group. Returns the deleted count.
pub fn dedupe_rows(db: &DbClient, table: &str, key_columns: &[&str]) -> DbResult<usize> {
    if key_columns.is_empty() {
        return Err(DbError::InvalidData(
            "dedupe requires at least one key column".to_string(),
        ));
    }

    let table_sql = quote_ident(table)?;
    let keys = key_columns
        .iter()
        .map(|name| quote_ident(name))
        .collect::<DbResult<Vec<_>>>()?
        .join(", ");

    let deleted = db.execute(
        &format!(
            "DELETE FROM {table_sql} WHERE rowid NOT IN \
             (SELECT MIN(rowid) FROM {table_sql} GROUP BY {keys})"
        ),
        &[],
    )?;
    debug!("event=clean_op module=clean status=ok op=dedupe table={table} deleted={deleted}");
    Ok(deleted)
}
