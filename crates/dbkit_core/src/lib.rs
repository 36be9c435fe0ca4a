//! Convenience facade over a SQLite connection: CRUD, schema management,
//! aggregation, pagination, batch insert, transactions and data-cleaning
//! helpers, all rendered as parameterized SQL and delegated to rusqlite.

pub mod clean;
pub mod client;
pub mod db;
pub mod logging;
pub mod query;
pub mod schema;
pub mod sql;

pub use clean::{dedupe_rows, nullify_empty_strings, trim_text_columns};
pub use client::DbClient;
pub use db::{open_db, open_db_in_memory, Config, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use query::{Condition, Filter, FilterOp, Page, Record, SelectOptions, SortOrder};
pub use schema::{AlterOp, ColumnDef, ColumnType, TableDef};

/// Returns the crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
