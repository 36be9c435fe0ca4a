//! Connection bootstrap for the facade.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply configured pragmas before handing the connection to callers.
//!
//! # Invariants
//! - Returned handles have the busy timeout and foreign-key pragma from
//!   [`Config`] applied.

use super::{Config, DbResult};
use crate::client::DbClient;
use log::{error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens a SQLite database file described by `config`.
///
/// # Side effects
/// - Emits `event=db_open` log lines with duration and status.
pub fn open_db(config: &Config) -> DbResult<DbClient> {
    bootstrap("file", config, || Connection::open(&config.path))
}

/// Opens a private in-memory database with default pragmas.
///
/// Used heavily by tests; behaves exactly like [`open_db`] otherwise.
pub fn open_db_in_memory() -> DbResult<DbClient> {
    let config = Config::default();
    bootstrap("memory", &config, Connection::open_in_memory)
}

fn bootstrap(
    mode: &str,
    config: &Config,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<DbClient> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = open()
        .map_err(Into::into)
        .and_then(|conn| configure(conn, config));

    match result {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(DbClient::new(conn))
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure(conn: Connection, config: &Config) -> DbResult<Connection> {
    // The bundled SQLite defaults foreign_keys to ON, so the flag must
    // be written out either way.
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(conn)
}
