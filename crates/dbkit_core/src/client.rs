//! The convenience facade over one SQLite connection.
//!
//! # Responsibility
//! - Expose CRUD, aggregation, pagination, batch, schema and transaction
//!   operations as typed methods.
//! - Delegate statement preparation, binding and row materialization to
//!   the driver; this layer never parses SQL itself.
//!
//! # Invariants
//! - Every statement executed here came out of the builder or passed the
//!   raw-statement guard.
//! - `last_error` always describes the most recent failed facade call.

use crate::db::{DbError, DbResult};
use crate::query::{Filter, Page, Record, SelectOptions};
use crate::schema::{AlterOp, TableDef};
use crate::sql::builder::{
    build_aggregate, build_delete, build_insert, build_insert_template, build_select,
    build_update, build_upsert, AggFunc,
};
use crate::sql::guard::check_statement;
use crate::sql::ident::quote_ident;
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::cell::RefCell;

/// Facade handle owning one SQLite connection.
///
/// Obtained from [`open_db`](crate::db::open_db) or
/// [`open_db_in_memory`](crate::db::open_db_in_memory); dropped (or
/// [`close`](Self::close)d) when the caller is done.
pub struct DbClient {
    conn: Connection,
    last_error: RefCell<Option<String>>,
}

impl DbClient {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            conn,
            last_error: RefCell::new(None),
        }
    }

    /// Consumes the handle and closes the connection.
    pub fn close(self) {
        info!("event=db_close module=client status=ok");
    }

    /// Returns the message of the most recent failed operation, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    // -- writes ----------------------------------------------------------

    /// Inserts one row and returns its rowid.
    pub fn insert(&self, table: &str, data: &[(&str, Value)]) -> DbResult<i64> {
        self.track(build_insert(table, data).and_then(|(sql, values)| {
            self.run_execute(&sql, values)?;
            Ok(self.conn.last_insert_rowid())
        }))
    }

    /// Inserts many rows with one prepared statement inside one
    /// transaction. Returns the inserted count; an arity mismatch on any
    /// row aborts the whole batch.
    pub fn insert_many(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
    ) -> DbResult<usize> {
        let result = self.insert_many_tx(table, columns, rows);
        self.track(result)
    }

    fn insert_many_tx(&self, table: &str, columns: &[&str], rows: &[Vec<Value>]) -> DbResult<usize> {
        let sql = build_insert_template(table, columns)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (index, row) in rows.iter().enumerate() {
                if row.len() != columns.len() {
                    return Err(DbError::InvalidData(format!(
                        "batch row {index} has {} values, expected {}",
                        row.len(),
                        columns.len()
                    )));
                }
                stmt.execute(params_from_iter(row.iter().cloned()))?;
            }
        }
        tx.commit()?;

        debug!(
            "event=batch_insert module=client status=ok table={table} rows={}",
            rows.len()
        );
        Ok(rows.len())
    }

    /// Inserts or updates on conflict over the given key columns.
    /// Returns the affected-row count.
    pub fn upsert(
        &self,
        table: &str,
        data: &[(&str, Value)],
        conflict_columns: &[&str],
    ) -> DbResult<usize> {
        self.track(
            build_upsert(table, data, conflict_columns)
                .and_then(|(sql, values)| self.run_execute(&sql, values)),
        )
    }

    /// Updates rows matching `filter`. Empty filters are rejected.
    pub fn update(&self, table: &str, data: &[(&str, Value)], filter: &Filter) -> DbResult<usize> {
        self.track(
            build_update(table, data, filter)
                .and_then(|(sql, values)| self.run_execute(&sql, values)),
        )
    }

    /// Deletes rows matching `filter`. Empty filters are rejected.
    pub fn delete(&self, table: &str, filter: &Filter) -> DbResult<usize> {
        self.track(
            build_delete(table, filter).and_then(|(sql, values)| self.run_execute(&sql, values)),
        )
    }

    // -- reads -----------------------------------------------------------

    /// Selects rows per the given options.
    pub fn select(&self, table: &str, options: &SelectOptions) -> DbResult<Vec<Record>> {
        self.track(
            build_select(table, options).and_then(|(sql, values)| self.run_select(&sql, values)),
        )
    }

    /// Selects the first matching row, forcing `LIMIT 1`.
    pub fn find_one(&self, table: &str, options: &SelectOptions) -> DbResult<Option<Record>> {
        let mut options = options.clone();
        options.limit = Some(1);
        Ok(self.select(table, &options)?.into_iter().next())
    }

    /// Returns one value of one column from the first matching row.
    pub fn scalar(
        &self,
        table: &str,
        column: &str,
        options: &SelectOptions,
    ) -> DbResult<Option<Value>> {
        let mut options = options.clone();
        options.columns = Some(vec![column.to_string()]);
        Ok(self
            .find_one(table, &options)?
            .and_then(|record| record.fields.into_iter().next())
            .map(|(_, value)| value))
    }

    /// Returns one column across all matching rows.
    pub fn column_values(
        &self,
        table: &str,
        column: &str,
        options: &SelectOptions,
    ) -> DbResult<Vec<Value>> {
        let mut options = options.clone();
        options.columns = Some(vec![column.to_string()]);
        let records = self.select(table, &options)?;
        Ok(records
            .into_iter()
            .filter_map(|record| record.fields.into_iter().next())
            .map(|(_, value)| value)
            .collect())
    }

    // -- aggregation -----------------------------------------------------

    /// Counts rows matching `filter`.
    pub fn count(&self, table: &str, filter: &Filter) -> DbResult<u64> {
        let value = self.aggregate(table, AggFunc::Count, None, filter)?;
        match value {
            Some(Value::Integer(n)) => u64::try_from(n)
                .map_err(|_| DbError::InvalidData(format!("negative count {n}"))),
            _ => Ok(0),
        }
    }

    /// Sums `column` over matching rows; `None` when nothing to sum.
    pub fn sum(&self, table: &str, column: &str, filter: &Filter) -> DbResult<Option<f64>> {
        self.numeric_aggregate(table, AggFunc::Sum, column, filter)
    }

    /// Averages `column` over matching rows; `None` when nothing to average.
    pub fn avg(&self, table: &str, column: &str, filter: &Filter) -> DbResult<Option<f64>> {
        self.numeric_aggregate(table, AggFunc::Avg, column, filter)
    }

    /// Minimum of `column` over matching rows.
    pub fn min(&self, table: &str, column: &str, filter: &Filter) -> DbResult<Option<Value>> {
        self.aggregate(table, AggFunc::Min, Some(column), filter)
    }

    /// Maximum of `column` over matching rows.
    pub fn max(&self, table: &str, column: &str, filter: &Filter) -> DbResult<Option<Value>> {
        self.aggregate(table, AggFunc::Max, Some(column), filter)
    }

    fn numeric_aggregate(
        &self,
        table: &str,
        func: AggFunc,
        column: &str,
        filter: &Filter,
    ) -> DbResult<Option<f64>> {
        let value = self.aggregate(table, func, Some(column), filter)?;
        match value {
            None | Some(Value::Null) => Ok(None),
            // SQLite returns INTEGER for integral sums.
            Some(Value::Integer(n)) => Ok(Some(n as f64)),
            Some(Value::Real(f)) => Ok(Some(f)),
            Some(other) => Err(DbError::InvalidData(format!(
                "non-numeric aggregate result on `{column}`: {other:?}"
            ))),
        }
    }

    fn aggregate(
        &self,
        table: &str,
        func: AggFunc,
        column: Option<&str>,
        filter: &Filter,
    ) -> DbResult<Option<Value>> {
        let result = build_aggregate(table, func, column, filter)
            .and_then(|(sql, values)| self.run_scalar(&sql, values))
            .map(|value| match value {
                Some(Value::Null) | None => None,
                other => other,
            });
        self.track(result)
    }

    // -- pagination ------------------------------------------------------

    /// Serves one 1-based page of results plus totals.
    ///
    /// `page` values below 1 are clamped to 1; `per_page` of 0 is an
    /// error. The total row count shares the select's filter.
    pub fn paginate(
        &self,
        table: &str,
        options: &SelectOptions,
        page: u32,
        per_page: u32,
    ) -> DbResult<Page> {
        let result = self.paginate_inner(table, options, page, per_page);
        self.track(result)
    }

    fn paginate_inner(
        &self,
        table: &str,
        options: &SelectOptions,
        page: u32,
        per_page: u32,
    ) -> DbResult<Page> {
        if per_page == 0 {
            return Err(DbError::InvalidData("per_page must be at least 1".to_string()));
        }
        let page = page.max(1);

        let total = self.count(table, &options.filter)?;

        let mut page_options = options.clone();
        page_options.limit = Some(per_page);
        page_options.offset = (page - 1).saturating_mul(per_page);
        let (sql, values) = build_select(table, &page_options)?;
        let rows = self.run_select(&sql, values)?;

        let page_count = total.div_ceil(u64::from(per_page));
        Ok(Page {
            rows,
            total,
            page,
            per_page,
            page_count: u32::try_from(page_count).unwrap_or(u32::MAX),
        })
    }

    // -- schema ----------------------------------------------------------

    /// Creates a table from a typed definition.
    pub fn create_table(&self, def: &TableDef) -> DbResult<()> {
        let result = def.render_create().and_then(|sql| {
            self.conn.execute(&sql, [])?;
            info!(
                "event=schema_op module=client status=ok op=create_table table={}",
                def.name
            );
            Ok(())
        });
        self.track(result)
    }

    /// Applies one ALTER TABLE operation.
    pub fn alter_table(&self, table: &str, op: &AlterOp) -> DbResult<()> {
        let result = op.render(table).and_then(|sql| {
            self.conn.execute(&sql, [])?;
            info!("event=schema_op module=client status=ok op=alter_table table={table}");
            Ok(())
        });
        self.track(result)
    }

    /// Drops a table, optionally tolerating its absence.
    pub fn drop_table(&self, table: &str, if_exists: bool) -> DbResult<()> {
        let result = quote_ident(table).and_then(|quoted| {
            let exists_clause = if if_exists { "IF EXISTS " } else { "" };
            self.conn
                .execute(&format!("DROP TABLE {exists_clause}{quoted}"), [])?;
            info!("event=schema_op module=client status=ok op=drop_table table={table}");
            Ok(())
        });
        self.track(result)
    }

    /// Clears all rows and resets the AUTOINCREMENT counter when one
    /// exists. Returns the number of deleted rows.
    pub fn truncate_table(&self, table: &str) -> DbResult<usize> {
        let result = self.truncate_tx(table);
        self.track(result)
    }

    fn truncate_tx(&self, table: &str) -> DbResult<usize> {
        let quoted = quote_ident(table)?;

        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute(&format!("DELETE FROM {quoted}"), [])?;
        let has_sequence: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type = 'table' AND name = 'sqlite_sequence'
            )",
            [],
            |row| row.get(0),
        )?;
        if has_sequence == 1 {
            tx.execute("DELETE FROM sqlite_sequence WHERE name = ?1", [table])?;
        }
        tx.commit()?;

        info!(
            "event=schema_op module=client status=ok op=truncate_table table={table} deleted={deleted}"
        );
        Ok(deleted)
    }

    // -- transactions ----------------------------------------------------

    /// Runs `f` inside a transaction: commit on `Ok`, rollback on `Err`
    /// or unwind. Nested calls surface the driver's error.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> DbResult<T>) -> DbResult<T> {
        let tx = match self.conn.unchecked_transaction() {
            Ok(tx) => tx,
            Err(err) => return self.track(Err(err.into())),
        };

        match f(self) {
            Ok(value) => {
                self.track(tx.commit().map_err(Into::into))?;
                debug!("event=txn module=client status=committed");
                Ok(value)
            }
            Err(err) => {
                // Dropping the transaction rolls it back.
                drop(tx);
                debug!("event=txn module=client status=rolled_back");
                self.track(Err(err))
            }
        }
    }

    // -- raw passthrough -------------------------------------------------

    /// Executes one guarded raw statement, returning the affected count.
    pub fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        self.track(
            check_statement(sql).and_then(|()| self.run_execute(sql, params.to_vec())),
        )
    }

    /// Runs one guarded raw query, materializing every row.
    pub fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        self.track(check_statement(sql).and_then(|()| self.run_select(sql, params.to_vec())))
    }

    // -- execution helpers -----------------------------------------------

    fn run_execute(&self, sql: &str, values: Vec<Value>) -> DbResult<usize> {
        let mut stmt = self.conn.prepare(sql)?;
        let changed = stmt.execute(params_from_iter(values))?;
        Ok(changed)
    }

    fn run_select(&self, sql: &str, values: Vec<Value>) -> DbResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query(params_from_iter(values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(column_names.len());
            for (index, name) in column_names.iter().enumerate() {
                fields.push((name.clone(), row.get::<_, Value>(index)?));
            }
            records.push(Record { fields });
        }
        Ok(records)
    }

    fn run_scalar(&self, sql: &str, values: Vec<Value>) -> DbResult<Option<Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get::<_, Value>(0)?)),
            None => Ok(None),
        }
    }

    fn track<T>(&self, result: DbResult<T>) -> DbResult<T> {
        if let Err(err) = &result {
            *self.last_error.borrow_mut() = Some(err.to_string());
        }
        result
    }
}
