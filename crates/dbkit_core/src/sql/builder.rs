//! SQL statement assembly.
//!
//! # Responsibility
//! - Turn typed query inputs into SQL text plus a parallel bind vector.
//!
//! # Invariants
//! - Identifiers pass [`ident`](super::ident) checks before emission.
//! - Raw filter fragments pass [`guard`](super::guard) checks.
//! - Caller values only ever appear as `?` placeholders.

use super::guard::check_fragment;
use super::ident::{quote_ident, quote_idents};
use crate::db::{DbError, DbResult};
use crate::query::{Condition, Filter, FilterOp, SelectOptions, SortOrder};
use rusqlite::types::Value;

/// Aggregate functions exposed by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

/// Builds a SELECT statement from projection, filter and paging options.
pub fn build_select(table: &str, options: &SelectOptions) -> DbResult<(String, Vec<Value>)> {
    let mut sql = String::from("SELECT ");
    match &options.columns {
        Some(columns) if !columns.is_empty() => {
            let quoted = quote_idents(columns.iter().map(String::as_str))?;
            sql.push_str(&quoted.join(", "));
        }
        _ => sql.push('*'),
    }
    sql.push_str(" FROM ");
    sql.push_str(&quote_ident(table)?);

    let mut values = Vec::new();
    append_where(&mut sql, &mut values, &options.filter)?;
    append_order_by(&mut sql, &options.order_by)?;
    append_paging(&mut sql, &mut values, options.limit, options.offset);

    Ok((sql, values))
}

/// Builds an aggregate query sharing the SELECT filter semantics.
///
/// `column` is `None` only for `COUNT`, which renders as `COUNT(*)`.
pub fn build_aggregate(
    table: &str,
    func: AggFunc,
    column: Option<&str>,
    filter: &Filter,
) -> DbResult<(String, Vec<Value>)> {
    let target = match column {
        Some(name) => quote_ident(name)?,
        None if func == AggFunc::Count => "*".to_string(),
        None => {
            return Err(DbError::InvalidData(format!(
                "{} requires a column",
                func.as_sql()
            )));
        }
    };

    let mut sql = format!(
        "SELECT {}({target}) FROM {}",
        func.as_sql(),
        quote_ident(table)?
    );
    let mut values = Vec::new();
    append_where(&mut sql, &mut values, filter)?;
    Ok((sql, values))
}

/// Builds a single-row INSERT from column/value pairs.
pub fn build_insert(table: &str, data: &[(&str, Value)]) -> DbResult<(String, Vec<Value>)> {
    if data.is_empty() {
        return Err(DbError::InvalidData("insert with no columns".to_string()));
    }

    let sql = insert_template(table, data.iter().map(|(name, _)| *name))?;
    let values = data.iter().map(|(_, value)| value.clone()).collect();
    Ok((sql, values))
}

/// Builds the reusable INSERT template for batch inserts: one statement
/// prepared once and executed per row.
pub fn build_insert_template(table: &str, columns: &[&str]) -> DbResult<String> {
    if columns.is_empty() {
        return Err(DbError::InvalidData(
            "batch insert with no columns".to_string(),
        ));
    }
    insert_template(table, columns.iter().copied())
}

/// Builds an upsert: `INSERT ... ON CONFLICT(keys) DO UPDATE SET` for
/// every non-key column, `DO NOTHING` when the row is all keys.
pub fn build_upsert(
    table: &str,
    data: &[(&str, Value)],
    conflict_columns: &[&str],
) -> DbResult<(String, Vec<Value>)> {
    if conflict_columns.is_empty() {
        return Err(DbError::InvalidData(
            "upsert requires conflict columns".to_string(),
        ));
    }

    let (mut sql, values) = build_insert(table, data)?;

    let keys = quote_idents(conflict_columns.iter().copied())?;
    sql.push_str(" ON CONFLICT(");
    sql.push_str(&keys.join(", "));
    sql.push(')');

    let mut updates = Vec::new();
    for (name, _) in data {
        if conflict_columns.contains(name) {
            continue;
        }
        let quoted = quote_ident(name)?;
        updates.push(format!("{quoted} = excluded.{quoted}"));
    }

    if updates.is_empty() {
        sql.push_str(" DO NOTHING");
    } else {
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&updates.join(", "));
    }

    Ok((sql, values))
}

/// Builds an UPDATE; refuses an empty filter so a forgotten condition
/// cannot rewrite the whole table.
pub fn build_update(
    table: &str,
    data: &[(&str, Value)],
    filter: &Filter,
) -> DbResult<(String, Vec<Value>)> {
    if data.is_empty() {
        return Err(DbError::InvalidData("update with no columns".to_string()));
    }
    if filter.is_empty() {
        return Err(DbError::EmptyFilter {
            operation: "update",
        });
    }

    let mut sql = format!("UPDATE {} SET ", quote_ident(table)?);
    let mut values = Vec::new();
    let mut assignments = Vec::new();
    for (name, value) in data {
        assignments.push(format!("{} = ?", quote_ident(name)?));
        values.push(value.clone());
    }
    sql.push_str(&assignments.join(", "));

    append_where(&mut sql, &mut values, filter)?;
    Ok((sql, values))
}

/// Builds a DELETE; same empty-filter refusal as [`build_update`].
pub fn build_delete(table: &str, filter: &Filter) -> DbResult<(String, Vec<Value>)> {
    if filter.is_empty() {
        return Err(DbError::EmptyFilter {
            operation: "delete",
        });
    }

    let mut sql = format!("DELETE FROM {}", quote_ident(table)?);
    let mut values = Vec::new();
    append_where(&mut sql, &mut values, filter)?;
    Ok((sql, values))
}

fn insert_template<'a>(table: &str, columns: impl Iterator<Item = &'a str>) -> DbResult<String> {
    let quoted = quote_idents(columns)?;
    let placeholders = vec!["?"; quoted.len()].join(", ");
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_ident(table)?,
        quoted.join(", ")
    ))
}

fn append_where(sql: &mut String, values: &mut Vec<Value>, filter: &Filter) -> DbResult<()> {
    if filter.is_empty() {
        return Ok(());
    }

    let mut clauses = Vec::new();
    for condition in &filter.conditions {
        clauses.push(render_condition(condition, values)?);
    }
    if let Some(raw) = &filter.raw {
        check_fragment(raw)?;
        clauses.push(format!("({raw})"));
    }

    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
    Ok(())
}

fn render_condition(condition: &Condition, values: &mut Vec<Value>) -> DbResult<String> {
    let column = quote_ident(&condition.column)?;

    match condition.op {
        FilterOp::Eq => comparison("=", &column, condition, values),
        FilterOp::Ne => comparison("<>", &column, condition, values),
        FilterOp::Lt => comparison("<", &column, condition, values),
        FilterOp::Le => comparison("<=", &column, condition, values),
        FilterOp::Gt => comparison(">", &column, condition, values),
        FilterOp::Ge => comparison(">=", &column, condition, values),
        FilterOp::Like => comparison("LIKE", &column, condition, values),
        FilterOp::In => {
            if condition.values.is_empty() {
                return Err(DbError::InvalidData(format!(
                    "IN on `{}` requires at least one value",
                    condition.column
                )));
            }
            let placeholders = vec!["?"; condition.values.len()].join(", ");
            values.extend(condition.values.iter().cloned());
            Ok(format!("{column} IN ({placeholders})"))
        }
        FilterOp::IsNull => Ok(format!("{column} IS NULL")),
        FilterOp::IsNotNull => Ok(format!("{column} IS NOT NULL")),
    }
}

fn comparison(
    op: &'static str,
    column: &str,
    condition: &Condition,
    values: &mut Vec<Value>,
) -> DbResult<String> {
    let [value] = condition.values.as_slice() else {
        return Err(DbError::InvalidData(format!(
            "{op} on `{}` takes exactly one value",
            condition.column
        )));
    };
    values.push(value.clone());
    Ok(format!("{column} {op} ?"))
}

fn append_order_by(sql: &mut String, order_by: &[(String, SortOrder)]) -> DbResult<()> {
    if order_by.is_empty() {
        return Ok(());
    }

    let mut terms = Vec::new();
    for (column, order) in order_by {
        let direction = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        terms.push(format!("{} {direction}", quote_ident(column)?));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(&terms.join(", "));
    Ok(())
}

fn append_paging(sql: &mut String, values: &mut Vec<Value>, limit: Option<u32>, offset: u32) {
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        values.push(Value::Integer(i64::from(limit)));
        if offset > 0 {
            sql.push_str(" OFFSET ?");
            values.push(Value::Integer(i64::from(offset)));
        }
    } else if offset > 0 {
        // SQLite accepts OFFSET only after LIMIT; -1 means unbounded.
        sql.push_str(" LIMIT -1 OFFSET ?");
        values.push(Value::Integer(i64::from(offset)));
    }
}
