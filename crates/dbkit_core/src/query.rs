//! Typed inputs and outputs for facade queries.
//!
//! # Responsibility
//! - Model filters, projections and pagination options independently of
//!   SQL text.
//! - Carry materialized rows back to callers without committing to a
//!   caller-side schema.
//!
//! # Invariants
//! - `Filter` is a conjunction; disjunctions go through the guarded raw
//!   fragment.
//! - Values always stay `rusqlite::types::Value`; rendering them into
//!   SQL text is the builder's job and happens via placeholders only.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Comparison operators accepted in typed filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
    IsNull,
    IsNotNull,
}

/// One typed condition: `column <op> values`.
#[derive(Debug, Clone)]
pub struct Condition {
    pub column: String,
    pub op: FilterOp,
    /// Bind values for the condition. Arity depends on `op`: zero for
    /// null checks, one for comparisons, one-or-more for `In`.
    pub values: Vec<Value>,
}

/// Conjunction of typed conditions plus an optional raw fragment.
///
/// The raw fragment is the escape hatch for expressions the typed set
/// cannot say (disjunctions, BETWEEN, correlated subselects); it must
/// pass the injection blocklist before rendering.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub raw: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no condition and no raw fragment are present.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.raw.is_none()
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Eq, vec![value.into()])
    }

    pub fn ne(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Ne, vec![value.into()])
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Lt, vec![value.into()])
    }

    pub fn le(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Le, vec![value.into()])
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Gt, vec![value.into()])
    }

    pub fn ge(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Ge, vec![value.into()])
    }

    /// `LIKE` match; the pattern is bound, not interpolated.
    pub fn like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.push(column, FilterOp::Like, vec![Value::Text(pattern.into())])
    }

    pub fn is_in(
        self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.push(column, FilterOp::In, values.into_iter().collect())
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.push(column, FilterOp::IsNull, Vec::new())
    }

    pub fn is_not_null(self, column: impl Into<String>) -> Self {
        self.push(column, FilterOp::IsNotNull, Vec::new())
    }

    /// Attaches a raw boolean fragment. Checked against the blocklist at
    /// render time; later calls replace earlier ones.
    pub fn raw(mut self, fragment: impl Into<String>) -> Self {
        self.raw = Some(fragment.into());
        self
    }

    fn push(mut self, column: impl Into<String>, op: FilterOp, values: Vec<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op,
            values,
        });
        self
    }
}

/// Sort direction for ORDER BY pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Options for SELECT-shaped operations.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Column projection; `None` means `*`.
    pub columns: Option<Vec<String>>,
    pub filter: Filter,
    pub order_by: Vec<(String, SortOrder)>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

/// One materialized result row, columns in statement order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub fields: Vec<(String, Value)>,
}

impl Record {
    /// Returns the value for `column`, if present in the projection.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One page of results plus the totals needed to render a pager.
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<Record>,
    /// Total matching rows across all pages, from a companion COUNT.
    pub total: u64,
    /// 1-based page number actually served.
    pub page: u32,
    pub per_page: u32,
    /// ceil(total / per_page); zero when no rows match.
    pub page_count: u32,
}
