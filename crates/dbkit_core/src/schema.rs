//! Typed table definitions and DDL rendering.
//!
//! # Responsibility
//! - Model tables and columns well enough to render CREATE/ALTER
//!   statements without hand-written DDL strings.
//!
//! # Invariants
//! - Every identifier in a definition passes the same checks as query
//!   identifiers.
//! - Default values are SQL literals and must pass the fragment guard.

use crate::db::{DbError, DbResult};
use crate::sql::guard::check_fragment;
use crate::sql::ident::quote_ident;
use serde::{Deserialize, Serialize};

/// SQLite column affinity exposed by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

/// One column in a [`TableDef`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: ColumnType,
    #[serde(default)]
    pub primary_key: bool,
    /// Renders `AUTOINCREMENT` after an inline integer primary key.
    #[serde(default)]
    pub autoincrement: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    /// SQL literal used as DEFAULT, e.g. `0`, `''`, `CURRENT_TIMESTAMP`.
    #[serde(default)]
    pub default: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            primary_key: false,
            autoincrement: false,
            not_null: false,
            unique: false,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks an integer primary key as AUTOINCREMENT.
    ///
    /// SQLite only honors this on an inline `INTEGER PRIMARY KEY`.
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    fn render(&self, inline_primary_key: bool) -> DbResult<String> {
        let mut sql = format!("{} {}", quote_ident(&self.name)?, self.col_type.as_sql());
        if self.primary_key && inline_primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement && self.col_type == ColumnType::Integer {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            check_fragment(default)?;
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        Ok(sql)
    }
}

/// A full table definition for `create_table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub if_not_exists: bool,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            if_not_exists: false,
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Renders the CREATE TABLE statement.
    ///
    /// A single primary-key column is rendered inline; a composite key
    /// becomes a table-level `PRIMARY KEY (...)` constraint.
    pub fn render_create(&self) -> DbResult<String> {
        if self.columns.is_empty() {
            return Err(DbError::InvalidData(format!(
                "table `{}` has no columns",
                self.name
            )));
        }

        let key_columns: Vec<&ColumnDef> =
            self.columns.iter().filter(|c| c.primary_key).collect();
        let inline_primary_key = key_columns.len() == 1;

        let mut parts = Vec::new();
        for column in &self.columns {
            parts.push(column.render(inline_primary_key)?);
        }
        if key_columns.len() > 1 {
            let names = key_columns
                .iter()
                .map(|c| quote_ident(&c.name))
                .collect::<DbResult<Vec<_>>>()?;
            parts.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }

        let exists_clause = if self.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        };
        Ok(format!(
            "CREATE TABLE {exists_clause}{} ({})",
            quote_ident(&self.name)?,
            parts.join(", ")
        ))
    }
}

/// One ALTER TABLE operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlterOp {
    AddColumn(ColumnDef),
    DropColumn(String),
    RenameColumn { from: String, to: String },
    RenameTo(String),
}

impl AlterOp {
    pub(crate) fn render(&self, table: &str) -> DbResult<String> {
        let table = quote_ident(table)?;
        match self {
            Self::AddColumn(column) => Ok(format!(
                "ALTER TABLE {table} ADD COLUMN {}",
                column.render(false)?
            )),
            Self::DropColumn(name) => Ok(format!(
                "ALTER TABLE {table} DROP COLUMN {}",
                quote_ident(name)?
            )),
            Self::RenameColumn { from, to } => Ok(format!(
                "ALTER TABLE {table} RENAME COLUMN {} TO {}",
                quote_ident(from)?,
                quote_ident(to)?
            )),
            Self::RenameTo(name) => Ok(format!(
                "ALTER TABLE {table} RENAME TO {}",
                quote_ident(name)?
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AlterOp, ColumnDef, ColumnType, TableDef};
    use crate::db::DbError;

    fn users() -> TableDef {
        TableDef::new("users")
            .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
            .column(ColumnDef::new("name", ColumnType::Text).not_null())
            .column(ColumnDef::new("score", ColumnType::Real).default_value("0"))
    }

    #[test]
    fn create_renders_inline_primary_key() {
        let sql = users().render_create().unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"users\" (\
             \"id\" INTEGER PRIMARY KEY, \
             \"name\" TEXT NOT NULL, \
             \"score\" REAL DEFAULT 0)"
        );
    }

    #[test]
    fn create_with_composite_key_uses_table_constraint() {
        let def = TableDef::new("memberships")
            .column(ColumnDef::new("user_id", ColumnType::Integer).primary_key())
            .column(ColumnDef::new("group_id", ColumnType::Integer).primary_key())
            .if_not_exists();
        let sql = def.render_create().unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"memberships\""));
        assert!(sql.ends_with("PRIMARY KEY (\"user_id\", \"group_id\"))"));
        assert!(!sql.contains("INTEGER PRIMARY KEY"));
    }

    #[test]
    fn autoincrement_renders_only_on_inline_integer_key() {
        let def = TableDef::new("logs")
            .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
            .column(ColumnDef::new("line", ColumnType::Text));
        let sql = def.render_create().unwrap();
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
    }

    #[test]
    fn create_with_no_columns_is_invalid() {
        let err = TableDef::new("empty").render_create().unwrap_err();
        assert!(matches!(err, DbError::InvalidData(_)));
    }

    #[test]
    fn hostile_default_literal_is_rejected() {
        let def = TableDef::new("t")
            .column(ColumnDef::new("c", ColumnType::Text).default_value("''); DROP TABLE t"));
        assert!(matches!(
            def.render_create().unwrap_err(),
            DbError::UnsafeSql { .. }
        ));
    }

    #[test]
    fn alter_ops_render_expected_statements() {
        let add = AlterOp::AddColumn(ColumnDef::new("age", ColumnType::Integer));
        assert_eq!(
            add.render("users").unwrap(),
            "ALTER TABLE \"users\" ADD COLUMN \"age\" INTEGER"
        );

        let drop = AlterOp::DropColumn("age".to_string());
        assert_eq!(
            drop.render("users").unwrap(),
            "ALTER TABLE \"users\" DROP COLUMN \"age\""
        );

        let rename = AlterOp::RenameColumn {
            from: "name".to_string(),
            to: "full_name".to_string(),
        };
        assert_eq!(
            rename.render("users").unwrap(),
            "ALTER TABLE \"users\" RENAME COLUMN \"name\" TO \"full_name\""
        );

        let rename_table = AlterOp::RenameTo("accounts".to_string());
        assert_eq!(
            rename_table.render("users").unwrap(),
            "ALTER TABLE \"users\" RENAME TO \"accounts\""
        );
    }
}
