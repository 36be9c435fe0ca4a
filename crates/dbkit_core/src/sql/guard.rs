//! Regex blocklist for caller-supplied SQL text.
//!
//! # Responsibility
//! - Reject known injection shapes in raw filter fragments before they
//!   are spliced into generated statements.
//! - Keep raw statement passthrough free of stacked statements and
//!   comment smuggling.
//!
//! # Invariants
//! - A match is always an `UnsafeSql` error, never a rewrite.
//! - Values never travel through this module; they are bound as
//!   placeholders by the builder.

use crate::db::{DbError, DbResult};
use once_cell::sync::Lazy;
use regex::Regex;

struct BlockRule {
    pattern: Regex,
    reason: &'static str,
}

fn rule(pattern: &str, reason: &'static str) -> BlockRule {
    BlockRule {
        pattern: Regex::new(pattern).expect("blocklist regex must compile"),
        reason,
    }
}

/// Rules applied to filter fragments that get spliced into generated SQL.
static FRAGMENT_RULES: Lazy<Vec<BlockRule>> = Lazy::new(|| {
    vec![
        rule(r"--", "sql comment"),
        rule(r"/\*", "block comment"),
        rule(r"(?i)\bunion\b[\s(]+select\b", "union select"),
        rule(r"(?i)\bor\b\s+1\s*=\s*1\b", "tautology"),
        rule(r#"(?i)\bor\b\s*'[^']*'\s*=\s*'"#, "quoted tautology"),
        rule(
            r"(?i)\b(sleep|benchmark|randomblob|zeroblob|load_extension)\s*\(",
            "time/resource probe",
        ),
    ]
});

/// Rules applied to whole raw statements. Looser than the fragment set:
/// a caller-authored SELECT may legitimately contain UNION or OR, but
/// never a second statement or an inline comment.
static STATEMENT_RULES: Lazy<Vec<BlockRule>> = Lazy::new(|| {
    vec![
        rule(r"--", "sql comment"),
        rule(r"/\*", "block comment"),
        rule(r"(?i)\bload_extension\s*\(", "extension load"),
    ]
});

/// Checks a filter fragment destined for a generated WHERE clause.
///
/// Fragments are single boolean expressions; any semicolon is treated
/// as a stacked-statement attempt.
pub fn check_fragment(fragment: &str) -> DbResult<()> {
    if fragment.contains(';') {
        return Err(unsafe_sql(fragment, "stacked statement"));
    }
    apply(&FRAGMENT_RULES, fragment)
}

/// Checks a whole raw statement passed to `execute`/`query`.
///
/// One trailing semicolon is tolerated; anything after it is rejected.
pub fn check_statement(sql: &str) -> DbResult<()> {
    let trimmed = sql.trim_end();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
    if body.contains(';') {
        return Err(unsafe_sql(sql, "stacked statement"));
    }
    apply(&STATEMENT_RULES, body)
}

fn apply(rules: &[BlockRule], text: &str) -> DbResult<()> {
    for rule in rules {
        if rule.pattern.is_match(text) {
            return Err(unsafe_sql(text, rule.reason));
        }
    }
    Ok(())
}

fn unsafe_sql(fragment: &str, reason: &'static str) -> DbError {
    DbError::UnsafeSql {
        fragment: fragment.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::{check_fragment, check_statement};
    use crate::db::DbError;

    fn reason(err: DbError) -> &'static str {
        match err {
            DbError::UnsafeSql { reason, .. } => reason,
            other => panic!("expected UnsafeSql, got {other}"),
        }
    }

    #[test]
    fn benign_fragments_pass() {
        for fragment in [
            "age > 21",
            "status IN ('a', 'b')",
            "name LIKE 'prefix%' AND score >= 10",
            "created_at BETWEEN ?1 AND ?2",
        ] {
            check_fragment(fragment).unwrap();
        }
    }

    #[test]
    fn classic_injection_shapes_are_rejected() {
        assert_eq!(reason(check_fragment("1=1; DROP TABLE users").unwrap_err()), "stacked statement");
        assert_eq!(reason(check_fragment("name = 'x' -- ").unwrap_err()), "sql comment");
        assert_eq!(reason(check_fragment("id = 0 UNION SELECT password FROM auth").unwrap_err()), "union select");
        assert_eq!(reason(check_fragment("id = 5 OR 1=1").unwrap_err()), "tautology");
        assert_eq!(reason(check_fragment("name = '' or 'a'='a'").unwrap_err()), "quoted tautology");
        assert_eq!(reason(check_fragment("id = randomblob(100000000)").unwrap_err()), "time/resource probe");
    }

    #[test]
    fn tautology_check_is_case_insensitive() {
        check_fragment("id = 5 Or 1 = 1").unwrap_err();
    }

    #[test]
    fn word_boundaries_do_not_flag_column_names() {
        check_fragment("reunion_count > 3").unwrap();
        check_fragment("sleeper = ?1").unwrap();
    }

    #[test]
    fn statements_allow_single_trailing_semicolon() {
        check_statement("SELECT * FROM users;").unwrap();
        check_statement("SELECT a FROM t UNION SELECT b FROM u").unwrap();
    }

    #[test]
    fn repeated_trailing_semicolons_are_rejected() {
        assert_eq!(
            reason(check_statement("SELECT 1;;").unwrap_err()),
            "stacked statement"
        );
        assert_eq!(
            reason(check_statement("SELECT 1;;;  ").unwrap_err()),
            "stacked statement"
        );
    }

    #[test]
    fn statements_reject_stacking_and_comments() {
        assert_eq!(
            reason(check_statement("SELECT 1; DELETE FROM users").unwrap_err()),
            "stacked statement"
        );
        assert_eq!(
            reason(check_statement("SELECT 1 /* hidden */").unwrap_err()),
            "block comment"
        );
    }
}
