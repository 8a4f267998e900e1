//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB, Snowflake
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: T-SQL (SQL Server, Azure Synapse)
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Words that always need quoting when used as identifiers.
///
/// Not exhaustive for any single engine; covers the keywords that collide
/// with common column names in analytical schemas.
const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "cast", "check", "column", "create",
    "cross", "current_date", "date", "default", "delete", "desc", "distinct", "else", "end",
    "except", "exists", "false", "fetch", "for", "from", "full", "group", "having", "in",
    "inner", "insert", "intersect", "interval", "into", "is", "join", "key", "left", "like",
    "limit", "natural", "not", "null", "offset", "on", "or", "order", "outer", "primary",
    "right", "rows", "select", "set", "table", "then", "time", "timestamp", "to", "top",
    "true", "union", "unique", "update", "user", "using", "values", "when", "where", "with",
];

/// Whether `ident` collides with a reserved word (case-insensitive).
pub fn is_reserved_word(ident: &str) -> bool {
    let lower = ident.to_ascii_lowercase();
    RESERVED_WORDS.contains(&lower.as_str())
}

/// Lowercase `[a-z_][a-z0-9_]*` identifier that is not reserved.
///
/// These survive lowercase case folding (Postgres, DuckDB) unchanged.
pub fn is_plain_lowercase(ident: &str) -> bool {
    is_plain(ident, |c| c.is_ascii_lowercase()) && !is_reserved_word(ident)
}

/// Uppercase `[A-Z_][A-Z0-9_]*` identifier that is not reserved.
///
/// Snowflake folds unquoted identifiers to uppercase.
pub fn is_plain_uppercase(ident: &str) -> bool {
    is_plain(ident, |c| c.is_ascii_uppercase()) && !is_reserved_word(ident)
}

fn is_plain(ident: &str, letter: impl Fn(char) -> bool) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if letter(c) || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| letter(c) || c.is_ascii_digit() || c == '_')
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
/// Used by: Postgres, DuckDB, T-SQL
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with single quotes, also escaping backslashes.
/// Used by: MySQL, Snowflake (backslash starts an escape sequence there)
pub fn quote_string_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

/// Quote string with N prefix for Unicode (T-SQL).
/// Used by: T-SQL for non-ASCII strings
pub fn quote_string_unicode(s: &str) -> String {
    format!("N'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: Postgres, DuckDB, Snowflake
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: T-SQL, MySQL
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Bind Placeholders
// =============================================================================

/// Positional `$n` placeholder.
/// Used by: Postgres
pub fn placeholder_dollar(index: usize) -> String {
    format!("${}", index)
}

/// Anonymous `?` placeholder.
/// Used by: MySQL, DuckDB, Snowflake
pub fn placeholder_question(_index: usize) -> String {
    "?".into()
}

/// Named `@pN` placeholder.
/// Used by: T-SQL (sp_executesql convention)
pub fn placeholder_at(index: usize) -> String {
    format!("@p{}", index)
}

// =============================================================================
// Row Limits
// =============================================================================

/// Emit LIMIT n (standard SQL).
/// Used by: Postgres, DuckDB, MySQL, Snowflake
pub fn emit_limit_standard(limit: u64) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Limit)
        .space()
        .push(Token::LitInt(limit as i64));
    ts
}

/// Emit OFFSET 0 ROWS FETCH NEXT n ROWS ONLY (T-SQL style).
/// Used by: T-SQL (SQL Server, Azure Synapse)
/// Note: Requires ORDER BY clause in T-SQL
pub fn emit_limit_tsql(limit: u64) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Offset)
        .space()
        .push(Token::LitInt(0))
        .space()
        .push(Token::Rows)
        .space()
        .push(Token::Fetch)
        .space()
        .push(Token::Next)
        .space()
        .push(Token::LitInt(limit as i64))
        .space()
        .push(Token::Rows)
        .space()
        .push(Token::Only);
    ts
}
