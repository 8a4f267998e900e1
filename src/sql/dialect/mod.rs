//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PG/DuckDB/Snowflake), `` ` `` (MySQL), `[]` (T-SQL)
//! - Row limits: LIMIT vs OFFSET FETCH
//! - Boolean literals: true/false vs 1/0
//! - Date literals: `DATE 'YYYY-MM-DD'` vs `'YYYY-MM-DD'`
//! - Bind placeholders: `$1` vs `?` vs `@p1`
//!
//! # Usage
//!
//! ```ignore
//! use metrica::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("user");  // "user"
//! ```

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;
mod snowflake;
mod tsql;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use snowflake::Snowflake;
pub use tsql::TSql;

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations handle dialect-specific syntax differences.
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    ///
    /// - PostgreSQL/DuckDB/Snowflake: `"identifier"`
    /// - MySQL: `` `identifier` ``
    /// - T-SQL: `[identifier]`
    fn quote_identifier(&self, ident: &str) -> String;

    /// Opening quote character, as sqlparser's `Ident::quote_style` expects it.
    fn identifier_quote_char(&self) -> char {
        '"'
    }

    /// Whether `ident` resolves to the same object when left unquoted.
    ///
    /// Dialects that fold unquoted names to lowercase accept plain lowercase
    /// identifiers. Override for dialects that fold to uppercase.
    fn is_bare_identifier(&self, ident: &str) -> bool {
        helpers::is_plain_lowercase(ident)
    }

    /// Render an identifier under the given quoting policy.
    fn render_identifier(&self, ident: &str, quoting: IdentQuoting) -> String {
        match quoting {
            IdentQuoting::AsNeeded if self.is_bare_identifier(ident) => ident.to_string(),
            _ => self.quote_identifier(ident),
        }
    }

    /// Quote a string literal.
    ///
    /// Single quotes with `''` for escaping. Dialects that read `\` as an
    /// escape character (MySQL, Snowflake) also double backslashes.
    /// T-SQL adds the Unicode prefix (N'...').
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    ///
    /// - PostgreSQL/DuckDB: `true`/`false`
    /// - MySQL/T-SQL: `1`/`0`
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a date literal.
    ///
    /// - PostgreSQL/DuckDB/Snowflake/MySQL: `DATE 'YYYY-MM-DD'`
    /// - T-SQL: `'YYYY-MM-DD'` (no DATE keyword)
    fn format_date_literal(&self, date: &str) -> String {
        format!("DATE '{}'", date)
    }

    /// Format a bind placeholder for the 1-based parameter `index`.
    fn format_placeholder(&self, index: usize) -> String {
        helpers::placeholder_question(index)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit the row-limit clause.
    ///
    /// - PostgreSQL/DuckDB/MySQL/Snowflake: `LIMIT n` (default)
    /// - T-SQL: `OFFSET 0 ROWS FETCH NEXT n ROWS ONLY` (override)
    fn emit_limit(&self, limit: u64) -> TokenStream {
        helpers::emit_limit_standard(limit)
    }

    /// Whether the limit clause needs an ORDER BY.
    ///
    /// T-SQL requires ORDER BY when using OFFSET FETCH.
    fn requires_order_by_for_limit(&self) -> bool {
        false
    }
}

/// How identifiers are quoted in rendered SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentQuoting {
    /// Quote every identifier.
    #[default]
    Always,
    /// Leave identifiers bare when the dialect resolves them unchanged.
    AsNeeded,
}

impl FromStr for IdentQuoting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(IdentQuoting::Always),
            "as_needed" | "as-needed" => Ok(IdentQuoting::AsNeeded),
            other => Err(format!("unknown identifier quoting '{}'", other)),
        }
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    DuckDb,
    MySql,
    TSql,
    Snowflake,
}

impl Dialect {
    /// All supported dialects, in display order.
    pub const ALL: [Dialect; 5] = [
        Dialect::Postgres,
        Dialect::DuckDb,
        Dialect::MySql,
        Dialect::TSql,
        Dialect::Snowflake,
    ];

    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
            Dialect::TSql => &TSql,
            Dialect::MySql => &MySql,
            Dialect::Snowflake => &Snowflake,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn identifier_quote_char(&self) -> char {
        self.dialect().identifier_quote_char()
    }

    fn is_bare_identifier(&self, ident: &str) -> bool {
        self.dialect().is_bare_identifier(ident)
    }

    fn render_identifier(&self, ident: &str, quoting: IdentQuoting) -> String {
        self.dialect().render_identifier(ident, quoting)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        self.dialect().format_date_literal(date)
    }

    fn format_placeholder(&self, index: usize) -> String {
        self.dialect().format_placeholder(index)
    }

    fn emit_limit(&self, limit: u64) -> TokenStream {
        self.dialect().emit_limit(limit)
    }

    fn requires_order_by_for_limit(&self) -> bool {
        self.dialect().requires_order_by_for_limit()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            "mysql" => Ok(Dialect::MySql),
            "tsql" | "mssql" | "sqlserver" => Ok(Dialect::TSql),
            "snowflake" => Ok(Dialect::Snowflake),
            other => Err(format!("unsupported dialect '{}'", other)),
        }
    }
}
