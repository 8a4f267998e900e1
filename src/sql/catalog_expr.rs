//! Catalog-declared SQL fragments.
//!
//! Metric expressions, dimension expressions and join conditions are written
//! by catalog authors as SQL text. They are parsed with sqlparser, bare column
//! references are qualified with the owning table, and identifiers are
//! re-quoted for the target dialect before the fragment is embedded as
//! [`Expr::Raw`]. Plain column references become structured [`Expr::Column`]s.

use std::ops::ControlFlow;

use sqlparser::ast::{visit_expressions_mut, Expr as SqlExpr, Ident};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::Token as SqlToken;

use super::dialect::{Dialect, IdentQuoting, SqlDialect};
use super::expr::Expr;

/// Parse a complete SQL expression, rejecting trailing input.
pub fn parse_catalog_expr(text: &str) -> Result<SqlExpr, ParserError> {
    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect).try_with_sql(text)?;
    let expr = parser.parse_expr()?;

    let next = parser.peek_token();
    if next.token != SqlToken::EOF {
        return Err(ParserError::ParserError(format!(
            "unexpected trailing input '{}'",
            next.token
        )));
    }
    Ok(expr)
}

/// Check that `text` is a usable column expression.
///
/// `*` is accepted on its own (as in `COUNT(*)`).
pub fn check_column_expr(text: &str) -> Result<(), ParserError> {
    if is_star(text) {
        return Ok(());
    }
    parse_catalog_expr(text).map(|_| ())
}

/// Build the expression for a catalog column expression owned by `table`.
///
/// Bare identifiers are qualified with `table`; already-qualified
/// identifiers keep their qualifier.
pub fn column_expr(
    text: &str,
    table: &str,
    dialect: Dialect,
    quoting: IdentQuoting,
) -> Result<Expr, ParserError> {
    if is_star(text) {
        return Ok(Expr::Star { table: None });
    }

    let mut ast = parse_catalog_expr(text)?;
    if let SqlExpr::Identifier(ident) = &ast {
        return Ok(Expr::Column {
            table: Some(table.to_string()),
            column: ident.value.clone(),
        });
    }

    let _ = visit_expressions_mut(&mut ast, |e| {
        let qualified = match e {
            SqlExpr::Identifier(ident) => Some(SqlExpr::CompoundIdentifier(vec![
                quoted_ident(table, dialect, quoting),
                quoted_ident(&ident.value, dialect, quoting),
            ])),
            SqlExpr::CompoundIdentifier(parts) => {
                requote(parts, dialect, quoting);
                None
            }
            _ => None,
        };
        if let Some(q) = qualified {
            *e = q;
        }
        ControlFlow::<()>::Continue(())
    });

    Ok(Expr::Raw(ast.to_string()))
}

/// Build the expression for a join condition.
///
/// Join conditions already name their tables, so identifiers are never
/// qualified. `rename` maps the table part of a compound reference
/// (`orders` in `orders.id`, `sales.orders` in `sales.orders.id`) to the
/// name the query uses for that table. References it does not map keep
/// what the catalog author wrote.
pub fn condition_expr(
    text: &str,
    rename: impl Fn(&[&str]) -> Option<String>,
    dialect: Dialect,
    quoting: IdentQuoting,
) -> Result<Expr, ParserError> {
    let mut ast = parse_catalog_expr(text)?;

    let _ = visit_expressions_mut(&mut ast, |e| {
        match e {
            SqlExpr::Identifier(ident) => {
                *ident = quoted_ident(&ident.value, dialect, quoting);
            }
            SqlExpr::CompoundIdentifier(parts) => {
                let renamed = parts.split_last().and_then(|(column, table)| {
                    let table: Vec<&str> = table.iter().map(|p| p.value.as_str()).collect();
                    rename(&table).map(|name| vec![Ident::new(name), column.clone()])
                });
                if let Some(renamed) = renamed {
                    *parts = renamed;
                }
                requote(parts, dialect, quoting);
            }
            _ => {}
        }
        ControlFlow::<()>::Continue(())
    });

    Ok(Expr::Raw(ast.to_string()))
}

fn is_star(text: &str) -> bool {
    text.trim() == "*"
}

fn requote(parts: &mut [Ident], dialect: Dialect, quoting: IdentQuoting) {
    for part in parts.iter_mut() {
        *part = quoted_ident(&part.value, dialect, quoting);
    }
}

fn quoted_ident(value: &str, dialect: Dialect, quoting: IdentQuoting) -> Ident {
    match quoting {
        IdentQuoting::AsNeeded if dialect.is_bare_identifier(value) => Ident::new(value),
        _ => Ident::with_quote(dialect.identifier_quote_char(), value),
    }
}
