//! SQL rendering across dialects, quoting policies and parameter binding.

#[path = "../common/mod.rs"]
mod common;

use common::{now, retail_catalog, validate_sql, where_clause};
use metrica::catalog::{Aggregation, Catalog, Dimension, JoinEdge, Metric, Table, TableRef};
use metrica::compile::{compile, CompileOptions, ResolvedQuery};
use metrica::intent::{Filter, FilterOperator, QueryIntent, ScalarValue, TimeRange};
use metrica::sql::{Dialect, IdentQuoting, Literal};
use sqlparser::ast::{BinaryOperator, Expr as SqlExpr, Value};

fn render(intent: &QueryIntent, dialect: Dialect, quoting: IdentQuoting) -> ResolvedQuery {
    let options = CompileOptions::default()
        .with_dialect(dialect)
        .with_quoting(quoting);
    let resolved = compile(&retail_catalog(), intent, now(), &options).unwrap();
    validate_sql(&resolved.sql, dialect).unwrap();
    resolved
}

fn status_intent() -> QueryIntent {
    QueryIntent::new("revenue").with_dimension("status")
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_full_query_layout() {
    let intent = QueryIntent::new("revenue")
        .with_dimensions(["country", "category"])
        .with_time_range(TimeRange::LastQuarter)
        .with_filter(Filter::in_list("country", ["US", "CA"]))
        .with_limit(10);

    let resolved = render(&intent, Dialect::Postgres, IdentQuoting::AsNeeded);
    insta::assert_snapshot!(resolved.sql, @r"
    SELECT
      customers.country_code,
      products.category,
      SUM(orders.amount_usd) AS revenue
    FROM orders
    INNER JOIN customers ON orders.customer_id = customers.customer_id
    INNER JOIN products ON orders.product_id = products.product_id
    WHERE orders.order_date >= DATE '2024-01-01' AND orders.order_date < DATE '2024-04-01' AND customers.country_code IN ('US', 'CA')
    GROUP BY customers.country_code, products.category
    LIMIT 10
    ");
}

// ============================================================================
// Identifier Quoting
// ============================================================================

#[test]
fn test_always_quoting_postgres() {
    let resolved = render(&status_intent(), Dialect::Postgres, IdentQuoting::Always);
    insta::assert_snapshot!(resolved.sql, @r#"
    SELECT
      "orders"."status",
      SUM("orders"."amount_usd") AS "revenue"
    FROM "orders"
    GROUP BY "orders"."status"
    "#);
}

#[test]
fn test_always_quoting_mysql_join_condition() {
    let intent = QueryIntent::new("revenue").with_dimension("country");
    let resolved = render(&intent, Dialect::MySql, IdentQuoting::Always);
    insta::assert_snapshot!(resolved.sql, @r"
    SELECT
      `customers`.`country_code`,
      SUM(`orders`.`amount_usd`) AS `revenue`
    FROM `orders`
    INNER JOIN `customers` ON `orders`.`customer_id` = `customers`.`customer_id`
    GROUP BY `customers`.`country_code`
    ");
}

#[test]
fn test_always_quoting_tsql_join_condition() {
    let intent = QueryIntent::new("revenue").with_dimension("country");
    let resolved = render(&intent, Dialect::TSql, IdentQuoting::Always);
    assert!(resolved
        .sql
        .contains("INNER JOIN [customers] ON [orders].[customer_id] = [customers].[customer_id]"));
}

#[test]
fn test_snowflake_quotes_lowercase_names() {
    let intent = QueryIntent::new("revenue").with_time_range(TimeRange::LastMonth);
    let resolved = render(&intent, Dialect::Snowflake, IdentQuoting::AsNeeded);
    insta::assert_snapshot!(resolved.sql, @r#"
    SELECT
      SUM("orders"."amount_usd") AS "revenue"
    FROM "orders"
    WHERE "orders"."order_date" >= DATE '2024-04-01' AND "orders"."order_date" < DATE '2024-05-01'
    "#);
}

// ============================================================================
// Dialect Differences
// ============================================================================

#[test]
fn test_tsql_limit_and_dates() {
    let intent = status_intent()
        .with_time_range(TimeRange::LastMonth)
        .with_limit(5);
    let resolved = render(&intent, Dialect::TSql, IdentQuoting::AsNeeded);
    insta::assert_snapshot!(resolved.sql, @r"
    SELECT
      orders.status,
      SUM(orders.amount_usd) AS revenue
    FROM orders
    WHERE orders.order_date >= '2024-04-01' AND orders.order_date < '2024-05-01'
    GROUP BY orders.status
    ORDER BY (SELECT NULL)
    OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY
    ");
}

#[test]
fn test_limit_keyword_dialects() {
    let intent = status_intent().with_limit(25);
    for dialect in [Dialect::Postgres, Dialect::DuckDb, Dialect::MySql] {
        let resolved = render(&intent, dialect, IdentQuoting::AsNeeded);
        assert!(resolved.sql.ends_with("\nLIMIT 25"), "{}", resolved.sql);
    }
}

#[test]
fn test_every_dialect_parses() {
    let intent = QueryIntent::new("order_count")
        .with_dimensions(["country", "category", "status"])
        .with_time_range(TimeRange::LastNDays { n: 30 })
        .with_filter(Filter::new("status", FilterOperator::Neq, "cancelled"))
        .with_filter(Filter::new("order_count", FilterOperator::Gte, 3_i64))
        .with_limit(50);

    for dialect in Dialect::ALL {
        for quoting in [IdentQuoting::Always, IdentQuoting::AsNeeded] {
            let resolved = render(&intent, dialect, quoting);
            assert!(resolved.sql.contains("COUNT(*)"), "{}", resolved.sql);
        }
    }
}

// ============================================================================
// Parameter Binding
// ============================================================================

fn parameterized_intent() -> QueryIntent {
    status_intent()
        .with_time_range(TimeRange::LastNDays { n: 7 })
        .with_filter(Filter::new("revenue", FilterOperator::Gt, 100_i64))
        .with_filter(Filter::in_list("status", ["paid", "shipped"]))
}

fn render_parameterized(dialect: Dialect) -> ResolvedQuery {
    let options = CompileOptions::default()
        .with_dialect(dialect)
        .with_quoting(IdentQuoting::AsNeeded)
        .with_parameterize(true);
    let resolved = compile(&retail_catalog(), &parameterized_intent(), now(), &options).unwrap();
    validate_sql(&resolved.sql, dialect).unwrap();
    resolved
}

#[test]
fn test_postgres_placeholders() {
    let resolved = render_parameterized(Dialect::Postgres);
    insta::assert_snapshot!(resolved.sql, @r"
    SELECT
      orders.status,
      SUM(orders.amount_usd) AS revenue
    FROM orders
    WHERE orders.order_date >= DATE '2024-05-08' AND orders.order_date < DATE '2024-05-15' AND orders.status IN ($1, $2)
    GROUP BY orders.status
    HAVING SUM(orders.amount_usd) > $3
    ");
    assert_eq!(
        resolved.params,
        vec![
            Literal::String("paid".into()),
            Literal::String("shipped".into()),
            Literal::Int(100),
        ]
    );
}

#[test]
fn test_positional_and_named_placeholders() {
    let duckdb = render_parameterized(Dialect::DuckDb);
    assert!(duckdb.sql.contains("orders.status IN (?, ?)"));
    assert!(duckdb.sql.contains("HAVING SUM(orders.amount_usd) > ?"));

    let tsql = render_parameterized(Dialect::TSql);
    assert!(tsql.sql.contains("orders.status IN (@p1, @p2)"));
    assert!(tsql.sql.contains("HAVING SUM(orders.amount_usd) > @p3"));

    // Bound values do not depend on the placeholder style
    assert_eq!(duckdb.params, tsql.params);
}

#[test]
fn test_inline_values_are_not_bound() {
    let resolved = render(&parameterized_intent(), Dialect::Postgres, IdentQuoting::AsNeeded);
    assert!(resolved.params.is_empty());
    assert!(resolved.sql.contains("orders.status IN ('paid', 'shipped')"));
    assert!(resolved.sql.contains("HAVING SUM(orders.amount_usd) > 100"));
}

#[test]
fn test_hostile_strings_stay_literals() {
    let intent = status_intent().with_filter(Filter::equals("status", "paid'; DROP TABLE orders; --"));
    let resolved = render(&intent, Dialect::Postgres, IdentQuoting::AsNeeded);
    assert!(resolved
        .sql
        .contains("WHERE orders.status = 'paid''; DROP TABLE orders; --'"));
}

#[test]
fn test_backslashes_cannot_end_a_string_early() {
    // MySQL and Snowflake read `\'` as an escaped quote
    let hostile = r"x\' OR 1=1 -- ";
    let intent = status_intent().with_filter(Filter::equals("status", hostile));

    for dialect in Dialect::ALL {
        let resolved = render(&intent, dialect, IdentQuoting::AsNeeded);
        match where_clause(&resolved.sql, dialect) {
            Some(SqlExpr::BinaryOp {
                op: BinaryOperator::Eq,
                right,
                ..
            }) => assert_eq!(
                *right,
                SqlExpr::Value(Value::SingleQuotedString(hostile.to_string())),
                "{}",
                resolved.sql
            ),
            other => panic!(
                "{}: expected one comparison, got {:?}\n{}",
                dialect, other, resolved.sql
            ),
        }
    }
}

#[test]
fn test_backslash_literals_per_dialect() {
    let intent = status_intent().with_filter(Filter::equals("status", r"a\b"));

    let mysql = render(&intent, Dialect::MySql, IdentQuoting::AsNeeded);
    assert!(mysql.sql.contains(r"WHERE orders.status = 'a\\b'"), "{}", mysql.sql);

    let snowflake = render(&intent, Dialect::Snowflake, IdentQuoting::AsNeeded);
    assert!(snowflake.sql.contains(r"= 'a\\b'"), "{}", snowflake.sql);

    let postgres = render(&intent, Dialect::Postgres, IdentQuoting::AsNeeded);
    assert!(postgres.sql.contains(r"WHERE orders.status = 'a\b'"), "{}", postgres.sql);
}

#[test]
fn test_empty_in_list() {
    let intent = status_intent()
        .with_filter(Filter::in_list::<&str>("status", []))
        .with_filter(Filter::new(
            "status",
            FilterOperator::NotIn,
            Vec::<ScalarValue>::new(),
        ));

    for dialect in Dialect::ALL {
        let resolved = render(&intent, dialect, IdentQuoting::AsNeeded);
        assert!(resolved.sql.contains("WHERE 1 = 0 AND 1 = 1"), "{}", resolved.sql);
    }
}

#[test]
fn test_empty_in_list_tsql() {
    let intent = status_intent().with_filter(Filter::in_list::<&str>("status", []));
    let resolved = render(&intent, Dialect::TSql, IdentQuoting::AsNeeded);
    insta::assert_snapshot!(resolved.sql, @r"
    SELECT
      orders.status,
      SUM(orders.amount_usd) AS revenue
    FROM orders
    WHERE 1 = 0
    GROUP BY orders.status
    ");
}

// ============================================================================
// Tables Sharing a Name
// ============================================================================

/// `sales.orders` and `archive.orders`, joined on `order_id`.
fn same_name_catalog() -> Catalog {
    let sales = TableRef::new("warehouse", "sales", "orders");
    let archive = TableRef::new("warehouse", "archive", "orders");

    let mut catalog = Catalog::new();
    catalog
        .register_table(Table::new(sales.clone()).with_date_column("order_date"))
        .unwrap();
    catalog.register_table(Table::new(archive.clone())).unwrap();
    catalog
        .register_metric(Metric::new("revenue", Aggregation::Sum, sales.clone(), "amount"))
        .unwrap();
    catalog
        .register_dimension(Dimension::new("region", archive.clone(), "region"))
        .unwrap();
    catalog
        .register_join_edge(JoinEdge::new(
            sales,
            archive,
            "sales.orders.order_id = archive.orders.order_id",
        ))
        .unwrap();
    catalog
}

#[test]
fn test_tables_sharing_a_name_are_aliased() {
    let intent = QueryIntent::new("revenue")
        .with_dimension("region")
        .with_time_range(TimeRange::LastMonth)
        .with_filter(Filter::equals("region", "EU"));
    let options = CompileOptions::default().with_quoting(IdentQuoting::AsNeeded);

    let resolved = compile(&same_name_catalog(), &intent, now(), &options).unwrap();
    validate_sql(&resolved.sql, Dialect::Postgres).unwrap();
    insta::assert_snapshot!(resolved.sql, @r"
    SELECT
      archive_orders.region,
      SUM(sales_orders.amount) AS revenue
    FROM sales.orders AS sales_orders
    INNER JOIN archive.orders AS archive_orders ON sales_orders.order_id = archive_orders.order_id
    WHERE sales_orders.order_date >= DATE '2024-04-01' AND sales_orders.order_date < DATE '2024-05-01' AND archive_orders.region = 'EU'
    GROUP BY archive_orders.region
    ");
}

#[test]
fn test_aliases_in_every_dialect() {
    let intent = QueryIntent::new("revenue").with_dimension("region").with_limit(5);
    for dialect in Dialect::ALL {
        let options = CompileOptions::default().with_dialect(dialect);
        let resolved = compile(&same_name_catalog(), &intent, now(), &options).unwrap();
        validate_sql(&resolved.sql, dialect).unwrap();
        assert!(
            !resolved.sql.contains(&dialect_quoted(dialect, "orders", "region")),
            "unaliased column in {}",
            resolved.sql
        );
    }
}

fn dialect_quoted(dialect: Dialect, table: &str, column: &str) -> String {
    use metrica::sql::SqlDialect;
    format!(
        "{}.{}",
        dialect.quote_identifier(table),
        dialect.quote_identifier(column)
    )
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_order_by_dimensions() {
    let intent = QueryIntent::new("revenue")
        .with_dimensions(["country", "status"])
        .with_limit(10);
    let options = CompileOptions::default()
        .with_dialect(Dialect::TSql)
        .with_quoting(IdentQuoting::AsNeeded)
        .with_order_by_dimensions(true);

    let resolved = compile(&retail_catalog(), &intent, now(), &options).unwrap();
    validate_sql(&resolved.sql, Dialect::TSql).unwrap();
    insta::assert_snapshot!(resolved.sql, @r"
    SELECT
      customers.country_code,
      orders.status,
      SUM(orders.amount_usd) AS revenue
    FROM orders
    INNER JOIN customers ON orders.customer_id = customers.customer_id
    GROUP BY customers.country_code, orders.status
    ORDER BY customers.country_code, orders.status
    OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY
    ");
}

#[test]
fn test_order_by_dimensions_is_opt_in() {
    let intent = status_intent();
    let resolved = render(&intent, Dialect::Postgres, IdentQuoting::AsNeeded);
    assert!(!resolved.sql.contains("ORDER BY"));

    // Nothing to order by without dimensions
    let options = CompileOptions::default().with_order_by_dimensions(true);
    let resolved = compile(&retail_catalog(), &QueryIntent::new("revenue"), now(), &options).unwrap();
    assert!(!resolved.sql.contains("ORDER BY"));
}
