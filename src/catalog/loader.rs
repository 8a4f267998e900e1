//! Declarative TOML catalog source.
//!
//! ```toml
//! [[tables]]
//! catalog_id = "warehouse"
//! schema = "sales"
//! table = "orders"
//! date_column = "order_date"
//!
//! [[metrics]]
//! name = "revenue"
//! aggregation = "sum"
//! table = "sales.orders"
//! expression = "amount_usd"
//!
//! [[dimensions]]
//! name = "country"
//! table = "sales.customers"
//! column = "country_code"
//!
//! [[joins]]
//! from = "sales.orders"
//! to = "sales.customers"
//! on = "orders.customer_id = customers.customer_id"
//! kind = "inner"
//! ```
//!
//! Tables are registered first, then metrics, dimensions and joins, each in
//! file order. Unlike programmatic registration, every table reference must
//! resolve when the file is loaded. Any error aborts the load.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use super::{
    Aggregation, Catalog, CatalogError, CatalogResult, DataType, DefinitionKind, Dimension,
    JoinEdge, JoinKind, Metric, Table, TableRef,
};
use crate::sql::catalog_expr;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

const DEFAULT_CATALOG_ID: &str = "default";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    tables: Vec<TableDef>,
    #[serde(default)]
    metrics: Vec<MetricDef>,
    #[serde(default)]
    dimensions: Vec<DimensionDef>,
    #[serde(default)]
    joins: Vec<JoinDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableDef {
    #[serde(default = "default_catalog_id")]
    catalog_id: String,
    #[serde(default)]
    schema: String,
    table: String,
    date_column: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetricDef {
    name: String,
    aggregation: Aggregation,
    table: String,
    expression: String,
    time_column: Option<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DimensionDef {
    name: String,
    table: String,
    column: String,
    expression: Option<String>,
    #[serde(default)]
    data_type: DataType,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JoinDef {
    from: String,
    to: String,
    on: String,
    #[serde(default)]
    kind: JoinKind,
}

fn default_catalog_id() -> String {
    DEFAULT_CATALOG_ID.to_string()
}

impl Catalog {
    /// Load a catalog from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "catalog file loaded");
        Ok(catalog)
    }

    /// Build a catalog from TOML source text.
    pub fn from_toml_str(source: &str) -> CatalogResult<Self> {
        let file: CatalogFile = toml::from_str(source)?;
        let mut catalog = Catalog::new();

        for def in file.tables {
            catalog.register_table(build_table(def)?)?;
        }
        for def in file.metrics {
            let metric = build_metric(&catalog, def)?;
            catalog.register_metric(metric)?;
        }
        for def in file.dimensions {
            let dimension = build_dimension(&catalog, def)?;
            catalog.register_dimension(dimension)?;
        }
        for def in file.joins {
            let edge = build_join(&catalog, def)?;
            catalog.register_join_edge(edge)?;
        }

        info!(
            tables = catalog.all_tables().len(),
            metrics = catalog.all_metrics().len(),
            dimensions = catalog.all_dimensions().len(),
            joins = catalog.all_join_edges().len(),
            "catalog built"
        );
        Ok(catalog)
    }
}

fn build_table(def: TableDef) -> CatalogResult<Table> {
    let name = if def.schema.is_empty() {
        def.table.clone()
    } else {
        format!("{}.{}", def.schema, def.table)
    };
    check_identifier(DefinitionKind::Table, &name, &def.catalog_id)?;
    if !def.schema.is_empty() {
        check_identifier(DefinitionKind::Table, &name, &def.schema)?;
    }
    check_identifier(DefinitionKind::Table, &name, &def.table)?;

    let mut table = Table::new(TableRef::new(def.catalog_id, def.schema, def.table));
    if let Some(column) = def.date_column {
        check_identifier(DefinitionKind::Table, &name, &column)?;
        table = table.with_date_column(column);
    }
    Ok(table)
}

fn build_metric(catalog: &Catalog, def: MetricDef) -> CatalogResult<Metric> {
    check_identifier(DefinitionKind::Metric, &def.name, &def.name)?;
    let owner = format!("metric '{}'", def.name);
    let table = resolve(catalog, &owner, &def.table)?;
    check_expression(&owner, &def.expression)?;

    let mut metric = Metric::new(def.name.clone(), def.aggregation, table, def.expression)
        .with_description(def.description);
    if let Some(column) = def.time_column {
        check_identifier(DefinitionKind::Metric, &def.name, &column)?;
        metric = metric.with_time_column(column);
    }
    Ok(metric)
}

fn build_dimension(catalog: &Catalog, def: DimensionDef) -> CatalogResult<Dimension> {
    check_identifier(DefinitionKind::Dimension, &def.name, &def.name)?;
    check_identifier(DefinitionKind::Dimension, &def.name, &def.column)?;
    let owner = format!("dimension '{}'", def.name);
    let table = resolve(catalog, &owner, &def.table)?;

    let mut dimension = Dimension::new(def.name, table, def.column)
        .with_data_type(def.data_type)
        .with_description(def.description);
    if let Some(expression) = def.expression {
        check_expression(&owner, &expression)?;
        dimension = dimension.with_expression(expression);
    }
    Ok(dimension)
}

fn build_join(catalog: &Catalog, def: JoinDef) -> CatalogResult<JoinEdge> {
    let owner = format!("join '{}' -> '{}'", def.from, def.to);
    let from = resolve(catalog, &owner, &def.from)?;
    let to = resolve(catalog, &owner, &def.to)?;
    catalog_expr::parse_catalog_expr(&def.on).map_err(|e| CatalogError::InvalidExpression {
        owner: owner.clone(),
        expression: def.on.clone(),
        message: e.to_string(),
    })?;
    Ok(JoinEdge::new(from, to, def.on).with_kind(def.kind))
}

fn resolve(catalog: &Catalog, owner: &str, reference: &str) -> CatalogResult<TableRef> {
    catalog
        .resolve_table(reference)
        .map(|t| t.table_ref.clone())
        .ok_or_else(|| CatalogError::UnknownTable {
            owner: owner.to_string(),
            table: reference.to_string(),
        })
}

fn check_identifier(kind: DefinitionKind, name: &str, value: &str) -> CatalogResult<()> {
    if IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(CatalogError::InvalidIdentifier {
            kind,
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

fn check_expression(owner: &str, expression: &str) -> CatalogResult<()> {
    catalog_expr::check_column_expr(expression).map_err(|e| CatalogError::InvalidExpression {
        owner: owner.to_string(),
        expression: expression.to_string(),
        message: e.to_string(),
    })
}
