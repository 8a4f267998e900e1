//! Catalog Registry.
//!
//! The catalog is the registered set of tables, metrics, dimensions and join
//! edges available for compilation. It is built once at startup, either
//! programmatically through the `register_*` methods or from a declarative
//! TOML file (see [`loader`]), and is read-only afterwards. A `&Catalog` can
//! be shared between threads without synchronization.
//!
//! Registration only detects duplicates. Whether join edges point at
//! registered tables is checked lazily by the join path resolver, so a
//! catalog may be assembled in any order.

mod error;
pub mod loader;
mod types;

use std::collections::HashMap;

use tracing::debug;

pub use error::{CatalogError, CatalogResult, DefinitionKind};
pub use types::{
    Aggregation, DataType, Dimension, JoinEdge, JoinKind, Metric, Table, TableRef,
};

/// In-memory registry of catalog definitions.
///
/// Every listing preserves registration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<Table>,
    table_index: HashMap<TableRef, usize>,
    metrics: Vec<Metric>,
    metric_index: HashMap<String, usize>,
    dimensions: Vec<Dimension>,
    dimension_index: HashMap<String, usize>,
    join_edges: Vec<JoinEdge>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a physical table.
    pub fn register_table(&mut self, table: Table) -> CatalogResult<()> {
        if self.table_index.contains_key(&table.table_ref) {
            return Err(CatalogError::DuplicateDefinition {
                kind: DefinitionKind::Table,
                name: table.table_ref.to_string(),
            });
        }
        debug!(table = %table.table_ref, "registered table");
        self.table_index
            .insert(table.table_ref.clone(), self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    /// Register a metric.
    ///
    /// Metric and dimension names share one namespace, since filters may
    /// target either by name.
    pub fn register_metric(&mut self, metric: Metric) -> CatalogResult<()> {
        self.check_name_free(DefinitionKind::Metric, &metric.name)?;
        debug!(metric = %metric.name, table = %metric.table, "registered metric");
        self.metric_index
            .insert(metric.name.clone(), self.metrics.len());
        self.metrics.push(metric);
        Ok(())
    }

    /// Register a dimension.
    pub fn register_dimension(&mut self, dimension: Dimension) -> CatalogResult<()> {
        self.check_name_free(DefinitionKind::Dimension, &dimension.name)?;
        debug!(dimension = %dimension.name, table = %dimension.table, "registered dimension");
        self.dimension_index
            .insert(dimension.name.clone(), self.dimensions.len());
        self.dimensions.push(dimension);
        Ok(())
    }

    /// Register a join edge.
    ///
    /// An edge duplicates an existing one when it joins the same pair of
    /// tables (in either direction) on the same condition.
    pub fn register_join_edge(&mut self, edge: JoinEdge) -> CatalogResult<()> {
        let duplicate = self.join_edges.iter().any(|existing| {
            existing.on_condition == edge.on_condition
                && ((existing.from == edge.from && existing.to == edge.to)
                    || (existing.from == edge.to && existing.to == edge.from))
        });
        if duplicate {
            return Err(CatalogError::DuplicateDefinition {
                kind: DefinitionKind::JoinEdge,
                name: edge.to_string(),
            });
        }
        debug!(edge = %edge, "registered join edge");
        self.join_edges.push(edge);
        Ok(())
    }

    fn check_name_free(&self, kind: DefinitionKind, name: &str) -> CatalogResult<()> {
        if self.metric_index.contains_key(name) || self.dimension_index.contains_key(name) {
            return Err(CatalogError::DuplicateDefinition {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Look up a metric by name.
    pub fn lookup_metric(&self, name: &str) -> CatalogResult<&Metric> {
        self.metric_index
            .get(name)
            .map(|&i| &self.metrics[i])
            .ok_or_else(|| CatalogError::NotFound {
                kind: DefinitionKind::Metric,
                name: name.to_string(),
            })
    }

    /// Look up a dimension by name.
    pub fn lookup_dimension(&self, name: &str) -> CatalogResult<&Dimension> {
        self.dimension_index
            .get(name)
            .map(|&i| &self.dimensions[i])
            .ok_or_else(|| CatalogError::NotFound {
                kind: DefinitionKind::Dimension,
                name: name.to_string(),
            })
    }

    /// Look up a registered table.
    pub fn lookup_table(&self, table_ref: &TableRef) -> CatalogResult<&Table> {
        self.table_index
            .get(table_ref)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| CatalogError::NotFound {
                kind: DefinitionKind::Table,
                name: table_ref.to_string(),
            })
    }

    /// The date column a time window filters `metric` on: its own
    /// `time_column`, else its table's `date_column`.
    pub fn time_column_for<'a>(&'a self, metric: &'a Metric) -> Option<&'a str> {
        metric.time_column.as_deref().or_else(|| {
            self.lookup_table(&metric.table)
                .ok()
                .and_then(|t| t.date_column.as_deref())
        })
    }

    /// Resolve a `table`, `schema.table` or `catalog_id.schema.table`
    /// reference to the single registered table it names.
    ///
    /// Returns `None` when nothing matches or the reference is ambiguous.
    pub fn resolve_table(&self, reference: &str) -> Option<&Table> {
        let mut matches = self
            .tables
            .iter()
            .filter(|t| t.table_ref.matches(reference));
        let first = matches.next()?;
        match matches.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    // =========================================================================
    // Listing
    // =========================================================================

    pub fn all_tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn all_metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn all_dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn all_join_edges(&self) -> &[JoinEdge] {
        &self.join_edges
    }

    /// All edges incident to `table`, in registration order.
    pub fn join_edges_for(&self, table: &TableRef) -> Vec<&JoinEdge> {
        self.join_edges
            .iter()
            .filter(|edge| edge.touches(table))
            .collect()
    }
}
