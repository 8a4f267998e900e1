//! End-to-end compilation from query intent to SQL.
//!
//! ```text
//! QueryIntent → Validate → Required tables → Join plan → Emit → SQL
//! ```
//!
//! Every stage is a pure function of the catalog, the intent, the reference
//! date and the options, so compiling the same inputs twice yields
//! byte-identical SQL.
//!
//! # Example
//!
//! ```ignore
//! use metrica::catalog::Catalog;
//! use metrica::compile::{compile, CompileOptions};
//! use metrica::intent::{QueryIntent, TimeRange};
//! use metrica::sql::Dialect;
//!
//! let catalog = Catalog::from_file("catalog.toml")?;
//! let intent = QueryIntent::new("revenue")
//!     .with_dimension("country")
//!     .with_time_range(TimeRange::LastQuarter);
//!
//! let options = CompileOptions::default().with_dialect(Dialect::DuckDb);
//! let resolved = compile(&catalog, &intent, today, &options)?;
//! println!("{}", resolved.sql);
//! ```

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogError, TableRef};
use crate::intent::QueryIntent;
use crate::planner::{self, JoinPlan, PlanError, RenderOptions};
use crate::sql::{Dialect, IdentQuoting, Literal, Query};
use crate::time_range::TimeWindow;
use crate::validation::{self, ValidationErrors, ValidationResult};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Cannot join '{unreachable}' to base table '{base}': no join path in catalog")]
    UnresolvableJoin { base: TableRef, unreachable: TableRef },

    #[error("Time range requested but table '{table}' declares no date column")]
    NoTimeColumn { table: TableRef },

    #[error("Table '{table}' is referenced but not registered in the catalog")]
    UnknownTable { table: TableRef },

    #[error("Invalid catalog expression for {owner}: {message}")]
    InvalidExpression { owner: String, message: String },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl From<PlanError> for CompileError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::UnresolvableJoin { base, unreachable } => {
                CompileError::UnresolvableJoin { base, unreachable }
            }
            PlanError::UnknownTable { table } => CompileError::UnknownTable { table },
            PlanError::NoTimeColumn { table } => CompileError::NoTimeColumn { table },
            PlanError::InvalidExpression { owner, message } => {
                CompileError::InvalidExpression { owner, message }
            }
            PlanError::Catalog(e) => CompileError::Catalog(e),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,

    /// Identifier quoting policy.
    pub quoting: IdentQuoting,

    /// Emit filter values as placeholders and return them in
    /// [`ResolvedQuery::params`].
    pub parameterize: bool,

    /// Reject intents whose `limit` exceeds this bound.
    pub max_limit: Option<u64>,

    /// Sort rows by every requested dimension, ascending.
    pub order_by_dimensions: bool,
}

impl CompileOptions {
    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_quoting(mut self, quoting: IdentQuoting) -> Self {
        self.quoting = quoting;
        self
    }

    pub fn with_parameterize(mut self, parameterize: bool) -> Self {
        self.parameterize = parameterize;
        self
    }

    pub fn with_max_limit(mut self, max_limit: u64) -> Self {
        self.max_limit = Some(max_limit);
        self
    }

    pub fn with_order_by_dimensions(mut self, order_by_dimensions: bool) -> Self {
        self.order_by_dimensions = order_by_dimensions;
        self
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            dialect: self.dialect,
            quoting: self.quoting,
            parameterize: self.parameterize,
            order_by_dimensions: self.order_by_dimensions,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of compiling an intent.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedQuery {
    /// The generated SQL string.
    pub sql: String,

    /// Every table the query reads: the metric's table, then joined tables
    /// in join order.
    pub tables_used: Vec<TableRef>,

    pub join_plan: JoinPlan,

    /// Half-open `[start, end)` window, when the intent has a time range.
    pub resolved_time_window: Option<TimeWindow>,

    pub metric: String,

    pub dimensions: Vec<String>,

    /// Bound parameter values, in placeholder order.
    pub params: Vec<Literal>,

    /// The dialect used for generation.
    pub dialect: Dialect,

    /// The SQL query AST (for further manipulation if needed).
    #[serde(skip)]
    pub query: Query,
}

impl ResolvedQuery {
    /// Distinct physical databases (`catalog_id`s) the query touches.
    pub fn databases(&self) -> Vec<&str> {
        self.tables_used
            .iter()
            .map(|t| t.catalog_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether the query spans more than one physical database.
    pub fn is_cross_database(&self) -> bool {
        self.databases().len() > 1
    }
}

/// Preview of a compilation, without parameters or the query AST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub sql: String,
    pub tables_used: Vec<TableRef>,
    pub join_plan: JoinPlan,
    pub resolved_time_window: Option<TimeWindow>,
}

impl From<ResolvedQuery> for Explanation {
    fn from(resolved: ResolvedQuery) -> Self {
        Self {
            sql: resolved.sql,
            tables_used: resolved.tables_used,
            join_plan: resolved.join_plan,
            resolved_time_window: resolved.resolved_time_window,
        }
    }
}

// ============================================================================
// Compilation Functions
// ============================================================================

/// Compile `intent` against `catalog`, resolving time ranges at `now`.
///
/// Validation failures are reported all at once as
/// [`CompileError::Validation`]. A time range on a metric without a date
/// column fails with [`CompileError::NoTimeColumn`]. Neither kind of intent
/// reaches join resolution.
pub fn compile(
    catalog: &Catalog,
    intent: &QueryIntent,
    now: NaiveDate,
    options: &CompileOptions,
) -> CompileResult<ResolvedQuery> {
    // Step 1: Validate
    let window = match validation::validate_with_max_limit(intent, catalog, now, options.max_limit)
    {
        ValidationResult::Valid(window) => window,
        ValidationResult::Invalid(errors) => return Err(CompileError::Validation(errors)),
    };
    let metric = catalog.lookup_metric(&intent.metric)?;
    if window.is_some() && catalog.time_column_for(metric).is_none() {
        return Err(CompileError::NoTimeColumn {
            table: metric.table.clone(),
        });
    }

    // Step 2: Resolve joins
    let required = planner::required_tables(catalog, intent)?;
    let base = metric.table.clone();
    let join_plan = planner::resolve_join_plan(catalog, &base, &required)?;

    // Step 3: Emit SQL
    let emitted = planner::emit(
        catalog,
        intent,
        window.as_ref(),
        &join_plan,
        &options.render_options(),
    )?;

    let mut tables_used = vec![base];
    tables_used.extend(join_plan.joined_tables().cloned());

    let resolved = ResolvedQuery {
        sql: emitted.sql,
        tables_used,
        join_plan,
        resolved_time_window: window,
        metric: intent.metric.clone(),
        dimensions: intent.dimensions.clone(),
        params: emitted.params,
        dialect: options.dialect,
        query: emitted.query,
    };

    if resolved.is_cross_database() {
        warn!(
            metric = %resolved.metric,
            databases = ?resolved.databases(),
            "query spans multiple physical databases"
        );
    }
    debug!(
        metric = %resolved.metric,
        tables = resolved.tables_used.len(),
        dialect = %resolved.dialect,
        "intent compiled"
    );

    Ok(resolved)
}

/// Preview the SQL `compile` would produce.
pub fn explain(
    catalog: &Catalog,
    intent: &QueryIntent,
    now: NaiveDate,
    options: &CompileOptions,
) -> CompileResult<Explanation> {
    compile(catalog, intent, now, options).map(Explanation::from)
}
