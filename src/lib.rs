//! # Metrica
//!
//! A semantic metric catalog that compiles structured query intents to
//! multi-dialect SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                Catalog (TOML or programmatic)            │
//! │       (tables, metrics, dimensions, join edges)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!   QueryIntent ──────────▶│ [validation + time_range]
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │        Validated intent + resolved time window           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner::join_path]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Join plan rooted at the metric's table          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner::emit]
//! ┌─────────────────────────────────────────────────────────┐
//! │          SQL Query + metadata (ResolvedQuery)            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Compilation is synchronous and pure: it never reads the clock, opens a
//! connection or mutates the catalog, so one `Catalog` can serve any number
//! of concurrent callers.

pub mod catalog;
pub mod compile;
pub mod config;
pub mod intent;
pub mod planner;
pub mod sql;
pub mod time_range;
pub mod validation;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{
        Aggregation, Catalog, CatalogError, DataType, Dimension, JoinEdge, JoinKind, Metric,
        Table, TableRef,
    };
    pub use crate::compile::{
        compile, explain, CompileError, CompileOptions, Explanation, ResolvedQuery,
    };
    pub use crate::intent::{
        Filter, FilterOperator, FilterValue, QueryIntent, ScalarValue, TimeRange,
    };
    pub use crate::sql::{Dialect, IdentQuoting};
    pub use crate::time_range::TimeWindow;
    pub use crate::validation::{ValidationError, ValidationErrors, ValidationResult};
}

// Also export at crate root for convenience
pub use catalog::Catalog;
pub use compile::{compile, explain, CompileError, CompileOptions, ResolvedQuery};
pub use intent::QueryIntent;
pub use sql::Dialect;
