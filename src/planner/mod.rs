//! Query planning for validated intents.
//!
//! Two phases:
//! 1. Join path resolution: required tables → join plan rooted at the metric's table
//! 2. Emission: intent + join plan + time window → structured [`Query`](crate::sql::Query)

pub mod emit;
pub mod join_path;

pub use emit::{emit, Emitted, RenderOptions};
pub use join_path::{required_tables, resolve_join_plan, JoinPlan, JoinStep};

use thiserror::Error;

use crate::catalog::{CatalogError, TableRef};

/// Errors that can occur during planning.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Cannot join '{unreachable}' to base table '{base}': no join path in catalog")]
    UnresolvableJoin { base: TableRef, unreachable: TableRef },

    #[error("Table '{table}' is referenced but not registered in the catalog")]
    UnknownTable { table: TableRef },

    #[error("Time range requested but table '{table}' declares no date column")]
    NoTimeColumn { table: TableRef },

    #[error("Invalid catalog expression for {owner}: {message}")]
    InvalidExpression { owner: String, message: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type PlanResult<T> = Result<T, PlanError>;
