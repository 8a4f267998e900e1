//! Catalog errors.

use std::fmt;
use std::path::PathBuf;

/// Kind of catalog definition an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Table,
    Metric,
    Dimension,
    JoinEdge,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionKind::Table => write!(f, "table"),
            DefinitionKind::Metric => write!(f, "metric"),
            DefinitionKind::Dimension => write!(f, "dimension"),
            DefinitionKind::JoinEdge => write!(f, "join edge"),
        }
    }
}

/// Errors raised while building or querying the catalog.
///
/// Everything except `NotFound` is a startup error: a catalog that fails to
/// build must never serve queries.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate {kind} definition: '{name}'")]
    DuplicateDefinition { kind: DefinitionKind, name: String },

    #[error("Unknown {kind}: '{name}'")]
    NotFound { kind: DefinitionKind, name: String },

    #[error("Invalid identifier for {kind} '{name}': '{value}'")]
    InvalidIdentifier {
        kind: DefinitionKind,
        name: String,
        value: String,
    },

    #[error("Invalid SQL expression in {owner} ('{expression}'): {message}")]
    InvalidExpression {
        owner: String,
        expression: String,
        message: String,
    },

    #[error("{owner} references unknown or ambiguous table '{table}'")]
    UnknownTable { owner: String, table: String },

    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
