//! Catalog definitions: tables, metrics, dimensions and join edges.
//!
//! All definitions are plain immutable data once registered. Builder-style
//! `with_*` methods exist for programmatic construction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a physical table across possibly-separate physical databases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    /// Physical database the table lives in.
    pub catalog_id: String,
    /// Schema name, empty when the table is unqualified.
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        catalog_id: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog_id: catalog_id.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// `schema.table`, or just `table` when no schema is set.
    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.table.clone()
        } else {
            format!("{}.{}", self.schema, self.table)
        }
    }

    /// Whether a `table`, `schema.table` or `catalog_id.schema.table`
    /// reference names this table.
    pub fn matches(&self, reference: &str) -> bool {
        let parts: Vec<&str> = reference.split('.').collect();
        match parts.as_slice() {
            [table] => *table == self.table,
            [schema, table] => *schema == self.schema && *table == self.table,
            [catalog_id, schema, table] => {
                *catalog_id == self.catalog_id && *schema == self.schema && *table == self.table
            }
            _ => false,
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// A registered physical table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub table_ref: TableRef,
    /// Column holding the table's primary date axis, if it has one.
    pub date_column: Option<String>,
}

impl Table {
    pub fn new(table_ref: TableRef) -> Self {
        Self {
            table_ref,
            date_column: None,
        }
    }

    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = Some(column.into());
        self
    }
}

/// Aggregation applied to a metric expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Count,
    CountDistinct,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    /// SQL function name.
    pub fn function_name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "SUM",
            Aggregation::Count | Aggregation::CountDistinct => "COUNT",
            Aggregation::Avg => "AVG",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
        }
    }

    pub fn is_distinct(&self) -> bool {
        matches!(self, Aggregation::CountDistinct)
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::CountDistinct => "count_distinct",
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        };
        write!(f, "{}", name)
    }
}

/// A named, aggregatable quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub aggregation: Aggregation,
    pub table: TableRef,
    /// Column name or computed expression over the source table.
    pub expression: String,
    /// Date column overriding the table's date axis for time filtering.
    pub time_column: Option<String>,
    pub description: String,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        aggregation: Aggregation,
        table: TableRef,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            aggregation,
            table,
            expression: expression.into(),
            time_column: None,
            description: String::new(),
        }
    }

    pub fn with_time_column(mut self, column: impl Into<String>) -> Self {
        self.time_column = Some(column.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Value type of a dimension, used to coerce filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}

/// A named, groupable attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub table: TableRef,
    pub column: String,
    /// Computed expression used instead of `column` when set.
    pub expression: Option<String>,
    pub data_type: DataType,
    pub description: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, table: TableRef, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table,
            column: column.into(),
            expression: None,
            data_type: DataType::String,
            description: String::new(),
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The SQL text this dimension selects.
    pub fn sql_text(&self) -> &str {
        self.expression.as_deref().unwrap_or(&self.column)
    }
}

/// Join type for a catalog edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER"),
            JoinKind::Left => write!(f, "LEFT"),
        }
    }
}

/// A declared join between two tables.
///
/// Directed for rendering, undirected for reachability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JoinEdge {
    pub from: TableRef,
    pub to: TableRef,
    pub on_condition: String,
    pub kind: JoinKind,
}

impl JoinEdge {
    pub fn new(from: TableRef, to: TableRef, on_condition: impl Into<String>) -> Self {
        Self {
            from,
            to,
            on_condition: on_condition.into(),
            kind: JoinKind::Inner,
        }
    }

    pub fn with_kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this edge touches `table`.
    pub fn touches(&self, table: &TableRef) -> bool {
        &self.from == table || &self.to == table
    }

    /// The endpoint across from `table`, if the edge touches it.
    pub fn other_end(&self, table: &TableRef) -> Option<&TableRef> {
        if &self.from == table {
            Some(&self.to)
        } else if &self.to == table {
            Some(&self.from)
        } else {
            None
        }
    }
}

impl fmt::Display for JoinEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({} ON {})",
            self.from, self.to, self.kind, self.on_condition
        )
    }
}
