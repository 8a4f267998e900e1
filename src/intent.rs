//! Structured query intents.
//!
//! A [`QueryIntent`] names a metric, the dimensions to group by, an optional
//! time range, filters and a row limit. Intents are built by the caller
//! (directly, or from JSON produced by an upstream extractor) and are never
//! mutated by the compiler.
//!
//! ```json
//! {
//!   "metric": "revenue",
//!   "dimensions": ["country"],
//!   "time_range": {"type": "last_quarter"},
//!   "filters": [{"target": "country", "operator": "in", "value": ["US", "CA"]}],
//!   "limit": 100
//! }
//! ```

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A metric-oriented query description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryIntent {
    pub metric: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Signed so that non-positive values reach validation instead of
    /// failing deserialization.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl QueryIntent {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            dimensions: Vec::new(),
            time_range: None,
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimensions.push(dimension.into());
        self
    }

    pub fn with_dimensions<I, S>(mut self, dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions.extend(dimensions.into_iter().map(Into::into));
        self
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Semantic time range, resolved against a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeRange {
    /// Monday-aligned week before the current one.
    LastWeek,
    LastMonth,
    LastQuarter,
    LastYear,
    #[serde(rename = "last_n_days")]
    LastNDays { n: i64 },
    Custom { start: NaiveDate, end: NaiveDate },
    /// Monday-aligned week containing the reference date.
    CurrentWeek,
    CurrentMonth,
    CurrentQuarter,
    CurrentYear,
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::LastWeek => write!(f, "last_week"),
            TimeRange::LastMonth => write!(f, "last_month"),
            TimeRange::LastQuarter => write!(f, "last_quarter"),
            TimeRange::LastYear => write!(f, "last_year"),
            TimeRange::LastNDays { n } => write!(f, "last_{}_days", n),
            TimeRange::Custom { start, end } => write!(f, "custom({}, {})", start, end),
            TimeRange::CurrentWeek => write!(f, "current_week"),
            TimeRange::CurrentMonth => write!(f, "current_month"),
            TimeRange::CurrentQuarter => write!(f, "current_quarter"),
            TimeRange::CurrentYear => write!(f, "current_year"),
        }
    }
}

/// A predicate on a dimension or on the intent's metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    /// Dimension name, or the metric's own name.
    #[serde(alias = "field", alias = "dimension")]
    pub target: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(
        target: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            target: target.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn equals(target: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::new(target, FilterOperator::Eq, FilterValue::Scalar(value.into()))
    }

    pub fn in_list<V: Into<ScalarValue>>(
        target: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            target,
            FilterOperator::In,
            FilterValue::List(values.into_iter().map(Into::into).collect()),
        )
    }
}

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    #[serde(alias = "equals", alias = "=")]
    Eq,
    #[serde(alias = "not_equals", alias = "ne", alias = "!=")]
    Neq,
    #[serde(alias = "greater_than", alias = ">")]
    Gt,
    #[serde(alias = "less_than", alias = "<")]
    Lt,
    #[serde(alias = "greater_than_or_equal", alias = ">=")]
    Gte,
    #[serde(alias = "less_than_or_equal", alias = "<=")]
    Lte,
    In,
    NotIn,
}

impl FilterOperator {
    /// Whether the operator takes a list of values.
    pub fn takes_list(&self) -> bool {
        matches!(self, FilterOperator::In | FilterOperator::NotIn)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not_in",
        };
        write!(f, "{}", s)
    }
}

/// A single filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Int(n) => write!(f, "{}", n),
            ScalarValue::Float(x) => write!(f, "{}", x),
            ScalarValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Int(n)
    }
}

impl From<f64> for ScalarValue {
    fn from(x: f64) -> Self {
        ScalarValue::Float(x)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Text(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Text(s)
    }
}

/// Filter operand: one value, or a list for `in` / `not_in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<ScalarValue>),
    Scalar(ScalarValue),
}

impl From<ScalarValue> for FilterValue {
    fn from(value: ScalarValue) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<Vec<ScalarValue>> for FilterValue {
    fn from(values: Vec<ScalarValue>) -> Self {
        FilterValue::List(values)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Scalar(s.into())
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Scalar(n.into())
    }
}

impl From<f64> for FilterValue {
    fn from(x: f64) -> Self {
        FilterValue::Scalar(x.into())
    }
}
