//! Intent validation.
//!
//! [`validate`] checks a [`QueryIntent`] against a [`Catalog`] and collects
//! every violation into one ordered report instead of stopping at the first.
//! The checks run in a fixed order and none depends on another's outcome:
//!
//! 1. the metric exists
//! 2. each dimension exists
//! 3. each filter targets a dimension or the metric itself
//! 4. the limit is positive
//! 5. the time range resolves
//!
//! followed by duplicate dimensions, filter value shape and the optional
//! upper bound on `limit`.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{Catalog, DataType};
use crate::intent::{Filter, FilterValue, QueryIntent, ScalarValue};
use crate::time_range::{self, TimeWindow};

/// A single intent-level problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Intent field at fault, e.g. `metric`, `dimensions[1]`, `filters[0].value`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every problem found in one intent, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid query intent ({} error", self.0.len())?;
        if self.0.len() != 1 {
            write!(f, "s")?;
        }
        write!(f, ")")?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Outcome of validating an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The intent is well formed. Carries the resolved window, if any.
    Valid(Option<TimeWindow>),
    Invalid(ValidationErrors),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn into_result(self) -> Result<Option<TimeWindow>, ValidationErrors> {
        match self {
            ValidationResult::Valid(window) => Ok(window),
            ValidationResult::Invalid(errors) => Err(errors),
        }
    }
}

/// Validate `intent` against `catalog`, resolving its time range at `now`.
pub fn validate(intent: &QueryIntent, catalog: &Catalog, now: NaiveDate) -> ValidationResult {
    validate_with_max_limit(intent, catalog, now, None)
}

/// Like [`validate`], additionally rejecting a `limit` above `max_limit`.
pub fn validate_with_max_limit(
    intent: &QueryIntent,
    catalog: &Catalog,
    now: NaiveDate,
    max_limit: Option<u64>,
) -> ValidationResult {
    let mut errors = Vec::new();

    validate_metric(intent, catalog, &mut errors);
    validate_dimensions(intent, catalog, &mut errors);
    validate_filter_targets(intent, catalog, &mut errors);
    validate_limit(intent, &mut errors);
    let window = validate_time_range(intent, now, &mut errors);

    validate_duplicate_dimensions(intent, &mut errors);
    validate_filter_values(intent, catalog, &mut errors);
    validate_max_limit(intent, max_limit, &mut errors);

    if errors.is_empty() {
        ValidationResult::Valid(window)
    } else {
        debug!(metric = %intent.metric, errors = errors.len(), "intent rejected");
        ValidationResult::Invalid(ValidationErrors(errors))
    }
}

fn validate_metric(intent: &QueryIntent, catalog: &Catalog, errors: &mut Vec<ValidationError>) {
    if catalog.lookup_metric(&intent.metric).is_err() {
        errors.push(ValidationError::new(
            "metric",
            format!(
                "unknown metric '{}' (available: {})",
                intent.metric,
                available(catalog.all_metrics().iter().map(|m| m.name.as_str()))
            ),
        ));
    }
}

fn validate_dimensions(
    intent: &QueryIntent,
    catalog: &Catalog,
    errors: &mut Vec<ValidationError>,
) {
    for (i, name) in intent.dimensions.iter().enumerate() {
        if catalog.lookup_dimension(name).is_err() {
            errors.push(ValidationError::new(
                format!("dimensions[{}]", i),
                format!(
                    "unknown dimension '{}' (available: {})",
                    name,
                    available(catalog.all_dimensions().iter().map(|d| d.name.as_str()))
                ),
            ));
        }
    }
}

fn validate_filter_targets(
    intent: &QueryIntent,
    catalog: &Catalog,
    errors: &mut Vec<ValidationError>,
) {
    for (i, filter) in intent.filters.iter().enumerate() {
        if filter.target != intent.metric && catalog.lookup_dimension(&filter.target).is_err() {
            errors.push(ValidationError::new(
                format!("filters[{}].target", i),
                format!(
                    "unknown filter target '{}': must be a dimension or the metric '{}'",
                    filter.target, intent.metric
                ),
            ));
        }
    }
}

fn validate_limit(intent: &QueryIntent, errors: &mut Vec<ValidationError>) {
    if let Some(limit) = intent.limit {
        if limit <= 0 {
            errors.push(ValidationError::new(
                "limit",
                format!("limit must be a positive integer, got {}", limit),
            ));
        }
    }
}

fn validate_time_range(
    intent: &QueryIntent,
    now: NaiveDate,
    errors: &mut Vec<ValidationError>,
) -> Option<TimeWindow> {
    match time_range::resolve_optional(intent.time_range.as_ref(), now) {
        Ok(window) => window,
        Err(e) => {
            errors.push(ValidationError::new("time_range", e.reason));
            None
        }
    }
}

fn validate_duplicate_dimensions(intent: &QueryIntent, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for (i, name) in intent.dimensions.iter().enumerate() {
        if !seen.insert(name.as_str()) {
            errors.push(ValidationError::new(
                format!("dimensions[{}]", i),
                format!("dimension '{}' is requested more than once", name),
            ));
        }
    }
}

fn validate_filter_values(
    intent: &QueryIntent,
    catalog: &Catalog,
    errors: &mut Vec<ValidationError>,
) {
    for (i, filter) in intent.filters.iter().enumerate() {
        let field = format!("filters[{}].value", i);

        match (&filter.value, filter.operator.takes_list()) {
            (FilterValue::Scalar(_), true) => {
                errors.push(ValidationError::new(
                    field,
                    format!("operator '{}' requires a list of values", filter.operator),
                ));
                continue;
            }
            (FilterValue::List(_), false) => {
                errors.push(ValidationError::new(
                    field,
                    format!("operator '{}' requires a single value", filter.operator),
                ));
                continue;
            }
            _ => {}
        }

        let is_date = filter.target != intent.metric
            && catalog
                .lookup_dimension(&filter.target)
                .map(|d| d.data_type == DataType::Date)
                .unwrap_or(false);

        for value in values(filter) {
            if let Some(message) = check_scalar(value, is_date) {
                errors.push(ValidationError::new(field.clone(), message));
            }
        }
    }
}

fn validate_max_limit(
    intent: &QueryIntent,
    max_limit: Option<u64>,
    errors: &mut Vec<ValidationError>,
) {
    if let (Some(limit), Some(max)) = (intent.limit, max_limit) {
        if limit > 0 && limit as u64 > max {
            errors.push(ValidationError::new(
                "limit",
                format!("limit {} exceeds the maximum of {}", limit, max),
            ));
        }
    }
}

fn values(filter: &Filter) -> Vec<&ScalarValue> {
    match &filter.value {
        FilterValue::Scalar(v) => vec![v],
        FilterValue::List(vs) => vs.iter().collect(),
    }
}

fn check_scalar(value: &ScalarValue, is_date: bool) -> Option<String> {
    match value {
        ScalarValue::Float(x) if !x.is_finite() => {
            Some(format!("non-finite number {} is not allowed", x))
        }
        ScalarValue::Text(s) if is_date => s
            .parse::<NaiveDate>()
            .err()
            .map(|_| format!("'{}' is not a valid YYYY-MM-DD date", s)),
        _ => None,
    }
}

fn available<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<&str> = names.collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}
