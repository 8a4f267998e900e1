//! Integration tests for intent validation.

#[path = "../common/mod.rs"]
mod common;

use common::{date, now, retail_catalog, sample_catalog};
use metrica::intent::{Filter, FilterOperator, QueryIntent, ScalarValue, TimeRange};
use metrica::time_range::TimeWindow;
use metrica::validation::{validate, validate_with_max_limit, ValidationErrors, ValidationResult};

fn errors_of(result: ValidationResult) -> ValidationErrors {
    match result {
        ValidationResult::Invalid(errors) => errors,
        ValidationResult::Valid(_) => panic!("expected validation to fail"),
    }
}

fn fields(errors: &ValidationErrors) -> Vec<&str> {
    errors.iter().map(|e| e.field.as_str()).collect()
}

// ============================================================================
// Valid Intents
// ============================================================================

#[test]
fn test_valid_intent_carries_window() {
    let intent = QueryIntent::new("revenue")
        .with_dimensions(["country", "category"])
        .with_time_range(TimeRange::LastQuarter)
        .with_filter(Filter::in_list("country", ["US", "CA"]))
        .with_filter(Filter::new("revenue", FilterOperator::Gt, 1000_i64))
        .with_limit(10);

    let result = validate(&intent, &retail_catalog(), now());
    assert_eq!(
        result,
        ValidationResult::Valid(Some(TimeWindow {
            start: date(2024, 1, 1),
            end: date(2024, 4, 1),
        }))
    );
}

#[test]
fn test_valid_intent_without_time_range() {
    let result = validate(&QueryIntent::new("order_count"), &retail_catalog(), now());
    assert!(result.is_valid());
    assert_eq!(result.into_result().unwrap(), None);
}

// ============================================================================
// Unknown Names
// ============================================================================

#[test]
fn test_unknown_metric_reports_one_error() {
    let intent = QueryIntent::new("nonexistent_metric");
    let errors = errors_of(validate(&intent, &retail_catalog(), now()));

    assert_eq!(errors.len(), 1);
    assert_eq!(errors.errors()[0].field, "metric");
    assert_eq!(
        errors.errors()[0].message,
        "unknown metric 'nonexistent_metric' (available: revenue, order_count)"
    );
}

#[test]
fn test_one_error_per_unknown_name() {
    let intent = QueryIntent::new("profit")
        .with_dimensions(["country", "region", "channel"])
        .with_filter(Filter::equals("store", "S1"));

    let errors = errors_of(validate(&intent, &retail_catalog(), now()));
    assert_eq!(
        fields(&errors),
        vec!["metric", "dimensions[1]", "dimensions[2]", "filters[0].target"]
    );
    assert!(errors.errors()[1].message.contains("'region'"));
    assert!(errors.errors()[2].message.contains("'channel'"));
}

#[test]
fn test_filter_may_target_the_metric() {
    let intent =
        QueryIntent::new("revenue").with_filter(Filter::new("revenue", FilterOperator::Gte, 5.5_f64));
    assert!(validate(&intent, &retail_catalog(), now()).is_valid());

    // ...but not some other metric
    let intent = QueryIntent::new("revenue")
        .with_filter(Filter::new("order_count", FilterOperator::Gt, 10_i64));
    let errors = errors_of(validate(&intent, &retail_catalog(), now()));
    assert_eq!(fields(&errors), vec!["filters[0].target"]);
}

// ============================================================================
// Check Order
// ============================================================================

#[test]
fn test_errors_follow_check_order() {
    let intent = QueryIntent::new("profit")
        .with_dimension("region")
        .with_filter(Filter::equals("store", "S1"))
        .with_time_range(TimeRange::LastNDays { n: 0 })
        .with_limit(0);

    let errors = errors_of(validate(&intent, &retail_catalog(), now()));
    assert_eq!(
        fields(&errors),
        vec![
            "metric",
            "dimensions[0]",
            "filters[0].target",
            "limit",
            "time_range"
        ]
    );
}

#[test]
fn test_limit_and_time_range_problems() {
    let intent = QueryIntent::new("revenue")
        .with_time_range(TimeRange::Custom {
            start: date(2024, 3, 1),
            end: date(2024, 1, 1),
        })
        .with_limit(-5);

    let errors = errors_of(validate(&intent, &retail_catalog(), now()));
    assert_eq!(fields(&errors), vec!["limit", "time_range"]);
    assert_eq!(
        errors.errors()[0].message,
        "limit must be a positive integer, got -5"
    );
}

#[test]
fn test_max_limit() {
    let intent = QueryIntent::new("revenue").with_limit(5000);
    let catalog = retail_catalog();

    assert!(validate_with_max_limit(&intent, &catalog, now(), None).is_valid());
    assert!(validate_with_max_limit(&intent, &catalog, now(), Some(5000)).is_valid());

    let errors = errors_of(validate_with_max_limit(&intent, &catalog, now(), Some(1000)));
    assert_eq!(errors.errors()[0].message, "limit 5000 exceeds the maximum of 1000");
}

// ============================================================================
// Filter Values
// ============================================================================

#[test]
fn test_filter_value_shape_must_match_operator() {
    let intent = QueryIntent::new("revenue")
        .with_filter(Filter::new("country", FilterOperator::In, "US"))
        .with_filter(Filter::new(
            "status",
            FilterOperator::Eq,
            vec![ScalarValue::from("paid"), ScalarValue::from("open")],
        ));

    let errors = errors_of(validate(&intent, &retail_catalog(), now()));
    assert_eq!(fields(&errors), vec!["filters[0].value", "filters[1].value"]);
    assert_eq!(
        errors.errors()[0].message,
        "operator 'in' requires a list of values"
    );
    assert_eq!(
        errors.errors()[1].message,
        "operator 'eq' requires a single value"
    );
}

#[test]
fn test_non_finite_numbers_are_rejected() {
    let intent = QueryIntent::new("revenue")
        .with_filter(Filter::new("revenue", FilterOperator::Gt, f64::NAN));
    let errors = errors_of(validate(&intent, &retail_catalog(), now()));
    assert_eq!(fields(&errors), vec!["filters[0].value"]);
}

#[test]
fn test_date_dimension_values_must_parse() {
    let catalog = sample_catalog();

    let intent = QueryIntent::new("revenue")
        .with_filter(Filter::new("order_date", FilterOperator::Gte, "2024-02-01"));
    assert!(validate(&intent, &catalog, now()).is_valid());

    let intent = QueryIntent::new("revenue")
        .with_filter(Filter::new("order_date", FilterOperator::Gte, "last tuesday"));
    let errors = errors_of(validate(&intent, &catalog, now()));
    assert_eq!(
        errors.errors()[0].message,
        "'last tuesday' is not a valid YYYY-MM-DD date"
    );
}

#[test]
fn test_duplicate_dimensions() {
    let intent = QueryIntent::new("revenue").with_dimensions(["country", "status", "country"]);
    let errors = errors_of(validate(&intent, &retail_catalog(), now()));
    assert_eq!(fields(&errors), vec!["dimensions[2]"]);
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_errors_display() {
    let intent = QueryIntent::new("profit").with_dimension("region");
    let errors = errors_of(validate(&intent, &retail_catalog(), now()));

    let message = errors.to_string();
    assert!(message.starts_with("Invalid query intent (2 errors)\n  - metric: unknown metric 'profit'"));
    assert!(message.contains("\n  - dimensions[0]: unknown dimension 'region'"));
}

#[test]
fn test_errors_serialize_as_list() {
    let intent = QueryIntent::new("profit");
    let errors = errors_of(validate(&intent, &retail_catalog(), now()));

    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json[0]["field"], "metric");
    assert_eq!(json.as_array().unwrap().len(), 1);
}
