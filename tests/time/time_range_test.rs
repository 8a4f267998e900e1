//! Integration tests for semantic time range resolution.

#[path = "../common/mod.rs"]
mod common;

use common::{date, now};
use metrica::intent::TimeRange;
use metrica::time_range::{resolve, resolve_optional, TimeWindow};

fn window(range: TimeRange, reference: chrono::NaiveDate) -> (chrono::NaiveDate, chrono::NaiveDate) {
    let w = resolve(&range, reference).unwrap();
    (w.start, w.end)
}

// ============================================================================
// Relative Ranges
// ============================================================================

#[test]
fn test_previous_periods() {
    assert_eq!(
        window(TimeRange::LastWeek, now()),
        (date(2024, 5, 6), date(2024, 5, 13))
    );
    assert_eq!(
        window(TimeRange::LastMonth, now()),
        (date(2024, 4, 1), date(2024, 5, 1))
    );
    assert_eq!(
        window(TimeRange::LastQuarter, now()),
        (date(2024, 1, 1), date(2024, 4, 1))
    );
    assert_eq!(
        window(TimeRange::LastYear, now()),
        (date(2023, 1, 1), date(2024, 1, 1))
    );
}

#[test]
fn test_current_periods() {
    assert_eq!(
        window(TimeRange::CurrentWeek, now()),
        (date(2024, 5, 13), date(2024, 5, 20))
    );
    assert_eq!(
        window(TimeRange::CurrentMonth, now()),
        (date(2024, 5, 1), date(2024, 6, 1))
    );
    assert_eq!(
        window(TimeRange::CurrentQuarter, now()),
        (date(2024, 4, 1), date(2024, 7, 1))
    );
    assert_eq!(
        window(TimeRange::CurrentYear, now()),
        (date(2024, 1, 1), date(2025, 1, 1))
    );
}

#[test]
fn test_year_wraparound() {
    let january = date(2024, 1, 10);
    assert_eq!(
        window(TimeRange::LastMonth, january),
        (date(2023, 12, 1), date(2024, 1, 1))
    );
    assert_eq!(
        window(TimeRange::LastQuarter, january),
        (date(2023, 10, 1), date(2024, 1, 1))
    );

    let december = date(2023, 12, 31);
    assert_eq!(
        window(TimeRange::CurrentMonth, december),
        (date(2023, 12, 1), date(2024, 1, 1))
    );
    assert_eq!(
        window(TimeRange::CurrentQuarter, december),
        (date(2023, 10, 1), date(2024, 1, 1))
    );
}

#[test]
fn test_week_starts_on_monday() {
    // 2024-05-13 is itself a Monday
    assert_eq!(
        window(TimeRange::CurrentWeek, date(2024, 5, 13)),
        (date(2024, 5, 13), date(2024, 5, 20))
    );
    // Sunday belongs to the week that started six days earlier
    assert_eq!(
        window(TimeRange::CurrentWeek, date(2024, 5, 19)),
        (date(2024, 5, 13), date(2024, 5, 20))
    );
}

// ============================================================================
// Rolling and Custom Ranges
// ============================================================================

#[test]
fn test_last_n_days_excludes_reference_date() {
    let w = resolve(&TimeRange::LastNDays { n: 7 }, now()).unwrap();
    assert_eq!(w, TimeWindow {
        start: date(2024, 5, 8),
        end: date(2024, 5, 15),
    });
    assert_eq!(w.num_days(), 7);
    assert!(w.contains(date(2024, 5, 14)));
    assert!(!w.contains(now()));
}

#[test]
fn test_last_n_days_crosses_month_boundary() {
    assert_eq!(
        window(TimeRange::LastNDays { n: 30 }, date(2024, 3, 10)),
        (date(2024, 2, 9), date(2024, 3, 10))
    );
}

#[test]
fn test_last_n_days_requires_positive_n() {
    for n in [0, -3] {
        let err = resolve(&TimeRange::LastNDays { n }, now()).unwrap_err();
        assert!(err.reason.contains("n > 0"), "{}", err);
    }
}

#[test]
fn test_custom_range() {
    let range = TimeRange::Custom {
        start: date(2024, 2, 1),
        end: date(2024, 3, 1),
    };
    assert_eq!(window(range, now()), (date(2024, 2, 1), date(2024, 3, 1)));

    let empty = TimeRange::Custom {
        start: date(2024, 2, 1),
        end: date(2024, 2, 1),
    };
    assert!(resolve(&empty, now()).is_err());

    let reversed = TimeRange::Custom {
        start: date(2024, 3, 1),
        end: date(2024, 2, 1),
    };
    let err = resolve(&reversed, now()).unwrap_err();
    assert!(err.to_string().starts_with("invalid time range: "));
}

#[test]
fn test_resolution_is_deterministic() {
    let first = resolve(&TimeRange::LastQuarter, now()).unwrap();
    let second = resolve(&TimeRange::LastQuarter, now()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_no_range_means_no_window() {
    assert_eq!(resolve_optional(None, now()).unwrap(), None);
    assert_eq!(
        resolve_optional(Some(&TimeRange::LastMonth), now()).unwrap(),
        Some(TimeWindow {
            start: date(2024, 4, 1),
            end: date(2024, 5, 1),
        })
    );
}

// ============================================================================
// Wire Format
// ============================================================================

#[test]
fn test_time_range_json() {
    let range: TimeRange = serde_json::from_str(r#"{"type": "last_n_days", "n": 14}"#).unwrap();
    assert_eq!(range, TimeRange::LastNDays { n: 14 });

    let range: TimeRange = serde_json::from_str(
        r#"{"type": "custom", "start": "2024-01-01", "end": "2024-02-01"}"#,
    )
    .unwrap();
    assert_eq!(
        range,
        TimeRange::Custom {
            start: date(2024, 1, 1),
            end: date(2024, 2, 1),
        }
    );

    assert!(serde_json::from_str::<TimeRange>(r#"{"type": "last_decade"}"#).is_err());
}
