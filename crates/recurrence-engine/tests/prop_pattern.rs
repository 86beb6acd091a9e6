//! Property-based tests for translating patterns to and from canonical rule text.
//!
//! Any pattern the translator accepts must come back from a canonical round
//! trip as its normalized form.

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use proptest::prelude::*;
use recurrence_engine::{
    from_canonical, to_canonical, PatternEnd, PatternFrequency, RecurrencePattern, RuleError, Until,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_frequency() -> impl Strategy<Value = PatternFrequency> {
    prop_oneof![
        Just(PatternFrequency::Daily),
        Just(PatternFrequency::Weekly),
        Just(PatternFrequency::Monthly),
        Just(PatternFrequency::Yearly),
    ]
}

fn arb_weekday() -> impl Strategy<Value = Weekday> {
    (0u8..7).prop_map(|n| Weekday::try_from(n).expect("0..7 is a weekday"))
}

fn arb_naive() -> impl Strategy<Value = NaiveDateTime> {
    (2000i32..=2100, 1u32..=12, 1u32..=28, 0u32..=23, 0u32..=59, 0u32..=59).prop_map(
        |(y, m, d, h, min, s)| {
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|date| date.and_hms_opt(h, min, s))
                .expect("day capped at 28")
        },
    )
}

fn arb_until() -> impl Strategy<Value = Until> {
    prop_oneof![
        arb_naive().prop_map(|n| Until::Date(n.date())),
        arb_naive().prop_map(Until::Floating),
        arb_naive().prop_map(|n| Until::Utc(n.and_utc())),
    ]
}

fn arb_ends() -> impl Strategy<Value = PatternEnd> {
    prop_oneof![
        Just(PatternEnd::Never),
        (0u32..=500).prop_map(|count| PatternEnd::After { count }),
        arb_until().prop_map(|until| PatternEnd::Until { until }),
    ]
}

/// In-range month day: 1..=31 or -31..=-1.
fn arb_month_day() -> impl Strategy<Value = i8> {
    prop_oneof![1i8..=31, -31i8..=-1]
}

/// Patterns with in-range predicates, in any order and with duplicates. Lists
/// of every frequency are populated, not only the one the frequency uses.
fn arb_pattern() -> impl Strategy<Value = RecurrencePattern> {
    (
        arb_frequency(),
        0u32..=60,
        arb_ends(),
        prop::collection::vec(arb_weekday(), 0..10),
        prop::collection::vec(arb_month_day(), 0..10),
        prop::collection::vec(1u8..=12, 0..10),
    )
        .prop_map(
            |(frequency, interval, ends, week_days, month_days, months)| RecurrencePattern {
                frequency,
                interval,
                ends,
                week_days,
                month_days,
                months,
            },
        )
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 512,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: Round trip yields the normalized pattern
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn round_trip_yields_normalized_pattern(pattern in arb_pattern()) {
        let text = to_canonical(&pattern)
            .expect("in-range predicates are accepted")
            .expect("repeating pattern has canonical text");
        prop_assert_eq!(from_canonical(&text), Ok(pattern.clone().normalized()), "text {}", text);
    }
}

// ---------------------------------------------------------------------------
// Property 2: Canonical text is stable under a second round trip
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn canonical_text_is_a_fixed_point(pattern in arb_pattern()) {
        let text = to_canonical(&pattern).unwrap().unwrap();
        let again = to_canonical(&from_canonical(&text).unwrap()).unwrap().unwrap();
        prop_assert_eq!(again, text);
    }
}

// ---------------------------------------------------------------------------
// Property 3: Serialized patterns deserialize to their normalized form
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn json_round_trip_normalizes(pattern in arb_pattern()) {
        let json = serde_json::to_string(&pattern).unwrap();
        let back: RecurrencePattern = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.clone().normalized(), pattern.normalized());
        // Deserialization alone never leaves unsorted or duplicated lists.
        prop_assert!(back.month_days.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(back.months.windows(2).all(|w| w[0] < w[1]));
    }
}

// ---------------------------------------------------------------------------
// Property 4: Out-of-range predicates are rejected, never written
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn out_of_range_month_is_rejected(month in prop_oneof![Just(0u8), 13u8..=255]) {
        let pattern = RecurrencePattern {
            frequency: PatternFrequency::Yearly,
            months: vec![6, month],
            ..RecurrencePattern::none()
        };
        prop_assert!(matches!(to_canonical(&pattern), Err(RuleError::MalformedRule(_))));
    }

    #[test]
    fn out_of_range_month_day_is_rejected(
        day in prop_oneof![Just(0i8), 32i8..=127, -128i8..=-32],
    ) {
        let pattern = RecurrencePattern {
            frequency: PatternFrequency::Monthly,
            month_days: vec![day],
            ..RecurrencePattern::none()
        };
        prop_assert!(matches!(to_canonical(&pattern), Err(RuleError::MalformedRule(_))));
    }
}
