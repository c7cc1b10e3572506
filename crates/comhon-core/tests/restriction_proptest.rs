#![allow(clippy::unwrap_used, clippy::expect_used)]

use comhon_core::restriction::{Interval, IntervalDomain, IntervalValue, Restriction, Subject};
use comhon_core::Value;
use proptest::prelude::*;

proptest! {
    #[test]
    fn closed_interval_accepts_exactly_its_range(n in -50i64..60) {
        let interval = Interval::parse("[0,10]", IntervalDomain::Integer).unwrap();
        prop_assert_eq!(interval.contains(&IntervalValue::Integer(n)), (0..=10).contains(&n));
    }

    #[test]
    fn open_interval_excludes_its_bounds(n in -50i64..60) {
        let interval = Interval::parse("]0,10[", IntervalDomain::Integer).unwrap();
        prop_assert_eq!(interval.contains(&IntervalValue::Integer(n)), n > 0 && n < 10);
    }

    #[test]
    fn half_bounded_interval(n in any::<i64>()) {
        let interval = Interval::parse("[5,]", IntervalDomain::Integer).unwrap();
        prop_assert_eq!(interval.contains(&IntervalValue::Integer(n)), n >= 5);
    }

    #[test]
    fn length_counts_characters(s in "[a-zé]{0,8}") {
        let restriction = Restriction::Length(Interval::parse("[2,4]", IntervalDomain::Integer).unwrap());
        let value = Value::String(s.clone());
        let count = s.chars().count();
        prop_assert_eq!(restriction.satisfy(Subject::Value(&value), 0), (2..=4).contains(&count));
    }

    #[test]
    fn size_honours_increment(count in 0usize..6, increment in -1i64..2) {
        let restriction = Restriction::Size(Interval::parse("[0,3]", IntervalDomain::Integer).unwrap());
        let expected = (0..=3).contains(&(count as i64 + increment));
        prop_assert_eq!(restriction.satisfy(Subject::Count(count), increment), expected);
    }
}

#[test]
fn null_only_fails_not_null() {
    let interval = Restriction::Interval(Interval::parse("[0,1]", IntervalDomain::Integer).unwrap());
    assert!(interval.satisfy(Subject::Value(&Value::Null), 0));
    assert!(!Restriction::NotNull.satisfy(Subject::Value(&Value::Null), 0));
}

#[test]
fn reversed_bounds_are_rejected() {
    assert!(Interval::parse("[10,0]", IntervalDomain::Integer).is_err());
    assert!(Interval::parse("(0,1)", IntervalDomain::Integer).is_err());
}
