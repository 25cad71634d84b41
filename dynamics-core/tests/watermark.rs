//! Parameterised watermark parsing and ordering tests.
//!
//! Each `#[case]` is isolated.

use std::cmp::Ordering;

use dynamics_core::{format_datetime, parse_datetime, Watermark};
use rstest::rstest;

#[rstest]
#[case("2020-01-01T00:00:00Z", "2020-01-01T00:00:00Z")]
#[case("2020-01-01T00:00:00+00:00", "2020-01-01T00:00:00Z")]
#[case("2020-01-01T05:30:00+05:30", "2020-01-01T00:00:00Z")]
#[case("2020-01-01T00:00:00", "2020-01-01T00:00:00Z")]
#[case("2020-01-01 00:00:00", "2020-01-01T00:00:00Z")]
#[case("2020-01-01", "2020-01-01T00:00:00Z")]
#[case("2020-01-01T00:00:00.123456Z", "2020-01-01T00:00:00.123456Z")]
fn parse_then_format(#[case] input: &str, #[case] expected: &str) {
    let dt = parse_datetime(input).expect("parses");
    assert_eq!(format_datetime(dt), expected);
}

#[rstest]
#[case("2020-02-01T00:00:00Z", "2020-03-01T00:00:00Z", Ordering::Less)]
#[case("2020-03-01T00:00:00Z", "2020-03-01T00:00:00+00:00", Ordering::Equal)]
#[case("2020-03-01T00:00:00.1Z", "2020-03-01T00:00:00Z", Ordering::Greater)]
#[case("2020-03-01", "2020-02-28T23:59:59Z", Ordering::Greater)]
#[case("b", "a", Ordering::Greater)]
fn watermark_ordering(#[case] left: &str, #[case] right: &str, #[case] expected: Ordering) {
    assert_eq!(Watermark::from(left).compare(&Watermark::from(right)), expected);
}
