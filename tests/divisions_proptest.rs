// Property tests for the divisions lattice

use musicxml_export::models::QuarterLength;
use musicxml_export::renderers::musicxml::duration::{minimum_quarter_length, Divisions};
use proptest::prelude::*;

/// Lengths built from the denominators real notation produces
fn quarter_length() -> impl Strategy<Value = QuarterLength> {
    let denominators = prop::sample::select(vec![1i64, 2, 3, 4, 5, 6, 7, 8, 12, 16, 24, 32, 48, 64]);
    (1i64..200, denominators).prop_map(|(numer, denom)| QuarterLength::new(numer, denom))
}

proptest! {
    #[test]
    fn prop_every_length_lands_on_the_lattice(values in prop::collection::vec(quarter_length(), 1..12)) {
        let divisions = Divisions::for_quarter_lengths(values.iter().copied()).unwrap();
        for value in &values {
            let units = divisions.to_units(*value).unwrap();
            prop_assert_eq!(divisions.to_quarter_length(units), *value);
        }
    }

    #[test]
    fn prop_divisions_are_minimal(value in quarter_length()) {
        let divisions = Divisions::for_quarter_lengths([value]).unwrap();
        prop_assert_eq!(divisions.per_quarter(), value.denom().unsigned_abs());
    }

    #[test]
    fn prop_unified_divisions_serve_every_part(
        a in prop::collection::vec(quarter_length(), 1..6),
        b in prop::collection::vec(quarter_length(), 1..6),
    ) {
        let da = Divisions::for_quarter_lengths(a.iter().copied()).unwrap();
        let db = Divisions::for_quarter_lengths(b.iter().copied()).unwrap();
        let shared = Divisions::unify([da, db]).unwrap();
        for value in a.iter().chain(b.iter()) {
            prop_assert!(shared.to_units(*value).is_ok());
        }
    }

    #[test]
    fn prop_too_short_is_rejected(denom in 513i64..4096) {
        let value = QuarterLength::new(1, denom);
        let divisions = Divisions::new(4096 * 4095);
        prop_assert!(value < minimum_quarter_length());
        prop_assert!(divisions.to_units(value).is_err());
    }
}
