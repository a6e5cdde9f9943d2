//! Serde helpers for rational quarter lengths
//!
//! Quarter lengths travel through JSON as either an integer (`2`), a
//! fraction string (`"1/3"`), or a terminating decimal string (`"0.75"`).
//! They are always serialized back as a fraction string so the value
//! survives exactly.

use num_rational::Rational64;
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

/// Parse a quarter length from `"n"`, `"n/d"` or a terminating decimal.
pub fn parse_quarter_length(text: &str) -> Option<Rational64> {
    let text = text.trim();
    if let Some((numer, denom)) = text.split_once('/') {
        let numer: i64 = numer.trim().parse().ok()?;
        let denom: i64 = denom.trim().parse().ok()?;
        if denom == 0 {
            return None;
        }
        return Some(Rational64::new(numer, denom));
    }
    if let Some((whole, frac)) = text.split_once('.') {
        if frac.is_empty() || frac.len() > 12 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let negative = whole.starts_with('-');
        let whole: i64 = if whole.is_empty() || whole == "-" { 0 } else { whole.parse().ok()? };
        let scale = 10i64.checked_pow(frac.len() as u32)?;
        let frac: i64 = frac.parse().ok()?;
        let frac = if negative { -frac } else { frac };
        let numer = whole.checked_mul(scale)?.checked_add(frac)?;
        return Some(Rational64::new(numer, scale));
    }
    text.parse::<i64>().ok().map(Rational64::from_integer)
}

/// Format a quarter length as `"n"` or `"n/d"`.
pub fn format_quarter_length(value: &Rational64) -> String {
    if value.is_integer() {
        value.numer().to_string()
    } else {
        format!("{}/{}", value.numer(), value.denom())
    }
}

pub mod quarter_length {
    use super::*;

    pub fn serialize<S>(value: &Rational64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_quarter_length(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Rational64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(QuarterLengthVisitor)
    }

    struct QuarterLengthVisitor;

    impl<'de> Visitor<'de> for QuarterLengthVisitor {
        type Value = Rational64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer or a fraction string such as \"3/2\"")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Rational64, E> {
            Ok(Rational64::from_integer(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Rational64, E> {
            i64::try_from(v)
                .map(Rational64::from_integer)
                .map_err(|_| E::custom("quarter length out of range"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Rational64, E> {
            // Only exact binary fractions are accepted; 1/3 must be spelled as a string.
            let scaled = v * 1024.0;
            if scaled.fract() == 0.0 && scaled.abs() < i64::MAX as f64 {
                Ok(Rational64::new(scaled as i64, 1024))
            } else {
                Err(E::custom(format!("{v} is not an exact quarter length; use a fraction string")))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Rational64, E> {
            parse_quarter_length(v).ok_or_else(|| E::custom(format!("invalid quarter length '{v}'")))
        }
    }
}

pub mod option_quarter_length {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapped(#[serde(with = "super::quarter_length")] Rational64);

    pub fn serialize<S>(value: &Option<Rational64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(Wrapped).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Rational64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fraction() {
        assert_eq!(parse_quarter_length("1/3"), Some(Rational64::new(1, 3)));
        assert_eq!(parse_quarter_length(" 3 / 2 "), Some(Rational64::new(3, 2)));
        assert_eq!(parse_quarter_length("1/0"), None);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_quarter_length("0.75"), Some(Rational64::new(3, 4)));
        assert_eq!(parse_quarter_length("4.5"), Some(Rational64::new(9, 2)));
        assert_eq!(parse_quarter_length("-0.5"), Some(Rational64::new(-1, 2)));
    }

    #[test]
    fn test_parse_decimal_overflow() {
        assert_eq!(parse_quarter_length("10000000.000000000001"), None);
        assert_eq!(parse_quarter_length("9223372036854775807.5"), None);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_quarter_length("4"), Some(Rational64::from_integer(4)));
        assert_eq!(parse_quarter_length("four"), None);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_quarter_length(&Rational64::new(6, 4)), "3/2");
        assert_eq!(format_quarter_length(&Rational64::from_integer(2)), "2");
    }
}
