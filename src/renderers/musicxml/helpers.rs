//! Helper utilities for MusicXML export
//!
//! Contains the logging macro, integer math, measure-number ordering, and
//! small formatting routines used across the MusicXML module.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

/// Log target shared by everything under `renderers::musicxml`
pub const LOG_TARGET: &str = "musicxml";

/// Log a message for MusicXML export
pub fn log_musicxml(message: &str) {
    log::debug!(target: LOG_TARGET, "[MusicXML] {}", message);
}

/// Logging macro for MusicXML export
#[macro_export]
macro_rules! musicxml_log {
    ($($arg:tt)*) => {
        $crate::renderers::musicxml::helpers::log_musicxml(&format!($($arg)*));
    };
}

/// Calculate least common multiple, `None` on overflow
pub fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

/// Calculate greatest common divisor
pub fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

static MEASURE_NUMBER_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*(\d*)\s*(.*?)\s*$").ok());

/// Measure number split into numeric prefix and suffix ("12a" → 12, "a")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureNumber {
    pub number: u64,
    pub suffix: String,
}

impl MeasureNumber {
    pub fn new(number: u64, suffix: impl Into<String>) -> Self {
        Self { number, suffix: suffix.into() }
    }

    /// Parse a written measure number; a missing numeric prefix counts as 0
    pub fn parse(text: &str) -> Self {
        match MEASURE_NUMBER_RE.as_ref().and_then(|re| re.captures(text)) {
            Some(caps) => {
                let number = caps
                    .get(1)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                let suffix = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                Self::new(number, suffix)
            }
            None => Self::new(0, text.trim()),
        }
    }
}

impl PartialOrd for MeasureNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MeasureNumber {
    /// Numeric prefix first, then suffix with the empty suffix first
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

/// Compare two written measure numbers
pub fn compare_measure_numbers(a: &str, b: &str) -> Ordering {
    MeasureNumber::parse(a).cmp(&MeasureNumber::parse(b))
}

/// Normalize an ending label to `(number, display text)`
///
/// `"2, 1."` becomes `("1,2", "1., 2.")`. Duplicates are dropped and the
/// numbers sorted with the measure-number order.
pub fn normalize_ending_numbers(label: &str) -> (String, String) {
    let mut numbers: Vec<String> = label
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|part| part.trim().trim_end_matches('.').trim().to_string())
        .filter(|part| !part.is_empty())
        .collect();
    numbers.sort_by(|a, b| compare_measure_numbers(a, b));
    numbers.dedup();

    let number = numbers.join(",");
    let text = numbers
        .iter()
        .map(|n| format!("{}.", n))
        .collect::<Vec<_>>()
        .join(", ");
    (number, text)
}

/// Format a decimal without trailing zeros ("120", "0.5", "-1.5")
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(17, 5), 1);
        assert_eq!(gcd(100, 50), 50);
    }

    #[test]
    fn test_lcm() {
        assert_eq!(lcm(12, 8), Some(24));
        assert_eq!(lcm(4, 6), Some(12));
        assert_eq!(lcm(3, 5), Some(15));
        assert_eq!(lcm(u64::MAX, u64::MAX - 1), None);
    }

    #[test]
    fn test_measure_number_order() {
        assert_eq!(compare_measure_numbers("2", "10"), Ordering::Less);
        assert_eq!(compare_measure_numbers("12", "12a"), Ordering::Less);
        assert_eq!(compare_measure_numbers("12b", "12a"), Ordering::Greater);
        assert_eq!(compare_measure_numbers("X", "1"), Ordering::Less);
        assert_eq!(MeasureNumber::parse("7a"), MeasureNumber::new(7, "a"));
    }

    #[test]
    fn test_normalize_ending_numbers() {
        assert_eq!(
            normalize_ending_numbers("2, 1"),
            ("1,2".to_string(), "1., 2.".to_string())
        );
        assert_eq!(
            normalize_ending_numbers("1. 2. 2."),
            ("1,2".to_string(), "1., 2.".to_string())
        );
        assert_eq!(normalize_ending_numbers("3"), ("3".to_string(), "3.".to_string()));
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(120.0), "120");
        assert_eq!(format_decimal(0.5), "0.5");
        assert_eq!(format_decimal(-1.5), "-1.5");
        assert_eq!(format_decimal(93.33333), "93.3333");
    }
}
