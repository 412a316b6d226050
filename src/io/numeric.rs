//! Locale-aware numeric coercion for vendor intensity cells.
//!
//! Exports written on machines with a German or French locale use `,` as
//! the decimal mark and `.` as the thousands separator. The convention is
//! sniffed from a handful of cells unless the caller overrides it.

use log::debug;
use serde::{Deserialize, Serialize};

/// Rows inspected when sniffing the decimal convention.
pub const SNIFF_ROWS: usize = 10;

/// Sentinel written by Spectronaut for values removed by its own filters.
pub const FILTERED_SENTINEL: &str = "Filtered";

/// Which character marks the decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecimalConvention {
    /// `1,234.5`
    #[default]
    Dot,
    /// `1.234,5`
    Comma,
}

impl DecimalConvention {
    fn decimal_mark(self) -> char {
        match self {
            DecimalConvention::Dot => '.',
            DecimalConvention::Comma => ',',
        }
    }

    fn thousands_mark(self) -> char {
        match self {
            DecimalConvention::Dot => ',',
            DecimalConvention::Comma => '.',
        }
    }
}

/// Guess the decimal convention from sample cells.
///
/// The first cell that carries unambiguous evidence decides; without any
/// evidence the convention is [`DecimalConvention::Dot`].
pub fn sniff_decimal_convention<'a, I>(cells: I) -> DecimalConvention
where
    I: IntoIterator<Item = &'a str>,
{
    for cell in cells {
        let cell = cell.trim();
        let commas = cell.matches(',').count();
        let dots = cell.matches('.').count();

        if commas > 1 {
            return DecimalConvention::Dot;
        }
        if dots > 1 {
            return DecimalConvention::Comma;
        }
        if commas == 1 && dots == 1 {
            // whichever separator comes last is the decimal mark
            return if cell.rfind(',') > cell.rfind('.') {
                DecimalConvention::Comma
            } else {
                DecimalConvention::Dot
            };
        }
        if commas == 1 && dots == 0 {
            let fraction = cell.rsplit(',').next().unwrap_or("");
            if fraction.len() != 3 && fraction.chars().all(|c| c.is_ascii_digit()) {
                return DecimalConvention::Comma;
            }
        }
    }
    DecimalConvention::Dot
}

/// Whether a cell stands for "no value".
pub fn is_missing(cell: &str) -> bool {
    matches!(
        cell.trim(),
        "" | "NaN" | "nan" | "NA" | "N/A" | FILTERED_SENTINEL
    )
}

/// Parse a cell under `convention`. Returns `None` for missing or
/// malformed cells.
pub fn parse_numeric(cell: &str, convention: DecimalConvention) -> Option<f64> {
    let cell = cell.trim();
    if is_missing(cell) {
        return None;
    }
    let cleaned: String = cell
        .chars()
        .filter(|&c| c != convention.thousands_mark())
        .map(|c| if c == convention.decimal_mark() { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a cell to an intensity, where `0.0` means not observed.
///
/// `row`/`column` only serve the debug message for malformed cells.
pub fn coerce_intensity(cell: &str, convention: DecimalConvention, row: usize, column: &str) -> f64 {
    match parse_numeric(cell, convention) {
        Some(v) => v,
        None => {
            if !is_missing(cell) {
                debug!(
                    "Malformed numeric cell '{}' at row {} of column '{}', treated as missing",
                    cell, row, column
                );
            }
            0.0
        }
    }
}

/// Interpret an identification flag.
pub fn is_true_like(cell: &str) -> bool {
    matches!(cell.trim(), "True" | "true" | "TRUE" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sniff_multiple_commas_means_dot() {
        let cells = ["12", "1,234,567.5"];
        assert_eq!(sniff_decimal_convention(cells), DecimalConvention::Dot);
    }

    #[test]
    fn test_sniff_multiple_dots_means_comma() {
        let cells = ["1.234.567,5"];
        assert_eq!(sniff_decimal_convention(cells), DecimalConvention::Comma);
    }

    #[test]
    fn test_sniff_mixed_separators() {
        assert_eq!(
            sniff_decimal_convention(["1.234,5"]),
            DecimalConvention::Comma
        );
        assert_eq!(
            sniff_decimal_convention(["1,234.5"]),
            DecimalConvention::Dot
        );
    }

    #[test]
    fn test_sniff_single_comma_fraction() {
        assert_eq!(sniff_decimal_convention(["15,25"]), DecimalConvention::Comma);
        // three digits after a lone comma reads as a thousands group
        assert_eq!(sniff_decimal_convention(["15,250"]), DecimalConvention::Dot);
    }

    #[test]
    fn test_sniff_defaults_to_dot() {
        assert_eq!(
            sniff_decimal_convention(["10", "Filtered", ""]),
            DecimalConvention::Dot
        );
        assert_eq!(
            sniff_decimal_convention(std::iter::empty()),
            DecimalConvention::Dot
        );
    }

    #[test]
    fn test_parse_numeric_conventions() {
        assert_relative_eq!(
            parse_numeric("1,234.5", DecimalConvention::Dot).unwrap(),
            1234.5
        );
        assert_relative_eq!(
            parse_numeric("1.234,5", DecimalConvention::Comma).unwrap(),
            1234.5
        );
        assert_relative_eq!(parse_numeric(" 7 ", DecimalConvention::Dot).unwrap(), 7.0);
        assert_eq!(parse_numeric("Filtered", DecimalConvention::Dot), None);
        assert_eq!(parse_numeric("abc", DecimalConvention::Dot), None);
    }

    #[test]
    fn test_coerce_missing_and_malformed() {
        assert_eq!(coerce_intensity("", DecimalConvention::Dot, 0, "x"), 0.0);
        assert_eq!(coerce_intensity("NaN", DecimalConvention::Dot, 0, "x"), 0.0);
        assert_eq!(coerce_intensity("1.2.3", DecimalConvention::Dot, 0, "x"), 0.0);
        assert_relative_eq!(
            coerce_intensity("2,5", DecimalConvention::Comma, 0, "x"),
            2.5
        );
    }

    #[test]
    fn test_true_like() {
        assert!(is_true_like("True"));
        assert!(is_true_like("1"));
        assert!(!is_true_like("False"));
        assert!(!is_true_like("Filtered"));
        assert!(!is_true_like(""));
    }
}
