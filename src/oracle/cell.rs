//! Deterministic cell-to-text rendering rules for oracle result sets.
//!
//! These rules must match the system under test's own textual rendering
//! exactly, or a `RuntimeSql` comparison against a correct plan would still
//! fail on formatting alone.

use rust_decimal::{Decimal, RoundingStrategy};

/// One cell of an oracle result row, already typed by the reference driver.
/// Never passed through `f64` on the decimal path — `f64` cannot round-trip
/// `0.625` exactly, and rounding it would silently diverge from the
/// round-half-up rule below.
#[derive(Debug, Clone)]
pub enum OracleCell {
    Null,
    Integer(i64),
    Decimal(Decimal),
    Date { year: i32, month: u32, day: u32 },
    Text(String),
}

impl OracleCell {
    /// Render exactly as the system under test would: `NULL` for nulls,
    /// bare decimal for integers, round-half-up to two fractional digits
    /// with trailing zeros and a trailing dot stripped for
    /// decimals/floats, zero-padded `YYYY-MM-DD` for dates, and strings
    /// as-is.
    pub fn render(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(v) => v.to_string(),
            Self::Decimal(v) => render_decimal(*v),
            Self::Date { year, month, day } => format!("{year:04}-{month:02}-{day:02}"),
            Self::Text(s) => s.clone(),
        }
    }
}

fn render_decimal(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = rounded.normalize().to_string();
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Render a row of cells the way the system under test joins fields on the
/// wire: `" | "` between adjacent cells.
pub fn render_row(cells: &[OracleCell]) -> String {
    cells
        .iter()
        .map(OracleCell::render)
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rounds_half_up_and_strips_trailing_zeros() {
        let cell = OracleCell::Decimal(Decimal::from_str("0.625").unwrap());
        assert_eq!(cell.render(), "0.63");

        let cell = OracleCell::Decimal(Decimal::from_str("1.100").unwrap());
        assert_eq!(cell.render(), "1.1");

        let cell = OracleCell::Decimal(Decimal::from_str("2.000").unwrap());
        assert_eq!(cell.render(), "2");
    }

    #[test]
    fn renders_null_and_date() {
        assert_eq!(OracleCell::Null.render(), "NULL");
        assert_eq!(
            OracleCell::Date {
                year: 2024,
                month: 3,
                day: 7
            }
            .render(),
            "2024-03-07"
        );
    }

    #[test]
    fn renders_row_joined_with_pipe() {
        let row = vec![OracleCell::Integer(1), OracleCell::Text("a".into())];
        assert_eq!(render_row(&row), "1 | a");
    }
}
