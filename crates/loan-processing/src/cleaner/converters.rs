//! Value converters for the raw export's textual fields.
//!
//! The `parse_*` functions look at a single non-blank value and return `None`
//! when it does not match the expected grammar. The `*_values` functions apply
//! them to a whole column, treat blank strings as missing, and turn a
//! mismatch into a [`CleaningError::Parse`] carrying the raw row.

use crate::error::{CleaningError, Result};
use crate::schema::{self, source_rows};
use crate::utils::is_numeric_dtype;
use chrono::Month;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::str::FromStr;

/// "<N> years", "< N year", "N+ years"
static EMPLOYMENT_LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(<\s*)?(\d+)\s*(\+)?\s*years?$").expect("Invalid regex: employment length")
});

/// Offset applied to "< N" and "N+" tenures.
const OPEN_ENDED_TENURE_OFFSET: f64 = 0.4;

/// Parse "13.5%" or "13.5" into 13.5.
pub fn parse_percentage(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a textual tenure into years.
///
/// "5 years" is 5.0, "< 1 year" is 0.6 and "10+ years" is 10.4.
pub fn parse_employment_length(text: &str) -> Option<f64> {
    let captures = EMPLOYMENT_LENGTH.captures(text.trim())?;
    let years = captures.get(2)?.as_str().parse::<f64>().ok()?;

    match (captures.get(1).is_some(), captures.get(3).is_some()) {
        (false, false) => Some(years),
        (true, false) => Some(years - OPEN_ENDED_TENURE_OFFSET),
        (false, true) => Some(years + OPEN_ENDED_TENURE_OFFSET),
        (true, true) => None,
    }
}

/// Month token of a "<Month>-<Year>" date such as "Dec-11".
///
/// The token must name a month, either abbreviated or in full.
pub fn parse_issue_month(text: &str) -> Option<String> {
    let token = text.trim().split('-').next()?.trim();
    Month::from_str(token).ok().map(|_| token.to_string())
}

/// Read a percentage column as floats.
pub(crate) fn percentage_values(
    df: &DataFrame,
    column: &str,
    stage: &str,
) -> Result<Vec<Option<f64>>> {
    parse_numeric_column(df, column, stage, "a percentage", parse_percentage)
}

/// Read an employment length column as years.
pub(crate) fn employment_length_values(
    df: &DataFrame,
    column: &str,
    stage: &str,
) -> Result<Vec<Option<f64>>> {
    parse_numeric_column(df, column, stage, "an employment length", parse_employment_length)
}

/// Read the month token of every issue date. A missing date is an error.
pub(crate) fn issue_months(df: &DataFrame, column: &str, stage: &str) -> Result<Vec<String>> {
    let series = schema::series(df, column, stage)?;
    if series.dtype() != &DataType::String && series.dtype() != &DataType::Null {
        return Err(CleaningError::schema(
            stage,
            column,
            format!("has type {:?}, expected text dates", series.dtype()),
        ));
    }

    let rows = source_rows(df)?;
    schema::string_values(df, column, stage)?
        .into_iter()
        .zip(rows)
        .map(|(value, row)| match value {
            None => Err(CleaningError::parse(column, row, "null", "a <Month>-<Year> date")),
            Some(text) => parse_issue_month(&text)
                .ok_or_else(|| CleaningError::parse(column, row, text, "a <Month>-<Year> date")),
        })
        .collect()
}

fn parse_numeric_column(
    df: &DataFrame,
    column: &str,
    stage: &str,
    expected: &str,
    parse: impl Fn(&str) -> Option<f64>,
) -> Result<Vec<Option<f64>>> {
    let series = schema::series(df, column, stage)?;

    match series.dtype() {
        dtype if is_numeric_dtype(dtype) => {
            let cast = series.cast(&DataType::Float64)?;
            Ok(cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|f| !f.is_nan()))
                .collect())
        }
        DataType::Null => Ok(vec![None; series.len()]),
        DataType::String => {
            let rows = source_rows(df)?;
            series
                .str()?
                .into_iter()
                .zip(rows)
                .map(|(value, row)| match value {
                    None => Ok(None),
                    Some(text) if text.trim().is_empty() => Ok(None),
                    Some(text) => parse(text)
                        .map(Some)
                        .ok_or_else(|| CleaningError::parse(column, row, text, expected)),
                })
                .collect()
        }
        other => Err(CleaningError::schema(
            stage,
            column,
            format!("has type {:?}, expected {}", other, expected),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::columns;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("11.5%"), Some(11.5));
        assert_eq!(parse_percentage(" 10.65% "), Some(10.65));
        assert_eq!(parse_percentage("83.7"), Some(83.7));
        assert_eq!(parse_percentage("0%"), Some(0.0));
        assert_eq!(parse_percentage("abc%"), None);
        assert_eq!(parse_percentage("%"), None);
        assert_eq!(parse_percentage("12.5%%"), None);
    }

    #[test]
    fn test_parse_employment_length() {
        assert_eq!(parse_employment_length("< 1 year"), Some(0.6));
        assert_eq!(parse_employment_length("1 year"), Some(1.0));
        assert_eq!(parse_employment_length("5 years"), Some(5.0));
        assert_eq!(parse_employment_length("10+ years"), Some(10.4));
        assert_eq!(parse_employment_length("<1 year"), Some(0.6));
        assert_eq!(parse_employment_length("n/a"), None);
        assert_eq!(parse_employment_length("five years"), None);
    }

    #[test]
    fn test_parse_issue_month() {
        assert_eq!(parse_issue_month("Dec-11"), Some("Dec".to_string()));
        assert_eq!(parse_issue_month("June-2010"), Some("June".to_string()));
        assert_eq!(parse_issue_month("Foo-11"), None);
        assert_eq!(parse_issue_month(""), None);
    }

    #[test]
    fn test_percentage_values_mixed_column() {
        let df = df![columns::INT_RATE => [Some("10.65%"), None, Some(""), Some("7.9")]].unwrap();
        let values = percentage_values(&df, columns::INT_RATE, "normalize_percentages").unwrap();
        assert_eq!(values, vec![Some(10.65), None, None, Some(7.9)]);
    }

    #[test]
    fn test_percentage_values_numeric_column_is_cast() {
        let df = df![columns::REVOL_UTIL => [Some(12i64), None]].unwrap();
        let values = percentage_values(&df, columns::REVOL_UTIL, "normalize_percentages").unwrap();
        assert_eq!(values, vec![Some(12.0), None]);

        let df = df![columns::REVOL_UTIL => [f64::NAN, 3.5]].unwrap();
        let values = percentage_values(&df, columns::REVOL_UTIL, "normalize_percentages").unwrap();
        assert_eq!(values, vec![None, Some(3.5)]);
    }

    #[test]
    fn test_percentage_values_reports_raw_row() {
        let df = df![
            columns::INT_RATE => ["10%", "abc%"],
            columns::SOURCE_ROW => [3u32, 8],
        ]
        .unwrap();

        let err = percentage_values(&df, columns::INT_RATE, "normalize_percentages").unwrap_err();
        match err {
            CleaningError::Parse { column, row, value, .. } => {
                assert_eq!(column, "int_rate");
                assert_eq!(row, 8);
                assert_eq!(value, "abc%");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_employment_length_values_pass_missing_through() {
        let df = df![columns::EMP_LENGTH => [Some("10+ years"), None, Some("< 1 year")]].unwrap();
        let values =
            employment_length_values(&df, columns::EMP_LENGTH, "approximate_employment_length")
                .unwrap();
        assert_eq!(values, vec![Some(10.4), None, Some(0.6)]);
    }

    #[test]
    fn test_issue_months_reject_missing_date() {
        let df = df![columns::ISSUE_D => [Some("Dec-11"), None]].unwrap();
        let err = issue_months(&df, columns::ISSUE_D, "derive_issue_month").unwrap_err();
        assert!(matches!(err, CleaningError::Parse { row: 1, .. }));
    }
}
