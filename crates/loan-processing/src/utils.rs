//! Shared utilities for the cleaning pipeline.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Share of missing values in a Series (0.0 for an empty Series).
pub fn missing_ratio(series: &Series) -> f64 {
    if series.is_empty() {
        0.0
    } else {
        series.null_count() as f64 / series.len() as f64
    }
}

/// Build a Float64 Series from optional values.
pub fn float_series(name: &str, values: Vec<Option<f64>>) -> Series {
    Series::new(name.into(), values)
}

/// Null and NaN both count as a missing float.
pub fn is_missing(value: Option<f64>) -> bool {
    value.is_none_or(f64::is_nan)
}

/// Fill missing entries with `fill_value`, leaving present values untouched.
pub fn fill_missing(values: &[Option<f64>], fill_value: f64) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| Some(v.filter(|f| !f.is_nan()).unwrap_or(fill_value)))
        .collect()
}

/// Present values sorted ascending, without NaN.
pub fn sorted_present(values: &[Option<f64>]) -> Vec<f64> {
    let mut present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    present.sort_by(|a, b| a.total_cmp(b));
    present
}

/// Render a float the way a label in a report should read ("3", "10.4").
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_missing_ratio() {
        let series = Series::new("test".into(), &[Some(1.0), None, None, Some(4.0)]);
        assert_eq!(missing_ratio(&series), 0.5);

        let empty = Series::new_empty("empty".into(), &DataType::Float64);
        assert_eq!(missing_ratio(&empty), 0.0);
    }

    #[test]
    fn test_fill_missing() {
        let filled = fill_missing(&[Some(1.0), None, Some(3.0), Some(f64::NAN)], 0.0);
        assert_eq!(filled, vec![Some(1.0), Some(0.0), Some(3.0), Some(0.0)]);
    }

    #[test]
    fn test_sorted_present() {
        let sorted = sorted_present(&[Some(3.0), None, Some(f64::NAN), Some(-1.0), Some(2.5)]);
        assert_eq!(sorted, vec![-1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(None));
        assert!(is_missing(Some(f64::NAN)));
        assert!(!is_missing(Some(0.0)));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(10.4), "10.4");
        assert_eq!(format_number(0.6), "0.6");
    }

    #[test]
    fn test_float_series_dtype() {
        let series = float_series("x", vec![Some(1.0), None]);
        assert_eq!(series.dtype(), &DataType::Float64);
        assert_eq!(series.null_count(), 1);
    }
}
