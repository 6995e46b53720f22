//! Column names, outcome labels and typed access to the loan frame.
//!
//! Stages never index a frame by a bare string and hope for the best: they
//! go through the accessors here, which turn an absent column into a
//! [`CleaningError::Schema`] naming the stage, and a value of the wrong shape
//! into a [`CleaningError::Parse`] naming the raw row.

use crate::error::{CleaningError, Result};
use crate::features::Slab;
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column names of the Lending Club export used by the pipeline.
pub mod columns {
    pub const LOAN_STATUS: &str = "loan_status";
    pub const LOAN_AMNT: &str = "loan_amnt";
    pub const INT_RATE: &str = "int_rate";
    pub const REVOL_UTIL: &str = "revol_util";
    pub const PUB_REC_BANKRUPTCIES: &str = "pub_rec_bankruptcies";
    pub const EMP_LENGTH: &str = "emp_length";
    pub const ISSUE_D: &str = "issue_d";
    pub const ISSUE_MONTH: &str = "issue_month";
    pub const DTI: &str = "dti";
    pub const ANNUAL_INC: &str = "annual_inc";
    pub const OPEN_ACC: &str = "open_acc";

    pub const INT_SLAB: &str = "int_slab";
    pub const LOAN_AMNT_SLAB: &str = "loan_amnt_slab";
    pub const DTI_SLAB: &str = "dti_slab";
    pub const ANNUAL_INC_SLAB: &str = "annual_inc_slab";
    pub const OPEN_ACC_SLAB: &str = "open_acc_slab";

    /// Hidden column carrying each row's position in the raw input.
    pub const SOURCE_ROW: &str = "__source_row";
}

/// Outcome of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Repaid in full.
    FullyPaid,
    /// Defaulted and written off.
    ChargedOff,
    /// Still running; the final outcome is unknown.
    Current,
}

impl LoanStatus {
    /// Label used in the raw export.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FullyPaid => "Fully Paid",
            Self::ChargedOff => "Charged Off",
            Self::Current => "Current",
        }
    }

    /// Whether the loan has reached its final outcome.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Current)
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::ChargedOff)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Fully Paid" => Ok(Self::FullyPaid),
            "Charged Off" => Ok(Self::ChargedOff),
            "Current" => Ok(Self::Current),
            other => Err(format!("Unknown loan status: '{}'", other)),
        }
    }
}

/// Fail with a schema error naming the first absent column.
pub(crate) fn require_columns(df: &DataFrame, names: &[String], stage: &str) -> Result<()> {
    let present: std::collections::HashSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    match names.iter().find(|name| !present.contains(name.as_str())) {
        Some(missing) => Err(CleaningError::schema(stage, missing, "is missing")),
        None => Ok(()),
    }
}

/// Look up a column, mapping absence to a schema error.
pub(crate) fn series<'a>(df: &'a DataFrame, name: &str, stage: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| CleaningError::schema(stage, name, "is missing"))
}

/// Raw row position of every row of `df`.
///
/// Falls back to the current positions when the tracking column is absent,
/// which is the case for frames handed directly to a single stage.
pub(crate) fn source_rows(df: &DataFrame) -> Result<Vec<usize>> {
    match df.column(columns::SOURCE_ROW) {
        Ok(col) => {
            let rows = col.as_materialized_series().cast(&DataType::UInt64)?;
            Ok(rows
                .u64()?
                .into_iter()
                .enumerate()
                .map(|(i, row)| row.map(|r| r as usize).unwrap_or(i))
                .collect())
        }
        Err(_) => Ok((0..df.height()).collect()),
    }
}

/// Read a column as `f64` values.
///
/// Numeric columns are cast. String columns are parsed value by value so a
/// malformed entry is reported with its raw row; blank strings count as
/// missing.
pub(crate) fn float_values(df: &DataFrame, name: &str, stage: &str) -> Result<Vec<Option<f64>>> {
    let series = series(df, name, stage)?;

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
                .map(|(value, row)| match value.map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(text) => text
                        .parse::<f64>()
                        .map(|v| Some(v).filter(|f| !f.is_nan()))
                        .map_err(|_| CleaningError::parse(name, row, text, "a number")),
                })
                .collect()
        }
        other => Err(CleaningError::schema(
            stage,
            name,
            format!("has type {:?}, expected a numeric column", other),
        )),
    }
}

/// Read a column as owned strings. Non-string columns are cast.
pub(crate) fn string_values(
    df: &DataFrame,
    name: &str,
    stage: &str,
) -> Result<Vec<Option<String>>> {
    let series = series(df, name, stage)?;
    let cast = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// One row of a cleaned frame, with every column the pipeline guarantees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedLoan {
    pub loan_amnt: f64,
    pub int_rate: f64,
    pub dti: f64,
    pub annual_inc: f64,
    pub open_acc: f64,
    pub revol_util: f64,
    pub pub_rec_bankruptcies: f64,
    pub emp_length: f64,
    pub issue_month: String,
    pub loan_status: LoanStatus,
    pub int_slab: Slab,
    pub loan_amnt_slab: Slab,
    pub dti_slab: Slab,
    pub annual_inc_slab: Slab,
    pub open_acc_slab: Slab,
}

impl CleanedLoan {
    /// Extract typed rows from a frame produced by the default pipeline.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<CleanedLoan>> {
        const STAGE: &str = "read_cleaned";

        let number = |name: &str| -> Result<Vec<f64>> {
            float_values(df, name, STAGE)?
                .into_iter()
                .enumerate()
                .map(|(row, v)| v.ok_or_else(|| CleaningError::parse(name, row, "null", "a number")))
                .collect()
        };
        let text = |name: &str| -> Result<Vec<String>> {
            string_values(df, name, STAGE)?
                .into_iter()
                .enumerate()
                .map(|(row, v)| v.ok_or_else(|| CleaningError::parse(name, row, "null", "a value")))
                .collect()
        };
        let slabs = |name: &str| -> Result<Vec<Slab>> {
            text(name)?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.parse::<Slab>()
                        .map_err(|_| CleaningError::parse(name, row, v, "a slab label"))
                })
                .collect()
        };

        let loan_amnt = number(columns::LOAN_AMNT)?;
        let int_rate = number(columns::INT_RATE)?;
        let dti = number(columns::DTI)?;
        let annual_inc = number(columns::ANNUAL_INC)?;
        let open_acc = number(columns::OPEN_ACC)?;
        let revol_util = number(columns::REVOL_UTIL)?;
        let pub_rec_bankruptcies = number(columns::PUB_REC_BANKRUPTCIES)?;
        let emp_length = number(columns::EMP_LENGTH)?;
        let issue_month = text(columns::ISSUE_MONTH)?;
        let loan_status = text(columns::LOAN_STATUS)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.parse::<LoanStatus>().map_err(|_| {
                    CleaningError::parse(columns::LOAN_STATUS, row, v, "a loan status")
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let int_slab = slabs(columns::INT_SLAB)?;
        let loan_amnt_slab = slabs(columns::LOAN_AMNT_SLAB)?;
        let dti_slab = slabs(columns::DTI_SLAB)?;
        let annual_inc_slab = slabs(columns::ANNUAL_INC_SLAB)?;
        let open_acc_slab = slabs(columns::OPEN_ACC_SLAB)?;

        Ok((0..df.height())
            .map(|i| CleanedLoan {
                loan_amnt: loan_amnt[i],
                int_rate: int_rate[i],
                dti: dti[i],
                annual_inc: annual_inc[i],
                open_acc: open_acc[i],
                revol_util: revol_util[i],
                pub_rec_bankruptcies: pub_rec_bankruptcies[i],
                emp_length: emp_length[i],
                issue_month: issue_month[i].clone(),
                loan_status: loan_status[i],
                int_slab: int_slab[i],
                loan_amnt_slab: loan_amnt_slab[i],
                dti_slab: dti_slab[i],
                annual_inc_slab: annual_inc_slab[i],
                open_acc_slab: open_acc_slab[i],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_status_round_trip_labels() {
        for status in [LoanStatus::FullyPaid, LoanStatus::ChargedOff, LoanStatus::Current] {
            assert_eq!(status.label().parse::<LoanStatus>().unwrap(), status);
        }
        assert!("Late (31-120 days)".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_loan_status_terminal() {
        assert!(LoanStatus::FullyPaid.is_terminal());
        assert!(LoanStatus::ChargedOff.is_terminal());
        assert!(!LoanStatus::Current.is_terminal());
        assert!(LoanStatus::ChargedOff.is_default());
    }

    #[test]
    fn test_require_columns_reports_first_missing() {
        let df = df!["loan_status" => ["Fully Paid"], "dti" => [1.0]].unwrap();
        let err = require_columns(
            &df,
            &["loan_status".to_string(), "int_rate".to_string()],
            "validate_input",
        )
        .unwrap_err();

        match err {
            CleaningError::Schema { stage, column, .. } => {
                assert_eq!(stage, "validate_input");
                assert_eq!(column, "int_rate");
            }
            other => panic!("Expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_float_values_from_strings_reports_source_row() {
        let df = df![
            "dti" => [Some("1.5"), None, Some("  "), Some("oops")],
            columns::SOURCE_ROW => [10u32, 11, 12, 13],
        ]
        .unwrap();

        let err = float_values(&df, "dti", "test").unwrap_err();
        match err {
            CleaningError::Parse { column, row, value, .. } => {
                assert_eq!(column, "dti");
                assert_eq!(row, 13);
                assert_eq!(value, "oops");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_float_values_casts_integers() {
        let df = df!["open_acc" => [Some(3i64), None, Some(7)]].unwrap();
        let values = float_values(&df, "open_acc", "test").unwrap();
        assert_eq!(values, vec![Some(3.0), None, Some(7.0)]);
    }

    #[test]
    fn test_float_values_nan_is_missing() {
        let df = df!["revol_util" => [Some(1.5), Some(f64::NAN), None]].unwrap();
        let values = float_values(&df, "revol_util", "test").unwrap();
        assert_eq!(values, vec![Some(1.5), None, None]);

        let df = df!["dti" => ["2.5", "NaN"]].unwrap();
        let values = float_values(&df, "dti", "test").unwrap();
        assert_eq!(values, vec![Some(2.5), None]);
    }

    #[test]
    fn test_source_rows_falls_back_to_positions() {
        let df = df!["a" => [1, 2, 3]].unwrap();
        assert_eq!(source_rows(&df).unwrap(), vec![0, 1, 2]);
    }
}
