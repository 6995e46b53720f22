//! Stages turning textual fields into numbers.

use super::converters::{employment_length_values, percentage_values};
use crate::config::NumericImputation;
use crate::error::Result;
use crate::imputers::StatisticalImputer;
use crate::pipeline::{Stage, StageKind, StageOutput};
use crate::types::{ActionType, CleaningAction};
use crate::utils::{float_series, format_number};
use polars::prelude::*;
use tracing::debug;

/// Parses percentage strings ("13.5%") into `f64` columns.
#[derive(Debug, Clone)]
pub struct NormalizePercentages {
    columns: Vec<String>,
}

impl NormalizePercentages {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

impl Stage for NormalizePercentages {
    fn kind(&self) -> StageKind {
        StageKind::NormalizePercentages
    }

    fn required_columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let mut frame = df.clone();
        let mut actions = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            let values = percentage_values(df, column, self.kind().name())?;
            debug!("Parsed {} percentage values in '{}'", values.len(), column);
            frame.replace(column, float_series(column, values))?;
            actions.push(CleaningAction::new(
                ActionType::TypeConverted,
                column,
                "Parsed percentage text into Float64",
            ));
        }

        Ok(StageOutput::new(frame).with_actions(actions))
    }
}

/// Converts textual tenure into years, then fills the gaps.
#[derive(Debug, Clone)]
pub struct ApproximateEmploymentLength {
    column: String,
    imputation: NumericImputation,
}

impl ApproximateEmploymentLength {
    pub fn new(column: impl Into<String>, imputation: NumericImputation) -> Self {
        Self {
            column: column.into(),
            imputation,
        }
    }
}

impl Stage for ApproximateEmploymentLength {
    fn kind(&self) -> StageKind {
        StageKind::ApproximateEmploymentLength
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let stage = self.kind().name();
        let years = employment_length_values(df, &self.column, stage)?;
        let imputed = StatisticalImputer::impute(&self.column, &years, self.imputation, stage)?;

        let mut frame = df.clone();
        frame.replace(&self.column, float_series(&self.column, imputed.values))?;

        Ok(StageOutput::new(frame)
            .with_action(CleaningAction::new(
                ActionType::TypeConverted,
                &self.column,
                "Approximated employment length in years",
            ))
            .with_action(CleaningAction::new(
                ActionType::ValueImputed,
                &self.column,
                format!(
                    "Filled {} missing values with {} {}",
                    imputed.filled,
                    self.imputation.name(),
                    format_number(imputed.fill_value)
                ),
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleaningError;
    use pretty_assertions::assert_eq;

    fn floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_normalize_percentages() {
        let df = df![
            "int_rate" => ["10.65%", " 15.27% ", "7.9"],
            "revol_util" => [Some("83.70%"), None, Some("")],
        ]
        .unwrap();

        let stage = NormalizePercentages::new(vec!["int_rate".into(), "revol_util".into()]);
        let output = stage.apply(&df).unwrap();

        assert_eq!(floats(&output.frame, "int_rate"), vec![Some(10.65), Some(15.27), Some(7.9)]);
        assert_eq!(floats(&output.frame, "revol_util"), vec![Some(83.7), None, None]);
        assert_eq!(output.actions.len(), 2);
    }

    #[test]
    fn test_normalize_percentages_rejects_garbage() {
        let df = df!["int_rate" => ["10%", "ten%"]].unwrap();
        let stage = NormalizePercentages::new(vec!["int_rate".into()]);
        let err = stage.apply(&df).unwrap_err();
        assert!(matches!(err, CleaningError::Parse { row: 1, .. }));
    }

    #[test]
    fn test_employment_length_mapping_and_mode_fill() {
        let df = df![
            "emp_length" => [
                Some("10+ years"),
                Some("< 1 year"),
                None,
                Some("3 years"),
                Some("10+ years"),
            ],
        ]
        .unwrap();

        let stage = ApproximateEmploymentLength::new("emp_length", NumericImputation::Mode);
        let output = stage.apply(&df).unwrap();

        assert_eq!(
            floats(&output.frame, "emp_length"),
            vec![Some(10.4), Some(0.6), Some(10.4), Some(3.0), Some(10.4)]
        );
        assert_eq!(output.actions.len(), 2);
    }

    #[test]
    fn test_employment_length_unknown_text() {
        let df = df!["emp_length" => ["5 years", "n/a"]].unwrap();
        let stage = ApproximateEmploymentLength::new("emp_length", NumericImputation::Mode);
        let err = stage.apply(&df).unwrap_err();
        match err {
            CleaningError::Parse { column, value, .. } => {
                assert_eq!(column, "emp_length");
                assert_eq!(value, "n/a");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }
}
