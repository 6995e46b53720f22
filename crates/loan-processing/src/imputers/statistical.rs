//! Statistical imputation methods.
//!
//! Provides mean, median and mode imputation for numeric columns.

use crate::config::{ImputationRule, NumericImputation};
use crate::error::{CleaningError, Result};
use crate::pipeline::{Stage, StageKind, StageOutput};
use crate::schema;
use crate::types::{ActionType, CleaningAction};
use crate::utils::{fill_missing, float_series, format_number, is_missing, sorted_present};
use polars::prelude::*;
use tracing::debug;

/// Result of imputing one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputed {
    /// Column values with every gap filled.
    pub values: Vec<Option<f64>>,
    /// Value written into the gaps.
    pub fill_value: f64,
    /// Number of gaps filled.
    pub filled: usize,
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Mean of the present values.
    pub fn mean(values: &[Option<f64>]) -> Option<f64> {
        Series::new("values".into(), sorted_present(values)).mean()
    }

    /// Median of the present values.
    pub fn median(values: &[Option<f64>]) -> Option<f64> {
        Series::new("values".into(), sorted_present(values)).median()
    }

    /// Most frequent present value. Ties resolve to the smallest value.
    pub fn mode(values: &[Option<f64>]) -> Option<f64> {
        let sorted = sorted_present(values);

        let mut best: Option<(f64, usize)> = None;
        let mut run_start = 0;
        for i in 1..=sorted.len() {
            if i == sorted.len() || sorted[i] != sorted[run_start] {
                let run = i - run_start;
                // strictly greater keeps the first, i.e. smallest, of tied runs
                if best.is_none_or(|(_, count)| run > count) {
                    best = Some((sorted[run_start], run));
                }
                run_start = i;
            }
        }

        best.map(|(value, _)| value)
    }

    /// Fill value of `strategy` over the present values.
    pub fn fill_value(values: &[Option<f64>], strategy: NumericImputation) -> Option<f64> {
        match strategy {
            NumericImputation::Mean => Self::mean(values),
            NumericImputation::Median => Self::median(values),
            NumericImputation::Mode => Self::mode(values),
        }
    }

    /// Fill every gap of `values` with the statistic of its present values.
    ///
    /// A column without a single present value is a schema error: there is
    /// nothing to compute the statistic from.
    pub fn impute(
        column: &str,
        values: &[Option<f64>],
        strategy: NumericImputation,
        stage: &str,
    ) -> Result<Imputed> {
        let fill_value = Self::fill_value(values, strategy).ok_or_else(|| {
            CleaningError::schema(stage, column, "has no values to impute from")
        })?;

        let filled = values.iter().filter(|v| is_missing(**v)).count();
        debug!(
            "Imputing {} missing values in '{}' with {} {}",
            filled,
            column,
            strategy.name(),
            fill_value
        );

        Ok(Imputed {
            values: fill_missing(values, fill_value),
            fill_value,
            filled,
        })
    }
}

/// Stage filling the missing values of one numeric column.
#[derive(Debug, Clone)]
pub struct ImputeColumn {
    rule: ImputationRule,
}

impl ImputeColumn {
    pub fn new(rule: ImputationRule) -> Self {
        Self { rule }
    }
}

impl Stage for ImputeColumn {
    fn kind(&self) -> StageKind {
        StageKind::Impute
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.rule.column.clone()]
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let stage = self.kind().name();
        let column = self.rule.column.as_str();

        let values = schema::float_values(df, column, stage)?;
        let imputed = StatisticalImputer::impute(column, &values, self.rule.strategy, stage)?;

        let mut frame = df.clone();
        frame.replace(column, float_series(column, imputed.values))?;

        let action = CleaningAction::new(
            ActionType::ValueImputed,
            column,
            format!(
                "Filled {} missing values with {} {}",
                imputed.filled,
                self.rule.strategy.name(),
                format_number(imputed.fill_value)
            ),
        )
        .with_details(format!("fill_value={}", imputed.fill_value));

        Ok(StageOutput::new(frame).with_action(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ========================================================================
    // Statistic tests
    // ========================================================================

    #[test]
    fn test_median_ignores_missing() {
        let values = [Some(1.0), None, Some(3.0), None, Some(5.0)];
        assert_eq!(StatisticalImputer::median(&values), Some(3.0));

        let even = [Some(1.0), Some(2.0), Some(3.0), Some(10.0)];
        assert_eq!(StatisticalImputer::median(&even), Some(2.5));
    }

    #[test]
    fn test_mean_ignores_missing() {
        let values = [Some(2.0), None, Some(4.0)];
        assert_eq!(StatisticalImputer::mean(&values), Some(3.0));
    }

    #[test]
    fn test_mode_picks_most_frequent() {
        let values = [Some(1.0), Some(0.0), None, Some(0.0), Some(2.0)];
        assert_eq!(StatisticalImputer::mode(&values), Some(0.0));
    }

    #[test]
    fn test_mode_tie_resolves_to_smallest() {
        let values = [Some(3.0), Some(1.0), Some(3.0), Some(1.0), Some(2.0)];
        assert_eq!(StatisticalImputer::mode(&values), Some(1.0));

        let values = [Some(10.4), Some(0.6), Some(0.6), Some(10.4)];
        assert_eq!(StatisticalImputer::mode(&values), Some(0.6));
    }

    #[test]
    fn test_statistics_of_empty_input() {
        let values: [Option<f64>; 2] = [None, None];
        assert_eq!(StatisticalImputer::mode(&values), None);
        assert_eq!(StatisticalImputer::median(&values), None);
        assert_eq!(StatisticalImputer::mean(&[]), None);
    }

    // ========================================================================
    // impute() tests
    // ========================================================================

    #[test]
    fn test_impute_fills_only_gaps() {
        let values = [Some(1.0), None, Some(5.0)];
        let imputed =
            StatisticalImputer::impute("revol_util", &values, NumericImputation::Median, "impute")
                .unwrap();

        assert_eq!(imputed.values, vec![Some(1.0), Some(3.0), Some(5.0)]);
        assert_eq!(imputed.fill_value, 3.0);
        assert_eq!(imputed.filled, 1);
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let values = [Some(1.0), Some(f64::NAN), None, Some(3.0), Some(5.0)];
        assert_eq!(StatisticalImputer::median(&values), Some(3.0));
        assert_eq!(StatisticalImputer::mean(&values), Some(3.0));

        let imputed =
            StatisticalImputer::impute("revol_util", &values, NumericImputation::Median, "impute")
                .unwrap();
        assert_eq!(
            imputed.values,
            vec![Some(1.0), Some(3.0), Some(3.0), Some(3.0), Some(5.0)]
        );
        assert_eq!(imputed.filled, 2);

        let counts = [Some(0.0), Some(f64::NAN), None, Some(0.0)];
        let imputed =
            StatisticalImputer::impute("pub_rec_bankruptcies", &counts, NumericImputation::Mode, "impute")
                .unwrap();
        assert_eq!(imputed.values, vec![Some(0.0); 4]);
    }

    #[test]
    fn test_impute_all_missing_is_schema_error() {
        let err = StatisticalImputer::impute(
            "pub_rec_bankruptcies",
            &[None, None],
            NumericImputation::Mode,
            "impute",
        )
        .unwrap_err();

        assert!(err.is_schema_error());
        assert!(err.to_string().contains("pub_rec_bankruptcies"));
    }

    // ========================================================================
    // ImputeColumn stage tests
    // ========================================================================

    #[test]
    fn test_impute_column_stage() {
        let df = df![
            "pub_rec_bankruptcies" => [Some(0i64), None, Some(1), Some(0), None],
            "other" => ["a", "b", "c", "d", "e"],
        ]
        .unwrap();

        let stage = ImputeColumn::new(ImputationRule::new(
            "pub_rec_bankruptcies",
            NumericImputation::Mode,
        ));
        let output = stage.apply(&df).unwrap();

        let column = output.frame.column("pub_rec_bankruptcies").unwrap();
        assert_eq!(column.null_count(), 0);
        assert_eq!(column.dtype(), &DataType::Float64);
        assert_eq!(
            column.as_materialized_series().f64().unwrap().into_iter().collect::<Vec<_>>(),
            vec![Some(0.0), Some(0.0), Some(1.0), Some(0.0), Some(0.0)]
        );
        assert_eq!(output.actions.len(), 1);
        assert_eq!(output.actions[0].action_type, ActionType::ValueImputed);

        // input untouched
        assert_eq!(df.column("pub_rec_bankruptcies").unwrap().null_count(), 2);
    }

    #[test]
    fn test_impute_column_missing_column() {
        let df = df!["other" => [1.0]].unwrap();
        let stage = ImputeColumn::new(ImputationRule::new("revol_util", NumericImputation::Median));
        assert!(stage.apply(&df).unwrap_err().is_schema_error());
    }
}
