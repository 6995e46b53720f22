//! Final check of the guarantees a cleaned frame makes.

use crate::error::{CleaningError, Result};
use crate::pipeline::{Stage, StageKind, StageOutput};
use crate::schema::{self, LoanStatus, source_rows};
use polars::prelude::*;
use tracing::debug;

/// Verifies that every loan has a final outcome and that no imputed or
/// derived column has a gap left.
#[derive(Debug, Clone)]
pub struct ValidateCleaned {
    outcome_column: String,
    complete_columns: Vec<String>,
}

impl ValidateCleaned {
    pub fn new(outcome_column: impl Into<String>, complete_columns: Vec<String>) -> Self {
        Self {
            outcome_column: outcome_column.into(),
            complete_columns,
        }
    }
}

impl Stage for ValidateCleaned {
    fn kind(&self) -> StageKind {
        StageKind::ValidateCleaned
    }

    fn required_columns(&self) -> Vec<String> {
        let mut required = vec![self.outcome_column.clone()];
        required.extend(self.complete_columns.iter().cloned());
        required
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let stage = self.kind().name();

        for name in &self.complete_columns {
            let series = schema::series(df, name, stage)?;
            let mut missing = series.null_count();
            if series.dtype().is_float() {
                missing += series
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .filter(|v| v.is_some_and(f64::is_nan))
                    .count();
            }
            if missing > 0 {
                return Err(CleaningError::schema(
                    stage,
                    name,
                    format!("still has {} missing values", missing),
                ));
            }
        }

        let rows = source_rows(df)?;
        let statuses = schema::string_values(df, &self.outcome_column, stage)?;
        for (status, row) in statuses.into_iter().zip(rows) {
            let terminal = status
                .as_deref()
                .and_then(|s| s.parse::<LoanStatus>().ok())
                .is_some_and(|s| s.is_terminal());
            if !terminal {
                return Err(CleaningError::parse(
                    &self.outcome_column,
                    row,
                    status.unwrap_or_else(|| "null".to_string()),
                    "a final loan status ('Fully Paid' or 'Charged Off')",
                ));
            }
        }

        debug!(
            "Validated {} rows and {} complete columns",
            df.height(),
            self.complete_columns.len()
        );
        Ok(StageOutput::new(df.clone()))
    }
}
