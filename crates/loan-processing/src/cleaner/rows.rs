//! Row-level stages: row tracking and the outcome filter.

use crate::error::Result;
use crate::pipeline::{Stage, StageKind, StageOutput};
use crate::schema::{self, columns::SOURCE_ROW};
use crate::types::{ActionType, CleaningAction};
use polars::prelude::*;
use tracing::info;

/// Attaches each row's position in the raw input as a hidden column.
///
/// Later stages report parse failures against this position, so a row keeps
/// its raw index after rows above it have been filtered out.
#[derive(Debug, Clone, Default)]
pub struct TrackSourceRows;

impl Stage for TrackSourceRows {
    fn kind(&self) -> StageKind {
        StageKind::TrackSourceRows
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let positions: Vec<u32> = (0..df.height() as u32).collect();
        let mut frame = df.clone();
        frame.with_column(Series::new(SOURCE_ROW.into(), positions))?;
        Ok(StageOutput::new(frame))
    }
}

/// Drops the row tracking column, leaving dense zero-based rows.
#[derive(Debug, Clone, Default)]
pub struct ResetRowIndex;

impl Stage for ResetRowIndex {
    fn kind(&self) -> StageKind {
        StageKind::ResetRowIndex
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let has_tracker = df
            .get_column_names()
            .iter()
            .any(|name| name.as_str() == SOURCE_ROW);
        let frame = if has_tracker {
            df.drop(SOURCE_ROW)?
        } else {
            df.clone()
        };
        Ok(StageOutput::new(frame))
    }
}

/// Removes loans whose outcome is not known yet.
///
/// Only rows carrying exactly the unresolved label are removed; anything else
/// is left for the final validation to judge.
#[derive(Debug, Clone)]
pub struct FilterUnresolvedLoans {
    outcome_column: String,
    unresolved_status: String,
}

impl FilterUnresolvedLoans {
    pub fn new(outcome_column: impl Into<String>, unresolved_status: impl Into<String>) -> Self {
        Self {
            outcome_column: outcome_column.into(),
            unresolved_status: unresolved_status.into(),
        }
    }
}

impl Stage for FilterUnresolvedLoans {
    fn kind(&self) -> StageKind {
        StageKind::FilterUnresolvedLoans
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.outcome_column.clone()]
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let statuses = schema::string_values(df, &self.outcome_column, self.kind().name())?;
        let keep: Vec<bool> = statuses
            .iter()
            .map(|status| status.as_deref().map(str::trim) != Some(self.unresolved_status.as_str()))
            .collect();
        let removed = keep.iter().filter(|k| !**k).count();

        let mask = Series::new("keep".into(), keep);
        let frame = df.filter(mask.bool()?)?;

        info!(
            "Removed {} '{}' loans, {} rows remain",
            removed,
            self.unresolved_status,
            frame.height()
        );

        let action = CleaningAction::new(
            ActionType::RowsRemoved,
            "dataset",
            format!("Removed {} rows with unresolved outcome", removed),
        )
        .with_details(format!("{} == {}", self.outcome_column, self.unresolved_status));

        Ok(StageOutput::new(frame).with_action(action))
    }
}
