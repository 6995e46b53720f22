//! The unit of work of the cleaning pipeline.
//!
//! A stage takes an immutable frame snapshot and returns a new one together
//! with the actions it performed. Stages never see each other; the only thing
//! that flows between them is the frame.

use crate::error::Result;
use crate::types::CleaningAction;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinds of stages, in the order the default pipeline runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Attach the raw row position to every row
    TrackSourceRows,
    /// Remove columns without a single value
    DropEmptyColumns,
    /// Remove columns with too many missing values
    DropHighMissingColumns,
    /// Remove identifiers, free text and outcome-leaking columns
    DropNonAnalyticalColumns,
    /// Remove loans whose outcome is not known yet
    FilterUnresolvedLoans,
    /// Parse percentage strings into floats
    NormalizePercentages,
    /// Fill missing values of a numeric column
    Impute,
    /// Turn textual tenure into years
    ApproximateEmploymentLength,
    /// Extract the month from the issue date
    DeriveIssueMonth,
    /// Bucket numeric features into equal-frequency slabs
    DeriveSlabs,
    /// Check the guarantees of a cleaned frame
    ValidateCleaned,
    /// Drop the row tracking column
    ResetRowIndex,
}

impl StageKind {
    /// Stable snake_case identifier used in errors and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrackSourceRows => "track_source_rows",
            Self::DropEmptyColumns => "drop_empty_columns",
            Self::DropHighMissingColumns => "drop_high_missing_columns",
            Self::DropNonAnalyticalColumns => "drop_non_analytical_columns",
            Self::FilterUnresolvedLoans => "filter_unresolved_loans",
            Self::NormalizePercentages => "normalize_percentages",
            Self::Impute => "impute",
            Self::ApproximateEmploymentLength => "approximate_employment_length",
            Self::DeriveIssueMonth => "derive_issue_month",
            Self::DeriveSlabs => "derive_slabs",
            Self::ValidateCleaned => "validate_cleaned",
            Self::ResetRowIndex => "reset_row_index",
        }
    }

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::TrackSourceRows => "Tracking Source Rows",
            Self::DropEmptyColumns => "Dropping Empty Columns",
            Self::DropHighMissingColumns => "Dropping High-Missing Columns",
            Self::DropNonAnalyticalColumns => "Dropping Non-Analytical Columns",
            Self::FilterUnresolvedLoans => "Filtering Unresolved Loans",
            Self::NormalizePercentages => "Normalizing Percentages",
            Self::Impute => "Imputing Values",
            Self::ApproximateEmploymentLength => "Approximating Employment Length",
            Self::DeriveIssueMonth => "Deriving Issue Month",
            Self::DeriveSlabs => "Deriving Slabs",
            Self::ValidateCleaned => "Validating Cleaned Data",
            Self::ResetRowIndex => "Resetting Row Index",
        }
    }
}

/// What a stage hands back to the pipeline.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub frame: DataFrame,
    pub actions: Vec<CleaningAction>,
    pub warnings: Vec<String>,
}

impl StageOutput {
    pub fn new(frame: DataFrame) -> Self {
        Self {
            frame,
            actions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: CleaningAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = CleaningAction>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// A pure transformation over a frame snapshot.
///
/// `apply` must not depend on anything but its input frame and the stage's
/// own fields, so the same input always yields the same output.
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Columns that must exist in the frame handed to [`Stage::apply`].
    fn required_columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names_are_snake_case() {
        let kinds = [
            StageKind::TrackSourceRows,
            StageKind::DropEmptyColumns,
            StageKind::DropHighMissingColumns,
            StageKind::DropNonAnalyticalColumns,
            StageKind::FilterUnresolvedLoans,
            StageKind::NormalizePercentages,
            StageKind::Impute,
            StageKind::ApproximateEmploymentLength,
            StageKind::DeriveIssueMonth,
            StageKind::DeriveSlabs,
            StageKind::ValidateCleaned,
            StageKind::ResetRowIndex,
        ];
        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }
}
