use crate::pipeline::StageKind;
use crate::profiler::MissingValueProfile;
use serde::{Deserialize, Serialize};

// ============================================================================
// Cleaning Report Types
// ============================================================================

/// Audit trail of one cleaning run.
///
/// # Example
///
/// ```rust,ignore
/// let cleaned = Pipeline::builder().build()?.clean(&raw)?;
/// let report = &cleaned.report;
/// println!("Kept {} of {} rows in {}ms", report.rows_after, report.rows_before, report.duration_ms);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Number of rows in the raw input.
    pub rows_before: usize,
    /// Number of rows in the cleaned output.
    pub rows_after: usize,

    /// Number of columns in the raw input.
    pub columns_before: usize,
    /// Number of columns in the cleaned output.
    pub columns_after: usize,

    /// Missing values of the raw input, per column and per row.
    pub missing_before: MissingValueProfile,

    /// One entry per executed stage, in execution order.
    pub stages: Vec<StageReport>,

    /// Warnings and notes generated while cleaning.
    pub warnings: Vec<String>,
}

impl CleaningReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows removed by the run.
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    /// Calculate the percentage of rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f32 / self.rows_before as f32) * 100.0
        }
    }

    /// All actions of every stage, in execution order.
    pub fn actions(&self) -> impl Iterator<Item = &CleaningAction> {
        self.stages.iter().flat_map(|stage| stage.actions.iter())
    }

    /// Names of every column the run removed.
    pub fn dropped_columns(&self) -> Vec<String> {
        self.actions()
            .filter(|a| a.action_type == ActionType::ColumnRemoved)
            .map(|a| a.target.clone())
            .collect()
    }

    /// Names of every column the run added.
    pub fn derived_columns(&self) -> Vec<String> {
        self.actions()
            .filter(|a| a.action_type == ActionType::ColumnDerived)
            .map(|a| a.target.clone())
            .collect()
    }
}

/// What a single stage did to the frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub actions: Vec<CleaningAction>,
}

/// A single action taken during cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningAction {
    /// Type of action performed.
    pub action_type: ActionType,
    /// Target of the action (column name or "dataset").
    pub target: String,
    /// Human-readable description of the action.
    pub description: String,
    /// Additional details (e.g., values replaced, strategy used).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    /// Create a new cleaning action.
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    /// Add details to the action.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of actions that can be taken during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A column was removed from the dataset.
    ColumnRemoved,
    /// One or more rows were removed from the dataset.
    RowsRemoved,
    /// A column's values were parsed into another type.
    TypeConverted,
    /// Missing values were imputed.
    ValueImputed,
    /// A new column was derived from existing ones.
    ColumnDerived,
}
