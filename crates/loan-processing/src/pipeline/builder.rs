//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the cleaning and feature-derivation workflow.

use crate::cleaner::{
    ApproximateEmploymentLength, DropEmptyColumns, DropHighMissingColumns,
    DropNonAnalyticalColumns, FilterUnresolvedLoans, NormalizePercentages, ResetRowIndex,
    TrackSourceRows,
};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::Result;
use crate::features::{DeriveIssueMonth, DeriveSlabs};
use crate::imputers::ImputeColumn;
use crate::pipeline::validation::ValidateCleaned;
use crate::pipeline::{Stage, StageKind};
use crate::profiler::MissingValueProfile;
use crate::schema::{CleanedLoan, require_columns};
use crate::types::{CleaningReport, StageReport};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, error, info};

/// A cleaned frame together with the audit trail of the run.
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub frame: DataFrame,
    pub report: CleaningReport,
}

impl CleanedDataset {
    /// Typed view of every row.
    pub fn loans(&self) -> Result<Vec<CleanedLoan>> {
        CleanedLoan::from_frame(&self.frame)
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

/// The cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use loan_processing::{HighMissingPolicy, Pipeline, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .high_missing_policy(HighMissingPolicy::Threshold(0.5))
///     .build()?;
///
/// let cleaned = Pipeline::builder()
///     .config(config)
///     .build()?
///     .clean(&raw)?;
///
/// println!("{} loans kept", cleaned.frame.height());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    stages: Vec<Box<dyn Stage>>,
}

// Pipeline can be shared across threads; cleaning itself stays single-threaded
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Kinds of the configured stages, in execution order.
    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.kind()).collect()
    }

    /// Run every stage over a copy of `raw`.
    ///
    /// The input frame is never modified, and the same input always gives the
    /// same output. Nothing is returned on failure.
    ///
    /// # Errors
    ///
    /// Returns a schema error when a required column is absent (checked both
    /// before the first stage and at every stage boundary), and a parse error
    /// when a raw value cannot be coerced.
    pub fn clean(&self, raw: &DataFrame) -> Result<CleanedDataset> {
        match self.clean_internal(raw) {
            Ok(cleaned) => Ok(cleaned),
            Err(e) => {
                error!("Cleaning failed: {}", e);
                Err(e)
            }
        }
    }

    fn clean_internal(&self, raw: &DataFrame) -> Result<CleanedDataset> {
        let start_time = Instant::now();

        info!(
            "Starting cleaning pipeline on {} rows x {} columns",
            raw.height(),
            raw.width()
        );
        require_columns(raw, &self.config.required_columns(), "validate_input")?;

        let mut report = CleaningReport {
            rows_before: raw.height(),
            columns_before: raw.width(),
            missing_before: MissingValueProfile::of(raw),
            ..CleaningReport::new()
        };

        let mut frame = raw.clone();
        for (step, stage) in self.stages.iter().enumerate() {
            let kind = stage.kind();
            require_columns(&frame, &stage.required_columns(), kind.name())?;

            info!("Step {}: {}...", step, kind.display_name());
            let output = stage.apply(&frame)?;
            debug!(
                "{} done: {} rows x {} columns",
                kind.name(),
                output.frame.height(),
                output.frame.width()
            );

            report.stages.push(StageReport {
                stage: kind,
                rows_before: frame.height(),
                rows_after: output.frame.height(),
                columns_before: frame.width(),
                columns_after: output.frame.width(),
                actions: output.actions,
            });
            report.warnings.extend(output.warnings);
            frame = output.frame;
        }

        report.rows_after = frame.height();
        report.columns_after = frame.width();
        report.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Cleaning completed in {}ms: {} -> {} rows, {} -> {} columns",
            report.duration_ms,
            report.rows_before,
            report.rows_after,
            report.columns_before,
            report.columns_after
        );

        Ok(CleanedDataset { frame, report })
    }
}

/// Clean `raw` with the default configuration.
///
/// Shorthand for `Pipeline::builder().build()?.clean(raw)` keeping only the frame.
pub fn clean(raw: &DataFrame) -> Result<DataFrame> {
    let pipeline = Pipeline::builder().build()?;
    Ok(pipeline.clean(raw)?.frame)
}

/// Builder for creating a [`Pipeline`] with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::builder()
///     .config(PipelineConfig::default())
///     .build()?;
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let stages = stages_for(&config);
        Ok(Pipeline { config, stages })
    }
}

fn stages_for(config: &PipelineConfig) -> Vec<Box<dyn Stage>> {
    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(TrackSourceRows),
        Box::new(DropEmptyColumns),
        Box::new(DropHighMissingColumns::new(
            config.high_missing_policy.clone(),
            &config.outcome_column,
            config.strict_column_drops,
        )),
        Box::new(DropNonAnalyticalColumns::new(
            config.non_analytical_columns.clone(),
            config.strict_column_drops,
        )),
        Box::new(FilterUnresolvedLoans::new(
            &config.outcome_column,
            &config.unresolved_status,
        )),
        Box::new(NormalizePercentages::new(config.percentage_columns.clone())),
    ];

    for rule in &config.imputations {
        stages.push(Box::new(ImputeColumn::new(rule.clone())));
    }

    stages.push(Box::new(ApproximateEmploymentLength::new(
        &config.employment_length_column,
        config.employment_length_imputation,
    )));
    stages.push(Box::new(DeriveIssueMonth::new(
        &config.issue_date_column,
        &config.issue_month_column,
    )));
    stages.push(Box::new(DeriveSlabs::new(
        config.slab_features.clone(),
        config.slab_edge_policy,
    )));
    stages.push(Box::new(ValidateCleaned::new(
        &config.outcome_column,
        complete_columns(config),
    )));
    stages.push(Box::new(ResetRowIndex));

    stages
}

/// Columns the pipeline fills or derives, which must end up without gaps.
fn complete_columns(config: &PipelineConfig) -> Vec<String> {
    let mut names: Vec<String> = config.imputations.iter().map(|r| r.column.clone()).collect();
    names.push(config.employment_length_column.clone());
    names.push(config.issue_month_column.clone());
    names.extend(config.slab_features.iter().map(|f| f.target.clone()));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HighMissingPolicy, ImputationRule, NumericImputation};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().outcome_column, "loan_status");

        let kinds = pipeline.stage_kinds();
        assert_eq!(kinds.first(), Some(&StageKind::TrackSourceRows));
        assert_eq!(kinds.last(), Some(&StageKind::ResetRowIndex));
        // two default imputation rules
        assert_eq!(kinds.iter().filter(|k| **k == StageKind::Impute).count(), 2);
    }

    #[test]
    fn test_stage_order_follows_cleaning_steps() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(
            pipeline.stage_kinds(),
            vec![
                StageKind::TrackSourceRows,
                StageKind::DropEmptyColumns,
                StageKind::DropHighMissingColumns,
                StageKind::DropNonAnalyticalColumns,
                StageKind::FilterUnresolvedLoans,
                StageKind::NormalizePercentages,
                StageKind::Impute,
                StageKind::Impute,
                StageKind::ApproximateEmploymentLength,
                StageKind::DeriveIssueMonth,
                StageKind::DeriveSlabs,
                StageKind::ValidateCleaned,
                StageKind::ResetRowIndex,
            ]
        );
    }

    #[test]
    fn test_pipeline_builder_with_config() {
        let config = PipelineConfig::builder()
            .high_missing_policy(HighMissingPolicy::Threshold(0.6))
            .imputations(vec![ImputationRule::new(
                "revol_util",
                NumericImputation::Mean,
            )])
            .build()
            .unwrap();

        let pipeline = Pipeline::builder().config(config).build().unwrap();
        assert_eq!(
            pipeline.config().high_missing_policy,
            HighMissingPolicy::Threshold(0.6)
        );
        assert_eq!(
            pipeline
                .stage_kinds()
                .iter()
                .filter(|k| **k == StageKind::Impute)
                .count(),
            1
        );
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = PipelineConfig {
            high_missing_policy: HighMissingPolicy::Threshold(-0.1),
            ..PipelineConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_missing_required_column_fails_before_any_stage() {
        let raw = df!["loan_status" => ["Fully Paid"]].unwrap();
        let err = Pipeline::builder().build().unwrap().clean(&raw).unwrap_err();

        assert!(err.is_schema_error());
        assert!(err.to_string().contains("validate_input"));
    }

    #[test]
    fn test_complete_columns_cover_derived_outputs() {
        let names = complete_columns(&PipelineConfig::default());
        for expected in [
            "revol_util",
            "pub_rec_bankruptcies",
            "emp_length",
            "issue_month",
            "int_slab",
            "open_acc_slab",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }
}
