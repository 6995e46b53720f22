//! Loan Dataset Cleaning Library
//!
//! Turns a raw Lending Club loan export into an analysis-ready frame, built
//! with Rust and Polars.
//!
//! # Overview
//!
//! The pipeline runs a fixed sequence of pure stages over a copy of the input:
//!
//! - **Column pruning**: empty, sparse and non-analytical columns are dropped
//! - **Row filtering**: loans that are still running are removed
//! - **Type coercion**: percentage and employment length text become numbers
//! - **Imputation**: gaps are filled with the median or the mode
//! - **Feature derivation**: the issue month and five equal-frequency slabs
//! - **Validation**: the cleaned frame is checked before it is returned
//!
//! On top of the cleaned frame, [`aggregate`] computes outcome rates per
//! category and [`profiler`] measures how incomplete a frame is.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use loan_processing::{Pipeline, group_outcome_rate, load_loan_data};
//! use std::path::Path;
//!
//! let raw = load_loan_data(Path::new("loan.csv"))?;
//! let cleaned = Pipeline::builder().build()?.clean(&raw)?;
//!
//! for group in group_outcome_rate(&cleaned.frame, "int_slab")? {
//!     println!("{}: {:.1}% charged off", group.key, group.charged_off * 100.0);
//! }
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to change what each stage acts on:
//!
//! ```rust,ignore
//! use loan_processing::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .high_missing_policy(HighMissingPolicy::Threshold(0.5))
//!     .slab_edge_policy(SlabEdgePolicy::Merge)
//!     .strict_column_drops(true)
//!     .build()?;
//! ```
//!
//! # Errors
//!
//! Every failure is a [`CleaningError`]. A column the run needs but cannot
//! find is a schema error; a raw value that cannot be coerced is a parse error
//! naming the column, the row of the raw input and the offending value. No
//! partial result is ever returned.

pub mod aggregate;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod features;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use aggregate::{
    GroupOutcome, ValueShare, group_outcome_rate, highest_default_groups, value_shares,
};
pub use config::{
    ConfigValidationError, HighMissingPolicy, ImputationRule, NumericImputation, PipelineConfig,
    PipelineConfigBuilder, SlabEdgePolicy, SlabFeature,
};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use features::{Slab, SlabEdges};
pub use imputers::StatisticalImputer;
pub use loader::{load_loan_data, read_loan_csv, save_dataset};
pub use pipeline::{CleanedDataset, Pipeline, PipelineBuilder, Stage, StageKind, clean};
pub use profiler::MissingValueProfile;
pub use reporting::{GroupAnalysis, ReportGenerator, RunReport};
pub use schema::{CleanedLoan, LoanStatus};
pub use types::{ActionType, CleaningAction, CleaningReport, StageReport};
