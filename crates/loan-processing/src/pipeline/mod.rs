//! Pipeline module.
//!
//! This module provides the cleaning pipeline, the [`Stage`] trait its steps
//! implement, and the final validation of a cleaned frame.

mod builder;
mod stage;
mod validation;

pub use builder::{CleanedDataset, Pipeline, PipelineBuilder, clean};
pub use stage::{Stage, StageKind, StageOutput};
pub use validation::ValidateCleaned;
