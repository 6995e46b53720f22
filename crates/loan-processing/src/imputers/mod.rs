//! Imputation of missing numeric values.
//!
//! [`StatisticalImputer`] computes the fill value (mean, median or mode of
//! the present values); [`ImputeColumn`] is the pipeline stage that applies
//! it to one column.

mod statistical;

pub use statistical::{ImputeColumn, Imputed, StatisticalImputer};
