//! Cleaning stages of the loan pipeline.
//!
//! This module provides stages for:
//! - Tracking raw row positions and dropping the tracker at the end
//! - Dropping empty, high-missing and non-analytical columns
//! - Removing loans without a final outcome
//! - Parsing percentage and employment length text into numbers

mod coercion;
mod columns;
pub mod converters;
mod rows;

pub use coercion::{ApproximateEmploymentLength, NormalizePercentages};
pub use columns::{DropEmptyColumns, DropHighMissingColumns, DropNonAnalyticalColumns};
pub use rows::{FilterUnresolvedLoans, ResetRowIndex, TrackSourceRows};

use crate::error::{CleaningError, Result};
use crate::pipeline::StageOutput;
use crate::types::{ActionType, CleaningAction};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Drop every listed column present in `df`.
///
/// Listed names absent from the frame are skipped with a warning, or rejected
/// as a schema error when `strict` is set.
pub(crate) fn drop_listed_columns(
    df: &DataFrame,
    names: &[String],
    stage: &str,
    strict: bool,
    reason: &str,
) -> Result<StageOutput> {
    let present: HashSet<&str> = df.get_column_names().into_iter().map(|s| s.as_str()).collect();

    let mut to_drop = Vec::new();
    let mut absent = Vec::new();
    for name in names {
        if present.contains(name.as_str()) {
            to_drop.push(name.clone());
        } else if strict {
            return Err(CleaningError::schema(
                stage,
                name,
                "is listed for removal but absent",
            ));
        } else {
            absent.push(name.clone());
        }
    }

    let frame = if to_drop.is_empty() {
        df.clone()
    } else {
        let cols: Vec<PlSmallStr> = to_drop.iter().map(|s| s.as_str().into()).collect();
        df.drop_many(cols)
    };

    let mut output = StageOutput::new(frame).with_actions(to_drop.iter().map(|name| {
        debug!("Dropping column '{}' ({})", name, reason);
        CleaningAction::new(
            ActionType::ColumnRemoved,
            name,
            format!("Removed column: {}", reason),
        )
    }));

    if !absent.is_empty() {
        warn!(
            "{} listed columns not present, skipped: {:?}",
            absent.len(),
            absent
        );
        for name in absent {
            output = output.with_warning(format!(
                "Column '{}' listed for removal in stage '{}' is not present",
                name, stage
            ));
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_listed_columns_skips_absent_names() {
        let df = df!["id" => [1, 2], "dti" => [1.0, 2.0]].unwrap();
        let output = drop_listed_columns(
            &df,
            &["id".to_string(), "url".to_string()],
            "drop_non_analytical_columns",
            false,
            "non-analytical",
        )
        .unwrap();

        let names: Vec<&str> = output
            .frame
            .get_column_names()
            .into_iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(names, vec!["dti"]);
        assert_eq!(output.actions.len(), 1);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("url"));
    }

    #[test]
    fn test_drop_listed_columns_strict() {
        let df = df!["id" => [1, 2]].unwrap();
        let err = drop_listed_columns(
            &df,
            &["url".to_string()],
            "drop_non_analytical_columns",
            true,
            "non-analytical",
        )
        .unwrap_err();

        assert!(err.is_schema_error());
    }
}
