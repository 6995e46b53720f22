//! Column-removal stages.

use super::drop_listed_columns;
use crate::config::HighMissingPolicy;
use crate::error::Result;
use crate::pipeline::{Stage, StageKind, StageOutput};
use crate::profiler::MissingValueProfile;
use crate::schema::columns::SOURCE_ROW;
use polars::prelude::*;
use tracing::info;

/// Removes columns that do not hold a single value.
#[derive(Debug, Clone, Default)]
pub struct DropEmptyColumns;

impl Stage for DropEmptyColumns {
    fn kind(&self) -> StageKind {
        StageKind::DropEmptyColumns
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        // without rows every column would count as empty
        if df.height() == 0 {
            return Ok(StageOutput::new(df.clone()));
        }

        let empty: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|c| c.name().as_str() != SOURCE_ROW && c.null_count() == df.height())
            .map(|c| c.name().to_string())
            .collect();

        info!("Found {} columns without values", empty.len());
        drop_listed_columns(df, &empty, self.kind().name(), false, "no values")
    }
}

/// Removes columns with too many missing values.
#[derive(Debug, Clone)]
pub struct DropHighMissingColumns {
    policy: HighMissingPolicy,
    outcome_column: String,
    strict: bool,
}

impl DropHighMissingColumns {
    pub fn new(policy: HighMissingPolicy, outcome_column: impl Into<String>, strict: bool) -> Self {
        Self {
            policy,
            outcome_column: outcome_column.into(),
            strict,
        }
    }
}

impl Stage for DropHighMissingColumns {
    fn kind(&self) -> StageKind {
        StageKind::DropHighMissingColumns
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let stage = self.kind().name();

        match &self.policy {
            HighMissingPolicy::Fixed(names) => {
                drop_listed_columns(df, names, stage, self.strict, "high missing ratio")
            }
            HighMissingPolicy::Threshold(ratio) => {
                let mut names = MissingValueProfile::of(df).columns_at_or_above(*ratio);
                names.retain(|name| *name != self.outcome_column);
                info!(
                    "{} columns have a missing ratio of at least {:.0}%",
                    names.len(),
                    ratio * 100.0
                );
                let reason = format!("missing ratio at or above {}", ratio);
                drop_listed_columns(df, &names, stage, false, &reason)
            }
        }
    }
}

/// Removes identifiers, free text, post-origination and outcome-leaking columns.
#[derive(Debug, Clone)]
pub struct DropNonAnalyticalColumns {
    columns: Vec<String>,
    strict: bool,
}

impl DropNonAnalyticalColumns {
    pub fn new(columns: Vec<String>, strict: bool) -> Self {
        Self { columns, strict }
    }
}

impl Stage for DropNonAnalyticalColumns {
    fn kind(&self) -> StageKind {
        StageKind::DropNonAnalyticalColumns
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        drop_listed_columns(
            df,
            &self.columns,
            self.kind().name(),
            self.strict,
            "no analytical value",
        )
    }
}
