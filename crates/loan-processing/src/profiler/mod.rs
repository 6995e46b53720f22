//! Missing-value profiling.
//!
//! Measures how incomplete a frame is, per column and per row. The pipeline
//! profiles the raw input for its report and uses the per-column ratios to
//! pick columns under [`crate::config::HighMissingPolicy::Threshold`].

use crate::schema::columns;
use crate::utils::missing_ratio;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Missing values of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub name: String,
    pub missing: usize,
    /// Share of rows without a value, between 0.0 and 1.0.
    pub ratio: f64,
}

/// Share of rows that miss exactly `missing_cells` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMissingShare {
    pub missing_cells: usize,
    pub share: f64,
}

/// Missing-value profile of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValueProfile {
    pub rows: usize,
    /// Sorted by ratio descending, then by name.
    pub columns: Vec<ColumnMissing>,
    /// Sorted by number of missing cells ascending.
    pub rows_by_missing_cells: Vec<RowMissingShare>,
}

impl MissingValueProfile {
    /// Profile every column of `df` except the row tracking column.
    pub fn of(df: &DataFrame) -> Self {
        let rows = df.height();
        let mut per_row = vec![0usize; rows];
        let mut columns = Vec::new();

        for column in df.get_columns() {
            if column.name().as_str() == columns::SOURCE_ROW {
                continue;
            }
            let series = column.as_materialized_series();

            if series.null_count() > 0 {
                let nulls = series.is_null();
                for (count, is_null) in per_row.iter_mut().zip(nulls.into_iter()) {
                    if is_null.unwrap_or(false) {
                        *count += 1;
                    }
                }
            }

            columns.push(ColumnMissing {
                name: series.name().to_string(),
                missing: series.null_count(),
                ratio: missing_ratio(series),
            });
        }

        columns.sort_by(|a, b| b.ratio.total_cmp(&a.ratio).then_with(|| a.name.cmp(&b.name)));

        let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
        for count in per_row {
            *histogram.entry(count).or_default() += 1;
        }
        let rows_by_missing_cells = histogram
            .into_iter()
            .map(|(missing_cells, count)| RowMissingShare {
                missing_cells,
                share: count as f64 / rows as f64,
            })
            .collect();

        Self {
            rows,
            columns,
            rows_by_missing_cells,
        }
    }

    /// Names of the columns whose missing ratio is at or above `ratio`.
    pub fn columns_at_or_above(&self, ratio: f64) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.ratio >= ratio)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Missing ratio of `name`, if the column was profiled.
    pub fn ratio_of(&self, name: &str) -> Option<f64> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.ratio)
    }

    /// Whether the frame has no missing value at all.
    pub fn is_complete(&self) -> bool {
        self.columns.iter().all(|c| c.missing == 0)
    }
}
