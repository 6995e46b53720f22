//! Derived features: the issue month and the slab columns.

mod slab;

pub use slab::{SLAB_COUNT, Slab, SlabEdges, assign_slabs};

use crate::cleaner::converters::issue_months;
use crate::config::{SlabEdgePolicy, SlabFeature};
use crate::error::Result;
use crate::pipeline::{Stage, StageKind, StageOutput};
use crate::schema;
use crate::types::{ActionType, CleaningAction};
use crate::utils::{float_series, format_number};
use polars::prelude::*;
use tracing::{debug, info};

/// Adds the month token of the issue date as its own column.
#[derive(Debug, Clone)]
pub struct DeriveIssueMonth {
    source: String,
    target: String,
}

impl DeriveIssueMonth {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Stage for DeriveIssueMonth {
    fn kind(&self) -> StageKind {
        StageKind::DeriveIssueMonth
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.source.clone()]
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let months = issue_months(df, &self.source, self.kind().name())?;

        let mut frame = df.clone();
        frame.with_column(Series::new(self.target.as_str().into(), months))?;

        Ok(StageOutput::new(frame).with_action(
            CleaningAction::new(
                ActionType::ColumnDerived,
                &self.target,
                format!("Extracted month from '{}'", self.source),
            ),
        ))
    }
}

/// Buckets numeric features into five equal-frequency slabs.
///
/// Source columns are rewritten as `Float64`; each slab column holds the
/// short labels of [`Slab`].
#[derive(Debug, Clone)]
pub struct DeriveSlabs {
    features: Vec<SlabFeature>,
    policy: SlabEdgePolicy,
}

impl DeriveSlabs {
    pub fn new(features: Vec<SlabFeature>, policy: SlabEdgePolicy) -> Self {
        Self { features, policy }
    }
}

impl Stage for DeriveSlabs {
    fn kind(&self) -> StageKind {
        StageKind::DeriveSlabs
    }

    fn required_columns(&self) -> Vec<String> {
        self.features.iter().map(|f| f.source.clone()).collect()
    }

    fn apply(&self, df: &DataFrame) -> Result<StageOutput> {
        let stage = self.kind().name();
        let rows = schema::source_rows(df)?;
        let mut frame = df.clone();
        let mut actions = Vec::with_capacity(self.features.len());

        info!("Deriving {} slab features", self.features.len());

        for feature in &self.features {
            let values = schema::float_values(df, &feature.source, stage)?;
            let (slabs, edges) = assign_slabs(&feature.source, &values, &rows, self.policy)?;

            let rendered: Vec<String> = edges.edges().iter().map(|e| format_number(*e)).collect();
            debug!("Slab edges for '{}': [{}]", feature.source, rendered.join(", "));

            let labels: Vec<&str> = slabs.iter().map(|s| s.label()).collect();
            frame.replace(&feature.source, float_series(&feature.source, values))?;
            frame.with_column(Series::new(feature.target.as_str().into(), labels))?;

            let mut action = CleaningAction::new(
                ActionType::ColumnDerived,
                &feature.target,
                format!("Bucketed '{}' into {} slabs", feature.source, SLAB_COUNT),
            )
            .with_details(format!("edges=[{}]", rendered.join(", ")));
            if let Some(edge) = edges.collision() {
                action.description.push_str(&format!(
                    " (edges collide at {}, merged)",
                    format_number(edge)
                ));
            }
            actions.push(action);
        }

        Ok(StageOutput::new(frame).with_actions(actions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleaningError;
    use pretty_assertions::assert_eq;

    fn strings(df: &DataFrame, name: &str) -> Vec<String> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_derive_issue_month() {
        let df = df!["issue_d" => ["Dec-11", "Nov-11", "Jun-10"]].unwrap();
        let stage = DeriveIssueMonth::new("issue_d", "issue_month");
        let output = stage.apply(&df).unwrap();

        assert_eq!(strings(&output.frame, "issue_month"), vec!["Dec", "Nov", "Jun"]);
        // source column is kept
        assert_eq!(output.frame.width(), 2);
        assert_eq!(output.actions[0].action_type, ActionType::ColumnDerived);
    }

    #[test]
    fn test_derive_issue_month_rejects_invalid_month() {
        let df = df!["issue_d" => ["Dec-11", "Smarch-11"]].unwrap();
        let err = DeriveIssueMonth::new("issue_d", "issue_month")
            .apply(&df)
            .unwrap_err();
        assert!(matches!(err, CleaningError::Parse { row: 1, .. }));
    }

    #[test]
    fn test_derive_slabs_adds_label_column() {
        let df = df![
            "int_rate" => [10.65, 15.27, 15.96, 12.69, 7.9, 18.64, 21.28, 13.49, 9.91, 11.71],
        ]
        .unwrap();

        let stage = DeriveSlabs::new(
            vec![SlabFeature::new("int_rate", "int_slab")],
            SlabEdgePolicy::Reject,
        );
        let output = stage.apply(&df).unwrap();

        assert_eq!(
            strings(&output.frame, "int_slab"),
            vec!["L", "H", "H", "M", "VL", "VH", "VH", "M", "VL", "L"]
        );
        assert_eq!(output.actions.len(), 1);
    }

    #[test]
    fn test_derive_slabs_casts_integer_source() {
        let df = df!["open_acc" => [3i64, 9, 4, 2, 8, 10, 5, 7, 11, 6]].unwrap();
        let stage = DeriveSlabs::new(
            vec![SlabFeature::new("open_acc", "open_acc_slab")],
            SlabEdgePolicy::Reject,
        );
        let output = stage.apply(&df).unwrap();

        assert_eq!(output.frame.column("open_acc").unwrap().dtype(), &DataType::Float64);
        assert_eq!(
            strings(&output.frame, "open_acc_slab"),
            vec!["VL", "H", "L", "VL", "H", "VH", "L", "M", "VH", "M"]
        );
    }

    #[test]
    fn test_derive_slabs_collision_policy() {
        let df = df!["open_acc" => [1, 1, 1, 1, 1, 1, 2, 3, 4, 5]].unwrap();
        let features = vec![SlabFeature::new("open_acc", "open_acc_slab")];

        let err = DeriveSlabs::new(features.clone(), SlabEdgePolicy::Reject)
            .apply(&df)
            .unwrap_err();
        assert_eq!(err.error_code(), "SLAB_EDGE_COLLISION");

        let output = DeriveSlabs::new(features, SlabEdgePolicy::Merge)
            .apply(&df)
            .unwrap();
        assert!(output.actions[0].description.contains("merged"));
    }
}
