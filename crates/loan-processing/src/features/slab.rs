//! Equal-frequency bucketing of numeric features.
//!
//! Edges sit at the 0, 20, 40, 60, 80 and 100th percentiles of the present
//! values, interpolated linearly between order statistics. Bins are closed on
//! the right, and the first bin also includes its left edge, so every value of
//! the column lands in exactly one bin.

use crate::config::SlabEdgePolicy;
use crate::error::{CleaningError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of buckets of a slab feature.
pub const SLAB_COUNT: usize = 5;

/// Relative position of a value within its feature's distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slab {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Slab {
    /// All slabs, lowest first.
    pub const ALL: [Slab; SLAB_COUNT] = [
        Slab::VeryLow,
        Slab::Low,
        Slab::Medium,
        Slab::High,
        Slab::VeryHigh,
    ];

    /// Short label stored in the frame.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryLow => "VL",
            Self::Low => "L",
            Self::Medium => "M",
            Self::High => "H",
            Self::VeryHigh => "VH",
        }
    }

    /// Zero-based position of the slab, lowest first.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Slab> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Slab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Slab {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slab| slab.label() == s.trim())
            .ok_or_else(|| format!("Unknown slab label: '{}'", s))
    }
}

/// The six quantile edges of a slab feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlabEdges {
    edges: [f64; SLAB_COUNT + 1],
}

impl SlabEdges {
    /// Compute edges over `values`, which must be sorted ascending.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_sorted(values: &[f64]) -> Option<Self> {
        let last = values.len().checked_sub(1)?;
        let mut edges = [0.0; SLAB_COUNT + 1];

        for (k, edge) in edges.iter_mut().enumerate() {
            // k * last / 5 keeps whole positions exact
            let position = (k * last) as f64 / SLAB_COUNT as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            *edge = values[lower] + (values[upper] - values[lower]) * fraction;
        }

        Some(Self { edges })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// The first edge value shared by two adjacent edges, if any.
    pub fn collision(&self) -> Option<f64> {
        self.edges
            .windows(2)
            .find(|pair| pair[0] == pair[1])
            .map(|pair| pair[0])
    }

    /// Bin of `value`: the first slab whose upper edge is not below it.
    ///
    /// Values above the last edge fall into the top slab.
    pub fn assign(&self, value: f64) -> Slab {
        self.edges[1..]
            .iter()
            .position(|upper| value <= *upper)
            .and_then(Slab::from_index)
            .unwrap_or(Slab::VeryHigh)
    }
}

/// Bucket every value of `column` into a slab.
///
/// A missing value is a parse error reported at its raw row (`rows[i]`).
/// Colliding edges are handled according to `policy`.
pub fn assign_slabs(
    column: &str,
    values: &[Option<f64>],
    rows: &[usize],
    policy: SlabEdgePolicy,
) -> Result<(Vec<Slab>, SlabEdges)> {
    let mut present = Vec::with_capacity(values.len());
    for (value, row) in values.iter().zip(rows) {
        match value {
            Some(v) if !v.is_nan() => present.push(*v),
            _ => return Err(CleaningError::parse(column, *row, "null", "a number")),
        }
    }

    let mut sorted = present.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let edges = SlabEdges::from_sorted(&sorted)
        .ok_or_else(|| CleaningError::schema("derive_slabs", column, "has no values to bucket"))?;

    if policy == SlabEdgePolicy::Reject
        && let Some(edge) = edges.collision()
    {
        return Err(CleaningError::SlabEdgeCollision {
            column: column.to_string(),
            edge,
        });
    }

    let slabs = present.iter().map(|v| edges.assign(*v)).collect();
    Ok((slabs, edges))
}
