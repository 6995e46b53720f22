//! Outcome rates per category of a cleaned frame.
//!
//! These are the group-bys the default analysis is built on: the share of
//! charged-off loans per slab, per purpose, per state and so on.

use crate::error::{CleaningError, Result};
use crate::features::Slab;
use crate::schema::{self, LoanStatus, columns, source_rows};
use crate::utils::{format_number, is_numeric_dtype};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

const STAGE: &str = "aggregate";

/// Key used for rows without a value in the grouping column.
pub const NULL_KEY: &str = "null";

/// Outcome split of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub key: String,
    pub count: usize,
    /// Share of fully paid loans in the group.
    pub fully_paid: f64,
    /// Share of charged-off loans in the group.
    pub charged_off: f64,
}

/// Share of rows holding one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueShare {
    pub value: String,
    pub count: usize,
    pub share: f64,
}

/// Fully paid and charged-off shares per category of `by`.
///
/// Groups are ordered by slab order when every key is a slab label,
/// numerically when every key is a number, and lexically otherwise. Rows
/// without a key are grouped under [`NULL_KEY`], which always comes last.
///
/// Every outcome must be final; an unresolved or unknown status is a parse
/// error.
pub fn group_outcome_rate(df: &DataFrame, by: &str) -> Result<Vec<GroupOutcome>> {
    let keys = group_keys(df, by)?;
    let statuses = schema::string_values(df, columns::LOAN_STATUS, STAGE)?;
    let rows = source_rows(df)?;

    let mut tallies: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for ((key, status), row) in keys.into_iter().zip(statuses).zip(rows) {
        let parsed = status.as_deref().and_then(|s| s.parse::<LoanStatus>().ok());
        let charged_off = match parsed {
            Some(status) if status.is_terminal() => status.is_default(),
            _ => {
                return Err(CleaningError::parse(
                    columns::LOAN_STATUS,
                    row,
                    status.unwrap_or_else(|| NULL_KEY.to_string()),
                    "a final loan status",
                ));
            }
        };

        let tally = tallies.entry(key).or_default();
        tally.0 += 1;
        if charged_off {
            tally.1 += 1;
        }
    }

    let mut groups: Vec<GroupOutcome> = tallies
        .into_iter()
        .map(|(key, (count, charged))| {
            let charged_off = charged as f64 / count as f64;
            GroupOutcome {
                key,
                count,
                fully_paid: 1.0 - charged_off,
                charged_off,
            }
        })
        .collect();

    sort_keys(&mut groups, |g| g.key.as_str());
    Ok(groups)
}

/// The `n` groups with the highest charged-off share, ties broken by key.
pub fn highest_default_groups(groups: &[GroupOutcome], n: usize) -> Vec<GroupOutcome> {
    let mut ranked = groups.to_vec();
    ranked.sort_by(|a, b| {
        b.charged_off
            .total_cmp(&a.charged_off)
            .then_with(|| a.key.cmp(&b.key))
    });
    ranked.truncate(n);
    ranked
}

/// Share of rows per value of `column`, most frequent first.
pub fn value_shares(df: &DataFrame, column: &str) -> Result<Vec<ValueShare>> {
    let keys = group_keys(df, column)?;
    let total = keys.len();

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut shares: Vec<ValueShare> = counts
        .into_iter()
        .map(|(value, count)| ValueShare {
            value,
            count,
            share: count as f64 / total as f64,
        })
        .collect();
    // BTreeMap order breaks count ties by value
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(shares)
}

fn group_keys(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let series = schema::series(df, column, STAGE)?;

    let keys = if is_numeric_dtype(series.dtype()) {
        schema::float_values(df, column, STAGE)?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect::<Vec<_>>()
    } else {
        schema::string_values(df, column, STAGE)?
    };

    Ok(keys
        .into_iter()
        .map(|k| k.unwrap_or_else(|| NULL_KEY.to_string()))
        .collect())
}

fn sort_keys<T>(items: &mut [T], key: impl Fn(&T) -> &str) {
    let present = || items.iter().map(&key).filter(|k| *k != NULL_KEY);

    let all_slabs = present().all(|k| k.parse::<Slab>().is_ok());
    let all_numeric = present().all(|k| k.parse::<f64>().is_ok());

    let compare = |a: &str, b: &str| -> Ordering {
        match (a == NULL_KEY, b == NULL_KEY) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        if all_slabs && let (Ok(x), Ok(y)) = (a.parse::<Slab>(), b.parse::<Slab>()) {
            return x.cmp(&y);
        }
        if all_numeric && let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
            return x.total_cmp(&y);
        }
        a.cmp(b)
    };

    items.sort_by(|a, b| compare(key(a), key(b)));
}
