//! Orderings for contract lists.
//!
//! The backend returns contracts newest first. Screens either keep that
//! order or re-sort by contract value (Risk Center).

use std::cmp::Reverse;

use crate::model::Contract;

/// Sort in place by value, largest first.
///
/// # Ordering
///
/// 1. Missing `value_rp` counts as zero
/// 2. Larger values come first
/// 3. Equal values keep their relative order (the sort is stable)
///
/// Sorting an already sorted list leaves it unchanged.
pub fn sort_by_value_desc(rows: &mut [&Contract]) {
    rows.sort_by_key(|c| Reverse(c.value_or_zero()));
}

/// Owned variant of [`sort_by_value_desc`] for use in iterator pipelines.
pub fn sorted_by_value(mut rows: Vec<&Contract>) -> Vec<&Contract> {
    sort_by_value_desc(&mut rows);
    rows
}

/// Newest `created_at` first, the order the backend serves contracts in.
pub fn sort_newest_first(rows: &mut [Contract]) {
    rows.sort_by_key(|c| Reverse(c.created_at));
}
