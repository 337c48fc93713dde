use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::data::column_store::{ColumnData, ColumnStore, NULL_ID};
use crate::error::{GridError, GridResult};

/// One sort key: a column index and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortKey {
    pub col_index: u32,
    pub desc: bool,
}

/// Ordered multi-key sort specification. Empty = natural order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    pub fn single(col_index: u32, desc: bool) -> Self {
        Self {
            keys: vec![SortKey { col_index, desc }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 64-bit cache key for the view pipeline.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for key in &self.keys {
            key.col_index.hash(&mut hasher);
            key.desc.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Stable multi-key sort of a candidate index array. Returns a new
/// allocation; the candidate order breaks all remaining ties.
///
/// Per-key ordering: numeric NaN (null) compares greater than any finite
/// value regardless of direction, so null rows land last both ascending and
/// descending. String cells compare lexicographically with the null
/// sentinel greatest; the whole string comparison inverts under `desc`.
pub fn sort_view(store: &ColumnStore, candidates: Vec<u32>, spec: &SortSpec) -> GridResult<Vec<u32>> {
    if spec.is_empty() {
        return Ok(candidates);
    }
    for key in &spec.keys {
        if key.col_index as usize >= store.column_count() {
            return Err(GridError::out_of_range(format!(
                "sort key column {} out of bounds ({} columns)",
                key.col_index,
                store.column_count()
            )));
        }
        // surfaces NotInitialized before the O(N log N) work starts
        store.column(key.col_index as usize)?;
    }

    let mut sorted = candidates;
    sorted.sort_by(|&a, &b| {
        for key in &spec.keys {
            let ordering = compare_rows(store, key.col_index as usize, a as usize, b as usize, key.desc);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(sorted)
}

fn compare_rows(store: &ColumnStore, col: usize, row_a: usize, row_b: usize, desc: bool) -> Ordering {
    // columns were validated up front
    let Ok(data) = store.column(col) else {
        return Ordering::Equal;
    };
    match data {
        ColumnData::Float64(v) | ColumnData::Bool(v) => compare_f64(v[row_a], v[row_b], desc),
        ColumnData::Str { uniques, ids } => {
            compare_str_ids(uniques, ids[row_a], ids[row_b], desc)
        }
    }
}

/// NaN sorts last in both directions: the inversion only applies to the
/// finite-finite case.
fn compare_f64(a: f64, b: f64, desc: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if desc {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

fn compare_str_ids(uniques: &[String], a: u32, b: u32, desc: bool) -> Ordering {
    let ordering = match (a == NULL_ID, b == NULL_ID) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => uniques[a as usize].cmp(&uniques[b as usize]),
    };
    if desc {
        ordering.reverse()
    } else {
        ordering
    }
}
