use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::hash::{Hash, Hasher};

use crate::data::column_store::{ColumnData, ColumnStore, NULL_ID};
use crate::error::{GridError, GridResult};

/// Per-column predicate, tagged for the wire form
/// `{kind: "substring" | "equals" | "numRange", ...params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ColumnPredicate {
    /// Case-insensitive substring match on string columns.
    Substring { value: String },
    /// Exact match for strings and bools; equality within `f64::EPSILON`
    /// for numeric columns.
    Equals { value: JsonValue },
    /// Numeric range with optional bounds. Subsumes the gt/lt/gte/lte
    /// comparator forms.
    #[serde(rename_all = "camelCase")]
    NumRange {
        min: Option<f64>,
        max: Option<f64>,
        #[serde(default)]
        exclusive_min: bool,
        #[serde(default)]
        exclusive_max: bool,
    },
}

/// A predicate bound to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFilter {
    pub col_index: u32,
    #[serde(flatten)]
    pub predicate: ColumnPredicate,
}

/// Filter specification: an optional global query over string columns plus
/// per-column predicates, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    /// Case-insensitive substring query matched against every targeted
    /// string column. `None` or empty = trivially true.
    pub global: Option<String>,
    /// Columns the global query targets; `None` = every string column.
    pub global_columns: Option<Vec<u32>>,
    /// Fuzzy-match the global query instead of substring matching. A
    /// leading `'` escapes back to exact substring matching.
    pub global_fuzzy: bool,
    pub columns: Vec<ColumnFilter>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.global.as_deref().is_none_or(str::is_empty) && self.columns.is_empty()
    }

    /// 64-bit cache key for the view pipeline.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.global.hash(&mut hasher);
        self.global_columns.hash(&mut hasher);
        self.global_fuzzy.hash(&mut hasher);
        for filter in &self.columns {
            filter.col_index.hash(&mut hasher);
            match &filter.predicate {
                ColumnPredicate::Substring { value } => {
                    0u8.hash(&mut hasher);
                    value.hash(&mut hasher);
                }
                ColumnPredicate::Equals { value } => {
                    1u8.hash(&mut hasher);
                    value.to_string().hash(&mut hasher);
                }
                ColumnPredicate::NumRange {
                    min,
                    max,
                    exclusive_min,
                    exclusive_max,
                } => {
                    2u8.hash(&mut hasher);
                    min.map(f64::to_bits).hash(&mut hasher);
                    max.map(f64::to_bits).hash(&mut hasher);
                    exclusive_min.hash(&mut hasher);
                    exclusive_max.hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }
}

/// Build the candidate view-index array: one ascending pass over all rows,
/// applying the global predicate and every column predicate. Survivors are
/// emitted in ascending row order, which preserves the original order for
/// ties downstream.
///
/// String predicates are resolved against the dictionary up front, so the
/// per-row work is an id lookup; no per-row string allocation happens.
pub fn filter_view(store: &ColumnStore, spec: &FilterSpec) -> GridResult<Vec<u32>> {
    let row_count = store.row_count();
    if spec.is_empty() {
        return Ok((0..row_count as u32).collect());
    }

    let global = GlobalMatcher::resolve(store, spec)?;
    let mut predicates = Vec::with_capacity(spec.columns.len());
    for filter in &spec.columns {
        predicates.push(ResolvedFilter::resolve(store, filter)?);
    }

    let mut out = Vec::new();
    'rows: for row in 0..row_count {
        if let Some(matcher) = &global {
            if !matcher.matches(store, row) {
                continue;
            }
        }
        for predicate in &predicates {
            if !predicate.matches(row) {
                continue 'rows;
            }
        }
        out.push(row as u32);
    }
    Ok(out)
}

/// Per-dictionary-id match table for one string column: the substring test
/// runs once per unique string, rows then hit an O(1) lookup.
struct StrMask<'a> {
    ids: &'a [u32],
    mask: Vec<bool>,
}

impl StrMask<'_> {
    fn hit(&self, row: usize) -> bool {
        let id = self.ids[row];
        // nulls never match a non-empty query
        id != NULL_ID && self.mask[id as usize]
    }
}

fn substring_mask<'a>(data: &'a ColumnData, needle_lower: &str) -> Option<StrMask<'a>> {
    match data {
        ColumnData::Str { uniques, ids } => Some(StrMask {
            ids,
            mask: uniques
                .iter()
                .map(|u| u.to_lowercase().contains(needle_lower))
                .collect(),
        }),
        _ => None,
    }
}

/// Resolved global predicate, built once per pass.
enum GlobalMatcher<'a> {
    Substring { targets: Vec<StrMask<'a>> },
    Fuzzy {
        pattern: String,
        matcher: SkimMatcherV2,
        targets: Vec<usize>,
    },
}

impl<'a> GlobalMatcher<'a> {
    fn resolve(store: &'a ColumnStore, spec: &FilterSpec) -> GridResult<Option<Self>> {
        let Some(query) = spec.global.as_deref().filter(|q| !q.is_empty()) else {
            return Ok(None);
        };
        let targets = match &spec.global_columns {
            Some(cols) => {
                let mut targets = Vec::with_capacity(cols.len());
                for &col in cols {
                    if col as usize >= store.column_count() {
                        return Err(GridError::out_of_range(format!(
                            "global filter column {} out of bounds ({} columns)",
                            col,
                            store.column_count()
                        )));
                    }
                    targets.push(col as usize);
                }
                targets
            }
            None => store.string_columns(),
        };

        // in fuzzy mode a leading ' escapes back to exact substring matching
        let needle = if spec.global_fuzzy {
            match query.strip_prefix('\'') {
                Some(exact) if !exact.is_empty() => exact,
                Some(_) => query,
                None => {
                    return Ok(Some(GlobalMatcher::Fuzzy {
                        pattern: query.to_string(),
                        matcher: SkimMatcherV2::default().ignore_case(),
                        targets,
                    }));
                }
            }
        } else {
            query
        };

        let needle_lower = needle.to_lowercase();
        let mut masks = Vec::with_capacity(targets.len());
        for col in targets {
            // non-string targets never match the global query
            if let Some(mask) = store.column(col).ok().and_then(|d| substring_mask(d, &needle_lower))
            {
                masks.push(mask);
            }
        }
        Ok(Some(GlobalMatcher::Substring { targets: masks }))
    }

    fn matches(&self, store: &ColumnStore, row: usize) -> bool {
        match self {
            GlobalMatcher::Substring { targets } => targets.iter().any(|mask| mask.hit(row)),
            GlobalMatcher::Fuzzy {
                pattern,
                matcher,
                targets,
            } => {
                let haystack = targets
                    .iter()
                    .filter_map(|&col| str_cell(store, col, row))
                    .collect::<Vec<_>>()
                    .join(" ");
                matcher
                    .fuzzy_match(&haystack, pattern)
                    .is_some_and(|score| score > 0)
            }
        }
    }
}

/// One column predicate resolved against its column's storage.
struct ResolvedFilter<'a> {
    data: &'a ColumnData,
    predicate: Resolved,
}

enum Resolved {
    Always,
    Never,
    /// Substring match precomputed over the dictionary.
    StrMask(Vec<bool>),
    /// Exact string match reduced to a dictionary id.
    StrEquals(u32),
    /// Numeric equality within epsilon (bools reduced to 0.0/1.0).
    NumEquals(f64),
    NumRange {
        min: Option<f64>,
        max: Option<f64>,
        exclusive_min: bool,
        exclusive_max: bool,
    },
}

impl<'a> ResolvedFilter<'a> {
    fn resolve(store: &'a ColumnStore, filter: &ColumnFilter) -> GridResult<Self> {
        let col = filter.col_index as usize;
        if col >= store.column_count() {
            return Err(GridError::out_of_range(format!(
                "filter column {} out of bounds ({} columns)",
                col,
                store.column_count()
            )));
        }
        let data = store.column(col)?;

        let predicate = match (&filter.predicate, data) {
            (ColumnPredicate::Substring { value }, _) if value.is_empty() => Resolved::Always,
            (ColumnPredicate::Substring { value }, ColumnData::Str { uniques, .. }) => {
                let needle = value.to_lowercase();
                Resolved::StrMask(
                    uniques
                        .iter()
                        .map(|u| u.to_lowercase().contains(&needle))
                        .collect(),
                )
            }
            // numeric columns do not support substring matching
            (ColumnPredicate::Substring { .. }, _) => Resolved::Never,

            (ColumnPredicate::Equals { value }, ColumnData::Str { uniques, .. }) => value
                .as_str()
                .and_then(|v| uniques.iter().position(|u| u == v))
                .map_or(Resolved::Never, |id| Resolved::StrEquals(id as u32)),
            (ColumnPredicate::Equals { value }, ColumnData::Bool(_)) => value
                .as_bool()
                .map_or(Resolved::Never, |v| {
                    Resolved::NumEquals(if v { 1.0 } else { 0.0 })
                }),
            (ColumnPredicate::Equals { value }, ColumnData::Float64(_)) => value
                .as_f64()
                .map_or(Resolved::Never, Resolved::NumEquals),

            (
                ColumnPredicate::NumRange {
                    min,
                    max,
                    exclusive_min,
                    exclusive_max,
                },
                ColumnData::Float64(_) | ColumnData::Bool(_),
            ) => Resolved::NumRange {
                min: *min,
                max: *max,
                exclusive_min: *exclusive_min,
                exclusive_max: *exclusive_max,
            },
            (ColumnPredicate::NumRange { .. }, ColumnData::Str { .. }) => Resolved::Never,
        };
        Ok(ResolvedFilter { data, predicate })
    }

    fn matches(&self, row: usize) -> bool {
        match (&self.predicate, self.data) {
            (Resolved::Always, _) => true,
            (Resolved::Never, _) => false,
            (Resolved::StrMask(mask), ColumnData::Str { ids, .. }) => {
                let id = ids[row];
                id != NULL_ID && mask[id as usize]
            }
            (Resolved::StrEquals(id), ColumnData::Str { ids, .. }) => ids[row] == *id,
            (
                Resolved::NumEquals(v),
                ColumnData::Float64(cells) | ColumnData::Bool(cells),
            ) => {
                let cell = cells[row];
                // NaN compares unequal to everything
                !cell.is_nan() && (cell - v).abs() < f64::EPSILON
            }
            (
                Resolved::NumRange {
                    min,
                    max,
                    exclusive_min,
                    exclusive_max,
                },
                ColumnData::Float64(cells) | ColumnData::Bool(cells),
            ) => {
                let cell = cells[row];
                if cell.is_nan() {
                    return false;
                }
                let above =
                    min.is_none_or(|m| if *exclusive_min { cell > m } else { cell >= m });
                let below =
                    max.is_none_or(|m| if *exclusive_max { cell < m } else { cell <= m });
                above && below
            }
            // predicate/storage pairs are aligned at resolve time
            _ => false,
        }
    }
}

/// String cell accessor for the fuzzy path. `None` for nulls and
/// non-string columns.
fn str_cell<'a>(store: &'a ColumnStore, col: usize, row: usize) -> Option<&'a str> {
    match store.column(col).ok()? {
        ColumnData::Str { uniques, ids } => {
            let id = *ids.get(row)?;
            if id == NULL_ID {
                None
            } else {
                Some(uniques[id as usize].as_str())
            }
        }
        _ => None,
    }
}

/// Regex scan over the current view: returns `(view position, display
/// column position)` pairs for every matching cell, in view order. A
/// non-filtering operation for host search UIs; invalid patterns are
/// reported as `BadInput`.
pub fn search_view(
    store: &ColumnStore,
    view: &[u32],
    display_columns: &[u32],
    pattern: &str,
) -> GridResult<Vec<(u32, u32)>> {
    let regex = Regex::new(pattern)
        .map_err(|e| GridError::bad_input(format!("invalid search pattern: {e}")))?;

    let mut matches = Vec::new();
    for (view_pos, &row) in view.iter().enumerate() {
        for (display_pos, &col) in display_columns.iter().enumerate() {
            let text = store.cell_text(col as usize, row as usize)?;
            if regex.is_match(&text) {
                matches.push((view_pos as u32, display_pos as u32));
            }
        }
    }
    Ok(matches)
}
