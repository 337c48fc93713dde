use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{GridError, GridResult};

/// Dictionary id reserved for null string cells.
pub const NULL_ID: u32 = u32::MAX;

/// Physical type of a column.
///
/// Booleans are stored in the same dense f64 array as numbers (true = 1.0,
/// false = 0.0, null = NaN); the tag only preserves the semantic type for
/// hosts that want to render them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    Float64,
    Bool,
    Str,
}

/// Type-specific columnar data.
#[derive(Debug, Clone)]
pub enum ColumnData {
    /// Dense f64 array. NaN = null sentinel.
    Float64(Vec<f64>),
    /// Bool stored as f64: 0.0 = false, 1.0 = true, NaN = null.
    Bool(Vec<f64>),
    /// Dictionary-encoded strings: unique list plus one id per row.
    /// `NULL_ID` marks a null cell.
    Str { uniques: Vec<String>, ids: Vec<u32> },
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Float64(_) => ColumnKind::Float64,
            ColumnData::Bool(_) => ColumnKind::Bool,
            ColumnData::Str { .. } => ColumnKind::Str,
        }
    }
}

/// A single cell value read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Display text for a cell. Nulls render as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Null => String::new(),
        }
    }
}

/// Zero-copy description of a column's backing array.
///
/// `ptr`/`len` describe the dense per-row array: f64 values for
/// `Float64`/`Bool` columns, u32 dictionary ids for `Str` columns. The
/// pointer is valid until the next `init` or ingestion; the generation
/// counter is the witness for staleness.
#[derive(Debug, Clone, Copy)]
pub struct ColumnInfo {
    pub kind: ColumnKind,
    pub ptr: *const u8,
    pub len: usize,
    pub element_size: usize,
}

/// Table-level statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub row_count: usize,
    pub column_count: usize,
    pub estimated_bytes: usize,
}

/// Interns strings into a dictionary, returning dense u32 ids.
///
/// Used by the row-major JSON ingestion path to build the per-column
/// dictionaries the direct ingestion path receives pre-built.
#[derive(Debug, Default)]
pub struct StringInterner {
    uniques: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its dictionary id.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = self.uniques.len() as u32;
        self.uniques.push(s.to_string());
        self.lookup.insert(s.to_string(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.uniques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uniques.is_empty()
    }

    /// Consume the interner, yielding the dictionary.
    pub fn into_uniques(self) -> Vec<String> {
        self.uniques
    }
}

/// Columnar data store: one typed array per column.
///
/// Lifecycle: `init(cols, rows)` allocates empty slots; columns are ingested
/// in any order; `finalize()` makes the store readable. Between frames the
/// store is immutable from the engine's point of view; re-ingesting requires
/// a fresh `init`. Every mutation bumps the generation counter, which the
/// view pipeline uses as a cache key and hosts use to invalidate any
/// retained column pointers.
#[derive(Debug, Default)]
pub struct ColumnStore {
    slots: Vec<Option<ColumnData>>,
    row_count: usize,
    generation: u64,
    initialized: bool,
    ready: bool,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Lifecycle ==========

    /// Reset the store and allocate `column_count` empty column slots.
    /// Discards all previously ingested data.
    pub fn init(&mut self, column_count: usize, row_count: usize) {
        self.slots = (0..column_count).map(|_| None).collect();
        self.row_count = row_count;
        self.generation += 1;
        self.initialized = true;
        self.ready = false;
        debug!(
            target: "column_store",
            columns = column_count,
            rows = row_count,
            generation = self.generation,
            "store initialized"
        );
    }

    /// Move a dense f64 column into slot `col`.
    pub fn ingest_f64(&mut self, col: usize, values: Vec<f64>) -> GridResult<()> {
        self.check_ingest(col, values.len())?;
        self.slots[col] = Some(ColumnData::Float64(values));
        self.generation += 1;
        Ok(())
    }

    /// Move a bool column into slot `col`. Same storage as f64
    /// (0.0/1.0/NaN), semantic type bool.
    pub fn ingest_bool(&mut self, col: usize, values: Vec<f64>) -> GridResult<()> {
        self.check_ingest(col, values.len())?;
        self.slots[col] = Some(ColumnData::Bool(values));
        self.generation += 1;
        Ok(())
    }

    /// Move a dictionary-encoded string column into slot `col`.
    ///
    /// Every id must be < `uniques.len()` or the reserved `NULL_ID`
    /// sentinel.
    pub fn ingest_str(&mut self, col: usize, uniques: Vec<String>, ids: Vec<u32>) -> GridResult<()> {
        self.check_ingest(col, ids.len())?;
        let unique_count = uniques.len() as u32;
        for (row, &id) in ids.iter().enumerate() {
            if id != NULL_ID && id >= unique_count {
                return Err(GridError::bad_input(format!(
                    "dictionary id {} at row {} exceeds unique count {}",
                    id, row, unique_count
                )));
            }
        }
        self.slots[col] = Some(ColumnData::Str { uniques, ids });
        self.generation += 1;
        Ok(())
    }

    /// Mark the store readable. Fails if any column slot was never ingested.
    pub fn finalize(&mut self) -> GridResult<()> {
        if !self.initialized {
            return Err(GridError::not_initialized("finalize before init"));
        }
        if let Some(missing) = self.slots.iter().position(Option::is_none) {
            return Err(GridError::not_initialized(format!(
                "column {} was never ingested",
                missing
            )));
        }
        self.ready = true;
        self.generation += 1;
        debug!(
            target: "column_store",
            generation = self.generation,
            "store finalized"
        );
        Ok(())
    }

    /// Row-major JSON ingestion: detects each column's type from its first
    /// non-null value (numbers become f64, bools become bool, anything else
    /// becomes a dictionary string column), then ingests and finalizes in
    /// one pass. The direct `ingest_*` setters remain the fast path.
    pub fn ingest_rows(&mut self, column_count: usize, rows: &[Vec<JsonValue>]) -> GridResult<()> {
        let row_count = rows.len();
        self.init(column_count, row_count);

        for col in 0..column_count {
            match detect_kind(rows, col) {
                ColumnKind::Float64 => {
                    let values = rows
                        .iter()
                        .map(|r| r.get(col).and_then(JsonValue::as_f64).unwrap_or(f64::NAN))
                        .collect();
                    self.ingest_f64(col, values)?;
                }
                ColumnKind::Bool => {
                    let values = rows
                        .iter()
                        .map(|r| match r.get(col).and_then(JsonValue::as_bool) {
                            Some(true) => 1.0,
                            Some(false) => 0.0,
                            None => f64::NAN,
                        })
                        .collect();
                    self.ingest_bool(col, values)?;
                }
                ColumnKind::Str => {
                    let mut interner = StringInterner::new();
                    let mut ids = Vec::with_capacity(row_count);
                    for row in rows {
                        let id = match row.get(col) {
                            None | Some(JsonValue::Null) => NULL_ID,
                            Some(JsonValue::String(s)) => interner.intern(s),
                            Some(other) => interner.intern(&other.to_string()),
                        };
                        ids.push(id);
                    }
                    self.ingest_str(col, interner.into_uniques(), ids)?;
                }
            }
        }
        self.finalize()
    }

    // ========== Readback ==========

    pub fn column_count(&self) -> usize {
        self.slots.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Changes iff any ingestion or `init` occurred since last read.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Kind of column `col`, without requiring the store to be finalized.
    pub fn column_kind(&self, col: usize) -> Option<ColumnKind> {
        self.slots.get(col)?.as_ref().map(ColumnData::kind)
    }

    /// Zero-copy description of column `col` for host reads.
    pub fn column_info(&self, col: usize) -> GridResult<ColumnInfo> {
        let data = self.column(col)?;
        let info = match data {
            ColumnData::Float64(v) | ColumnData::Bool(v) => ColumnInfo {
                kind: data.kind(),
                ptr: v.as_ptr().cast(),
                len: v.len(),
                element_size: std::mem::size_of::<f64>(),
            },
            ColumnData::Str { ids, .. } => ColumnInfo {
                kind: ColumnKind::Str,
                ptr: ids.as_ptr().cast(),
                len: ids.len(),
                element_size: std::mem::size_of::<u32>(),
            },
        };
        Ok(info)
    }

    /// Dictionary of a string column (unique strings in id order).
    pub fn dictionary(&self, col: usize) -> GridResult<&[String]> {
        match self.column(col)? {
            ColumnData::Str { uniques, .. } => Ok(uniques),
            other => Err(GridError::bad_input(format!(
                "column {} is {:?}, not a string column",
                col,
                other.kind()
            ))),
        }
    }

    /// Numeric value at `(col, row)`. NaN encodes null. Fails on string
    /// columns.
    pub fn get_numeric(&self, col: usize, row: usize) -> GridResult<f64> {
        match self.column(col)? {
            ColumnData::Float64(v) | ColumnData::Bool(v) => v
                .get(row)
                .copied()
                .ok_or_else(|| row_out_of_range(row, self.row_count)),
            ColumnData::Str { .. } => Err(GridError::bad_input(format!(
                "column {} is a string column, not numeric",
                col
            ))),
        }
    }

    /// String value at `(col, row)`; `None` for the null sentinel. Fails on
    /// numeric columns.
    pub fn get_string(&self, col: usize, row: usize) -> GridResult<Option<&str>> {
        match self.column(col)? {
            ColumnData::Str { uniques, ids } => {
                let id = *ids
                    .get(row)
                    .ok_or_else(|| row_out_of_range(row, self.row_count))?;
                if id == NULL_ID {
                    Ok(None)
                } else {
                    Ok(Some(uniques[id as usize].as_str()))
                }
            }
            other => Err(GridError::bad_input(format!(
                "column {} is {:?}, not a string column",
                col,
                other.kind()
            ))),
        }
    }

    /// Typed value at `(col, row)`, used by the table façade and export.
    pub fn value_at(&self, col: usize, row: usize) -> GridResult<CellValue> {
        let value = match self.column(col)? {
            ColumnData::Float64(v) => {
                let n = *v
                    .get(row)
                    .ok_or_else(|| row_out_of_range(row, self.row_count))?;
                if n.is_nan() {
                    CellValue::Null
                } else {
                    CellValue::Number(n)
                }
            }
            ColumnData::Bool(v) => {
                let n = *v
                    .get(row)
                    .ok_or_else(|| row_out_of_range(row, self.row_count))?;
                if n.is_nan() {
                    CellValue::Null
                } else {
                    CellValue::Bool(n != 0.0)
                }
            }
            ColumnData::Str { uniques, ids } => {
                let id = *ids
                    .get(row)
                    .ok_or_else(|| row_out_of_range(row, self.row_count))?;
                if id == NULL_ID {
                    CellValue::Null
                } else {
                    CellValue::Text(uniques[id as usize].clone())
                }
            }
        };
        Ok(value)
    }

    /// Display text at `(col, row)`. Nulls render as the empty string.
    pub fn cell_text(&self, col: usize, row: usize) -> GridResult<String> {
        Ok(self.value_at(col, row)?.to_text())
    }

    /// Indices of all string columns, in declaration order. The default
    /// target set for the global filter.
    pub fn string_columns(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Some(ColumnData::Str { .. }) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            row_count: self.row_count,
            column_count: self.slots.len(),
            estimated_bytes: self.estimate_memory_size(),
        }
    }

    fn estimate_memory_size(&self) -> usize {
        let mut size = std::mem::size_of::<Self>();
        for slot in self.slots.iter().flatten() {
            size += match slot {
                ColumnData::Float64(v) | ColumnData::Bool(v) => {
                    v.capacity() * std::mem::size_of::<f64>()
                }
                ColumnData::Str { uniques, ids } => {
                    ids.capacity() * std::mem::size_of::<u32>()
                        + uniques.iter().map(|s| s.capacity()).sum::<usize>()
                }
            };
        }
        size
    }

    // ========== Internal ==========

    pub(crate) fn column(&self, col: usize) -> GridResult<&ColumnData> {
        if !self.ready {
            return Err(GridError::not_initialized(
                "store is not finalized; call init/ingest/finalize first",
            ));
        }
        let slot = self.slots.get(col).ok_or_else(|| {
            GridError::out_of_range(format!(
                "column {} out of bounds ({} columns)",
                col,
                self.slots.len()
            ))
        })?;
        // finalize() guarantees every slot is populated
        slot.as_ref().ok_or_else(|| {
            GridError::not_initialized(format!("column {} was never ingested", col))
        })
    }

    fn check_ingest(&self, col: usize, len: usize) -> GridResult<()> {
        if !self.initialized {
            return Err(GridError::not_initialized("ingest before init"));
        }
        if col >= self.slots.len() {
            return Err(GridError::out_of_range(format!(
                "column {} out of bounds ({} columns)",
                col,
                self.slots.len()
            )));
        }
        if len != self.row_count {
            return Err(GridError::bad_input(format!(
                "column {} has {} values but store has {} rows",
                col, len, self.row_count
            )));
        }
        Ok(())
    }
}

fn row_out_of_range(row: usize, row_count: usize) -> GridError {
    GridError::out_of_range(format!("row {} out of bounds ({} rows)", row, row_count))
}

/// Detect a column's kind from its first non-null value.
fn detect_kind(rows: &[Vec<JsonValue>], col: usize) -> ColumnKind {
    for row in rows {
        match row.get(col) {
            None | Some(JsonValue::Null) => continue,
            Some(JsonValue::Number(_)) => return ColumnKind::Float64,
            Some(JsonValue::Bool(_)) => return ColumnKind::Bool,
            Some(_) => return ColumnKind::Str,
        }
    }
    ColumnKind::Str // all-null columns default to strings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_store() -> ColumnStore {
        let mut store = ColumnStore::new();
        store.init(3, 4);
        store
            .ingest_str(
                0,
                vec!["Alice".into(), "Bob".into(), "Charlie".into()],
                vec![0, 1, 2, NULL_ID],
            )
            .unwrap();
        store
            .ingest_f64(1, vec![30.0, 25.0, 35.0, f64::NAN])
            .unwrap();
        store.ingest_bool(2, vec![1.0, 0.0, 1.0, f64::NAN]).unwrap();
        store.finalize().unwrap();
        store
    }

    #[test]
    fn test_lifecycle_and_readback() {
        let store = sample_store();
        assert!(store.is_ready());
        assert_eq!(store.row_count(), 4);
        assert_eq!(store.column_count(), 3);

        assert_eq!(store.get_string(0, 1).unwrap(), Some("Bob"));
        assert_eq!(store.get_string(0, 3).unwrap(), None);
        assert_eq!(store.get_numeric(1, 0).unwrap(), 30.0);
        assert!(store.get_numeric(1, 3).unwrap().is_nan());
        assert_eq!(store.value_at(2, 0).unwrap(), CellValue::Bool(true));
        assert_eq!(store.value_at(2, 3).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_operations_before_init_fail() {
        let mut store = ColumnStore::new();
        assert!(matches!(
            store.ingest_f64(0, vec![]),
            Err(GridError::NotInitialized(_))
        ));
        assert!(matches!(
            store.finalize(),
            Err(GridError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_finalize_requires_all_columns() {
        let mut store = ColumnStore::new();
        store.init(2, 1);
        store.ingest_f64(0, vec![1.0]).unwrap();
        assert!(matches!(
            store.finalize(),
            Err(GridError::NotInitialized(_))
        ));
        store.ingest_f64(1, vec![2.0]).unwrap();
        store.finalize().unwrap();
    }

    #[test]
    fn test_wrong_length_is_bad_input() {
        let mut store = ColumnStore::new();
        store.init(1, 3);
        assert!(matches!(
            store.ingest_f64(0, vec![1.0, 2.0]),
            Err(GridError::BadInput(_))
        ));
    }

    #[test]
    fn test_out_of_range_column() {
        let mut store = ColumnStore::new();
        store.init(1, 1);
        assert!(matches!(
            store.ingest_f64(5, vec![1.0]),
            Err(GridError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_dictionary_id_validation() {
        let mut store = ColumnStore::new();
        store.init(1, 2);
        // id 7 exceeds the dictionary; NULL_ID is allowed
        assert!(matches!(
            store.ingest_str(0, vec!["a".into()], vec![0, 7]),
            Err(GridError::BadInput(_))
        ));
        store
            .ingest_str(0, vec!["a".into()], vec![0, NULL_ID])
            .unwrap();
    }

    #[test]
    fn test_generation_increments() {
        let mut store = ColumnStore::new();
        let g0 = store.generation();
        store.init(1, 1);
        let g1 = store.generation();
        assert!(g1 > g0);
        store.ingest_f64(0, vec![1.0]).unwrap();
        let g2 = store.generation();
        assert!(g2 > g1);
        store.finalize().unwrap();
        assert!(store.generation() > g2);
    }

    #[test]
    fn test_init_discards_state() {
        let mut store = sample_store();
        store.init(1, 2);
        assert!(!store.is_ready());
        assert_eq!(store.row_count(), 2);
        assert!(matches!(
            store.get_numeric(0, 0),
            Err(GridError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_column_info_zero_copy() {
        let store = sample_store();
        let info = store.column_info(1).unwrap();
        assert_eq!(info.kind, ColumnKind::Float64);
        assert_eq!(info.len, 4);
        assert_eq!(info.element_size, 8);
        assert!(!info.ptr.is_null());

        let info = store.column_info(0).unwrap();
        assert_eq!(info.kind, ColumnKind::Str);
        assert_eq!(info.element_size, 4);
    }

    #[test]
    fn test_ingest_rows_detects_types() {
        let mut store = ColumnStore::new();
        let rows = vec![
            vec![json!("Alice"), json!(30), json!(true)],
            vec![json!("Bob"), json!(25), json!(null)],
            vec![json!(null), json!(null), json!(false)],
        ];
        store.ingest_rows(3, &rows).unwrap();

        assert_eq!(store.column_kind(0), Some(ColumnKind::Str));
        assert_eq!(store.column_kind(1), Some(ColumnKind::Float64));
        assert_eq!(store.column_kind(2), Some(ColumnKind::Bool));
        assert_eq!(store.get_string(0, 2).unwrap(), None);
        assert!(store.get_numeric(1, 2).unwrap().is_nan());
        assert_eq!(store.get_numeric(2, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_interner_dedupes() {
        let mut interner = StringInterner::new();
        let a = interner.intern("x");
        let b = interner.intern("y");
        let c = interner.intern("x");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.into_uniques(), vec!["x", "y"]);
    }

    #[test]
    fn test_string_columns_listing() {
        let store = sample_store();
        assert_eq!(store.string_columns(), vec![0]);
    }

    #[test]
    fn test_stats() {
        let store = sample_store();
        let stats = store.stats();
        assert_eq!(stats.row_count, 4);
        assert_eq!(stats.column_count, 3);
        assert!(stats.estimated_bytes > 0);
    }
}
