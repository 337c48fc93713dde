use serde_json::Value as JsonValue;

use crate::data::column_store::{CellValue, ColumnInfo, ColumnStore, StoreStats};
use crate::data::export;
use crate::data::filter::{self, FilterSpec};
use crate::data::sort::SortSpec;
use crate::data::view::{ViewHandle, ViewPipeline};
use crate::error::GridResult;
use crate::layout::engine::{LayoutColumn, LayoutEngine, LayoutInfo, PinningInfo, ViewportSpec};

/// The engine façade: columnar store → view pipeline → layout engine.
///
/// One instance per table. All operations are synchronous and run on the
/// caller's thread; the per-frame sequence is
/// `(ingest?, set_sort, set_filter, compute_view, compute_layout)` and is
/// observed in call order.
#[derive(Debug, Default)]
pub struct GridEngine {
    store: ColumnStore,
    view: ViewPipeline,
    layout: LayoutEngine,
}

impl GridEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Store ==========

    /// Reset the store for a fresh ingestion cycle.
    pub fn init(&mut self, column_count: usize, row_count: usize) {
        self.store.init(column_count, row_count);
    }

    pub fn ingest_f64(&mut self, col: usize, values: Vec<f64>) -> GridResult<()> {
        self.store.ingest_f64(col, values)
    }

    pub fn ingest_bool(&mut self, col: usize, values: Vec<f64>) -> GridResult<()> {
        self.store.ingest_bool(col, values)
    }

    pub fn ingest_str(
        &mut self,
        col: usize,
        uniques: Vec<String>,
        ids: Vec<u32>,
    ) -> GridResult<()> {
        self.store.ingest_str(col, uniques, ids)
    }

    /// Row-major JSON ingestion with per-column type detection.
    pub fn ingest_rows(&mut self, column_count: usize, rows: &[Vec<JsonValue>]) -> GridResult<()> {
        self.store.ingest_rows(column_count, rows)
    }

    pub fn finalize(&mut self) -> GridResult<()> {
        self.store.finalize()
    }

    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    pub fn column_info(&self, col: usize) -> GridResult<ColumnInfo> {
        self.store.column_info(col)
    }

    pub fn value_at(&self, col: usize, row: usize) -> GridResult<CellValue> {
        self.store.value_at(col, row)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn store(&self) -> &ColumnStore {
        &self.store
    }

    // ========== View ==========

    pub fn set_sort(&mut self, spec: SortSpec) {
        self.view.set_sort(spec);
    }

    pub fn set_filter(&mut self, spec: FilterSpec) {
        self.view.set_filter(spec);
    }

    /// Filter + sort into the view-indices buffer, cached per
    /// `(generation, sort, filter)`.
    pub fn compute_view(&mut self) -> GridResult<ViewHandle<'_>> {
        self.view.compute_view(&self.store)
    }

    /// The last successfully computed view indices.
    pub fn view_indices(&self) -> &[u32] {
        self.view.view_indices()
    }

    // ========== Layout ==========

    /// Recompute the view if stale, then lay out one frame over it.
    pub fn compute_layout(
        &mut self,
        columns: &[LayoutColumn],
        pinning: PinningInfo,
        viewport: &ViewportSpec,
    ) -> GridResult<(&LayoutInfo, &[f32])> {
        self.view.compute_view(&self.store)?;
        self.layout
            .compute_layout(columns, pinning, self.view.view_indices(), viewport)
    }

    /// The layout metadata from the last successful frame.
    pub fn last_layout(&self) -> Option<&LayoutInfo> {
        self.layout.last_info()
    }

    // ========== Search & export ==========

    /// Regex scan over the current view; returns `(view position, display
    /// column position)` pairs.
    pub fn search(&mut self, display_columns: &[u32], pattern: &str) -> GridResult<Vec<(u32, u32)>> {
        self.view.compute_view(&self.store)?;
        filter::search_view(&self.store, self.view.view_indices(), display_columns, pattern)
    }

    /// Export the current view as CSV, display columns in order.
    pub fn export_csv(
        &mut self,
        display_columns: &[u32],
        column_names: &[String],
    ) -> GridResult<String> {
        self.view.compute_view(&self.store)?;
        export::view_to_csv(
            &self.store,
            self.view.view_indices(),
            display_columns,
            column_names,
        )
    }

    /// Export the current view as a JSON array of objects.
    pub fn export_json(
        &mut self,
        display_columns: &[u32],
        column_names: &[String],
    ) -> GridResult<JsonValue> {
        self.view.compute_view(&self.store)?;
        export::view_to_json(
            &self.store,
            self.view.view_indices(),
            display_columns,
            column_names,
        )
    }
}
