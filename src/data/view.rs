use tracing::debug;

use crate::data::column_store::ColumnStore;
use crate::data::filter::{filter_view, FilterSpec};
use crate::data::sort::{sort_view, SortSpec};
use crate::error::{GridError, GridResult};

/// Borrowed handle over the current view-indices buffer, with the raw parts
/// hosts use for zero-copy reads. Valid until the next rebuilding
/// `compute_view` call.
#[derive(Debug, Clone, Copy)]
pub struct ViewHandle<'a> {
    pub indices: &'a [u32],
    pub ptr: *const u32,
    pub len: usize,
    pub generation: u64,
}

/// Composes filter → sort into the view-indices array and caches the
/// result keyed by `(store generation, sort fingerprint, filter
/// fingerprint)`.
///
/// `compute_view` is therefore a pure function of that triple and safe to
/// call once per frame; only a data mutation or a spec change pays for a
/// rebuild. A failed rebuild leaves the previously published buffer intact.
#[derive(Debug, Default)]
pub struct ViewPipeline {
    sort: SortSpec,
    filter: FilterSpec,
    cache: Vec<u32>,
    cache_key: Option<(u64, u64, u64)>,
}

impl ViewPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sort spec. Setting an identical spec leaves the cached
    /// view valid.
    pub fn set_sort(&mut self, spec: SortSpec) {
        self.sort = spec;
    }

    /// Replace the filter spec. Setting an identical spec leaves the cached
    /// view valid.
    pub fn set_filter(&mut self, spec: FilterSpec) {
        self.filter = spec;
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    /// The last successfully computed view indices.
    pub fn view_indices(&self) -> &[u32] {
        &self.cache
    }

    /// Recompute the view if the `(generation, sort, filter)` triple moved,
    /// otherwise return the cache untouched.
    pub fn compute_view(&mut self, store: &ColumnStore) -> GridResult<ViewHandle<'_>> {
        if !store.is_ready() {
            return Err(GridError::not_initialized(
                "store is not finalized; call init/ingest/finalize first",
            ));
        }
        let key = (
            store.generation(),
            self.sort.fingerprint(),
            self.filter.fingerprint(),
        );
        if self.cache_key != Some(key) {
            let candidates = filter_view(store, &self.filter)?;
            let sorted = sort_view(store, candidates, &self.sort)?;
            debug!(
                target: "view_pipeline",
                rows = sorted.len(),
                total = store.row_count(),
                generation = key.0,
                "view rebuilt"
            );
            self.cache = sorted;
            self.cache_key = Some(key);
        }
        Ok(ViewHandle {
            indices: &self.cache,
            ptr: self.cache.as_ptr(),
            len: self.cache.len(),
            generation: store.generation(),
        })
    }
}
