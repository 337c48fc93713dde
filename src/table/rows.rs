use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::table::state::{ExpandedState, RowPinningState};

/// One row of table data, flattened out of the (possibly nested) input.
///
/// Ids are the DFS pre-order position in the full tree, as strings; they
/// are stable for a given dataset and survive filtering and sorting, which
/// only reorder references to nodes.
#[derive(Debug, Clone)]
pub struct RowNode {
    pub id: String,
    /// Position among this row's siblings.
    pub index: usize,
    /// DFS pre-order position in the full tree.
    pub original_index: usize,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub data: Arc<JsonValue>,
}

impl RowNode {
    /// Read a field off the row object. Missing fields read as null.
    pub fn field(&self, key: &str) -> JsonValue {
        self.data.get(key).cloned().unwrap_or(JsonValue::Null)
    }

    pub fn parent_id(&self, arena: &RowArena) -> Option<String> {
        self.parent.map(|p| arena.nodes[p].id.clone())
    }

    pub fn can_expand(&self) -> bool {
        !self.children.is_empty()
    }
}

/// All rows, flattened DFS pre-order, with the top-level rows listed
/// separately.
#[derive(Debug, Clone, Default)]
pub struct RowArena {
    pub nodes: Vec<RowNode>,
    pub roots: Vec<usize>,
}

impl RowArena {
    /// Flatten the input rows. When `sub_rows_key` is set, that field of
    /// each row object holds its child rows.
    pub fn build(data: &[JsonValue], sub_rows_key: Option<&str>) -> Self {
        let mut arena = RowArena::default();
        for (index, value) in data.iter().enumerate() {
            let node = arena.push(value, index, 0, None, sub_rows_key);
            arena.roots.push(node);
        }
        arena
    }

    fn push(
        &mut self,
        value: &JsonValue,
        index: usize,
        depth: usize,
        parent: Option<usize>,
        sub_rows_key: Option<&str>,
    ) -> usize {
        let node_index = self.nodes.len();
        self.nodes.push(RowNode {
            id: node_index.to_string(),
            index,
            original_index: node_index,
            depth,
            parent,
            children: Vec::new(),
            data: Arc::new(value.clone()),
        });

        if let Some(key) = sub_rows_key {
            if let Some(JsonValue::Array(subs)) = value.get(key) {
                for (child_index, child) in subs.iter().enumerate() {
                    let child_node =
                        self.push(child, child_index, depth + 1, Some(node_index), sub_rows_key);
                    self.nodes[node_index].children.push(child_node);
                }
            }
        }
        node_index
    }

    pub fn find(&self, id: &str) -> Option<usize> {
        id.parse::<usize>().ok().filter(|&i| i < self.nodes.len())
    }

    /// All descendant leaves of a row, DFS order.
    pub fn leaf_rows(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(index, &mut out);
        out
    }

    fn collect_leaves(&self, index: usize, out: &mut Vec<usize>) {
        let node = &self.nodes[index];
        if node.children.is_empty() {
            out.push(index);
            return;
        }
        for &child in &node.children {
            self.collect_leaves(child, out);
        }
    }
}

/// An ordered list of arena indices: the display row order of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowModel {
    pub rows: Vec<usize>,
}

/// Top-level rows in original order.
pub fn build_core_model(arena: &RowArena) -> RowModel {
    RowModel {
        rows: arena.roots.clone(),
    }
}

/// Top-level rows reordered through a view-indices array. Indices outside
/// the root range are skipped rather than failing the frame.
pub fn build_view_model(arena: &RowArena, view_indices: &[u32]) -> RowModel {
    RowModel {
        rows: view_indices
            .iter()
            .filter_map(|&i| arena.roots.get(i as usize).copied())
            .collect(),
    }
}

/// Flatten the visible subtree of every base row in DFS order: a row's
/// children follow it when the row is expanded.
pub fn build_expanded_model(
    arena: &RowArena,
    base: &RowModel,
    expanded: &ExpandedState,
) -> RowModel {
    let mut rows = Vec::with_capacity(base.rows.len());
    for &root in &base.rows {
        flatten_expanded(arena, root, expanded, &mut rows);
    }
    RowModel { rows }
}

fn flatten_expanded(
    arena: &RowArena,
    index: usize,
    expanded: &ExpandedState,
    out: &mut Vec<usize>,
) {
    out.push(index);
    let node = &arena.nodes[index];
    if node.can_expand() && expanded.is_expanded(&node.id) {
        for &child in &node.children {
            flatten_expanded(arena, child, expanded, out);
        }
    }
}

/// Partition a model into pinned-top, center, and pinned-bottom rows.
/// Pinned rows keep the order of the pinning lists; rows named there but
/// absent from the model are ignored.
pub fn partition_pinned(
    arena: &RowArena,
    model: &RowModel,
    pinning: &RowPinningState,
) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let in_model = |id: &str| {
        arena
            .find(id)
            .filter(|idx| model.rows.contains(idx))
    };
    let top: Vec<usize> = pinning.top.iter().filter_map(|id| in_model(id)).collect();
    let bottom: Vec<usize> = pinning.bottom.iter().filter_map(|id| in_model(id)).collect();
    let center = model
        .rows
        .iter()
        .copied()
        .filter(|idx| !top.contains(idx) && !bottom.contains(idx))
        .collect();
    (top, center, bottom)
}
