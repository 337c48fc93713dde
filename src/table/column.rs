use serde::{Deserialize, Serialize};

use crate::layout::buffer::Align;
use crate::layout::engine::{LayoutColumn, PinningInfo};
use crate::table::state::{PinSide, TableState};

/// Declared column definition. A non-empty `columns` list makes this a
/// group; only leaves carry data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnDef {
    pub id: String,
    pub header: String,
    /// Field read from the row object; defaults to `id` for leaves.
    pub accessor_key: Option<String>,
    pub columns: Vec<ColumnDef>,
    pub size: f64,
    pub min_size: f64,
    pub max_size: f64,
    /// Flex factor for distributing leftover viewport width.
    pub flex: Option<f64>,
    /// Declaration-time pin side, seeded into the initial pinning state.
    pub pin: Option<PinSide>,
    pub enable_sorting: bool,
    pub align: Align,
    pub padding: [f32; 4],
    pub border: [f32; 4],
}

impl Default for ColumnDef {
    fn default() -> Self {
        Self {
            id: String::new(),
            header: String::new(),
            accessor_key: None,
            columns: Vec::new(),
            size: 150.0,
            min_size: 40.0,
            max_size: 1000.0,
            flex: None,
            pin: None,
            enable_sorting: true,
            align: Align::Left,
            padding: [0.0; 4],
            border: [0.0; 4],
        }
    }
}

impl ColumnDef {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            header: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn group(id: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        let mut def = Self::new(id);
        def.columns = columns;
        def
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_pin(mut self, side: PinSide) -> Self {
        self.pin = Some(side);
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn sortable(mut self, enable: bool) -> Self {
        self.enable_sorting = enable;
        self
    }

    pub fn is_group(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Field name used to read this leaf's value from a row object.
    pub fn accessor(&self) -> &str {
        self.accessor_key.as_deref().unwrap_or(&self.id)
    }
}

/// One node of the flattened definition tree.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    pub def: ColumnDef,
    pub depth: usize,
    pub parent: Option<usize>,
    pub is_leaf: bool,
}

/// Pre-order flattening of the declared definitions.
#[derive(Debug, Clone, Default)]
pub struct ColumnTree {
    pub all: Vec<ResolvedColumn>,
    /// Indices into `all`, leaves only, declaration order.
    pub leaves: Vec<usize>,
}

impl ColumnTree {
    pub fn build(defs: &[ColumnDef]) -> Self {
        let mut tree = ColumnTree::default();
        for def in defs {
            tree.push(def, 0, None);
        }
        tree
    }

    fn push(&mut self, def: &ColumnDef, depth: usize, parent: Option<usize>) {
        let index = self.all.len();
        let is_leaf = !def.is_group();
        self.all.push(ResolvedColumn {
            def: def.clone(),
            depth,
            parent,
            is_leaf,
        });
        if is_leaf {
            self.leaves.push(index);
        } else {
            for child in &def.columns {
                self.push(child, depth + 1, Some(index));
            }
        }
    }

    pub fn find(&self, id: &str) -> Option<usize> {
        self.all.iter().position(|c| c.def.id == id)
    }

    /// Ancestor of `index` at exactly `depth`, walking parent links.
    pub fn ancestor_at(&self, index: usize, depth: usize) -> Option<usize> {
        let mut current = index;
        loop {
            let node = &self.all[current];
            if node.depth == depth {
                return Some(current);
            }
            current = node.parent?;
        }
    }

    /// Depth of the deepest leaf among `leaf_indices`.
    pub fn max_depth(&self, leaf_indices: &[usize]) -> usize {
        leaf_indices
            .iter()
            .map(|&i| self.all[i].depth)
            .max()
            .unwrap_or(0)
    }
}

/// One entry of the final ordered visible column list.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleColumn {
    /// Index into `ColumnTree::all`.
    pub tree_index: usize,
    pub id: String,
    /// Final width: sizing override over declared size, clamped.
    pub width: f64,
    pub pin: Option<PinSide>,
}

/// Resolve the visible leaf columns: visibility filter, explicit order,
/// then pin clusters (left, unpinned, right) with declaration order as the
/// final tiebreak. Deterministic given `(defs, columnOrder, columnPinning,
/// columnVisibility, columnSizing)`.
pub fn resolve_visible_leaves(tree: &ColumnTree, state: &TableState) -> Vec<VisibleColumn> {
    let order_of = |id: &str| {
        state
            .column_order
            .iter()
            .position(|o| o == id)
            .unwrap_or(state.column_order.len())
    };

    // visibility, then explicit order with declaration order as tiebreak
    let mut visible: Vec<(usize, usize, usize)> = tree
        .leaves
        .iter()
        .enumerate()
        .filter(|&(_, &leaf)| {
            let id = &tree.all[leaf].def.id;
            state.column_visibility.get(id).copied().unwrap_or(true)
        })
        .map(|(decl_pos, &leaf)| (leaf, order_of(&tree.all[leaf].def.id), decl_pos))
        .collect();
    visible.sort_by_key(|&(_, order, decl)| (order, decl));

    // pin clusters; pinned columns follow the pinning-list order
    let pin_rank = |id: &str, pins: &[String]| pins.iter().position(|p| p == id);
    let mut left = Vec::new();
    let mut center = Vec::new();
    let mut right = Vec::new();
    for (leaf, ..) in visible {
        let id = &tree.all[leaf].def.id;
        if let Some(rank) = pin_rank(id, &state.column_pinning.left) {
            left.push((rank, leaf));
        } else if let Some(rank) = pin_rank(id, &state.column_pinning.right) {
            right.push((rank, leaf));
        } else {
            center.push(leaf);
        }
    }
    left.sort_by_key(|&(rank, _)| rank);
    right.sort_by_key(|&(rank, _)| rank);

    let materialize = |leaf: usize, pin: Option<PinSide>| {
        let def = &tree.all[leaf].def;
        let width = state
            .column_sizing
            .get(&def.id)
            .copied()
            .unwrap_or(def.size)
            .clamp(def.min_size, def.max_size);
        VisibleColumn {
            tree_index: leaf,
            id: def.id.clone(),
            width,
            pin,
        }
    };

    let mut out = Vec::with_capacity(left.len() + center.len() + right.len());
    out.extend(left.into_iter().map(|(_, l)| materialize(l, Some(PinSide::Left))));
    out.extend(center.into_iter().map(|l| materialize(l, None)));
    out.extend(right.into_iter().map(|(_, l)| materialize(l, Some(PinSide::Right))));
    out
}

/// Pinned-cluster counts for the layout engine.
pub fn pinning_info(visible: &[VisibleColumn]) -> PinningInfo {
    PinningInfo {
        left_count: visible
            .iter()
            .filter(|c| c.pin == Some(PinSide::Left))
            .count(),
        right_count: visible
            .iter()
            .filter(|c| c.pin == Some(PinSide::Right))
            .count(),
    }
}

/// Distribute leftover viewport width across flex columns, proportionally
/// to their flex factors, respecting max widths.
pub fn apply_flex(tree: &ColumnTree, visible: &mut [VisibleColumn], available_width: f64) {
    let total: f64 = visible.iter().map(|c| c.width).sum();
    let leftover = available_width - total;
    if leftover <= 0.0 {
        return;
    }
    let flex_total: f64 = visible
        .iter()
        .filter_map(|c| tree.all[c.tree_index].def.flex)
        .sum();
    if flex_total <= 0.0 {
        return;
    }
    for col in visible.iter_mut() {
        let def = &tree.all[col.tree_index].def;
        if let Some(flex) = def.flex {
            let grown = col.width + leftover * (flex / flex_total);
            col.width = grown.min(def.max_size);
        }
    }
}

/// Convert the resolved list into the layout engine's input shape.
pub fn to_layout_columns(tree: &ColumnTree, visible: &[VisibleColumn]) -> Vec<LayoutColumn> {
    visible
        .iter()
        .map(|c| {
            let def = &tree.all[c.tree_index].def;
            LayoutColumn {
                width: c.width,
                min_width: def.min_size,
                max_width: def.max_size,
                align: def.align,
                padding: def.padding,
                border: def.border,
            }
        })
        .collect()
}
