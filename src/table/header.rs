use crate::table::column::{ColumnTree, VisibleColumn};

/// One header cell in the materialized header grid.
///
/// Placeholders stand in for a leaf that sits deeper in the grid; they
/// carry the leaf's column id so interactions attached to a placeholder
/// (sort toggles, resize) still target the correct column.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub id: String,
    /// Column this header shows: a group id, or the leaf id for leaf and
    /// placeholder headers.
    pub column_id: String,
    pub tree_index: usize,
    pub label: String,
    pub depth: usize,
    pub col_span: usize,
    pub row_span: usize,
    pub is_placeholder: bool,
}

/// One header row. Rows are ordered shallowest first; there are always
/// `max_depth + 1` of them.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderGroup {
    pub depth: usize,
    pub headers: Vec<Header>,
}

/// Build the header grid from the ordered visible leaves.
///
/// Leaves occupy the bottom row. Walking upward, each header either
/// coalesces into its ancestor group at that depth (summing col spans) or
/// becomes a placeholder spanning down through the remaining rows
/// (`row_span = max_depth − depth + 1`). Groups always span one row.
pub fn build_header_groups(tree: &ColumnTree, visible: &[VisibleColumn]) -> Vec<HeaderGroup> {
    let leaf_indices: Vec<usize> = visible.iter().map(|c| c.tree_index).collect();
    let max_depth = tree.max_depth(&leaf_indices);

    // bottom row: the leaves themselves
    let mut levels: Vec<Vec<Header>> = Vec::with_capacity(max_depth + 1);
    let bottom: Vec<Header> = visible
        .iter()
        .map(|col| {
            let def = &tree.all[col.tree_index].def;
            Header {
                id: format!("{}_{}", max_depth, def.id),
                column_id: def.id.clone(),
                tree_index: col.tree_index,
                label: def.header.clone(),
                depth: max_depth,
                col_span: 1,
                row_span: 1,
                is_placeholder: false,
            }
        })
        .collect();
    levels.push(bottom);

    for depth in (0..max_depth).rev() {
        // levels is built bottom-up; the last entry is the row below
        let below = levels.last().cloned().unwrap_or_default();
        let mut row: Vec<Header> = Vec::with_capacity(below.len());
        for header in &below {
            // placeholders keep carrying the original leaf upward
            let column = header.tree_index;
            let natural_depth = tree.all[column].depth;

            // a strict ancestor group exists at this depth iff the column
            // itself sits deeper
            let ancestor = if natural_depth > depth {
                tree.ancestor_at(column, depth)
            } else {
                None
            };
            if let Some(ancestor) = ancestor {
                if let Some(last) = row
                    .last_mut()
                    .filter(|h| !h.is_placeholder && h.tree_index == ancestor)
                {
                    last.col_span += header.col_span;
                    continue;
                }
                let def = &tree.all[ancestor].def;
                row.push(Header {
                    id: format!("{}_{}", depth, def.id),
                    column_id: def.id.clone(),
                    tree_index: ancestor,
                    label: def.header.clone(),
                    depth,
                    col_span: header.col_span,
                    row_span: 1,
                    is_placeholder: false,
                });
            } else {
                let leaf_def = &tree.all[column].def;
                row.push(Header {
                    id: format!("{}_{}_ph", depth, leaf_def.id),
                    column_id: leaf_def.id.clone(),
                    tree_index: column,
                    label: String::new(),
                    depth,
                    col_span: 1,
                    row_span: max_depth - depth + 1,
                    is_placeholder: true,
                });
            }
        }
        levels.push(row);
    }

    levels
        .into_iter()
        .rev()
        .enumerate()
        .map(|(depth, headers)| HeaderGroup { depth, headers })
        .collect()
}
