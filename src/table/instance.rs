use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use crate::data::export;
use crate::error::{GridError, GridResult};
use crate::layout::engine::{LayoutColumn, PinningInfo};
use crate::table::column::{
    self, pinning_info, resolve_visible_leaves, ColumnDef, ColumnTree, VisibleColumn,
};
use crate::table::header::{build_header_groups, HeaderGroup};
use crate::table::rows::{
    build_core_model, build_expanded_model, build_view_model, partition_pinned, RowArena, RowModel,
    RowNode,
};
use crate::table::state::{
    ColumnFiltersState, ColumnOrderState, ColumnPinningState, ColumnSizingInfoState,
    ColumnSizingState, ColumnVisibilityState, ExpandedState, GlobalFilterState, OnChange, PinSide,
    RowPinningState, SortEntry, SortingState, StateCell, TableState, Update,
};

/// Read-only snapshot of one column's resolved facts.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHandle {
    pub id: String,
    pub header: String,
    pub depth: usize,
    pub is_group: bool,
    pub is_visible: bool,
    pub is_pinned: Option<PinSide>,
    /// `Some(desc)` when the column participates in the sort.
    pub is_sorted: Option<bool>,
    pub can_sort: bool,
    /// Resolved size: sizing override over declared size, clamped.
    pub size: f64,
}

/// Builder for a [`Table`]. Any state field may be supplied controlled
/// (host-owned value + change callback); the rest run uncontrolled off
/// `initial_state`.
#[derive(Default)]
pub struct TableBuilder {
    data: Vec<JsonValue>,
    defs: Vec<ColumnDef>,
    sub_rows_key: Option<String>,
    initial_state: TableState,
    controlled: Box<ControlledState>,
    view_indices: Option<Arc<Vec<u32>>>,
}

/// Host-supplied controlled values and callbacks, one slot per field.
#[derive(Default)]
struct ControlledState {
    sorting: Option<(SortingState, Option<OnChange<SortingState>>)>,
    column_filters: Option<(ColumnFiltersState, Option<OnChange<ColumnFiltersState>>)>,
    global_filter: Option<(GlobalFilterState, Option<OnChange<GlobalFilterState>>)>,
    column_visibility: Option<(ColumnVisibilityState, Option<OnChange<ColumnVisibilityState>>)>,
    column_order: Option<(ColumnOrderState, Option<OnChange<ColumnOrderState>>)>,
    column_sizing: Option<(ColumnSizingState, Option<OnChange<ColumnSizingState>>)>,
    column_sizing_info: Option<(
        ColumnSizingInfoState,
        Option<OnChange<ColumnSizingInfoState>>,
    )>,
    column_pinning: Option<(ColumnPinningState, Option<OnChange<ColumnPinningState>>)>,
    row_pinning: Option<(RowPinningState, Option<OnChange<RowPinningState>>)>,
    expanded: Option<(ExpandedState, Option<OnChange<ExpandedState>>)>,
}

macro_rules! builder_controlled {
    ($field:ident, $with:ident, $ty:ty) => {
        pub fn $with(mut self, value: $ty, on_change: Option<OnChange<$ty>>) -> Self {
            self.controlled.$field = Some((value, on_change));
            self
        }
    };
}

impl TableBuilder {
    pub fn with_sub_rows_key(mut self, key: impl Into<String>) -> Self {
        self.sub_rows_key = Some(key.into());
        self
    }

    pub fn with_initial_state(mut self, state: TableState) -> Self {
        self.initial_state = state;
        self
    }

    /// Route row ordering through an externally computed view-indices
    /// buffer (lazy indirection into the view pipeline's output).
    pub fn with_view_indices(mut self, indices: Arc<Vec<u32>>) -> Self {
        self.view_indices = Some(indices);
        self
    }

    builder_controlled!(sorting, with_sorting, SortingState);
    builder_controlled!(column_filters, with_column_filters, ColumnFiltersState);
    builder_controlled!(global_filter, with_global_filter, GlobalFilterState);
    builder_controlled!(column_visibility, with_column_visibility, ColumnVisibilityState);
    builder_controlled!(column_order, with_column_order, ColumnOrderState);
    builder_controlled!(column_sizing, with_column_sizing, ColumnSizingState);
    builder_controlled!(column_sizing_info, with_column_sizing_info, ColumnSizingInfoState);
    builder_controlled!(column_pinning, with_column_pinning, ColumnPinningState);
    builder_controlled!(row_pinning, with_row_pinning, RowPinningState);
    builder_controlled!(expanded, with_expanded, ExpandedState);

    pub fn build(self) -> Table {
        let tree = ColumnTree::build(&self.defs);
        let arena = RowArena::build(&self.data, self.sub_rows_key.as_deref());

        // declaration-time pins seed the initial pinning state
        let mut initial = self.initial_state;
        for &leaf in &tree.leaves {
            let def = &tree.all[leaf].def;
            match def.pin {
                Some(PinSide::Left) if !initial.column_pinning.left.contains(&def.id) => {
                    initial.column_pinning.left.push(def.id.clone());
                }
                Some(PinSide::Right) if !initial.column_pinning.right.contains(&def.id) => {
                    initial.column_pinning.right.push(def.id.clone());
                }
                _ => {}
            }
        }

        fn cell<T: Clone>(
            slot: Option<(T, Option<OnChange<T>>)>,
            initial: T,
        ) -> StateCell<T> {
            match slot {
                Some((value, on_change)) => {
                    let cell = StateCell::controlled(value, initial);
                    match on_change {
                        Some(cb) => cell.with_on_change(cb),
                        None => cell,
                    }
                }
                None => StateCell::uncontrolled(initial),
            }
        }

        let controlled = *self.controlled;
        Table {
            sorting: cell(controlled.sorting, initial.sorting.clone()),
            column_filters: cell(controlled.column_filters, initial.column_filters.clone()),
            global_filter: cell(controlled.global_filter, initial.global_filter.clone()),
            column_visibility: cell(
                controlled.column_visibility,
                initial.column_visibility.clone(),
            ),
            column_order: cell(controlled.column_order, initial.column_order.clone()),
            column_sizing: cell(controlled.column_sizing, initial.column_sizing.clone()),
            column_sizing_info: cell(
                controlled.column_sizing_info,
                initial.column_sizing_info.clone(),
            ),
            column_pinning: cell(controlled.column_pinning, initial.column_pinning.clone()),
            row_pinning: cell(controlled.row_pinning, initial.row_pinning.clone()),
            expanded: cell(controlled.expanded, initial.expanded.clone()),
            tree,
            arena,
            view_indices: self.view_indices,
        }
    }
}

/// The table instance: the public façade over column resolution, header
/// groups, row models, and the controlled/uncontrolled state machine.
pub struct Table {
    tree: ColumnTree,
    arena: RowArena,
    view_indices: Option<Arc<Vec<u32>>>,
    sorting: StateCell<SortingState>,
    column_filters: StateCell<ColumnFiltersState>,
    global_filter: StateCell<GlobalFilterState>,
    column_visibility: StateCell<ColumnVisibilityState>,
    column_order: StateCell<ColumnOrderState>,
    column_sizing: StateCell<ColumnSizingState>,
    column_sizing_info: StateCell<ColumnSizingInfoState>,
    column_pinning: StateCell<ColumnPinningState>,
    row_pinning: StateCell<RowPinningState>,
    expanded: StateCell<ExpandedState>,
}

macro_rules! state_field {
    ($field:ident, $set:ident, $reset:ident, $ty:ty) => {
        pub fn $set(&mut self, update: Update<$ty>) {
            self.$field.apply(update);
        }

        pub fn $reset(&mut self) {
            self.$field.reset();
        }
    };
}

impl Table {
    pub fn builder(data: Vec<JsonValue>, defs: Vec<ColumnDef>) -> TableBuilder {
        TableBuilder {
            data,
            defs,
            ..Default::default()
        }
    }

    /// Swap in a fresh view-indices buffer (e.g. after the view pipeline
    /// rebuilt).
    pub fn set_view_indices(&mut self, indices: Option<Arc<Vec<u32>>>) {
        self.view_indices = indices;
    }

    // ========== State ==========

    /// Snapshot of every state field as currently resolved.
    pub fn get_state(&self) -> TableState {
        TableState {
            sorting: self.sorting.get().clone(),
            column_filters: self.column_filters.get().clone(),
            global_filter: self.global_filter.get().clone(),
            column_visibility: self.column_visibility.get().clone(),
            column_order: self.column_order.get().clone(),
            column_sizing: self.column_sizing.get().clone(),
            column_sizing_info: self.column_sizing_info.get().clone(),
            column_pinning: self.column_pinning.get().clone(),
            row_pinning: self.row_pinning.get().clone(),
            expanded: self.expanded.get().clone(),
        }
    }

    /// Host pushes authoritative values for controlled fields after
    /// processing a change callback.
    pub fn sync_state(&mut self, state: &TableState) {
        self.sorting.sync(state.sorting.clone());
        self.column_filters.sync(state.column_filters.clone());
        self.global_filter.sync(state.global_filter.clone());
        self.column_visibility.sync(state.column_visibility.clone());
        self.column_order.sync(state.column_order.clone());
        self.column_sizing.sync(state.column_sizing.clone());
        self.column_sizing_info
            .sync(state.column_sizing_info.clone());
        self.column_pinning.sync(state.column_pinning.clone());
        self.row_pinning.sync(state.row_pinning.clone());
        self.expanded.sync(state.expanded.clone());
    }

    state_field!(sorting, set_sorting, reset_sorting, SortingState);
    state_field!(column_filters, set_column_filters, reset_column_filters, ColumnFiltersState);
    state_field!(global_filter, set_global_filter, reset_global_filter, GlobalFilterState);
    state_field!(
        column_visibility,
        set_column_visibility,
        reset_column_visibility,
        ColumnVisibilityState
    );
    state_field!(column_order, set_column_order, reset_column_order, ColumnOrderState);
    state_field!(column_sizing, set_column_sizing, reset_column_sizing, ColumnSizingState);
    state_field!(
        column_sizing_info,
        set_column_sizing_info,
        reset_column_sizing_info,
        ColumnSizingInfoState
    );
    state_field!(column_pinning, set_column_pinning, reset_column_pinning, ColumnPinningState);
    state_field!(row_pinning, set_row_pinning, reset_row_pinning, RowPinningState);
    state_field!(expanded, set_expanded, reset_expanded, ExpandedState);

    // ========== Columns ==========

    /// Every declared column, groups included, pre-order.
    pub fn get_all_columns(&self) -> Vec<ColumnHandle> {
        (0..self.tree.all.len())
            .map(|i| self.handle_for(i))
            .collect()
    }

    /// Leaf columns only, declaration order.
    pub fn get_all_leaf_columns(&self) -> Vec<ColumnHandle> {
        self.tree
            .leaves
            .iter()
            .map(|&i| self.handle_for(i))
            .collect()
    }

    /// The final ordered visible leaf list (§ visibility, order, pinning).
    pub fn get_visible_leaf_columns(&self) -> Vec<ColumnHandle> {
        self.resolve_visible()
            .iter()
            .map(|c| self.handle_for(c.tree_index))
            .collect()
    }

    pub fn get_column(&self, id: &str) -> Option<ColumnHandle> {
        self.tree.find(id).map(|i| self.handle_for(i))
    }

    /// Visible columns in the layout engine's input shape, plus pin
    /// counts, ready for `compute_layout`.
    pub fn layout_columns(&self) -> (Vec<LayoutColumn>, PinningInfo) {
        let visible = self.resolve_visible();
        (
            column::to_layout_columns(&self.tree, &visible),
            pinning_info(&visible),
        )
    }

    fn resolve_visible(&self) -> Vec<VisibleColumn> {
        resolve_visible_leaves(&self.tree, &self.get_state())
    }

    fn handle_for(&self, tree_index: usize) -> ColumnHandle {
        let node = &self.tree.all[tree_index];
        let def = &node.def;
        let state = self.get_state();
        let width = state
            .column_sizing
            .get(&def.id)
            .copied()
            .unwrap_or(def.size)
            .clamp(def.min_size, def.max_size);
        ColumnHandle {
            id: def.id.clone(),
            header: def.header.clone(),
            depth: node.depth,
            is_group: !node.is_leaf,
            is_visible: state
                .column_visibility
                .get(&def.id)
                .copied()
                .unwrap_or(true),
            is_pinned: state.column_pinning.side_of(&def.id),
            is_sorted: state
                .sorting
                .iter()
                .find(|e| e.id == def.id)
                .map(|e| e.desc),
            can_sort: node.is_leaf && def.enable_sorting,
            size: width,
        }
    }

    /// Single-key sort cycle: off → asc → desc → off. An explicit
    /// direction short-circuits the cycle. Either way the emitted spec
    /// replaces the whole sorting state; multi-key sorting only enters via
    /// `set_sorting`.
    pub fn toggle_sorting(&mut self, id: &str, desc: Option<bool>) -> GridResult<()> {
        let index = self
            .tree
            .find(id)
            .ok_or_else(|| GridError::bad_input(format!("unknown column id '{id}'")))?;
        let node = &self.tree.all[index];
        if !node.is_leaf || !node.def.enable_sorting {
            return Ok(());
        }
        debug!(target: "table", column = id, "sort toggled");

        let id = id.to_string();
        match desc {
            Some(desc) => self.sorting.apply(Update::set(vec![SortEntry { id, desc }])),
            None => self.sorting.apply(Update::map(move |prev: &SortingState| {
                match prev.iter().find(|e| e.id == id) {
                    None => vec![SortEntry { id: id.clone(), desc: false }],
                    Some(entry) if !entry.desc => {
                        vec![SortEntry { id: id.clone(), desc: true }]
                    }
                    Some(_) => Vec::new(),
                }
            })),
        }
        Ok(())
    }

    /// Pin to a side, or unpin with `None`.
    pub fn pin_column(&mut self, id: &str, side: Option<PinSide>) -> GridResult<()> {
        if self.tree.find(id).is_none() {
            return Err(GridError::bad_input(format!("unknown column id '{id}'")));
        }
        let id = id.to_string();
        self.column_pinning
            .apply(Update::map(move |prev: &ColumnPinningState| {
                let mut next = prev.clone();
                next.left.retain(|p| *p != id);
                next.right.retain(|p| *p != id);
                match side {
                    Some(PinSide::Left) => next.left.push(id.clone()),
                    Some(PinSide::Right) => next.right.push(id.clone()),
                    None => {}
                }
                next
            }));
        Ok(())
    }

    pub fn toggle_visibility(&mut self, id: &str) -> GridResult<()> {
        if self.tree.find(id).is_none() {
            return Err(GridError::bad_input(format!("unknown column id '{id}'")));
        }
        let id = id.to_string();
        self.column_visibility
            .apply(Update::map(move |prev: &ColumnVisibilityState| {
                let mut next = prev.clone();
                let visible = next.get(&id).copied().unwrap_or(true);
                next.insert(id.clone(), !visible);
                next
            }));
        Ok(())
    }

    // ========== Headers ==========

    pub fn get_header_groups(&self) -> Vec<HeaderGroup> {
        build_header_groups(&self.tree, &self.resolve_visible())
    }

    // ========== Rows ==========

    /// All top-level rows, original order.
    pub fn get_core_row_model(&self) -> RowModel {
        build_core_model(&self.arena)
    }

    /// Top-level rows routed through the view-indices buffer when one was
    /// supplied, otherwise the core model.
    pub fn get_row_model(&self) -> RowModel {
        match &self.view_indices {
            Some(indices) => build_view_model(&self.arena, indices),
            None => self.get_core_row_model(),
        }
    }

    /// The row model with every expanded row's subtree flattened in after
    /// it, DFS order.
    pub fn get_expanded_row_model(&self) -> RowModel {
        build_expanded_model(&self.arena, &self.get_row_model(), self.expanded.get())
    }

    /// Row at display position `i` of the row model.
    pub fn get_row(&self, i: usize) -> GridResult<&RowNode> {
        let model = self.get_row_model();
        let index = model.rows.get(i).copied().ok_or_else(|| {
            GridError::state_misuse(format!(
                "row index {} out of bounds ({} rows)",
                i,
                model.rows.len()
            ))
        })?;
        Ok(&self.arena.nodes[index])
    }

    pub fn get_row_by_id(&self, id: &str) -> Option<&RowNode> {
        self.arena.find(id).map(|i| &self.arena.nodes[i])
    }

    pub fn arena(&self) -> &RowArena {
        &self.arena
    }

    /// Value of `col_id` for a row, through the column's accessor key.
    pub fn row_value(&self, row: &RowNode, col_id: &str) -> GridResult<JsonValue> {
        let index = self
            .tree
            .find(col_id)
            .ok_or_else(|| GridError::bad_input(format!("unknown column id '{col_id}'")))?;
        Ok(row.field(self.tree.all[index].def.accessor()))
    }

    /// `(column id, value)` pairs for the visible leaf columns, display
    /// order.
    pub fn get_visible_cells(&self, row: &RowNode) -> Vec<(String, JsonValue)> {
        self.resolve_visible()
            .iter()
            .map(|c| {
                let def = &self.tree.all[c.tree_index].def;
                (def.id.clone(), row.field(def.accessor()))
            })
            .collect()
    }

    /// Values for every leaf column, declaration order.
    pub fn get_all_cell_values(&self, row: &RowNode) -> Vec<JsonValue> {
        self.tree
            .leaves
            .iter()
            .map(|&i| row.field(self.tree.all[i].def.accessor()))
            .collect()
    }

    pub fn row_is_expanded(&self, id: &str) -> bool {
        self.expanded.get().is_expanded(id)
    }

    pub fn toggle_expanded(&mut self, id: &str) -> GridResult<()> {
        if self.arena.find(id).is_none() {
            return Err(GridError::bad_input(format!("unknown row id '{id}'")));
        }
        let id = id.to_string();
        self.expanded.apply(Update::map(move |prev: &ExpandedState| {
            let mut next = prev.clone();
            let now = !next.is_expanded(&id);
            next.toggle(&id, now);
            next
        }));
        Ok(())
    }

    /// Rows pinned to the top, in pin-list order.
    pub fn get_top_rows(&self) -> Vec<usize> {
        let (top, _, _) = partition_pinned(&self.arena, &self.get_row_model(), self.row_pinning.get());
        top
    }

    /// Unpinned rows, model order.
    pub fn get_center_rows(&self) -> Vec<usize> {
        let (_, center, _) =
            partition_pinned(&self.arena, &self.get_row_model(), self.row_pinning.get());
        center
    }

    /// Rows pinned to the bottom, in pin-list order.
    pub fn get_bottom_rows(&self) -> Vec<usize> {
        let (_, _, bottom) =
            partition_pinned(&self.arena, &self.get_row_model(), self.row_pinning.get());
        bottom
    }

    // ========== Export ==========

    /// The expanded row model rendered as CSV with a header line, visible
    /// columns in display order.
    pub fn to_csv(&self) -> String {
        let names: Vec<String> = self
            .get_visible_leaf_columns()
            .iter()
            .map(|c| c.header.clone())
            .collect();
        let mut out = names
            .iter()
            .map(|n| export::escape_csv_field(n))
            .collect::<Vec<_>>()
            .join(",");
        let body = export::range_to_csv(&self.cell_matrix());
        if !body.is_empty() {
            out.push('\n');
            out.push_str(&body);
        }
        out
    }

    /// The expanded row model rendered as TSV, no header line.
    pub fn to_tsv(&self) -> String {
        export::range_to_tsv(&self.cell_matrix())
    }

    fn cell_matrix(&self) -> Vec<Vec<String>> {
        let visible = self.resolve_visible();
        self.get_expanded_row_model()
            .rows
            .iter()
            .map(|&row| {
                let node = &self.arena.nodes[row];
                visible
                    .iter()
                    .map(|c| {
                        let def = &self.tree.all[c.tree_index].def;
                        json_cell_text(&node.field(def.accessor()))
                    })
                    .collect()
            })
            .collect()
    }
}

fn json_cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Vec<JsonValue> {
        vec![
            json!({"name": "Alice", "age": 30}),
            json!({"name": "Bob", "age": 25}),
            json!({"name": "Charlie", "age": 35}),
        ]
    }

    fn defs() -> Vec<ColumnDef> {
        vec![ColumnDef::new("name"), ColumnDef::new("age")]
    }

    fn table() -> Table {
        Table::builder(people(), defs()).build()
    }

    #[test]
    fn test_sort_toggle_cycle() {
        let mut table = table();
        assert!(table.get_column("age").unwrap().is_sorted.is_none());

        table.toggle_sorting("age", None).unwrap();
        assert_eq!(table.get_column("age").unwrap().is_sorted, Some(false));

        table.toggle_sorting("age", None).unwrap();
        assert_eq!(table.get_column("age").unwrap().is_sorted, Some(true));

        table.toggle_sorting("age", None).unwrap();
        assert!(table.get_column("age").unwrap().is_sorted.is_none());
    }

    #[test]
    fn test_explicit_direction_short_circuits() {
        let mut table = table();
        table.toggle_sorting("age", Some(true)).unwrap();
        assert_eq!(table.get_state().sorting, vec![SortEntry { id: "age".into(), desc: true }]);
    }

    #[test]
    fn test_toggle_replaces_whole_spec() {
        let mut table = table();
        table.set_sorting(Update::set(vec![
            SortEntry { id: "name".into(), desc: false },
            SortEntry { id: "age".into(), desc: true },
        ]));
        table.toggle_sorting("age", None).unwrap();
        // age was desc in a multi-key spec; the toggle emits a fresh
        // single-key spec
        assert_eq!(table.get_state().sorting, vec![]);
    }

    #[test]
    fn test_sorting_disabled_column_is_noop() {
        let mut table = Table::builder(
            people(),
            vec![ColumnDef::new("name").sortable(false), ColumnDef::new("age")],
        )
        .build();
        table.toggle_sorting("name", None).unwrap();
        assert!(table.get_state().sorting.is_empty());
    }

    #[test]
    fn test_unknown_column_is_bad_input() {
        let mut table = table();
        assert!(matches!(
            table.toggle_sorting("nope", None),
            Err(GridError::BadInput(_))
        ));
    }

    #[test]
    fn test_pin_and_unpin() {
        let mut table = table();
        table.pin_column("age", Some(PinSide::Left)).unwrap();
        assert_eq!(table.get_column("age").unwrap().is_pinned, Some(PinSide::Left));
        let visible: Vec<String> = table
            .get_visible_leaf_columns()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(visible, vec!["age", "name"]);

        table.pin_column("age", None).unwrap();
        assert!(table.get_column("age").unwrap().is_pinned.is_none());
    }

    #[test]
    fn test_toggle_visibility() {
        let mut table = table();
        table.toggle_visibility("name").unwrap();
        let visible: Vec<String> = table
            .get_visible_leaf_columns()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(visible, vec!["age"]);
        table.toggle_visibility("name").unwrap();
        assert_eq!(table.get_visible_leaf_columns().len(), 2);
    }

    #[test]
    fn test_uncontrolled_updater_evaluated() {
        let mut table = table();
        table.set_global_filter(Update::set(Some("ali".into())));
        table.set_global_filter(Update::map(|prev: &GlobalFilterState| {
            prev.as_ref().map(|s| format!("{s}ce"))
        }));
        assert_eq!(table.get_state().global_filter.as_deref(), Some("alice"));
    }

    #[test]
    fn test_controlled_forwards_updater() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let received: Rc<RefCell<Vec<SortingState>>> = Rc::default();
        let sink = Rc::clone(&received);
        let mut table = Table::builder(people(), defs())
            .with_sorting(
                vec![SortEntry { id: "name".into(), desc: false }],
                Some(Box::new(move |update| {
                    // host evaluates against its own previous state
                    let host_prev = vec![SortEntry { id: "name".into(), desc: false }];
                    sink.borrow_mut().push(update.apply(&host_prev));
                })),
            )
            .build();

        table.toggle_sorting("name", None).unwrap();
        assert_eq!(
            *received.borrow(),
            vec![vec![SortEntry { id: "name".into(), desc: true }]]
        );
        // controlled value untouched until the host syncs
        assert_eq!(
            table.get_state().sorting,
            vec![SortEntry { id: "name".into(), desc: false }]
        );
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut initial = TableState::default();
        initial.sorting = vec![SortEntry { id: "age".into(), desc: false }];
        let mut table = Table::builder(people(), defs())
            .with_initial_state(initial)
            .build();

        table.set_sorting(Update::set(vec![SortEntry { id: "name".into(), desc: true }]));
        table.reset_sorting();
        assert_eq!(
            table.get_state().sorting,
            vec![SortEntry { id: "age".into(), desc: false }]
        );
    }

    #[test]
    fn test_declared_pin_seeds_initial_state() {
        let table = Table::builder(
            people(),
            vec![ColumnDef::new("name").with_pin(PinSide::Right), ColumnDef::new("age")],
        )
        .build();
        assert_eq!(table.get_state().column_pinning.right, vec!["name".to_string()]);
    }

    #[test]
    fn test_row_model_view_indirection() {
        let mut table = table();
        let model = table.get_row_model();
        assert_eq!(model.rows.len(), 3);

        table.set_view_indices(Some(Arc::new(vec![1, 0, 2])));
        let names: Vec<JsonValue> = table
            .get_row_model()
            .rows
            .iter()
            .map(|&i| table.arena().nodes[i].field("name"))
            .collect();
        assert_eq!(names, vec![json!("Bob"), json!("Alice"), json!("Charlie")]);
    }

    #[test]
    fn test_get_row_out_of_bounds() {
        let table = table();
        assert!(table.get_row(2).is_ok());
        assert!(matches!(
            table.get_row(3),
            Err(GridError::StateMisuse(_))
        ));
    }

    #[test]
    fn test_row_values_and_cells() {
        let table = table();
        let row = table.get_row(0).unwrap();
        assert_eq!(table.row_value(row, "name").unwrap(), json!("Alice"));
        let cells = table.get_visible_cells(row);
        assert_eq!(cells[0], ("name".to_string(), json!("Alice")));
        assert_eq!(cells[1], ("age".to_string(), json!(30)));
    }

    #[test]
    fn test_expanded_tree_scenario() {
        // Root A has children [B, C]; B has child E; D is a sibling of A.
        let data = vec![
            json!({
                "name": "A",
                "children": [
                    {"name": "B", "children": [{"name": "E"}]},
                    {"name": "C"}
                ]
            }),
            json!({"name": "D"}),
        ];
        let mut table = Table::builder(data, vec![ColumnDef::new("name")])
            .with_sub_rows_key("children")
            .build();

        table.toggle_expanded("0").unwrap(); // A
        table.toggle_expanded("1").unwrap(); // B
        let model = table.get_expanded_row_model();
        let names: Vec<JsonValue> = model
            .rows
            .iter()
            .map(|&i| table.arena().nodes[i].field("name"))
            .collect();
        assert_eq!(
            names,
            vec![json!("A"), json!("B"), json!("E"), json!("C"), json!("D")]
        );

        // collapsing everything returns to the root count
        table.set_expanded(Update::set(ExpandedState::default()));
        assert_eq!(table.get_expanded_row_model().rows.len(), 2);
    }

    #[test]
    fn test_row_pinning_partitions() {
        let mut table = table();
        table.set_row_pinning(Update::set(RowPinningState {
            top: vec!["2".into()],
            bottom: vec!["0".into()],
        }));
        assert_eq!(table.get_top_rows(), vec![2]);
        assert_eq!(table.get_center_rows(), vec![1]);
        assert_eq!(table.get_bottom_rows(), vec![0]);
    }

    #[test]
    fn test_csv_export_escaping() {
        let data = vec![
            json!({"a": "a,b", "b": "c"}),
            json!({"a": "d\"e", "b": "f"}),
        ];
        let table = Table::builder(data, vec![ColumnDef::new("a"), ColumnDef::new("b")]).build();
        assert_eq!(table.to_csv(), "a,b\n\"a,b\",c\n\"d\"\"e\",f");
    }

    #[test]
    fn test_layout_columns_bridge() {
        let mut table = table();
        table.pin_column("age", Some(PinSide::Left)).unwrap();
        let (columns, pinning) = table.layout_columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(pinning.left_count, 1);
        assert_eq!(pinning.right_count, 0);
    }
}
