use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// A state change carried either as a ready value or as an updater over
/// the previous value.
///
/// Controlled fields forward the `Update` to the host callback verbatim so
/// the host can close over its own previous state; uncontrolled fields
/// evaluate it against the internal cell.
pub enum Update<T> {
    Set(T),
    Map(Box<dyn FnOnce(&T) -> T>),
}

impl<T: Clone> Update<T> {
    pub fn set(value: T) -> Self {
        Update::Set(value)
    }

    pub fn map(f: impl FnOnce(&T) -> T + 'static) -> Self {
        Update::Map(Box::new(f))
    }

    /// Evaluate against the previous value.
    pub fn apply(self, prev: &T) -> T {
        match self {
            Update::Set(value) => value,
            Update::Map(f) => f(prev),
        }
    }
}

impl<T> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Set(_) => f.write_str("Update::Set"),
            Update::Map(_) => f.write_str("Update::Map"),
        }
    }
}

pub type OnChange<T> = Box<dyn FnMut(Update<T>)>;

/// One resolved state field: controlled (host-owned) or uncontrolled
/// (internal cell seeded from the initial state).
pub struct StateCell<T: Clone> {
    value: T,
    initial: T,
    controlled: bool,
    on_change: Option<OnChange<T>>,
}

impl<T: Clone> StateCell<T> {
    pub fn uncontrolled(initial: T) -> Self {
        Self {
            value: initial.clone(),
            initial,
            controlled: false,
            on_change: None,
        }
    }

    pub fn controlled(value: T, initial: T) -> Self {
        Self {
            value,
            initial,
            controlled: true,
            on_change: None,
        }
    }

    pub fn with_on_change(mut self, cb: OnChange<T>) -> Self {
        self.on_change = Some(cb);
        self
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn is_controlled(&self) -> bool {
        self.controlled
    }

    /// Route a change. Controlled: the updater goes to the host callback
    /// unevaluated and the local mirror is left for the host to refresh via
    /// `sync`. Uncontrolled: evaluate in place.
    pub fn apply(&mut self, update: Update<T>) {
        if self.controlled {
            if let Some(cb) = self.on_change.as_mut() {
                cb(update);
            }
        } else {
            self.value = update.apply(&self.value);
        }
    }

    /// Host pushes the authoritative value of a controlled field.
    pub fn sync(&mut self, value: T) {
        self.value = value;
    }

    /// Reset to the seeded initial value (uncontrolled), or ask the host to
    /// (controlled).
    pub fn reset(&mut self) {
        let initial = self.initial.clone();
        self.apply(Update::Set(initial));
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("value", &self.value)
            .field("controlled", &self.controlled)
            .finish()
    }
}

// ========== State shapes ==========

/// One applied sort entry, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortEntry {
    pub id: String,
    pub desc: bool,
}

pub type SortingState = Vec<SortEntry>;

/// A column filter value keyed by column id; the engine-facing wire form
/// is derived from these by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFilterEntry {
    pub id: String,
    pub value: JsonValue,
}

pub type ColumnFiltersState = Vec<ColumnFilterEntry>;
pub type GlobalFilterState = Option<String>;
pub type ColumnVisibilityState = BTreeMap<String, bool>;
pub type ColumnOrderState = Vec<String>;
pub type ColumnSizingState = BTreeMap<String, f64>;

/// Live column-resize drag info, mirrored for hosts that render a resize
/// indicator. The engine stores it; interpreting the drag is host work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnSizingInfoState {
    pub is_resizing_column: Option<String>,
    pub start_offset: f64,
    pub start_size: f64,
    pub delta_offset: f64,
    pub delta_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnPinningState {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

impl ColumnPinningState {
    pub fn side_of(&self, id: &str) -> Option<PinSide> {
        if self.left.iter().any(|p| p == id) {
            Some(PinSide::Left)
        } else if self.right.iter().any(|p| p == id) {
            Some(PinSide::Right)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PinSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowPinningState {
    pub top: Vec<String>,
    pub bottom: Vec<String>,
}

/// Row expansion: everything, or an explicit id set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpandedState {
    All(bool),
    Rows(BTreeMap<String, bool>),
}

impl Default for ExpandedState {
    fn default() -> Self {
        ExpandedState::Rows(BTreeMap::new())
    }
}

impl ExpandedState {
    pub fn all() -> Self {
        ExpandedState::All(true)
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        match self {
            ExpandedState::All(all) => *all,
            ExpandedState::Rows(rows) => rows.get(id).copied().unwrap_or(false),
        }
    }

    pub fn toggle(&mut self, id: &str, expanded: bool) {
        match self {
            ExpandedState::All(_) => {
                // demote to an explicit set carrying the toggled entry
                let mut rows = BTreeMap::new();
                rows.insert(id.to_string(), expanded);
                *self = ExpandedState::Rows(rows);
            }
            ExpandedState::Rows(rows) => {
                if expanded {
                    rows.insert(id.to_string(), true);
                } else {
                    rows.remove(id);
                }
            }
        }
    }
}

/// Snapshot of every table state field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableState {
    pub sorting: SortingState,
    pub column_filters: ColumnFiltersState,
    pub global_filter: GlobalFilterState,
    pub column_visibility: ColumnVisibilityState,
    pub column_order: ColumnOrderState,
    pub column_sizing: ColumnSizingState,
    pub column_sizing_info: ColumnSizingInfoState,
    pub column_pinning: ColumnPinningState,
    pub row_pinning: RowPinningState,
    pub expanded: ExpandedState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_set_and_map() {
        let prev = vec![1, 2];
        assert_eq!(Update::set(vec![3]).apply(&prev), vec![3]);
        let mapped = Update::map(|p: &Vec<i32>| p.iter().map(|x| x * 10).collect());
        assert_eq!(mapped.apply(&prev), vec![10, 20]);
    }

    #[test]
    fn test_uncontrolled_cell_evaluates_updaters() {
        let mut cell = StateCell::uncontrolled(5i32);
        cell.apply(Update::map(|p| p + 1));
        assert_eq!(*cell.get(), 6);
        cell.apply(Update::set(0));
        assert_eq!(*cell.get(), 0);
        cell.reset();
        assert_eq!(*cell.get(), 5);
    }

    #[test]
    fn test_controlled_cell_forwards_updaters_verbatim() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<i32>>> = Rc::default();
        let seen_cb = Rc::clone(&seen);
        let mut cell = StateCell::controlled(100i32, 0).with_on_change(Box::new(move |update| {
            // the host evaluates against ITS previous value, not the mirror
            seen_cb.borrow_mut().push(update.apply(&41));
        }));

        cell.apply(Update::map(|p| p + 1));
        assert_eq!(*seen.borrow(), vec![42]);
        // controlled: local mirror untouched until the host syncs
        assert_eq!(*cell.get(), 100);
        cell.sync(42);
        assert_eq!(*cell.get(), 42);
    }

    #[test]
    fn test_expanded_state_semantics() {
        let mut expanded = ExpandedState::default();
        assert!(!expanded.is_expanded("0"));
        expanded.toggle("0", true);
        assert!(expanded.is_expanded("0"));
        expanded.toggle("0", false);
        assert!(!expanded.is_expanded("0"));

        let all = ExpandedState::all();
        assert!(all.is_expanded("anything"));
    }

    #[test]
    fn test_expanded_state_wire_form() {
        let rows: ExpandedState = serde_json::from_str(r#"{"0": true, "2": true}"#).unwrap();
        assert!(rows.is_expanded("0"));
        assert!(rows.is_expanded("2"));
        assert!(!rows.is_expanded("1"));

        let all: ExpandedState = serde_json::from_str("true").unwrap();
        assert!(all.is_expanded("7"));
    }

    #[test]
    fn test_table_state_roundtrip() {
        let mut state = TableState::default();
        state.sorting.push(SortEntry {
            id: "age".into(),
            desc: true,
        });
        state.column_pinning.left.push("name".into());
        let json = serde_json::to_string(&state).unwrap();
        let back: TableState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
