//! gridcore: a render-agnostic tabular data engine.
//!
//! The engine ingests columnar data, derives a view (filter + stable
//! multi-key sort) over it, and computes per-frame cell layout rectangles
//! for a scrolled viewport with pinned column regions. Output is a packed
//! f32 layout buffer and a u32 view-indices buffer a host can consume with
//! any 2D canvas API; the engine itself never draws, touches the network,
//! or persists anything.
//!
//! Architecture:
//!
//! ```text
//! ColumnStore (typed columnar storage, generation counter)
//!     → ViewPipeline (filter → sort, cached by generation + spec)
//!         → LayoutEngine (regions, row window, packed cell buffer)
//! Table (column tree, header groups, row models, state machine)
//! ```

pub mod data;
pub mod engine;
pub mod error;
pub mod events;
pub mod layout;
pub mod table;

pub use data::column_store::{CellValue, ColumnInfo, ColumnKind, ColumnStore, NULL_ID};
pub use data::filter::{ColumnFilter, ColumnPredicate, FilterSpec};
pub use data::sort::{SortKey, SortSpec};
pub use data::view::{ViewHandle, ViewPipeline};
pub use engine::GridEngine;
pub use error::{GridError, GridResult};
pub use events::middleware::{compose, Channel, Dispatcher, Middleware, TableEvent, Terminal};
pub use layout::buffer::{find_cell, Align, LayoutBuffer, CELL_STRIDE};
pub use layout::engine::{
    LayoutColumn, LayoutEngine, LayoutInfo, PinningInfo, Region, RegionSet, ViewportSpec,
};
pub use table::column::ColumnDef;
pub use table::instance::{Table, TableBuilder};
pub use table::state::{ExpandedState, PinSide, SortEntry, TableState, Update};
