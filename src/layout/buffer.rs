use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Floats per packed cell record.
pub const CELL_STRIDE: usize = 16;

// Field offsets within one record.
pub const FIELD_ROW: usize = 0;
pub const FIELD_COL: usize = 1;
pub const FIELD_X: usize = 2;
pub const FIELD_Y: usize = 3;
pub const FIELD_WIDTH: usize = 4;
pub const FIELD_HEIGHT: usize = 5;
pub const FIELD_ALIGN: usize = 6;
pub const FIELD_PAD_TOP: usize = 7;
pub const FIELD_PAD_RIGHT: usize = 8;
pub const FIELD_PAD_BOTTOM: usize = 9;
pub const FIELD_PAD_LEFT: usize = 10;
pub const FIELD_BORDER_TOP: usize = 11;
pub const FIELD_BORDER_RIGHT: usize = 12;
pub const FIELD_BORDER_BOTTOM: usize = 13;
pub const FIELD_BORDER_LEFT: usize = 14;
pub const FIELD_RESERVED: usize = 15;

/// Horizontal content alignment, encoded into the buffer as 0/1/2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn code(self) -> f32 {
        match self {
            Align::Left => 0.0,
            Align::Center => 1.0,
            Align::Right => 2.0,
        }
    }
}

/// One cell rectangle before packing. Coordinates are content-space; the
/// host applies scroll offset and region translation when drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellRect {
    pub row: f32,
    pub col: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub align: Align,
    pub padding: [f32; 4],
    pub border: [f32; 4],
}

/// Packed cell-layout buffer: `CELL_STRIDE` f32 values per cell, header
/// cells first, then data cells row-major.
///
/// The backing allocation only grows, so steady-state frames write into
/// the same memory and a host-held pointer stays valid until a growing
/// `compute_layout` call.
#[derive(Debug, Default)]
pub struct LayoutBuffer {
    data: Vec<f32>,
    cell_count: usize,
}

impl LayoutBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the write cursor and make sure `cells` records fit. Growth
    /// failures surface as `CapacityExceeded`.
    pub fn begin_frame(&mut self, cells: usize) -> GridResult<()> {
        let needed = cells.saturating_mul(CELL_STRIDE);
        if needed > self.data.capacity() {
            let additional = needed - self.data.len();
            self.data.try_reserve(additional).map_err(|e| {
                GridError::CapacityExceeded(format!(
                    "layout buffer allocation of {} floats failed: {e}",
                    needed
                ))
            })?;
        }
        self.data.clear();
        self.cell_count = 0;
        Ok(())
    }

    /// Append one packed record.
    pub fn push_cell(&mut self, cell: &CellRect) {
        self.data.extend_from_slice(&[
            cell.row,
            cell.col,
            cell.x,
            cell.y,
            cell.width,
            cell.height,
            cell.align.code(),
            cell.padding[0],
            cell.padding[1],
            cell.padding[2],
            cell.padding[3],
            cell.border[0],
            cell.border[1],
            cell.border[2],
            cell.border[3],
            0.0,
        ]);
        self.cell_count += 1;
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw parts for zero-copy host reads.
    pub fn as_ptr_len(&self) -> (*const f32, usize) {
        (self.data.as_ptr(), self.data.len())
    }
}

// ========== Reader primitives ==========
//
// Pure accessors over any packed slice, so hosts can read a buffer they
// received by pointer without constructing a LayoutBuffer. Out-of-bounds
// reads return 0 rather than failing.

pub fn cell_field(buf: &[f32], cell: usize, field: usize) -> f32 {
    if field >= CELL_STRIDE {
        return 0.0;
    }
    buf.get(cell * CELL_STRIDE + field).copied().unwrap_or(0.0)
}

pub fn cell_row(buf: &[f32], cell: usize) -> f32 {
    cell_field(buf, cell, FIELD_ROW)
}

pub fn cell_col(buf: &[f32], cell: usize) -> f32 {
    cell_field(buf, cell, FIELD_COL)
}

pub fn cell_x(buf: &[f32], cell: usize) -> f32 {
    cell_field(buf, cell, FIELD_X)
}

pub fn cell_y(buf: &[f32], cell: usize) -> f32 {
    cell_field(buf, cell, FIELD_Y)
}

pub fn cell_width(buf: &[f32], cell: usize) -> f32 {
    cell_field(buf, cell, FIELD_WIDTH)
}

pub fn cell_height(buf: &[f32], cell: usize) -> f32 {
    cell_field(buf, cell, FIELD_HEIGHT)
}

pub fn cell_align(buf: &[f32], cell: usize) -> f32 {
    cell_field(buf, cell, FIELD_ALIGN)
}

/// `[top, right, bottom, left]` padding.
pub fn cell_padding(buf: &[f32], cell: usize) -> [f32; 4] {
    [
        cell_field(buf, cell, FIELD_PAD_TOP),
        cell_field(buf, cell, FIELD_PAD_RIGHT),
        cell_field(buf, cell, FIELD_PAD_BOTTOM),
        cell_field(buf, cell, FIELD_PAD_LEFT),
    ]
}

/// `[top, right, bottom, left]` border widths.
pub fn cell_border(buf: &[f32], cell: usize) -> [f32; 4] {
    [
        cell_field(buf, cell, FIELD_BORDER_TOP),
        cell_field(buf, cell, FIELD_BORDER_RIGHT),
        cell_field(buf, cell, FIELD_BORDER_BOTTOM),
        cell_field(buf, cell, FIELD_BORDER_LEFT),
    ]
}

/// Linear hit test over cells `[start, start + count)` in content space.
/// Inclusive top-left edge, exclusive bottom-right edge; the first match
/// wins. `None` when nothing is hit.
pub fn find_cell(buf: &[f32], start: usize, count: usize, px: f32, py: f32) -> Option<usize> {
    for cell in start..start.saturating_add(count) {
        let x = cell_x(buf, cell);
        let y = cell_y(buf, cell);
        let w = cell_width(buf, cell);
        let h = cell_height(buf, cell);
        if px >= x && px < x + w && py >= y && py < y + h {
            return Some(cell);
        }
    }
    None
}
