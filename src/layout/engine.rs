use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{GridError, GridResult};
use crate::layout::buffer::{Align, CellRect, LayoutBuffer};

/// Per-frame viewport parameters supplied by the host.
///
/// `scroll_top` arrives already de-scaled when the host caps its scrollable
/// range (browsers cap around 2^24 px); the engine is scale-free and never
/// rescales internally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportSpec {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub width: f64,
    pub height: f64,
    pub header_height: f64,
    pub row_height: f64,
    /// Extra rows laid out above and below the visible window.
    pub overscan: u32,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self {
            scroll_top: 0.0,
            scroll_left: 0.0,
            width: 800.0,
            height: 600.0,
            header_height: 36.0,
            row_height: 36.0,
            overscan: 5,
        }
    }
}

/// A resolved visible leaf column as the layout engine consumes it: final
/// width plus the style fields that land in the packed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutColumn {
    pub width: f64,
    pub min_width: f64,
    pub max_width: f64,
    pub align: Align,
    pub padding: [f32; 4],
    pub border: [f32; 4],
}

impl Default for LayoutColumn {
    fn default() -> Self {
        Self {
            width: 150.0,
            min_width: 40.0,
            max_width: 1000.0,
            align: Align::Left,
            padding: [0.0; 4],
            border: [0.0; 4],
        }
    }
}

impl LayoutColumn {
    fn clamped_width(&self) -> f64 {
        self.width.clamp(self.min_width, self.max_width)
    }
}

/// Pinned-column counts at the edges of the visible column list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinningInfo {
    pub left_count: usize,
    pub right_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionSide {
    Left,
    Center,
    Right,
}

/// A horizontal slice of the viewport with its own clip rectangle and
/// horizontal translation. The center region scrolls; pinned sides do not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub side: RegionSide,
    pub clip: Rect,
    pub translate_x: f64,
}

/// The 1–3 regions partitioning the viewport. Clip rectangles tile the
/// viewport width exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSet {
    pub left: Option<Region>,
    pub center: Region,
    pub right: Option<Region>,
}

/// Per-frame layout metadata returned alongside the packed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInfo {
    /// Header cells at the front of the buffer (= visible column count).
    pub header_count: usize,
    /// Total packed cells: header plus data.
    pub cell_count: usize,
    /// Laid-out data row window `[first_row, end_row)` in view positions.
    pub first_row: usize,
    pub end_row: usize,
    pub regions: RegionSet,
    pub total_content_width: f64,
    pub left_width: f64,
    pub right_width: f64,
    pub total_content_height: f64,
}

/// Computes per-frame cell rectangles for the header and the virtualized
/// data window, packing them into a grow-only `LayoutBuffer`.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    buffer: LayoutBuffer,
    last_info: Option<LayoutInfo>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The buffer from the last successful `compute_layout`.
    pub fn buffer(&self) -> &LayoutBuffer {
        &self.buffer
    }

    /// The metadata from the last successful `compute_layout`.
    pub fn last_info(&self) -> Option<&LayoutInfo> {
        self.last_info.as_ref()
    }

    /// Lay out one frame.
    ///
    /// All emitted coordinates are content-space; the host converts to
    /// viewport space per region (left: identity, center: minus
    /// `scroll_left`, right: plus `width − total_content_width`). Header
    /// cells are emitted at `y = scroll_top` so translating a region by the
    /// scroll offset pins the header to the top with no special case.
    pub fn compute_layout(
        &mut self,
        columns: &[LayoutColumn],
        pinning: PinningInfo,
        view_indices: &[u32],
        viewport: &ViewportSpec,
    ) -> GridResult<(&LayoutInfo, &[f32])> {
        if viewport.row_height <= 0.0 {
            return Err(GridError::bad_input(format!(
                "row height must be positive, got {}",
                viewport.row_height
            )));
        }
        if pinning.left_count + pinning.right_count > columns.len() {
            return Err(GridError::bad_input(format!(
                "pinned {}+{} columns but only {} are visible",
                pinning.left_count,
                pinning.right_count,
                columns.len()
            )));
        }

        let widths: Vec<f64> = columns.iter().map(LayoutColumn::clamped_width).collect();
        let total_width: f64 = widths.iter().sum();
        let left_width: f64 = widths[..pinning.left_count].iter().sum();
        let right_width: f64 = widths[widths.len() - pinning.right_count..].iter().sum();

        let regions = compute_regions(viewport, pinning, left_width, right_width, total_width);
        let (first_row, end_row) = row_window(viewport, view_indices.len());

        let header_count = columns.len();
        let data_rows = end_row - first_row;
        let cell_count = header_count + data_rows * columns.len();

        self.buffer.begin_frame(cell_count)?;

        // column origins in content space
        let mut origins = Vec::with_capacity(columns.len());
        let mut x = 0.0f64;
        for &w in &widths {
            origins.push(x);
            x += w;
        }

        for (col, spec) in columns.iter().enumerate() {
            self.buffer.push_cell(&CellRect {
                row: 0.0,
                col: col as f32,
                x: origins[col] as f32,
                y: viewport.scroll_top as f32,
                width: widths[col] as f32,
                height: viewport.header_height as f32,
                align: spec.align,
                padding: spec.padding,
                border: spec.border,
            });
        }

        for r in first_row..end_row {
            let y = viewport.header_height + r as f64 * viewport.row_height;
            let original_row = view_indices[r];
            for (col, spec) in columns.iter().enumerate() {
                self.buffer.push_cell(&CellRect {
                    row: original_row as f32,
                    col: col as f32,
                    x: origins[col] as f32,
                    y: y as f32,
                    width: widths[col] as f32,
                    height: viewport.row_height as f32,
                    align: spec.align,
                    padding: spec.padding,
                    border: spec.border,
                });
            }
        }

        let info = LayoutInfo {
            header_count,
            cell_count,
            first_row,
            end_row,
            regions,
            total_content_width: total_width,
            left_width,
            right_width,
            total_content_height: view_indices.len() as f64 * viewport.row_height,
        };
        trace!(
            target: "layout_engine",
            cells = cell_count,
            rows = data_rows,
            first_row,
            "frame laid out"
        );
        let info = self.last_info.insert(info);
        Ok((&*info, self.buffer.as_slice()))
    }
}

/// Partition the viewport into clip regions per the pinning widths.
fn compute_regions(
    viewport: &ViewportSpec,
    pinning: PinningInfo,
    left_width: f64,
    right_width: f64,
    total_width: f64,
) -> RegionSet {
    let height = viewport.height;
    let left = (pinning.left_count > 0).then_some(Region {
        side: RegionSide::Left,
        clip: Rect {
            x: 0.0,
            y: 0.0,
            width: left_width,
            height,
        },
        translate_x: 0.0,
    });
    let right = (pinning.right_count > 0).then_some(Region {
        side: RegionSide::Right,
        clip: Rect {
            x: viewport.width - right_width,
            y: 0.0,
            width: right_width,
            height,
        },
        translate_x: viewport.width - total_width,
    });
    let center = Region {
        side: RegionSide::Center,
        clip: Rect {
            x: left_width,
            y: 0.0,
            width: (viewport.width - left_width - right_width).max(0.0),
            height,
        },
        translate_x: -viewport.scroll_left,
    };
    RegionSet {
        left,
        center,
        right,
    }
}

/// Visible data-row window `[r0, r1)` in view positions, widened by
/// overscan on both sides. Degenerates to an empty window when the
/// viewport has no room below the header or the view is empty.
fn row_window(viewport: &ViewportSpec, view_rows: usize) -> (usize, usize) {
    let data_height = viewport.height - viewport.header_height;
    if data_height <= 0.0 || view_rows == 0 {
        return (0, 0);
    }
    let scroll_top = viewport.scroll_top.max(0.0);
    let overscan = viewport.overscan as usize;

    let first = (scroll_top / viewport.row_height).floor() as usize;
    let first = first.saturating_sub(overscan).min(view_rows);
    let last = ((scroll_top + data_height) / viewport.row_height).ceil() as usize + overscan;
    let last = last.min(view_rows);
    (first, last.max(first))
}
