//! Viewport layout: per-frame cell rectangles for the header and the
//! virtualized data window, packed into a buffer hosts read zero-copy.

pub mod buffer;
pub mod engine;
