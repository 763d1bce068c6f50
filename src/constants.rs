//! Global constants for the editor

use crate::color_utils::Color;

/// Hit radius for vertices and edges, in device pixels.
pub const VERTEX_EPSILON: f32 = 11.0;

/// Rendered vertex marker size, in device pixels.
pub const POINT_SIZE: f32 = 8.0;

/// Minimum number of vertices a finished shape must keep.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Number of vertices of a rectangle shape.
pub const RECTANGLE_VERTICES: usize = 4;

/// Label text size, in points.
pub const LABEL_FONT_SIZE: f32 = 8.0;

/// Offset applied when duplicating a shape, in image pixels.
pub const COPY_SHIFT: f32 = 2.0;

/// Label prefix marking machine-suggested, unconfirmed shapes.
pub const AUTO_LABEL_PREFIX: &str = "auto_";

/// Default number of undo steps kept per document.
pub const UNDO_HISTORY_SIZE: usize = 50;

/// Default shape colors
pub mod colors {
    use super::Color;

    pub const LINE: Color = Color::rgba(0, 255, 0, 128);
    pub const FILL: Color = Color::rgba(255, 0, 0, 128);
    pub const SELECT_LINE: Color = Color::rgba(255, 255, 255, 255);
    pub const SELECT_FILL: Color = Color::rgba(0, 128, 255, 155);
    pub const VERTEX_FILL: Color = Color::rgba(0, 255, 0, 255);
    pub const HIGHLIGHT_VERTEX_FILL: Color = Color::rgba(255, 0, 0, 255);
    pub const DRAWING_LINE: Color = Color::rgba(0, 0, 255, 255);
}

/// Zoom and scroll constants
pub mod zoom {
    /// Wheel delta reported for one notch (8 units per degree, 15 degrees).
    pub const WHEEL_STEP: f32 = 8.0 * 15.0;
    /// Zoom percent added per wheel notch.
    pub const WHEEL_INCREMENT: f32 = 10.0;
    /// Cursor margin for zoom-at-cursor, as a fraction of the viewport.
    pub const CURSOR_MARGIN: f32 = 0.1;
    /// Pixels subtracted from the viewport so fitting never triggers scrollbars.
    pub const FIT_EPSILON: f32 = 2.0;
    /// Minimum zoom percent
    pub const MIN_PERCENT: f32 = 1.0;
    /// Maximum zoom percent
    pub const MAX_PERCENT: f32 = 500.0;
    /// Scrollbar single step, in pixels.
    pub const SCROLL_SINGLE_STEP: f32 = 20.0;
}
