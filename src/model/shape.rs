//! The annotation shape entity.

use serde::{Deserialize, Serialize};

use crate::color_utils::{Color, color_for_label};
use crate::constants::{AUTO_LABEL_PREFIX, MIN_POLYGON_VERTICES, RECTANGLE_VERTICES};
use crate::geometry::{self, EdgeHit, Point, Rect};

/// How a shape was drawn, which decides how its vertices can be dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle; dragging a corner keeps it axis-aligned.
    #[default]
    Rectangle,
    /// Free-form polygon; vertices move independently.
    Polygon,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Polygon => "Polygon",
        }
    }
}

/// Vertex emphasis used while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightMode {
    /// Cursor is hovering near the vertex.
    NearVertex,
    /// Vertex is being dragged.
    MoveVertex,
}

impl HighlightMode {
    /// Marker size multiplier for this mode.
    pub fn size_factor(&self) -> f32 {
        match self {
            HighlightMode::NearVertex => 4.0,
            HighlightMode::MoveVertex => 1.5,
        }
    }
}

/// A labeled polygon annotation.
///
/// While being drawn a shape is open and may hold any number of vertices.
/// Only closed shapes with at least three vertices are persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Classification tag.
    pub label: String,
    vertices: Vec<Point>,
    /// Drawing kind.
    pub kind: ShapeKind,
    /// Outline color.
    pub line_color: Color,
    /// Fill color.
    pub fill_color: Color,
    /// Pascal VOC "difficult" attribute.
    pub difficult: bool,
    /// Whether this shape is the current selection.
    pub selected: bool,
    /// Whether this shape is shown and hit-testable.
    pub visible: bool,
    /// Whether to render the label text next to the shape.
    pub paint_label: bool,
    /// Whether the body is rendered filled.
    pub fill: bool,
    closed: bool,
    highlight: Option<(usize, HighlightMode)>,
}

impl Shape {
    /// Create an empty open shape with colors derived from `label`.
    pub fn new(label: impl Into<String>, kind: ShapeKind) -> Self {
        let label = label.into();
        let color = color_for_label(&label);
        Self {
            label,
            vertices: Vec::new(),
            kind,
            line_color: color,
            fill_color: color,
            difficult: false,
            selected: false,
            visible: true,
            paint_label: false,
            fill: false,
            closed: false,
            highlight: None,
        }
    }

    /// Build a closed shape from persisted vertices.
    ///
    /// Four vertices forming an axis-aligned rectangle become a rectangle
    /// shape; anything else is a polygon.
    pub fn from_vertices(label: impl Into<String>, vertices: Vec<Point>) -> Self {
        let kind = if geometry::is_axis_aligned_rect(&vertices) {
            ShapeKind::Rectangle
        } else {
            ShapeKind::Polygon
        };
        let mut shape = Self::new(label, kind);
        shape.vertices = vertices;
        shape.close();
        shape
    }

    // ------------------------------------------------------------------
    // Vertex entry
    // ------------------------------------------------------------------

    /// Append a vertex. Ignored once the shape is closed.
    pub fn add_point(&mut self, point: Point) -> bool {
        if self.closed {
            return false;
        }
        self.vertices.push(point);
        true
    }

    /// Remove and return the last vertex of an open shape.
    pub fn pop_point(&mut self) -> Option<Point> {
        if self.closed {
            return None;
        }
        self.vertices.pop()
    }

    /// Mark vertex entry as finished.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether this shape may be written by the serialization layer.
    pub fn is_persistable(&self) -> bool {
        self.closed && self.vertices.len() >= MIN_POLYGON_VERTICES
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> Option<Point> {
        self.vertices.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn first(&self) -> Option<Point> {
        self.vertices.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.vertices.last().copied()
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Translate every vertex.
    pub fn move_by(&mut self, delta: Point) {
        for v in &mut self.vertices {
            *v += delta;
        }
    }

    /// Translate a single vertex.
    pub fn move_vertex_by(&mut self, index: usize, delta: Point) {
        if let Some(v) = self.vertices.get_mut(index) {
            *v += delta;
        }
    }

    /// Drag corner `index` of a rectangle to `target`, keeping it axis-aligned.
    ///
    /// The corner diagonal to `index` stays fixed. With `square` set the side
    /// is the larger of the two deltas from that anchor. Returns false (and
    /// leaves the shape untouched) when this is not a 4-vertex shape.
    pub fn reshape_rectangle(&mut self, index: usize, target: Point, square: bool) -> bool {
        if self.vertices.len() != RECTANGLE_VERTICES || index >= RECTANGLE_VERTICES {
            return false;
        }
        let anchor = self.vertices[(index + 2) % RECTANGLE_VERTICES];
        let target = if square {
            geometry::square_corner(anchor, target)
        } else {
            target
        };
        let shift = target - self.vertices[index];

        // Vertex 1 shares y with vertex 0, vertex 3 shares x with vertex 0.
        let next = (index + 1) % RECTANGLE_VERTICES;
        let prev = (index + 3) % RECTANGLE_VERTICES;
        let (next_shift, prev_shift) = if index % 2 == 0 {
            (Point::new(0.0, shift.y), Point::new(shift.x, 0.0))
        } else {
            (Point::new(shift.x, 0.0), Point::new(0.0, shift.y))
        };
        self.move_vertex_by(index, shift);
        self.move_vertex_by(next, next_shift);
        self.move_vertex_by(prev, prev_shift);
        true
    }

    /// Insert a vertex before position `index`.
    pub fn insert_vertex(&mut self, index: usize, point: Point) {
        let index = index.min(self.vertices.len());
        self.vertices.insert(index, point);
        self.kind = ShapeKind::Polygon;
    }

    /// Remove a vertex if the shape keeps at least three afterwards.
    pub fn remove_vertex(&mut self, index: usize) -> Option<Point> {
        if index >= self.vertices.len() || self.vertices.len() <= MIN_POLYGON_VERTICES {
            return None;
        }
        self.highlight = None;
        self.kind = ShapeKind::Polygon;
        Some(self.vertices.remove(index))
    }

    pub fn contains_point(&self, point: Point) -> bool {
        geometry::point_in_polygon(point, &self.vertices)
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        geometry::bounding_rect(&self.vertices)
    }

    pub fn nearest_vertex(&self, point: Point, epsilon: f32) -> Option<usize> {
        geometry::closest_vertex(point, &self.vertices, epsilon)
    }

    /// Nearest edge; open shapes only have edges between entered vertices.
    pub fn nearest_edge(&self, point: Point, epsilon: f32) -> Option<EdgeHit> {
        if !self.closed || self.vertices.len() < 2 {
            return None;
        }
        geometry::closest_edge(point, &self.vertices, epsilon)
    }

    // ------------------------------------------------------------------
    // Presentation
    // ------------------------------------------------------------------

    pub fn highlight_vertex(&mut self, index: usize, mode: HighlightMode) {
        self.highlight = Some((index, mode));
    }

    pub fn highlight_clear(&mut self) {
        self.highlight = None;
    }

    pub fn highlighted(&self) -> Option<(usize, HighlightMode)> {
        self.highlight
    }

    /// Change the label and recolor from it.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        let color = color_for_label(&self.label);
        self.line_color = color;
        self.fill_color = color;
    }

    /// Whether the label marks an unconfirmed machine suggestion.
    pub fn is_auto_label(&self) -> bool {
        self.label.starts_with(AUTO_LABEL_PREFIX)
    }

    /// Deep copy with presentation state reset; the copy starts unselected.
    pub fn copy(&self) -> Shape {
        Shape {
            label: self.label.clone(),
            vertices: self.vertices.clone(),
            kind: self.kind,
            line_color: self.line_color,
            fill_color: self.fill_color,
            difficult: self.difficult,
            selected: false,
            visible: true,
            paint_label: self.paint_label,
            fill: false,
            closed: self.closed,
            highlight: None,
        }
    }
}

/// Strip the `auto_<score>_` prefix from a machine-suggested label.
///
/// Returns `None` for labels without the prefix.
pub fn confirmed_label(label: &str) -> Option<&str> {
    let rest = label.strip_prefix(AUTO_LABEL_PREFIX)?;
    match rest.find('_') {
        Some(pos) => Some(&rest[pos + 1..]),
        None => Some(rest),
    }
}
