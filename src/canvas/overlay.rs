//! Render list for the canvas.
//!
//! The canvas does not draw anything itself. It describes what to draw in
//! image coordinates, together with the view transform, and the host paints
//! it with whatever toolkit it uses.

use crate::color_utils::Color;
use crate::config::CanvasConfig;
use crate::constants::LABEL_FONT_SIZE;
use crate::geometry::{Point, Rect, Size};
use crate::model::{HighlightMode, Shape, ShapeId};
use crate::zoom_math::ViewTransform;

/// Vertex marker style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    Round,
    Square,
}

/// A vertex marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexMarker {
    /// Center in image space
    pub center: Point,
    /// Diameter (round) or side (square) in image space
    pub size: f32,
    pub style: MarkerStyle,
}

/// Label text anchored at its baseline start.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelText {
    pub position: Point,
    pub text: String,
    pub font_size: f32,
}

/// One shape ready for painting.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeOverlay {
    /// Arena ID, `None` for the shape being drawn
    pub id: Option<ShapeId>,
    /// Outline in image space
    pub points: Vec<Point>,
    /// Whether the outline returns to the first point
    pub closed: bool,
    pub line_color: Color,
    /// Line width in image space
    pub line_width: f32,
    /// Body fill, if filled
    pub fill: Option<Color>,
    pub vertices: Vec<VertexMarker>,
    pub vertex_color: Color,
    pub label: Option<LabelText>,
}

/// Live preview while drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewOverlay {
    /// Segment from the last entered vertex to the provisional point
    pub line: (Point, Point),
    pub color: Color,
    /// Rectangle spanned by the anchor and the provisional point
    pub rect: Option<Rect>,
}

/// Everything to paint for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub transform: ViewTransform,
    /// Image placement in image space, drawn at the origin
    pub image: Size,
    /// Finished shapes, bottom to top
    pub shapes: Vec<ShapeOverlay>,
    /// Shape being drawn
    pub current: Option<ShapeOverlay>,
    pub preview: Option<PreviewOverlay>,
    /// Crosshair position while drawing
    pub crosshair: Option<Point>,
}

impl Overlay {
    pub fn new(transform: ViewTransform, image: Size) -> Self {
        Self {
            transform,
            image,
            shapes: Vec::new(),
            current: None,
            preview: None,
            crosshair: None,
        }
    }

    pub fn push(&mut self, shape: ShapeOverlay) {
        self.shapes.push(shape);
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.current.is_none() && self.preview.is_none()
    }
}

/// Outline width in image space for the given scale.
pub fn line_width(scale: f32) -> f32 {
    (2.0 / scale).round().max(1.0)
}

/// Describe `shape` for painting at `scale`.
pub fn shape_overlay(
    id: Option<ShapeId>,
    shape: &Shape,
    fill: bool,
    scale: f32,
    config: &CanvasConfig,
) -> ShapeOverlay {
    let line_color = if shape.selected {
        config.select_line_color
    } else {
        shape.line_color
    };
    let fill = fill.then(|| {
        if shape.selected {
            config.select_fill_color
        } else {
            shape.fill_color
        }
    });

    let highlight = shape.highlighted();
    let base = config.point_size / scale;
    let vertices = shape
        .vertices()
        .iter()
        .enumerate()
        .map(|(i, p)| match highlight {
            Some((index, mode)) if index == i => VertexMarker {
                center: *p,
                size: base * mode.size_factor(),
                style: match mode {
                    HighlightMode::NearVertex => MarkerStyle::Round,
                    HighlightMode::MoveVertex => MarkerStyle::Square,
                },
            },
            _ => VertexMarker {
                center: *p,
                size: base,
                style: MarkerStyle::Round,
            },
        })
        .collect();
    let vertex_color = if highlight.is_some() {
        config.highlight_vertex_fill_color
    } else {
        config.vertex_fill_color
    };

    ShapeOverlay {
        id,
        points: shape.vertices().to_vec(),
        closed: shape.is_closed(),
        line_color,
        line_width: line_width(scale),
        fill,
        vertices,
        vertex_color,
        label: label_text(shape),
    }
}

fn label_text(shape: &Shape) -> Option<LabelText> {
    if !shape.paint_label {
        return None;
    }
    let rect = shape.bounding_rect()?;
    let min_y_label = 1.25 * LABEL_FONT_SIZE;
    let y = if rect.y < min_y_label {
        rect.y + min_y_label
    } else {
        rect.y
    };
    Some(LabelText {
        position: Point::new(rect.x, y),
        text: shape.label.clone(),
        font_size: LABEL_FONT_SIZE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_shape() -> Shape {
        Shape::from_vertices(
            "dog",
            vec![
                Point::new(0.0, 4.0),
                Point::new(10.0, 4.0),
                Point::new(10.0, 20.0),
                Point::new(0.0, 20.0),
            ],
        )
    }

    #[test]
    fn test_line_width() {
        assert_eq!(line_width(1.0), 2.0);
        assert_eq!(line_width(4.0), 1.0);
        assert_eq!(line_width(0.5), 4.0);
    }

    #[test]
    fn test_selected_shape_uses_select_colors() {
        let config = CanvasConfig::default();
        let mut shape = rect_shape();
        shape.selected = true;
        let overlay = shape_overlay(Some(1), &shape, true, 1.0, &config);
        assert_eq!(overlay.line_color, config.select_line_color);
        assert_eq!(overlay.fill, Some(config.select_fill_color));

        shape.selected = false;
        let overlay = shape_overlay(Some(1), &shape, false, 1.0, &config);
        assert_eq!(overlay.line_color, shape.line_color);
        assert_eq!(overlay.fill, None);
    }

    #[test]
    fn test_highlighted_vertex_marker() {
        let config = CanvasConfig::default();
        let mut shape = rect_shape();
        shape.highlight_vertex(2, HighlightMode::NearVertex);
        let overlay = shape_overlay(None, &shape, false, 2.0, &config);
        let base = config.point_size / 2.0;
        assert_eq!(overlay.vertices[0].size, base);
        assert_eq!(overlay.vertices[2].size, base * 4.0);
        assert_eq!(overlay.vertices[2].style, MarkerStyle::Round);
        assert_eq!(overlay.vertex_color, config.highlight_vertex_fill_color);

        shape.highlight_vertex(1, HighlightMode::MoveVertex);
        let overlay = shape_overlay(None, &shape, false, 2.0, &config);
        assert_eq!(overlay.vertices[1].size, base * 1.5);
        assert_eq!(overlay.vertices[1].style, MarkerStyle::Square);
    }

    #[test]
    fn test_label_text_pushed_below_top_edge() {
        let config = CanvasConfig::default();
        let mut shape = rect_shape();
        assert!(shape_overlay(None, &shape, false, 1.0, &config).label.is_none());
        shape.paint_label = true;
        let label = shape_overlay(None, &shape, false, 1.0, &config)
            .label
            .unwrap();
        assert_eq!(label.text, "dog");
        assert_eq!(label.position, Point::new(0.0, 14.0));
    }
}
