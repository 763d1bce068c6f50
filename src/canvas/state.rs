//! Interaction state of the canvas.

use crate::geometry::{EdgeHit, Point};
use crate::model::ShapeId;

/// Canvas mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Only new shapes can be drawn.
    Creating,
    /// Existing shapes can be selected, moved and reshaped.
    #[default]
    Editing,
}

/// What the pointer is hovering over.
///
/// A vertex and an edge are never hovered at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Hover {
    #[default]
    None,
    Vertex { shape: ShapeId, index: usize },
    Edge { shape: ShapeId, hit: EdgeHit },
    Shape(ShapeId),
}

impl Hover {
    /// Shape under the pointer, if any.
    pub fn shape(&self) -> Option<ShapeId> {
        match self {
            Hover::None => None,
            Hover::Vertex { shape, .. } | Hover::Edge { shape, .. } => Some(*shape),
            Hover::Shape(shape) => Some(*shape),
        }
    }

    pub fn vertex(&self) -> Option<usize> {
        match self {
            Hover::Vertex { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn edge(&self) -> Option<EdgeHit> {
        match self {
            Hover::Edge { hit, .. } => Some(*hit),
            _ => None,
        }
    }
}

/// Drag in progress in Editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Dragging one vertex.
    Vertex { shape: ShapeId, index: usize },
    /// Dragging a whole shape. `offsets` are the bounding box corners
    /// relative to the grab point.
    Shape {
        shape: ShapeId,
        offsets: (Point, Point),
    },
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        !matches!(self, DragState::Idle)
    }

    pub fn shape(&self) -> Option<ShapeId> {
        match self {
            DragState::Idle => None,
            DragState::Vertex { shape, .. } | DragState::Shape { shape, .. } => Some(*shape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hover_accessors() {
        let hover = Hover::Vertex { shape: 3, index: 1 };
        assert_eq!(hover.shape(), Some(3));
        assert_eq!(hover.vertex(), Some(1));
        assert!(hover.edge().is_none());
        assert_eq!(Hover::None.shape(), None);
    }

    #[test]
    fn test_drag_state() {
        assert!(!DragState::Idle.is_dragging());
        let drag = DragState::Vertex { shape: 2, index: 0 };
        assert!(drag.is_dragging());
        assert_eq!(drag.shape(), Some(2));
    }
}
