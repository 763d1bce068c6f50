//! Input and output events of the canvas.

use crate::geometry::Point;
use crate::model::ShapeId;
use crate::zoom_math::Orientation;

/// Pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// Buttons held during a pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl Buttons {
    pub const NONE: Buttons = Buttons {
        left: false,
        right: false,
        middle: false,
    };

    pub const LEFT: Buttons = Buttons {
        left: true,
        right: false,
        middle: false,
    };

    pub fn any(&self) -> bool {
        self.left || self.right || self.middle
    }
}

/// Keyboard modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
        alt: false,
    };
}

/// Keys the canvas reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    /// Held to toggle the square constraint.
    Constrain,
    Left,
    Right,
    Up,
    Down,
}

/// Cursor the host should show over the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Default,
    /// Creating a shape
    Draw,
    /// Over a vertex or edge
    Point,
    /// Over a shape body
    Grab,
    /// Dragging a shape
    Move,
}

/// Notifications queued for the hosting controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    /// A shape was finished and added on top; it awaits a label.
    NewShape(ShapeId),
    /// Geometry changed during an ongoing drag.
    ShapeMoved(ShapeId),
    /// A geometry change was committed (drag released, vertex removed, nudge).
    ShapeEdited(ShapeId),
    /// The selection changed.
    SelectionChanged(Option<ShapeId>),
    /// Shape creation started (`true`) or ended (`false`).
    DrawingToggled(bool),
    /// Scroll the view by a wheel delta.
    ScrollRequest {
        orientation: Orientation,
        delta: f32,
    },
    /// Zoom the view by a wheel delta around a widget position.
    ZoomRequest { delta: f32, position: Point },
}
