//! Interactive shape-editing canvas.
//!
//! The canvas owns the shapes of the open image and turns pointer and
//! keyboard input into shape edits. It is toolkit independent: the host
//! feeds it widget-space input, paints the [`Overlay`] it describes and
//! drains the [`CanvasEvent`]s it queues.
//!
//! Two modes exist. In [`Mode::Creating`] presses draw a new shape (a
//! rectangle from two corners, or a polygon vertex by vertex). In
//! [`Mode::Editing`] the pointer hovers, selects, drags and reshapes
//! existing shapes.

mod event;
mod overlay;
mod state;

pub use event::{Buttons, CanvasEvent, CursorShape, Key, Modifiers, PointerButton};
pub use overlay::{
    LabelText, MarkerStyle, Overlay, PreviewOverlay, ShapeOverlay, VertexMarker, line_width,
    shape_overlay,
};
pub use state::{DragState, Hover, Mode};

use std::collections::VecDeque;

use crate::color_utils::Color;
use crate::config::CanvasConfig;
use crate::constants::{COPY_SHIFT, MIN_POLYGON_VERTICES, RECTANGLE_VERTICES};
use crate::geometry::{self, Point, Rect, Size};
use crate::model::{HighlightMode, Shape, ShapeId, ShapeKind, ShapeStore};
use crate::zoom_math::{Orientation, ViewTransform};

/// The editing canvas for one image.
#[derive(Debug, Clone)]
pub struct Canvas {
    config: CanvasConfig,
    mode: Mode,
    shapes: ShapeStore,
    /// Shape being drawn
    current: Option<Shape>,
    /// Provisional next vertex while drawing
    preview: Option<Point>,
    crosshair: Option<Point>,
    selected: Option<ShapeId>,
    /// Selection as it was when the current drag started
    selected_copy: Option<Shape>,
    hover: Hover,
    drag: DragState,
    /// Last applied drag position in image space
    prev_point: Point,
    scale: f32,
    widget: Size,
    pixmap: Size,
    draw_square: bool,
    constrain_held: bool,
    hide_background: bool,
    hiding: bool,
    cursor: CursorShape,
    events: VecDeque<CanvasEvent>,
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            draw_square: config.draw_square,
            hide_background: config.hide_background,
            config,
            mode: Mode::Editing,
            shapes: ShapeStore::new(),
            current: None,
            preview: None,
            crosshair: None,
            selected: None,
            selected_copy: None,
            hover: Hover::None,
            drag: DragState::Idle,
            prev_point: Point::ZERO,
            scale: 1.0,
            widget: Size::default(),
            pixmap: Size::default(),
            constrain_held: false,
            hiding: false,
            cursor: CursorShape::Default,
            events: VecDeque::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode == Mode::Editing
    }

    pub fn is_drawing(&self) -> bool {
        self.mode == Mode::Creating
    }

    pub fn shapes(&self) -> &ShapeStore {
        &self.shapes
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Mutable access for label, color and flag edits.
    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(id)
    }

    /// Copy of the shape collection, IDs included.
    pub fn snapshot(&self) -> Vec<(ShapeId, Shape)> {
        self.shapes.snapshot()
    }

    /// Shape being drawn.
    pub fn current(&self) -> Option<&Shape> {
        self.current.as_ref()
    }

    /// Provisional point of the shape being drawn.
    pub fn preview(&self) -> Option<Point> {
        self.preview
    }

    pub fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selected.and_then(|id| self.shapes.get(id))
    }

    pub fn hover(&self) -> Hover {
        self.hover
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn cursor(&self) -> CursorShape {
        self.cursor
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pixmap_size(&self) -> Size {
        self.pixmap
    }

    /// Whether the square constraint is in effect, including the held
    /// constrain key.
    pub fn draw_square(&self) -> bool {
        self.draw_square != self.constrain_held
    }

    /// Current widget <-> image transform.
    pub fn transform(&self) -> ViewTransform {
        let scaled = Size::new(self.pixmap.width * self.scale, self.pixmap.height * self.scale);
        let widget = if self.widget.is_empty() {
            scaled
        } else {
            self.widget
        };
        ViewTransform::centered(self.scale, widget, self.pixmap)
    }

    /// Take every queued event.
    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        self.events.drain(..).collect()
    }

    // ========================================================================
    // Controller inputs
    // ========================================================================

    /// Show a new image. The shape collection is cleared.
    pub fn load_pixmap(&mut self, size: Size) {
        log::debug!("Loaded pixmap {}x{}", size.width, size.height);
        self.pixmap = size;
        self.shapes.clear();
        self.clear_interaction();
    }

    /// Replace the shape collection with loaded shapes.
    ///
    /// Vertices outside the image are clamped into it. Returns true if any
    /// vertex had to be clamped, in which case the document differs from
    /// what was loaded.
    pub fn load_shapes(&mut self, shapes: Vec<Shape>) -> bool {
        self.shapes.clear();
        self.clear_interaction();

        let mut clamped = false;
        for mut shape in shapes {
            if !self.pixmap.is_empty() {
                for index in 0..shape.len() {
                    let Some(v) = shape.vertex(index) else {
                        continue;
                    };
                    let (bounded, moved) = geometry::bounded_by(v, self.pixmap);
                    if moved {
                        shape.move_vertex_by(index, bounded - v);
                        clamped = true;
                    }
                }
            }
            shape.close();
            shape.selected = false;
            shape.highlight_clear();
            self.shapes.add(shape);
        }

        if clamped {
            log::warn!("Clamped loaded shapes into {}x{} image", self.pixmap.width, self.pixmap.height);
        }
        log::debug!("Loaded {} shapes", self.shapes.len());
        clamped
    }

    /// Restore a snapshot taken with [`Canvas::snapshot`].
    pub fn set_shapes(&mut self, shapes: Vec<(ShapeId, Shape)>) {
        self.shapes.restore(shapes);
        self.current = None;
        self.preview = None;
        self.selected_copy = None;
        self.drag = DragState::Idle;
        self.hover = Hover::None;

        if self.selected.is_some_and(|id| !self.shapes.contains(id)) {
            self.selected = None;
            self.emit(CanvasEvent::SelectionChanged(None));
        }
        let selected = self.selected;
        for (id, shape) in self.shapes.iter_mut() {
            shape.selected = Some(id) == selected;
            shape.highlight_clear();
        }
    }

    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        }
    }

    /// Size of the canvas widget, used to center small images.
    pub fn set_widget_size(&mut self, size: Size) {
        self.widget = size;
    }

    pub fn set_draw_square(&mut self, value: bool) {
        self.draw_square = value;
    }

    /// Only render the selected shape while drawing.
    pub fn set_hide_background(&mut self, value: bool) {
        self.hide_background = value;
        if self.current.is_some() {
            self.hiding = value;
        }
    }

    /// Switch between Editing (`true`) and Creating (`false`).
    pub fn set_editing(&mut self, value: bool) {
        let mode = if value { Mode::Editing } else { Mode::Creating };
        if mode == self.mode {
            return;
        }
        if value {
            self.cancel_current();
        } else {
            self.end_drag();
            self.set_hover(Hover::None);
            self.set_selection(None);
        }
        self.mode = mode;
        self.crosshair = None;
        self.cursor = CursorShape::Default;
        log::debug!("Canvas mode: {:?}", mode);
    }

    /// Forget the image and every shape.
    pub fn reset_state(&mut self) {
        self.pixmap = Size::default();
        self.shapes.clear();
        self.clear_interaction();
        self.cursor = CursorShape::Default;
    }

    /// Select a shape.
    pub fn select_shape(&mut self, id: ShapeId) -> bool {
        if !self.shapes.contains(id) {
            return false;
        }
        self.set_selection(Some(id));
        true
    }

    pub fn deselect(&mut self) {
        self.set_selection(None);
    }

    /// Show or hide a shape. Hidden shapes are neither painted nor hit.
    pub fn set_shape_visible(&mut self, id: ShapeId, visible: bool) -> bool {
        let Some(shape) = self.shapes.get_mut(id) else {
            return false;
        };
        shape.visible = visible;
        if !visible && self.hover.shape() == Some(id) {
            self.set_hover(Hover::None);
        }
        true
    }

    /// Duplicate the selection and select the copy.
    ///
    /// The copy is shifted by a couple of pixels so it is visible, in the
    /// direction that keeps it inside the image.
    pub fn copy_selected_shape(&mut self) -> Option<ShapeId> {
        let id = self.selected?;
        let mut copy = self.shapes.get(id)?.copy();
        let shift = Point::new(COPY_SHIFT, COPY_SHIFT);
        if self.fits_after(&copy, shift) {
            copy.move_by(shift);
        } else if self.fits_after(&copy, -shift) {
            copy.move_by(-shift);
        }
        let new_id = self.shapes.add(copy);
        self.set_selection(Some(new_id));
        log::debug!("Copied shape {} to {}", id, new_id);
        Some(new_id)
    }

    /// Remove and return the selected shape.
    pub fn delete_selected(&mut self) -> Option<(ShapeId, Shape)> {
        let id = self.selected?;
        self.end_drag();
        self.set_hover(Hover::None);
        self.set_selection(None);
        let shape = self.shapes.remove(id)?;
        log::debug!("Deleted shape {}", id);
        Some((id, shape))
    }

    /// Label a finished shape. Colors follow the label unless given.
    pub fn set_shape_label(
        &mut self,
        id: ShapeId,
        label: &str,
        line_color: Option<Color>,
        fill_color: Option<Color>,
    ) -> bool {
        let Some(shape) = self.shapes.get_mut(id) else {
            return false;
        };
        shape.set_label(label);
        if let Some(color) = line_color {
            shape.line_color = color;
        }
        if let Some(color) = fill_color {
            shape.fill_color = color;
        }
        true
    }

    /// Label the most recently added shape.
    pub fn set_last_label(
        &mut self,
        label: &str,
        line_color: Option<Color>,
        fill_color: Option<Color>,
    ) -> Option<ShapeId> {
        let id = self.shapes.last_id()?;
        self.set_shape_label(id, label, line_color, fill_color).then_some(id)
    }

    /// Remove a shape entirely (its labeling was cancelled).
    pub fn discard_shape(&mut self, id: ShapeId) -> Option<Shape> {
        if self.selected == Some(id) {
            self.set_selection(None);
        }
        if self.hover.shape() == Some(id) {
            self.hover = Hover::None;
        }
        let shape = self.shapes.remove(id)?;
        log::debug!("Discarded shape {}", id);
        Some(shape)
    }

    /// Remove the most recently added shape entirely.
    pub fn discard_last_shape(&mut self) -> Option<(ShapeId, Shape)> {
        let id = self.shapes.last_id()?;
        self.discard_shape(id).map(|shape| (id, shape))
    }

    /// Remove the last entered vertex of the shape being drawn.
    ///
    /// Removing the only vertex cancels the shape.
    pub fn undo_last_point(&mut self) -> bool {
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        current.pop_point();
        if current.is_empty() {
            self.cancel_current();
        } else {
            self.preview = current.last();
        }
        true
    }

    /// Move the selection by `delta` if it stays inside the image.
    pub fn nudge_selected(&mut self, delta: Point) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(shape) = self.shapes.get(id) else {
            return false;
        };
        if !self.fits_after(shape, delta) {
            return false;
        }
        if let Some(shape) = self.shapes.get_mut(id) {
            shape.move_by(delta);
        }
        self.emit(CanvasEvent::ShapeMoved(id));
        self.emit(CanvasEvent::ShapeEdited(id));
        true
    }

    /// Finish the polygon being drawn.
    pub fn finish_polygon(&mut self) -> Option<ShapeId> {
        let ready = self
            .current
            .as_ref()
            .is_some_and(|c| c.kind == ShapeKind::Polygon && c.len() >= MIN_POLYGON_VERTICES);
        if ready { self.finalise() } else { None }
    }

    // ========================================================================
    // Pointer and keyboard input
    // ========================================================================

    /// Pointer moved to `widget_pos` with `buttons` held.
    pub fn pointer_move(&mut self, widget_pos: Point, buttons: Buttons) {
        let raw = self.to_image(widget_pos);
        let pos = self.clamp(raw);
        log::trace!("pointer move ({}, {})", pos.x, pos.y);

        match self.mode {
            Mode::Creating => self.move_while_creating(pos),
            Mode::Editing => {
                if buttons.left && self.drag.is_dragging() {
                    self.drag_to(pos);
                } else if !buttons.any() {
                    self.update_hover(raw);
                }
            }
        }
    }

    pub fn pointer_press(&mut self, widget_pos: Point, button: PointerButton) {
        let raw = self.to_image(widget_pos);
        let pos = self.clamp(raw);

        match (self.mode, button) {
            (Mode::Creating, PointerButton::Left) => self.press_while_creating(pos),
            (Mode::Editing, PointerButton::Left) => self.press_while_editing(raw, pos),
            (Mode::Editing, PointerButton::Right) => {
                self.update_hover(raw);
                let target = self.hover.shape();
                self.set_selection(target);
            }
            _ => {}
        }
    }

    pub fn pointer_release(&mut self, widget_pos: Point, button: PointerButton) {
        if button != PointerButton::Left {
            return;
        }
        let pos = self.clamp(self.to_image(widget_pos));

        match self.mode {
            Mode::Creating => {
                // Press-drag-release draws a rectangle in one gesture.
                let anchor = match &self.current {
                    Some(c) if c.kind == ShapeKind::Rectangle && c.len() == 1 => c.first(),
                    _ => None,
                };
                if let Some(anchor) = anchor {
                    let target = self.rectangle_target(anchor, pos);
                    if target != anchor {
                        self.preview = Some(target);
                        self.finish_rectangle();
                    }
                }
            }
            Mode::Editing => self.end_drag(),
        }
    }

    pub fn double_press(&mut self, widget_pos: Point, button: PointerButton) {
        if button != PointerButton::Left {
            return;
        }
        match self.mode {
            Mode::Creating => {
                self.finish_polygon();
            }
            Mode::Editing => {
                let raw = self.to_image(widget_pos);
                self.update_hover(raw);
                let Hover::Vertex { shape, index } = self.hover else {
                    return;
                };
                let removed = self
                    .shapes
                    .get_mut(shape)
                    .and_then(|s| s.remove_vertex(index));
                if removed.is_some() {
                    log::debug!("Removed vertex {} of shape {}", index, shape);
                    self.set_hover(Hover::None);
                    self.emit(CanvasEvent::ShapeEdited(shape));
                } else {
                    log::debug!("Shape {} keeps its last {} vertices", shape, MIN_POLYGON_VERTICES);
                }
            }
        }
    }

    pub fn key_press(&mut self, key: Key) {
        match key {
            Key::Escape => {
                if self.current.is_some() {
                    self.cancel_current();
                } else if self.drag.is_dragging() {
                    self.revert_drag();
                }
            }
            Key::Enter => {
                if self.is_drawing() {
                    self.finish_polygon();
                }
            }
            Key::Constrain => self.constrain_held = true,
            Key::Left => self.nudge_key(Point::new(-1.0, 0.0)),
            Key::Right => self.nudge_key(Point::new(1.0, 0.0)),
            Key::Up => self.nudge_key(Point::new(0.0, -1.0)),
            Key::Down => self.nudge_key(Point::new(0.0, 1.0)),
        }
    }

    pub fn key_release(&mut self, key: Key) {
        if key == Key::Constrain {
            self.constrain_held = false;
        }
    }

    /// Mouse wheel. Control + vertical wheel zooms, anything else scrolls.
    pub fn wheel(&mut self, delta: Point, modifiers: Modifiers, widget_pos: Point) {
        if modifiers.ctrl && delta.y != 0.0 {
            self.emit(CanvasEvent::ZoomRequest {
                delta: delta.y,
                position: widget_pos,
            });
            return;
        }
        if delta.y != 0.0 {
            self.emit(CanvasEvent::ScrollRequest {
                orientation: Orientation::Vertical,
                delta: delta.y,
            });
        }
        if delta.x != 0.0 {
            self.emit(CanvasEvent::ScrollRequest {
                orientation: Orientation::Horizontal,
                delta: delta.x,
            });
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Describe the current frame.
    pub fn overlay(&self) -> Overlay {
        let mut overlay = Overlay::new(self.transform(), self.pixmap);
        let hovered = self.hover.shape();

        for (id, shape) in self.shapes.iter() {
            if !shape.visible || (self.hiding && !shape.selected) {
                continue;
            }
            let fill = shape.selected || hovered == Some(id);
            overlay.push(shape_overlay(Some(id), shape, fill, self.scale, &self.config));
        }

        if let Some(current) = &self.current {
            let mut drawn = shape_overlay(None, current, false, self.scale, &self.config);
            drawn.line_color = self.config.drawing_line_color;
            overlay.current = Some(drawn);

            if let (Some(first), Some(last), Some(target)) =
                (current.first(), current.last(), self.preview)
            {
                let closing = current.len() > 1 && target == first;
                let rect = (current.kind == ShapeKind::Rectangle)
                    .then(|| Rect::from_corners(first, target));
                overlay.preview = Some(PreviewOverlay {
                    line: (last, target),
                    color: if closing {
                        current.line_color
                    } else {
                        self.config.drawing_line_color
                    },
                    rect,
                });
            }
        }

        if self.is_drawing() {
            overlay.crosshair = self.crosshair;
        }
        overlay
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn emit(&mut self, event: CanvasEvent) {
        log::trace!("canvas event {:?}", event);
        self.events.push_back(event);
    }

    fn to_image(&self, widget_pos: Point) -> Point {
        self.transform().to_image(widget_pos)
    }

    fn clamp(&self, point: Point) -> Point {
        if self.pixmap.is_empty() {
            point
        } else {
            geometry::bounded_by(point, self.pixmap).0
        }
    }

    /// Hit radius in image units.
    fn epsilon(&self) -> f32 {
        self.transform().image_distance(self.config.vertex_epsilon)
    }

    fn fits_after(&self, shape: &Shape, delta: Point) -> bool {
        self.pixmap.is_empty()
            || shape
                .vertices()
                .iter()
                .all(|v| geometry::is_within(*v + delta, self.pixmap))
    }

    fn clear_interaction(&mut self) {
        self.current = None;
        self.preview = None;
        self.crosshair = None;
        self.selected = None;
        self.selected_copy = None;
        self.hover = Hover::None;
        self.drag = DragState::Idle;
        self.hiding = false;
    }

    fn set_selection(&mut self, id: Option<ShapeId>) {
        if self.selected == id {
            return;
        }
        if let Some(prev) = self.selected.and_then(|p| self.shapes.get_mut(p)) {
            prev.selected = false;
        }
        if let Some(shape) = id.and_then(|i| self.shapes.get_mut(i)) {
            shape.selected = true;
        }
        self.selected = id;
        self.emit(CanvasEvent::SelectionChanged(id));
    }

    fn set_hover(&mut self, hover: Hover) {
        if let Some(prev) = self.hover.shape().and_then(|id| self.shapes.get_mut(id)) {
            prev.highlight_clear();
        }
        if let Hover::Vertex { shape, index } = hover
            && let Some(s) = self.shapes.get_mut(shape)
        {
            s.highlight_vertex(index, HighlightMode::NearVertex);
        }
        self.cursor = match hover {
            Hover::None => CursorShape::Default,
            Hover::Vertex { .. } | Hover::Edge { .. } => CursorShape::Point,
            Hover::Shape(_) => CursorShape::Grab,
        };
        self.hover = hover;
    }

    /// Recompute the hover target at `point`.
    ///
    /// The selection is tested first, then the other shapes top-down. Within
    /// a shape a vertex beats an edge, which beats the body. Only polygons
    /// expose edges for hover and vertex insertion.
    fn update_hover(&mut self, point: Point) {
        let epsilon = self.epsilon();
        let selected = self.selected;
        let hiding = self.hiding;

        let candidates = selected.into_iter().chain(
            self.shapes
                .iter()
                .rev()
                .map(|(id, _)| id)
                .filter(|id| Some(*id) != selected),
        );

        let mut hover = Hover::None;
        for id in candidates {
            let Some(shape) = self.shapes.get(id) else {
                continue;
            };
            if !shape.visible || (hiding && !shape.selected) {
                continue;
            }
            if let Some(index) = shape.nearest_vertex(point, epsilon) {
                hover = Hover::Vertex { shape: id, index };
                break;
            }
            if shape.kind == ShapeKind::Polygon
                && let Some(hit) = shape.nearest_edge(point, epsilon)
            {
                hover = Hover::Edge { shape: id, hit };
                break;
            }
            if shape.contains_point(point) {
                hover = Hover::Shape(id);
                break;
            }
        }
        self.set_hover(hover);
    }

    fn move_while_creating(&mut self, pos: Point) {
        self.cursor = CursorShape::Draw;
        self.crosshair = Some(pos);

        let epsilon = self.epsilon();
        let Some(current) = self.current.as_ref() else {
            return;
        };
        let Some(first) = current.first() else {
            return;
        };
        let kind = current.kind;
        let closing = kind == ShapeKind::Polygon
            && current.len() > 1
            && geometry::distance(pos, first) <= epsilon;

        let target = if closing {
            first
        } else if kind == ShapeKind::Rectangle {
            self.rectangle_target(first, pos)
        } else {
            pos
        };

        if let Some(current) = self.current.as_mut() {
            if closing {
                current.highlight_vertex(0, HighlightMode::NearVertex);
            } else {
                current.highlight_clear();
            }
        }
        if closing {
            self.cursor = CursorShape::Point;
        }
        self.preview = Some(target);
    }

    /// Opposite corner of a rectangle anchored at `anchor`, honoring the
    /// square constraint.
    fn rectangle_target(&self, anchor: Point, pos: Point) -> Point {
        if self.draw_square() {
            self.fitted_square(anchor, pos)
        } else {
            pos
        }
    }

    /// Square corner towards `pos`, shrunk so the square stays inside the
    /// image.
    fn fitted_square(&self, anchor: Point, pos: Point) -> Point {
        let corner = geometry::square_corner(anchor, pos);
        if self.pixmap.is_empty() || geometry::is_within(corner, self.pixmap) {
            return corner;
        }
        let dx = corner.x - anchor.x;
        let dy = corner.y - anchor.y;
        let sx = if dx < 0.0 { -1.0 } else { 1.0 };
        let sy = if dy < 0.0 { -1.0 } else { 1.0 };
        let room_x = if sx < 0.0 {
            anchor.x
        } else {
            self.pixmap.width - anchor.x
        };
        let room_y = if sy < 0.0 {
            anchor.y
        } else {
            self.pixmap.height - anchor.y
        };
        let side = dx.abs().min(room_x).min(room_y).max(0.0);
        Point::new(anchor.x + sx * side, anchor.y + sy * side)
    }

    fn press_while_creating(&mut self, pos: Point) {
        let epsilon = self.epsilon();
        let state = self
            .current
            .as_ref()
            .map(|c| (c.kind, c.first(), c.last(), c.len()));
        match state {
            None => self.start_shape(pos),
            Some((ShapeKind::Rectangle, Some(anchor), _, _)) => {
                self.preview = Some(self.rectangle_target(anchor, pos));
                self.finish_rectangle();
            }
            Some((ShapeKind::Polygon, Some(first), last, len)) => {
                if len >= MIN_POLYGON_VERTICES && geometry::distance(pos, first) <= epsilon {
                    self.finalise();
                } else if last != Some(pos)
                    && let Some(current) = self.current.as_mut()
                {
                    current.add_point(pos);
                    self.preview = Some(pos);
                }
            }
            Some((_, None, _, _)) => self.start_shape(pos),
        }
    }

    fn start_shape(&mut self, pos: Point) {
        let kind = self.config.create_kind;
        let mut shape = Shape::new("", kind);
        shape.add_point(pos);
        self.current = Some(shape);
        self.preview = Some(pos);
        self.hiding = self.hide_background;
        log::debug!("Started {} at ({}, {})", kind.name(), pos.x, pos.y);
        self.emit(CanvasEvent::DrawingToggled(true));
    }

    /// Complete a rectangle from its anchor and the preview corner.
    ///
    /// Vertices run anchor, (target.x, anchor.y), target, (anchor.x, target.y).
    fn finish_rectangle(&mut self) {
        let Some(target) = self.preview else {
            return;
        };
        let Some(current) = self.current.as_mut() else {
            return;
        };
        let Some(anchor) = current.first() else {
            return;
        };
        if current.len() != 1 {
            return;
        }
        current.add_point(Point::new(target.x, anchor.y));
        current.add_point(target);
        current.add_point(Point::new(anchor.x, target.y));
        self.finalise();
    }

    /// Close the shape being drawn and move it into the collection.
    ///
    /// Shapes with fewer than three vertices or an empty area are discarded.
    fn finalise(&mut self) -> Option<ShapeId> {
        let mut shape = self.current.take()?;
        self.preview = None;
        self.hiding = false;
        shape.highlight_clear();
        self.emit(CanvasEvent::DrawingToggled(false));

        let degenerate = shape.len() < MIN_POLYGON_VERTICES
            || shape
                .bounding_rect()
                .is_none_or(|r| r.width <= 0.0 || r.height <= 0.0);
        if degenerate {
            log::warn!(
                "Discarding degenerate {} with {} vertices",
                shape.kind.name(),
                shape.len()
            );
            return None;
        }

        shape.close();
        let kind = shape.kind;
        let id = self.shapes.add(shape);
        log::debug!("Finished {} {}", kind.name(), id);
        self.emit(CanvasEvent::NewShape(id));
        Some(id)
    }

    fn cancel_current(&mut self) {
        if self.current.take().is_some() {
            self.preview = None;
            self.hiding = false;
            log::debug!("Cancelled shape creation");
            self.emit(CanvasEvent::DrawingToggled(false));
        }
    }

    fn press_while_editing(&mut self, raw: Point, pos: Point) {
        self.update_hover(raw);
        self.prev_point = pos;

        match self.hover {
            Hover::Vertex { shape, index } => {
                self.begin_drag(shape);
                if let Some(s) = self.shapes.get_mut(shape) {
                    s.highlight_vertex(index, HighlightMode::MoveVertex);
                }
                self.drag = DragState::Vertex { shape, index };
                self.cursor = CursorShape::Point;
            }
            Hover::Edge { shape, hit } => {
                self.begin_drag(shape);
                let index = hit.index + 1;
                if let Some(s) = self.shapes.get_mut(shape) {
                    s.insert_vertex(index, hit.foot);
                    s.highlight_vertex(index, HighlightMode::MoveVertex);
                }
                log::debug!("Inserted vertex {} on edge {} of shape {}", index, hit.index, shape);
                self.hover = Hover::Vertex { shape, index };
                self.drag = DragState::Vertex { shape, index };
                self.cursor = CursorShape::Point;
            }
            Hover::Shape(shape) => {
                self.begin_drag(shape);
                let offsets = self
                    .shapes
                    .get(shape)
                    .and_then(Shape::bounding_rect)
                    .map(|r| (r.top_left() - pos, r.bottom_right() - pos))
                    .unwrap_or((Point::ZERO, Point::ZERO));
                self.drag = DragState::Shape { shape, offsets };
                self.cursor = CursorShape::Move;
            }
            Hover::None => self.set_selection(None),
        }
    }

    fn begin_drag(&mut self, shape: ShapeId) {
        self.set_selection(Some(shape));
        self.selected_copy = self.shapes.get(shape).map(Shape::copy);
    }

    fn drag_to(&mut self, pos: Point) {
        match self.drag {
            DragState::Idle => {}
            DragState::Vertex { shape, index } => {
                let Some(s) = self.shapes.get(shape) else {
                    return;
                };
                let before = s.vertices().to_vec();
                let rectangle = s.kind == ShapeKind::Rectangle && s.len() == RECTANGLE_VERTICES;
                let anchor = s.vertex((index + 2) % RECTANGLE_VERTICES);
                let current = s.vertex(index);

                let target = match anchor {
                    Some(anchor) if rectangle && self.draw_square() => {
                        self.fitted_square(anchor, pos)
                    }
                    _ => pos,
                };
                let Some(s) = self.shapes.get_mut(shape) else {
                    return;
                };
                if rectangle {
                    s.reshape_rectangle(index, target, false);
                } else if let Some(current) = current {
                    s.move_vertex_by(index, target - current);
                }
                if s.vertices() != before.as_slice() {
                    self.emit(CanvasEvent::ShapeMoved(shape));
                }
            }
            DragState::Shape { shape, offsets } => {
                if self.bounded_move_shape(shape, pos, offsets) {
                    self.cursor = CursorShape::Move;
                    self.emit(CanvasEvent::ShapeMoved(shape));
                }
            }
        }
    }

    /// Move a whole shape with the pointer, keeping its bounding box inside
    /// the image.
    fn bounded_move_shape(&mut self, id: ShapeId, pos: Point, offsets: (Point, Point)) -> bool {
        let mut pos = pos;
        if !self.pixmap.is_empty() {
            if !geometry::is_within(pos, self.pixmap) {
                return false;
            }
            let o1 = pos + offsets.0;
            if !geometry::is_within(o1, self.pixmap) {
                pos -= Point::new(o1.x.min(0.0), o1.y.min(0.0));
            }
            let o2 = pos + offsets.1;
            if !geometry::is_within(o2, self.pixmap) {
                pos += Point::new(
                    (self.pixmap.width - o2.x).min(0.0),
                    (self.pixmap.height - o2.y).min(0.0),
                );
            }
        }

        let delta = pos - self.prev_point;
        if !delta.is_nonzero() {
            return false;
        }
        let Some(shape) = self.shapes.get_mut(id) else {
            return false;
        };
        shape.move_by(delta);
        self.prev_point = pos;
        true
    }

    fn end_drag(&mut self) {
        let Some(id) = self.drag.shape() else {
            return;
        };
        self.drag = DragState::Idle;
        let copy = self.selected_copy.take();

        let hovered_vertex = match self.hover {
            Hover::Vertex { shape, index } if shape == id => Some(index),
            _ => None,
        };
        let Some(shape) = self.shapes.get_mut(id) else {
            return;
        };
        match hovered_vertex {
            Some(index) => shape.highlight_vertex(index, HighlightMode::NearVertex),
            None => shape.highlight_clear(),
        }
        let changed = copy.is_some_and(|c| c.vertices() != shape.vertices());

        self.cursor = if hovered_vertex.is_some() {
            CursorShape::Point
        } else {
            CursorShape::Grab
        };
        if changed {
            log::debug!("Committed edit of shape {}", id);
            self.emit(CanvasEvent::ShapeEdited(id));
        }
    }

    fn revert_drag(&mut self) {
        let Some(id) = self.drag.shape() else {
            return;
        };
        self.drag = DragState::Idle;
        let Some(copy) = self.selected_copy.take() else {
            return;
        };
        if let Some(shape) = self.shapes.get_mut(id) {
            let selected = shape.selected;
            *shape = copy;
            shape.selected = selected;
        }
        self.hover = Hover::None;
        self.cursor = CursorShape::Default;
        log::debug!("Reverted drag of shape {}", id);
    }

    fn nudge_key(&mut self, delta: Point) {
        if self.is_editing() && !self.drag.is_dragging() {
            self.nudge_selected(delta);
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}
