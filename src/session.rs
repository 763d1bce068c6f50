//! Edit session: the controller around a [`Canvas`].
//!
//! The session consumes canvas events and applies the labeling policies
//! (prompt, default label, single class), keeps the label history, tracks
//! unsaved changes, owns the undo history of committed edits, and moves
//! documents between the canvas and annotation files.

use std::path::{Path, PathBuf};

use crate::canvas::{Canvas, CanvasEvent};
use crate::color_utils::Color;
use crate::config::{EditorConfig, SessionConfig};
use crate::format::{
    AnnotationDocument, FormatContext, FormatError, FormatRegistry, ImageSize, LabelFormat,
    SaveReport, ShapeRecord, records_for_save,
};
use crate::geometry::{Point, Size};
use crate::model::{Shape, ShapeId, confirmed_label};
use crate::undo::UndoStack;
use crate::zoom_math::{Viewport, ZoomMode};

/// Source of labels for newly drawn shapes, usually a dialog.
pub trait LabelPrompt {
    /// Ask for a label. `suggestion` prefills the input and `history` lists
    /// the known labels. `None` cancels the new shape.
    fn ask_label(&mut self, suggestion: &str, history: &[String]) -> Option<String>;
}

impl<F> LabelPrompt for F
where
    F: FnMut(&str, &[String]) -> Option<String>,
{
    fn ask_label(&mut self, suggestion: &str, history: &[String]) -> Option<String> {
        self(suggestion, history)
    }
}

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Annotation file error: {0}")]
    Format(#[from] FormatError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No image is open")]
    NoImage,
}

type Snapshot = Vec<(ShapeId, Shape)>;

/// Editing state of one open image.
pub struct EditSession {
    config: SessionConfig,
    canvas: Canvas,
    viewport: Viewport,
    registry: FormatRegistry,
    format_id: &'static str,

    /// Known labels, predefined ones first
    label_history: Vec<String>,
    /// Suggestion for the next prompt
    prev_label: String,
    /// Label reused in single-class mode
    last_label: Option<String>,
    label_filter: Option<String>,
    paint_labels: bool,

    image_path: Option<PathBuf>,
    image_size: Option<ImageSize>,
    annotation_path: Option<PathBuf>,
    verified: bool,
    dirty: bool,
    /// Dirty flag from before an uncommitted drag started
    dirty_before_drag: Option<bool>,

    undo_stack: UndoStack<Snapshot>,
    /// Shapes as of the last committed change
    committed: Snapshot,
}

impl EditSession {
    pub fn new(config: EditorConfig) -> Self {
        let registry = FormatRegistry::new();
        let format_id = registry.default_format().id();
        let mut label_history: Vec<String> = Vec::new();
        for label in &config.session.predefined_labels {
            if !label.is_empty() && !label_history.contains(label) {
                label_history.push(label.clone());
            }
        }

        Self {
            undo_stack: UndoStack::new(config.session.undo_history_size),
            paint_labels: config.canvas.paint_labels,
            canvas: Canvas::new(config.canvas),
            viewport: Viewport::new(config.zoom),
            config: config.session,
            registry,
            format_id,
            label_history,
            prev_label: String::new(),
            last_label: None,
            label_filter: None,
            image_path: None,
            image_size: None,
            annotation_path: None,
            verified: false,
            dirty: false,
            dirty_before_drag: None,
            committed: Vec::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The canvas, for feeding pointer and key input.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn label_history(&self) -> &[String] {
        &self.label_history
    }

    /// Label suggested by the next prompt.
    pub fn prev_label(&self) -> &str {
        &self.prev_label
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn is_beginner(&self) -> bool {
        self.config.beginner_mode
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    pub fn annotation_path(&self) -> Option<&Path> {
        self.annotation_path.as_deref()
    }

    pub fn label_filter(&self) -> Option<&str> {
        self.label_filter.as_deref()
    }

    pub fn paint_labels(&self) -> bool {
        self.paint_labels
    }

    /// Format used for saving.
    pub fn format(&self) -> &dyn LabelFormat {
        self.format_by_id(self.format_id)
    }

    /// Choose the save format by ID.
    pub fn set_format(&mut self, id: &str) -> bool {
        let Some(format) = self.registry.get(id) else {
            log::warn!("Unknown annotation format '{}'", id);
            return false;
        };
        self.format_id = format.id();
        log::debug!("Annotation format: {}", self.format_id);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.can_redo()
    }

    // ========================================================================
    // Canvas events
    // ========================================================================

    /// Handle every event the canvas queued and return them for the host.
    ///
    /// Handling an event can make the canvas queue more (switching modes
    /// changes the selection, for instance); those are handled too.
    pub fn process_events(&mut self, prompt: &mut dyn LabelPrompt) -> Vec<CanvasEvent> {
        let mut handled = Vec::new();
        loop {
            let events = self.canvas.drain_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.handle_event(event, prompt);
                handled.push(event);
            }
        }
        // A drag that ended without a commit was reverted
        if !self.canvas.drag().is_dragging()
            && let Some(dirty) = self.dirty_before_drag.take()
        {
            self.dirty = dirty;
        }
        handled
    }

    fn handle_event(&mut self, event: CanvasEvent, prompt: &mut dyn LabelPrompt) {
        match event {
            CanvasEvent::NewShape(id) => self.label_new_shape(id, prompt),
            CanvasEvent::ShapeMoved(_) => {
                self.dirty_before_drag.get_or_insert(self.dirty);
                self.dirty = true;
            }
            CanvasEvent::ShapeEdited(id) => {
                log::debug!("Shape {} edited", id);
                self.commit();
            }
            CanvasEvent::SelectionChanged(selection) => {
                log::debug!("Selection: {:?}", selection);
            }
            CanvasEvent::DrawingToggled(drawing) => {
                // A finished or cancelled creation returns to editing
                if !drawing && self.config.beginner_mode && !self.canvas.is_editing() {
                    self.canvas.set_editing(true);
                }
            }
            CanvasEvent::ScrollRequest { orientation, delta } => {
                self.viewport.scroll(orientation, delta);
            }
            CanvasEvent::ZoomRequest { delta, position } => {
                // Widget position relative to the visible area
                let cursor = Point::new(
                    position.x - self.viewport.horizontal.value,
                    position.y - self.viewport.vertical.value,
                );
                self.viewport.zoom_at_cursor(delta, cursor);
                self.sync_view();
            }
        }
    }

    fn label_new_shape(&mut self, id: ShapeId, prompt: &mut dyn LabelPrompt) {
        let text = match self.policy_label() {
            Some(label) => Some(label),
            None => {
                let answer = prompt
                    .ask_label(&self.prev_label, &self.label_history)
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty());
                self.last_label = answer.clone();
                answer
            }
        };

        let Some(text) = text else {
            log::debug!("Labeling cancelled, discarding shape {}", id);
            self.canvas.discard_shape(id);
            if self.config.beginner_mode {
                self.canvas.set_editing(true);
            }
            return;
        };

        self.prev_label = text.clone();
        if !self.canvas.set_shape_label(id, &text, None, None) {
            log::warn!("Shape {} vanished before it was labeled", id);
            return;
        }
        if let Some(shape) = self.canvas.shape_mut(id) {
            shape.difficult = false;
            shape.paint_label = self.paint_labels;
        }
        self.add_label(&text);
        if self.config.beginner_mode {
            self.canvas.set_editing(true);
        }
        log::info!("Labeled shape {} as '{}'", id, text);
        self.commit();
    }

    /// Label chosen without prompting, if a policy applies.
    fn policy_label(&self) -> Option<String> {
        if self.config.use_default_label
            && let Some(label) = self.config.default_label.as_ref().filter(|l| !l.is_empty())
        {
            return Some(label.clone());
        }
        if self.config.single_class {
            return self.last_label.clone();
        }
        None
    }

    fn add_label(&mut self, label: &str) {
        if !self.label_history.iter().any(|l| l == label) {
            self.label_history.push(label.to_string());
        }
    }

    // ========================================================================
    // Modes and policies
    // ========================================================================

    /// Start drawing new shapes.
    pub fn set_create_mode(&mut self) {
        self.canvas.set_editing(false);
    }

    /// Return to selecting and editing shapes.
    pub fn set_edit_mode(&mut self) {
        self.canvas.set_editing(true);
    }

    /// Beginner flow returns to editing after each shape.
    pub fn set_beginner(&mut self, value: bool) {
        self.config.beginner_mode = value;
    }

    pub fn set_single_class(&mut self, value: bool) {
        self.config.single_class = value;
        if !value {
            self.last_label = None;
        }
    }

    /// Label new shapes with `label` without prompting; `None` prompts again.
    pub fn set_default_label(&mut self, label: Option<String>) {
        self.config.use_default_label = label.is_some();
        self.config.default_label = label;
    }

    // ========================================================================
    // Shape edits
    // ========================================================================

    /// Rename a shape. Its colors follow the new label.
    pub fn edit_label(&mut self, id: ShapeId, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(shape) = self.canvas.shape_mut(id) else {
            return false;
        };
        if shape.label == text {
            return false;
        }
        shape.set_label(text);
        self.add_label(text);
        self.commit();
        true
    }

    pub fn set_difficult(&mut self, id: ShapeId, difficult: bool) -> bool {
        let Some(shape) = self.canvas.shape_mut(id) else {
            return false;
        };
        if shape.difficult == difficult {
            return false;
        }
        shape.difficult = difficult;
        self.commit();
        true
    }

    /// Set the outline color of the selection.
    pub fn set_line_color(&mut self, color: Color) -> bool {
        let Some(id) = self.canvas.selected() else {
            return false;
        };
        if let Some(shape) = self.canvas.shape_mut(id) {
            shape.line_color = color;
        }
        self.commit();
        true
    }

    /// Set the fill color of the selection.
    pub fn set_fill_color(&mut self, color: Color) -> bool {
        let Some(id) = self.canvas.selected() else {
            return false;
        };
        if let Some(shape) = self.canvas.shape_mut(id) {
            shape.fill_color = color;
        }
        self.commit();
        true
    }

    pub fn delete_selected(&mut self) -> Option<ShapeId> {
        let (id, shape) = self.canvas.delete_selected()?;
        log::info!("Deleted shape {} '{}'", id, shape.label);
        self.commit();
        Some(id)
    }

    /// Duplicate the selection; the copy becomes the selection.
    pub fn copy_selected(&mut self) -> Option<ShapeId> {
        let id = self.canvas.copy_selected_shape()?;
        if let Some(shape) = self.canvas.shape_mut(id) {
            shape.paint_label = self.paint_labels;
        }
        self.commit();
        Some(id)
    }

    /// Confirm a machine-suggested label by stripping its `auto_<score>_`
    /// prefix.
    pub fn promote_auto_label(&mut self, id: ShapeId) -> bool {
        if !self.promote(id) {
            return false;
        }
        self.commit();
        true
    }

    /// Confirm every visible machine-suggested label. Returns the count.
    pub fn promote_all_visible_auto_labels(&mut self) -> usize {
        let ids: Vec<ShapeId> = self
            .canvas
            .shapes()
            .iter()
            .filter(|(_, shape)| shape.visible && shape.is_auto_label())
            .map(|(id, _)| id)
            .collect();
        let promoted = ids.into_iter().filter(|id| self.promote(*id)).count();
        if promoted > 0 {
            self.commit();
        }
        promoted
    }

    fn promote(&mut self, id: ShapeId) -> bool {
        let Some(shape) = self.canvas.shape_mut(id) else {
            return false;
        };
        let Some(label) = confirmed_label(&shape.label).map(str::to_string) else {
            return false;
        };
        if label.is_empty() {
            return false;
        }
        log::debug!("Promoted '{}' to '{}'", shape.label, label);
        shape.set_label(label.as_str());
        self.add_label(&label);
        true
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    pub fn set_shape_visible(&mut self, id: ShapeId, visible: bool) -> bool {
        self.canvas.set_shape_visible(id, visible)
    }

    pub fn toggle_all_visible(&mut self, visible: bool) {
        for id in self.canvas.shapes().ids() {
            self.canvas.set_shape_visible(id, visible);
        }
    }

    /// Show only shapes labeled `label`, or every shape for `None`.
    pub fn filter_by_label(&mut self, label: Option<&str>) {
        self.label_filter = label.map(str::to_string);
        let visibility: Vec<(ShapeId, bool)> = self
            .canvas
            .shapes()
            .iter()
            .map(|(id, shape)| (id, label.is_none_or(|l| shape.label == l)))
            .collect();
        for (id, visible) in visibility {
            self.canvas.set_shape_visible(id, visible);
        }
    }

    /// Distinct labels on the canvas, in drawing order.
    pub fn unique_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for (_, shape) in self.canvas.shapes().iter() {
            if !labels.contains(&shape.label) {
                labels.push(shape.label.clone());
            }
        }
        labels
    }

    pub fn set_paint_labels(&mut self, value: bool) {
        self.paint_labels = value;
        for id in self.canvas.shapes().ids() {
            if let Some(shape) = self.canvas.shape_mut(id) {
                shape.paint_label = value;
            }
        }
    }

    /// Flip the reviewed flag stored with the annotations.
    pub fn toggle_verified(&mut self) -> bool {
        self.verified = !self.verified;
        self.mark_dirty();
        self.verified
    }

    // ========================================================================
    // Undo
    // ========================================================================

    /// Record the canvas as a committed state.
    fn commit(&mut self) {
        self.dirty_before_drag = None;
        let previous = std::mem::replace(&mut self.committed, self.canvas.snapshot());
        self.undo_stack.push(previous);
        self.mark_dirty();
    }

    pub fn undo(&mut self) -> bool {
        if self.canvas.is_drawing() {
            return false;
        }
        let current = self.canvas.snapshot();
        let Some(previous) = self.undo_stack.undo(current) else {
            return false;
        };
        self.restore(previous);
        log::info!("Undo performed");
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.canvas.is_drawing() {
            return false;
        }
        let current = self.canvas.snapshot();
        let Some(next) = self.undo_stack.redo(current) else {
            return false;
        };
        self.restore(next);
        log::info!("Redo performed");
        true
    }

    fn restore(&mut self, shapes: Snapshot) {
        self.canvas.set_shapes(shapes);
        self.committed = self.canvas.snapshot();
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        if self.config.auto_save
            && self.image_path.is_some()
            && let Err(e) = self.save()
        {
            log::warn!("Auto-save failed: {}", e);
        }
    }

    // ========================================================================
    // View
    // ========================================================================

    /// Resize the visible area of the scroll view.
    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport.set_viewport_size(size);
        self.sync_view();
    }

    pub fn set_zoom(&mut self, percent: f32) {
        self.viewport.set_zoom(percent);
        self.sync_view();
    }

    pub fn set_zoom_mode(&mut self, mode: ZoomMode) {
        self.viewport.set_mode(mode);
        self.sync_view();
    }

    fn sync_view(&mut self) {
        self.canvas.set_scale(self.viewport.scale());
        self.canvas.set_widget_size(self.viewport.canvas_size());
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Open an image file and load its annotations, if any exist next to it.
    pub fn open_image(&mut self, path: &Path) -> Result<ImageSize, SessionError> {
        let img = image::open(path)?;
        let depth = if img.color().has_color() { 3 } else { 1 };
        let size = ImageSize::new(img.width(), img.height(), depth);
        self.show_image(path, size)?;
        Ok(size)
    }

    /// Show an image whose pixels the host already decoded.
    ///
    /// Unsaved changes to the previous image are saved first when auto-save
    /// is on. An annotation file next to the image is loaded, trying the
    /// current format first.
    pub fn show_image(&mut self, path: &Path, size: ImageSize) -> Result<(), SessionError> {
        if self.dirty
            && self.config.auto_save
            && let Err(e) = self.save()
        {
            log::warn!("Auto-save failed: {}", e);
        }

        log::info!(
            "Opened {:?} ({}x{}x{})",
            path,
            size.width,
            size.height,
            size.depth
        );
        self.image_path = Some(path.to_path_buf());
        self.image_size = Some(size);
        self.annotation_path = None;
        self.verified = false;
        self.label_filter = None;
        self.canvas.load_pixmap(size.to_size());
        self.viewport.set_image_size(size.to_size());
        self.sync_view();
        self.reset_history();
        self.dirty = false;

        let mut candidates = vec![self.format().annotation_path(path)];
        for format in self.registry.all() {
            let candidate = format.annotation_path(path);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        if let Some(existing) = candidates.into_iter().find(|p| p.is_file()) {
            self.load_annotations(&existing)?;
        }
        Ok(())
    }

    /// Replace the shapes with those stored in an annotation file.
    ///
    /// The format is picked from the file extension. Nothing changes when
    /// the file cannot be read. Returns the number of shapes loaded.
    pub fn load_annotations(&mut self, path: &Path) -> Result<usize, SessionError> {
        let format_id = self
            .registry
            .for_path(path)
            .map(|f| f.id())
            .unwrap_or(self.format_id);
        let mut context = self.format_context();
        let doc = self.format_by_id(format_id).load(path, &mut context)?;

        for class in &context.classes {
            self.add_label(class);
        }
        let shapes: Vec<Shape> = doc.shapes.into_iter().map(ShapeRecord::into_shape).collect();
        let count = shapes.len();
        self.load_shapes(shapes);

        self.verified = doc.verified;
        self.annotation_path = Some(path.to_path_buf());
        self.format_id = format_id;
        Ok(count)
    }

    /// Replace the shapes on the canvas, starting a fresh undo history.
    ///
    /// Vertices outside the image are clamped, which leaves the document
    /// dirty.
    pub fn load_shapes(&mut self, shapes: Vec<Shape>) {
        let shapes: Vec<Shape> = shapes
            .into_iter()
            .map(|mut shape| {
                shape.paint_label = self.paint_labels;
                shape
            })
            .collect();
        for shape in &shapes {
            self.add_label(&shape.label);
        }
        let clamped = self.canvas.load_shapes(shapes);
        self.label_filter = None;
        self.reset_history();
        self.dirty = clamped;
    }

    /// Save to the annotation file for the open image.
    pub fn save(&mut self) -> Result<SaveReport, SessionError> {
        let path = self.annotation_target().ok_or(SessionError::NoImage)?;
        self.save_as(&path)
    }

    /// Save to `path`, picking the format from its extension.
    pub fn save_as(&mut self, path: &Path) -> Result<SaveReport, SessionError> {
        let doc = self.document()?;
        let format_id = self
            .registry
            .for_path(path)
            .map(|f| f.id())
            .unwrap_or(self.format_id);
        let mut context = self.format_context();
        let report = self.format_by_id(format_id).save(&doc, path, &mut context)?;

        for class in &context.classes {
            self.add_label(class);
        }
        for warning in &report.warnings {
            log::warn!("{}", warning.message);
        }
        self.annotation_path = Some(path.to_path_buf());
        self.format_id = format_id;
        self.dirty = false;
        Ok(report)
    }

    /// Annotation file the next `save` writes to.
    pub fn annotation_target(&self) -> Option<PathBuf> {
        let format = self.format();
        match &self.annotation_path {
            Some(path) if path.extension().is_some_and(|e| e == format.extension()) => {
                Some(path.clone())
            }
            _ => self
                .image_path
                .as_deref()
                .map(|image| format.annotation_path(image)),
        }
    }

    /// The document a save would write.
    pub fn document(&self) -> Result<AnnotationDocument, SessionError> {
        let image_path = self.image_path.as_deref().ok_or(SessionError::NoImage)?;
        let mut doc = AnnotationDocument::for_image(image_path, self.image_size)
            .with_shapes(records_for_save(self.canvas.shapes()));
        doc.verified = self.verified;
        Ok(doc)
    }

    fn format_by_id(&self, id: &str) -> &dyn LabelFormat {
        self.registry
            .get(id)
            .unwrap_or_else(|| self.registry.default_format())
    }

    fn format_context(&self) -> FormatContext {
        FormatContext {
            classes: self.label_history.clone(),
            image_size: self.image_size,
        }
    }

    fn reset_history(&mut self) {
        self.dirty_before_drag = None;
        self.undo_stack.clear();
        self.committed = self.canvas.snapshot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Buttons, Key, PointerButton};
    use crate::model::ShapeKind;

    fn session() -> EditSession {
        let mut session = EditSession::new(EditorConfig::default());
        session.canvas_mut().load_pixmap(Size::new(100.0, 100.0));
        session
    }

    fn answer(label: &'static str) -> impl FnMut(&str, &[String]) -> Option<String> {
        move |_: &str, _: &[String]| Some(label.to_string())
    }

    fn cancel(_: &str, _: &[String]) -> Option<String> {
        None
    }

    /// Draw a rectangle from `a` to `b` with two presses.
    fn draw_rect(session: &mut EditSession, a: Point, b: Point) {
        session.set_create_mode();
        let canvas = session.canvas_mut();
        canvas.pointer_press(a, PointerButton::Left);
        canvas.pointer_release(a, PointerButton::Left);
        canvas.pointer_move(b, Buttons::NONE);
        canvas.pointer_press(b, PointerButton::Left);
    }

    fn rect_shape(label: &str, x: f32, y: f32) -> Shape {
        Shape::from_vertices(
            label,
            vec![
                Point::new(x, y),
                Point::new(x + 10.0, y),
                Point::new(x + 10.0, y + 10.0),
                Point::new(x, y + 10.0),
            ],
        )
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "labelcanvas_session_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_new_shape_is_labeled_and_returns_to_editing() {
        let mut session = session();
        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));

        let events = session.process_events(&mut answer("dog"));
        assert!(events.iter().any(|e| matches!(e, CanvasEvent::NewShape(_))));

        let canvas = session.canvas();
        assert!(canvas.is_editing());
        assert_eq!(canvas.shapes().len(), 1);
        let (_, shape) = canvas.shapes().iter().next().unwrap();
        assert_eq!(shape.label, "dog");
        assert_eq!(shape.kind, ShapeKind::Rectangle);
        assert!(session.is_dirty());
        assert_eq!(session.prev_label(), "dog");
        assert_eq!(session.label_history(), ["dog".to_string()]);
    }

    #[test]
    fn test_queued_shapes_are_labeled_by_id() {
        let mut session = session();
        session.set_beginner(false);
        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        draw_rect(&mut session, Point::new(60.0, 60.0), Point::new(90.0, 90.0));
        let ids = session.canvas().shapes().ids();
        assert_eq!(ids.len(), 2);

        let mut answers = vec![None, Some("dog".to_string())];
        let mut prompt = |_: &str, _: &[String]| answers.pop().flatten();
        session.process_events(&mut prompt);

        let shapes: Vec<(ShapeId, String)> = session
            .canvas()
            .shapes()
            .iter()
            .map(|(id, s)| (id, s.label.clone()))
            .collect();
        assert_eq!(shapes, vec![(ids[0], "dog".to_string())]);
        assert_eq!(records_for_save(session.canvas().shapes()).len(), 1);
    }

    #[test]
    fn test_cancelled_label_discards_shape() {
        let mut session = session();
        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));

        session.process_events(&mut cancel);
        assert!(session.canvas().shapes().is_empty());
        assert!(session.canvas().is_editing());
        assert!(!session.is_dirty());

        // Whitespace-only answers cancel too
        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        session.process_events(&mut answer("  "));
        assert!(session.canvas().shapes().is_empty());
    }

    #[test]
    fn test_advanced_flow_stays_in_create_mode() {
        let mut session = session();
        session.set_beginner(false);
        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        session.process_events(&mut answer("dog"));
        assert!(!session.canvas().is_editing());
        assert_eq!(session.canvas().shapes().len(), 1);
    }

    #[test]
    fn test_single_class_reuses_first_label() {
        let mut session = session();
        session.set_single_class(true);

        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        session.process_events(&mut answer("dog"));

        let mut asked = false;
        let mut prompt = |_: &str, _: &[String]| {
            asked = true;
            Some("cat".to_string())
        };
        draw_rect(&mut session, Point::new(60.0, 60.0), Point::new(90.0, 90.0));
        session.process_events(&mut prompt);

        assert!(!asked);
        assert!(session.canvas().shapes().iter().all(|(_, s)| s.label == "dog"));
    }

    #[test]
    fn test_default_label_skips_prompt() {
        let mut session = session();
        session.set_default_label(Some("car".to_string()));
        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        session.process_events(&mut cancel);

        let (_, shape) = session.canvas().shapes().iter().next().unwrap();
        assert_eq!(shape.label, "car");
    }

    #[test]
    fn test_prompt_receives_suggestion_and_history() {
        let mut config = EditorConfig::default();
        config.session.predefined_labels = vec!["person".into(), "dog".into()];
        let mut session = EditSession::new(config);
        session.canvas_mut().load_pixmap(Size::new(100.0, 100.0));

        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        session.process_events(&mut answer("cat"));

        let mut seen = None;
        let mut prompt = |suggestion: &str, history: &[String]| {
            seen = Some((suggestion.to_string(), history.to_vec()));
            None
        };
        draw_rect(&mut session, Point::new(60.0, 60.0), Point::new(90.0, 90.0));
        session.process_events(&mut prompt);

        let (suggestion, history) = seen.unwrap();
        assert_eq!(suggestion, "cat");
        assert_eq!(history, vec!["person", "dog", "cat"]);
    }

    #[test]
    fn test_edit_label_and_difficult() {
        let mut session = session();
        session.load_shapes(vec![rect_shape("dog", 10.0, 10.0)]);
        let id = session.canvas().shapes().ids()[0];

        assert!(session.edit_label(id, "cat"));
        assert!(!session.edit_label(id, "   "));
        let shape = session.canvas().shape(id).unwrap();
        assert_eq!(shape.label, "cat");
        assert_eq!(shape.line_color, crate::color_utils::color_for_label("cat"));

        assert!(session.set_difficult(id, true));
        assert!(!session.set_difficult(id, true));
        assert!(session.canvas().shape(id).unwrap().difficult);
        assert!(session.is_dirty());
    }

    #[test]
    fn test_selection_colors() {
        let mut session = session();
        session.load_shapes(vec![rect_shape("dog", 10.0, 10.0)]);
        let red = Color::rgb(255, 0, 0);
        assert!(!session.set_line_color(red));

        let id = session.canvas().shapes().ids()[0];
        session.canvas_mut().select_shape(id);
        assert!(session.set_line_color(red));
        assert!(session.set_fill_color(red));
        let shape = session.canvas().shape(id).unwrap();
        assert_eq!(shape.line_color, red);
        assert_eq!(shape.fill_color, red);
    }

    #[test]
    fn test_undo_redo_committed_changes() {
        let mut session = session();
        draw_rect(&mut session, Point::new(10.0, 10.0), Point::new(50.0, 40.0));
        session.process_events(&mut answer("dog"));
        let id = session.canvas().shapes().ids()[0];
        session.edit_label(id, "cat");

        assert!(session.undo());
        assert_eq!(session.canvas().shape(id).unwrap().label, "dog");
        assert!(session.undo());
        assert!(session.canvas().shapes().is_empty());
        assert!(!session.undo());

        assert!(session.redo());
        assert!(session.redo());
        assert_eq!(session.canvas().shape(id).unwrap().label, "cat");
        assert!(!session.redo());
    }

    #[test]
    fn test_vertex_drag_commits_on_release() {
        let mut session = session();
        session.load_shapes(vec![rect_shape("dog", 10.0, 10.0)]);
        let id = session.canvas().shapes().ids()[0];

        let canvas = session.canvas_mut();
        canvas.pointer_move(Point::new(20.0, 20.0), Buttons::NONE);
        canvas.pointer_press(Point::new(20.0, 20.0), PointerButton::Left);
        canvas.pointer_move(Point::new(30.0, 30.0), Buttons::LEFT);
        canvas.pointer_release(Point::new(30.0, 30.0), PointerButton::Left);
        session.process_events(&mut cancel);

        assert!(session.is_dirty());
        assert!(session.can_undo());
        assert!(session.undo());
        assert_eq!(
            session.canvas().shape(id).unwrap().vertex(2),
            Some(Point::new(20.0, 20.0))
        );
    }

    #[test]
    fn test_reverted_drag_leaves_document_clean() {
        let mut session = session();
        session.load_shapes(vec![Shape::from_vertices(
            "dog",
            vec![
                Point::new(10.0, 10.0),
                Point::new(60.0, 10.0),
                Point::new(60.0, 60.0),
                Point::new(10.0, 60.0),
            ],
        )]);
        assert!(!session.is_dirty());

        let canvas = session.canvas_mut();
        canvas.pointer_move(Point::new(35.0, 35.0), Buttons::NONE);
        canvas.pointer_press(Point::new(35.0, 35.0), PointerButton::Left);
        canvas.pointer_move(Point::new(45.0, 45.0), Buttons::LEFT);
        session.process_events(&mut cancel);
        assert!(session.is_dirty());

        let canvas = session.canvas_mut();
        canvas.key_press(Key::Escape);
        canvas.pointer_release(Point::new(45.0, 45.0), PointerButton::Left);
        session.process_events(&mut cancel);
        assert!(!session.is_dirty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_promote_auto_labels() {
        let mut session = session();
        session.load_shapes(vec![
            rect_shape("auto_0.93_dog", 10.0, 10.0),
            rect_shape("auto_0.51_cat", 40.0, 40.0),
            rect_shape("auto_0.77_car", 70.0, 70.0),
        ]);
        let ids = session.canvas().shapes().ids();

        assert!(session.promote_auto_label(ids[0]));
        assert!(!session.promote_auto_label(ids[0]));
        assert_eq!(session.canvas().shape(ids[0]).unwrap().label, "dog");

        session.set_shape_visible(ids[2], false);
        assert_eq!(session.promote_all_visible_auto_labels(), 1);
        assert_eq!(session.canvas().shape(ids[1]).unwrap().label, "cat");
        assert!(session.canvas().shape(ids[2]).unwrap().is_auto_label());
    }

    #[test]
    fn test_filter_and_visibility() {
        let mut session = session();
        session.load_shapes(vec![
            rect_shape("dog", 10.0, 10.0),
            rect_shape("cat", 40.0, 40.0),
            rect_shape("dog", 70.0, 70.0),
        ]);
        assert_eq!(session.unique_labels(), vec!["dog", "cat"]);

        session.filter_by_label(Some("cat"));
        let visible: Vec<bool> = session
            .canvas()
            .shapes()
            .iter()
            .map(|(_, s)| s.visible)
            .collect();
        assert_eq!(visible, vec![false, true, false]);
        assert_eq!(session.label_filter(), Some("cat"));

        session.filter_by_label(None);
        assert!(session.canvas().shapes().iter().all(|(_, s)| s.visible));

        session.toggle_all_visible(false);
        assert!(session.canvas().shapes().iter().all(|(_, s)| !s.visible));
    }

    #[test]
    fn test_paint_labels_applies_to_all_shapes() {
        let mut session = session();
        session.load_shapes(vec![rect_shape("dog", 10.0, 10.0)]);
        session.set_paint_labels(true);
        assert!(session.canvas().shapes().iter().all(|(_, s)| s.paint_label));

        draw_rect(&mut session, Point::new(40.0, 40.0), Point::new(60.0, 60.0));
        session.process_events(&mut answer("cat"));
        assert!(session.canvas().shapes().iter().all(|(_, s)| s.paint_label));
    }

    #[test]
    fn test_copy_and_delete() {
        let mut session = session();
        session.load_shapes(vec![rect_shape("dog", 10.0, 10.0)]);
        let id = session.canvas().shapes().ids()[0];
        session.canvas_mut().select_shape(id);

        let copy = session.copy_selected().unwrap();
        assert_ne!(copy, id);
        assert_eq!(session.canvas().shapes().len(), 2);

        assert_eq!(session.delete_selected(), Some(copy));
        assert_eq!(session.canvas().shapes().len(), 1);
        assert!(session.delete_selected().is_none());
    }

    #[test]
    fn test_escape_while_creating_returns_to_editing() {
        let mut session = session();
        session.set_create_mode();
        let canvas = session.canvas_mut();
        canvas.pointer_press(Point::new(10.0, 10.0), PointerButton::Left);
        canvas.key_press(Key::Escape);
        session.process_events(&mut cancel);
        assert!(session.canvas().is_editing());
        assert!(session.canvas().shapes().is_empty());
    }

    #[test]
    fn test_zoom_request_updates_canvas_scale() {
        let mut session = session();
        session.set_viewport_size(Size::new(200.0, 200.0));
        session
            .canvas_mut()
            .wheel(Point::new(0.0, 120.0), crate::canvas::Modifiers::CTRL, Point::new(50.0, 50.0));
        session.process_events(&mut cancel);
        assert!((session.viewport().percent() - 110.0).abs() < 0.001);
        assert!((session.canvas().scale() - 1.1).abs() < 0.001);
    }

    #[test]
    fn test_save_and_reload_voc() {
        let dir = temp_dir("voc");
        let image = dir.join("street.jpg");
        let mut session = EditSession::new(EditorConfig::default());
        session.show_image(&image, ImageSize::new(100, 80, 3)).unwrap();
        session.load_shapes(vec![
            rect_shape("dog", 10.0, 10.0),
            rect_shape("auto_0.9_cat", 40.0, 40.0),
        ]);
        let id = session.canvas().shapes().ids()[0];
        session.set_difficult(id, true);
        session.toggle_verified();

        let report = session.save().unwrap();
        assert_eq!(report.shapes_written, 1);
        assert!(!session.is_dirty());
        assert_eq!(session.annotation_path(), Some(dir.join("street.xml").as_path()));

        let mut reopened = EditSession::new(EditorConfig::default());
        reopened.show_image(&image, ImageSize::new(100, 80, 3)).unwrap();
        assert!(reopened.is_verified());
        assert!(!reopened.is_dirty());
        let shapes: Vec<_> = reopened.canvas().shapes().iter().collect();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].1.label, "dog");
        assert!(shapes[0].1.difficult);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_yolo_uses_label_history() {
        let dir = temp_dir("yolo");
        let image = dir.join("img.png");
        let mut config = EditorConfig::default();
        config.session.predefined_labels = vec!["person".into()];
        let mut session = EditSession::new(config);
        assert!(session.set_format("yolo"));
        assert!(!session.set_format("coco"));

        session.show_image(&image, ImageSize::new(100, 100, 3)).unwrap();
        session.load_shapes(vec![rect_shape("dog", 10.0, 10.0)]);
        session.save().unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.join("classes.txt")).unwrap(),
            "person\ndog\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("img.txt")).unwrap(),
            "1 0.150000 0.150000 0.100000 0.100000\n"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_auto_save_after_commit() {
        let dir = temp_dir("auto_save");
        let image = dir.join("frame.png");
        let mut config = EditorConfig::default();
        config.session.auto_save = true;
        let mut session = EditSession::new(config);
        session.show_image(&image, ImageSize::new(64, 64, 3)).unwrap();
        session.load_shapes(vec![rect_shape("dog", 10.0, 10.0)]);
        assert!(!dir.join("frame.xml").exists());

        let id = session.canvas().shapes().ids()[0];
        session.edit_label(id, "cat");
        assert!(!session.is_dirty());
        let xml = std::fs::read_to_string(dir.join("frame.xml")).unwrap();
        assert!(xml.contains("<name>cat</name>"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_clamps_and_marks_dirty() {
        let dir = temp_dir("clamp");
        let xml = dir.join("wide.xml");
        std::fs::write(
            &xml,
            "<annotation><filename>wide.jpg</filename><object><name>dog</name>\
             <bndbox><xmin>10</xmin><ymin>10</ymin><xmax>150</xmax><ymax>40</ymax></bndbox>\
             </object></annotation>",
        )
        .unwrap();

        let mut session = session();
        assert_eq!(session.load_annotations(&xml).unwrap(), 1);
        assert!(session.is_dirty());
        let (_, shape) = session.canvas().shapes().iter().next().unwrap();
        assert_eq!(shape.vertex(1), Some(Point::new(100.0, 10.0)));
        assert!(session.label_history().contains(&"dog".to_string()));

        // A malformed file leaves the canvas untouched
        std::fs::write(&xml, "<annotation><object><name>cat</name></object></annotation>")
            .unwrap();
        assert!(session.load_annotations(&xml).is_err());
        assert_eq!(session.canvas().shapes().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_open_image_reads_dimensions() {
        let dir = temp_dir("open");
        let path = dir.join("gray.png");
        image::GrayImage::new(32, 24).save(&path).unwrap();

        let mut session = EditSession::new(EditorConfig::default());
        let size = session.open_image(&path).unwrap();
        assert_eq!(size, ImageSize::new(32, 24, 1));
        assert_eq!(session.canvas().pixmap_size(), Size::new(32.0, 24.0));
        assert!(matches!(
            session.open_image(&dir.join("missing.png")),
            Err(SessionError::Image(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_without_image() {
        let mut session = session();
        assert!(matches!(session.save(), Err(SessionError::NoImage)));
    }
}
