//! labelcanvas - interactive image annotation canvas
//!
//! The editing core of a bounding-box and polygon labeling tool. A
//! [`Canvas`] turns pointer and keyboard input into shape edits, a
//! [`Viewport`] handles zoom and scrolling, and an [`EditSession`] applies
//! the labeling policies, keeps undo history and reads and writes Pascal VOC
//! and YOLO annotation files.
//!
//! Rendering is left to the host: it paints the [`canvas::Overlay`] the
//! canvas describes on top of the image.

pub mod canvas;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod format;
pub mod geometry;
pub mod model;
pub mod session;
pub mod undo;
pub mod zoom_math;

pub use canvas::{Canvas, CanvasEvent};
pub use config::{EditorConfig, init_logging};
pub use format::{AnnotationDocument, FormatError, FormatRegistry, LabelFormat};
pub use model::{Shape, ShapeId, ShapeKind};
pub use session::{EditSession, LabelPrompt, SessionError};
pub use zoom_math::{Viewport, ZoomMode};
