//! Annotation data model.

mod shape;
mod store;

pub use shape::{HighlightMode, Shape, ShapeKind, confirmed_label};
pub use store::{ShapeId, ShapeStore};
