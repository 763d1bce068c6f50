//! Annotation format implementations.

mod pascal_voc;
mod yolo;

#[cfg(test)]
mod tests;

pub use pascal_voc::PascalVocFormat;
pub use yolo::{CLASSES_FILE, YoloFormat};
