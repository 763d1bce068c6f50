//! Annotation file formats.
//!
//! Canvas shapes cross into files as `ShapeRecord`s grouped in an
//! `AnnotationDocument`. Each format implements the `LabelFormat` trait to
//! convert documents to and from its on-disk text.
//!
//! ## Supported Formats
//!
//! - **Pascal VOC XML**: per-image XML with bounding boxes, the difficult
//!   and verified flags, and a polygon extension
//! - **YOLO TXT**: per-image normalized boxes plus a `classes.txt` list
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use labelcanvas::format::{FormatContext, FormatRegistry, LabelFormat};
//!
//! let registry = FormatRegistry::new();
//! let format = registry.default_format();
//! let mut context = FormatContext::new();
//! let doc = format.load(Path::new("images/cat.xml"), &mut context)?;
//! println!("{} shapes", doc.shapes.len());
//! # Ok::<(), labelcanvas::format::FormatError>(())
//! ```

mod error;
pub mod formats;
mod record;
mod registry;
mod traits;

pub use error::FormatError;
pub use record::{AnnotationDocument, ImageSize, ShapeRecord, records_for_save};
pub use registry::{DEFAULT_FORMAT, FormatRegistry};
pub use traits::{
    Encoded, FormatContext, FormatWarning, LabelFormat, SaveReport, WarningSeverity,
};
