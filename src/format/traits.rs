//! Trait definitions for annotation format implementations.

use std::path::{Path, PathBuf};

use crate::format::error::FormatError;
use crate::format::record::{AnnotationDocument, ImageSize};

/// Trait for annotation file formats.
///
/// Implementations convert between an `AnnotationDocument` and the text of a
/// single annotation file. The provided `save` and `load` methods handle the
/// file system, including any sidecar files a format keeps next to the
/// annotation file.
pub trait LabelFormat: Send + Sync {
    /// Unique identifier for this format (e.g. "voc", "yolo").
    fn id(&self) -> &'static str;

    /// Human-readable name for UI display.
    fn display_name(&self) -> &'static str;

    /// Annotation file extension, without the dot.
    fn extension(&self) -> &'static str;

    /// Whether non-rectangular shapes survive a round trip.
    fn supports_polygon(&self) -> bool;

    /// Serialize a document. New class names are appended to `context`.
    fn encode(
        &self,
        doc: &AnnotationDocument,
        context: &mut FormatContext,
    ) -> Result<Encoded, FormatError>;

    /// Parse a document. Fails on the first malformed record.
    fn decode(&self, text: &str, context: &FormatContext)
    -> Result<AnnotationDocument, FormatError>;

    /// Read sidecar files for the annotation file at `path`.
    fn read_sidecar(&self, _path: &Path, _context: &mut FormatContext) -> Result<(), FormatError> {
        Ok(())
    }

    /// Write sidecar files for the annotation file at `path`.
    fn write_sidecar(
        &self,
        _path: &Path,
        _context: &FormatContext,
    ) -> Result<Vec<PathBuf>, FormatError> {
        Ok(Vec::new())
    }

    /// Annotation file path for an image.
    fn annotation_path(&self, image_path: &Path) -> PathBuf {
        image_path.with_extension(self.extension())
    }

    /// Encode `doc` and write it to `path`.
    fn save(
        &self,
        doc: &AnnotationDocument,
        path: &Path,
        context: &mut FormatContext,
    ) -> Result<SaveReport, FormatError> {
        log::info!("Saving {} annotations to {:?}", self.display_name(), path);

        let encoded = self.encode(doc, context)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &encoded.text)?;

        let mut report = SaveReport {
            shapes_written: encoded.shapes_written,
            warnings: encoded.warnings,
            files_created: vec![path.to_path_buf()],
        };
        report
            .files_created
            .extend(self.write_sidecar(path, context)?);

        log::info!(
            "Saved {} shapes ({} warnings)",
            report.shapes_written,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Read and decode the annotation file at `path`.
    fn load(
        &self,
        path: &Path,
        context: &mut FormatContext,
    ) -> Result<AnnotationDocument, FormatError> {
        log::info!("Loading {} annotations from {:?}", self.display_name(), path);

        self.read_sidecar(path, context)?;
        let text = std::fs::read_to_string(path)?;
        let doc = self.decode(&text, context)?;

        log::info!("Loaded {} shapes", doc.shapes.len());
        Ok(doc)
    }
}

/// Information a format needs beyond the annotation file itself.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    /// Class names in index order.
    pub classes: Vec<String>,

    /// Image size for formats that store normalized coordinates.
    pub image_size: Option<ImageSize>,
}

impl FormatContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classes(mut self, classes: Vec<String>) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = Some(size);
        self
    }

    /// Index of `label`, appending it when unknown.
    pub fn class_index(&mut self, label: &str) -> usize {
        match self.classes.iter().position(|c| c == label) {
            Some(index) => index,
            None => {
                self.classes.push(label.to_string());
                self.classes.len() - 1
            }
        }
    }

    pub fn class_name(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

/// Output of `LabelFormat::encode`.
#[derive(Debug, Default)]
pub struct Encoded {
    pub text: String,
    pub shapes_written: usize,
    pub warnings: Vec<FormatWarning>,
}

/// Result of a save operation.
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Number of shapes written.
    pub shapes_written: usize,

    /// Warnings generated while encoding (e.g., skipped shapes).
    pub warnings: Vec<FormatWarning>,

    /// Files created, annotation file first.
    pub files_created: Vec<PathBuf>,
}

impl SaveReport {
    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if there were any errors (severe warnings).
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w.severity, WarningSeverity::Error))
    }
}

/// Warning generated during format conversion.
#[derive(Debug, Clone)]
pub struct FormatWarning {
    /// Label of the shape this warning relates to (if applicable).
    pub label: Option<String>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            label: None,
            message: message.into(),
            severity,
        }
    }

    /// Create an info-level warning.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Set the shape label this warning relates to.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Warning that something was skipped or modified.
    Warning,
    /// Error that may affect data integrity.
    Error,
}
