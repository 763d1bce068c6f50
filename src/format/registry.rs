//! Format registry for discovering and accessing annotation formats.

use std::collections::HashMap;
use std::path::Path;

use crate::format::formats::{PascalVocFormat, YoloFormat};
use crate::format::traits::LabelFormat;

/// ID of the format used when none is chosen.
pub const DEFAULT_FORMAT: &str = "voc";

/// Registry of available annotation formats.
///
/// All built-in formats are registered automatically on creation.
pub struct FormatRegistry {
    formats: HashMap<&'static str, Box<dyn LabelFormat>>,
}

impl FormatRegistry {
    /// Create a new registry with all built-in formats registered.
    pub fn new() -> Self {
        let mut registry = Self {
            formats: HashMap::new(),
        };

        registry.register(Box::new(PascalVocFormat));
        registry.register(Box::new(YoloFormat));

        registry
    }

    /// Register a format implementation, replacing one with the same ID.
    pub fn register(&mut self, format: Box<dyn LabelFormat>) {
        self.formats.insert(format.id(), format);
    }

    /// Get a format by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn LabelFormat> {
        self.formats.get(id).map(|f| f.as_ref())
    }

    /// Find the format writing files with extension `ext`.
    pub fn by_extension(&self, ext: &str) -> Option<&dyn LabelFormat> {
        let ext = ext.trim_start_matches('.');
        self.formats
            .values()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
            .map(|f| f.as_ref())
    }

    /// Find the format for an annotation file path.
    pub fn for_path(&self, path: &Path) -> Option<&dyn LabelFormat> {
        let ext = path.extension()?.to_str()?;
        self.by_extension(ext)
    }

    /// All registered formats, ordered by ID.
    pub fn all(&self) -> Vec<&dyn LabelFormat> {
        let mut formats: Vec<_> = self.formats.values().map(|f| f.as_ref()).collect();
        formats.sort_by_key(|f| f.id());
        formats
    }

    /// Get all format IDs, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.formats.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The Pascal VOC format, unless it was replaced.
    pub fn default_format(&self) -> &dyn LabelFormat {
        self.get(DEFAULT_FORMAT).unwrap_or(&PascalVocFormat)
    }

    /// Get formats that keep polygon shapes.
    pub fn polygon_formats(&self) -> Vec<&dyn LabelFormat> {
        self.all()
            .into_iter()
            .filter(|f| f.supports_polygon())
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
