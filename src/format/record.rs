//! Records crossing the serialization boundary.
//!
//! Format implementations never see canvas shapes. They read and write
//! `AnnotationDocument`s, which carry one `ShapeRecord` per persisted shape
//! plus the image metadata the file formats need.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color_utils::Color;
use crate::geometry::{self, Point, Rect, Size};
use crate::model::{Shape, ShapeStore};

/// One shape as stored in an annotation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub label: String,
    /// Vertices in image pixels
    pub points: Vec<Point>,
    /// Outline color, `None` to derive it from the label
    #[serde(default)]
    pub line_color: Option<Color>,
    /// Fill color, `None` to derive it from the label
    #[serde(default)]
    pub fill_color: Option<Color>,
    #[serde(default)]
    pub difficult: bool,
}

impl ShapeRecord {
    pub fn new(label: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            label: label.into(),
            points,
            line_color: None,
            fill_color: None,
            difficult: false,
        }
    }

    /// Axis-aligned rectangle record with corners in clockwise order.
    pub fn rectangle(label: impl Into<String>, min: Point, max: Point) -> Self {
        Self::new(
            label,
            vec![
                Point::new(min.x, min.y),
                Point::new(max.x, min.y),
                Point::new(max.x, max.y),
                Point::new(min.x, max.y),
            ],
        )
    }

    pub fn with_difficult(mut self, difficult: bool) -> Self {
        self.difficult = difficult;
        self
    }

    pub fn from_shape(shape: &Shape) -> Self {
        Self {
            label: shape.label.clone(),
            points: shape.vertices().to_vec(),
            line_color: Some(shape.line_color),
            fill_color: Some(shape.fill_color),
            difficult: shape.difficult,
        }
    }

    /// Build a closed canvas shape. Missing colors come from the label.
    pub fn into_shape(self) -> Shape {
        let mut shape = Shape::from_vertices(self.label, self.points);
        if let Some(color) = self.line_color {
            shape.line_color = color;
        }
        if let Some(color) = self.fill_color {
            shape.fill_color = color;
        }
        shape.difficult = self.difficult;
        shape
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        geometry::bounding_rect(&self.points)
    }

    /// Whether the points form an axis-aligned rectangle.
    pub fn is_rectangle(&self) -> bool {
        geometry::is_axis_aligned_rect(&self.points)
    }
}

/// Pixel dimensions of an annotated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
    /// Channel count, 3 for color and 1 for grayscale
    pub depth: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn to_size(self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Annotations of a single image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationDocument {
    /// Name of the directory holding the image
    pub folder: String,
    /// Image file name
    pub filename: String,
    /// Full image path, if known
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub image_size: Option<ImageSize>,
    /// Whether a reviewer has checked the annotations
    #[serde(default)]
    pub verified: bool,
    pub shapes: Vec<ShapeRecord>,
}

impl AnnotationDocument {
    /// Empty document describing the image at `image_path`.
    pub fn for_image(image_path: &Path, image_size: Option<ImageSize>) -> Self {
        let folder = image_path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        let filename = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        Self {
            folder,
            filename,
            path: Some(image_path.to_string_lossy().into_owned()),
            image_size,
            verified: false,
            shapes: Vec::new(),
        }
    }

    pub fn with_shapes(mut self, shapes: Vec<ShapeRecord>) -> Self {
        self.shapes = shapes;
        self
    }

    /// Distinct labels in first-use order.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for record in &self.shapes {
            if !labels.contains(&record.label.as_str()) {
                labels.push(&record.label);
            }
        }
        labels
    }
}

/// Records for every shape that belongs in a saved file.
///
/// Unconfirmed auto-labels and shapes too small to be polygons are left out.
pub fn records_for_save(shapes: &ShapeStore) -> Vec<ShapeRecord> {
    shapes
        .iter()
        .map(|(_, shape)| shape)
        .filter(|shape| !shape.is_auto_label() && shape.is_persistable())
        .map(ShapeRecord::from_shape)
        .collect()
}
