//! YOLO TXT format implementation.
//!
//! One text file per image, one `class cx cy w h` line per shape with
//! coordinates normalized to the image size. Class names live in a
//! `classes.txt` file next to the annotation file.

use std::path::{Path, PathBuf};

use super::pascal_voc::BndBox;
use crate::format::error::FormatError;
use crate::format::record::{AnnotationDocument, ShapeRecord};
use crate::format::traits::{Encoded, FormatContext, FormatWarning, LabelFormat};
use crate::geometry::Point;

/// Name of the class list file.
pub const CLASSES_FILE: &str = "classes.txt";

/// YOLO TXT format.
///
/// Supports:
/// - Bounding boxes (normalized coordinates)
/// - classes.txt for class names
///
/// Does not support:
/// - Polygons (written as their bounding box with a warning)
/// - The difficult and verified flags
pub struct YoloFormat;

impl LabelFormat for YoloFormat {
    fn id(&self) -> &'static str {
        "yolo"
    }

    fn display_name(&self) -> &'static str {
        "YOLO (TXT)"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn supports_polygon(&self) -> bool {
        false
    }

    fn encode(
        &self,
        doc: &AnnotationDocument,
        context: &mut FormatContext,
    ) -> Result<Encoded, FormatError> {
        let size = doc
            .image_size
            .or(context.image_size)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FormatError::missing_dimensions(self.id()))?;
        let (width, height) = (size.width as f32, size.height as f32);

        let mut encoded = Encoded::default();
        for record in &doc.shapes {
            let Some(bndbox) = BndBox::from_points(&record.points) else {
                encoded.warnings.push(
                    FormatWarning::warning(format!(
                        "Skipped shape with {} vertices (at least 3 required)",
                        record.points.len()
                    ))
                    .with_label(&record.label),
                );
                continue;
            };
            if !record.is_rectangle() {
                encoded.warnings.push(
                    FormatWarning::warning("Polygon written as its bounding box")
                        .with_label(&record.label),
                );
            }

            let class_index = context.class_index(&record.label);
            let (x_min, y_min) = (bndbox.xmin as f32, bndbox.ymin as f32);
            let (x_max, y_max) = (bndbox.xmax as f32, bndbox.ymax as f32);

            // YOLO uses center coordinates, normalized to [0, 1]
            let cx = (x_min + x_max) / 2.0 / width;
            let cy = (y_min + y_max) / 2.0 / height;
            let w = (x_max - x_min) / width;
            let h = (y_max - y_min) / height;

            encoded.text.push_str(&format!(
                "{} {:.6} {:.6} {:.6} {:.6}\n",
                class_index, cx, cy, w, h
            ));
            encoded.shapes_written += 1;
        }

        Ok(encoded)
    }

    fn decode(
        &self,
        text: &str,
        context: &FormatContext,
    ) -> Result<AnnotationDocument, FormatError> {
        let size = context
            .image_size
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FormatError::missing_dimensions(self.id()))?;

        let mut doc = AnnotationDocument {
            image_size: Some(size),
            ..Default::default()
        };
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (class_index, cx, cy, w, h) = parse_yolo_line(line, number + 1)?;
            let label = context
                .class_name(class_index)
                .ok_or(FormatError::UnknownClass { index: class_index })?;

            let x_min = (cx - w / 2.0).max(0.0);
            let x_max = (cx + w / 2.0).min(1.0);
            let y_min = (cy - h / 2.0).max(0.0);
            let y_max = (cy + h / 2.0).min(1.0);

            let (width, height) = (size.width as f32, size.height as f32);
            doc.shapes.push(ShapeRecord::rectangle(
                label,
                Point::new((width * x_min).round(), (height * y_min).round()),
                Point::new((width * x_max).round(), (height * y_max).round()),
            ));
        }

        Ok(doc)
    }

    fn read_sidecar(&self, path: &Path, context: &mut FormatContext) -> Result<(), FormatError> {
        let classes_path = classes_path(path);
        if !classes_path.exists() {
            log::debug!("No {} next to {:?}", CLASSES_FILE, path);
            return Ok(());
        }
        let content = std::fs::read_to_string(&classes_path)?;
        context.classes = content
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        Ok(())
    }

    fn write_sidecar(
        &self,
        path: &Path,
        context: &FormatContext,
    ) -> Result<Vec<PathBuf>, FormatError> {
        let classes_path = classes_path(path);
        let mut content = String::new();
        for class in &context.classes {
            content.push_str(class);
            content.push('\n');
        }
        std::fs::write(&classes_path, content)?;
        Ok(vec![classes_path])
    }
}

fn classes_path(annotation_path: &Path) -> PathBuf {
    match annotation_path.parent() {
        Some(dir) => dir.join(CLASSES_FILE),
        None => PathBuf::from(CLASSES_FILE),
    }
}

/// Parse a single YOLO annotation line.
fn parse_yolo_line(line: &str, number: usize) -> Result<(usize, f32, f32, f32, f32), FormatError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(FormatError::invalid_format(format!(
            "line {number}: expected 5 fields, found {}",
            parts.len()
        )));
    }

    let class_index: usize = parts[0].parse().map_err(|_| {
        FormatError::invalid_format(format!("line {number}: bad class '{}'", parts[0]))
    })?;
    let mut values = [0.0f32; 4];
    for (value, part) in values.iter_mut().zip(&parts[1..]) {
        *value = part
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                FormatError::invalid_coordinates(format!("line {number}: '{part}'"))
            })?;
    }
    let [cx, cy, w, h] = values;
    Ok((class_index, cx, cy, w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yolo_line() {
        let (class, cx, cy, w, h) = parse_yolo_line("0 0.5 0.5 0.2 0.3", 1).unwrap();
        assert_eq!(class, 0);
        assert!((cx - 0.5).abs() < 0.001);
        assert!((cy - 0.5).abs() < 0.001);
        assert!((w - 0.2).abs() < 0.001);
        assert!((h - 0.3).abs() < 0.001);

        assert!(parse_yolo_line("0 0.5 0.5 0.2", 1).is_err());
        assert!(parse_yolo_line("x 0.5 0.5 0.2 0.3", 1).is_err());
        assert!(matches!(
            parse_yolo_line("0 0.5 nan 0.2 0.3", 3),
            Err(FormatError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_format_metadata() {
        let format = YoloFormat;
        assert_eq!(format.id(), "yolo");
        assert_eq!(format.extension(), "txt");
        assert!(!format.supports_polygon());
    }

    #[test]
    fn test_classes_path() {
        assert_eq!(
            classes_path(Path::new("/data/labels/img.txt")),
            PathBuf::from("/data/labels/classes.txt")
        );
    }
}
