//! Pascal VOC XML format implementation.
//!
//! One XML file per image with a `<bndbox>` per object. Non-rectangular
//! shapes additionally carry a `<polygon>` point list, which readers that
//! only know the bounding box simply ignore.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::format::error::FormatError;
use crate::format::record::{AnnotationDocument, ImageSize, ShapeRecord};
use crate::format::traits::{Encoded, FormatContext, FormatWarning, LabelFormat};
use crate::geometry::Point;

/// Depth written when the image reports none.
const DEFAULT_DEPTH: u32 = 3;

/// Pascal VOC XML format.
///
/// Supports:
/// - Bounding boxes with the `difficult` flag
/// - Polygons through the `<polygon>` extension
/// - The `verified` attribute on the root element
///
/// Colors are not stored.
pub struct PascalVocFormat;

impl LabelFormat for PascalVocFormat {
    fn id(&self) -> &'static str {
        "voc"
    }

    fn display_name(&self) -> &'static str {
        "Pascal VOC (XML)"
    }

    fn extension(&self) -> &'static str {
        "xml"
    }

    fn supports_polygon(&self) -> bool {
        true
    }

    fn encode(
        &self,
        doc: &AnnotationDocument,
        _context: &mut FormatContext,
    ) -> Result<Encoded, FormatError> {
        let size = doc
            .image_size
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FormatError::missing_dimensions(self.id()))?;

        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        let mut encoded = Encoded::default();

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| FormatError::Xml(e.into()))?;

        // <annotation verified="yes">
        let mut root = BytesStart::new("annotation");
        if doc.verified {
            root.push_attribute(("verified", "yes"));
        }
        writer
            .write_event(Event::Start(root))
            .map_err(|e| FormatError::Xml(e.into()))?;

        self.write_text_element(&mut writer, "folder", &doc.folder)?;
        self.write_text_element(&mut writer, "filename", &doc.filename)?;
        if let Some(path) = &doc.path {
            self.write_text_element(&mut writer, "path", path)?;
        }

        // <source>
        self.start(&mut writer, "source")?;
        self.write_text_element(&mut writer, "database", "Unknown")?;
        self.end(&mut writer, "source")?;

        // <size>
        self.start(&mut writer, "size")?;
        self.write_text_element(&mut writer, "width", &size.width.to_string())?;
        self.write_text_element(&mut writer, "height", &size.height.to_string())?;
        let depth = if size.depth == 0 {
            DEFAULT_DEPTH
        } else {
            size.depth
        };
        self.write_text_element(&mut writer, "depth", &depth.to_string())?;
        self.end(&mut writer, "size")?;

        self.write_text_element(&mut writer, "segmented", "0")?;

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
            self.write_object(&mut writer, record, &bndbox, size)?;
            encoded.shapes_written += 1;
        }

        // </annotation>
        self.end(&mut writer, "annotation")?;

        let result = writer.into_inner();
        encoded.text = String::from_utf8(result)
            .map_err(|_| FormatError::invalid_format("Invalid UTF-8 in XML"))?;
        Ok(encoded)
    }

    fn decode(
        &self,
        text: &str,
        _context: &FormatContext,
    ) -> Result<AnnotationDocument, FormatError> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut doc = AnnotationDocument::default();
        let mut seen_root = false;
        let mut width = 0u32;
        let mut height = 0u32;
        let mut depth = DEFAULT_DEPTH;

        // Current parsing state
        let mut current_element = String::new();
        let mut in_object = false;
        let mut in_bndbox = false;
        let mut in_polygon = false;
        let mut in_size = false;

        // Current object data
        let mut object = PendingObject::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    match name.as_str() {
                        "annotation" => {
                            seen_root = true;
                            for attr in e.attributes() {
                                let attr = attr.map_err(|e| FormatError::Xml(e.into()))?;
                                if attr.key.as_ref() == b"verified" {
                                    doc.verified = attr.unescape_value()? == "yes";
                                }
                            }
                        }
                        "object" => {
                            in_object = true;
                            object = PendingObject::default();
                        }
                        "bndbox" => in_bndbox = true,
                        "polygon" => in_polygon = true,
                        "point" if in_polygon => object.point = [None, None],
                        "size" => in_size = true,
                        _ => {}
                    }
                    current_element = name;
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "object" => {
                            let pending = std::mem::take(&mut object);
                            doc.shapes.push(pending.finish()?);
                            in_object = false;
                        }
                        "bndbox" => in_bndbox = false,
                        "polygon" => in_polygon = false,
                        "point" if in_polygon => object.push_point()?,
                        "size" => in_size = false,
                        _ => {}
                    }
                    current_element.clear();
                }
                Ok(Event::Text(ref e)) => {
                    let text = e.unescape()?.to_string();

                    if in_size {
                        match current_element.as_str() {
                            "width" => width = parse_dimension(&text, "width")?,
                            "height" => height = parse_dimension(&text, "height")?,
                            "depth" => depth = parse_dimension(&text, "depth")?,
                            _ => {}
                        }
                    } else if in_object {
                        if in_bndbox {
                            let slot = match current_element.as_str() {
                                "xmin" => Some(0),
                                "ymin" => Some(1),
                                "xmax" => Some(2),
                                "ymax" => Some(3),
                                _ => None,
                            };
                            if let Some(slot) = slot {
                                object.bndbox[slot] =
                                    Some(parse_coordinate(&text, &current_element)?.trunc());
                            }
                        } else if in_polygon {
                            match current_element.as_str() {
                                "x" => object.point[0] = Some(parse_coordinate(&text, "x")?),
                                "y" => object.point[1] = Some(parse_coordinate(&text, "y")?),
                                _ => {}
                            }
                        } else {
                            match current_element.as_str() {
                                "name" => object.name = Some(text),
                                "difficult" => object.difficult = parse_flag(&text)?,
                                _ => {}
                            }
                        }
                    } else {
                        match current_element.as_str() {
                            "folder" => doc.folder = text,
                            "filename" => doc.filename = text,
                            "path" => doc.path = Some(text),
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(FormatError::Xml(e));
                }
                _ => {}
            }
        }

        if !seen_root {
            return Err(FormatError::invalid_format("missing <annotation> element"));
        }
        if width > 0 && height > 0 {
            doc.image_size = Some(ImageSize::new(width, height, depth));
        }
        Ok(doc)
    }
}

impl PascalVocFormat {
    fn write_object<W: Write>(
        &self,
        writer: &mut Writer<W>,
        record: &ShapeRecord,
        bndbox: &BndBox,
        size: ImageSize,
    ) -> Result<(), FormatError> {
        self.start(writer, "object")?;

        self.write_text_element(writer, "name", &record.label)?;
        self.write_text_element(writer, "pose", "Unspecified")?;
        let truncated = if bndbox.touches_border(size) { "1" } else { "0" };
        self.write_text_element(writer, "truncated", truncated)?;
        let difficult = if record.difficult { "1" } else { "0" };
        self.write_text_element(writer, "difficult", difficult)?;

        // <bndbox>
        self.start(writer, "bndbox")?;
        self.write_text_element(writer, "xmin", &bndbox.xmin.to_string())?;
        self.write_text_element(writer, "ymin", &bndbox.ymin.to_string())?;
        self.write_text_element(writer, "xmax", &bndbox.xmax.to_string())?;
        self.write_text_element(writer, "ymax", &bndbox.ymax.to_string())?;
        self.end(writer, "bndbox")?;

        if !record.is_rectangle() {
            self.start(writer, "polygon")?;
            for point in &record.points {
                self.start(writer, "point")?;
                self.write_text_element(writer, "x", &point.x.to_string())?;
                self.write_text_element(writer, "y", &point.y.to_string())?;
                self.end(writer, "point")?;
            }
            self.end(writer, "polygon")?;
        }

        self.end(writer, "object")
    }

    fn start<W: Write>(&self, writer: &mut Writer<W>, name: &str) -> Result<(), FormatError> {
        writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        Ok(())
    }

    fn end<W: Write>(&self, writer: &mut Writer<W>, name: &str) -> Result<(), FormatError> {
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        Ok(())
    }

    /// Write a simple text element.
    fn write_text_element<W: Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        value: &str,
    ) -> Result<(), FormatError> {
        self.start(writer, name)?;
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        self.end(writer, name)
    }
}

/// Integer bounding box as written to `<bndbox>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BndBox {
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

impl BndBox {
    /// Box around `points`, truncated to integers.
    ///
    /// The minimum corner is kept at 1 or above since several detector
    /// training pipelines reject 0-valued coordinates.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let (mut x_min, mut y_min) = (f32::INFINITY, f32::INFINITY);
        let (mut x_max, mut y_max) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in points {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        }
        Some(Self {
            xmin: x_min.max(1.0) as i64,
            ymin: y_min.max(1.0) as i64,
            xmax: x_max as i64,
            ymax: y_max as i64,
        })
    }

    fn touches_border(&self, size: ImageSize) -> bool {
        self.ymax == i64::from(size.height)
            || self.ymin == 1
            || self.xmax == i64::from(size.width)
            || self.xmin == 1
    }
}

/// Object fields collected while parsing.
#[derive(Debug, Default)]
struct PendingObject {
    name: Option<String>,
    difficult: bool,
    /// xmin, ymin, xmax, ymax
    bndbox: [Option<f32>; 4],
    polygon: Vec<Point>,
    point: [Option<f32>; 2],
}

impl PendingObject {
    fn push_point(&mut self) -> Result<(), FormatError> {
        match self.point {
            [Some(x), Some(y)] => {
                self.polygon.push(Point::new(x, y));
                self.point = [None, None];
                Ok(())
            }
            [None, _] => Err(FormatError::missing_field("point/x")),
            [_, None] => Err(FormatError::missing_field("point/y")),
        }
    }

    fn finish(self) -> Result<ShapeRecord, FormatError> {
        let name = self
            .name
            .ok_or_else(|| FormatError::missing_field("object/name"))?;

        if self.polygon.len() >= 3 {
            return Ok(ShapeRecord::new(name, self.polygon).with_difficult(self.difficult));
        }

        let [Some(xmin), Some(ymin), Some(xmax), Some(ymax)] = self.bndbox else {
            return Err(FormatError::missing_field("object/bndbox"));
        };
        Ok(
            ShapeRecord::rectangle(name, Point::new(xmin, ymin), Point::new(xmax, ymax))
                .with_difficult(self.difficult),
        )
    }
}

fn parse_coordinate(text: &str, field: &str) -> Result<f32, FormatError> {
    text.trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FormatError::invalid_coordinates(format!("{field}: '{text}'")))
}

fn parse_dimension(text: &str, field: &str) -> Result<u32, FormatError> {
    text.trim()
        .parse()
        .map_err(|_| FormatError::invalid_format(format!("{field}: '{text}'")))
}

fn parse_flag(text: &str) -> Result<bool, FormatError> {
    match text.trim().parse::<i64>() {
        Ok(value) => Ok(value != 0),
        Err(_) => Err(FormatError::invalid_format(format!("difficult: '{text}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metadata() {
        let format = PascalVocFormat;
        assert_eq!(format.id(), "voc");
        assert_eq!(format.extension(), "xml");
        assert!(format.supports_polygon());
    }

    #[test]
    fn test_bndbox_clamps_minimum_corner() {
        let points = [
            Point::new(0.0, 0.4),
            Point::new(20.7, 0.4),
            Point::new(20.7, 10.9),
        ];
        let bndbox = BndBox::from_points(&points).unwrap();
        assert_eq!(
            bndbox,
            BndBox {
                xmin: 1,
                ymin: 1,
                xmax: 20,
                ymax: 10,
            }
        );
        assert!(BndBox::from_points(&points[..2]).is_none());
    }

    #[test]
    fn test_touches_border() {
        let size = ImageSize::new(100, 80, 3);
        let inner = BndBox {
            xmin: 5,
            ymin: 5,
            xmax: 50,
            ymax: 50,
        };
        assert!(!inner.touches_border(size));
        assert!(BndBox { ymax: 80, ..inner }.touches_border(size));
        assert!(BndBox { xmin: 1, ..inner }.touches_border(size));
    }
}
