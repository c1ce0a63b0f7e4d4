//! Document records for individual entities.

use crate::entities::{
    Connection, ConnectionStyle, EntityId, EntityRef, Image, ImageStyle, Note, NoteStyle,
    probe_bytes, probe_file,
};
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for PointRecord {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<PointRecord> for Point {
    fn from(p: PointRecord) -> Self {
        Point::new(p.x, p.y)
    }
}

/// Rectangle written as origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectRecord {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for RectRecord {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 10_000.0,
            height: 10_000.0,
        }
    }
}

impl From<Rect> for RectRecord {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x0,
            y: r.y0,
            width: r.width(),
            height: r.height(),
        }
    }
}

impl From<RectRecord> for Rect {
    fn from(r: RectRecord) -> Self {
        Rect::new(r.x, r.y, r.x + r.width, r.y + r.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRecord {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: EntityId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub position: PointRecord,
    #[serde(default)]
    pub style: NoteStyle,
}

impl NoteRecord {
    pub fn from_note(note: &Note) -> Self {
        Self {
            id: note.id(),
            text: note.text().to_string(),
            position: note.position().into(),
            style: note.style().clone(),
        }
    }

    pub(crate) fn to_note(&self) -> Note {
        Note::new(self.id, self.position.into(), self.text.clone(), self.style.clone())
    }
}

/// Bookkeeping written alongside each image record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageMetadata {
    pub serialized_at: String,
    pub has_base64: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: EntityId,
    #[serde(default)]
    pub position: PointRecord,
    #[serde(default)]
    pub style: ImageStyle,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z_value: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Pixel size of the source, for formats whose headers are not probed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_size: Option<SizeRecord>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub metadata: ImageMetadata,
}

impl ImageRecord {
    /// Record without embedded bytes, stamped with the current time.
    fn bare(image: &Image) -> Self {
        let natural = image.natural_size();
        Self {
            id: image.id(),
            position: image.position().into(),
            style: image.style().clone(),
            rotation: image.rotation(),
            z_value: image.z_value(),
            visible: image.is_visible(),
            enabled: image.is_enabled(),
            natural_size: Some(SizeRecord {
                width: natural.width,
                height: natural.height,
            }),
            image_path: image.source_path().map(|p| p.to_string_lossy().into_owned()),
            image_base64: None,
            original_filename: image
                .source_path()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned()),
            file_size: None,
            metadata: ImageMetadata {
                serialized_at: chrono::Utc::now().to_rfc3339(),
                has_base64: false,
            },
        }
    }

    fn embed_bytes(&mut self, bytes: &[u8]) {
        self.image_base64 = Some(BASE64.encode(bytes));
        self.file_size = Some(bytes.len() as u64);
        self.metadata.has_base64 = true;
    }

    /// Snapshot an image without touching the file system. Bytes already
    /// held in memory are embedded.
    pub fn snapshot(image: &Image) -> Self {
        let mut record = Self::bare(image);
        if let Some(bytes) = image.data() {
            record.embed_bytes(bytes);
        }
        record
    }

    /// Record for a saved document: the source file is read and embedded,
    /// falling back to in-memory bytes. An unreadable source keeps its path
    /// and is reported in the returned warning.
    pub fn embed(image: &Image) -> (Self, Option<String>) {
        let mut record = Self::bare(image);
        let mut warning = None;
        if let Some(path) = image.source_path() {
            match std::fs::read(path) {
                Ok(bytes) => record.embed_bytes(&bytes),
                Err(e) => {
                    warning = Some(format!(
                        "Image {}: could not read {}: {}",
                        image.id(),
                        path.display(),
                        e
                    ));
                }
            }
        }
        if !record.metadata.has_base64 {
            if let Some(bytes) = image.data() {
                record.embed_bytes(bytes);
                warning = None;
            }
        }
        (record, warning)
    }

    /// Embedded bytes, if any. Malformed base64 is a decode error.
    pub fn decode_data(&self) -> Result<Option<Vec<u8>>> {
        match &self.image_base64 {
            Some(encoded) if !encoded.is_empty() => Ok(Some(BASE64.decode(encoded)?)),
            _ => Ok(None),
        }
    }

    pub(crate) fn to_image(&self) -> Result<Image> {
        let data = self.decode_data()?;
        let path = self
            .image_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        if data.is_none() && path.is_none() {
            return Err(Error::Validation(format!(
                "Image {} has neither embedded data nor a source path",
                self.id
            )));
        }
        let natural = self
            .natural_size
            .map(|s| Size::new(s.width, s.height))
            .or_else(|| data.as_deref().and_then(probe_bytes))
            .or_else(|| path.as_deref().and_then(probe_file))
            .unwrap_or(Size::ZERO);

        let mut image = Image::new(self.id, self.position.into(), path, natural, self.style.clone());
        image.set_rotation(self.rotation);
        image.set_flags(self.z_value, self.visible, self.enabled);
        image.set_data(data);
        Ok(image)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: EntityId,
    #[serde(default)]
    pub start_item_id: Option<EntityRef>,
    #[serde(default)]
    pub end_item_id: Option<EntityRef>,
    /// Older documents only name note endpoints, by bare id.
    #[serde(default)]
    pub start_note_id: Option<EntityId>,
    #[serde(default)]
    pub end_note_id: Option<EntityId>,
    #[serde(default)]
    pub style: ConnectionStyle,
    #[serde(default)]
    pub start_point: Option<PointRecord>,
    #[serde(default)]
    pub end_point: Option<PointRecord>,
}

impl ConnectionRecord {
    pub fn from_connection(connection: &Connection) -> Self {
        let note_id = |r: EntityRef| match r {
            EntityRef::Note(id) => Some(id),
            _ => None,
        };
        Self {
            id: connection.id(),
            start_item_id: Some(connection.start()),
            end_item_id: Some(connection.end()),
            start_note_id: note_id(connection.start()),
            end_note_id: note_id(connection.end()),
            style: connection.style().clone(),
            start_point: Some(connection.start_point().into()),
            end_point: Some(connection.end_point().into()),
        }
    }

    /// Endpoints as written, preferring the tagged fields.
    pub fn endpoints(&self) -> Option<(EntityRef, EntityRef)> {
        let start = self.start_item_id.or(self.start_note_id.map(EntityRef::Note))?;
        let end = self.end_item_id.or(self.end_note_id.map(EntityRef::Note))?;
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::encode_png;

    #[test]
    fn test_note_record_json_shape() {
        let note = Note::new(EntityId(4), Point::new(10.0, 20.0), "Hello", NoteStyle::default());
        let value = serde_json::to_value(NoteRecord::from_note(&note)).unwrap();
        assert_eq!(value["id"], 4);
        assert_eq!(value["text"], "Hello");
        assert_eq!(value["position"]["x"], 10.0);
        assert_eq!(value["style"]["background_color"], "#ffffc8");
    }

    #[test]
    fn test_note_record_ignores_unknown_style_keys() {
        let record: NoteRecord = serde_json::from_str(
            r##"{"id": 1, "text": "x", "position": {"x": 1, "y": 2},
                "style": {"font_size": 18, "shadow": true}}"##,
        )
        .unwrap();
        assert!((record.style.font_size - 18.0).abs() < f64::EPSILON);
        assert_eq!(record.to_note().position(), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_connection_record_legacy_fields() {
        let record: ConnectionRecord =
            serde_json::from_str(r#"{"id": 9, "start_note_id": 1, "end_note_id": 2}"#).unwrap();
        assert_eq!(
            record.endpoints(),
            Some((EntityRef::Note(EntityId(1)), EntityRef::Note(EntityId(2))))
        );

        let record: ConnectionRecord = serde_json::from_str(
            r#"{"id": 9, "start_item_id": "image_3", "end_item_id": "note_2", "start_note_id": 7}"#,
        )
        .unwrap();
        assert_eq!(
            record.endpoints(),
            Some((EntityRef::Image(EntityId(3)), EntityRef::Note(EntityId(2))))
        );

        let record: ConnectionRecord = serde_json::from_str(r#"{"id": 9}"#).unwrap();
        assert_eq!(record.endpoints(), None);
    }

    #[test]
    fn test_image_record_decodes_embedded_bytes() {
        let bytes = encode_png(40, 20);
        let mut image = Image::new(EntityId(2), Point::ZERO, None, Size::new(40.0, 20.0), ImageStyle::default());
        image.set_data(Some(bytes.clone()));

        let mut record = ImageRecord::snapshot(&image);
        assert!(record.metadata.has_base64);
        assert_eq!(record.file_size, Some(bytes.len() as u64));

        record.natural_size = None;
        let restored = record.to_image().unwrap();
        assert_eq!(restored.data(), Some(bytes.as_slice()));
        assert_eq!(restored.natural_size(), Size::new(40.0, 20.0));
    }

    #[test]
    fn test_image_record_invalid_base64() {
        let record: ImageRecord = serde_json::from_str(
            r#"{"id": 1, "position": {"x": 0, "y": 0}, "image_base64": "%%% not base64"}"#,
        )
        .unwrap();
        assert!(matches!(record.to_image(), Err(Error::Decode(_))));
    }

    #[test]
    fn test_image_record_needs_a_source() {
        let record: ImageRecord = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(matches!(record.to_image(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_unreadable_source_keeps_path() {
        let image = Image::new(
            EntityId(1),
            Point::ZERO,
            Some(PathBuf::from("/definitely/not/here.png")),
            Size::ZERO,
            ImageStyle::default(),
        );
        let (record, warning) = ImageRecord::embed(&image);
        assert!(warning.is_some());
        assert!(!record.metadata.has_base64);
        assert_eq!(record.image_path.as_deref(), Some("/definitely/not/here.png"));
        assert_eq!(record.original_filename.as_deref(), Some("here.png"));
    }
}
