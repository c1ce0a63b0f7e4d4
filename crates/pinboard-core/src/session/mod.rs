//! Session documents: saving and restoring a whole board.
//!
//! A [`SessionDocument`] is a self-contained, versioned JSON document. Image
//! bytes are embedded as base64, so a saved board can be opened on another
//! machine without the original files.
//!
//! Loading is best-effort. Document-level problems (unreadable file, broken
//! JSON, missing `version`/`notes`/`connections`) abort the load before the
//! board is touched. Problems with a single entity only skip that entity;
//! each one is logged and recorded in the returned [`LoadReport`].

mod records;

pub use records::{
    ConnectionRecord, ImageMetadata, ImageRecord, NoteRecord, PointRecord, RectRecord, SizeRecord,
};

use crate::camera::Camera;
use crate::entities::EntityRef;
use crate::error::{Error, Result};
use crate::store::EntityStore;
use kurbo::Point;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Format version written to new documents.
pub const DOCUMENT_VERSION: &str = "1.0";

const REQUIRED_KEYS: [&str; 3] = ["version", "notes", "connections"];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneRecord {
    #[serde(default)]
    pub rect: RectRecord,
}

/// Saved camera state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasState {
    #[serde(default = "default_zoom")]
    pub zoom_factor: f64,
    #[serde(default)]
    pub center_x: f64,
    #[serde(default)]
    pub center_y: f64,
}

fn default_zoom() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub note_count: usize,
    pub connection_count: usize,
    pub image_count: usize,
    pub group_count: usize,
}

/// The persisted form of a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub version: String,
    pub created_at: String,
    /// Storage key the document was last saved under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub scene: SceneRecord,
    /// Absent when the document was written without a view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_state: Option<CanvasState>,
    pub notes: Vec<NoteRecord>,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    pub connections: Vec<ConnectionRecord>,
    /// Reserved; always empty.
    #[serde(default)]
    pub groups: Vec<Value>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Default for SessionDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            document_id: None,
            scene: SceneRecord::default(),
            canvas_state: None,
            notes: Vec::new(),
            images: Vec::new(),
            connections: Vec::new(),
            groups: Vec::new(),
            metadata: Metadata::default(),
        }
    }
}

/// Outcome of serializing a board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub notes: usize,
    pub images: usize,
    pub connections: usize,
    /// Entities left out of the document.
    pub skipped: usize,
    pub warnings: Vec<String>,
}

impl SaveReport {
    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Outcome of loading a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub notes: usize,
    pub images: usize,
    pub connections: usize,
    /// Entities that could not be parsed or rebuilt.
    pub skipped: usize,
    /// Connections dropped because an endpoint did not resolve.
    pub dropped_connections: usize,
    pub warnings: Vec<String>,
}

impl LoadReport {
    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Parse each element of an entity list on its own, skipping bad ones.
fn parse_entities<T: DeserializeOwned>(items: Vec<Value>, label: &str, report: &mut LoadReport) -> Vec<T> {
    let mut parsed = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(record) => parsed.push(record),
            Err(e) => {
                report.skipped += 1;
                report.warn(format!("Skipping {} #{}: {}", label, index, e));
            }
        }
    }
    parsed
}

fn take_list(object: &mut serde_json::Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(Error::Validation(format!("'{}' must be a list", key))),
    }
}

impl SessionDocument {
    /// Validate a raw document and parse it entity by entity.
    ///
    /// The returned report counts the entities that failed to parse.
    pub fn from_value(value: Value) -> Result<(Self, LoadReport)> {
        let Value::Object(mut object) = value else {
            return Err(Error::Validation("Document must be a JSON object".to_string()));
        };
        for key in REQUIRED_KEYS {
            if !object.contains_key(key) {
                return Err(Error::Validation(format!("Missing required key: {}", key)));
            }
        }
        for key in ["notes", "connections", "images"] {
            if object.get(key).is_some_and(|v| !v.is_array()) {
                return Err(Error::Validation(format!("'{}' must be a list", key)));
            }
        }

        let mut report = LoadReport::default();
        let version = match object.remove("version") {
            Some(Value::String(version)) => version,
            _ => return Err(Error::Validation("'version' must be a string".to_string())),
        };
        if version != DOCUMENT_VERSION {
            report.warn(format!(
                "Document version {} differs from {}; loading anyway",
                version, DOCUMENT_VERSION
            ));
        }

        let created_at = match object.remove("created_at") {
            Some(Value::String(created_at)) => created_at,
            _ => String::new(),
        };
        let document_id = match object.remove("document_id") {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };
        let scene = match object.remove("scene") {
            Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
                report.warn(format!("Ignoring malformed scene: {}", e));
                SceneRecord::default()
            }),
            None => SceneRecord::default(),
        };
        let canvas_state = match object.remove("canvas_state") {
            Some(Value::Object(state)) if !state.is_empty() => {
                match serde_json::from_value(Value::Object(state)) {
                    Ok(state) => Some(state),
                    Err(e) => {
                        report.warn(format!("Ignoring malformed canvas state: {}", e));
                        None
                    }
                }
            }
            _ => None,
        };
        let metadata = object
            .remove("metadata")
            .and_then(|raw| serde_json::from_value(raw).ok())
            .unwrap_or_default();

        let notes = parse_entities(take_list(&mut object, "notes")?, "note", &mut report);
        let images = parse_entities(take_list(&mut object, "images")?, "image", &mut report);
        let connections = parse_entities(take_list(&mut object, "connections")?, "connection", &mut report);

        let document = Self {
            version,
            created_at,
            document_id,
            scene,
            canvas_state,
            notes,
            images,
            connections,
            groups: Vec::new(),
            metadata,
        };
        Ok((document, report))
    }

    pub fn from_json(json: &str) -> Result<(Self, LoadReport)> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("Document is not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Write every entity of the board into a document.
///
/// Image files are read and embedded. An unreadable image file keeps its
/// path and is reported; an entity that cannot be written at all is left
/// out, and the metadata counts only what was written.
pub fn serialize(store: &EntityStore, camera: &Camera) -> (SessionDocument, SaveReport) {
    let mut report = SaveReport::default();
    let mut document = SessionDocument {
        scene: SceneRecord {
            rect: store.scene().rect().into(),
        },
        canvas_state: Some(CanvasState {
            zoom_factor: camera.zoom(),
            center_x: camera.center().x,
            center_y: camera.center().y,
        }),
        ..SessionDocument::default()
    };

    document.notes = store.notes().map(NoteRecord::from_note).collect();

    for image in store.images() {
        if image.source_path().is_none() && image.data().is_none() {
            report.skipped += 1;
            report.warn(format!("Image {} has no source path or data; not saved", image.id()));
            continue;
        }
        let (record, warning) = ImageRecord::embed(image);
        if let Some(warning) = warning {
            report.warn(warning);
        }
        document.images.push(record);
    }

    for connection in store.connections() {
        if let Err(e) = store.route(connection.id()) {
            report.skipped += 1;
            report.warn(format!("Connection {} not saved: {}", connection.id(), e));
            continue;
        }
        document.connections.push(ConnectionRecord::from_connection(connection));
    }

    report.notes = document.notes.len();
    report.images = document.images.len();
    report.connections = document.connections.len();
    document.metadata = Metadata {
        note_count: report.notes,
        connection_count: report.connections,
        image_count: report.images,
        group_count: 0,
    };
    log::info!(
        "Serialized {} notes, {} images and {} connections",
        report.notes,
        report.images,
        report.connections
    );
    (document, report)
}

/// Replace the board's contents with a parsed document.
///
/// Notes and images are rebuilt first; connections are then resolved
/// through the table of rebuilt endpoints.
pub fn restore(store: &mut EntityStore, camera: &mut Camera, document: &SessionDocument, report: &mut LoadReport) {
    store.clear();
    store.scene_mut().include_rect(document.scene.rect.into());
    if let Some(state) = document.canvas_state {
        camera.restore(state.zoom_factor, Point::new(state.center_x, state.center_y));
        log::debug!(
            "Restored canvas state: zoom={:.2}, center=({:.1}, {:.1})",
            state.zoom_factor,
            state.center_x,
            state.center_y
        );
    }

    let mut id_map: HashMap<EntityRef, EntityRef> = HashMap::new();
    for record in &document.notes {
        let id = store.add_note(Some(record.id), record.to_note());
        if id != record.id {
            log::debug!("Note {} reassigned id {}", record.id, id);
        }
        id_map.insert(EntityRef::Note(record.id), EntityRef::Note(id));
        report.notes += 1;
    }
    for record in &document.images {
        match record.to_image() {
            Ok(image) => {
                let id = store.add_image(Some(record.id), image);
                id_map.insert(EntityRef::Image(record.id), EntityRef::Image(id));
                report.images += 1;
            }
            Err(e) => {
                report.skipped += 1;
                report.warn(format!("Skipping image {}: {}", record.id, e));
            }
        }
    }

    for record in &document.connections {
        let Some((start, end)) = record.endpoints() else {
            report.dropped_connections += 1;
            report.warn(format!("Connection {} has no endpoint references; dropped", record.id));
            continue;
        };
        let (Some(&from), Some(&to)) = (id_map.get(&start), id_map.get(&end)) else {
            report.dropped_connections += 1;
            report.warn(format!(
                "Connection {} references missing {} or {}; dropped",
                record.id, start, end
            ));
            continue;
        };
        match store.add_connection(Some(record.id), from, to, record.style.clone()) {
            Ok(_) => report.connections += 1,
            Err(e) => {
                report.skipped += 1;
                report.warn(format!("Skipping connection {}: {}", record.id, e));
            }
        }
    }

    log::info!(
        "Deserialized {} notes, {} images and {} connections ({} skipped, {} dropped)",
        report.notes,
        report.images,
        report.connections,
        report.skipped,
        report.dropped_connections
    );
}

/// Validate a raw document and load it into the board.
///
/// Validation happens before the board is cleared, so a rejected document
/// leaves the board untouched.
pub fn deserialize(store: &mut EntityStore, camera: &mut Camera, value: Value) -> Result<LoadReport> {
    let (document, mut report) = SessionDocument::from_value(value)?;
    restore(store, camera, &document, &mut report);
    Ok(report)
}

/// Serialize the board and write it to `path` as pretty JSON.
pub fn save(store: &EntityStore, camera: &Camera, path: &Path) -> Result<SaveReport> {
    let (document, report) = serialize(store, camera);
    let json = document.to_json()?;
    std::fs::write(path, json)
        .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))?;
    log::info!("Session saved to {}", path.display());
    Ok(report)
}

/// Read a document from `path` and load it into the board.
pub fn load(store: &mut EntityStore, camera: &mut Camera, path: &Path) -> Result<LoadReport> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    let (document, mut report) = SessionDocument::from_json(&json)?;
    restore(store, camera, &document, &mut report);
    log::info!("Session loaded from {}", path.display());
    Ok(report)
}
