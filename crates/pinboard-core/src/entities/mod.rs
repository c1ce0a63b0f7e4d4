//! Entity definitions for the board: notes, images and the connections
//! drawn between them.

mod connection;
mod image;
mod note;

pub use connection::{Connection, ConnectionStyle, LineStyle};
pub use image::{Image, ImageFormat, ImageStyle, PLACEHOLDER_SIZE};
pub(crate) use image::{probe_bytes, probe_file};
pub use note::{FontWeight, Note, NoteStyle};

use crate::error::Error;
use kurbo::{Point, Rect};
use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of an entity, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of entity a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Note,
    Image,
    Connection,
}

impl EntityKind {
    /// Prefix used in tagged identifiers (`note_12`).
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Note => "note",
            EntityKind::Image => "image",
            EntityKind::Connection => "connection",
        }
    }
}

/// Typed reference to an entity.
///
/// Displays and parses as a tagged identifier such as `note_3` or
/// `image_12`, which is also its serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
    Note(EntityId),
    Image(EntityId),
    Connection(EntityId),
}

impl EntityRef {
    pub fn id(&self) -> EntityId {
        match self {
            EntityRef::Note(id) | EntityRef::Image(id) | EntityRef::Connection(id) => *id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Note(_) => EntityKind::Note,
            EntityRef::Image(_) => EntityKind::Image,
            EntityRef::Connection(_) => EntityKind::Connection,
        }
    }

    /// Notes and images can be connection endpoints; connections cannot.
    pub fn is_endpoint(&self) -> bool {
        !matches!(self, EntityRef::Connection(_))
    }

    /// Same kind, different id.
    pub fn with_id(&self, id: EntityId) -> Self {
        match self {
            EntityRef::Note(_) => EntityRef::Note(id),
            EntityRef::Image(_) => EntityRef::Image(id),
            EntityRef::Connection(_) => EntityRef::Connection(id),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind().tag(), self.id())
    }
}

impl FromStr for EntityRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, raw_id) = s
            .rsplit_once('_')
            .ok_or_else(|| Error::Validation(format!("Untagged entity reference: {}", s)))?;
        let id = raw_id
            .parse::<u64>()
            .map(EntityId)
            .map_err(|_| Error::Validation(format!("Invalid entity id in reference: {}", s)))?;
        match tag {
            "note" => Ok(EntityRef::Note(id)),
            "image" => Ok(EntityRef::Image(id)),
            "connection" => Ok(EntityRef::Connection(id)),
            _ => Err(Error::Validation(format!("Unknown entity tag: {}", tag))),
        }
    }
}

impl Serialize for EntityRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Serializable color representation (RGBA8).
///
/// Serialized as a hex string: `#rrggbb` when opaque, `#rrggbbaa` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Some(Self::transparent());
        }
        let hex = s.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
                Some(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid color: {}", value))
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Connections listening for geometry changes of an endpoint.
///
/// The store notifies every subscriber synchronously whenever the owning
/// entity's bounds change, and the subscriber re-routes itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryObservers {
    subscribers: Vec<EntityId>,
}

impl GeometryObservers {
    /// Register a connection. Returns false if it was already subscribed.
    pub fn subscribe(&mut self, connection: EntityId) -> bool {
        if self.subscribers.contains(&connection) {
            return false;
        }
        self.subscribers.push(connection);
        true
    }

    /// Remove a connection. Safe to call repeatedly; returns whether
    /// anything was removed.
    pub fn unsubscribe(&mut self, connection: EntityId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|c| *c != connection);
        self.subscribers.len() != before
    }

    pub fn contains(&self, connection: EntityId) -> bool {
        self.subscribers.contains(&connection)
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.subscribers.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Common trait for entities a connection can attach to.
pub trait Connectable {
    /// Typed reference to this entity.
    fn entity_ref(&self) -> EntityRef;

    /// Axis-aligned bounding box in scene coordinates.
    fn bounds(&self) -> Rect;

    /// Candidate connection termini, in a fixed order.
    fn anchor_points(&self) -> Vec<Point>;

    /// Check if a scene point lies on this entity.
    fn contains(&self, point: Point) -> bool;

    fn observers(&self) -> &GeometryObservers;

    fn observers_mut(&mut self) -> &mut GeometryObservers;
}

/// Midpoints of the four edges of a rect: top, right, bottom, left.
pub(crate) fn edge_midpoints(rect: Rect) -> [Point; 4] {
    let center = rect.center();
    [
        Point::new(center.x, rect.y0),
        Point::new(rect.x1, center.y),
        Point::new(center.x, rect.y1),
        Point::new(rect.x0, center.y),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_display_and_parse() {
        let note = EntityRef::Note(EntityId(7));
        assert_eq!(note.to_string(), "note_7");
        assert_eq!("note_7".parse::<EntityRef>().unwrap(), note);
        assert_eq!(
            "image_12".parse::<EntityRef>().unwrap(),
            EntityRef::Image(EntityId(12))
        );
        assert!("7".parse::<EntityRef>().is_err());
        assert!("shape_7".parse::<EntityRef>().is_err());
        assert!("note_x".parse::<EntityRef>().is_err());
    }

    #[test]
    fn test_entity_ref_serde() {
        let json = serde_json::to_string(&EntityRef::Image(EntityId(3))).unwrap();
        assert_eq!(json, "\"image_3\"");
        let back: EntityRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EntityRef::Image(EntityId(3)));
    }

    #[test]
    fn test_color_hex() {
        let color = SerializableColor::rgb(255, 255, 200);
        assert_eq!(color.to_hex(), "#ffffc8");
        assert_eq!(SerializableColor::from_hex("#ffffc8"), Some(color));
        assert_eq!(SerializableColor::from_hex("#FFFFC8"), Some(color));
        assert_eq!(
            SerializableColor::from_hex("#fff"),
            Some(SerializableColor::white())
        );
        assert_eq!(
            SerializableColor::from_hex("#00000080"),
            Some(SerializableColor::new(0, 0, 0, 128))
        );
        assert_eq!(
            SerializableColor::from_hex("transparent"),
            Some(SerializableColor::transparent())
        );
        assert_eq!(SerializableColor::from_hex("ffffff"), None);
        assert_eq!(SerializableColor::from_hex("#ggg"), None);
    }

    #[test]
    fn test_color_serde_as_hex() {
        let json = serde_json::to_string(&SerializableColor::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json, "\"#01020304\"");
        assert!(serde_json::from_str::<SerializableColor>("\"nope\"").is_err());
    }

    #[test]
    fn test_color_peniko_roundtrip() {
        let color = SerializableColor::rgb(100, 150, 200);
        let peniko: Color = color.into();
        assert_eq!(SerializableColor::from(peniko), color);
    }

    #[test]
    fn test_observers_idempotent_unsubscribe() {
        let mut observers = GeometryObservers::default();
        assert!(observers.subscribe(EntityId(1)));
        assert!(!observers.subscribe(EntityId(1)));
        assert_eq!(observers.len(), 1);
        assert!(observers.unsubscribe(EntityId(1)));
        assert!(!observers.unsubscribe(EntityId(1)));
        assert!(observers.is_empty());
    }

    #[test]
    fn test_edge_midpoints_order() {
        let mids = edge_midpoints(Rect::new(0.0, 0.0, 100.0, 60.0));
        assert_eq!(mids[0], Point::new(50.0, 0.0));
        assert_eq!(mids[1], Point::new(100.0, 30.0));
        assert_eq!(mids[2], Point::new(50.0, 60.0));
        assert_eq!(mids[3], Point::new(0.0, 30.0));
    }
}
