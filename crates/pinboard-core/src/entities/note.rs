//! Text note entity.

use super::{Connectable, EntityId, EntityRef, GeometryObservers, SerializableColor, edge_midpoints};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Font weight options.
///
/// Serialized as a CSS-style numeric weight. A legacy boolean
/// (`"font_bold": true`) is accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontWeight {
    Light,
    #[default]
    Regular,
    Bold,
}

impl FontWeight {
    pub fn numeric(&self) -> u16 {
        match self {
            FontWeight::Light => 300,
            FontWeight::Regular => 400,
            FontWeight::Bold => 700,
        }
    }

    pub fn from_numeric(weight: u16) -> Self {
        match weight {
            0..=349 => FontWeight::Light,
            350..=599 => FontWeight::Regular,
            _ => FontWeight::Bold,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, FontWeight::Bold)
    }

    /// Average glyph width as a fraction of the font size.
    fn char_width_factor(&self) -> f64 {
        match self {
            FontWeight::Light => 0.50,
            FontWeight::Regular => 0.55,
            FontWeight::Bold => 0.60,
        }
    }
}

impl Serialize for FontWeight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.numeric())
    }
}

impl<'de> Deserialize<'de> for FontWeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Numeric(u16),
            Bold(bool),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Numeric(weight) => FontWeight::from_numeric(weight),
            Raw::Bold(true) => FontWeight::Bold,
            Raw::Bold(false) => FontWeight::Regular,
        })
    }
}

/// Visual style of a note. Missing keys fall back to the defaults and
/// unknown keys are ignored when reading a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteStyle {
    pub background_color: SerializableColor,
    pub border_color: SerializableColor,
    pub text_color: SerializableColor,
    pub border_width: f64,
    pub corner_radius: f64,
    pub padding: f64,
    pub font_family: String,
    pub font_size: f64,
    #[serde(alias = "font_bold")]
    pub font_weight: FontWeight,
    pub font_italic: bool,
    pub min_width: f64,
    pub min_height: f64,
    /// Text wraps once a line would make the note wider than this.
    pub max_width: f64,
}

impl Default for NoteStyle {
    fn default() -> Self {
        Self {
            background_color: SerializableColor::rgb(255, 255, 200),
            border_color: SerializableColor::rgb(200, 200, 150),
            text_color: SerializableColor::black(),
            border_width: 2.0,
            corner_radius: 8.0,
            padding: 10.0,
            font_family: "Arial".to_string(),
            font_size: 12.0,
            font_weight: FontWeight::Regular,
            font_italic: false,
            min_width: 100.0,
            min_height: 60.0,
            max_width: 320.0,
        }
    }
}

impl NoteStyle {
    /// Line height as a multiple of the font size.
    pub const LINE_HEIGHT: f64 = 1.2;

    /// Whether switching from `self` to `other` can change a note's bounds.
    pub fn affects_geometry(&self, other: &NoteStyle) -> bool {
        self.padding != other.padding
            || self.font_family != other.font_family
            || self.font_size != other.font_size
            || self.font_weight != other.font_weight
            || self.font_italic != other.font_italic
            || self.min_width != other.min_width
            || self.min_height != other.min_height
            || self.max_width != other.max_width
    }
}

/// A text note.
#[derive(Debug, Clone)]
pub struct Note {
    pub(crate) id: EntityId,
    /// Top-left corner of the note box.
    pub(crate) position: Point,
    pub(crate) text: String,
    pub(crate) style: NoteStyle,
    /// Text extent reported by the rendering layer, if any.
    pub(crate) measured_text: Option<Size>,
    pub(crate) observers: GeometryObservers,
}

impl Note {
    pub(crate) fn new(id: EntityId, position: Point, text: impl Into<String>, style: NoteStyle) -> Self {
        Self {
            id,
            position,
            text: text.into(),
            style,
            measured_text: None,
            observers: GeometryObservers::default(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &NoteStyle {
        &self.style
    }

    pub fn measured_text_size(&self) -> Option<Size> {
        self.measured_text
    }

    /// Size of the text block, either measured by the renderer or estimated
    /// from character counts with wrapping at the style's max width.
    pub fn text_extent(&self) -> Size {
        if let Some(measured) = self.measured_text {
            return measured;
        }

        let style = &self.style;
        let char_width = style.font_size * style.font_weight.char_width_factor();
        let line_height = style.font_size * NoteStyle::LINE_HEIGHT;
        let wrap_width = (style.max_width - 2.0 * style.padding).max(char_width);

        let mut width: f64 = 0.0;
        let mut lines = 0usize;
        for line in self.text.split('\n') {
            let line_width = line.chars().count() as f64 * char_width;
            if line_width > wrap_width {
                lines += (line_width / wrap_width).ceil() as usize;
                width = wrap_width;
            } else {
                lines += 1;
                width = width.max(line_width);
            }
        }

        Size::new(width, lines.max(1) as f64 * line_height)
    }

    /// Size of the note box, never smaller than the style minimums.
    pub fn size(&self) -> Size {
        let text = self.text_extent();
        let padding = self.style.padding;
        Size::new(
            (text.width + 2.0 * padding).max(self.style.min_width),
            (text.height + 2.0 * padding).max(self.style.min_height),
        )
    }

    pub fn center(&self) -> Point {
        Connectable::bounds(self).center()
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
        // A stale measurement would describe the old text.
        self.measured_text = None;
    }

    pub(crate) fn set_style(&mut self, style: NoteStyle) {
        if self.style.affects_geometry(&style) {
            self.measured_text = None;
        }
        self.style = style;
    }

    pub(crate) fn set_measured_text_size(&mut self, size: Option<Size>) {
        self.measured_text = size;
    }
}

impl Connectable for Note {
    fn entity_ref(&self) -> EntityRef {
        EntityRef::Note(self.id)
    }

    fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size())
    }

    fn anchor_points(&self) -> Vec<Point> {
        edge_midpoints(self.bounds()).to_vec()
    }

    fn contains(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }

    fn observers(&self) -> &GeometryObservers {
        &self.observers
    }

    fn observers_mut(&mut self) -> &mut GeometryObservers {
        &mut self.observers
    }
}
