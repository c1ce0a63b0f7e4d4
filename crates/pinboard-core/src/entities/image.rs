//! Raster image entity.

use super::{Connectable, EntityId, EntityRef, GeometryObservers, SerializableColor, edge_midpoints};
use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Natural size used when the source cannot be probed.
pub const PLACEHOLDER_SIZE: Size = Size::new(200.0, 150.0);

/// Image format detected from stored bytes or the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    WebP,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::WebP => "image/webp",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.starts_with(b"GIF8") {
            return Some(ImageFormat::Gif);
        }
        if data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// Read the pixel dimensions from a PNG stream.
fn probe_png<R: Read>(reader: R) -> Option<Size> {
    let decoder = png::Decoder::new(reader);
    let reader = decoder.read_info().ok()?;
    let info = reader.info();
    if info.width == 0 || info.height == 0 {
        return None;
    }
    Some(Size::new(info.width as f64, info.height as f64))
}

/// Natural size of encoded image bytes, if the format can be probed.
pub(crate) fn probe_bytes(data: &[u8]) -> Option<Size> {
    match ImageFormat::from_magic_bytes(data)? {
        ImageFormat::Png => probe_png(Cursor::new(data)),
        _ => None,
    }
}

/// Natural size of an image file, if it exists and can be probed.
pub(crate) fn probe_file(path: &Path) -> Option<Size> {
    let file = File::open(path).ok()?;
    probe_png(BufReader::new(file))
}

/// Visual style of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageStyle {
    pub border_width: f64,
    pub border_color: SerializableColor,
    pub background_color: SerializableColor,
    /// Display box the natural image is fitted into.
    pub max_width: f64,
    pub max_height: f64,
    pub maintain_aspect_ratio: bool,
    pub opacity: f64,
}

impl Default for ImageStyle {
    fn default() -> Self {
        Self {
            border_width: 2.0,
            border_color: SerializableColor::rgb(100, 100, 100),
            background_color: SerializableColor::transparent(),
            max_width: 400.0,
            max_height: 300.0,
            maintain_aspect_ratio: true,
            opacity: 1.0,
        }
    }
}

impl ImageStyle {
    /// Whether switching from `self` to `other` can change an image's bounds.
    pub fn affects_geometry(&self, other: &ImageStyle) -> bool {
        self.max_width != other.max_width
            || self.max_height != other.max_height
            || self.maintain_aspect_ratio != other.maintain_aspect_ratio
    }
}

/// An image placed on the board.
#[derive(Debug, Clone)]
pub struct Image {
    pub(crate) id: EntityId,
    /// Top-left corner of the unrotated display rect.
    pub(crate) position: Point,
    pub(crate) source_path: Option<PathBuf>,
    pub(crate) natural_size: Size,
    pub(crate) style: ImageStyle,
    /// Degrees in [0, 360), applied about the display centre.
    pub(crate) rotation: f64,
    pub(crate) z_value: f64,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    /// Encoded bytes restored from a document.
    pub(crate) data: Option<Vec<u8>>,
    pub(crate) observers: GeometryObservers,
}

impl Image {
    pub(crate) fn new(
        id: EntityId,
        position: Point,
        source_path: Option<PathBuf>,
        natural_size: Size,
        style: ImageStyle,
    ) -> Self {
        let natural_size = if natural_size.width > 0.0 && natural_size.height > 0.0 {
            natural_size
        } else {
            PLACEHOLDER_SIZE
        };
        let mut style = style;
        style.opacity = style.opacity.clamp(0.0, 1.0);
        Self {
            id,
            position,
            source_path,
            natural_size,
            style,
            rotation: 0.0,
            z_value: 0.0,
            visible: true,
            enabled: true,
            data: None,
            observers: GeometryObservers::default(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn natural_size(&self) -> Size {
        self.natural_size
    }

    pub fn style(&self) -> &ImageStyle {
        &self.style
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn z_value(&self) -> f64 {
        self.z_value
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.data
            .as_deref()
            .and_then(ImageFormat::from_magic_bytes)
            .or_else(|| {
                self.source_path
                    .as_deref()
                    .and_then(Path::extension)
                    .and_then(|ext| ext.to_str())
                    .and_then(ImageFormat::from_extension)
            })
    }

    /// Size the natural image takes once fitted into the style's box.
    pub fn display_size(&self) -> Size {
        let (max_w, max_h) = (self.style.max_width.max(1.0), self.style.max_height.max(1.0));
        if !self.style.maintain_aspect_ratio {
            return Size::new(max_w, max_h);
        }
        let scale = (max_w / self.natural_size.width).min(max_h / self.natural_size.height);
        Size::new(self.natural_size.width * scale, self.natural_size.height * scale)
    }

    /// Display width relative to the natural width.
    pub fn scale_factor(&self) -> f64 {
        self.display_size().width / self.natural_size.width
    }

    /// Unrotated display rect.
    pub fn local_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.display_size())
    }

    /// Rotation about the display centre.
    pub fn transform(&self) -> Affine {
        Affine::rotate_about(self.rotation.to_radians(), self.local_rect().center())
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub(crate) fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees.rem_euclid(360.0);
    }

    pub(crate) fn set_style(&mut self, style: ImageStyle) {
        self.style = style;
        self.style.opacity = self.style.opacity.clamp(0.0, 1.0);
    }

    pub(crate) fn set_data(&mut self, data: Option<Vec<u8>>) {
        self.data = data;
    }

    pub(crate) fn set_flags(&mut self, z_value: f64, visible: bool, enabled: bool) {
        self.z_value = z_value;
        self.visible = visible;
        self.enabled = enabled;
    }

    /// Style that displays the image at `size`. With the aspect lock on,
    /// the largest aspect-preserving size inside `size` is used.
    pub fn style_for_size(&self, size: Size) -> ImageStyle {
        let mut style = self.style.clone();
        if style.maintain_aspect_ratio {
            let scale = (size.width / self.natural_size.width).min(size.height / self.natural_size.height);
            style.max_width = self.natural_size.width * scale;
            style.max_height = self.natural_size.height * scale;
        } else {
            style.max_width = size.width;
            style.max_height = size.height;
        }
        style
    }

    /// Style that displays the image at its natural pixel size.
    pub fn natural_style(&self) -> ImageStyle {
        let mut style = self.style.clone();
        style.max_width = self.natural_size.width;
        style.max_height = self.natural_size.height;
        style
    }
}

impl Connectable for Image {
    fn entity_ref(&self) -> EntityRef {
        EntityRef::Image(self.id)
    }

    fn bounds(&self) -> Rect {
        self.transform().transform_rect_bbox(self.local_rect())
    }

    /// Edge midpoints (top, right, bottom, left) then corners
    /// (top-left, top-right, bottom-right, bottom-left), rotated.
    fn anchor_points(&self) -> Vec<Point> {
        let rect = self.local_rect();
        let transform = self.transform();
        let corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        edge_midpoints(rect)
            .into_iter()
            .chain(corners)
            .map(|p| transform * p)
            .collect()
    }

    fn contains(&self, point: Point) -> bool {
        self.local_rect().contains(self.transform().inverse() * point)
    }

    fn observers(&self) -> &GeometryObservers {
        &self.observers
    }

    fn observers_mut(&mut self) -> &mut GeometryObservers {
        &mut self.observers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::encode_png;

    fn image(natural: Size) -> Image {
        Image::new(EntityId(1), Point::ZERO, None, natural, ImageStyle::default())
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("tiff"), None);
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::from_magic_bytes(&[1, 2]), None);
    }

    #[test]
    fn test_probe_png_bytes() {
        let bytes = encode_png(8, 4);
        let size = probe_bytes(&bytes).unwrap();
        assert!((size.width - 8.0).abs() < f64::EPSILON);
        assert!((size.height - 4.0).abs() < f64::EPSILON);
        assert!(probe_bytes(b"not an image").is_none());
    }

    #[test]
    fn test_probe_missing_file() {
        assert!(probe_file(Path::new("/definitely/not/here.png")).is_none());
    }

    #[test]
    fn test_placeholder_for_unknown_size() {
        let img = image(Size::ZERO);
        assert_eq!(img.natural_size(), PLACEHOLDER_SIZE);
    }

    #[test]
    fn test_fit_keeps_aspect() {
        // 1000x500 into 400x300
        let img = image(Size::new(1000.0, 500.0));
        let size = img.display_size();
        assert!((size.width - 400.0).abs() < 1e-9);
        assert!((size.height - 200.0).abs() < 1e-9);
        assert!((img.scale_factor() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_fit_ignoring_aspect() {
        let mut img = image(Size::new(1000.0, 500.0));
        let mut style = img.style().clone();
        style.maintain_aspect_ratio = false;
        img.set_style(style);
        assert_eq!(img.display_size(), Size::new(400.0, 300.0));
    }

    #[test]
    fn test_rotation_normalized() {
        let mut img = image(Size::new(100.0, 100.0));
        img.set_rotation(450.0);
        assert!((img.rotation() - 90.0).abs() < 1e-9);
        img.set_rotation(-90.0);
        assert!((img.rotation() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_anchors_and_bounds() {
        // 200x100 natural fits 400x300 as 400x200.
        let mut img = image(Size::new(200.0, 100.0));
        assert_eq!(img.local_rect(), Rect::new(0.0, 0.0, 400.0, 200.0));
        img.set_rotation(90.0);

        let bounds = img.bounds();
        assert!((bounds.width() - 200.0).abs() < 1e-9);
        assert!((bounds.height() - 400.0).abs() < 1e-9);
        assert!((bounds.center().x - 200.0).abs() < 1e-9);

        let anchors = img.anchor_points();
        assert_eq!(anchors.len(), 8);
        // Top midpoint rotates to the right side of the centre.
        assert!((anchors[0].x - 300.0).abs() < 1e-9);
        assert!((anchors[0].y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_contains_respects_rotation() {
        let mut img = image(Size::new(200.0, 100.0));
        assert!(img.contains(Point::new(390.0, 100.0)));
        img.set_rotation(90.0);
        assert!(!img.contains(Point::new(390.0, 100.0)));
        assert!(img.contains(Point::new(200.0, -50.0)));
    }

    #[test]
    fn test_style_for_size_and_natural() {
        let img = image(Size::new(200.0, 100.0));
        let style = img.style_for_size(Size::new(100.0, 100.0));
        assert!((style.max_width - 100.0).abs() < 1e-9);
        assert!((style.max_height - 50.0).abs() < 1e-9);

        let natural = img.natural_style();
        assert!((natural.max_width - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_opacity_clamped() {
        let mut img = image(Size::new(10.0, 10.0));
        let mut style = img.style().clone();
        style.opacity = 3.0;
        img.set_style(style);
        assert!((img.style().opacity - 1.0).abs() < f64::EPSILON);
    }
}
