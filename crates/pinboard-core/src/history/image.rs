//! Image commands.

use super::Command;
use crate::entities::{EntityId, EntityRef, Image, ImageStyle, probe_bytes, probe_file};
use crate::error::{Error, Result};
use crate::store::EntityStore;
use kurbo::{Point, Size};
use serde_json::json;
use std::path::PathBuf;

/// Place an image on the board. The natural size is probed once, when the
/// command is built.
#[derive(Debug, Clone)]
pub struct AddImage {
    path: Option<PathBuf>,
    position: Point,
    natural_size: Size,
    style: ImageStyle,
    data: Option<Vec<u8>>,
    created: Option<EntityId>,
}

impl AddImage {
    pub fn new(path: impl Into<PathBuf>, position: Point) -> Self {
        let path = path.into();
        let natural_size = probe_file(&path).unwrap_or(Size::ZERO);
        Self {
            path: Some(path),
            position,
            natural_size,
            style: ImageStyle::default(),
            data: None,
            created: None,
        }
    }

    /// Image from encoded bytes already in memory (e.g. pasted).
    pub fn from_bytes(data: Vec<u8>, position: Point) -> Self {
        Self {
            path: None,
            position,
            natural_size: probe_bytes(&data).unwrap_or(Size::ZERO),
            style: ImageStyle::default(),
            data: Some(data),
            created: None,
        }
    }

    /// Override the natural size, for formats that are not probed.
    pub fn with_natural_size(mut self, size: Size) -> Self {
        self.natural_size = size;
        self
    }

    pub fn with_style(mut self, style: ImageStyle) -> Self {
        self.style = style;
        self
    }

    pub fn image_id(&self) -> Option<EntityId> {
        self.created
    }
}

impl Command for AddImage {
    fn kind(&self) -> &'static str {
        "add_image"
    }

    fn description(&self) -> &str {
        "Add image"
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        let mut image = Image::new(
            EntityId(0),
            self.position,
            self.path.clone(),
            self.natural_size,
            self.style.clone(),
        );
        image.set_data(self.data.clone());
        self.created = Some(store.add_image(self.created, image));
        Ok(())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        let id = self
            .created
            .ok_or_else(|| Error::Structural("add_image has not been executed".to_string()))?;
        store.remove_image_cascade(id).map(|_| ())
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "image_path": self.path.as_ref().map(|p| p.to_string_lossy().into_owned()),
            "position": [self.position.x, self.position.y],
            "natural_size": [self.natural_size.width, self.natural_size.height],
            "style": self.style,
        })
    }

    fn created(&self) -> Option<EntityRef> {
        self.created.map(EntityRef::Image)
    }
}

fn current_image(store: &EntityStore, id: EntityId) -> Result<&Image> {
    store.image(id).ok_or_else(|| Error::missing(EntityRef::Image(id)))
}

/// Set an image's rotation, in degrees.
#[derive(Debug, Clone)]
pub struct RotateImage {
    image: EntityId,
    old: f64,
    new: f64,
}

impl RotateImage {
    pub fn to(store: &EntityStore, image: EntityId, degrees: f64) -> Result<Self> {
        let old = current_image(store, image)?.rotation();
        Ok(Self {
            image,
            old,
            new: degrees.rem_euclid(360.0),
        })
    }

    /// Rotate relative to the current angle.
    pub fn by(store: &EntityStore, image: EntityId, delta: f64) -> Result<Self> {
        let old = current_image(store, image)?.rotation();
        Self::to(store, image, old + delta)
    }
}

impl Command for RotateImage {
    fn kind(&self) -> &'static str {
        "rotate_image"
    }

    fn description(&self) -> &str {
        "Rotate image"
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_image_rotation(self.image, self.new).map(|_| ())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_image_rotation(self.image, self.old).map(|_| ())
    }

    fn payload(&self) -> serde_json::Value {
        json!({ "image": self.image, "old": self.old, "new": self.new })
    }
}

/// Replace an image's style. Resizing, opacity and the aspect lock are all
/// style changes.
#[derive(Debug, Clone)]
pub struct UpdateImageStyle {
    image: EntityId,
    old: ImageStyle,
    new: ImageStyle,
    description: &'static str,
}

impl UpdateImageStyle {
    fn build(
        store: &EntityStore,
        image: EntityId,
        description: &'static str,
        change: impl FnOnce(&Image) -> ImageStyle,
    ) -> Result<Self> {
        let current = current_image(store, image)?;
        Ok(Self {
            image,
            old: current.style().clone(),
            new: change(current),
            description,
        })
    }

    pub fn new(store: &EntityStore, image: EntityId, style: ImageStyle) -> Result<Self> {
        Self::build(store, image, "Update image style", |_| style)
    }

    /// Display the image at `size`.
    pub fn resize(store: &EntityStore, image: EntityId, size: Size) -> Result<Self> {
        Self::build(store, image, "Resize image", |i| i.style_for_size(size))
    }

    /// Display the image at its natural pixel size.
    pub fn reset_size(store: &EntityStore, image: EntityId) -> Result<Self> {
        Self::build(store, image, "Reset image size", Image::natural_style)
    }

    pub fn set_opacity(store: &EntityStore, image: EntityId, opacity: f64) -> Result<Self> {
        Self::build(store, image, "Change image opacity", |i| ImageStyle {
            opacity: opacity.clamp(0.0, 1.0),
            ..i.style().clone()
        })
    }

    pub fn toggle_aspect_ratio(store: &EntityStore, image: EntityId) -> Result<Self> {
        Self::build(store, image, "Toggle aspect ratio", |i| ImageStyle {
            maintain_aspect_ratio: !i.style().maintain_aspect_ratio,
            ..i.style().clone()
        })
    }
}

impl Command for UpdateImageStyle {
    fn kind(&self) -> &'static str {
        "update_image_style"
    }

    fn description(&self) -> &str {
        self.description
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_image_style(self.image, self.new.clone()).map(|_| ())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_image_style(self.image, self.old.clone()).map(|_| ())
    }

    fn payload(&self) -> serde_json::Value {
        json!({ "image": self.image, "old": self.old, "new": self.new })
    }
}
