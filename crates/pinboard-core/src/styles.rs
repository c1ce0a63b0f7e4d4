//! Note style registry: the default style for new notes, named templates
//! and a style clipboard.
//!
//! The registry is an ordinary value owned by whoever needs it (usually
//! [`crate::Board`]); there is no global instance.

use crate::entities::{EntityId, EntityRef, FontWeight, Note, NoteStyle, SerializableColor};
use crate::error::{Error, Result};
use crate::history::UpdateNoteStyle;
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Notifications produced by the registry, drained by the owner.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleEvent {
    DefaultChanged,
    TemplateAdded(String),
    TemplateRemoved(String),
}

/// User customisations as written to disk. Built-in templates are never
/// stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStyles {
    pub default_style: Option<NoteStyle>,
    pub templates: BTreeMap<String, NoteStyle>,
}

#[allow(clippy::too_many_arguments)]
fn template(
    background: (u8, u8, u8),
    border: (u8, u8, u8),
    text: (u8, u8, u8),
    border_width: f64,
    corner_radius: f64,
    padding: f64,
    font_size: f64,
    bold: bool,
    italic: bool,
    min_size: (f64, f64),
) -> NoteStyle {
    NoteStyle {
        background_color: SerializableColor::rgb(background.0, background.1, background.2),
        border_color: SerializableColor::rgb(border.0, border.1, border.2),
        text_color: SerializableColor::rgb(text.0, text.1, text.2),
        border_width,
        corner_radius,
        padding,
        font_size,
        font_weight: if bold { FontWeight::Bold } else { FontWeight::Regular },
        font_italic: italic,
        min_width: min_size.0,
        min_height: min_size.1,
        ..NoteStyle::default()
    }
}

/// Templates that ship with the board, in menu order.
pub fn builtin_templates() -> Vec<(&'static str, NoteStyle)> {
    vec![
        ("Default", NoteStyle::default()),
        (
            "Sticky Note",
            template((255, 255, 200), (200, 200, 150), (0, 0, 0), 1.0, 4.0, 8.0, 11.0, false, false, (80.0, 50.0)),
        ),
        (
            "Important",
            template((255, 200, 200), (200, 100, 100), (100, 0, 0), 3.0, 8.0, 12.0, 14.0, true, false, (120.0, 70.0)),
        ),
        (
            "Idea",
            template((200, 220, 255), (150, 180, 220), (0, 50, 100), 2.0, 12.0, 10.0, 12.0, false, true, (100.0, 60.0)),
        ),
        (
            "Action Item",
            template((200, 255, 200), (150, 200, 150), (0, 100, 0), 2.0, 6.0, 10.0, 12.0, true, false, (110.0, 65.0)),
        ),
        (
            "Question",
            template((255, 220, 200), (220, 180, 150), (100, 50, 0), 2.0, 10.0, 10.0, 12.0, false, false, (100.0, 60.0)),
        ),
        (
            "Title",
            template((240, 240, 240), (180, 180, 180), (50, 50, 50), 3.0, 8.0, 15.0, 16.0, true, false, (150.0, 80.0)),
        ),
    ]
}

/// One-line description such as `Arial 12pt, #ffffc8/#000000`.
pub fn style_summary(style: &NoteStyle) -> String {
    format!(
        "{} {}pt, {}/{}",
        style.font_family,
        style.font_size,
        style.background_color.to_hex(),
        style.text_color.to_hex()
    )
}

/// Default note style, templates and the style clipboard.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    default_style: NoteStyle,
    /// Built-ins first, then user templates in creation order.
    templates: Vec<(String, NoteStyle)>,
    clipboard: Option<NoteStyle>,
    events: Vec<StyleEvent>,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self {
            default_style: NoteStyle::default(),
            templates: builtin_templates()
                .into_iter()
                .map(|(name, style)| (name.to_string(), style))
                .collect(),
            clipboard: None,
            events: Vec::new(),
        }
    }

    pub fn default_style(&self) -> &NoteStyle {
        &self.default_style
    }

    pub fn set_default_style(&mut self, style: NoteStyle) {
        self.default_style = style;
        self.events.push(StyleEvent::DefaultChanged);
        log::debug!("Default style updated");
    }

    pub fn is_builtin_template(&self, name: &str) -> bool {
        builtin_templates().iter().any(|(builtin, _)| *builtin == name)
    }

    pub fn template_names(&self) -> Vec<&str> {
        self.templates.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn template(&self, name: &str) -> Option<&NoteStyle> {
        self.templates
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, style)| style)
    }

    /// Add a user template. Returns false if the name is taken.
    pub fn add_template(&mut self, name: impl Into<String>, style: NoteStyle) -> bool {
        let name = name.into();
        if self.template(&name).is_some() {
            return false;
        }
        log::debug!("Added template: {}", name);
        self.templates.push((name.clone(), style));
        self.events.push(StyleEvent::TemplateAdded(name));
        true
    }

    /// Replace a user template. Built-ins cannot be changed.
    pub fn update_template(&mut self, name: &str, style: NoteStyle) -> bool {
        if self.is_builtin_template(name) {
            return false;
        }
        match self.templates.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, existing)) => {
                *existing = style;
                log::debug!("Updated template: {}", name);
                true
            }
            None => false,
        }
    }

    /// Remove a user template. Built-ins cannot be removed.
    pub fn remove_template(&mut self, name: &str) -> bool {
        if self.is_builtin_template(name) {
            return false;
        }
        let before = self.templates.len();
        self.templates.retain(|(existing, _)| existing != name);
        if self.templates.len() == before {
            return false;
        }
        log::debug!("Removed template: {}", name);
        self.events.push(StyleEvent::TemplateRemoved(name.to_string()));
        true
    }

    /// Save a note's current style as a new template.
    pub fn create_template_from_note(&mut self, note: &Note, name: impl Into<String>) -> bool {
        self.add_template(name, note.style().clone())
    }

    /// Copy a note's style to the clipboard.
    pub fn copy_style(&mut self, note: &Note) {
        self.clipboard = Some(note.style().clone());
        log::debug!("Copied style from note {}", note.id());
    }

    pub fn clipboard(&self) -> Option<&NoteStyle> {
        self.clipboard.as_ref()
    }

    /// Command that pastes the clipboard style onto a note.
    pub fn paste_style(&self, store: &EntityStore, note: EntityId) -> Result<UpdateNoteStyle> {
        let style = self
            .clipboard
            .clone()
            .ok_or_else(|| Error::Validation("Style clipboard is empty".to_string()))?;
        Ok(UpdateNoteStyle::new(store, note, style)?.with_description("Paste style"))
    }

    /// Command that applies a named template to a note.
    pub fn apply_template(&self, store: &EntityStore, note: EntityId, name: &str) -> Result<UpdateNoteStyle> {
        let style = self
            .template(name)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("Unknown template: {}", name)))?;
        if store.note(note).is_none() {
            return Err(Error::missing(EntityRef::Note(note)));
        }
        log::debug!("Applying template '{}' to note {}", name, note);
        Ok(UpdateNoteStyle::new(store, note, style)?.with_description(format!("Apply template {}", name)))
    }

    /// The customisations worth persisting.
    pub fn user_styles(&self) -> UserStyles {
        UserStyles {
            default_style: Some(self.default_style.clone()),
            templates: self
                .templates
                .iter()
                .filter(|(name, _)| !self.is_builtin_template(name))
                .map(|(name, style)| (name.clone(), style.clone()))
                .collect(),
        }
    }

    /// Merge persisted customisations. Stored templates never replace an
    /// existing one of the same name.
    pub fn apply_user_styles(&mut self, styles: UserStyles) {
        if let Some(default_style) = styles.default_style {
            self.default_style = default_style;
            self.events.push(StyleEvent::DefaultChanged);
        }
        for (name, style) in styles.templates {
            if self.template(&name).is_none() {
                log::debug!("Loaded custom template: {}", name);
                self.templates.push((name, style));
            }
        }
    }

    pub fn save_user_styles(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.user_styles())?;
        std::fs::write(path, json)
            .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        log::debug!("Saved user styles to {}", path.display());
        Ok(())
    }

    /// Load customisations from `path`. A missing file is not an error.
    pub fn load_user_styles(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            log::debug!("No user styles file found, using defaults");
            return Ok(());
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let styles: UserStyles = serde_json::from_str(&json)?;
        self.apply_user_styles(styles);
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<StyleEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Command, CommandHistory, CreateNote};
    use kurbo::Point;

    fn board_with_note() -> (EntityStore, CommandHistory, EntityId) {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        history.push_and_execute(&mut store, CreateNote::new(Point::ZERO, "hi", NoteStyle::default()));
        let id = history.last_created().unwrap().id();
        (store, history, id)
    }

    #[test]
    fn test_builtin_templates_in_order() {
        let registry = StyleRegistry::new();
        assert_eq!(
            registry.template_names(),
            vec!["Default", "Sticky Note", "Important", "Idea", "Action Item", "Question", "Title"]
        );
        let important = registry.template("Important").unwrap();
        assert_eq!(important.font_weight, FontWeight::Bold);
        assert_eq!(important.background_color, SerializableColor::rgb(255, 200, 200));
        assert!(registry.template("Idea").unwrap().font_italic);
    }

    #[test]
    fn test_builtins_are_immutable() {
        let mut registry = StyleRegistry::new();
        assert!(registry.is_builtin_template("Title"));
        assert!(!registry.add_template("Title", NoteStyle::default()));
        assert!(!registry.update_template("Title", NoteStyle::default()));
        assert!(!registry.remove_template("Title"));
        assert!(registry.template("Title").is_some());
    }

    #[test]
    fn test_user_template_lifecycle() {
        let mut registry = StyleRegistry::new();
        let style = NoteStyle {
            font_size: 30.0,
            ..NoteStyle::default()
        };
        assert!(registry.add_template("Huge", style.clone()));
        assert!(!registry.add_template("Huge", NoteStyle::default()));
        assert_eq!(registry.template_names().last(), Some(&"Huge"));

        let smaller = NoteStyle {
            font_size: 20.0,
            ..NoteStyle::default()
        };
        assert!(registry.update_template("Huge", smaller.clone()));
        assert_eq!(registry.template("Huge"), Some(&smaller));
        assert!(!registry.update_template("Missing", smaller));

        assert!(registry.remove_template("Huge"));
        assert!(!registry.remove_template("Huge"));
        assert_eq!(
            registry.drain_events(),
            vec![
                StyleEvent::TemplateAdded("Huge".to_string()),
                StyleEvent::TemplateRemoved("Huge".to_string()),
            ]
        );
    }

    #[test]
    fn test_style_summary() {
        assert_eq!(style_summary(&NoteStyle::default()), "Arial 12pt, #ffffc8/#000000");
    }

    #[test]
    fn test_copy_paste_style_is_undoable() {
        let (mut store, mut history, id) = board_with_note();
        let mut registry = StyleRegistry::new();
        assert!(registry.paste_style(&store, id).is_err());

        let mut source = store.note(id).unwrap().clone();
        source.style = registry.template("Idea").unwrap().clone();
        registry.copy_style(&source);

        let command = registry.paste_style(&store, id).unwrap();
        assert_eq!(command.description(), "Paste style");
        history.push_and_execute(&mut store, command);
        assert!(store.note(id).unwrap().style().font_italic);
        history.undo(&mut store);
        assert!(!store.note(id).unwrap().style().font_italic);
    }

    #[test]
    fn test_apply_template() {
        let (mut store, mut history, id) = board_with_note();
        let registry = StyleRegistry::new();
        assert!(registry.apply_template(&store, id, "Nope").is_err());
        assert!(registry.apply_template(&store, EntityId(77), "Title").is_err());

        let command = registry.apply_template(&store, id, "Title").unwrap();
        history.push_and_execute(&mut store, command);
        assert_eq!(store.note(id).unwrap().style(), registry.template("Title").unwrap());
        assert_eq!(history.undo_description(), Some("Apply template Title"));
    }

    #[test]
    fn test_user_styles_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("styles.json");

        let mut registry = StyleRegistry::new();
        let (store, _, id) = board_with_note();
        registry.create_template_from_note(store.note(id).unwrap(), "Mine");
        registry.set_default_style(NoteStyle {
            font_family: "Helvetica".to_string(),
            ..NoteStyle::default()
        });
        registry.save_user_styles(&path).unwrap();

        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(saved["templates"].get("Mine").is_some());
        assert!(saved["templates"].get("Title").is_none());

        let mut fresh = StyleRegistry::new();
        fresh.load_user_styles(&path).unwrap();
        assert_eq!(fresh.default_style().font_family, "Helvetica");
        assert!(fresh.template("Mine").is_some());
        assert_eq!(fresh.template_names().len(), 8);

        let mut untouched = StyleRegistry::new();
        untouched.load_user_styles(&dir.path().join("absent.json")).unwrap();
        assert_eq!(untouched.default_style(), &NoteStyle::default());
    }

    #[test]
    fn test_partial_user_styles_merge_defaults() {
        let styles: UserStyles =
            serde_json::from_str(r##"{"default_style": {"font_size": 18, "text_color": "#333333"}}"##).unwrap();
        let mut registry = StyleRegistry::new();
        registry.apply_user_styles(styles);
        assert!((registry.default_style().font_size - 18.0).abs() < f64::EPSILON);
        assert_eq!(registry.default_style().padding, NoteStyle::default().padding);
    }
}
