//! Note commands, plus moving any endpoint.

use super::Command;
use crate::entities::{EntityId, EntityRef, Note, NoteStyle};
use crate::error::{Error, Result};
use crate::store::EntityStore;
use kurbo::Point;
use serde_json::json;

fn not_executed(kind: &str) -> Error {
    Error::Structural(format!("{} has not been executed", kind))
}

/// Create a note. Undo removes it together with any connection attached in
/// the meantime; redo recreates it under the same id.
#[derive(Debug, Clone)]
pub struct CreateNote {
    position: Point,
    text: String,
    style: NoteStyle,
    created: Option<EntityId>,
}

impl CreateNote {
    pub fn new(position: Point, text: impl Into<String>, style: NoteStyle) -> Self {
        Self {
            position,
            text: text.into(),
            style,
            created: None,
        }
    }

    pub fn note_id(&self) -> Option<EntityId> {
        self.created
    }
}

impl Command for CreateNote {
    fn kind(&self) -> &'static str {
        "create_note"
    }

    fn description(&self) -> &str {
        "Create note"
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        let note = Note::new(EntityId(0), self.position, self.text.clone(), self.style.clone());
        self.created = Some(store.add_note(self.created, note));
        Ok(())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        let id = self.created.ok_or_else(|| not_executed(self.kind()))?;
        let removed = store.remove_note_cascade(id)?;
        if !removed.connections.is_empty() {
            log::debug!("Removed {} connection(s) with note {}", removed.connections.len(), id);
        }
        Ok(())
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "position": [self.position.x, self.position.y],
            "text": self.text,
            "style": self.style,
        })
    }

    fn created(&self) -> Option<EntityRef> {
        self.created.map(EntityRef::Note)
    }
}

/// Move a note or image between two positions.
///
/// Drags are usually applied live by the view, so executing a move that is
/// already in place is harmless.
#[derive(Debug, Clone)]
pub struct MoveEntity {
    entity: EntityRef,
    from: Point,
    to: Point,
    description: String,
}

impl MoveEntity {
    pub fn new(entity: EntityRef, from: Point, to: Point) -> Self {
        Self {
            entity,
            from,
            to,
            description: format!("Move {}", entity.kind().tag()),
        }
    }

    /// Move from wherever the entity currently is.
    pub fn to(store: &EntityStore, entity: EntityRef, to: Point) -> Result<Self> {
        Ok(Self::new(entity, store.position_of(entity)?, to))
    }
}

impl Command for MoveEntity {
    fn kind(&self) -> &'static str {
        "move_entity"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        store.move_entity(self.entity, self.to).map(|_| ())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        store.move_entity(self.entity, self.from).map(|_| ())
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "entity": self.entity,
            "from": [self.from.x, self.from.y],
            "to": [self.to.x, self.to.y],
        })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateNoteText {
    note: EntityId,
    old: String,
    new: String,
}

impl UpdateNoteText {
    pub fn new(store: &EntityStore, note: EntityId, text: impl Into<String>) -> Result<Self> {
        let current = store
            .note(note)
            .ok_or_else(|| Error::missing(EntityRef::Note(note)))?;
        Ok(Self {
            note,
            old: current.text().to_string(),
            new: text.into(),
        })
    }
}

impl Command for UpdateNoteText {
    fn kind(&self) -> &'static str {
        "update_note_text"
    }

    fn description(&self) -> &str {
        "Update note text"
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_note_text(self.note, self.new.clone()).map(|_| ())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_note_text(self.note, self.old.clone()).map(|_| ())
    }

    fn payload(&self) -> serde_json::Value {
        json!({ "note": self.note, "old": self.old, "new": self.new })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateNoteStyle {
    note: EntityId,
    old: NoteStyle,
    new: NoteStyle,
    description: String,
}

impl UpdateNoteStyle {
    pub fn new(store: &EntityStore, note: EntityId, style: NoteStyle) -> Result<Self> {
        let current = store
            .note(note)
            .ok_or_else(|| Error::missing(EntityRef::Note(note)))?;
        Ok(Self {
            note,
            old: current.style().clone(),
            new: style,
            description: "Update note style".to_string(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Command for UpdateNoteStyle {
    fn kind(&self) -> &'static str {
        "update_note_style"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_note_style(self.note, self.new.clone()).map(|_| ())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_note_style(self.note, self.old.clone()).map(|_| ())
    }

    fn payload(&self) -> serde_json::Value {
        json!({ "note": self.note, "old": self.old, "new": self.new })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ConnectionStyle;
    use crate::history::{CommandHistory, CreateConnection};

    fn create_note(store: &mut EntityStore, history: &mut CommandHistory, x: f64) -> EntityRef {
        assert!(history.push_and_execute(store, CreateNote::new(Point::new(x, 0.0), "", NoteStyle::default())));
        history.last_created().unwrap()
    }

    #[test]
    fn test_move_then_undo_restores_exact_position() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        let note = create_note(&mut store, &mut history, 12.25);
        let before = store.position_of(note).unwrap();

        let command = MoveEntity::to(&store, note, Point::new(300.5, -40.125)).unwrap();
        assert!(history.push_and_execute(&mut store, command));
        assert_eq!(store.position_of(note).unwrap(), Point::new(300.5, -40.125));

        history.undo(&mut store);
        assert_eq!(store.position_of(note).unwrap(), before);
        history.redo(&mut store);
        assert_eq!(store.position_of(note).unwrap(), Point::new(300.5, -40.125));
    }

    #[test]
    fn test_move_description_names_kind() {
        let command = MoveEntity::new(EntityRef::Image(EntityId(1)), Point::ZERO, Point::ZERO);
        assert_eq!(command.description(), "Move image");
    }

    #[test]
    fn test_create_note_redo_keeps_id() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        let note = create_note(&mut store, &mut history, 0.0);
        history.undo(&mut store);
        history.redo(&mut store);
        assert!(store.contains(note));
        assert_eq!(history.last_created(), Some(note));
    }

    #[test]
    fn test_create_note_undo_cascades() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        let a = create_note(&mut store, &mut history, 0.0);
        let b = create_note(&mut store, &mut history, 200.0);
        // Connect outside the history so the note's undo has to clean up.
        store.add_connection(None, a, b, ConnectionStyle::default()).unwrap();

        history.undo(&mut store);
        assert!(!store.contains(b));
        assert_eq!(store.connection_count(), 0);
        assert!(store.connections_for(a).is_empty());
    }

    #[test]
    fn test_update_text_and_style() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        let note = create_note(&mut store, &mut history, 0.0);

        let command = UpdateNoteText::new(&store, note.id(), "Groceries").unwrap();
        history.push_and_execute(&mut store, command);
        assert_eq!(store.note(note.id()).unwrap().text(), "Groceries");

        let mut style = NoteStyle::default();
        style.font_size = 20.0;
        let command = UpdateNoteStyle::new(&store, note.id(), style.clone()).unwrap();
        history.push_and_execute(&mut store, command);
        assert_eq!(store.note(note.id()).unwrap().style(), &style);

        history.undo(&mut store);
        assert_eq!(store.note(note.id()).unwrap().style(), &NoteStyle::default());
        history.undo(&mut store);
        assert_eq!(store.note(note.id()).unwrap().text(), "");
    }

    #[test]
    fn test_text_change_reroutes() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        let a = create_note(&mut store, &mut history, 0.0);
        let b = create_note(&mut store, &mut history, 400.0);
        history.push_and_execute(&mut store, CreateConnection::new(a, b));
        let connection = history.last_created().unwrap().id();
        let before = store.connection(connection).unwrap().start_point();

        let long = "a much longer line of text that widens the note";
        let command = UpdateNoteText::new(&store, a.id(), long).unwrap();
        history.push_and_execute(&mut store, command);
        let after = store.connection(connection).unwrap().start_point();
        assert!(after.x > before.x);
    }

    #[test]
    fn test_update_missing_note_fails() {
        let store = EntityStore::default();
        assert!(UpdateNoteText::new(&store, EntityId(42), "x").is_err());
    }
}
