//! Linear undo/redo over entity store mutations.
//!
//! Every change a user makes goes through a [`Command`]. The
//! [`CommandHistory`] executes it, keeps it on the undo stack, and moves it
//! between the undo and redo stacks as the user steps back and forth.
//! Failures are logged and absorbed here: a command that fails to execute
//! never enters the history, and a failed undo or redo leaves both stacks
//! as they were.

mod connection;
mod delete;
mod image;
mod note;

pub use connection::{CreateConnection, UpdateConnectionStyle};
pub use delete::DeleteItems;
pub use image::{AddImage, RotateImage, UpdateImageStyle};
pub use note::{CreateNote, MoveEntity, UpdateNoteStyle, UpdateNoteText};

use crate::entities::EntityRef;
use crate::error::{Error, Result};
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reversible unit of document mutation.
pub trait Command: fmt::Debug {
    /// Stable name of the command type, e.g. `"create_note"`.
    fn kind(&self) -> &'static str;

    /// Human-readable label for menus ("Undo Move note").
    fn description(&self) -> &str;

    fn execute(&mut self, store: &mut EntityStore) -> Result<()>;

    fn undo(&mut self, store: &mut EntityStore) -> Result<()>;

    fn redo(&mut self, store: &mut EntityStore) -> Result<()> {
        self.execute(store)
    }

    /// Diagnostic snapshot of the command's arguments.
    fn payload(&self) -> serde_json::Value;

    /// The entity this command created, once executed.
    fn created(&self) -> Option<EntityRef> {
        None
    }

    fn record(&self) -> CommandRecord {
        CommandRecord {
            kind: self.kind().to_string(),
            description: self.description().to_string(),
            payload: self.payload(),
        }
    }
}

/// Serializable description of a command, for logs and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub payload: serde_json::Value,
}

/// Notification that undo/redo availability may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    Changed { can_undo: bool, can_redo: bool },
}

/// Undo and redo stacks of executed commands.
#[derive(Debug, Default)]
pub struct CommandHistory {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    /// Maximum undo depth; the oldest entries are dropped past it.
    limit: Option<usize>,
    last_error: Option<Error>,
    events: Vec<HistoryEvent>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            if self.undo_stack.len() > limit {
                let excess = self.undo_stack.len() - limit;
                self.undo_stack.drain(..excess);
            }
        }
    }

    fn changed(&mut self) {
        self.events.push(HistoryEvent::Changed {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        });
    }

    fn fail(&mut self, action: &str, description: &str, err: Error) {
        log::error!("{} '{}' failed: {}", action, description, err);
        self.last_error = Some(err);
    }

    /// Execute a command and record it. Returns whether it succeeded.
    pub fn push_and_execute<C: Command + 'static>(&mut self, store: &mut EntityStore, command: C) -> bool {
        self.push_boxed(store, Box::new(command))
    }

    pub fn push_boxed(&mut self, store: &mut EntityStore, mut command: Box<dyn Command>) -> bool {
        log::debug!("Executing command: {}", command.description());
        if let Err(err) = command.execute(store) {
            let description = command.description().to_string();
            self.fail("Command", &description, err);
            return false;
        }
        log::info!("Command pushed: {}", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();
        self.enforce_limit();
        self.changed();
        true
    }

    /// Undo the most recent command. Returns whether anything was undone.
    pub fn undo(&mut self, store: &mut EntityStore) -> bool {
        let Some(mut command) = self.undo_stack.pop() else {
            log::debug!("Nothing to undo");
            return false;
        };
        match command.undo(store) {
            Ok(()) => {
                log::info!("Undone: {}", command.description());
                self.redo_stack.push(command);
                self.changed();
                true
            }
            Err(err) => {
                let description = command.description().to_string();
                self.undo_stack.push(command);
                self.fail("Undo", &description, err);
                false
            }
        }
    }

    /// Redo the most recently undone command.
    pub fn redo(&mut self, store: &mut EntityStore) -> bool {
        let Some(mut command) = self.redo_stack.pop() else {
            log::debug!("Nothing to redo");
            return false;
        };
        match command.redo(store) {
            Ok(()) => {
                log::info!("Redone: {}", command.description());
                self.undo_stack.push(command);
                self.changed();
                true
            }
            Err(err) => {
                let description = command.description().to_string();
                self.redo_stack.push(command);
                self.fail("Redo", &description, err);
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Entity created by the most recent command, if it created one.
    pub fn last_created(&self) -> Option<EntityRef> {
        self.undo_stack.last().and_then(|c| c.created())
    }

    /// The most recent failure absorbed by the history.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    /// Records of the undo stack, oldest first.
    pub fn records(&self) -> Vec<CommandRecord> {
        self.undo_stack.iter().map(|c| c.record()).collect()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.last_error = None;
        self.changed();
    }

    pub fn drain_events(&mut self) -> Vec<HistoryEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::NoteStyle;
    use crate::test_support::init_logger;
    use kurbo::Point;

    #[derive(Debug)]
    struct Failing;

    impl Command for Failing {
        fn kind(&self) -> &'static str {
            "failing"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn execute(&mut self, _: &mut EntityStore) -> Result<()> {
            Err(Error::Structural("nope".to_string()))
        }
        fn undo(&mut self, _: &mut EntityStore) -> Result<()> {
            Ok(())
        }
        fn payload(&self) -> serde_json::Value {
            serde_json::Value::Null
        }
    }

    fn create(x: f64) -> CreateNote {
        CreateNote::new(Point::new(x, 0.0), "", NoteStyle::default())
    }

    #[test]
    fn test_bookkeeping_after_n_pushes() {
        init_logger();
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        for i in 0..5 {
            assert!(history.push_and_execute(&mut store, create(i as f64 * 150.0)));
        }
        assert_eq!(history.undo_len(), 5);
        assert_eq!(history.redo_len(), 0);
        assert_eq!(store.note_count(), 5);
    }

    #[test]
    fn test_empty_undo_redo_are_noops() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(!history.undo(&mut store));
        assert!(!history.redo(&mut store));
        assert!(history.drain_events().is_empty());
    }

    #[test]
    fn test_failed_execute_is_not_recorded() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        history.push_and_execute(&mut store, create(0.0));
        history.undo(&mut store);
        assert_eq!(history.redo_len(), 1);

        assert!(!history.push_and_execute(&mut store, Failing));
        assert_eq!(history.undo_len(), 0);
        // A failed command does not discard the redo stack.
        assert_eq!(history.redo_len(), 1);
        assert!(matches!(history.last_error(), Some(Error::Structural(_))));
    }

    #[test]
    fn test_new_command_clears_redo() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        history.push_and_execute(&mut store, create(0.0));
        history.push_and_execute(&mut store, create(200.0));
        history.undo(&mut store);
        assert!(history.can_redo());

        history.push_and_execute(&mut store, create(400.0));
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 2);
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        history.push_and_execute(&mut store, create(0.0));
        let created = history.last_created().unwrap();

        assert!(history.undo(&mut store));
        assert!(!store.contains(created));
        assert_eq!(history.redo_description(), Some("Create note"));

        assert!(history.redo(&mut store));
        assert!(store.contains(created));
        assert_eq!(history.undo_description(), Some("Create note"));
    }

    #[test]
    fn test_failed_undo_keeps_stacks() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        history.push_and_execute(&mut store, create(0.0));
        let created = history.last_created().unwrap();
        // Remove the note behind the history's back.
        store.remove_note(created.id()).unwrap();

        assert!(!history.undo(&mut store));
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
        assert!(history.last_error().is_some());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::with_limit(2);
        for i in 0..4 {
            history.push_and_execute(&mut store, create(i as f64 * 150.0));
        }
        assert_eq!(history.undo_len(), 2);
        assert_eq!(store.note_count(), 4);
    }

    #[test]
    fn test_events_and_records() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        history.push_and_execute(&mut store, create(0.0));
        history.undo(&mut store);
        assert_eq!(
            history.drain_events(),
            vec![
                HistoryEvent::Changed { can_undo: true, can_redo: false },
                HistoryEvent::Changed { can_undo: false, can_redo: true },
            ]
        );

        history.redo(&mut store);
        let records = history.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, "create_note");
        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["type"], "create_note");
        assert_eq!(json["description"], "Create note");
    }

    #[test]
    fn test_clear() {
        let mut store = EntityStore::default();
        let mut history = CommandHistory::new();
        history.push_and_execute(&mut store, create(0.0));
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
