//! The board: entity store, camera, command history and style registry
//! bundled behind one handle.

use crate::camera::Camera;
use crate::config::BoardConfig;
use crate::entities::{EntityId, EntityRef};
use crate::error::Result;
use crate::history::{Command, CommandHistory, CreateConnection, CreateNote, DeleteItems};
use crate::session::{self, LoadReport, SaveReport, SessionDocument};
use crate::store::EntityStore;
use crate::styles::StyleRegistry;
use kurbo::Point;
use std::path::Path;

/// A document being edited.
///
/// All mutation goes through [`Board::execute`] so that it can be undone.
/// Every successful change bumps [`Board::revision`], which hosts feed to
/// an [`AutoSaveManager`](crate::storage::AutoSaveManager).
#[derive(Debug)]
pub struct Board {
    config: BoardConfig,
    store: EntityStore,
    camera: Camera,
    history: CommandHistory,
    styles: StyleRegistry,
    revision: u64,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            store: EntityStore::new(&config),
            camera: Camera::new(config.view),
            history: CommandHistory::new(),
            styles: StyleRegistry::new(),
            config,
            revision: 0,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Mutable access for non-document state such as measured text sizes
    /// and scene tracking.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommandHistory {
        &mut self.history
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn styles_mut(&mut self) -> &mut StyleRegistry {
        &mut self.styles
    }

    /// Incremented by every change to the document.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touched(&mut self, changed: bool) -> bool {
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Execute a command and record it for undo.
    pub fn execute<C: Command + 'static>(&mut self, command: C) -> bool {
        let changed = self.history.push_and_execute(&mut self.store, command);
        self.touched(changed)
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.history.undo(&mut self.store);
        self.touched(changed)
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.history.redo(&mut self.store);
        self.touched(changed)
    }

    /// Create a note with the registry's default style.
    pub fn create_note(&mut self, position: Point, text: impl Into<String>) -> Option<EntityId> {
        let style = self.styles.default_style().clone();
        self.execute(CreateNote::new(position, text, style))
            .then(|| self.history.last_created().map(|created| created.id()))
            .flatten()
    }

    pub fn connect(&mut self, start: EntityRef, end: EntityRef) -> Option<EntityId> {
        self.execute(CreateConnection::new(start, end))
            .then(|| self.history.last_created().map(|created| created.id()))
            .flatten()
    }

    /// Delete entities together with their connections, as one undo step.
    pub fn delete(&mut self, targets: impl IntoIterator<Item = EntityRef>) -> bool {
        self.execute(DeleteItems::new(targets))
    }

    /// Snapshot the board as a session document.
    pub fn to_document(&self) -> (SessionDocument, SaveReport) {
        session::serialize(&self.store, &self.camera)
    }

    /// Replace the board's contents with `document`. History is cleared.
    ///
    /// `report` is the one returned when the document was parsed; restore
    /// results are added to it.
    pub fn restore_document(&mut self, document: &SessionDocument, mut report: LoadReport) -> LoadReport {
        session::restore(&mut self.store, &mut self.camera, document, &mut report);
        self.loaded();
        report
    }

    pub fn save(&self, path: &Path) -> Result<SaveReport> {
        session::save(&self.store, &self.camera, path)
    }

    /// Load a session file, replacing the board's contents and clearing the
    /// history. On error the board is left as it was.
    pub fn load(&mut self, path: &Path) -> Result<LoadReport> {
        let report = session::load(&mut self.store, &mut self.camera, path)?;
        self.loaded();
        Ok(report)
    }

    fn loaded(&mut self) {
        self.history.clear();
        self.revision += 1;
    }
}
