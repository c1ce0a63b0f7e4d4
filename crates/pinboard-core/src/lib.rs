//! Pinboard Core Library
//!
//! Document engine for an infinite-canvas note board: notes, images and the
//! connections between them, undo/redo, and portable session files.

pub mod board;
pub mod camera;
pub mod config;
pub mod entities;
pub mod error;
pub mod history;
pub mod routing;
pub mod scene;
pub mod session;
pub mod storage;
pub mod store;
pub mod styles;

#[cfg(test)]
mod test_support;

pub use board::Board;
pub use camera::{Camera, ViewEvent};
pub use config::BoardConfig;
pub use entities::{
    Connection, ConnectionStyle, EntityId, EntityKind, EntityRef, Image, ImageStyle, Note, NoteStyle,
};
pub use error::{Error, Result};
pub use history::{Command, CommandHistory, HistoryEvent};
pub use routing::Route;
pub use scene::{Scene, SceneEvent};
pub use session::{LoadReport, SaveReport, SessionDocument};
pub use storage::{AutoSaveManager, FileStorage, MemoryStorage, Storage, StorageError};
pub use store::EntityStore;
pub use styles::StyleRegistry;
