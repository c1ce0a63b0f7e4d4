//! Connection commands.

use super::Command;
use crate::entities::{ConnectionStyle, EntityId, EntityRef};
use crate::error::{Error, Result};
use crate::store::EntityStore;
use serde_json::json;

/// Connect two endpoints. Duplicate and self connections are rejected by
/// the store at execute time, so they never reach the history.
#[derive(Debug, Clone)]
pub struct CreateConnection {
    start: EntityRef,
    end: EntityRef,
    style: ConnectionStyle,
    created: Option<EntityId>,
}

impl CreateConnection {
    pub fn new(start: EntityRef, end: EntityRef) -> Self {
        Self::with_style(start, end, ConnectionStyle::default())
    }

    pub fn with_style(start: EntityRef, end: EntityRef, style: ConnectionStyle) -> Self {
        Self {
            start,
            end,
            style,
            created: None,
        }
    }

    pub fn connection_id(&self) -> Option<EntityId> {
        self.created
    }
}

impl Command for CreateConnection {
    fn kind(&self) -> &'static str {
        "create_connection"
    }

    fn description(&self) -> &str {
        "Create connection"
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        let id = store.add_connection(self.created, self.start, self.end, self.style.clone())?;
        self.created = Some(id);
        Ok(())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        let id = self
            .created
            .ok_or_else(|| Error::Structural("create_connection has not been executed".to_string()))?;
        store.remove_connection(id).map(|_| ())
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "start_item_id": self.start,
            "end_item_id": self.end,
            "style": self.style,
        })
    }

    fn created(&self) -> Option<EntityRef> {
        self.created.map(EntityRef::Connection)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateConnectionStyle {
    connection: EntityId,
    old: ConnectionStyle,
    new: ConnectionStyle,
}

impl UpdateConnectionStyle {
    pub fn new(store: &EntityStore, connection: EntityId, style: ConnectionStyle) -> Result<Self> {
        let current = store
            .connection(connection)
            .ok_or_else(|| Error::missing(EntityRef::Connection(connection)))?;
        Ok(Self {
            connection,
            old: current.style().clone(),
            new: style,
        })
    }
}

impl Command for UpdateConnectionStyle {
    fn kind(&self) -> &'static str {
        "update_connection_style"
    }

    fn description(&self) -> &str {
        "Update connection style"
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_connection_style(self.connection, self.new.clone()).map(|_| ())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        store.set_connection_style(self.connection, self.old.clone()).map(|_| ())
    }

    fn payload(&self) -> serde_json::Value {
        json!({ "connection": self.connection, "old": self.old, "new": self.new })
    }
}
