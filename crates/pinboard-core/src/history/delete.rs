//! Deleting a selection of entities.

use super::Command;
use crate::entities::{EntityId, EntityRef};
use crate::error::{Error, Result};
use crate::session::{ConnectionRecord, ImageRecord, NoteRecord};
use crate::store::EntityStore;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

/// Everything removed by one delete, in document form.
#[derive(Debug, Clone, Default, Serialize)]
struct Snapshot {
    notes: Vec<NoteRecord>,
    images: Vec<ImageRecord>,
    connections: Vec<ConnectionRecord>,
}

/// Delete notes, images and connections.
///
/// Connections attached to a deleted note or image are deleted with it.
/// Undo rebuilds notes, then images, then connections, mapping old ids to
/// the recreated entities; a connection whose endpoint cannot be resolved
/// is skipped with a warning.
#[derive(Debug, Clone)]
pub struct DeleteItems {
    targets: Vec<EntityRef>,
    snapshot: Snapshot,
    description: String,
}

impl DeleteItems {
    pub fn new(targets: impl IntoIterator<Item = EntityRef>) -> Self {
        let mut unique = Vec::new();
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }
        Self {
            targets: unique,
            snapshot: Snapshot::default(),
            description: "Delete items".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn targets(&self) -> &[EntityRef] {
        &self.targets
    }

    /// Explicit connection targets plus every connection attached to an
    /// endpoint target.
    fn affected_connections(&self, store: &EntityStore) -> Vec<EntityId> {
        let mut connections: Vec<EntityId> = Vec::new();
        let explicit = self.targets.iter().filter_map(|t| match t {
            EntityRef::Connection(id) => Some(*id),
            _ => None,
        });
        let attached = self
            .targets
            .iter()
            .filter(|t| t.is_endpoint())
            .flat_map(|t| store.connections_for(*t));
        for id in explicit.chain(attached) {
            if !connections.contains(&id) {
                connections.push(id);
            }
        }
        connections
    }

    fn take_snapshot(&mut self, store: &EntityStore, connections: &[EntityId]) -> Result<()> {
        let mut snapshot = Snapshot::default();
        for target in &self.targets {
            match *target {
                EntityRef::Note(id) => {
                    let note = store.note(id).ok_or_else(|| Error::missing(*target))?;
                    snapshot.notes.push(NoteRecord::from_note(note));
                }
                EntityRef::Image(id) => {
                    let image = store.image(id).ok_or_else(|| Error::missing(*target))?;
                    snapshot.images.push(ImageRecord::snapshot(image));
                }
                EntityRef::Connection(_) => {}
            }
        }
        for id in connections {
            let connection = store
                .connection(*id)
                .ok_or_else(|| Error::missing(EntityRef::Connection(*id)))?;
            snapshot.connections.push(ConnectionRecord::from_connection(connection));
        }
        self.snapshot = snapshot;
        Ok(())
    }
}

impl Command for DeleteItems {
    fn kind(&self) -> &'static str {
        "delete_items"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, store: &mut EntityStore) -> Result<()> {
        if let Some(missing) = self.targets.iter().find(|t| !store.contains(**t)) {
            return Err(Error::missing(*missing));
        }
        let connections = self.affected_connections(store);
        self.take_snapshot(store, &connections)?;
        log::debug!(
            "Delete payload: notes={}, images={}, connections={}",
            self.snapshot.notes.len(),
            self.snapshot.images.len(),
            self.snapshot.connections.len()
        );

        for id in connections {
            store.remove_connection(id)?;
        }
        for target in &self.targets {
            match *target {
                EntityRef::Note(id) => {
                    store.remove_note(id)?;
                }
                EntityRef::Image(id) => {
                    store.remove_image(id)?;
                }
                EntityRef::Connection(_) => {}
            }
        }
        log::info!("Deleted {} item(s)", self.targets.len());
        Ok(())
    }

    fn undo(&mut self, store: &mut EntityStore) -> Result<()> {
        let mut id_map: HashMap<EntityRef, EntityRef> = HashMap::new();

        for record in &self.snapshot.notes {
            let id = store.add_note(Some(record.id), record.to_note());
            id_map.insert(EntityRef::Note(record.id), EntityRef::Note(id));
        }
        for record in &self.snapshot.images {
            match record.to_image() {
                Ok(image) => {
                    let id = store.add_image(Some(record.id), image);
                    id_map.insert(EntityRef::Image(record.id), EntityRef::Image(id));
                }
                Err(e) => log::error!("Failed to restore image {}: {}", record.id, e),
            }
        }

        let mut restored = 0;
        for record in &self.snapshot.connections {
            let resolve = |r: EntityRef| {
                id_map
                    .get(&r)
                    .copied()
                    .or_else(|| store.contains(r).then_some(r))
            };
            let endpoints = record
                .endpoints()
                .and_then(|(start, end)| Some((resolve(start)?, resolve(end)?)));
            let Some((start, end)) = endpoints else {
                log::warn!("Skipping connection restore: endpoints not found for {}", record.id);
                continue;
            };
            match store.add_connection(Some(record.id), start, end, record.style.clone()) {
                Ok(id) => {
                    id_map.insert(EntityRef::Connection(record.id), EntityRef::Connection(id));
                    restored += 1;
                }
                Err(e) => log::warn!("Skipping connection restore for {}: {}", record.id, e),
            }
        }

        // A redo must delete what was recreated.
        for target in &mut self.targets {
            if let Some(new) = id_map.get(target) {
                *target = *new;
            }
        }
        log::info!(
            "Undo delete: restored {} note(s), {} image(s), {} connection(s)",
            self.snapshot.notes.len(),
            self.snapshot.images.len(),
            restored
        );
        Ok(())
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "targets": self.targets,
            "notes": self.snapshot.notes,
            "images": self.snapshot.images,
            "connections": self.snapshot.connections,
        })
    }
}
