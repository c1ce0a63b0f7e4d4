//! Entity store: owns every note, image and connection on the board.
//!
//! All structural rules live here. Connections only ever reference live
//! endpoints, an endpoint cannot be removed while a connection still uses
//! it, and any change to an endpoint's geometry re-routes its connections
//! before the mutating call returns.
//!
//! Mutators are crate-private: outside code changes the board through
//! commands (see [`crate::history`]).

use crate::config::{BoardConfig, RoutingConfig};
use crate::entities::{
    Connectable, Connection, ConnectionStyle, EntityId, EntityRef, Image, ImageStyle, Note,
    NoteStyle,
};
use crate::error::{Error, Result};
use crate::routing::{Route, hit_width};
use crate::scene::Scene;
use kurbo::{Point, Size};
use std::collections::HashMap;

/// An endpoint removed together with the connections that used it.
#[derive(Debug, Clone)]
pub(crate) struct Removed<T> {
    pub entity: T,
    pub connections: Vec<Connection>,
}

/// Owner of all entities plus the scene they live in.
#[derive(Debug, Clone)]
pub struct EntityStore {
    notes: HashMap<EntityId, Note>,
    images: HashMap<EntityId, Image>,
    connections: HashMap<EntityId, Connection>,
    /// Insertion order, used for stable iteration and serialization.
    order: Vec<EntityRef>,
    next_id: u64,
    scene: Scene,
    routing: RoutingConfig,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new(&BoardConfig::default())
    }
}

impl EntityStore {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            notes: HashMap::new(),
            images: HashMap::new(),
            connections: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
            scene: Scene::new(config.scene),
            routing: config.routing,
        }
    }

    // ---- Reads ----

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn note(&self, id: EntityId) -> Option<&Note> {
        self.notes.get(&id)
    }

    pub fn image(&self, id: EntityId) -> Option<&Image> {
        self.images.get(&id)
    }

    pub fn connection(&self, id: EntityId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Notes in creation order.
    pub fn notes(&self) -> impl Iterator<Item = &Note> + '_ {
        self.order.iter().filter_map(|r| match r {
            EntityRef::Note(id) => self.notes.get(id),
            _ => None,
        })
    }

    /// Images in creation order.
    pub fn images(&self) -> impl Iterator<Item = &Image> + '_ {
        self.order.iter().filter_map(|r| match r {
            EntityRef::Image(id) => self.images.get(id),
            _ => None,
        })
    }

    /// Connections in creation order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.order.iter().filter_map(|r| match r {
            EntityRef::Connection(id) => self.connections.get(id),
            _ => None,
        })
    }

    /// Every entity reference in creation order.
    pub fn entity_refs(&self) -> &[EntityRef] {
        &self.order
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Note(id) => self.notes.contains_key(&id),
            EntityRef::Image(id) => self.images.contains_key(&id),
            EntityRef::Connection(id) => self.connections.contains_key(&id),
        }
    }

    /// Resolve a note or image reference.
    pub fn endpoint(&self, entity: EntityRef) -> Option<&dyn Connectable> {
        match entity {
            EntityRef::Note(id) => self.notes.get(&id).map(|n| n as &dyn Connectable),
            EntityRef::Image(id) => self.images.get(&id).map(|i| i as &dyn Connectable),
            EntityRef::Connection(_) => None,
        }
    }

    fn endpoint_mut(&mut self, entity: EntityRef) -> Option<&mut dyn Connectable> {
        match entity {
            EntityRef::Note(id) => self.notes.get_mut(&id).map(|n| n as &mut dyn Connectable),
            EntityRef::Image(id) => self.images.get_mut(&id).map(|i| i as &mut dyn Connectable),
            EntityRef::Connection(_) => None,
        }
    }

    /// Current position of a note or image.
    pub fn position_of(&self, entity: EntityRef) -> Result<Point> {
        match entity {
            EntityRef::Note(id) => self.notes.get(&id).map(Note::position),
            EntityRef::Image(id) => self.images.get(&id).map(Image::position),
            EntityRef::Connection(_) => None,
        }
        .ok_or_else(|| Error::missing(entity))
    }

    /// Connections attached to an endpoint, in subscription order.
    pub fn connections_for(&self, entity: EntityRef) -> Vec<EntityId> {
        self.endpoint(entity)
            .map(|e| e.observers().iter().collect())
            .unwrap_or_default()
    }

    /// The connection joining `a` and `b` in either direction, if any.
    pub fn connection_between(&self, a: EntityRef, b: EntityRef) -> Option<EntityId> {
        self.connections().find(|c| c.joins(a, b)).map(Connection::id)
    }

    /// Compute a connection's route from the current endpoint geometry.
    ///
    /// Fails with a structural error if either endpoint is gone.
    pub fn route(&self, connection: EntityId) -> Result<Route> {
        let conn = self
            .connections
            .get(&connection)
            .ok_or_else(|| Error::missing(EntityRef::Connection(connection)))?;
        let start = self.endpoint(conn.start).ok_or_else(|| {
            Error::Structural(format!("{} has dangling start {}", conn.entity_ref(), conn.start))
        })?;
        let end = self.endpoint(conn.end).ok_or_else(|| {
            Error::Structural(format!("{} has dangling end {}", conn.entity_ref(), conn.end))
        })?;
        Ok(Route::compute(start, end, &conn.style))
    }

    /// Topmost connection whose widened path contains `point`.
    pub fn connection_at(&self, point: Point) -> Option<EntityId> {
        let hit = |c: &&Connection| {
            c.route
                .hit_test(point, hit_width(c.style.line_width, &self.routing))
        };
        self.order
            .iter()
            .rev()
            .find_map(|r| match r {
                EntityRef::Connection(id) => self.connections.get(id).filter(hit),
                _ => None,
            })
            .map(Connection::id)
    }

    /// Topmost note or image containing `point`.
    pub fn endpoint_at(&self, point: Point) -> Option<EntityRef> {
        self.order
            .iter()
            .rev()
            .copied()
            .filter(EntityRef::is_endpoint)
            .find(|r| self.endpoint(*r).is_some_and(|e| e.contains(point)))
    }

    // ---- Identity ----

    fn is_vacant(&self, id: EntityId) -> bool {
        !self.notes.contains_key(&id)
            && !self.images.contains_key(&id)
            && !self.connections.contains_key(&id)
    }

    /// Use `requested` when it is free, otherwise allocate a fresh id.
    ///
    /// `u64::MAX` is never handed out, so `next_id` cannot overflow.
    fn claim_id(&mut self, requested: Option<EntityId>) -> EntityId {
        match requested {
            Some(id) if id.0 < u64::MAX && self.is_vacant(id) => {
                self.next_id = match id.0 + 1 {
                    u64::MAX => 1,
                    next => self.next_id.max(next),
                };
                id
            }
            _ => self.fresh_id(),
        }
    }

    fn fresh_id(&mut self) -> EntityId {
        loop {
            let id = EntityId(self.next_id);
            // Past the last usable id, search again from the start.
            self.next_id = match self.next_id + 1 {
                u64::MAX => 1,
                next => next,
            };
            if self.is_vacant(id) {
                return id;
            }
        }
    }

    // ---- Creation ----

    pub(crate) fn add_note(&mut self, requested: Option<EntityId>, mut note: Note) -> EntityId {
        let id = self.claim_id(requested);
        note.id = id;
        note.observers = Default::default();
        self.scene.add_entity(EntityRef::Note(id), Connectable::bounds(&note));
        self.notes.insert(id, note);
        self.order.push(EntityRef::Note(id));
        log::debug!("Added note {}", id);
        id
    }

    pub(crate) fn add_image(&mut self, requested: Option<EntityId>, mut image: Image) -> EntityId {
        let id = self.claim_id(requested);
        image.id = id;
        image.observers = Default::default();
        self.scene.add_entity(EntityRef::Image(id), Connectable::bounds(&image));
        self.images.insert(id, image);
        self.order.push(EntityRef::Image(id));
        log::debug!("Added image {}", id);
        id
    }

    /// Connect two endpoints. Rejects unknown endpoints, self-connections
    /// and a second connection between the same pair (in either direction).
    pub(crate) fn add_connection(
        &mut self,
        requested: Option<EntityId>,
        start: EntityRef,
        end: EntityRef,
        style: ConnectionStyle,
    ) -> Result<EntityId> {
        for endpoint in [start, end] {
            if !endpoint.is_endpoint() {
                return Err(Error::Structural(format!("{} cannot be a connection endpoint", endpoint)));
            }
            if !self.contains(endpoint) {
                return Err(Error::missing(endpoint));
            }
        }
        if start == end {
            return Err(Error::Structural(format!("Cannot connect {} to itself", start)));
        }
        if self.connection_between(start, end).is_some() {
            return Err(Error::Duplicate(start, end));
        }

        let id = self.claim_id(requested);
        let mut connection = Connection::new(id, start, end, style);
        if let (Some(a), Some(b)) = (self.endpoint(start), self.endpoint(end)) {
            connection.route = Route::compute(a, b, &connection.style);
        }
        for endpoint in [start, end] {
            if let Some(e) = self.endpoint_mut(endpoint) {
                e.observers_mut().subscribe(id);
            }
        }
        self.scene.add_entity(EntityRef::Connection(id), connection.route.bounds());
        self.connections.insert(id, connection);
        self.order.push(EntityRef::Connection(id));
        log::debug!("Connected {} -> {} as connection {}", start, end, id);
        Ok(id)
    }

    // ---- Removal ----

    fn forget(&mut self, entity: EntityRef) {
        self.order.retain(|r| *r != entity);
        self.scene.remove_entity(entity);
    }

    pub(crate) fn remove_connection(&mut self, id: EntityId) -> Result<Connection> {
        let connection = self
            .connections
            .remove(&id)
            .ok_or_else(|| Error::missing(EntityRef::Connection(id)))?;
        for endpoint in [connection.start, connection.end] {
            if let Some(e) = self.endpoint_mut(endpoint) {
                e.observers_mut().unsubscribe(id);
            }
        }
        self.forget(EntityRef::Connection(id));
        log::debug!("Removed connection {}", id);
        Ok(connection)
    }

    fn ensure_unreferenced(&self, entity: EntityRef) -> Result<()> {
        let attached = self.connections_for(entity);
        if attached.is_empty() {
            Ok(())
        } else {
            Err(Error::Structural(format!(
                "{} is still referenced by {} connection(s)",
                entity,
                attached.len()
            )))
        }
    }

    /// Remove a note that no connection references.
    pub(crate) fn remove_note(&mut self, id: EntityId) -> Result<Note> {
        let entity = EntityRef::Note(id);
        if !self.notes.contains_key(&id) {
            return Err(Error::missing(entity));
        }
        self.ensure_unreferenced(entity)?;
        let note = self.notes.remove(&id).ok_or_else(|| Error::missing(entity))?;
        self.forget(entity);
        log::debug!("Removed note {}", id);
        Ok(note)
    }

    /// Remove an image that no connection references.
    pub(crate) fn remove_image(&mut self, id: EntityId) -> Result<Image> {
        let entity = EntityRef::Image(id);
        if !self.images.contains_key(&id) {
            return Err(Error::missing(entity));
        }
        self.ensure_unreferenced(entity)?;
        let image = self.images.remove(&id).ok_or_else(|| Error::missing(entity))?;
        self.forget(entity);
        log::debug!("Removed image {}", id);
        Ok(image)
    }

    /// Remove every connection attached to `entity`, returning them.
    pub(crate) fn detach_all(&mut self, entity: EntityRef) -> Result<Vec<Connection>> {
        self.connections_for(entity)
            .into_iter()
            .map(|id| self.remove_connection(id))
            .collect()
    }

    pub(crate) fn remove_note_cascade(&mut self, id: EntityId) -> Result<Removed<Note>> {
        if !self.notes.contains_key(&id) {
            return Err(Error::missing(EntityRef::Note(id)));
        }
        let connections = self.detach_all(EntityRef::Note(id))?;
        let entity = self.remove_note(id)?;
        Ok(Removed { entity, connections })
    }

    pub(crate) fn remove_image_cascade(&mut self, id: EntityId) -> Result<Removed<Image>> {
        if !self.images.contains_key(&id) {
            return Err(Error::missing(EntityRef::Image(id)));
        }
        let connections = self.detach_all(EntityRef::Image(id))?;
        let entity = self.remove_image(id)?;
        Ok(Removed { entity, connections })
    }

    /// Drop everything and reset the scene.
    pub(crate) fn clear(&mut self) {
        self.notes.clear();
        self.images.clear();
        self.connections.clear();
        self.order.clear();
        self.next_id = 1;
        self.scene.reset();
    }

    // ---- Geometry changes ----

    /// Re-route every connection attached to `entity` and refresh its
    /// scene bounds. Runs synchronously after each geometry change.
    fn geometry_changed(&mut self, entity: EntityRef) -> Result<()> {
        let bounds = self
            .endpoint(entity)
            .map(|e| e.bounds())
            .ok_or_else(|| Error::missing(entity))?;
        self.scene.update_entity(entity, bounds);
        for connection in self.connections_for(entity) {
            self.reroute(connection)?;
        }
        Ok(())
    }

    /// Recompute and cache one connection's route.
    pub(crate) fn reroute(&mut self, id: EntityId) -> Result<()> {
        let route = self.route(id)?;
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.route = route;
        }
        self.scene.update_entity(EntityRef::Connection(id), route.bounds());
        Ok(())
    }

    /// Move a note or image. Returns the previous position.
    pub(crate) fn move_entity(&mut self, entity: EntityRef, position: Point) -> Result<Point> {
        let old = match entity {
            EntityRef::Note(id) => {
                let note = self.notes.get_mut(&id).ok_or_else(|| Error::missing(entity))?;
                let old = note.position;
                note.set_position(position);
                old
            }
            EntityRef::Image(id) => {
                let image = self.images.get_mut(&id).ok_or_else(|| Error::missing(entity))?;
                let old = image.position;
                image.set_position(position);
                old
            }
            EntityRef::Connection(_) => {
                return Err(Error::Structural(format!("{} cannot be moved directly", entity)));
            }
        };
        self.geometry_changed(entity)?;
        Ok(old)
    }

    pub(crate) fn set_note_text(&mut self, id: EntityId, text: String) -> Result<String> {
        let note = self.notes.get_mut(&id).ok_or_else(|| Error::missing(EntityRef::Note(id)))?;
        let old = std::mem::take(&mut note.text);
        note.set_text(text);
        self.geometry_changed(EntityRef::Note(id))?;
        Ok(old)
    }

    pub(crate) fn set_note_style(&mut self, id: EntityId, style: NoteStyle) -> Result<NoteStyle> {
        let note = self.notes.get_mut(&id).ok_or_else(|| Error::missing(EntityRef::Note(id)))?;
        let old = note.style.clone();
        note.set_style(style);
        self.geometry_changed(EntityRef::Note(id))?;
        Ok(old)
    }

    /// Record the text extent measured by the rendering layer.
    pub fn set_measured_text_size(&mut self, id: EntityId, size: Option<Size>) -> Result<()> {
        let note = self.notes.get_mut(&id).ok_or_else(|| Error::missing(EntityRef::Note(id)))?;
        if note.measured_text == size {
            return Ok(());
        }
        note.set_measured_text_size(size);
        self.geometry_changed(EntityRef::Note(id))
    }

    /// Set an image's rotation in degrees. Returns the previous rotation.
    pub(crate) fn set_image_rotation(&mut self, id: EntityId, degrees: f64) -> Result<f64> {
        let image = self.images.get_mut(&id).ok_or_else(|| Error::missing(EntityRef::Image(id)))?;
        let old = image.rotation;
        image.set_rotation(degrees);
        self.geometry_changed(EntityRef::Image(id))?;
        Ok(old)
    }

    pub(crate) fn set_image_style(&mut self, id: EntityId, style: ImageStyle) -> Result<ImageStyle> {
        let image = self.images.get_mut(&id).ok_or_else(|| Error::missing(EntityRef::Image(id)))?;
        let old = image.style.clone();
        let reshaped = old.affects_geometry(&style);
        image.set_style(style);
        if reshaped {
            self.geometry_changed(EntityRef::Image(id))?;
        }
        Ok(old)
    }

    pub(crate) fn set_connection_style(
        &mut self,
        id: EntityId,
        style: ConnectionStyle,
    ) -> Result<ConnectionStyle> {
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or_else(|| Error::missing(EntityRef::Connection(id)))?;
        let old = std::mem::replace(&mut connection.style, style);
        self.reroute(id)?;
        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    fn add_note(store: &mut EntityStore, x: f64, y: f64) -> EntityRef {
        let note = Note::new(EntityId(0), Point::new(x, y), "", NoteStyle::default());
        EntityRef::Note(store.add_note(None, note))
    }

    fn add_image(store: &mut EntityStore, x: f64, y: f64) -> EntityRef {
        let image = Image::new(
            EntityId(0),
            Point::new(x, y),
            None,
            Size::new(200.0, 150.0),
            ImageStyle::default(),
        );
        EntityRef::Image(store.add_image(None, image))
    }

    fn connect(store: &mut EntityStore, a: EntityRef, b: EntityRef) -> EntityId {
        store.add_connection(None, a, b, ConnectionStyle::default()).unwrap()
    }

    #[test]
    fn test_ids_are_unique_across_kinds() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_image(&mut store, 500.0, 0.0);
        let c = connect(&mut store, a, b);
        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), c);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_two_notes_route() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_note(&mut store, 200.0, 0.0);
        let c = connect(&mut store, a, b);

        let conn = store.connection(c).unwrap();
        let note_a = store.note(a.id()).unwrap();
        let note_b = store.note(b.id()).unwrap();
        assert!(conn.start_point().x >= note_a.center().x);
        assert!(conn.end_point().x <= note_b.center().x);
        assert!((conn.start_point().y - conn.end_point().y).abs() < 10.0);
    }

    #[test]
    fn test_move_reroutes_synchronously() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_note(&mut store, 200.0, 0.0);
        let c = connect(&mut store, a, b);

        store.move_entity(b, Point::new(0.0, 300.0)).unwrap();
        let conn = store.connection(c).unwrap();
        // Now stacked vertically: bottom of a to top of b.
        assert_eq!(conn.start_point(), Point::new(50.0, 60.0));
        assert_eq!(conn.end_point(), Point::new(50.0, 300.0));
        assert_eq!(*conn.route(), store.route(c).unwrap());
    }

    #[test]
    fn test_route_is_idempotent() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_image(&mut store, 300.0, 200.0);
        let c = connect(&mut store, a, b);
        store.reroute(c).unwrap();
        let first = *store.connection(c).unwrap().route();
        store.reroute(c).unwrap();
        assert_eq!(first, *store.connection(c).unwrap().route());
    }

    #[test]
    fn test_rejects_duplicates_and_self_connections() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_note(&mut store, 200.0, 0.0);
        connect(&mut store, a, b);

        let dup = store.add_connection(None, b, a, ConnectionStyle::default());
        assert!(matches!(dup, Err(Error::Duplicate(_, _))));
        let selfie = store.add_connection(None, a, a, ConnectionStyle::default());
        assert!(matches!(selfie, Err(Error::Structural(_))));
        let missing = store.add_connection(
            None,
            a,
            EntityRef::Note(EntityId(999)),
            ConnectionStyle::default(),
        );
        assert!(matches!(missing, Err(Error::Structural(_))));
        assert_eq!(store.connection_count(), 1);
    }

    #[test]
    fn test_referenced_endpoint_cannot_be_removed() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_note(&mut store, 200.0, 0.0);
        let c = connect(&mut store, a, b);

        assert!(matches!(store.remove_note(a.id()), Err(Error::Structural(_))));
        assert!(store.note(a.id()).is_some());

        let removed = store.remove_note_cascade(a.id()).unwrap();
        assert_eq!(removed.connections.len(), 1);
        assert_eq!(removed.connections[0].id(), c);
        assert!(store.connection(c).is_none());
        assert!(store.connections_for(b).is_empty());
    }

    #[test]
    fn test_remove_connection_unsubscribes() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_note(&mut store, 200.0, 0.0);
        let c = connect(&mut store, a, b);
        assert_eq!(store.connections_for(a), vec![c]);

        store.remove_connection(c).unwrap();
        assert!(store.connections_for(a).is_empty());
        assert!(store.remove_connection(c).is_err());
        store.remove_note(a.id()).unwrap();
    }

    #[test]
    fn test_dangling_route_is_structural_error() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_note(&mut store, 200.0, 0.0);
        let c = connect(&mut store, a, b);
        // Bypass the cascade rules to simulate corruption.
        store.notes.remove(&b.id());
        assert!(matches!(store.route(c), Err(Error::Structural(_))));
    }

    #[test]
    fn test_requested_id_reclaimed_when_vacant() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let note = store.remove_note(a.id()).unwrap();
        let restored = store.add_note(Some(a.id()), note);
        assert_eq!(restored, a.id());

        let taken = Note::new(EntityId(0), Point::ZERO, "", NoteStyle::default());
        let fresh = store.add_note(Some(a.id()), taken);
        assert_ne!(fresh, a.id());

        let far = Note::new(EntityId(0), Point::ZERO, "", NoteStyle::default());
        assert_eq!(store.add_note(Some(EntityId(50)), far), EntityId(50));
        let next = add_note(&mut store, 0.0, 0.0);
        assert_eq!(next.id(), EntityId(51));
    }

    #[test]
    fn test_requested_max_id_gets_fresh_id() {
        let mut store = EntityStore::default();
        let huge = Note::new(EntityId(0), Point::ZERO, "", NoteStyle::default());
        let id = store.add_note(Some(EntityId(u64::MAX)), huge);
        assert_eq!(id, EntityId(1));

        let edge = Note::new(EntityId(0), Point::ZERO, "", NoteStyle::default());
        assert_eq!(store.add_note(Some(EntityId(u64::MAX - 1)), edge), EntityId(u64::MAX - 1));
        // Allocation wraps around to the lowest vacant id.
        let next = add_note(&mut store, 0.0, 0.0);
        assert_eq!(next.id(), EntityId(2));
    }

    #[test]
    fn test_style_change_reroutes() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_note(&mut store, 300.0, 0.0);
        let c = connect(&mut store, a, b);

        let mut style = NoteStyle::default();
        style.min_width = 200.0;
        store.set_note_style(a.id(), style).unwrap();
        assert_eq!(store.connection(c).unwrap().start_point(), Point::new(200.0, 30.0));
    }

    #[test]
    fn test_rotation_reroutes() {
        let mut store = EntityStore::default();
        let img = add_image(&mut store, 0.0, 0.0);
        let note = add_note(&mut store, 1000.0, 100.0);
        let c = connect(&mut store, img, note);
        let before = store.connection(c).unwrap().start_point();
        store.set_image_rotation(img.id(), 90.0).unwrap();
        assert_ne!(store.connection(c).unwrap().start_point(), before);
    }

    #[test]
    fn test_scene_tracks_and_expands() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        assert_eq!(store.scene().content_bounds(), Some(Rect::new(0.0, 0.0, 100.0, 60.0)));
        store.move_entity(a, Point::new(4_800.0, 0.0)).unwrap();
        assert!(store.scene().rect().x1 > 5_000.0);
        store.remove_note(a.id()).unwrap();
        assert!(store.scene().content_bounds().is_none());
    }

    #[test]
    fn test_connection_and_endpoint_hit_testing() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let b = add_note(&mut store, 200.0, 0.0);
        let c = connect(&mut store, a, b);
        assert_eq!(store.connection_at(Point::new(150.0, 32.0)), Some(c));
        assert_eq!(store.connection_at(Point::new(150.0, 50.0)), None);
        assert_eq!(store.endpoint_at(Point::new(250.0, 30.0)), Some(b));
        assert_eq!(store.endpoint_at(Point::new(150.0, 30.0)), None);
    }

    #[test]
    fn test_iteration_order() {
        let mut store = EntityStore::default();
        let a = add_note(&mut store, 0.0, 0.0);
        let _img = add_image(&mut store, 500.0, 0.0);
        let b = add_note(&mut store, 200.0, 0.0);
        let ids: Vec<_> = store.notes().map(Note::id).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }
}
