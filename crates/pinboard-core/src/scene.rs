//! Unbounded scene model: tracked entity bounds and dynamic expansion of
//! the scene rectangle.

use crate::config::SceneConfig;
use crate::entities::EntityRef;
use kurbo::{Point, Rect, Size};
use std::collections::HashMap;

/// Notifications produced by the scene, drained by the owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    /// The scene rect grew (or was reset) to the given rect.
    BoundsChanged(Rect),
    EntityAdded(EntityRef),
    EntityRemoved(EntityRef),
}

/// Summary of the scene for status displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneStatistics {
    pub entity_count: usize,
    pub scene_size: Size,
    pub scene_center: Point,
    /// `None` when nothing is tracked.
    pub content_size: Option<Size>,
    pub content_center: Point,
}

/// The logical workspace that contains every entity.
///
/// The scene rect only ever grows; [`Scene::reset`] is the one way back to
/// the initial size.
#[derive(Debug, Clone)]
pub struct Scene {
    config: SceneConfig,
    rect: Rect,
    tracked: HashMap<EntityRef, Rect>,
    events: Vec<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            rect: Self::initial_rect(&config),
            tracked: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Square of `initial_size` centred on the origin.
    pub fn initial_rect(config: &SceneConfig) -> Rect {
        let half = config.initial_size / 2.0;
        Rect::new(-half, -half, half, half)
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Grow the scene to include `rect` (used when restoring a document).
    /// Never shrinks.
    pub fn include_rect(&mut self, rect: Rect) -> bool {
        let grown = self.rect.union(rect);
        if grown == self.rect {
            return false;
        }
        self.rect = grown;
        self.events.push(SceneEvent::BoundsChanged(grown));
        true
    }

    /// Start tracking an entity and expand the scene around it if needed.
    pub fn add_entity(&mut self, entity: EntityRef, bounds: Rect) {
        self.tracked.insert(entity, bounds);
        self.events.push(SceneEvent::EntityAdded(entity));
        self.check_and_expand(bounds);
    }

    /// Stop tracking an entity. The scene rect does not shrink.
    pub fn remove_entity(&mut self, entity: EntityRef) -> bool {
        if self.tracked.remove(&entity).is_some() {
            self.events.push(SceneEvent::EntityRemoved(entity));
            true
        } else {
            false
        }
    }

    /// Record new bounds for a tracked entity (after a move or resize).
    pub fn update_entity(&mut self, entity: EntityRef, bounds: Rect) {
        if let Some(tracked) = self.tracked.get_mut(&entity) {
            *tracked = bounds;
            self.check_and_expand(bounds);
        }
    }

    pub fn is_tracked(&self, entity: EntityRef) -> bool {
        self.tracked.contains_key(&entity)
    }

    pub fn entity_bounds(&self, entity: EntityRef) -> Option<Rect> {
        self.tracked.get(&entity).copied()
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Push any scene edge that lies within `expansion_threshold` of `bounds`
    /// out to `expansion_amount` beyond it. Each edge is tested on its own.
    ///
    /// Returns whether the scene grew.
    pub fn check_and_expand(&mut self, bounds: Rect) -> bool {
        let threshold = self.config.expansion_threshold;
        let amount = self.config.expansion_amount;
        let mut rect = self.rect;

        if bounds.x0 - threshold < rect.x0 {
            rect.x0 = rect.x0.min(bounds.x0 - amount);
        }
        if bounds.x1 + threshold > rect.x1 {
            rect.x1 = rect.x1.max(bounds.x1 + amount);
        }
        if bounds.y0 - threshold < rect.y0 {
            rect.y0 = rect.y0.min(bounds.y0 - amount);
        }
        if bounds.y1 + threshold > rect.y1 {
            rect.y1 = rect.y1.max(bounds.y1 + amount);
        }

        if rect == self.rect {
            return false;
        }
        log::debug!("Scene expanded from {:?} to {:?}", self.rect, rect);
        self.rect = rect;
        self.events.push(SceneEvent::BoundsChanged(rect));
        true
    }

    /// Union of all tracked bounds, or `None` for an empty scene.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.tracked.values().copied().reduce(|acc, r| acc.union(r))
    }

    /// Centre of the content, or the origin for an empty scene.
    pub fn center_of_content(&self) -> Point {
        self.content_bounds().map(|r| r.center()).unwrap_or(Point::ZERO)
    }

    /// Drop all tracking and restore the initial rect.
    pub fn reset(&mut self) {
        self.tracked.clear();
        self.rect = Self::initial_rect(&self.config);
        self.events.push(SceneEvent::BoundsChanged(self.rect));
    }

    pub fn statistics(&self) -> SceneStatistics {
        let content = self.content_bounds();
        SceneStatistics {
            entity_count: self.tracked.len(),
            scene_size: self.rect.size(),
            scene_center: self.rect.center(),
            content_size: content.map(|r| r.size()),
            content_center: self.center_of_content(),
        }
    }

    /// Take the pending notifications.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}
