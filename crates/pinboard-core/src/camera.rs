//! Camera module for pan/zoom transforms.

use crate::config::ViewConfig;
use crate::scene::Scene;
use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Viewport assumed until the view layer reports its real size.
pub const DEFAULT_VIEWPORT: Size = Size::new(800.0, 600.0);

/// Notifications produced by the camera, drained by the view layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewEvent {
    /// New zoom factor.
    ZoomChanged(f64),
    /// New logical centre of the view.
    PanChanged(Point),
    ViewportChanged(Size),
}

/// Camera manages the view transform for the board.
///
/// The view is described by a logical centre point, a zoom factor and the
/// viewport size in pixels. Zooming keeps the centre fixed.
#[derive(Debug, Clone)]
pub struct Camera {
    config: ViewConfig,
    zoom: f64,
    center: Point,
    viewport: Size,
    events: Vec<ViewEvent>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}

impl Camera {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            zoom: 1.0,
            center: Point::ZERO,
            viewport: DEFAULT_VIEWPORT,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.events.push(ViewEvent::ViewportChanged(viewport));
        }
    }

    /// World to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.viewport.to_vec2() / 2.0)
            * Affine::scale(self.zoom)
            * Affine::translate(-self.center.to_vec2())
    }

    /// Screen to world transform.
    pub fn inverse_transform(&self) -> Affine {
        self.transform().inverse()
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// The part of the world currently in view.
    pub fn visible_rect(&self) -> Rect {
        let half = self.viewport.to_vec2() / (2.0 * self.zoom);
        Rect::from_points(self.center - half, self.center + half)
    }

    /// Set the zoom factor, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) {
        let (min_zoom, max_zoom) = self.config.zoom_range();
        let zoom = zoom.clamp(min_zoom, max_zoom);
        if (zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        self.zoom = zoom;
        log::debug!("Zoom changed to {:.3}", zoom);
        self.events.push(ViewEvent::ZoomChanged(zoom));
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / self.config.zoom_step);
    }

    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
    }

    /// Zoom by `factor`, keeping the world point under `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let world_point = self.screen_to_world(screen_point);
        let old_zoom = self.zoom;
        self.set_zoom(self.zoom * factor);
        if (self.zoom - old_zoom).abs() < f64::EPSILON {
            return;
        }
        let drift = self.screen_to_world(screen_point) - world_point;
        self.center_on(self.center - drift);
    }

    /// Scroll the view by a pixel delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let delta = Vec2::new(dx, dy) / self.zoom;
        self.center_on(self.center + delta);
    }

    pub fn center_on(&mut self, point: Point) {
        if point == self.center {
            return;
        }
        self.center = point;
        self.events.push(ViewEvent::PanChanged(point));
    }

    /// Centre on the scene content, or the origin when the scene is empty.
    pub fn center_on_content(&mut self, scene: &Scene) {
        self.center_on(scene.center_of_content());
    }

    /// Margin added around content when fitting it into view.
    pub fn fit_margin(&self, content: Rect) -> f64 {
        let largest = content.width().max(content.height());
        (largest * self.config.fit_margin_ratio)
            .min(self.config.fit_margin_max)
            .max(self.config.fit_margin_min)
    }

    /// Zoom and centre so all content (plus a margin) fits the viewport.
    ///
    /// Returns false when there is no content to fit.
    pub fn fit_to_content(&mut self, scene: &Scene) -> bool {
        let Some(content) = scene.content_bounds() else {
            return false;
        };
        let margin = self.fit_margin(content);
        let padded = content.inflate(margin, margin);
        let scale_x = self.viewport.width / padded.width();
        let scale_y = self.viewport.height / padded.height();
        self.set_zoom(scale_x.min(scale_y));
        self.center_on(content.center());
        log::info!("Fit {} entities at zoom {:.3}", scene.len(), self.zoom);
        true
    }

    /// Restore a saved zoom and centre.
    pub fn restore(&mut self, zoom: f64, center: Point) {
        self.set_zoom(zoom);
        self.center_on(center);
    }

    /// Reset camera to the origin at 100%.
    pub fn reset(&mut self) {
        self.reset_zoom();
        self.center_on(Point::ZERO);
    }

    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }
}
