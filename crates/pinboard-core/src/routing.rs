//! Connection routing: anchor selection, path construction, arrowheads and
//! hit-testing.
//!
//! Everything here is a pure function of endpoint geometry and connection
//! style. The entity store calls [`Route::compute`] whenever an endpoint's
//! geometry changes, so a connection's cached route is always current.

use crate::config::RoutingConfig;
use crate::entities::{Connectable, ConnectionStyle};
use kurbo::{BezPath, Line, ParamCurveNearest, Point, QuadBez, Rect, Shape as KurboShape, Vec2};

/// Accuracy used for nearest-point queries on curved routes.
const NEAREST_ACCURACY: f64 = 1e-3;

/// Cached geometry of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Route {
    pub start: Point,
    pub end: Point,
    /// Quadratic control point; `None` for a straight route.
    pub control: Option<Point>,
    /// Arrowhead triangle: apex (the end point) then the two base vertices.
    pub arrow: Option<[Point; 3]>,
}

impl Route {
    /// Route between two endpoints using the closest pair of anchors.
    pub fn compute(from: &dyn Connectable, to: &dyn Connectable, style: &ConnectionStyle) -> Self {
        let from_anchors = from.anchor_points();
        let to_anchors = to.anchor_points();
        let (start, end) = select_anchor_pair(&from_anchors, &to_anchors)
            .unwrap_or_else(|| (from.bounds().center(), to.bounds().center()));
        Self::between(start, end, style)
    }

    /// Route between two fixed points.
    pub fn between(start: Point, end: Point, style: &ConnectionStyle) -> Self {
        let arrow = if style.show_arrow {
            arrowhead(start, end, style.arrow_size, style.arrow_angle)
        } else {
            None
        };
        Self {
            start,
            end,
            control: control_point(start, end, style.curve_factor),
            arrow,
        }
    }

    pub fn is_curved(&self) -> bool {
        self.control.is_some()
    }

    /// The connection line, without the arrowhead.
    pub fn line_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        match self.control {
            Some(control) => path.quad_to(control, self.end),
            None => path.line_to(self.end),
        }
        path
    }

    /// The closed arrowhead triangle, if one is drawn.
    pub fn arrow_path(&self) -> Option<BezPath> {
        self.arrow.map(|[apex, left, right]| {
            let mut path = BezPath::new();
            path.move_to(apex);
            path.line_to(left);
            path.line_to(right);
            path.close_path();
            path
        })
    }

    /// Line plus arrowhead as one path.
    pub fn to_path(&self) -> BezPath {
        let mut path = self.line_path();
        if let Some(arrow) = self.arrow_path() {
            path.extend(arrow.elements().iter().copied());
        }
        path
    }

    /// Bounding box of the line and arrowhead.
    pub fn bounds(&self) -> Rect {
        self.to_path().bounding_box()
    }

    /// Distance from `point` to the connection line.
    pub fn distance_to(&self, point: Point) -> f64 {
        let distance_sq = match self.control {
            Some(control) => QuadBez::new(self.start, control, self.end)
                .nearest(point, NEAREST_ACCURACY)
                .distance_sq,
            None if self.start == self.end => (point - self.start).hypot2(),
            None => Line::new(self.start, self.end)
                .nearest(point, NEAREST_ACCURACY)
                .distance_sq,
        };
        distance_sq.sqrt()
    }

    /// Check if `point` falls inside a band of `width` around the line, or
    /// inside the arrowhead.
    pub fn hit_test(&self, point: Point, width: f64) -> bool {
        if self.distance_to(point) <= width / 2.0 {
            return true;
        }
        self.arrow
            .is_some_and(|[a, b, c]| point_in_triangle(point, a, b, c))
    }
}

/// Pick the closest pair from the Cartesian product of two anchor lists.
///
/// Ties resolve to the first minimum in iteration order (all of `from`'s
/// anchors against the first of `to`'s, and so on).
pub fn select_anchor_pair(from: &[Point], to: &[Point]) -> Option<(Point, Point)> {
    let mut best: Option<(Point, Point)> = None;
    let mut min_distance = f64::INFINITY;
    for &start in from {
        for &end in to {
            let distance = start.distance(end);
            if distance < min_distance {
                min_distance = distance;
                best = Some((start, end));
            }
        }
    }
    best
}

/// Control point for a curved route, offset from the midpoint
/// perpendicular to the segment by `curve_factor * (-dy, dx)`.
pub fn control_point(start: Point, end: Point, curve_factor: f64) -> Option<Point> {
    if curve_factor == 0.0 {
        return None;
    }
    let delta = end - start;
    let offset = Vec2::new(-delta.y, delta.x) * curve_factor;
    Some(start.midpoint(end) + offset)
}

/// Arrowhead triangle at `end`, pointing along `start -> end`.
///
/// Coincident points have no direction, so no arrowhead is produced.
pub fn arrowhead(start: Point, end: Point, size: f64, angle_degrees: f64) -> Option<[Point; 3]> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let angle = dy.atan2(dx);
    let spread = angle_degrees.to_radians();
    let base = |theta: f64| Point::new(end.x - size * theta.cos(), end.y - size * theta.sin());
    Some([end, base(angle - spread), base(angle + spread)])
}

/// Width of the selectable band around a connection line.
pub fn hit_width(line_width: f64, config: &RoutingConfig) -> f64 {
    (line_width + config.hit_padding).max(config.min_hit_width)
}

fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let cross = |o: Point, u: Point, v: Point| (u.x - o.x) * (v.y - o.y) - (u.y - o.y) * (v.x - o.x);
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}
