//! Connection entity joining two notes or images.

use super::{EntityId, EntityRef, SerializableColor};
use crate::routing::Route;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Stroke pattern for a connection line.
///
/// Serialized as its pen-style integer: 1 solid, 2 dash, 3 dot. Other
/// pen styles read as solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum LineStyle {
    #[default]
    Solid,
    Dash,
    Dot,
}

impl LineStyle {
    /// Dash pattern in line-width units, empty for solid lines.
    pub fn dash_pattern(&self) -> &'static [f64] {
        match self {
            LineStyle::Solid => &[],
            LineStyle::Dash => &[4.0, 2.0],
            LineStyle::Dot => &[1.0, 2.0],
        }
    }
}

impl From<LineStyle> for u8 {
    fn from(style: LineStyle) -> Self {
        match style {
            LineStyle::Solid => 1,
            LineStyle::Dash => 2,
            LineStyle::Dot => 3,
        }
    }
}

impl From<u8> for LineStyle {
    fn from(value: u8) -> Self {
        match value {
            1 => LineStyle::Solid,
            2 => LineStyle::Dash,
            3 => LineStyle::Dot,
            other => {
                log::warn!("Unsupported line style {}; drawing solid", other);
                LineStyle::Solid
            }
        }
    }
}

/// Visual style of a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionStyle {
    pub line_color: SerializableColor,
    pub line_width: f64,
    pub line_style: LineStyle,
    /// Length of the arrowhead sides.
    pub arrow_size: f64,
    /// Half-angle of the arrowhead, in degrees.
    pub arrow_angle: f64,
    pub show_arrow: bool,
    /// 0 draws a straight line; anything else bends it into a quadratic curve.
    pub curve_factor: f64,
}

impl Default for ConnectionStyle {
    fn default() -> Self {
        Self {
            line_color: SerializableColor::rgb(100, 100, 100),
            line_width: 2.0,
            line_style: LineStyle::Solid,
            arrow_size: 12.0,
            arrow_angle: 30.0,
            show_arrow: true,
            curve_factor: 0.0,
        }
    }
}

/// A directed connection between two endpoints.
#[derive(Debug, Clone)]
pub struct Connection {
    pub(crate) id: EntityId,
    pub(crate) start: EntityRef,
    pub(crate) end: EntityRef,
    pub(crate) style: ConnectionStyle,
    /// Geometry derived from the endpoints; kept current by the store.
    pub(crate) route: Route,
}

impl Connection {
    pub(crate) fn new(id: EntityId, start: EntityRef, end: EntityRef, style: ConnectionStyle) -> Self {
        Self {
            id,
            start,
            end,
            style,
            route: Route::default(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Connection(self.id)
    }

    pub fn start(&self) -> EntityRef {
        self.start
    }

    pub fn end(&self) -> EntityRef {
        self.end
    }

    pub fn style(&self) -> &ConnectionStyle {
        &self.style
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn start_point(&self) -> Point {
        self.route.start
    }

    pub fn end_point(&self) -> Point {
        self.route.end
    }

    pub fn is_connected_to(&self, entity: EntityRef) -> bool {
        self.start == entity || self.end == entity
    }

    /// The endpoint opposite `entity`, if `entity` is one of the endpoints.
    pub fn other_endpoint(&self, entity: EntityRef) -> Option<EntityRef> {
        if self.start == entity {
            Some(self.end)
        } else if self.end == entity {
            Some(self.start)
        } else {
            None
        }
    }

    /// Whether this connection joins `a` and `b`, in either direction.
    pub fn joins(&self, a: EntityRef, b: EntityRef) -> bool {
        (self.start == a && self.end == b) || (self.start == b && self.end == a)
    }
}
