//! Parametric building blocks. Every constructor returns a shared cell ready
//! to be referenced with [`Cell::add_ref`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Port};
use crate::geometry::{Point, Rect};
use crate::LayerId;

/// Side of a rectangle, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    N,
    S,
    E,
    W,
}

impl Side {
    fn prefix(self) -> &'static str {
        match self {
            Side::N => "N",
            Side::S => "S",
            Side::E => "E",
            Side::W => "W",
        }
    }

    fn orientation(self) -> f64 {
        match self {
            Side::E => 0.0,
            Side::N => 90.0,
            Side::W => 180.0,
            Side::S => 270.0,
        }
    }
}

/// A `width × length` rectangle with its lower-left corner at the origin.
/// Port `1` sits on the bottom edge facing down, port `2` on the top edge
/// facing up; both are `width` wide.
pub fn straight(width: f64, length: f64, layer: LayerId) -> Arc<Cell> {
    let mut cell = Cell::new("straight");
    cell.add_geometry(Rect::new(layer, 0.0, 0.0, width, length));
    cell.add_port("1", &Port::new("1", Point::new(width / 2.0, 0.0), width, 270.0));
    cell.add_port("2", &Port::new("2", Point::new(width / 2.0, length), width, 90.0));
    Arc::new(cell)
}

/// A rectangle centered on the origin with `count` evenly spaced ports per
/// requested side. Ports are named `N1`, `N2`, ... and numbered from the
/// negative end of the side (left for N/S, bottom for E/W).
pub fn compass_multi(width: f64, height: f64, sides: &[(Side, usize)], layer: LayerId) -> Arc<Cell> {
    let mut cell = Cell::new("compass_multi");
    let dx = width / 2.0;
    let dy = height / 2.0;
    cell.add_geometry(Rect::new(layer, -dx, -dy, dx, dy));

    for &(side, count) in sides {
        if count == 0 {
            continue;
        }
        let half = match side {
            Side::N | Side::S => dx,
            Side::E | Side::W => dy,
        };
        let m = half - half / count as f64;
        let port_width = 2.0 * half / count as f64;
        for n in 0..count {
            let along = if count == 1 {
                0.0
            } else {
                -m + 2.0 * m * n as f64 / (count - 1) as f64
            };
            let center = match side {
                Side::N => Point::new(along, dy),
                Side::S => Point::new(along, -dy),
                Side::E => Point::new(dx, along),
                Side::W => Point::new(-dx, along),
            };
            let name = format!("{}{}", side.prefix(), n + 1);
            cell.add_port(&name, &Port::new(&name, center, port_width, side.orientation()));
        }
    }
    Arc::new(cell)
}

/// A geometry-free cell carrying two coincident, opposed ports: `1` facing
/// `orientation` and `2` facing the other way. Used as a routing anchor.
pub fn connector(center: Point, width: f64, orientation: f64) -> Arc<Cell> {
    let mut cell = Cell::new("connector");
    cell.add_port("1", &Port::new("1", center, width, orientation));
    cell.add_port("2", &Port::new("2", center, width, orientation - 180.0));
    Arc::new(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_ports() {
        let s = straight(0.18, 0.32, 8);
        let p1 = s.port("1").unwrap();
        let p2 = s.port("2").unwrap();
        assert_relative_eq!(p1.center.x, 0.09);
        assert_relative_eq!(p1.orientation, 270.0);
        assert_relative_eq!(p2.center.y, 0.32);
        assert_relative_eq!(p2.width, 0.18);
        let bb = s.bbox().unwrap();
        assert_relative_eq!(bb.width(), 0.18);
        assert_relative_eq!(bb.height(), 0.32);
    }

    #[test]
    fn test_compass_multi_port_spacing() {
        let c = compass_multi(50.0, 100.0, &[(Side::N, 1), (Side::E, 5), (Side::W, 5)], 2);
        assert_eq!(c.ports.len(), 11);
        let n1 = c.port("N1").unwrap();
        assert_relative_eq!(n1.center.x, 0.0);
        assert_relative_eq!(n1.center.y, 50.0);
        assert_relative_eq!(n1.width, 50.0);
        let e1 = c.port("E1").unwrap();
        let e2 = c.port("E2").unwrap();
        let e5 = c.port("E5").unwrap();
        assert_relative_eq!(e1.center.y, -40.0);
        assert_relative_eq!(e5.center.y, 40.0);
        assert_relative_eq!(e2.center.y - e1.center.y, 20.0);
        assert_relative_eq!(e1.width, 20.0);
        assert_relative_eq!(c.port("W3").unwrap().orientation, 180.0);
    }

    #[test]
    fn test_connector_ports_are_opposed() {
        let c = connector(Point::new(1.0, 2.0), 1.92, 0.0);
        assert!(c.geometries.is_empty());
        let p1 = c.port("1").unwrap();
        let p2 = c.port("2").unwrap();
        assert_eq!(p1.center, p2.center);
        assert_relative_eq!(p1.orientation, 0.0);
        assert_relative_eq!(p2.orientation, 180.0);
    }
}
