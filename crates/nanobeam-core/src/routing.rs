//! Port-to-port connections.

use std::sync::Arc;

use crate::cell::{Cell, Port};
use crate::error::LayoutError;
use crate::geometry::{is_manhattan_angle, Path, Point, Polygon};
use crate::LayerId;

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Remove interior points that do not change the wire direction.
fn drop_collinear(points: Vec<Point>) -> Vec<Point> {
    if points.len() < 3 {
        return points;
    }
    let mut out = vec![points[0]];
    for i in 1..points.len() - 1 {
        let a = out[out.len() - 1];
        let (b, c) = (points[i], points[i + 1]);
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() > 1e-12 {
            out.push(b);
        }
    }
    out.push(points[points.len() - 1]);
    out
}

/// A straight quadrilateral joining the edges of two ports. `width1` and
/// `width2` override the port widths at either end.
pub fn route_quad(
    port1: &Port,
    port2: &Port,
    width1: Option<f64>,
    width2: Option<f64>,
    layer: LayerId,
) -> Result<Arc<Cell>, LayoutError> {
    let [a, b] = port1.edge_points_with_width(width1.unwrap_or(port1.width));
    let [c, d] = port2.edge_points_with_width(width2.unwrap_or(port2.width));
    let mut vertices = vec![a, b, c, d];

    let centroid = vertices.iter().fold(Point::default(), |acc, p| acc + *p) * 0.25;
    vertices.sort_by(|p, q| {
        let ap = (p.y - centroid.y).atan2(p.x - centroid.x);
        let aq = (q.y - centroid.y).atan2(q.x - centroid.x);
        ap.total_cmp(&aq)
    });

    let quad = Polygon::new(layer, vertices);
    if quad.area() < 1e-12 {
        return Err(LayoutError::Degenerate(format!(
            "route_quad between '{}' and '{}' has no area",
            port1.name, port2.name
        )));
    }

    let mut cell = Cell::new("route_quad");
    cell.add_geometry(quad);
    cell.add_port("1", port1);
    cell.add_port("2", port2);
    Ok(Arc::new(cell))
}

/// Sharp-cornered Manhattan wire between two ports. Ports facing the same
/// way get a U that clears the further port by one width; facing ports get
/// a straight run or a Z with its jog halfway; perpendicular ports get an L.
pub fn route_sharp(
    port1: &Port,
    port2: &Port,
    width: Option<f64>,
    layer: LayerId,
) -> Result<Arc<Cell>, LayoutError> {
    let unroutable = |reason: &str| LayoutError::Unroutable {
        from: port1.name.clone(),
        to: port2.name.clone(),
        reason: reason.to_string(),
    };
    if !is_manhattan_angle(port1.orientation) || !is_manhattan_angle(port2.orientation) {
        return Err(unroutable("port orientations must be multiples of 90 degrees"));
    }

    let width = width.unwrap_or(port1.width.max(port2.width));
    let (p1, p2) = (port1.center, port2.center);
    let (n1, n2) = (port1.normal(), port2.normal());
    let alignment = dot(n1, n2);

    let points = if alignment > 0.5 {
        let level = dot(p1, n1).max(dot(p2, n1)) + width;
        vec![
            p1,
            p1 + n1 * (level - dot(p1, n1)),
            p2 + n1 * (level - dot(p2, n1)),
            p2,
        ]
    } else if alignment < -0.5 {
        let gap = dot(p2 - p1, n1);
        if gap <= 0.0 {
            return Err(unroutable("ports face away from each other"));
        }
        let mid = (dot(p1, n1) + dot(p2, n1)) / 2.0;
        vec![
            p1,
            p1 + n1 * (mid - dot(p1, n1)),
            p2 + n1 * (mid - dot(p2, n1)),
            p2,
        ]
    } else {
        let reach1 = dot(p2 - p1, n1);
        let reach2 = dot(p1 - p2, n2);
        if reach1 <= 0.0 || reach2 <= 0.0 {
            return Err(unroutable("no L route leaves both ports forward"));
        }
        vec![p1, p1 + n1 * reach1, p2]
    };

    let mut corners: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if corners.last().map_or(true, |q| q.distance_to(&p) > 1e-12) {
            corners.push(p);
        }
    }
    corners = drop_collinear(corners);

    let mut cell = Cell::new("route_sharp");
    cell.add_geometry(Path::new(layer, corners, width));
    cell.add_port("1", port1);
    cell.add_port("2", port2);
    Ok(Arc::new(cell))
}
