use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::cell::Transform;
use crate::LayerId;

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_angle(degrees: f64) -> f64 {
    let a = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Cosine and sine of an angle in degrees. Multiples of 90° are exact.
pub fn cos_sin_deg(degrees: f64) -> (f64, f64) {
    let a = normalize_angle(degrees);
    let quarter = a / 90.0;
    if (quarter - quarter.round()).abs() < 1e-12 {
        match quarter.round() as i64 % 4 {
            0 => return (1.0, 0.0),
            1 => return (0.0, 1.0),
            2 => return (-1.0, 0.0),
            _ => return (0.0, -1.0),
        }
    }
    let rad = a.to_radians();
    (rad.cos(), rad.sin())
}

/// True when `degrees` is a whole multiple of 90.
pub fn is_manhattan_angle(degrees: f64) -> bool {
    let quarter = normalize_angle(degrees) / 90.0;
    (quarter - quarter.round()).abs() < 1e-12
}

/// A 2D point in layout coordinates (micrometers).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Rotate counterclockwise by `degrees` about `center`.
    pub fn rotate_about(&self, center: &Point, degrees: f64) -> Self {
        let (c, s) = cos_sin_deg(degrees);
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point::new(center.x + dx * c - dy * s, center.y + dx * s + dy * c)
    }

    /// Unit vector pointing along `degrees`.
    pub fn unit(degrees: f64) -> Self {
        let (c, s) = cos_sin_deg(degrees);
        Point::new(c, s)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Union of an iterator of boxes; `None` when empty.
    pub fn union_all(boxes: impl IntoIterator<Item = BBox>) -> Option<BBox> {
        boxes.into_iter().reduce(|acc, bb| acc.union(&bb))
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }
}

/// A rectangle defined by lower-left and upper-right corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub layer_id: LayerId,
    pub lower_left: Point,
    pub upper_right: Point,
}

impl Rect {
    pub fn new(layer_id: LayerId, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            layer_id,
            lower_left: Point::new(x1.min(x2), y1.min(y2)),
            upper_right: Point::new(x1.max(x2), y1.max(y2)),
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.lower_left, self.upper_right)
    }

    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(self.layer_id, self.bbox().corners().to_vec())
    }
}

/// A polygon: an open outer ring plus optional open hole rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub layer_id: LayerId,
    pub vertices: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(layer_id: LayerId, vertices: Vec<Point>) -> Self {
        Self {
            layer_id,
            vertices,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(layer_id: LayerId, vertices: Vec<Point>, holes: Vec<Vec<Point>>) -> Self {
        Self {
            layer_id,
            vertices,
            holes,
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Enclosed area, holes subtracted.
    pub fn area(&self) -> f64 {
        let outer = ring_area(&self.vertices).abs();
        let holes: f64 = self.holes.iter().map(|h| ring_area(h).abs()).sum();
        outer - holes
    }

    /// Convex and hole-free, in either winding.
    pub fn is_convex(&self) -> bool {
        if self.has_holes() || self.vertices.len() < 3 {
            return false;
        }
        let n = self.vertices.len();
        let mut sign = 0.0_f64;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross.abs() < 1e-12 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    fn map_points(&self, f: impl Fn(&Point) -> Point) -> Polygon {
        Polygon {
            layer_id: self.layer_id,
            vertices: self.vertices.iter().map(&f).collect(),
            holes: self
                .holes
                .iter()
                .map(|h| h.iter().map(&f).collect())
                .collect(),
        }
    }
}

/// Signed shoelace area of an open ring.
fn ring_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice / 2.0
}

/// A flush-ended wire defined by a centerline and width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub layer_id: LayerId,
    pub points: Vec<Point>,
    pub width: f64,
}

impl Path {
    pub fn new(layer_id: LayerId, points: Vec<Point>, width: f64) -> Self {
        Self {
            layer_id,
            points,
            width,
        }
    }

    /// One rectangle per segment. Segments are stretched by half the width at
    /// interior joints so corners are filled; the two path ends stay flush.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        let half_w = self.width / 2.0;
        let last = self.points.len().saturating_sub(2);
        self.points
            .windows(2)
            .enumerate()
            .filter_map(|(i, w)| {
                let (a, b) = (w[0], w[1]);
                let len = a.distance_to(&b);
                if len == 0.0 {
                    return None;
                }
                let dir = (b - a) * (1.0 / len);
                let normal = Point::new(-dir.y, dir.x) * half_w;
                let start = if i > 0 { a - dir * half_w } else { a };
                let end = if i < last { b + dir * half_w } else { b };
                Some(Polygon::new(
                    self.layer_id,
                    vec![start - normal, end - normal, end + normal, start + normal],
                ))
            })
            .collect()
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::union_all(self.to_polygons().iter().filter_map(|p| p.bbox()))
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }
}

/// A geometric primitive in the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeomPrimitive {
    Rect(Rect),
    Polygon(Polygon),
    Path(Path),
}

impl GeomPrimitive {
    pub fn bbox(&self) -> Option<BBox> {
        match self {
            GeomPrimitive::Rect(r) => Some(r.bbox()),
            GeomPrimitive::Polygon(p) => p.bbox(),
            GeomPrimitive::Path(p) => p.bbox(),
        }
    }

    pub fn layer_id(&self) -> LayerId {
        match self {
            GeomPrimitive::Rect(r) => r.layer_id,
            GeomPrimitive::Polygon(p) => p.layer_id,
            GeomPrimitive::Path(p) => p.layer_id,
        }
    }

    /// Apply a placement transform. Rectangles stay rectangles under
    /// Manhattan rotations and become polygons otherwise.
    pub fn transformed(&self, t: &Transform) -> GeomPrimitive {
        match self {
            GeomPrimitive::Rect(r) if is_manhattan_angle(t.rotation) => {
                let a = t.apply(&r.lower_left);
                let b = t.apply(&r.upper_right);
                GeomPrimitive::Rect(Rect::new(r.layer_id, a.x, a.y, b.x, b.y))
            }
            GeomPrimitive::Rect(r) => {
                GeomPrimitive::Polygon(r.to_polygon().map_points(|p| t.apply(p)))
            }
            GeomPrimitive::Polygon(p) => GeomPrimitive::Polygon(p.map_points(|q| t.apply(q))),
            GeomPrimitive::Path(p) => GeomPrimitive::Path(Path {
                layer_id: p.layer_id,
                points: p.points.iter().map(|q| t.apply(q)).collect(),
                width: p.width,
            }),
        }
    }

    /// Polygon form of the primitive (paths expand to one polygon per segment).
    pub fn to_polygons(&self) -> Vec<Polygon> {
        match self {
            GeomPrimitive::Rect(r) => vec![r.to_polygon()],
            GeomPrimitive::Polygon(p) => vec![p.clone()],
            GeomPrimitive::Path(p) => p.to_polygons(),
        }
    }
}

impl From<Rect> for GeomPrimitive {
    fn from(r: Rect) -> Self {
        GeomPrimitive::Rect(r)
    }
}

impl From<Polygon> for GeomPrimitive {
    fn from(p: Polygon) -> Self {
        GeomPrimitive::Polygon(p)
    }
}

impl From<Path> for GeomPrimitive {
    fn from(p: Path) -> Self {
        GeomPrimitive::Path(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_quarter_turns_are_exact() {
        assert_eq!(cos_sin_deg(90.0), (0.0, 1.0));
        assert_eq!(cos_sin_deg(-90.0), (0.0, -1.0));
        assert_eq!(cos_sin_deg(540.0), (-1.0, 0.0));
        let p = Point::new(2.0, 1.0).rotate_about(&Point::new(1.0, 1.0), 90.0);
        assert_eq!(p, Point::new(1.0, 2.0));
    }

    #[test]
    fn test_rect_area() {
        let r = Rect::new(0, 0.0, 0.0, 10.0, 5.0);
        assert!((r.area() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_polygon_area_subtracts_holes() {
        let outer = BBox::new(Point::new(0.0, 0.0), Point::new(4.0, 4.0));
        let inner = BBox::new(Point::new(1.0, 1.0), Point::new(2.0, 2.0));
        let poly = Polygon::with_holes(3, outer.corners().to_vec(), vec![inner.corners().to_vec()]);
        assert_relative_eq!(poly.area(), 15.0);
        assert!(!poly.is_convex());
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = BBox::new(Point::new(5.0, 5.0), Point::new(15.0, 15.0));
        let c = BBox::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_path_corners_filled() {
        let path = Path::new(
            2,
            vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0), Point::new(10.0, 10.0)],
            2.0,
        );
        let bb = path.bbox().unwrap();
        assert_relative_eq!(bb.min.x, -1.0);
        assert_relative_eq!(bb.min.y, 0.0);
        assert_relative_eq!(bb.max.x, 10.0);
        assert_relative_eq!(bb.max.y, 11.0);
        assert_relative_eq!(path.length(), 20.0);
    }

    #[test]
    fn test_rect_rotation_keeps_rect() {
        let r = GeomPrimitive::Rect(Rect::new(8, 0.0, 0.0, 2.0, 1.0));
        let t = Transform::default().rotated_about(90.0, Point::new(0.0, 0.0));
        match r.transformed(&t) {
            GeomPrimitive::Rect(r) => {
                assert_eq!(r.lower_left, Point::new(-1.0, 0.0));
                assert_eq!(r.upper_right, Point::new(0.0, 2.0));
            }
            other => panic!("expected a rectangle, got {:?}", other),
        }
        let t = Transform::default().rotated_about(45.0, Point::new(0.0, 0.0));
        assert!(matches!(r.transformed(&t), GeomPrimitive::Polygon(_)));
    }
}
