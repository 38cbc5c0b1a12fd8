//! Polygon set operations, delegated to `geo`.

use geo::{BooleanOps, ConvexHull, LineString, MultiPoint, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::geometry::{BBox, GeomPrimitive, Point, Polygon};
use crate::LayerId;

type GeoPolygon = geo::Polygon<f64>;

/// Set operation applied by [`boolean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOp {
    Or,
    And,
    /// `A` minus `B`.
    Not,
    Xor,
}

fn ring(points: &[Point]) -> LineString<f64> {
    LineString::from(points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>())
}

fn to_geo(polygon: &Polygon) -> GeoPolygon {
    GeoPolygon::new(
        ring(&polygon.vertices),
        polygon.holes.iter().map(|h| ring(h)).collect(),
    )
}

fn open_ring(line: &LineString<f64>) -> Vec<Point> {
    let mut points: Vec<Point> = line.coords().map(|c| Point::new(c.x, c.y)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn from_geo(multi: &MultiPolygon<f64>, layer: LayerId) -> Vec<Polygon> {
    multi
        .iter()
        .map(|p| {
            Polygon::with_holes(
                layer,
                open_ring(p.exterior()),
                p.interiors()
                    .iter()
                    .map(open_ring)
                    .filter(|h| h.len() >= 3)
                    .collect(),
            )
        })
        .filter(|p| p.vertices.len() >= 3 && p.area() > 1e-12)
        .collect()
}

fn merge(polygons: impl IntoIterator<Item = GeoPolygon>) -> MultiPolygon<f64> {
    polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, p| {
            acc.union(&MultiPolygon::new(vec![p]))
        })
}

fn to_multi(shapes: &[GeomPrimitive]) -> MultiPolygon<f64> {
    merge(
        shapes
            .iter()
            .flat_map(|s| s.to_polygons())
            .map(|p| to_geo(&p)),
    )
}

/// Combine two groups of shapes; the result lands on `layer`.
pub fn boolean(
    a: &[GeomPrimitive],
    b: &[GeomPrimitive],
    op: BooleanOp,
    layer: LayerId,
) -> Vec<Polygon> {
    let (a, b) = (to_multi(a), to_multi(b));
    let result = match op {
        BooleanOp::Or => a.union(&b),
        BooleanOp::And => a.intersection(&b),
        BooleanOp::Not => a.difference(&b),
        BooleanOp::Xor => a.xor(&b),
    };
    from_geo(&result, layer)
}

/// Grow every shape outward by `distance` with square (miter) corners and
/// merge the results. Each input piece must be convex: it is swept by a
/// `2·distance` square, which is exact for convex pieces.
pub fn offset(
    shapes: &[GeomPrimitive],
    distance: f64,
    layer: LayerId,
) -> Result<Vec<Polygon>, LayoutError> {
    if distance < 0.0 {
        return Err(LayoutError::Offset(format!(
            "negative distance {} is not supported",
            distance
        )));
    }

    let mut grown = Vec::new();
    for polygon in shapes.iter().flat_map(|s| s.to_polygons()) {
        if !polygon.is_convex() {
            return Err(LayoutError::Offset(format!(
                "polygon with {} vertices on layer {} is not convex",
                polygon.vertex_count(),
                polygon.layer_id
            )));
        }
        let swept: Vec<(f64, f64)> = polygon
            .vertices
            .iter()
            .flat_map(|v| {
                [
                    (v.x - distance, v.y - distance),
                    (v.x + distance, v.y - distance),
                    (v.x + distance, v.y + distance),
                    (v.x - distance, v.y + distance),
                ]
            })
            .collect();
        grown.push(MultiPoint::from(swept).convex_hull());
    }
    Ok(from_geo(&merge(grown), layer))
}

/// A band of width `distance` hugging the outside of `shapes`.
pub fn outline(
    shapes: &[GeomPrimitive],
    distance: f64,
    layer: LayerId,
) -> Result<Vec<Polygon>, LayoutError> {
    let grown: Vec<GeomPrimitive> = offset(shapes, distance, layer)?
        .into_iter()
        .map(GeomPrimitive::Polygon)
        .collect();
    Ok(boolean(&grown, shapes, BooleanOp::Not, layer))
}

/// Split a polygon with holes into hole-free pieces by cutting vertical
/// slabs at every hole vertex.
pub fn fracture(polygon: &Polygon) -> Vec<Polygon> {
    if !polygon.has_holes() {
        return vec![polygon.clone()];
    }
    let Some(bb) = polygon.bbox() else {
        return Vec::new();
    };

    let mut cuts: Vec<f64> = polygon
        .holes
        .iter()
        .flatten()
        .map(|p| p.x)
        .filter(|x| *x > bb.min.x && *x < bb.max.x)
        .collect();
    cuts.push(bb.min.x);
    cuts.push(bb.max.x);
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

    let source = MultiPolygon::new(vec![to_geo(polygon)]);
    let mut pieces = Vec::new();
    for pair in cuts.windows(2) {
        let slab = BBox::new(
            Point::new(pair[0], bb.min.y - 1.0),
            Point::new(pair[1], bb.max.y + 1.0),
        );
        let slab = MultiPolygon::new(vec![to_geo(&Polygon::new(
            polygon.layer_id,
            slab.corners().to_vec(),
        ))]);
        pieces.extend(from_geo(&source.intersection(&slab), polygon.layer_id));
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use approx::assert_relative_eq;

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> GeomPrimitive {
        GeomPrimitive::Rect(Rect::new(8, x1, y1, x2, y2))
    }

    fn total_area(polys: &[Polygon]) -> f64 {
        polys.iter().map(|p| p.area()).sum()
    }

    #[test]
    fn test_union_of_touching_rects() {
        let out = boolean(&[rect(0.0, 0.0, 1.0, 1.0)], &[rect(1.0, 0.0, 3.0, 1.0)], BooleanOp::Or, 8);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(total_area(&out), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_not_punches_hole() {
        let out = boolean(&[rect(0.0, 0.0, 4.0, 4.0)], &[rect(1.0, 1.0, 3.0, 3.0)], BooleanOp::Not, 3);
        assert_eq!(out.len(), 1);
        assert!(out[0].has_holes());
        assert_eq!(out[0].layer_id, 3);
        assert_relative_eq!(total_area(&out), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_and_and_xor() {
        let a = [rect(0.0, 0.0, 2.0, 2.0)];
        let b = [rect(1.0, 1.0, 3.0, 3.0)];
        assert_relative_eq!(total_area(&boolean(&a, &b, BooleanOp::And, 1)), 1.0, epsilon = 1e-9);
        assert_relative_eq!(total_area(&boolean(&a, &b, BooleanOp::Xor, 1)), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_outline_of_rect() {
        let out = outline(&[rect(0.0, 0.0, 2.0, 1.0)], 0.5, 3).unwrap();
        // (2 + 1)(1 + 1) - 2
        assert_relative_eq!(total_area(&out), 4.0, epsilon = 1e-9);
        let bb = BBox::union_all(out.iter().filter_map(|p| p.bbox())).unwrap();
        assert_relative_eq!(bb.min.x, -0.5, epsilon = 1e-9);
        assert_relative_eq!(bb.max.y, 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_offset_rejects_bad_input() {
        assert!(offset(&[rect(0.0, 0.0, 1.0, 1.0)], -0.1, 3).is_err());
        let l_shape = GeomPrimitive::Polygon(Polygon::new(
            3,
            vec![
                Point::new(0.0, 0.0),
                Point::new(2.0, 0.0),
                Point::new(2.0, 1.0),
                Point::new(1.0, 1.0),
                Point::new(1.0, 2.0),
                Point::new(0.0, 2.0),
            ],
        ));
        assert!(matches!(offset(&[l_shape], 0.1, 3), Err(LayoutError::Offset(_))));
    }

    #[test]
    fn test_fracture_removes_holes() {
        let ring = boolean(&[rect(0.0, 0.0, 4.0, 4.0)], &[rect(1.0, 1.0, 3.0, 3.0)], BooleanOp::Not, 3);
        let pieces = fracture(&ring[0]);
        assert!(pieces.len() >= 3);
        assert!(pieces.iter().all(|p| !p.has_holes()));
        assert_relative_eq!(total_area(&pieces), 12.0, epsilon = 1e-9);
    }
}
