use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LayoutError;
use crate::geometry::{cos_sin_deg, normalize_angle, BBox, GeomPrimitive, Point};
use crate::LayerId;

/// Unique cell identifier.
pub type CellId = Uuid;

/// A rigid placement: rotate counterclockwise about the origin, then translate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Translation offset.
    pub offset: Point,
    /// Rotation in degrees, normalized to `[0, 360)`.
    pub rotation: f64,
}

impl Transform {
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            offset: Point::new(x, y),
            ..Default::default()
        }
    }

    pub fn apply(&self, point: &Point) -> Point {
        let (c, s) = cos_sin_deg(self.rotation);
        Point::new(
            point.x * c - point.y * s + self.offset.x,
            point.x * s + point.y * c + self.offset.y,
        )
    }

    /// Map a direction angle through the rotation.
    pub fn apply_angle(&self, degrees: f64) -> f64 {
        normalize_angle(degrees + self.rotation)
    }

    /// This transform followed by a rotation of `angle` about `center`.
    pub fn rotated_about(&self, angle: f64, center: Point) -> Self {
        Self {
            offset: self.offset.rotate_about(&center, angle),
            rotation: normalize_angle(self.rotation + angle),
        }
    }

    /// This transform followed by a translation.
    pub fn translated(&self, delta: Point) -> Self {
        Self {
            offset: self.offset + delta,
            rotation: self.rotation,
        }
    }

    /// This transform followed by `outer`.
    pub fn then(&self, outer: &Transform) -> Self {
        Self {
            offset: outer.apply(&self.offset),
            rotation: normalize_angle(self.rotation + outer.rotation),
        }
    }
}

/// A named, oriented attachment point. `orientation` is the outward-facing
/// direction in degrees; `width` is the extent of the port edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub center: Point,
    pub width: f64,
    pub orientation: f64,
}

impl Port {
    pub fn new(name: &str, center: Point, width: f64, orientation: f64) -> Self {
        Self {
            name: name.to_string(),
            center,
            width,
            orientation: normalize_angle(orientation),
        }
    }

    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            name: self.name.clone(),
            center: t.apply(&self.center),
            width: self.width,
            orientation: t.apply_angle(self.orientation),
        }
    }

    /// Unit vector pointing out of the port.
    pub fn normal(&self) -> Point {
        Point::unit(self.orientation)
    }

    /// The two endpoints of the port edge, `width` apart.
    pub fn edge_points_with_width(&self, width: f64) -> [Point; 2] {
        let tangent = Point::unit(self.orientation + 90.0) * (width / 2.0);
        [self.center + tangent, self.center - tangent]
    }
}

/// A text annotation, written to GDS as a TEXT element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    pub position: Point,
    pub layer_id: LayerId,
}

impl Label {
    pub fn new(text: &str, position: Point, layer_id: LayerId) -> Self {
        Self {
            text: text.to_string(),
            position,
            layer_id,
        }
    }
}

/// Direction used by [`Cell::distribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// A placed reference to another cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellInstance {
    pub id: Uuid,
    pub cell: Arc<Cell>,
    pub transform: Transform,
}

impl CellInstance {
    pub fn new(cell: Arc<Cell>) -> Self {
        Self {
            id: Uuid::new_v4(),
            cell,
            transform: Transform::default(),
        }
    }

    /// The named port of the referenced cell, in the parent's frame.
    pub fn port(&self, name: &str) -> Result<Port, LayoutError> {
        Ok(self.cell.port(name)?.transformed(&self.transform))
    }

    pub fn ports(&self) -> Vec<Port> {
        self.cell
            .ports
            .iter()
            .map(|p| p.transformed(&self.transform))
            .collect()
    }

    pub fn rotate(&mut self, angle: f64, center: Point) -> &mut Self {
        self.transform = self.transform.rotated_about(angle, center);
        self
    }

    pub fn move_by(&mut self, delta: Point) -> &mut Self {
        self.transform = self.transform.translated(delta);
        self
    }

    /// Translate so that `from` lands on `to`.
    pub fn move_to(&mut self, from: Point, to: Point) -> &mut Self {
        self.move_by(to - from)
    }

    /// Rotate and move this instance so its `port` faces `destination`,
    /// then back it off by `overlap` along the destination's orientation
    /// (a positive overlap pushes the instance into the destination).
    pub fn connect(
        &mut self,
        port: &str,
        destination: &Port,
        overlap: f64,
    ) -> Result<&mut Self, LayoutError> {
        let p = self.port(port)?;
        self.rotate(180.0 + destination.orientation - p.orientation, p.center);
        let p = self.port(port)?;
        self.move_to(p.center, destination.center);
        self.move_by(-(destination.normal() * overlap));
        Ok(self)
    }

    /// All geometry of the referenced cell, in the parent's frame.
    pub fn flatten(&self) -> Vec<GeomPrimitive> {
        self.cell
            .flatten()
            .iter()
            .map(|g| g.transformed(&self.transform))
            .collect()
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::union_all(self.flatten().iter().filter_map(|g| g.bbox()))
    }

    pub fn center(&self) -> Option<Point> {
        self.bbox().map(|bb| bb.center())
    }
}

/// A layout cell containing geometric primitives, subcell references,
/// ports and labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub name: String,
    pub geometries: Vec<GeomPrimitive>,
    pub instances: Vec<CellInstance>,
    pub ports: Vec<Port>,
    pub labels: Vec<Label>,
}

impl Cell {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            geometries: Vec::new(),
            instances: Vec::new(),
            ports: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn add_geometry(&mut self, geom: impl Into<GeomPrimitive>) {
        self.geometries.push(geom.into());
    }

    pub fn add_geometries(&mut self, geoms: impl IntoIterator<Item = GeomPrimitive>) {
        self.geometries.extend(geoms);
    }

    /// Place `cell` at the origin and return the new instance for positioning.
    pub fn add_ref(&mut self, cell: &Arc<Cell>) -> &mut CellInstance {
        self.instances.push(CellInstance::new(Arc::clone(cell)));
        let last = self.instances.len() - 1;
        &mut self.instances[last]
    }

    pub fn remove_instance(&mut self, id: Uuid) -> Option<CellInstance> {
        let index = self.instances.iter().position(|i| i.id == id)?;
        Some(self.instances.remove(index))
    }

    /// Expose `port` under `name`, replacing any port already using that name.
    pub fn add_port(&mut self, name: &str, port: &Port) {
        let mut port = port.clone();
        port.name = name.to_string();
        self.ports.retain(|p| p.name != name);
        self.ports.push(port);
    }

    pub fn port(&self, name: &str) -> Result<&Port, LayoutError> {
        self.ports
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| LayoutError::MissingPort {
                cell: self.name.clone(),
                port: name.to_string(),
            })
    }

    pub fn add_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Compute the bounding box of all geometry in this cell (not including subcells).
    pub fn local_bbox(&self) -> Option<BBox> {
        BBox::union_all(self.geometries.iter().filter_map(|g| g.bbox()))
    }

    /// Bounding box of this cell including every placed subcell.
    pub fn bbox(&self) -> Option<BBox> {
        let local = self.local_bbox();
        let children = self.instances.iter().filter_map(|i| i.bbox());
        BBox::union_all(local.into_iter().chain(children))
    }

    /// All geometry of the hierarchy, expressed in this cell's frame.
    pub fn flatten(&self) -> Vec<GeomPrimitive> {
        let mut out = self.geometries.clone();
        for inst in &self.instances {
            out.extend(inst.flatten());
        }
        out
    }

    pub fn flatten_on_layer(&self, layer_id: LayerId) -> Vec<GeomPrimitive> {
        self.flatten()
            .into_iter()
            .filter(|g| g.layer_id() == layer_id)
            .collect()
    }

    /// Line up the instances, in insertion order, along `axis` so that each
    /// one starts `spacing` after the previous one ends. The first instance
    /// stays where it is; instances without geometry are skipped.
    pub fn distribute(&mut self, spacing: f64, axis: Axis) {
        let mut prev_max: Option<f64> = None;
        for inst in &mut self.instances {
            let Some(bb) = inst.bbox() else { continue };
            let (lo, hi) = match axis {
                Axis::X => (bb.min.x, bb.max.x),
                Axis::Y => (bb.min.y, bb.max.y),
            };
            let shift = match prev_max {
                Some(edge) => edge + spacing - lo,
                None => 0.0,
            };
            match axis {
                Axis::X => inst.move_by(Point::new(shift, 0.0)),
                Axis::Y => inst.move_by(Point::new(0.0, shift)),
            };
            prev_max = Some(hi + shift);
        }
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use approx::assert_relative_eq;

    fn bar() -> Arc<Cell> {
        let mut cell = Cell::new("bar");
        cell.add_geometry(Rect::new(0, 0.0, 0.0, 2.0, 10.0));
        cell.add_port("1", &Port::new("1", Point::new(1.0, 0.0), 2.0, 270.0));
        cell.add_port("2", &Port::new("2", Point::new(1.0, 10.0), 2.0, 90.0));
        Arc::new(cell)
    }

    #[test]
    fn test_cell_add_geometry() {
        let mut cell = Cell::new("test_cell");
        cell.add_geometry(Rect::new(0, 0.0, 0.0, 100.0, 50.0));
        assert_eq!(cell.geometry_count(), 1);
    }

    #[test]
    fn test_cell_bbox() {
        let mut cell = Cell::new("test_cell");
        cell.add_geometry(Rect::new(0, 0.0, 0.0, 100.0, 50.0));
        cell.add_geometry(Rect::new(1, 50.0, 25.0, 200.0, 75.0));
        let bb = cell.local_bbox().unwrap();
        assert!((bb.min.x - 0.0).abs() < 1e-10);
        assert!((bb.min.y - 0.0).abs() < 1e-10);
        assert!((bb.max.x - 200.0).abs() < 1e-10);
        assert!((bb.max.y - 75.0).abs() < 1e-10);
    }

    #[test]
    fn test_transform_translate() {
        let t = Transform::translate(10.0, 20.0);
        let p = Point::new(5.0, 5.0);
        let result = t.apply(&p);
        assert!((result.x - 15.0).abs() < 1e-10);
        assert!((result.y - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_transform_composition() {
        let inner = Transform::translate(1.0, 0.0).rotated_about(90.0, Point::new(0.0, 0.0));
        let outer = Transform::translate(5.0, 5.0);
        let p = Point::new(1.0, 0.0);
        assert_eq!(inner.then(&outer).apply(&p), outer.apply(&inner.apply(&p)));
    }

    #[test]
    fn test_connect_chains_ports() {
        let bar = bar();
        let mut parent = Cell::new("chain");
        let first = parent.add_ref(&bar).port("2").unwrap();
        let second = parent.add_ref(&bar);
        second.connect("1", &first, 0.0).unwrap();
        let end = second.port("2").unwrap();
        assert_relative_eq!(end.center.x, 1.0);
        assert_relative_eq!(end.center.y, 20.0);
        assert_relative_eq!(end.orientation, 90.0);
        let bb = parent.bbox().unwrap();
        assert_relative_eq!(bb.height(), 20.0);
    }

    #[test]
    fn test_connect_with_overlap_and_rotation() {
        let bar = bar();
        let dest = Port::new("d", Point::new(0.0, 0.0), 2.0, 180.0);
        let mut parent = Cell::new("p");
        let inst = parent.add_ref(&bar);
        inst.connect("1", &dest, 1.5).unwrap();
        // port 1 now faces east and sits 1.5 east of the destination
        let p = inst.port("1").unwrap();
        assert_relative_eq!(p.orientation, 0.0);
        assert_relative_eq!(p.center.x, 1.5);
        assert_relative_eq!(p.center.y, 0.0);
        let far = inst.port("2").unwrap();
        assert_relative_eq!(far.center.x, -8.5);
    }

    #[test]
    fn test_missing_port_is_reported() {
        let bar = bar();
        let err = bar.port("E").unwrap_err();
        assert_eq!(
            err,
            LayoutError::MissingPort {
                cell: "bar".into(),
                port: "E".into()
            }
        );
    }

    #[test]
    fn test_distribute_spacing() {
        let bar = bar();
        let mut row = Cell::new("row");
        for _ in 0..3 {
            row.add_ref(&bar);
        }
        row.distribute(5.0, Axis::X);
        let xs: Vec<f64> = row
            .instances
            .iter()
            .map(|i| i.bbox().unwrap().min.x)
            .collect();
        assert_eq!(xs, vec![0.0, 7.0, 14.0]);
    }

    #[test]
    fn test_remove_instance() {
        let bar = bar();
        let mut parent = Cell::new("p");
        let id = parent.add_ref(&bar).id;
        parent.add_ref(&bar);
        assert!(parent.remove_instance(id).is_some());
        assert_eq!(parent.instance_count(), 1);
        assert!(parent.remove_instance(id).is_none());
    }
}
