use nanobeam_core::layer::{FillPattern, LayerStack};
use nanobeam_core::{Cell, LayerId, Point, Transform};
use serde::{Deserialize, Serialize};

use crate::svg::RenderError;
use crate::Viewport;

/// Render data for a single layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderLayer {
    pub layer_id: LayerId,
    pub name: String,
    pub color: [f32; 4], // RGBA
    pub fill_pattern: FillPattern,
    pub polygons: Vec<RenderPolygon>,
}

/// A polygon in layout coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderPolygon {
    /// Flat array of vertices: [x0, y0, x1, y1, ...]
    pub vertices: Vec<f64>,
    /// Hole rings in the same flat form.
    pub holes: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderLabel {
    pub text: String,
    pub position: Point,
    pub layer_id: LayerId,
}

/// A port marker: center, outward direction and edge width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderPort {
    pub name: String,
    pub center: Point,
    pub orientation: f64,
    pub width: f64,
    /// Nesting depth; 0 for the ports of the rendered cell itself.
    pub depth: usize,
}

/// Everything needed to draw one cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderFrame {
    pub title: String,
    pub layers: Vec<RenderLayer>,
    pub labels: Vec<RenderLabel>,
    pub ports: Vec<RenderPort>,
    pub viewport: Viewport,
    pub bbox: [f64; 4], // [min_x, min_y, max_x, max_y]
}

fn flat(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

impl RenderFrame {
    /// Flatten `cell` into per-layer polygons, in layer-stack order, with
    /// unknown layers appended in id order. With `show_ports`, ports of every
    /// placed subcell are included, not just the top cell's.
    pub fn from_cell(
        cell: &Cell,
        stack: &LayerStack,
        show_ports: bool,
        canvas: (f64, f64),
    ) -> Result<Self, RenderError> {
        let bbox = cell
            .bbox()
            .ok_or_else(|| RenderError::EmptyCell(cell.name.clone()))?;

        let mut layers: Vec<RenderLayer> = stack
            .all_layers()
            .iter()
            .map(|l| RenderLayer {
                layer_id: l.id,
                name: l.name.clone(),
                color: [
                    l.color.r as f32 / 255.0,
                    l.color.g as f32 / 255.0,
                    l.color.b as f32 / 255.0,
                    l.opacity,
                ],
                fill_pattern: l.fill_pattern,
                polygons: Vec::new(),
            })
            .collect();

        for geom in cell.flatten() {
            let layer_id = geom.layer_id();
            let index = match layers.iter().position(|l| l.layer_id == layer_id) {
                Some(i) => i,
                None => {
                    layers.push(RenderLayer {
                        layer_id,
                        name: format!("layer_{}", layer_id),
                        color: [0.5, 0.5, 0.5, 0.7],
                        fill_pattern: FillPattern::Solid,
                        polygons: Vec::new(),
                    });
                    layers.len() - 1
                }
            };
            layers[index]
                .polygons
                .extend(geom.to_polygons().iter().map(|p| RenderPolygon {
                    vertices: flat(&p.vertices),
                    holes: p.holes.iter().map(|h| flat(h)).collect(),
                }));
        }
        let known = stack.layer_count();
        layers[known..].sort_by_key(|l| l.layer_id);
        layers.retain(|l| !l.polygons.is_empty());

        let mut frame = Self {
            title: cell.name.clone(),
            layers,
            labels: Vec::new(),
            ports: Vec::new(),
            viewport: Viewport::new(canvas.0, canvas.1),
            bbox: [bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y],
        };
        frame.viewport.fit_bbox(&bbox);
        frame.collect(cell, &Transform::default(), 0, show_ports);

        log::debug!(
            "Render frame for '{}': {} layers, {} polygons, {} ports",
            frame.title,
            frame.layers.len(),
            frame.polygon_count(),
            frame.ports.len()
        );
        Ok(frame)
    }

    fn collect(&mut self, cell: &Cell, t: &Transform, depth: usize, show_ports: bool) {
        self.labels.extend(cell.labels.iter().map(|l| RenderLabel {
            text: l.text.clone(),
            position: t.apply(&l.position),
            layer_id: l.layer_id,
        }));
        if depth == 0 || show_ports {
            self.ports.extend(cell.ports.iter().map(|p| {
                let p = p.transformed(t);
                RenderPort {
                    name: p.name,
                    center: p.center,
                    orientation: p.orientation,
                    width: p.width,
                    depth,
                }
            }));
        }
        for inst in &cell.instances {
            let inner = inst.transform.then(t);
            self.collect(&inst.cell, &inner, depth + 1, show_ports);
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.layers.iter().map(|l| l.polygons.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
