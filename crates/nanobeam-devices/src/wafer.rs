use std::sync::Arc;

use nanobeam_core::layer::GOLD;
use nanobeam_core::spatial::{SpatialEntry, SpatialIndex};
use nanobeam_core::{BBox, Cell, Label, LayerId, Point};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, ParameterError};
use crate::pads::generate_pads;
use crate::params::{positive, ArrayParameters, PadParameters};
use crate::sweep::Variant;

/// Row-major tiling grid for variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaferParameters {
    pub columns: usize,
    pub pitch_x: f64,
    pub pitch_y: f64,
    pub label_layer: LayerId,
    /// Gap between a tile's bottom edge and its label.
    pub label_offset: f64,
}

impl Default for WaferParameters {
    fn default() -> Self {
        Self {
            columns: 4,
            pitch_x: 800.0,
            pitch_y: 700.0,
            label_layer: GOLD,
            label_offset: 20.0,
        }
    }
}

impl WaferParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.columns == 0 {
            return Err(ParameterError::ZeroCount { field: "columns" });
        }
        positive("pitch_x", self.pitch_x)?;
        positive("pitch_y", self.pitch_y)
    }
}

/// Place one pad array per variant on the grid, lower-left corners on the
/// pitch, rows growing downward. Every tile is labelled with its variant
/// name. Tiles whose bounding boxes, labels included, touch are an error.
pub fn generate_wafer(
    variants: &[Variant],
    array: &ArrayParameters,
    pads: &PadParameters,
    wafer: &WaferParameters,
) -> Result<Arc<Cell>, DeviceError> {
    if variants.is_empty() {
        return Err(DeviceError::NoVariants);
    }
    wafer.validate()?;
    let columns = wafer.columns;

    let mut cell = Cell::new("wafer");
    let mut entries = Vec::with_capacity(variants.len());

    for (index, variant) in variants.iter().enumerate() {
        let tile = generate_pads(array, pads, &variant.parameters)?;
        let bbox = tile
            .bbox()
            .ok_or_else(|| DeviceError::EmptyCell(variant.name.clone()))?;

        let slot = Point::new(
            (index % columns) as f64 * wafer.pitch_x,
            -((index / columns) as f64) * wafer.pitch_y,
        );
        cell.add_ref(&tile).move_to(bbox.min, slot);

        let label_at = Point::new(slot.x, slot.y - wafer.label_offset);
        cell.add_label(Label::new(&variant.name, label_at, wafer.label_layer));
        let placed = BBox::new(slot, slot + (bbox.max - bbox.min)).union(&BBox::new(label_at, label_at));
        entries.push(SpatialEntry { index, bbox: placed });
        log::debug!("Tile {} '{}' at ({}, {})", index, variant.name, slot.x, slot.y);
    }

    let index = SpatialIndex::build(entries);
    if let Some(&(a, b)) = index.overlapping_pairs().first() {
        return Err(DeviceError::TileOverlap {
            first: variants[a].name.clone(),
            second: variants[b].name.clone(),
        });
    }

    log::info!(
        "Generated wafer with {} variants in {} columns",
        variants.len(),
        columns
    );
    Ok(Arc::new(cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DeviceParameters;
    use crate::sweep::{Sweep, SweepField};
    use approx::assert_relative_eq;

    fn variants(values: &[f64]) -> Vec<Variant> {
        Sweep::new(SweepField::DefectWidth, values.to_vec()).variants(&DeviceParameters::default())
    }

    #[test]
    fn test_grid_placement() {
        let wafer = WaferParameters {
            columns: 2,
            ..Default::default()
        };
        let cell = generate_wafer(
            &variants(&[0.5, 0.55, 0.6]),
            &ArrayParameters::default(),
            &PadParameters::default(),
            &wafer,
        )
        .unwrap();
        assert_eq!(cell.instance_count(), 3);
        assert_eq!(cell.labels.len(), 3);

        let third = cell.instances[2].bbox().unwrap();
        assert_relative_eq!(third.min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(third.min.y, -700.0, epsilon = 1e-9);
        let second = cell.instances[1].bbox().unwrap();
        assert_relative_eq!(second.min.x, 800.0, epsilon = 1e-9);

        assert_eq!(cell.labels[1].text, "defect_width=0.55");
        assert_relative_eq!(cell.labels[2].position.y, -720.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tight_pitch_overlaps() {
        let wafer = WaferParameters {
            pitch_x: 100.0,
            ..Default::default()
        };
        let result = generate_wafer(
            &variants(&[0.5, 0.6]),
            &ArrayParameters::default(),
            &PadParameters::default(),
            &wafer,
        );
        match result {
            Err(DeviceError::TileOverlap { first, second }) => {
                assert_eq!(first, "defect_width=0.5");
                assert_eq!(second, "defect_width=0.6");
            }
            other => panic!("expected overlap, got {:?}", other.map(|c| c.name.clone())),
        }
    }

    #[test]
    fn test_label_counts_toward_overlap() {
        // tiles are 515 tall: a 530 pitch leaves a 15 gap that the
        // upper tile's label, 20 below it, falls into
        let wafer = WaferParameters {
            columns: 1,
            pitch_y: 530.0,
            ..Default::default()
        };
        let result = generate_wafer(
            &variants(&[0.5, 0.6]),
            &ArrayParameters::default(),
            &PadParameters::default(),
            &wafer,
        );
        assert!(matches!(result, Err(DeviceError::TileOverlap { .. })));

        let wafer = WaferParameters {
            label_offset: 5.0,
            ..wafer
        };
        assert!(generate_wafer(
            &variants(&[0.5, 0.6]),
            &ArrayParameters::default(),
            &PadParameters::default(),
            &wafer,
        )
        .is_ok());
    }

    #[test]
    fn test_zero_columns_rejected() {
        let wafer = WaferParameters {
            columns: 0,
            ..Default::default()
        };
        assert!(matches!(
            generate_wafer(
                &variants(&[0.5]),
                &ArrayParameters::default(),
                &PadParameters::default(),
                &wafer
            ),
            Err(DeviceError::Parameter(ParameterError::ZeroCount { field: "columns" }))
        ));
        let flat = WaferParameters {
            pitch_y: 0.0,
            ..Default::default()
        };
        assert_eq!(
            flat.validate(),
            Err(ParameterError::NonPositive {
                field: "pitch_y",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_no_variants() {
        assert!(matches!(
            generate_wafer(
                &[],
                &ArrayParameters::default(),
                &PadParameters::default(),
                &WaferParameters::default()
            ),
            Err(DeviceError::NoVariants)
        ));
    }
}
