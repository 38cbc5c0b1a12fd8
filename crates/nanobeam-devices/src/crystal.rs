use std::sync::Arc;

use nanobeam_core::boolean::{boolean, outline, BooleanOp};
use nanobeam_core::primitives::straight;
use nanobeam_core::{Cell, GeomPrimitive, Point};

use crate::error::DeviceError;
use crate::params::CrystalParameters;

/// Build the nanobeam: `bridge, (crystal, bridge) × n` along +x from the
/// origin, with the middle crystal swapped for the defect. Port `1` faces
/// west at x = 0, port `2` faces east at the far end.
pub fn generate_photonic_crystal(params: &CrystalParameters) -> Result<Arc<Cell>, DeviceError> {
    params.validate()?;

    let layer = params.crystal_layer;
    let bridge = straight(params.bridge_width, params.bridge_length, layer);
    let crystal = straight(params.crystal_height, params.crystal_width, layer);
    let defect = if params.off_defect {
        Arc::clone(&crystal)
    } else {
        straight(params.defect_height, params.defect_width, layer)
    };

    let mut cell = Cell::new("photonic_crystal");
    let origin = cell.add_ref(&bridge);
    origin
        .rotate(-90.0, Point::default())
        .move_by(Point::new(0.0, params.bridge_width / 2.0));
    let first = origin.port("1")?;
    let mut prev = origin.port("2")?;
    cell.add_port("1", &first);

    for i in 0..params.crystal_count * 2 {
        let segment = if i % 2 == 1 {
            &bridge
        } else if i == params.crystal_count - 1 {
            &defect
        } else {
            &crystal
        };
        let next = cell.add_ref(segment);
        next.connect("1", &prev, 0.0)?;
        prev = next.port("2")?;
    }
    cell.add_port("2", &prev);

    if !params.unetched {
        let beam = cell.flatten();
        let mut etch = outline(&beam, params.outline_width, params.outline_layer)?;

        // uncover both beam ends so the electrodes can reach the crystal
        let uncover = straight(
            params.crystal_height + params.outline_width,
            params.outline_width,
            params.outline_layer,
        );
        for name in ["1", "2"] {
            let end = cell.port(name)?.clone();
            let cap = cell.add_ref(&uncover);
            let cap_id = cap.id;
            cap.connect("1", &end, 0.0)?;
            let cap_shapes = cap.flatten();
            cell.remove_instance(cap_id);

            let current: Vec<GeomPrimitive> = etch.into_iter().map(GeomPrimitive::Polygon).collect();
            etch = boolean(&current, &cap_shapes, BooleanOp::Not, params.outline_layer);
        }

        let mut outline_cell = Cell::new("outline");
        outline_cell.add_geometries(etch.into_iter().map(GeomPrimitive::Polygon));
        cell.add_ref(&Arc::new(outline_cell));
    }

    log::debug!(
        "Photonic crystal: {} periods, length {:.4} µm{}{}",
        params.crystal_count,
        params.total_length(),
        if params.off_defect { ", no defect" } else { "" },
        if params.unetched { ", unetched" } else { "" }
    );
    Ok(Arc::new(cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nanobeam_core::layer::{CRYSTAL_BLANK, REMOVED_GAAS};

    fn area_on(cell: &Cell, layer: u32) -> f64 {
        cell.flatten_on_layer(layer)
            .iter()
            .flat_map(|g| g.to_polygons())
            .map(|p| p.area())
            .sum()
    }

    #[test]
    fn test_chain_spans_total_length() {
        let params = CrystalParameters::default();
        let cell = generate_photonic_crystal(&params).unwrap();

        let p1 = cell.port("1").unwrap();
        let p2 = cell.port("2").unwrap();
        assert_relative_eq!(p1.center.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p1.center.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p1.orientation, 180.0);
        assert_relative_eq!(p2.center.x, params.total_length(), epsilon = 1e-9);
        assert_relative_eq!(p2.center.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p2.orientation, 0.0);

        // 2n + 1 segments plus the outline reference
        assert_eq!(cell.instance_count(), 2 * params.crystal_count + 2);
    }

    #[test]
    fn test_defect_sits_in_the_middle() {
        let params = CrystalParameters::default();
        let cell = generate_photonic_crystal(&params).unwrap();
        let crystal = cell.flatten_on_layer(CRYSTAL_BLANK);
        let tallest = crystal
            .iter()
            .filter_map(|g| g.bbox())
            .max_by(|a, b| a.height().total_cmp(&b.height()))
            .unwrap();
        assert_relative_eq!(tallest.height(), params.defect_height, epsilon = 1e-9);
        assert_relative_eq!(tallest.width(), params.defect_width, epsilon = 1e-9);
        assert_relative_eq!(tallest.center().x, params.total_length() / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_beam_area() {
        let p = CrystalParameters::default();
        let cell = generate_photonic_crystal(&p).unwrap();
        let n = p.crystal_count as f64;
        let expected = (n + 1.0) * p.bridge_width * p.bridge_length
            + (n - 1.0) * p.crystal_height * p.crystal_width
            + p.defect_height * p.defect_width;
        assert_relative_eq!(area_on(&cell, CRYSTAL_BLANK), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_off_defect_uses_regular_crystal() {
        let p = CrystalParameters::default().with_off_defect(true);
        let cell = generate_photonic_crystal(&p).unwrap();
        let max_height = cell
            .flatten_on_layer(CRYSTAL_BLANK)
            .iter()
            .filter_map(|g| g.bbox())
            .map(|b| b.height())
            .fold(0.0, f64::max);
        assert_relative_eq!(max_height, p.crystal_height, epsilon = 1e-9);
    }

    #[test]
    fn test_outline_leaves_ends_open() {
        let p = CrystalParameters::default();
        let cell = generate_photonic_crystal(&p).unwrap();
        let etch = cell.flatten_on_layer(REMOVED_GAAS);
        assert!(!etch.is_empty());
        let bb = nanobeam_core::BBox::union_all(etch.iter().filter_map(|g| g.bbox())).unwrap();
        // the end caps are cut away, so the etch stops at the beam ends
        assert!(bb.min.x >= -1e-9);
        assert!(bb.max.x <= p.total_length() + 1e-9);
        assert_relative_eq!(bb.height(), p.defect_height + 2.0 * p.outline_width, epsilon = 1e-9);
        // no uncover rectangle is left behind
        assert_eq!(cell.instance_count(), 2 * p.crystal_count + 2);
    }

    #[test]
    fn test_unetched_has_no_outline() {
        let p = CrystalParameters::default().with_unetched(true);
        let cell = generate_photonic_crystal(&p).unwrap();
        assert!(cell.flatten_on_layer(REMOVED_GAAS).is_empty());
        assert_eq!(cell.instance_count(), 2 * p.crystal_count + 1);
    }

    #[test]
    fn test_even_count_is_rejected() {
        let p = CrystalParameters::default().with_crystal_count(4);
        assert!(matches!(
            generate_photonic_crystal(&p),
            Err(DeviceError::Parameter(_))
        ));
    }
}
