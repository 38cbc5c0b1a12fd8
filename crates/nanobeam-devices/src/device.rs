use std::sync::Arc;

use nanobeam_core::primitives::{connector, straight};
use nanobeam_core::routing::route_quad;
use nanobeam_core::{Cell, Point};

use crate::crystal::generate_photonic_crystal;
use crate::error::DeviceError;
use crate::params::DeviceParameters;

/// A crystal with internal electrodes over each half of the beam and
/// skewed external leads. Ports `W` and `E` sit at the lead ends, exactly
/// `total_length` apart.
pub fn generate_device(params: &DeviceParameters) -> Result<Arc<Cell>, DeviceError> {
    params.validate()?;

    let crystal = generate_photonic_crystal(&params.crystal)?;
    let mut cell = Cell::new("device");
    cell.add_ref(&crystal);

    let ends = [crystal.port("1")?.clone(), crystal.port("2")?.clone()];
    let width = params.internal_electrode_width();
    let layer = params.electrode_layer;

    if params.shorted {
        let electrode = straight(width, params.crystal_length(), layer);
        cell.add_ref(&electrode)
            .connect("1", &ends[0], 0.0)?
            .rotate(180.0, ends[0].center);
    } else {
        let electrode = straight(width, params.internal_electrode_length(), layer);
        for (port, end) in ["1", "2"].iter().zip(&ends) {
            // attach facing out, then swing the electrode back over the beam
            cell.add_ref(&electrode)
                .connect(port, end, 0.0)?
                .rotate(180.0, end.center);
        }
    }

    let lead = connector(Point::default(), params.external_electrode_width, 0.0);
    let reach = params.external_electrode_length();
    for (end, (lead_port, name)) in ends.iter().zip([("2", "W"), ("1", "E")]) {
        let target = end.center + end.normal() * reach + Point::new(0.0, -params.external_electrode_skew);
        let anchor = cell.add_ref(&lead);
        anchor.move_to(Point::default(), target);
        let port = anchor.port(lead_port)?;

        let quad = route_quad(end, &port, Some(params.external_electrode_width), None, layer)?;
        cell.add_ref(&quad);
        cell.add_port(name, &port);
    }

    log::debug!(
        "Device: total length {} µm, crystal {:.4} µm{}",
        params.total_length,
        params.crystal_length(),
        if params.shorted { ", shorted" } else { "" }
    );
    Ok(Arc::new(cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParameterError;
    use approx::assert_relative_eq;
    use nanobeam_core::layer::VANADIUM;
    use nanobeam_core::GeomPrimitive;

    fn electrode_boxes(cell: &Cell, params: &DeviceParameters) -> Vec<nanobeam_core::BBox> {
        let height = params.internal_electrode_width();
        cell.flatten_on_layer(VANADIUM)
            .iter()
            .filter(|g| matches!(g, GeomPrimitive::Rect(_)))
            .filter_map(|g| g.bbox())
            .filter(|b| (b.height() - height).abs() < 1e-9)
            .collect()
    }

    #[test]
    fn test_port_span_equals_total_length() {
        let params = DeviceParameters::default();
        let device = generate_device(&params).unwrap();
        let w = device.port("W").unwrap();
        let e = device.port("E").unwrap();
        assert_relative_eq!(e.center.x - w.center.x, params.total_length, epsilon = 1e-9);
        assert_relative_eq!(w.center.y, -params.external_electrode_skew, epsilon = 1e-9);
        assert_relative_eq!(w.orientation, 180.0);
        assert_relative_eq!(e.orientation, 0.0);
        assert_relative_eq!(w.width, params.external_electrode_width);
    }

    #[test]
    fn test_internal_electrodes_overlap_defect() {
        let params = DeviceParameters::default();
        let device = generate_device(&params).unwrap();
        let mut boxes = electrode_boxes(&device, &params);
        boxes.sort_by(|a, b| a.min.x.total_cmp(&b.min.x));
        assert_eq!(boxes.len(), 2);

        let length = params.crystal_length();
        assert_relative_eq!(boxes[0].min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(boxes[0].width(), params.internal_electrode_length(), epsilon = 1e-9);
        assert_relative_eq!(boxes[1].max.x, length, epsilon = 1e-9);
        // each reaches electrode_overlap past the near defect edge
        let defect_start = params.crystal.half_length_to_defect();
        assert_relative_eq!(boxes[0].max.x, defect_start + params.electrode_overlap, epsilon = 1e-9);
        assert_relative_eq!(boxes[0].center().y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_shorted_has_one_electrode() {
        let params = DeviceParameters::default().with_shorted(true);
        let device = generate_device(&params).unwrap();
        let boxes = electrode_boxes(&device, &params);
        assert_eq!(boxes.len(), 1);
        assert_relative_eq!(boxes[0].min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(boxes[0].max.x, params.crystal_length(), epsilon = 1e-9);
    }

    #[test]
    fn test_leads_join_beam_ends() {
        let params = DeviceParameters::default();
        let device = generate_device(&params).unwrap();
        let leads: Vec<_> = device
            .flatten_on_layer(VANADIUM)
            .into_iter()
            .filter(|g| matches!(g, GeomPrimitive::Polygon(_)))
            .collect();
        assert_eq!(leads.len(), 2);
        let bb = nanobeam_core::BBox::union_all(leads.iter().filter_map(|g| g.bbox())).unwrap();
        let half = params.external_electrode_width / 2.0;
        assert_relative_eq!(bb.max.y, half, epsilon = 1e-9);
        assert_relative_eq!(bb.min.y, -params.external_electrode_skew - half, epsilon = 1e-9);
    }

    #[test]
    fn test_too_short_device_is_rejected() {
        let params = DeviceParameters::default().with_total_length(8.0);
        assert!(matches!(
            generate_device(&params),
            Err(DeviceError::Parameter(_))
        ));

        // leads of zero reach fail validation instead of routing
        let base = DeviceParameters::default();
        let flush = base.with_total_length(base.crystal_length());
        assert!(matches!(
            generate_device(&flush),
            Err(DeviceError::Parameter(ParameterError::CrystalTooLong { .. }))
        ));
    }
}
