use std::sync::Arc;

use nanobeam_core::primitives::{compass_multi, straight, Side};
use nanobeam_core::routing::route_sharp;
use nanobeam_core::{Cell, Point};

use crate::device::generate_device;
use crate::error::{DeviceError, ParameterError};
use crate::params::{ArrayParameters, DeviceParameters};

/// `device_count` device pairs hung off both sides of a center electrode,
/// with their outer leads landing on two side rails that are tied together
/// underneath. Ports: `C` on top of the center electrode, `L` and `R` on
/// top of the rails.
pub fn generate_waveguides(
    array: &ArrayParameters,
    device: &DeviceParameters,
) -> Result<Arc<Cell>, DeviceError> {
    array.validate()?;
    if array.gap_spacing > device.total_length {
        return Err(ParameterError::GapTooWide {
            gap_spacing: array.gap_spacing,
            total_length: device.total_length,
        }
        .into());
    }

    let n = array.device_count;
    let height = array.electrode_height();
    let mut cell = Cell::new("waveguides");

    let center = compass_multi(
        array.center_electrode_width,
        height,
        &[(Side::N, 1), (Side::E, n), (Side::W, n)],
        array.layer,
    );
    let center_ref = cell.add_ref(&center);
    let center_ports = center_ref.ports();
    let find = |name: String| {
        center_ports
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| nanobeam_core::LayoutError::MissingPort {
                cell: center.name.clone(),
                port: name,
            })
    };

    let unit = generate_device(device)?;
    let overlap = (device.total_length - array.gap_spacing) / 2.0;
    for i in 0..n {
        let west = find(format!("W{}", n - i))?;
        let east = find(format!("E{}", n - i))?;
        cell.add_ref(&unit).connect("E", &west, overlap)?;
        cell.add_ref(&unit).connect("W", &east, overlap)?;
    }

    let rail = straight(array.side_electrode_width, height, array.layer);
    let offset = array.side_electrode_offset();
    let mut place_rail = |x: f64| -> Result<_, DeviceError> {
        let placed = cell.add_ref(&rail);
        let center = placed
            .center()
            .ok_or_else(|| DeviceError::EmptyCell(rail.name.clone()))?;
        placed.move_to(center, Point::new(x, 0.0));
        Ok((placed.port("1")?, placed.port("2")?))
    };
    let (left_bottom, left_top) = place_rail(-offset)?;
    let (right_bottom, right_top) = place_rail(offset)?;

    let tie = route_sharp(
        &left_bottom,
        &right_bottom,
        Some(array.side_electrode_width),
        array.layer,
    )?;
    cell.add_ref(&tie);

    cell.add_port("L", &left_top);
    cell.add_port("C", &find("N1".to_string())?);
    cell.add_port("R", &right_top);

    log::debug!(
        "Waveguide array: {} device pairs, rails at ±{} µm",
        n,
        offset
    );
    Ok(Arc::new(cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nanobeam_core::layer::{GOLD, VANADIUM};

    #[test]
    fn test_array_ports() {
        let array = ArrayParameters::default();
        let cell = generate_waveguides(&array, &DeviceParameters::default()).unwrap();
        let c = cell.port("C").unwrap();
        assert_relative_eq!(c.center.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(c.center.y, 50.0, epsilon = 1e-9);
        assert_relative_eq!(c.orientation, 90.0);

        let l = cell.port("L").unwrap();
        let r = cell.port("R").unwrap();
        assert_relative_eq!(l.center.x, -65.0, epsilon = 1e-9);
        assert_relative_eq!(r.center.x, 65.0, epsilon = 1e-9);
        assert_relative_eq!(l.center.y, 50.0, epsilon = 1e-9);
        assert_relative_eq!(r.orientation, 90.0);
    }

    #[test]
    fn test_devices_bridge_the_gaps() {
        let array = ArrayParameters::default();
        let device = DeviceParameters::default();
        let cell = generate_waveguides(&array, &device).unwrap();
        // 1 center + 2n devices + 2 rails + 1 tie
        assert_eq!(cell.instance_count(), 2 * array.device_count + 4);

        let leads = cell.flatten_on_layer(VANADIUM);
        let bb = nanobeam_core::BBox::union_all(leads.iter().filter_map(|g| g.bbox())).unwrap();
        // each device overlaps both electrodes by (total - gap) / 2
        let overlap = (device.total_length - array.gap_spacing) / 2.0;
        let rail_inner = array.gap_spacing + array.center_electrode_width / 2.0;
        assert_relative_eq!(bb.max.x, rail_inner + overlap, epsilon = 1e-9);
        assert_relative_eq!(bb.min.x, -(rail_inner + overlap), epsilon = 1e-9);
    }

    #[test]
    fn test_rails_tied_below() {
        let array = ArrayParameters::default();
        let cell = generate_waveguides(&array, &DeviceParameters::default()).unwrap();
        let gold = cell.flatten_on_layer(GOLD);
        let bb = nanobeam_core::BBox::union_all(gold.iter().filter_map(|g| g.bbox())).unwrap();
        // the U route drops one rail width below the rails, plus half its width
        assert_relative_eq!(bb.min.y, -50.0 - 45.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max.y, 50.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max.x, 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gap_wider_than_device() {
        let array = ArrayParameters::default().with_gap_spacing(50.0);
        assert!(matches!(
            generate_waveguides(&array, &DeviceParameters::default()),
            Err(DeviceError::Parameter(ParameterError::GapTooWide { .. }))
        ));
    }
}
