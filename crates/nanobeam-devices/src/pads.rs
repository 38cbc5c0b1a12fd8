use std::sync::Arc;

use nanobeam_core::primitives::{compass_multi, straight, Side};
use nanobeam_core::routing::route_quad;
use nanobeam_core::{Axis, Cell, LayerId};

use crate::array::generate_waveguides;
use crate::error::DeviceError;
use crate::params::{ArrayParameters, DeviceParameters, PadParameters};

/// Three bond pads in a row. The outer two carry bus blocks below them that
/// are joined by a bar running under the center pad. Ports `L`, `C`, `R`
/// are the pads' top edges.
fn pad_row(pads: &PadParameters, layer: LayerId) -> Result<Arc<Cell>, DeviceError> {
    let pad = straight(pads.pad_size, pads.pad_size, layer);
    let mut row = Cell::new("pads");
    for _ in 0..3 {
        row.add_ref(&pad);
    }
    row.distribute(pads.pad_spacing, Axis::X);

    let [left, center, right] = [0, 1, 2].map(|i| row.instances[i].clone());

    let left_bus = compass_multi(pads.bus_width, pads.bus_height, &[(Side::E, 2), (Side::S, 1)], layer);
    let left_block = row.add_ref(&left_bus);
    left_block.connect("S1", &left.port("1")?, 0.0)?;
    let left_end = left_block.port("E2")?;

    let right_bus = compass_multi(pads.bus_width, pads.bus_height, &[(Side::W, 2), (Side::S, 1)], layer);
    let right_block = row.add_ref(&right_bus);
    right_block.connect("S1", &right.port("1")?, 0.0)?;
    let right_end = right_block.port("W2")?;

    row.add_ref(&route_quad(&right_end, &left_end, None, None, layer)?);

    row.add_port("L", &left.port("2")?);
    row.add_port("C", &center.port("2")?);
    row.add_port("R", &right.port("2")?);
    Ok(Arc::new(row))
}

/// The waveguide array with its pad row hung `pad_offset` above the center
/// electrode, flipped so the pads face the array, and wired C to C. The flip
/// swaps sides, so the pad row's `R` feeds the array's `L` and vice versa.
pub fn generate_pads(
    array: &ArrayParameters,
    pads: &PadParameters,
    device: &DeviceParameters,
) -> Result<Arc<Cell>, DeviceError> {
    pads.validate()?;

    let layer = array.layer;
    let waveguides = generate_waveguides(array, device)?;
    let row = pad_row(pads, layer)?;

    let mut cell = Cell::new("nanobeam_array");
    cell.add_ref(&waveguides);
    let placed = cell.add_ref(&row);
    placed.connect("C", waveguides.port("C")?, -pads.pad_offset)?;
    let pad_ports = [placed.port("C")?, placed.port("R")?, placed.port("L")?];

    for (pad_port, target) in pad_ports.iter().zip(["C", "L", "R"]) {
        let route = route_quad(pad_port, waveguides.port(target)?, None, None, layer)?;
        cell.add_ref(&route);
    }

    log::info!(
        "Generated pad array: {} devices per side, {} µm device length",
        array.device_count,
        device.total_length
    );
    Ok(Arc::new(cell))
}
