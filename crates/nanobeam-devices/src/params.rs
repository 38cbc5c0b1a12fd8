//! Parameter records for every generator. Derived lengths are computed on
//! demand, never stored, so a tweaked copy can never go stale.

use nanobeam_core::layer::{CRYSTAL_BLANK, GOLD, REMOVED_GAAS, VANADIUM};
use nanobeam_core::LayerId;
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// Generates `with_<field>` methods returning a copy with one field replaced.
macro_rules! with_fields {
    ($ty:ty { $($method:ident => $field:ident: $fty:ty),* $(,)? }) => {
        impl $ty {
            $(
                pub fn $method(&self, $field: $fty) -> Self {
                    Self { $field, ..self.clone() }
                }
            )*
        }
    };
}

pub(crate) fn positive(field: &'static str, value: f64) -> Result<(), ParameterError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ParameterError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::NonPositive { field, value })
    }
}

/// The photonic-crystal lattice. Widths run along the beam, heights across it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrystalParameters {
    pub crystal_width: f64,
    pub crystal_height: f64,
    pub bridge_width: f64,
    pub bridge_length: f64,
    pub defect_width: f64,
    pub defect_height: f64,
    pub crystal_count: usize,
    pub outline_width: f64,
    pub crystal_layer: LayerId,
    pub outline_layer: LayerId,
    /// Skip the membrane etch outline.
    pub unetched: bool,
    /// Replace the defect with a regular crystal.
    pub off_defect: bool,
}

impl Default for CrystalParameters {
    fn default() -> Self {
        Self {
            crystal_width: 0.6,
            crystal_height: 0.77,
            bridge_width: 0.18,
            bridge_length: 0.32,
            defect_width: 0.545,
            defect_height: 0.9,
            crystal_count: 11,
            outline_width: 0.3,
            crystal_layer: CRYSTAL_BLANK,
            outline_layer: REMOVED_GAAS,
            unetched: false,
            off_defect: false,
        }
    }
}

impl CrystalParameters {
    /// Beam length from the first bridge's outer edge to the last one's.
    pub fn total_length(&self) -> f64 {
        let n = self.crystal_count as f64;
        self.bridge_length * (n + 1.0) + self.crystal_width * (n - 1.0) + self.defect_width
    }

    /// Distance from either beam end to the nearest defect edge.
    pub fn half_length_to_defect(&self) -> f64 {
        (self.total_length() - self.defect_width) / 2.0
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.crystal_count == 0 {
            return Err(ParameterError::ZeroCount {
                field: "crystal_count",
            });
        }
        if self.crystal_count % 2 == 0 {
            return Err(ParameterError::EvenCrystalCount(self.crystal_count));
        }
        positive("crystal_width", self.crystal_width)?;
        positive("crystal_height", self.crystal_height)?;
        positive("bridge_width", self.bridge_width)?;
        positive("bridge_length", self.bridge_length)?;
        positive("defect_width", self.defect_width)?;
        positive("defect_height", self.defect_height)?;
        if !self.unetched {
            positive("outline_width", self.outline_width)?;
        }
        Ok(())
    }
}

with_fields!(CrystalParameters {
    with_crystal_width => crystal_width: f64,
    with_crystal_height => crystal_height: f64,
    with_bridge_width => bridge_width: f64,
    with_bridge_length => bridge_length: f64,
    with_defect_width => defect_width: f64,
    with_defect_height => defect_height: f64,
    with_crystal_count => crystal_count: usize,
    with_outline_width => outline_width: f64,
    with_crystal_layer => crystal_layer: LayerId,
    with_outline_layer => outline_layer: LayerId,
    with_unetched => unetched: bool,
    with_off_defect => off_defect: bool,
});

/// A crystal with its electrodes and external leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceParameters {
    /// Span between the two external lead ports.
    pub total_length: f64,
    pub crystal: CrystalParameters,
    /// How far each internal electrode reaches past the defect edge.
    pub electrode_overlap: f64,
    pub external_electrode_width: f64,
    /// Offset of the lead ports below the beam axis.
    pub external_electrode_skew: f64,
    pub electrode_layer: LayerId,
    /// One internal electrode across the whole beam.
    pub shorted: bool,
}

impl Default for DeviceParameters {
    fn default() -> Self {
        Self {
            total_length: 40.0,
            crystal: CrystalParameters::default(),
            electrode_overlap: 0.15,
            external_electrode_width: 1.92,
            external_electrode_skew: 5.0,
            electrode_layer: VANADIUM,
            shorted: false,
        }
    }
}

impl DeviceParameters {
    pub fn crystal_length(&self) -> f64 {
        self.crystal.total_length()
    }

    pub fn internal_electrode_width(&self) -> f64 {
        self.crystal.crystal_height.max(self.crystal.defect_height)
    }

    pub fn internal_electrode_length(&self) -> f64 {
        self.crystal.half_length_to_defect() + self.electrode_overlap
    }

    pub fn external_electrode_length(&self) -> f64 {
        (self.total_length - self.crystal_length()) / 2.0
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        self.crystal.validate()?;
        positive("total_length", self.total_length)?;
        non_negative("electrode_overlap", self.electrode_overlap)?;
        positive("external_electrode_width", self.external_electrode_width)?;
        let crystal_length = self.crystal_length();
        if self.total_length <= crystal_length {
            return Err(ParameterError::CrystalTooLong {
                total_length: self.total_length,
                crystal_length,
            });
        }
        Ok(())
    }
}

with_fields!(DeviceParameters {
    with_total_length => total_length: f64,
    with_crystal => crystal: CrystalParameters,
    with_electrode_overlap => electrode_overlap: f64,
    with_external_electrode_width => external_electrode_width: f64,
    with_external_electrode_skew => external_electrode_skew: f64,
    with_electrode_layer => electrode_layer: LayerId,
    with_shorted => shorted: bool,
});

/// A column of devices between a shared center electrode and two side rails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayParameters {
    /// Devices on each side of the center electrode.
    pub device_count: usize,
    pub device_spacing: f64,
    /// Clear gap between the center electrode and each side rail.
    pub gap_spacing: f64,
    pub layer: LayerId,
    pub center_electrode_width: f64,
    pub side_electrode_width: f64,
}

impl Default for ArrayParameters {
    fn default() -> Self {
        Self {
            device_count: 5,
            device_spacing: 20.0,
            gap_spacing: 25.0,
            layer: GOLD,
            center_electrode_width: 50.0,
            side_electrode_width: 30.0,
        }
    }
}

impl ArrayParameters {
    pub fn electrode_height(&self) -> f64 {
        self.device_count as f64 * self.device_spacing
    }

    /// Center-to-center distance from the center electrode to a side rail.
    pub fn side_electrode_offset(&self) -> f64 {
        self.gap_spacing + self.center_electrode_width / 2.0 + self.side_electrode_width / 2.0
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.device_count == 0 {
            return Err(ParameterError::ZeroCount {
                field: "device_count",
            });
        }
        positive("device_spacing", self.device_spacing)?;
        positive("gap_spacing", self.gap_spacing)?;
        positive("center_electrode_width", self.center_electrode_width)?;
        positive("side_electrode_width", self.side_electrode_width)
    }
}

with_fields!(ArrayParameters {
    with_device_count => device_count: usize,
    with_device_spacing => device_spacing: f64,
    with_gap_spacing => gap_spacing: f64,
    with_layer => layer: LayerId,
    with_center_electrode_width => center_electrode_width: f64,
    with_side_electrode_width => side_electrode_width: f64,
});

/// Bond pads and the bus joining the two outer pads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadParameters {
    pub pad_size: f64,
    pub pad_spacing: f64,
    pub bus_width: f64,
    pub bus_height: f64,
    /// Clearance between the array's center port and the pad row.
    pub pad_offset: f64,
}

impl Default for PadParameters {
    fn default() -> Self {
        Self {
            pad_size: 150.0,
            pad_spacing: 75.0,
            bus_width: 150.0,
            bus_height: 120.0,
            pad_offset: 100.0,
        }
    }
}

impl PadParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        positive("pad_size", self.pad_size)?;
        positive("pad_spacing", self.pad_spacing)?;
        positive("bus_width", self.bus_width)?;
        positive("bus_height", self.bus_height)?;
        non_negative("pad_offset", self.pad_offset)
    }
}

with_fields!(PadParameters {
    with_pad_size => pad_size: f64,
    with_pad_spacing => pad_spacing: f64,
    with_bus_width => bus_width: f64,
    with_bus_height => bus_height: f64,
    with_pad_offset => pad_offset: f64,
});

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_total_length() {
        let c = CrystalParameters::default();
        // 0.32·12 + 0.6·10 + 0.545
        assert_relative_eq!(c.total_length(), 10.385, epsilon = 1e-12);
        assert_relative_eq!(c.half_length_to_defect(), 4.92, epsilon = 1e-12);
    }

    #[test]
    fn test_half_length_matches_period_count() {
        for n in (1..=21).step_by(2) {
            let c = CrystalParameters::default()
                .with_crystal_count(n)
                .with_crystal_width(0.37 + n as f64 * 0.01)
                .with_bridge_length(0.21);
            let by_periods = (n / 2) as f64 * (c.crystal_width + c.bridge_length) + c.bridge_length;
            assert_relative_eq!(c.half_length_to_defect(), by_periods, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_device_derived_lengths() {
        let d = DeviceParameters::default();
        assert_relative_eq!(d.crystal_length(), 10.385, epsilon = 1e-12);
        assert_relative_eq!(d.internal_electrode_width(), 0.9);
        assert_relative_eq!(d.internal_electrode_length(), 5.07, epsilon = 1e-12);
        assert_relative_eq!(
            d.crystal_length() + 2.0 * d.external_electrode_length(),
            d.total_length,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_even_crystal_count_rejected() {
        let d = DeviceParameters::default().with_crystal(CrystalParameters::default().with_crystal_count(10));
        assert_eq!(d.validate(), Err(ParameterError::EvenCrystalCount(10)));
        assert!(CrystalParameters::default().with_crystal_count(0).validate().is_err());
        assert!(DeviceParameters::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_dimensions() {
        let c = CrystalParameters::default().with_bridge_width(0.0);
        assert_eq!(
            c.validate(),
            Err(ParameterError::NonPositive {
                field: "bridge_width",
                value: 0.0
            })
        );
        // the outline width only matters when the outline is drawn
        let c = CrystalParameters::default().with_outline_width(0.0).with_unetched(true);
        assert!(c.validate().is_ok());

        let d = DeviceParameters::default().with_total_length(5.0);
        assert!(matches!(d.validate(), Err(ParameterError::CrystalTooLong { .. })));
    }

    #[test]
    fn test_leads_need_room_beyond_crystal() {
        let base = DeviceParameters::default();
        let flush = base.with_total_length(base.crystal_length());
        assert_eq!(
            flush.validate(),
            Err(ParameterError::CrystalTooLong {
                total_length: base.crystal_length(),
                crystal_length: base.crystal_length(),
            })
        );
        assert!(base.with_total_length(base.crystal_length() + 0.01).validate().is_ok());
    }

    #[test]
    fn test_with_changes_one_field() {
        let base = DeviceParameters::default();
        let tweaked = base.with_electrode_overlap(0.4);
        assert_relative_eq!(tweaked.electrode_overlap, 0.4);
        assert_eq!(tweaked.with_electrode_overlap(base.electrode_overlap), base);
    }

    #[test]
    fn test_array_geometry() {
        let a = ArrayParameters::default();
        assert_relative_eq!(a.electrode_height(), 100.0);
        assert_relative_eq!(a.side_electrode_offset(), 65.0);
        assert!(a.with_device_count(0).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let d: DeviceParameters =
            serde_json::from_str(r#"{"total_length": 60, "crystal": {"crystal_count": 7}}"#).unwrap();
        assert_relative_eq!(d.total_length, 60.0);
        assert_eq!(d.crystal.crystal_count, 7);
        assert_relative_eq!(d.crystal.defect_width, 0.545);
        assert_eq!(d.electrode_layer, VANADIUM);
    }
}
