//! Parameter sweeps: copies of a base device with exactly one field changed.

use serde::{Deserialize, Serialize};

use crate::params::DeviceParameters;

/// A device or crystal field that can be swept. Flags take `0` as false and
/// anything else as true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepField {
    DefectWidth,
    DefectHeight,
    CrystalWidth,
    CrystalHeight,
    CrystalCount,
    BridgeWidth,
    BridgeLength,
    OutlineWidth,
    ElectrodeOverlap,
    ExternalElectrodeWidth,
    ExternalElectrodeSkew,
    TotalLength,
    Shorted,
    Unetched,
    OffDefect,
}

impl SweepField {
    pub fn name(self) -> &'static str {
        match self {
            SweepField::DefectWidth => "defect_width",
            SweepField::DefectHeight => "defect_height",
            SweepField::CrystalWidth => "crystal_width",
            SweepField::CrystalHeight => "crystal_height",
            SweepField::CrystalCount => "crystal_count",
            SweepField::BridgeWidth => "bridge_width",
            SweepField::BridgeLength => "bridge_length",
            SweepField::OutlineWidth => "outline_width",
            SweepField::ElectrodeOverlap => "electrode_overlap",
            SweepField::ExternalElectrodeWidth => "external_electrode_width",
            SweepField::ExternalElectrodeSkew => "external_electrode_skew",
            SweepField::TotalLength => "total_length",
            SweepField::Shorted => "shorted",
            SweepField::Unetched => "unetched",
            SweepField::OffDefect => "off_defect",
        }
    }

    pub fn is_flag(self) -> bool {
        matches!(self, SweepField::Shorted | SweepField::Unetched | SweepField::OffDefect)
    }

    /// A copy of `base` with this field set to `value`. Counts are rounded to
    /// the nearest non-negative integer.
    pub fn apply(self, base: &DeviceParameters, value: f64) -> DeviceParameters {
        let c = &base.crystal;
        let flag = value != 0.0;
        match self {
            SweepField::DefectWidth => base.with_crystal(c.with_defect_width(value)),
            SweepField::DefectHeight => base.with_crystal(c.with_defect_height(value)),
            SweepField::CrystalWidth => base.with_crystal(c.with_crystal_width(value)),
            SweepField::CrystalHeight => base.with_crystal(c.with_crystal_height(value)),
            SweepField::CrystalCount => {
                if value.fract() != 0.0 {
                    log::warn!("crystal_count {} rounded to {}", value, value.round());
                }
                base.with_crystal(c.with_crystal_count(value.round().max(0.0) as usize))
            }
            SweepField::BridgeWidth => base.with_crystal(c.with_bridge_width(value)),
            SweepField::BridgeLength => base.with_crystal(c.with_bridge_length(value)),
            SweepField::OutlineWidth => base.with_crystal(c.with_outline_width(value)),
            SweepField::ElectrodeOverlap => base.with_electrode_overlap(value),
            SweepField::ExternalElectrodeWidth => base.with_external_electrode_width(value),
            SweepField::ExternalElectrodeSkew => base.with_external_electrode_skew(value),
            SweepField::TotalLength => base.with_total_length(value),
            SweepField::Shorted => base.with_shorted(flag),
            SweepField::Unetched => base.with_crystal(c.with_unetched(flag)),
            SweepField::OffDefect => base.with_crystal(c.with_off_defect(flag)),
        }
    }
}

/// One field stepped through a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    pub field: SweepField,
    pub values: Vec<f64>,
}

/// A named parameter set to be placed on the wafer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub parameters: DeviceParameters,
}

impl Variant {
    pub fn new(name: &str, parameters: DeviceParameters) -> Self {
        Self {
            name: name.to_string(),
            parameters,
        }
    }
}

impl Sweep {
    pub fn new(field: SweepField, values: Vec<f64>) -> Self {
        Self { field, values }
    }

    /// `count` values evenly spaced from `start` to `stop` inclusive.
    pub fn linear(field: SweepField, start: f64, stop: f64, count: usize) -> Self {
        let values = match count {
            0 => Vec::new(),
            1 => vec![start],
            _ => (0..count)
                .map(|i| start + (stop - start) * i as f64 / (count - 1) as f64)
                .collect(),
        };
        Self { field, values }
    }

    pub fn variants(&self, base: &DeviceParameters) -> Vec<Variant> {
        self.values
            .iter()
            .map(|&v| {
                let name = if self.field.is_flag() {
                    format!("{}={}", self.field.name(), v != 0.0)
                } else {
                    format!("{}={}", self.field.name(), label_value(v))
                };
                Variant::new(&name, self.field.apply(base, v))
            })
            .collect()
    }
}

/// `value` rounded to the picometre with trailing zeros dropped, so linear
/// steps read `0.56` rather than `0.5599999999999999` on the mask.
fn label_value(value: f64) -> String {
    let fixed = format!("{:.6}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" => "0".to_string(),
        _ => trimmed.to_string(),
    }
}

/// The three control devices: shorted electrodes, no etch, no defect.
pub fn control_variants(base: &DeviceParameters) -> Vec<Variant> {
    [SweepField::Shorted, SweepField::Unetched, SweepField::OffDefect]
        .into_iter()
        .map(|f| Variant::new(&format!("control_{}", f.name()), f.apply(base, 1.0)))
        .collect()
}
