//! JSON layout configuration. Every field is optional in the file; missing
//! ones take the values of the reference device.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nanobeam_core::{Cell, Library};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DeviceError};
use crate::pads::generate_pads;
use crate::params::{ArrayParameters, DeviceParameters, PadParameters};
use crate::sweep::{control_variants, Sweep, Variant};
use crate::wafer::{generate_wafer, WaferParameters};

/// Sweeps to tile across a wafer. The unmodified device always comes first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaferConfig {
    pub parameters: WaferParameters,
    pub sweeps: Vec<Sweep>,
    /// Append the shorted, unetched and defect-free control devices.
    pub controls: bool,
}

impl WaferConfig {
    pub fn variants(&self, base: &DeviceParameters) -> Vec<Variant> {
        let mut variants = vec![Variant::new("base", base.clone())];
        for sweep in &self.sweeps {
            variants.extend(sweep.variants(base));
        }
        if self.controls {
            variants.extend(control_variants(base));
        }
        variants
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub library_name: String,
    pub output: PathBuf,
    pub device: DeviceParameters,
    pub array: ArrayParameters,
    pub pads: PadParameters,
    /// Without a wafer section a single pad array is generated.
    pub wafer: Option<WaferConfig>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            library_name: "nanobeam".to_string(),
            output: PathBuf::from("out.gds"),
            device: DeviceParameters::default(),
            array: ArrayParameters::default(),
            pads: PadParameters::default(),
            wafer: None,
        }
    }
}

impl LayoutConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded layout config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The top cell: a wafer of variants, or a single pad array.
    pub fn build(&self) -> Result<Arc<Cell>, DeviceError> {
        match &self.wafer {
            Some(wafer) => generate_wafer(
                &wafer.variants(&self.device),
                &self.array,
                &self.pads,
                &wafer.parameters,
            ),
            None => generate_pads(&self.array, &self.pads, &self.device),
        }
    }

    pub fn library(&self) -> Result<Library, DeviceError> {
        let top = self.build()?;
        Ok(Library::from_top(&self.library_name, &top))
    }
}
