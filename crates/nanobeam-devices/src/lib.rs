//! # Nanobeam Devices
//!
//! Parametric generators for photonic-crystal nanobeam cavities: the
//! crystal lattice, electrode-wired devices, device arrays with bond pads,
//! and wafer tiles of parameter-swept variants.

pub mod array;
pub mod config;
pub mod crystal;
pub mod device;
pub mod error;
pub mod pads;
pub mod params;
pub mod sweep;
pub mod wafer;

pub use array::generate_waveguides;
pub use config::{LayoutConfig, WaferConfig};
pub use crystal::generate_photonic_crystal;
pub use device::generate_device;
pub use error::{ConfigError, DeviceError, ParameterError};
pub use pads::generate_pads;
pub use params::{ArrayParameters, CrystalParameters, DeviceParameters, PadParameters};
pub use sweep::{control_variants, Sweep, SweepField, Variant};
pub use wafer::{generate_wafer, WaferParameters};
