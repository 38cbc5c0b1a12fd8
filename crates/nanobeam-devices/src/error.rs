use std::path::PathBuf;

use nanobeam_core::LayoutError;
use thiserror::Error;

/// A parameter record that cannot describe a buildable device.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("crystal_count must be odd, got {0}")]
    EvenCrystalCount(usize),

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("total_length {total_length} leaves no room for leads beyond the crystal ({crystal_length})")]
    CrystalTooLong {
        total_length: f64,
        crystal_length: f64,
    },

    #[error("gap_spacing {gap_spacing} exceeds the device total_length {total_length}")]
    GapTooWide { gap_spacing: f64, total_length: f64 },
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Invalid parameters: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Cell '{0}' produced no geometry")]
    EmptyCell(String),

    #[error("Wafer tiles '{first}' and '{second}' overlap; increase the pitch")]
    TileOverlap { first: String, second: String },

    #[error("No variants to place on the wafer")]
    NoVariants,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Device(#[from] DeviceError),
}
