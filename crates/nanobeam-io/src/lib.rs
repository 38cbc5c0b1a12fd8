//! # Nanobeam I/O
//!
//! GDS-II stream export and import for nanobeam libraries.

pub mod gds;

pub use gds::{read_gds_file, write_gds_file, GdsError, GdsReader, GdsWriter};
