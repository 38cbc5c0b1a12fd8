//! # Nanobeam Render
//!
//! Turns a cell hierarchy into per-layer render data and writes it out as a
//! standalone SVG preview.

pub mod render_data;
pub mod svg;
pub mod viewport;

pub use render_data::{RenderFrame, RenderLabel, RenderLayer, RenderPolygon, RenderPort};
pub use svg::{to_svg, write_svg, RenderError};
pub use viewport::Viewport;
