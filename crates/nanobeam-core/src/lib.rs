//! # Nanobeam Core
//!
//! Layout kernel for photonic-crystal nanobeam devices: hierarchical cells
//! with named ports, rigid placement transforms, parametric primitives,
//! port-to-port routing, polygon booleans and an R-tree for overlap checks.

pub mod boolean;
pub mod cell;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod library;
pub mod primitives;
pub mod routing;
pub mod spatial;

pub use boolean::BooleanOp;
pub use cell::{Axis, Cell, CellInstance, Label, Port, Transform};
pub use error::LayoutError;
pub use geometry::{BBox, GeomPrimitive, Path, Point, Polygon, Rect};
pub use layer::{Layer, LayerId, LayerStack};
pub use library::Library;
