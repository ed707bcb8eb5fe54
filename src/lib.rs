// Reconstruction of 3D cells from a z-stack of independently segmented 2D
// label images, by linking each layer's slices to the next.

pub mod cellslice;
pub mod coords;
pub mod error;
pub mod labelmap;
pub mod matcher;
pub mod output;
pub mod persist;
pub mod reconcell;
pub mod reconstruction;
pub mod schemas;
pub mod stackio;

pub use cellslice::{LabelId, Slice};
pub use coords::Coordinate;
pub use error::{ReconError, Result};
pub use labelmap::LabelMap;
pub use matcher::{link_layers, same_cell, LinkPolicy};
pub use reconcell::{IntensityStack, ReconstructedCell};
pub use reconstruction::{Reconstruction, ReconstructionConfig, SliceKey};
