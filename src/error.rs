use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconError>;

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Label stack contains no layers")]
    EmptyStack,

    #[error("Start layer {start} is out of range for a stack of {nlayers} layers")]
    StartLayerOutOfRange { start: usize, nlayers: usize },

    #[error("Layers must be extended in order: expected layer {expected}, got {requested}")]
    OutOfOrderExtend { expected: usize, requested: usize },

    #[error("Cannot extend from layer {layer}: stack only has {nlayers} layers")]
    StackExhausted { layer: usize, nlayers: usize },

    #[error("Reconstructed cell already holds a slice in layer {layer}")]
    LayerOccupied { layer: usize },

    #[error("Reconstructed cell has zero pixel area")]
    EmptyCell,

    #[error("No intensity data for layer {layer}")]
    MissingIntensityLayer { layer: usize },

    #[error("Pixel ({row}, {col}) is outside the intensity image for layer {layer}")]
    IntensityOutOfBounds { layer: usize, row: usize, col: usize },

    #[error("Unsupported pixel format {color} in '{}'", path.display())]
    UnsupportedImage { path: PathBuf, color: String },

    #[error("Intensity image '{}' has shape {found:?}, expected {expected:?}", path.display())]
    ShapeMismatch {
        path: PathBuf,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Malformed reconstruction record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Layer {layer} has no label {id}")]
    UnknownSlice { layer: usize, id: u32 },

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}
