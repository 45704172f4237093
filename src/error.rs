// Casefile Media Error Types

use thiserror::Error;

/// A rejected EditSpec. Always recoverable by the caller adjusting input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("rotation {0} is outside [-360, 360]")]
    RotationOutOfRange(f32),

    #[error("{field} {value} is outside [0, 200]")]
    AdjustmentOutOfRange { field: &'static str, value: f32 },

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("crop {field} {value} is outside [{min}, 100]")]
    CropFieldOutOfRange { field: &'static str, value: f32, min: f32 },

    #[error("crop exceeds image bounds: {axis} + extent = {total}")]
    CropOutOfBounds { axis: &'static str, total: f32 },

    #[error("crop resolves to no pixels on a {canvas_width}x{canvas_height} canvas: {reason}")]
    CropTooSmall { canvas_width: u32, canvas_height: u32, reason: String },

    #[error("source has zero-sized dimensions {0}x{1}")]
    EmptySource(u32, u32),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Invalid edit: {0}")]
    Validation(#[from] ValidationError),

    #[error("Asset not found: {0}")]
    NotFound(i64),

    #[error("Edit is a no-op; update metadata instead")]
    NoOpEdit,

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Lineage error: {0}")]
    Lineage(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for MediaError {
    fn from(err: anyhow::Error) -> Self {
        MediaError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
