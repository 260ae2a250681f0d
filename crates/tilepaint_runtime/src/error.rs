use thiserror::Error;
use tilepaint_brush::BrushError;
use tilepaint_core::GridError;

/// Errors raised by painting operations and configuration loading
#[derive(Debug, Error)]
pub enum PaintError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Brush(#[from] BrushError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<toml::de::Error> for PaintError {
    fn from(err: toml::de::Error) -> Self {
        PaintError::Config(err.to_string())
    }
}
