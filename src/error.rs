use std::path::PathBuf;

/// Everything that can go wrong at the I/O edge of a painting session.
///
/// Painting, filling, stamping and history never produce one of these: out of
/// range input is clamped and empty history is a no-op.
#[derive(Debug, thiserror::Error)]
pub enum PaintError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("persisted canvas is unreadable: {0}")]
    Persist(String),

    /// Raw bytes that do not describe exactly one full canvas.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("invalid canvas dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },

    #[error("no sticker at palette index {0}")]
    UnknownSticker(usize),

    #[error("script '{path}': {message}")]
    Script { path: PathBuf, message: String },
}

impl From<Box<bincode::ErrorKind>> for PaintError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        PaintError::Persist(e.to_string())
    }
}

pub type PaintResult<T> = Result<T, PaintError>;
