use thiserror::Error;

/// Crate-wide result alias, mirroring the teacher's `prelude::Result`.
pub type Result<T> = std::result::Result<T, AudiometaError>;

#[derive(Error, Debug)]
pub enum AudiometaError {
    #[error("unexpected end of stream")]
    EndOfStream,

    #[error("invalid magic number")]
    InvalidMagicNumber,

    #[error("invalid first FLAC block, must be STREAMINFO")]
    InvalidFirstBlock,

    #[error("invalid block type 0xff")]
    InvalidBlockType,

    #[error("invalid seek table size")]
    InvalidSeekTableSize,

    #[error("invalid picture type")]
    InvalidPictureType,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("no parser matched the byte source")]
    UnsupportedContainer,

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("parse cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    InvalidString(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl AudiometaError {
    /// Whether this error kind is tolerated mid-stream (downgraded to a
    /// warning by a parser instead of aborting the whole parse).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AudiometaError::Decode(_)
                | AudiometaError::UnsupportedFeature(_)
                | AudiometaError::InvalidPictureType
                | AudiometaError::InvalidSeekTableSize
        )
    }
}

/// A non-fatal defect recorded during a parse (spec.md §3 "Warnings").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Warning {
            message: message.into(),
        }
    }
}

impl From<&AudiometaError> for Warning {
    fn from(e: &AudiometaError) -> Self {
        Warning::new(e.to_string())
    }
}
