use crate::constants::{USER_MESSAGE_NOT_ALLOWED, USER_MESSAGE_NOT_PROCESSED};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image could not be decoded: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("JPEG encoding failed: {0}")]
    JpegEncode(#[source] image::ImageError),

    #[error("PNG encoding failed: {0}")]
    PngEncode(#[from] png::EncodingError),

    #[error("PNG optimization error: {0}")]
    PngOptimization(String),

    #[error("Unsupported file extension: {0:?}. Allowed: .jpg, .jpeg, .png, .gif")]
    UnsupportedExtension(String),

    #[error("Uploaded file is empty")]
    EmptyUpload,

    #[error("No compression levels to try")]
    EmptyLadder,

    #[error("Invalid byte budget: {0}. Must be greater than zero")]
    InvalidBudget(u64),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Failed to persist file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl CompressionError {
    /// Message safe to show to an admin user. Internal details stay in the
    /// `Display` output and the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            CompressionError::UnsupportedExtension(_) => USER_MESSAGE_NOT_ALLOWED,
            _ => USER_MESSAGE_NOT_PROCESSED,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
