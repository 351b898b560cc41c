//! Error taxonomy for per-document conversion failures.

use thiserror::Error;

use crate::ocr::BackendKind;

/// Errors that fail a single document. None of these abort the batch.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unsupported or unreadable input: {0}")]
    Parse(String),

    #[error("{backend} request timed out")]
    Timeout { backend: BackendKind },

    #[error("{backend} request failed: {source}")]
    Http {
        backend: BackendKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{backend} error ({code}): {message}")]
    Provider {
        backend: BackendKind,
        code: String,
        message: String,
    },

    #[error("{backend} returned no recognized text")]
    EmptyResult { backend: BackendKind },

    #[error("input is {size} bytes, over the {limit} byte limit after compression")]
    Oversized { size: usize, limit: usize },

    #[error("page rasterization failed: {0}")]
    Rasterize(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ConvertError {
    /// Map a transport error, separating timeouts from other failures.
    pub fn from_reqwest(backend: BackendKind, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { backend }
        } else {
            Self::Http {
                backend,
                source: err,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
