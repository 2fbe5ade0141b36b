//! Errors for model persistence.
//!
//! `StoreError` separates encoding failures (Arrow, JSON) from content
//! problems in a stream that decoded cleanly (missing metadata, unknown
//! format version, malformed columns) and from models that fail their own
//! consistency checks after decoding.
use crate::spectral::errors::SpectralError;
use arrow::error::ArrowError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    // ---- Encoding ----
    /// Arrow IPC read or write failure.
    Arrow { text: String },

    /// Vectorizer description could not be (de)serialized.
    Json { text: String },

    // ---- Content ----
    /// A required schema metadata key is absent.
    MissingMetadata { key: &'static str },

    /// The stream is not a spectral model.
    UnsupportedFormat { found: String },

    /// The stream was written by an incompatible format version.
    UnsupportedVersion { found: String },

    /// A required column is absent.
    MissingColumn { name: &'static str },

    /// A column has the wrong type, width or null entries.
    InvalidColumn { name: &'static str, reason: &'static str },

    /// A pixel status code is unknown.
    InvalidStatus { pixel: usize, code: u8 },

    // ---- Model ----
    /// The decoded model failed validation.
    Model(SpectralError),
}

impl std::error::Error for StoreError {}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Encoding ----
            StoreError::Arrow { text } => write!(f, "Arrow IPC error: {text}"),
            StoreError::Json { text } => write!(f, "Vectorizer description error: {text}"),

            // ---- Content ----
            StoreError::MissingMetadata { key } => {
                write!(f, "Model stream is missing metadata key '{key}'")
            }
            StoreError::UnsupportedFormat { found } => {
                write!(f, "Stream is not a spectral model (format tag '{found}')")
            }
            StoreError::UnsupportedVersion { found } => {
                write!(f, "Unsupported model format version '{found}'")
            }
            StoreError::MissingColumn { name } => write!(f, "Model stream has no '{name}' column"),
            StoreError::InvalidColumn { name, reason } => {
                write!(f, "Invalid '{name}' column: {reason}")
            }
            StoreError::InvalidStatus { pixel, code } => {
                write!(f, "Unknown status code {code} at pixel {pixel}")
            }

            // ---- Model ----
            StoreError::Model(err) => write!(f, "Decoded model is inconsistent: {err}"),
        }
    }
}

impl From<ArrowError> for StoreError {
    fn from(err: ArrowError) -> Self {
        StoreError::Arrow { text: err.to_string() }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Json { text: err.to_string() }
    }
}

impl From<SpectralError> for StoreError {
    fn from(err: SpectralError) -> Self {
        StoreError::Model(err)
    }
}
