use std::path::PathBuf;

use crate::shape::Shape;

/// All errors that can occur within sluice.
///
/// The variants follow the pipeline's failure taxonomy: configuration errors
/// are raised at construction or call time and never retried, lookup errors
/// report a missing ID, index or batch field, and loader/kernel failures are
/// propagated to the caller untouched. A single error type across the
/// workspace keeps `?` usable from the loader all the way to the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid construction-time option (unknown load mode, non-directory
    /// source, mismatched dropout probabilities, ...).
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No sample carries the requested identifier.
    #[error("ID {id} not found")]
    IdNotFound { id: String },

    /// Dataset index past the end.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A sample or batch lacks a required field.
    #[error("missing field '{key}'")]
    MissingField { key: String },

    /// A field exists but holds the wrong kind of value.
    #[error("field '{key}' is not {expected}")]
    FieldType { key: String, expected: &'static str },

    /// A sample loader failed for the given location.
    #[error("failed to load '{path}': {message}")]
    Load { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Shape mismatch between two tensors.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Element count mismatch when creating a tensor from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Dimension index out of range for the tensor's rank.
    #[error("dimension out of range: dim {dim} for tensor with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn missing_field(key: impl Into<String>) -> Self {
        Error::MissingField { key: key.into() }
    }

    pub fn id_not_found(id: impl std::fmt::Display) -> Self {
        Error::IdNotFound { id: id.to_string() }
    }

    /// Whether this error belongs to the configuration class.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }
}

/// Convenience Result type used throughout sluice.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
