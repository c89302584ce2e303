use std::fmt;

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, GanError>;

#[derive(Debug, thiserror::Error)]
pub enum GanError {
    /// Input tables are empty, malformed or share no records
    #[error("data format error: {0}")]
    DataFormat(String),

    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("models are not trained, train or load a checkpoint first")]
    ModelsNotTrained,

    #[error("invalid argument: {0}")]
    InvalidArgument(FieldViolation),

    #[error("unknown category {value:?} for column {column}")]
    UnknownCategory { column: String, value: String },

    /// A single value could not be mapped back to original units
    #[error("transform error: {0}")]
    Transform(String),

    /// Checkpoint on disk is incomplete or was built for other dimensions
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("tensor error: {0}")]
    Tensor(String),

    #[error("lock poisoned: {0}")]
    Poisoned(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Recorder(#[from] burn::record::RecorderError),

    #[error(transparent)]
    Postcard(#[from] postcard::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl GanError {
    pub fn invalid(field: &'static str, code: ViolationCode, message: impl Into<String>) -> Self {
        Self::InvalidArgument(FieldViolation::new(field, code, message))
    }

    /// Errors caused by the caller's input rather than by the engine
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DataFormat(_)
                | Self::ShapeMismatch { .. }
                | Self::InvalidArgument(_)
                | Self::UnknownCategory { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    Required,
    OutOfRange,
    NotAllowed,
}

/// A single rejected request field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: ViolationCode,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}): {}", self.field, self.code, self.message)
    }
}
