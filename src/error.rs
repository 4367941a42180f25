use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GruError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
    #[error("Column window {offset}..{end} exceeds tensor width {width}")]
    ColumnsOutOfBounds {
        offset: usize,
        end: usize,
        width: usize,
    },
    #[error("Row window {start}..{end} exceeds tensor height {rows}")]
    RowsOutOfBounds {
        start: usize,
        end: usize,
        rows: usize,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid value {value:?} for property {key:?}")]
    InvalidProperty { key: String, value: String },
    #[error("Unknown property: {0}")]
    UnknownProperty(String),
    #[error("Timestep {timestep} out of range for max timestep {max_timestep}")]
    TimestepOutOfRange { timestep: usize, max_timestep: usize },
    #[error("Backward sweep out of order: expected timestep {expected}, got {actual}")]
    SweepOrder { expected: usize, actual: usize },
    #[error("Backward sweep already passed timestep 0, got timestep {0}")]
    SweepExhausted(usize),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GruError {
    pub fn shape_mismatch(expected: impl Into<Vec<usize>>, actual: impl Into<Vec<usize>>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn invalid_property(key: &str, value: &str) -> Self {
        Self::InvalidProperty {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GruError>;
