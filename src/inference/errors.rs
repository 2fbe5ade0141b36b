//! Error handling for post-fit inference routines.
//!
//! `InferenceError` covers malformed information matrices and failures of
//! the χ² reference distribution. An alias `InferenceResult<T>` standardizes
//! the return type across covariance and fit-statistic code.

/// Error type for covariance and goodness-of-fit routines.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    // ---- Information matrix ----
    /// Information matrix is not `dim × dim`.
    InformationDimMismatch { expected: usize, found: (usize, usize) },

    /// Information matrix holds a non-finite entry.
    NonFiniteInformation { row: usize, col: usize, value: f64 },

    /// Jacobian rows and weights disagree in length.
    WeightLengthMismatch { expected: usize, found: usize },

    // ---- Fit statistics ----
    /// χ² statistic is negative or non-finite.
    InvalidChiSquare { value: f64 },

    /// The χ² reference distribution could not be built.
    Distribution { text: String },
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl std::error::Error for InferenceError {}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Information matrix ----
            InferenceError::InformationDimMismatch { expected, found } => write!(
                f,
                "Inference Error: information matrix must be {expected}x{expected}; got {}x{}",
                found.0, found.1
            ),
            InferenceError::NonFiniteInformation { row, col, value } => {
                write!(f, "Inference Error: information entry ({row}, {col}) is non-finite: {value}")
            }
            InferenceError::WeightLengthMismatch { expected, found } => {
                write!(f, "Inference Error: expected {expected} weights, found {found}")
            }

            // ---- Fit statistics ----
            InferenceError::InvalidChiSquare { value } => {
                write!(f, "Inference Error: chi-square must be finite and >= 0; got {value}")
            }
            InferenceError::Distribution { text } => {
                write!(f, "Inference Error: chi-square distribution: {text}")
            }
        }
    }
}
