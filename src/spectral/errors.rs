//! Errors for the spectral model (specification checks, input validation,
//! per-pixel fit failures, and inference failures).
//!
//! Two error types live here:
//! - [`SpectralError`]: fatal errors returned by public operations. They are
//!   raised before any fitting starts (bad term specification, invalid
//!   options, malformed inputs) or when a caller mixes incompatible objects
//!   (pivot or wavelength mismatches).
//! - [`PixelFitError`]: recoverable, per-pixel conditions produced by a
//!   single pixel fit. The trainer records them in the pixel status and keeps
//!   going; they never abort a training run.
//!
//! ## Conventions
//! - **Indices are 0-based**: `star` indexes the training set, `pixel` the
//!   wavelength grid, `index` the position inside the offending vector.
//! - Optimizer failures surface as [`SpectralError::Optimization`] wrapping
//!   the optimizer's own [`OptError`]; covariance and fit-statistic failures
//!   as [`SpectralError::Inference`].
use crate::{inference::errors::InferenceError, optimization::errors::OptError};

/// Result alias for spectral-model operations that may produce [`SpectralError`].
pub type SpectralResult<T> = Result<T, SpectralError>;

/// Fatal error type for the spectral model.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralError {
    // ---- Term specification ----
    /// Generic problem with the label-vector specification.
    InvalidSpecification { reason: String },

    /// A term or label set refers to a label that is not declared.
    UnknownLabel { name: String },

    /// The same label name is declared twice.
    DuplicateLabel { name: String },

    /// A term's total polynomial degree exceeds the declared degree.
    TermDegreeExceeded { term: String, degree: usize, max_degree: usize },

    /// A term string could not be parsed.
    InvalidTerm { term: String, reason: &'static str },

    // ---- Vectorizer compatibility ----
    /// Pivot values differ from the ones the vectorizer was frozen with.
    PivotMismatch { label: String, expected: f64, found: f64 },

    /// Label names or their order differ from the vectorizer's.
    LabelNameMismatch { expected: Vec<String>, found: Vec<String> },

    // ---- Input data validation ----
    /// The training set has no stars.
    EmptyTrainingSet,

    /// Spectrum length disagrees with the expected pixel count.
    PixelCountMismatch { expected: usize, found: usize },

    /// Wavelength grid disagrees with the model's grid.
    WavelengthMismatch { pixel: usize, expected: f64, found: f64 },

    /// Two vectors that must be aligned have different lengths.
    LengthMismatch { what: &'static str, expected: usize, found: usize },

    /// Inverse variance is negative or non-finite.
    InvalidInverseVariance { index: usize, value: f64 },

    /// Flux is non-finite at a pixel with positive inverse variance.
    NonFiniteFlux { index: usize, value: f64 },

    /// Wavelength grid entry is non-finite.
    NonFiniteWavelength { index: usize, value: f64 },

    /// A label value is non-finite.
    NonFiniteLabel { name: String, value: f64 },

    /// Censoring mask refers to a pixel outside the grid.
    InvalidCensoring { pixel: usize, n_pixels: usize },

    // ---- Options ----
    /// A configuration value is out of range.
    InvalidOption { name: &'static str, value: f64, reason: &'static str },

    // ---- Inference ----
    /// No pixel carries weight for this spectrum (all masked or unfit).
    NoUsablePixels,

    /// The label optimizer failed outright (not a budget exhaustion).
    Optimization(OptError),

    /// Covariance or fit statistics could not be computed.
    Inference(InferenceError),
}

impl std::error::Error for SpectralError {}

impl std::fmt::Display for SpectralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Term specification ----
            SpectralError::InvalidSpecification { reason } => {
                write!(f, "Invalid label-vector specification: {reason}")
            }
            SpectralError::UnknownLabel { name } => {
                write!(f, "Unknown label '{name}'")
            }
            SpectralError::DuplicateLabel { name } => {
                write!(f, "Label '{name}' is declared more than once")
            }
            SpectralError::TermDegreeExceeded { term, degree, max_degree } => {
                write!(f, "Term '{term}' has degree {degree}, above the declared maximum {max_degree}")
            }
            SpectralError::InvalidTerm { term, reason } => {
                write!(f, "Invalid term '{term}': {reason}")
            }
            // ---- Vectorizer compatibility ----
            SpectralError::PivotMismatch { label, expected, found } => {
                write!(f, "Pivot mismatch for label '{label}': expected {expected}, found {found}")
            }
            SpectralError::LabelNameMismatch { expected, found } => {
                write!(f, "Label names mismatch: expected {expected:?}, found {found:?}")
            }
            // ---- Input data validation ----
            SpectralError::EmptyTrainingSet => {
                write!(f, "Training set is empty.")
            }
            SpectralError::PixelCountMismatch { expected, found } => {
                write!(f, "Pixel count mismatch: expected {expected}, found {found}")
            }
            SpectralError::WavelengthMismatch { pixel, expected, found } => {
                write!(f, "Wavelength mismatch at pixel {pixel}: expected {expected}, found {found}")
            }
            SpectralError::LengthMismatch { what, expected, found } => {
                write!(f, "Length mismatch for {what}: expected {expected}, found {found}")
            }
            SpectralError::InvalidInverseVariance { index, value } => {
                write!(f, "Inverse variance at index {index} must be finite and >= 0; got: {value}")
            }
            SpectralError::NonFiniteFlux { index, value } => {
                write!(f, "Flux at index {index} is non-finite: {value}")
            }
            SpectralError::NonFiniteWavelength { index, value } => {
                write!(f, "Wavelength at index {index} is non-finite: {value}")
            }
            SpectralError::NonFiniteLabel { name, value } => {
                write!(f, "Label '{name}' is non-finite: {value}")
            }
            SpectralError::InvalidCensoring { pixel, n_pixels } => {
                write!(f, "Censored pixel {pixel} is outside the grid of {n_pixels} pixels")
            }
            // ---- Options ----
            SpectralError::InvalidOption { name, value, reason } => {
                write!(f, "Invalid option {name} = {value}: {reason}")
            }
            // ---- Inference ----
            SpectralError::NoUsablePixels => {
                write!(f, "No pixel carries weight: all pixels are masked or unfit.")
            }
            SpectralError::Optimization(err) => {
                write!(f, "Label optimization failed: {err}")
            }
            SpectralError::Inference(err) => {
                write!(f, "Label uncertainty failed: {err}")
            }
        }
    }
}

impl From<OptError> for SpectralError {
    fn from(err: OptError) -> Self {
        SpectralError::Optimization(err)
    }
}

impl From<InferenceError> for SpectralError {
    fn from(err: InferenceError) -> Self {
        SpectralError::Inference(err)
    }
}

/// Recoverable per-pixel fit failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelFitError {
    /// The weighted normal-equations matrix is numerically rank deficient,
    /// usually because too few stars remain unmasked for the number of
    /// design-matrix columns.
    SingularDesignMatrix { n_stars: usize, n_terms: usize },

    /// The scatter fixed point or its root search ran out of iterations.
    /// `last` is the last scatter estimate, still inside its search bounds.
    ScatterNotConverged { last: f64, iterations: usize },
}

impl std::error::Error for PixelFitError {}

impl std::fmt::Display for PixelFitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFitError::SingularDesignMatrix { n_stars, n_terms } => {
                write!(f, "Singular design matrix: {n_stars} usable stars for {n_terms} terms")
            }
            PixelFitError::ScatterNotConverged { last, iterations } => {
                write!(f, "Scatter did not converge after {iterations} iterations; last: {last}")
            }
        }
    }
}
