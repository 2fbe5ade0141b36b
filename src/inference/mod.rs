//! inference — post-fit uncertainty and goodness of fit.
//!
//! Purpose
//! -------
//! Provide the statistics attached to a label estimate once the optimizer
//! has found a best fit: a covariance from the Gauss–Newton information
//! matrix and χ²-based fit quality.
//!
//! Key behaviors
//! -------------
//! - [`information_matrix`] builds `Jᵀ W J` from model derivatives and
//!   per-pixel weights; [`pseudo_inverse`] turns it into a covariance with
//!   eigenvalue truncation; [`parameter_covariance`] additionally flags
//!   parameters with no information and gives them unbounded variance;
//!   [`rescale_covariance`] maps it from working to label coordinates.
//! - [`chi_square`] and [`fit_statistics`] report χ², degrees of freedom,
//!   reduced χ² and the χ² survival probability.
//!
//! Conventions
//! -----------
//! - All routines are pure: no logging, no global state.
//! - Failures are reported through [`InferenceResult`].

pub mod covariance;
pub mod errors;
pub mod statistics;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::covariance::{
    information_matrix, parameter_covariance, pseudo_inverse, rescale_covariance,
    ParameterCovariance,
};
pub use self::errors::{InferenceError, InferenceResult};
pub use self::statistics::{chi_square, fit_statistics, FitStatistics};
