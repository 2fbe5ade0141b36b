//! numerical_stability — shared tolerances and guarded arithmetic.
//!
//! Purpose
//! -------
//! Collect the small numerical tolerances and scalar helpers that the pixel
//! fits, the covariance estimator and the fixed-point iterations share, so
//! every layer applies the same guards.
//!
//! Key behaviors
//! -------------
//! - [`scatter_weight`]: regression weight `1 / (σ² + s²)` written in terms
//!   of the inverse variance, so masked pixels (`ivar = 0`) get exactly zero
//!   weight without dividing by zero.
//! - [`relative_change`] / [`max_relative_change`]: convergence measures for
//!   the coefficient/scatter fixed point that stay finite when the previous
//!   value is zero.
//! - Constants [`EIGEN_EPS`] and [`GENERAL_TOL`].
//!
//! Conventions
//! -----------
//! - Pure functions on `f64` and `ndarray` views; no logging, no I/O.

pub mod weights;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::weights::{
    max_relative_change, relative_change, scatter_weight, EIGEN_EPS, GENERAL_TOL,
};

pub mod prelude {
    pub use super::weights::{
        max_relative_change, relative_change, scatter_weight, EIGEN_EPS, GENERAL_TOL,
    };
}
