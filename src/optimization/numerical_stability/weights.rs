//! Guarded weights and convergence measures.

use ndarray::ArrayView1;

/// Relative eigenvalue cutoff for pseudo-inverses.
///
/// Eigenvalues below `EIGEN_EPS * λ_max` are treated as zero when inverting
/// an information matrix, so poorly constrained directions report a zero
/// variance contribution instead of an enormous one.
pub const EIGEN_EPS: f64 = 1e-12;

/// Floor used in place of a zero denominator in relative comparisons.
pub const GENERAL_TOL: f64 = 1e-12;

/// Regression weight of one observation given its inverse variance and an
/// intrinsic scatter `s`.
///
/// Computes `ivar / (1 + ivar · s²)`, which equals `1 / (σ² + s²)` for
/// `ivar = 1/σ² > 0` and is exactly `0` for masked observations.
///
/// # Parameters
/// - `ivar`: inverse variance, finite and `≥ 0`.
/// - `scatter`: intrinsic scatter `s`, finite and `≥ 0`.
pub fn scatter_weight(ivar: f64, scatter: f64) -> f64 {
    if ivar <= 0.0 {
        return 0.0;
    }
    ivar / (1.0 + ivar * scatter * scatter)
}

/// Relative change `|new - old| / max(|old|, GENERAL_TOL)`.
pub fn relative_change(new: f64, old: f64) -> f64 {
    (new - old).abs() / old.abs().max(GENERAL_TOL)
}

/// Largest elementwise change between two vectors, relative to the vector
/// scale `max(‖old‖∞, GENERAL_TOL)`.
///
/// Normalizing by the vector scale rather than per element keeps
/// coefficients that are legitimately near zero from dominating the
/// measure.
///
/// # Panics
/// - If `new` and `old` have different lengths.
pub fn max_relative_change(new: ArrayView1<f64>, old: ArrayView1<f64>) -> f64 {
    assert_eq!(new.len(), old.len(), "vectors must have equal length");
    let scale = old.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(GENERAL_TOL);
    new.iter().zip(old.iter()).fold(0.0_f64, |acc, (n, o)| acc.max((n - o).abs())) / scale
}
