//! inference::covariance — label covariance from the Gauss–Newton
//! information matrix.
//!
//! Purpose
//! -------
//! Turn the local linearization of a weighted least-squares fit into a
//! parameter covariance. For residuals `r(θ)` with Jacobian `J = ∂m/∂θ` and
//! weights `W`, the Gauss–Newton information is `I = Jᵀ W J`, and the
//! covariance estimate is its Moore–Penrose pseudo-inverse `I⁺`.
//!
//! Key behaviors
//! -------------
//! - [`information_matrix`] accumulates `Jᵀ W J` row by row.
//! - [`pseudo_inverse`] copies `I` into a `nalgebra::DMatrix`, takes a
//!   symmetric eigendecomposition and sums `q qᵀ / λ` over eigenvalues above
//!   `EIGEN_EPS · λ_max`.
//! - [`parameter_covariance`] does the same and additionally reports the
//!   parameters that load on a dropped (null-space) direction. Their
//!   variance is unbounded: the diagonal entry is `+∞` and the rest of the
//!   row and column is `NaN`.
//! - [`rescale_covariance`] maps a covariance in scaled coordinates
//!   `θ = (x − p) / s` back to `x` via `Cov(x) = S Cov(θ) S`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `I` is symmetric by construction; no re-symmetrization is done before
//!   the eigendecomposition.
//! - Weakly identified directions (tiny eigenvalues) are never inverted.
//!   [`pseudo_inverse`] drops them; [`parameter_covariance`] marks every
//!   parameter they touch as unconstrained.
//!
//! Conventions
//! -----------
//! - No explicit matrix inverse is formed.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::numerical_stability::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Squared null-space loading above which a parameter is unconstrained.
const NULL_LOADING_TOL: f64 = 1e-6;

/// Covariance with the parameters the information does not constrain.
///
/// - `covariance`: pseudo-inverse of the information; rows and columns of
///   unconstrained parameters are `NaN` with `+∞` on the diagonal.
/// - `unconstrained`: indices of those parameters, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCovariance {
    pub covariance: Array2<f64>,
    pub unconstrained: Vec<usize>,
}

/// information_matrix — `Jᵀ W J` for a diagonal weight matrix.
///
/// Parameters
/// ----------
/// - `jacobian`: `n_obs × n_params` derivatives of the model.
/// - `weights`: length-`n_obs` non-negative weights.
///
/// Errors
/// ------
/// - `InferenceError::WeightLengthMismatch` when `weights.len()` differs
///   from the number of Jacobian rows.
pub fn information_matrix(
    jacobian: ArrayView2<f64>, weights: ArrayView1<f64>,
) -> InferenceResult<Array2<f64>> {
    let (n_obs, n_params) = jacobian.dim();
    if weights.len() != n_obs {
        return Err(InferenceError::WeightLengthMismatch { expected: n_obs, found: weights.len() });
    }
    let mut info = Array2::<f64>::zeros((n_params, n_params));
    for (row, &w) in jacobian.outer_iter().zip(weights.iter()) {
        if w == 0.0 {
            continue;
        }
        for i in 0..n_params {
            let wi = w * row[i];
            for j in 0..=i {
                info[[i, j]] += wi * row[j];
            }
        }
    }
    for i in 0..n_params {
        for j in 0..i {
            info[[j, i]] = info[[i, j]];
        }
    }
    Ok(info)
}

/// pseudo_inverse — Moore–Penrose inverse of a symmetric PSD matrix.
///
/// Eigenvalues `λ_k <= EIGEN_EPS · max(λ_max, 1)` are treated as zero:
/// `I⁺ = Σ_{λ_k kept} q_k q_kᵀ / λ_k`.
///
/// Errors
/// ------
/// - `InferenceError::InformationDimMismatch` for a non-square matrix.
/// - `InferenceError::NonFiniteInformation` for a non-finite entry.
pub fn pseudo_inverse(info: &Array2<f64>) -> InferenceResult<Array2<f64>> {
    eigen_inverse(info).map(|(pinv, _)| pinv)
}

/// parameter_covariance — pseudo-inverse plus unconstrained parameters.
///
/// A parameter is unconstrained when the squared components of the dropped
/// eigenvectors along it sum above `NULL_LOADING_TOL`: moving it leaves the
/// fit unchanged to first order, so its variance is unbounded.
///
/// Errors
/// ------
/// Same as [`pseudo_inverse`].
pub fn parameter_covariance(info: &Array2<f64>) -> InferenceResult<ParameterCovariance> {
    let (mut covariance, null_loading) = eigen_inverse(info)?;
    let unconstrained: Vec<usize> = null_loading
        .iter()
        .enumerate()
        .filter(|(_, &loading)| loading > NULL_LOADING_TOL)
        .map(|(i, _)| i)
        .collect();
    for &i in &unconstrained {
        covariance.row_mut(i).fill(f64::NAN);
        covariance.column_mut(i).fill(f64::NAN);
        covariance[[i, i]] = f64::INFINITY;
    }
    Ok(ParameterCovariance { covariance, unconstrained })
}

// Pseudo-inverse and, per parameter, the squared loading on dropped
// eigenvectors.
fn eigen_inverse(info: &Array2<f64>) -> InferenceResult<(Array2<f64>, Array1<f64>)> {
    let n = info.nrows();
    if info.ncols() != n {
        return Err(InferenceError::InformationDimMismatch {
            expected: n,
            found: (info.nrows(), info.ncols()),
        });
    }
    for ((row, col), &value) in info.indexed_iter() {
        if !value.is_finite() {
            return Err(InferenceError::NonFiniteInformation { row, col, value });
        }
    }

    let info_nalg = DMatrix::from_fn(n, n, |i, j| info[[i, j]]);
    let eigen_decomp = info_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let eigenvals = eigen_decomp.eigenvalues;
    let cutoff = EIGEN_EPS * eigenvals.iter().fold(1.0_f64, |acc, &l| acc.max(l));

    let mut cov = Array2::<f64>::zeros((n, n));
    let mut null_loading = Array1::<f64>::zeros(n);
    for (k, &lambda) in eigenvals.iter().enumerate() {
        if lambda <= cutoff {
            for i in 0..n {
                null_loading[i] += q[(i, k)] * q[(i, k)];
            }
            continue;
        }
        for i in 0..n {
            let coeff = q[(i, k)] / lambda;
            for j in 0..n {
                cov[[i, j]] += coeff * q[(j, k)];
            }
        }
    }
    Ok((cov, null_loading))
}

/// Covariance of `x = p + s ⊙ θ` given the covariance of `θ`.
///
/// # Panics
/// - If `scales.len()` differs from the covariance dimension.
pub fn rescale_covariance(cov: &Array2<f64>, scales: &[f64]) -> Array2<f64> {
    assert_eq!(cov.nrows(), scales.len(), "one scale per parameter");
    Array2::from_shape_fn(cov.dim(), |(i, j)| cov[[i, j]] * scales[i] * scales[j])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Jᵀ W J against a direct matrix product.
    // - Pseudo-inverse of full-rank and rank-deficient information.
    // - Unbounded variance for parameters the information does not reach.
    // - Rescaling from working to label coordinates.
    // -------------------------------------------------------------------------

    #[test]
    fn information_matrix_matches_dense_product() {
        let j = array![[1.0, 2.0], [0.5, -1.0], [3.0, 0.0]];
        let w = array![2.0, 0.0, 1.0];

        let info = information_matrix(j.view(), w.view()).expect("aligned inputs");

        let dense = j.t().dot(&Array2::from_diag(&w)).dot(&j);
        assert_eq!(info, dense);
    }

    #[test]
    fn information_matrix_checks_weight_length() {
        let j = array![[1.0], [2.0]];
        let w = array![1.0];

        assert_eq!(
            information_matrix(j.view(), w.view()),
            Err(InferenceError::WeightLengthMismatch { expected: 2, found: 1 })
        );
    }

    #[test]
    // Purpose
    // -------
    // For a full-rank SPD matrix the pseudo-inverse is the inverse.
    fn pseudo_inverse_of_full_rank_matrix_is_inverse() {
        // Arrange
        let a = array![[4.0, 1.0], [1.0, 3.0]];

        // Act
        let inv = pseudo_inverse(&a).expect("finite square matrix");

        // Assert
        let eye = a.dot(&inv);
        assert_relative_eq!(eye[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(eye[[1, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(eye[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(inv[[0, 1]], inv[[1, 0]], epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // A flat direction is dropped instead of producing an infinite variance.
    fn pseudo_inverse_drops_flat_directions() {
        // Arrange: rank one, flat along (1, -1).
        let a = array![[1.0, 1.0], [1.0, 1.0]];

        // Act
        let pinv = pseudo_inverse(&a).expect("finite square matrix");

        // Assert: A⁺ = A / 4.
        for v in pinv.iter() {
            assert_relative_eq!(*v, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // A parameter with no information gets infinite variance and is reported;
    // the constrained block keeps its ordinary inverse.
    fn parameter_covariance_marks_parameters_without_information() {
        // Arrange
        let info = array![[4.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 2.0]];

        // Act
        let out = parameter_covariance(&info).expect("finite square matrix");

        // Assert
        assert_eq!(out.unconstrained, vec![1]);
        assert_eq!(out.covariance[[1, 1]], f64::INFINITY);
        assert!(out.covariance[[0, 1]].is_nan() && out.covariance[[1, 2]].is_nan());
        assert_relative_eq!(out.covariance[[0, 0]], 0.25, epsilon = 1e-12);
        assert_relative_eq!(out.covariance[[2, 2]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(out.covariance[[0, 2]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn parameter_covariance_flags_both_sides_of_a_degenerate_pair() {
        let info = array![[1.0, 1.0], [1.0, 1.0]];

        let out = parameter_covariance(&info).expect("finite square matrix");

        assert_eq!(out.unconstrained, vec![0, 1]);
        assert!(out.covariance.diag().iter().all(|v| *v == f64::INFINITY));
    }

    #[test]
    fn parameter_covariance_of_full_rank_matrix_is_plain_inverse() {
        let info = array![[4.0, 1.0], [1.0, 3.0]];

        let out = parameter_covariance(&info).expect("finite square matrix");

        assert!(out.unconstrained.is_empty());
        assert_eq!(out.covariance, pseudo_inverse(&info).expect("finite square matrix"));
    }

    #[test]
    fn pseudo_inverse_rejects_bad_input() {
        let nan = array![[1.0, f64::NAN], [f64::NAN, 1.0]];
        let rect = Array2::<f64>::zeros((2, 3));

        assert!(matches!(
            pseudo_inverse(&nan),
            Err(InferenceError::NonFiniteInformation { row: 0, col: 1, .. })
        ));
        assert!(matches!(
            pseudo_inverse(&rect),
            Err(InferenceError::InformationDimMismatch { expected: 2, found: (2, 3) })
        ));
    }

    #[test]
    fn rescale_covariance_applies_scales_on_both_sides() {
        let cov = array![[1.0, 0.5], [0.5, 2.0]];

        let out = rescale_covariance(&cov, &[10.0, 0.1]);

        let expected = array![[100.0, 0.5], [0.5, 0.02]];
        for (o, e) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(*o, *e, max_relative = 1e-14);
        }
    }
}
