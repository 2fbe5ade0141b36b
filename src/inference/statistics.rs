//! Goodness-of-fit statistics for weighted least-squares fits.
//!
//! [`chi_square`] sums `wᵢ rᵢ²`; [`fit_statistics`] adds the residual
//! degrees of freedom, the reduced χ² and the upper-tail probability
//! `P(X ≥ χ²)` of a χ² distribution with those degrees of freedom.
//! Reduced χ² and p-value are `None` when no degrees of freedom remain.
use crate::inference::errors::{InferenceError, InferenceResult};
use ndarray::ArrayView1;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// χ² summary of one fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitStatistics {
    pub chi2: f64,
    pub dof: usize,
    pub reduced_chi2: Option<f64>,
    pub p_value: Option<f64>,
}

/// Weighted sum of squared residuals.
///
/// # Panics
/// - If `residuals` and `weights` differ in length.
pub fn chi_square(residuals: ArrayView1<f64>, weights: ArrayView1<f64>) -> f64 {
    assert_eq!(residuals.len(), weights.len(), "one weight per residual");
    residuals.iter().zip(weights.iter()).map(|(r, w)| w * r * r).sum()
}

/// fit_statistics — χ², degrees of freedom, reduced χ² and p-value.
///
/// Parameters
/// ----------
/// - `chi2`: weighted residual sum of squares, `>= 0`.
/// - `n_obs`: observations that carried weight.
/// - `n_params`: fitted parameters.
///
/// Errors
/// ------
/// - `InferenceError::InvalidChiSquare` for a negative or non-finite `chi2`.
/// - `InferenceError::Distribution` if the reference distribution cannot be
///   built.
pub fn fit_statistics(chi2: f64, n_obs: usize, n_params: usize) -> InferenceResult<FitStatistics> {
    if !chi2.is_finite() || chi2 < 0.0 {
        return Err(InferenceError::InvalidChiSquare { value: chi2 });
    }
    let dof = n_obs.saturating_sub(n_params);
    if dof == 0 {
        return Ok(FitStatistics { chi2, dof, reduced_chi2: None, p_value: None });
    }
    let reference = ChiSquared::new(dof as f64)
        .map_err(|e| InferenceError::Distribution { text: e.to_string() })?;
    Ok(FitStatistics {
        chi2,
        dof,
        reduced_chi2: Some(chi2 / dof as f64),
        p_value: Some(reference.sf(chi2)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn chi_square_weights_squared_residuals() {
        let r = array![1.0, -2.0, 0.5];
        let w = array![1.0, 0.25, 0.0];

        assert_eq!(chi_square(r.view(), w.view()), 2.0);
    }

    #[test]
    // Purpose
    // -------
    // With two degrees of freedom the χ² tail is exp(-x/2).
    fn fit_statistics_uses_chi_square_tail() {
        // Act
        let stats = fit_statistics(3.0, 5, 3).expect("valid inputs");

        // Assert
        assert_eq!(stats.dof, 2);
        assert_eq!(stats.reduced_chi2, Some(1.5));
        assert_relative_eq!(stats.p_value.expect("dof > 0"), (-1.5_f64).exp(), max_relative = 1e-10);
    }

    #[test]
    fn fit_statistics_without_dof_has_no_tail() {
        let stats = fit_statistics(0.0, 3, 3).expect("valid inputs");

        assert_eq!(stats, FitStatistics { chi2: 0.0, dof: 0, reduced_chi2: None, p_value: None });
    }

    #[test]
    fn fit_statistics_rejects_invalid_chi_square() {
        assert_eq!(
            fit_statistics(-1.0, 5, 1),
            Err(InferenceError::InvalidChiSquare { value: -1.0 })
        );
        assert!(fit_statistics(f64::NAN, 5, 1).is_err());
    }
}
