//! Result types of label inference.
//!
//! A [`LabelEstimate`] is created fresh by every inference call and owned by
//! the caller. Recoverable problems never turn into errors: they are listed
//! in [`LabelEstimate::warnings`] and, for optimizer budget exhaustion, in
//! the `converged` flag.
use crate::spectral::core::data::LabelSet;
use ndarray::{Array1, Array2};

/// Advisory condition attached to an estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceWarning {
    /// The best-fit value of `label` lies outside the training range
    /// `[min, max]`.
    LabelExtrapolation { label: String, value: f64, min: f64, max: f64 },

    /// The optimizer stopped on its iteration budget; the best iterate was
    /// returned.
    NonConvergent { iterations: usize },

    /// No usable pixel constrains these labels at the solution; their
    /// variance is reported as infinite.
    UnconstrainedLabels { labels: Vec<String> },
}

impl std::fmt::Display for InferenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceWarning::LabelExtrapolation { label, value, min, max } => {
                write!(f, "label '{label}' = {value} is outside the training range [{min}, {max}]")
            }
            InferenceWarning::NonConvergent { iterations } => {
                write!(f, "label optimizer did not converge in {iterations} iterations")
            }
            InferenceWarning::UnconstrainedLabels { labels } => {
                write!(f, "labels not constrained by the usable pixels: {}", labels.join(", "))
            }
        }
    }
}

/// Best-fit labels of one spectrum with their uncertainty and fit quality.
///
/// Fields
/// ------
/// - `labels`: best-fit labels, in the model's label order.
/// - `covariance`: `n_labels × n_labels` covariance from the Gauss–Newton
///   information at the solution. Labels listed in an
///   [`InferenceWarning::UnconstrainedLabels`] have `+∞` variance and `NaN`
///   covariances.
/// - `chi2`: `Σ w (flux − model)²` over the pixels used.
/// - `dof`: `n_pixels_used − n_labels` (0 when negative).
/// - `reduced_chi2`, `p_value`: `None` when `dof == 0`.
/// - `n_pixels_used`: pixels with `ivar > 0` whose model pixel is usable.
/// - `iterations`, `status`: optimizer iteration count and termination
///   status.
/// - `converged`: `false` when the iteration budget was exhausted.
/// - `warnings`: extrapolation, non-convergence and unconstrained-label
///   advisories.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEstimate {
    pub labels: LabelSet,
    pub covariance: Array2<f64>,
    pub chi2: f64,
    pub dof: usize,
    pub reduced_chi2: Option<f64>,
    pub p_value: Option<f64>,
    pub n_pixels_used: usize,
    pub iterations: usize,
    pub status: String,
    pub converged: bool,
    pub warnings: Vec<InferenceWarning>,
}

impl LabelEstimate {
    /// Square roots of the covariance diagonal (`+∞` for unconstrained
    /// labels).
    pub fn standard_errors(&self) -> Array1<f64> {
        self.covariance.diag().mapv(|v| v.max(0.0).sqrt())
    }

    /// Whether any label was flagged as extrapolated.
    pub fn is_extrapolated(&self) -> bool {
        self.warnings.iter().any(|w| matches!(w, InferenceWarning::LabelExtrapolation { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn estimate(warnings: Vec<InferenceWarning>) -> LabelEstimate {
        LabelEstimate {
            labels: LabelSet::from_pairs(&[("teff", 5000.0), ("logg", 2.0)]).expect("valid"),
            covariance: array![[400.0, 1.0], [1.0, 0.25]],
            chi2: 10.0,
            dof: 8,
            reduced_chi2: Some(1.25),
            p_value: Some(0.27),
            n_pixels_used: 10,
            iterations: 12,
            status: "SolverConverged".to_string(),
            converged: true,
            warnings,
        }
    }

    #[test]
    fn standard_errors_are_root_diagonal() {
        assert_eq!(estimate(Vec::new()).standard_errors(), array![20.0, 0.5]);
    }

    #[test]
    fn unconstrained_label_has_infinite_standard_error() {
        let mut est = estimate(Vec::new());
        est.covariance = array![[400.0, f64::NAN], [f64::NAN, f64::INFINITY]];

        let se = est.standard_errors();

        assert_eq!(se[0], 20.0);
        assert_eq!(se[1], f64::INFINITY);
    }

    #[test]
    fn extrapolation_flag_follows_warnings() {
        let flagged = estimate(vec![InferenceWarning::LabelExtrapolation {
            label: "teff".into(),
            value: 7000.0,
            min: 4000.0,
            max: 6000.0,
        }]);
        let budget = estimate(vec![InferenceWarning::NonConvergent { iterations: 5 }]);
        let flat = InferenceWarning::UnconstrainedLabels { labels: vec!["logg".into()] };

        assert!(flagged.is_extrapolated());
        assert!(!budget.is_extrapolated());
        assert_eq!(
            flagged.warnings[0].to_string(),
            "label 'teff' = 7000 is outside the training range [4000, 6000]"
        );
        assert_eq!(flat.to_string(), "labels not constrained by the usable pixels: logg");
    }
}
