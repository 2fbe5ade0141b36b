//! Inferencer — best-fit labels of a new spectrum under a trained model.
//!
//! Purpose
//! -------
//! Maximize `ℓ(x) = −½ Σ_p w_p (f_p − m_p(x))²` over the labels `x`, where
//! `m_p(x) = c_p · row(x)` is the trained pixel polynomial and
//! `w_p = ivar_p / (1 + ivar_p s_p²)` combines the spectrum's inverse
//! variance with the pixel's intrinsic scatter.
//!
//! Key behaviors
//! -------------
//! - Only pixels with `ivar > 0` and a usable model pixel enter the sum;
//!   masked and unfit pixels carry zero weight.
//! - The search runs in working coordinates `θ = (x − pivot) / scale` with
//!   the analytic gradient `∇θ ℓ = S Jᵀ W (f − m)`, `J = C · ∂row/∂x`.
//! - The start defaults to the pivot labels (`θ = 0`).
//! - The covariance is the pseudo-inverse of `Jᵀ W J` at the solution,
//!   mapped back to label units. Labels the usable pixels do not constrain
//!   get infinite variance and an [`InferenceWarning::UnconstrainedLabels`].
//! - An exhausted iteration budget yields `converged == false` plus an
//!   [`InferenceWarning::NonConvergent`]; labels outside the training range
//!   yield [`InferenceWarning::LabelExtrapolation`]. Both are logged with
//!   `warn!` and the estimate is still returned.
//!
//! Invariants & assumptions
//! ------------------------
//! - The model is borrowed immutably; concurrent inference calls share it
//!   without synchronization.
//! - The spectrum must be on the model's wavelength grid (compared exactly).
//!
//! Downstream usage
//! ----------------
//! - Batch callers use [`Inferencer::infer_batch`], which returns one
//!   independent result per spectrum so a failing star never aborts the
//!   batch.
use crate::{
    inference::{
        covariance::{information_matrix, parameter_covariance, rescale_covariance},
        statistics::{chi_square, fit_statistics},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{maximize, Grad, LogLikelihood, Theta},
        numerical_stability::scatter_weight,
    },
    spectral::{
        core::{
            data::{ensure_same_grid, LabelSet, Spectrum},
            options::InferOptions,
            vectorizer::LabelVectorizer,
        },
        errors::{SpectralError, SpectralResult},
        models::{
            estimate::{InferenceWarning, LabelEstimate},
            trained::Model,
        },
    },
};
use log::warn;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;

/// Label inference against one trained model.
#[derive(Debug, Clone)]
pub struct Inferencer<'m> {
    model: &'m Model,
    options: InferOptions,
    coefficients: Array2<f64>,
    scatter: Array1<f64>,
    usable: Vec<bool>,
}

impl<'m> Inferencer<'m> {
    pub fn new(model: &'m Model, options: InferOptions) -> Self {
        Self {
            model,
            options,
            coefficients: model.coefficient_matrix(),
            scatter: model.scatter(),
            usable: model.pixels().iter().map(|p| p.status.is_usable()).collect(),
        }
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn options(&self) -> &InferOptions {
        &self.options
    }

    /// infer — best-fit labels for one spectrum.
    ///
    /// Parameters
    /// ----------
    /// - `spectrum`: observed spectrum on the model's grid.
    /// - `initial`: optional starting labels; defaults to the pivots.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::PixelCountMismatch` / `WavelengthMismatch` for a
    ///   spectrum on another grid.
    /// - `SpectralError::LabelNameMismatch` for an initial guess with other
    ///   label names.
    /// - `SpectralError::NoUsablePixels` when every pixel is masked or unfit.
    /// - `SpectralError::Optimization` when the optimizer fails outright
    ///   (budget exhaustion is not an error).
    pub fn infer(
        &self, spectrum: &Spectrum, initial: Option<&LabelSet>,
    ) -> SpectralResult<LabelEstimate> {
        let vectorizer = self.model.vectorizer();
        ensure_same_grid(self.model.wavelength(), spectrum.wavelength())?;
        let theta0 = match initial {
            Some(labels) => {
                labels.ensure_names(vectorizer.label_names())?;
                vectorizer.to_working(labels.values())
            }
            None => Array1::zeros(vectorizer.n_labels()),
        };
        let data = self.select_pixels(spectrum)?;

        let objective = LabelObjective { vectorizer };
        let outcome = maximize(&objective, theta0, &data, &self.options.mle)?;

        let theta_hat = outcome.theta_hat;
        let values = vectorizer.from_working(theta_hat.view());
        let residuals = objective.residuals(&theta_hat, &data);
        let chi2 = chi_square(residuals.view(), data.weights.view());
        let stats = fit_statistics(chi2, data.n_used(), vectorizer.n_labels())?;
        let jacobian = objective.model_jacobian(&theta_hat, &data);
        let info = information_matrix(jacobian.view(), data.weights.view())?;
        let working = parameter_covariance(&info)?;
        let covariance = rescale_covariance(&working.covariance, vectorizer.scales());

        let mut warnings = Vec::new();
        if !outcome.converged {
            warn!(
                "label inference stopped after {} iterations without converging ({})",
                outcome.iterations, outcome.status
            );
            warnings.push(InferenceWarning::NonConvergent { iterations: outcome.iterations });
        }
        if !working.unconstrained.is_empty() {
            let labels: Vec<String> = working
                .unconstrained
                .iter()
                .map(|&i| vectorizer.label_names()[i].clone())
                .collect();
            warn!("labels [{}] are not constrained by the usable pixels", labels.join(", "));
            warnings.push(InferenceWarning::UnconstrainedLabels { labels });
        }
        let (lower, upper) = vectorizer.label_bounds();
        for i in vectorizer.outside_bounds(values.view()) {
            let label = vectorizer.label_names()[i].clone();
            warn!(
                "label '{label}' = {} extrapolates beyond the training range [{}, {}]",
                values[i], lower[i], upper[i]
            );
            warnings.push(InferenceWarning::LabelExtrapolation {
                label,
                value: values[i],
                min: lower[i],
                max: upper[i],
            });
        }

        Ok(LabelEstimate {
            labels: LabelSet::from_validated(vectorizer.label_names().to_vec(), values),
            covariance,
            chi2: stats.chi2,
            dof: stats.dof,
            reduced_chi2: stats.reduced_chi2,
            p_value: stats.p_value,
            n_pixels_used: data.n_used(),
            iterations: outcome.iterations,
            status: outcome.status,
            converged: outcome.converged,
            warnings,
        })
    }

    /// infer_batch — independent inference for many spectra.
    ///
    /// Runs on the rayon pool when `InferOptions::parallel` is set. Results
    /// are in input order; each entry fails or succeeds on its own.
    pub fn infer_batch(
        &self, spectra: &[Spectrum], initial: Option<&LabelSet>,
    ) -> Vec<SpectralResult<LabelEstimate>> {
        if self.options.parallel {
            spectra.par_iter().map(|s| self.infer(s, initial)).collect()
        } else {
            spectra.iter().map(|s| self.infer(s, initial)).collect()
        }
    }

    // Weighted pixels of one spectrum that take part in the fit.
    fn select_pixels(&self, spectrum: &Spectrum) -> SpectralResult<StarPixels> {
        let ivar = spectrum.ivar();
        let used: Vec<usize> =
            (0..ivar.len()).filter(|&p| self.usable[p] && ivar[p] > 0.0).collect();
        if used.is_empty() {
            return Err(SpectralError::NoUsablePixels);
        }
        let flux = spectrum.flux();
        Ok(StarPixels {
            coefficients: self.coefficients.select(Axis(0), &used),
            flux: used.iter().map(|&p| flux[p]).collect(),
            weights: used.iter().map(|&p| scatter_weight(ivar[p], self.scatter[p])).collect(),
        })
    }
}

/// Pixels of one spectrum entering the label fit.
#[derive(Debug, Clone, PartialEq)]
pub struct StarPixels {
    coefficients: Array2<f64>,
    flux: Array1<f64>,
    weights: Array1<f64>,
}

impl StarPixels {
    fn n_used(&self) -> usize {
        self.flux.len()
    }
}

/// `ℓ(θ) = −½ χ²(θ)` in working coordinates.
#[derive(Debug, Clone, Copy)]
pub struct LabelObjective<'a> {
    vectorizer: &'a LabelVectorizer,
}

impl LabelObjective<'_> {
    fn residuals(&self, theta: &Theta, data: &StarPixels) -> Array1<f64> {
        let values = self.vectorizer.from_working(theta.view());
        let row = self.vectorizer.design_row_values(values.view());
        &data.flux - &data.coefficients.dot(&row)
    }

    // ∂m/∂θ, `n_used × n_labels`.
    fn model_jacobian(&self, theta: &Theta, data: &StarPixels) -> Array2<f64> {
        let values = self.vectorizer.from_working(theta.view());
        let mut jac = data.coefficients.dot(&self.vectorizer.design_jacobian(values.view()));
        for (mut column, &scale) in jac.axis_iter_mut(Axis(1)).zip(self.vectorizer.scales()) {
            column *= scale;
        }
        jac
    }
}

impl LogLikelihood for LabelObjective<'_> {
    type Data = StarPixels;

    fn value(&self, theta: &Theta, data: &StarPixels) -> OptResult<f64> {
        let residuals = self.residuals(theta, data);
        Ok(-0.5 * chi_square(residuals.view(), data.weights.view()))
    }

    fn check(&self, theta: &Theta, data: &StarPixels) -> OptResult<()> {
        if theta.len() != self.vectorizer.n_labels() {
            return Err(OptError::ObjectiveFailed {
                text: format!(
                    "expected {} labels, found {}",
                    self.vectorizer.n_labels(),
                    theta.len()
                ),
            });
        }
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(OptError::InvalidThetaHat {
                index,
                value,
                reason: "Initial labels must be finite.",
            });
        }
        if data.n_used() == 0 {
            return Err(OptError::ObjectiveFailed { text: "no weighted pixels".to_string() });
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &StarPixels) -> OptResult<Grad> {
        let weighted = &self.residuals(theta, data) * &data.weights;
        Ok(self.model_jacobian(theta, data).t().dot(&weighted))
    }
}
