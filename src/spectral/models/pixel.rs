//! PixelModel — weighted regression of one pixel with intrinsic scatter.
//!
//! Purpose
//! -------
//! Fit the flux of a single wavelength pixel across the training stars as a
//! linear function of the design-matrix row, while estimating the pixel's
//! intrinsic scatter `s`. Each pixel is independent, so this module knows
//! nothing about other pixels, censoring policy or parallelism.
//!
//! Key behaviors
//! -------------
//! - [`PixelData::new`] keeps only stars with `ivar > 0`; masked stars never
//!   enter a fit.
//! - [`solve_weighted_least_squares`] minimizes `Σ wᵢ (yᵢ − xᵢ·β)²` through an
//!   SVD of the column-scaled, weight-scaled design and reports
//!   [`PixelFitError::SingularDesignMatrix`] for rank-deficient problems.
//! - [`solve_scatter`] finds `s` in `[lower, upper]` such that the reduced
//!   chi-square `Σ rᵢ² / (σᵢ² + s²) / dof` equals one.
//! - [`fit_pixel`] alternates the two as an explicit fixed point until the
//!   relative change of coefficients and scatter drops below
//!   `ScatterOptions::tol` or `ScatterOptions::max_iter` is reached.
//! - [`fit_pixel_fixed`] performs a single weighted solve for a known
//!   scatter.
//!
//! Invariants & assumptions
//! ------------------------
//! - Returned scatter is always finite and inside `[0, upper]`, where
//!   `upper` is `ScatterOptions::upper_bound` or, by default, the flux range
//!   of the usable stars.
//! - A scatter pinned at `upper` (the data want more scatter than allowed)
//!   or a budget exhaustion is reported as a warning on the [`PixelFit`],
//!   never as an error.
//! - Only singular designs fail a pixel.
//!
//! Conventions
//! -----------
//! - Weights are `ivar / (1 + ivar·s²) = 1 / (σ² + s²)`.
//! - Degrees of freedom are `n_used − n_terms`; with none left the scatter
//!   is `0` (the fit interpolates the data).
//!
//! Testing notes
//! -------------
//! - Unit tests cover exact recovery on noiseless data, masking, singular
//!   designs, scatter recovery on noisy synthetic data, scatter bounds and
//!   budget exhaustion.
use crate::{
    optimization::{
        numerical_stability::{max_relative_change, relative_change, scatter_weight},
        root_finding::{find_root, RootOptions},
    },
    spectral::{
        core::options::ScatterOptions,
        errors::{PixelFitError, SpectralError, SpectralResult},
    },
};
use log::warn;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Usable observations of one pixel.
///
/// Rows with `ivar == 0` are dropped at construction; `design` holds only
/// the active (uncensored) columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelData {
    design: Array2<f64>,
    flux: Array1<f64>,
    ivar: Array1<f64>,
}

impl PixelData {
    /// Select the unmasked rows of a pixel's observations.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::LengthMismatch` when `flux`, `ivar` and the design
    ///   rows disagree.
    /// - `SpectralError::InvalidInverseVariance` / `NonFiniteFlux` for
    ///   invalid entries on kept rows.
    pub fn new(
        design: ArrayView2<f64>, flux: ArrayView1<f64>, ivar: ArrayView1<f64>,
    ) -> SpectralResult<Self> {
        let n = design.nrows();
        for (what, len) in [("pixel flux", flux.len()), ("pixel inverse variance", ivar.len())] {
            if len != n {
                return Err(SpectralError::LengthMismatch { what, expected: n, found: len });
            }
        }
        let mut keep = Vec::with_capacity(n);
        for (index, (&w, &y)) in ivar.iter().zip(flux.iter()).enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(SpectralError::InvalidInverseVariance { index, value: w });
            }
            if w > 0.0 {
                if !y.is_finite() {
                    return Err(SpectralError::NonFiniteFlux { index, value: y });
                }
                keep.push(index);
            }
        }
        Ok(Self {
            design: design.select(Axis(0), &keep),
            flux: flux.select(Axis(0), &keep),
            ivar: ivar.select(Axis(0), &keep),
        })
    }

    /// Number of usable stars.
    pub fn n_used(&self) -> usize {
        self.flux.len()
    }

    /// Number of design columns.
    pub fn n_terms(&self) -> usize {
        self.design.ncols()
    }

    /// Residual degrees of freedom `n_used − n_terms` (0 when negative).
    pub fn dof(&self) -> usize {
        self.n_used().saturating_sub(self.n_terms())
    }

    /// `max(flux) − min(flux)` over usable stars.
    pub fn flux_range(&self) -> f64 {
        let (lo, hi) = self
            .flux
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &y| (lo.min(y), hi.max(y)));
        if hi >= lo {
            hi - lo
        } else {
            0.0
        }
    }

    fn weights(&self, scatter: f64) -> Array1<f64> {
        self.ivar.mapv(|w| scatter_weight(w, scatter))
    }

    fn residuals(&self, coefficients: &Array1<f64>) -> Array1<f64> {
        &self.flux - &self.design.dot(coefficients)
    }
}

/// Outcome of one pixel fit.
///
/// - `coefficients`: one per active design column.
/// - `scatter`: intrinsic scatter, inside the search bounds.
/// - `iterations`: fixed-point iterations performed (0 for a fixed scatter).
/// - `n_used`: stars that entered the fit.
/// - `warning`: `Some(ScatterNotConverged)` when the scatter is a low
///   confidence estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelFit {
    pub coefficients: Array1<f64>,
    pub scatter: f64,
    pub iterations: usize,
    pub n_used: usize,
    pub warning: Option<PixelFitError>,
}

impl PixelFit {
    /// Whether the scatter estimate should be treated with caution.
    pub fn is_low_confidence(&self) -> bool {
        self.warning.is_some()
    }
}

/// Scatter that sets the reduced chi-square to one.
///
/// - `converged`: the Brent search met its tolerance (trivially `true` for
///   boundary answers).
/// - `pinned`: the answer is the upper bound because the residuals demand
///   more scatter than allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterSolution {
    pub scatter: f64,
    pub converged: bool,
    pub pinned: bool,
}

/// solve_weighted_least_squares — minimize `Σ wᵢ (yᵢ − xᵢ·β)²`.
///
/// Parameters
/// ----------
/// - `design`: `n × k` design matrix.
/// - `flux`: length-`n` targets.
/// - `weights`: length-`n` non-negative weights; zero-weight rows carry no
///   information.
/// - `rcond`: relative singular-value threshold of the column-scaled
///   weighted design.
///
/// Returns
/// -------
/// Length-`k` coefficient vector.
///
/// Errors
/// ------
/// - `PixelFitError::SingularDesignMatrix` when fewer than `k` rows carry
///   weight, a column is identically zero on those rows, or the smallest
///   singular value is at most `rcond` times the largest.
///
/// Panics
/// ------
/// - If `flux` or `weights` do not have `n` entries.
pub fn solve_weighted_least_squares(
    design: ArrayView2<f64>, flux: ArrayView1<f64>, weights: ArrayView1<f64>, rcond: f64,
) -> Result<Array1<f64>, PixelFitError> {
    let (n, k) = design.dim();
    assert_eq!(flux.len(), n, "flux must have one entry per design row");
    assert_eq!(weights.len(), n, "weights must have one entry per design row");
    let singular = PixelFitError::SingularDesignMatrix {
        n_stars: weights.iter().filter(|&&w| w > 0.0).count(),
        n_terms: k,
    };
    if k == 0 || weights.iter().filter(|&&w| w > 0.0).count() < k {
        return Err(singular);
    }

    let sqrt_w = weights.mapv(f64::sqrt);
    let mut col_norm = Array1::<f64>::zeros(k);
    for j in 0..k {
        let norm: f64 =
            design.column(j).iter().zip(sqrt_w.iter()).map(|(x, s)| (x * s).powi(2)).sum();
        col_norm[j] = norm.sqrt();
        if !(col_norm[j] > 0.0) || !col_norm[j].is_finite() {
            return Err(singular);
        }
    }

    let a = DMatrix::from_fn(n, k, |i, j| design[[i, j]] * sqrt_w[i] / col_norm[j]);
    let b = DVector::from_fn(n, |i, _| flux[i] * sqrt_w[i]);
    let svd = a.svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if !(s_min > rcond * s_max) {
        return Err(singular);
    }
    let z = svd.solve(&b, 0.0).map_err(|_| singular.clone())?;
    let coefficients: Array1<f64> = (0..k).map(|j| z[j] / col_norm[j]).collect();
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(singular);
    }
    Ok(coefficients)
}

/// solve_scatter — intrinsic scatter from residuals.
///
/// Solves `g(s) = Σ rᵢ² / (σᵢ² + s²) / dof − 1 = 0` on `[lower, upper]`.
/// `g` is non-increasing in `s`, so:
/// - `dof == 0` or `g(lower) <= 0` → `lower` (measurement noise already
///   explains the residuals);
/// - `g(upper) >= 0` → `upper`, flagged as `pinned`;
/// - otherwise Brent's method between the bounds.
///
/// Parameters
/// ----------
/// - `residuals`: `yᵢ − xᵢ·β` of usable stars.
/// - `variances`: `σᵢ² = 1 / ivarᵢ` of the same stars.
/// - `dof`: residual degrees of freedom.
/// - `bounds`: `(lower, upper)` with `0 <= lower <= upper`.
/// - `opts`: Brent tolerance and budget.
///
/// Panics
/// ------
/// - If `residuals` and `variances` differ in length.
pub fn solve_scatter(
    residuals: ArrayView1<f64>, variances: ArrayView1<f64>, dof: usize, bounds: (f64, f64),
    opts: &RootOptions,
) -> ScatterSolution {
    assert_eq!(residuals.len(), variances.len(), "one variance per residual");
    let (lower, upper) = bounds;
    let at = |scatter| ScatterSolution { scatter, converged: true, pinned: false };
    if dof == 0 || !(upper > lower) {
        return at(lower);
    }
    let g = |s: f64| {
        let s2 = s * s;
        let chi2: f64 = residuals.iter().zip(variances.iter()).map(|(r, v)| r * r / (v + s2)).sum();
        chi2 / dof as f64 - 1.0
    };
    if !(g(lower) > 0.0) {
        return at(lower);
    }
    if g(upper) >= 0.0 {
        return ScatterSolution { scatter: upper, converged: true, pinned: true };
    }
    match find_root(&g, lower, upper, opts) {
        Ok(out) => ScatterSolution {
            scatter: out.root.clamp(lower, upper),
            converged: out.converged,
            pinned: false,
        },
        // Only reachable for non-finite residuals; keep the bracket's low end.
        Err(_) => ScatterSolution { scatter: lower, converged: false, pinned: false },
    }
}

/// fit_pixel — coefficients and intrinsic scatter of one pixel.
///
/// Fixed point
/// -----------
/// 1. `β₀ = WLS(s₀)` with `s₀ = clamp(initial_scatter, 0, upper)`, or `0`
///    for a non-finite initial scatter.
/// 2. For `t = 1..=max_iter`: `s_t = solve_scatter(y − Xβ_{t−1})`,
///    `β_t = WLS(s_t)`; stop when both relative changes are below `tol`.
///
/// Errors
/// ------
/// - `PixelFitError::SingularDesignMatrix` from any weighted solve.
///
/// Notes
/// -----
/// - Budget exhaustion (fixed point or root search) or a scatter pinned at
///   its upper bound returns `Ok` with
///   `warning = Some(PixelFitError::ScatterNotConverged { .. })`.
pub fn fit_pixel(data: &PixelData, opts: &ScatterOptions) -> Result<PixelFit, PixelFitError> {
    let upper = opts.upper_bound.unwrap_or_else(|| data.flux_range()).max(0.0);
    let variances = data.ivar.mapv(|w| 1.0 / w);
    let dof = data.dof();

    let mut scatter =
        if opts.initial_scatter.is_finite() { opts.initial_scatter.clamp(0.0, upper) } else { 0.0 };
    let mut coefficients = solve_weighted_least_squares(
        data.design.view(),
        data.flux.view(),
        data.weights(scatter).view(),
        opts.rcond,
    )?;

    let mut converged = false;
    let mut root_ok = true;
    let mut pinned = false;
    let mut iterations = 0;
    while iterations < opts.max_iter {
        iterations += 1;
        let residuals = data.residuals(&coefficients);
        let solution =
            solve_scatter(residuals.view(), variances.view(), dof, (0.0, upper), &opts.root);
        let next = solve_weighted_least_squares(
            data.design.view(),
            data.flux.view(),
            data.weights(solution.scatter).view(),
            opts.rcond,
        )?;
        let coeff_change = max_relative_change(next.view(), coefficients.view());
        let scatter_change = relative_change(solution.scatter, scatter);
        coefficients = next;
        scatter = solution.scatter;
        root_ok = solution.converged;
        pinned = solution.pinned;
        if coeff_change <= opts.tol && scatter_change <= opts.tol {
            converged = true;
            break;
        }
    }

    let warning = if converged && root_ok && !pinned {
        None
    } else {
        warn!(
            "scatter estimate is low confidence after {iterations} iterations \
             (s = {scatter:.3e}, pinned at bound: {pinned})"
        );
        Some(PixelFitError::ScatterNotConverged { last: scatter, iterations })
    };
    Ok(PixelFit { coefficients, scatter, iterations, n_used: data.n_used(), warning })
}

/// fit_pixel_fixed — one weighted solve with a known scatter.
///
/// Errors
/// ------
/// - `PixelFitError::SingularDesignMatrix` from the weighted solve.
pub fn fit_pixel_fixed(
    data: &PixelData, scatter: f64, rcond: f64,
) -> Result<PixelFit, PixelFitError> {
    let coefficients = solve_weighted_least_squares(
        data.design.view(),
        data.flux.view(),
        data.weights(scatter).view(),
        rcond,
    )?;
    Ok(PixelFit { coefficients, scatter, iterations: 0, n_used: data.n_used(), warning: None })
}
