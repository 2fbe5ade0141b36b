//! Spectral options — configuration for training and inference.
//!
//! Purpose
//! -------
//! Collect every tuning knob of the spectral model in validated option
//! structs, so no tolerance, bound or iteration budget is hard-coded in the
//! fitting code.
//!
//! Key behaviors
//! -------------
//! - [`ScatterOptions`]: the coefficient/scatter fixed point of one pixel
//!   (initial scatter, relative tolerance, iteration budget), its Brent root
//!   search, the optional upper bound of the scatter search interval, and
//!   the rank tolerance for singular designs.
//! - [`TrainOptions`]: scatter options plus optional fixed per-pixel scatter
//!   and the parallelism switch.
//! - [`InferOptions`]: optimizer options for label inference plus the
//!   parallelism switch for batches.
//!
//! Invariants & assumptions
//! ------------------------
//! - Constructors validate ranges; `Default` impls are always valid.
//! - A fixed-scatter vector is checked for length against the training set
//!   by the trainer, not here.
use crate::{
    optimization::{
        loglik_optimizer::{LineSearcher, MLEOptions, Tolerances},
        root_finding::RootOptions,
    },
    spectral::{
        core::validation::{validate_non_negative, validate_positive},
        errors::{SpectralError, SpectralResult},
    },
};
use ndarray::Array1;

/// Options for the per-pixel coefficient/scatter fixed point.
///
/// Fields
/// ------
/// - `initial_scatter`: scatter used for the first weighted solve.
/// - `tol`: relative change of coefficients and scatter below which the
///   fixed point stops.
/// - `max_iter`: fixed-point iteration budget.
/// - `root`: Brent tolerance and iteration budget for each scatter update.
/// - `upper_bound`: upper end of the scatter search interval; `None` uses
///   the flux range (max − min) of the pixel's usable stars.
/// - `rcond`: relative singular-value threshold below which the
///   column-scaled weighted design counts as rank deficient.
///
/// Default
/// -------
/// - `initial_scatter = 0.01`, `tol = 1e-6`, `max_iter = 50`,
///   `root = RootOptions::default()`, `upper_bound = None`, `rcond = 1e-10`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterOptions {
    pub initial_scatter: f64,
    pub tol: f64,
    pub max_iter: usize,
    pub root: RootOptions,
    pub upper_bound: Option<f64>,
    pub rcond: f64,
}

impl ScatterOptions {
    /// Construct validated scatter options.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::InvalidOption` for a negative or non-finite initial
    ///   scatter or upper bound, non-positive tolerances, or zero budgets.
    pub fn new(
        initial_scatter: f64, tol: f64, max_iter: usize, root: RootOptions,
        upper_bound: Option<f64>, rcond: f64,
    ) -> SpectralResult<Self> {
        let options = Self { initial_scatter, tol, max_iter, root, upper_bound, rcond };
        options.validate()?;
        Ok(options)
    }

    /// Re-check options whose public fields were set directly.
    ///
    /// Errors
    /// ------
    /// Same as [`ScatterOptions::new`].
    pub fn validate(&self) -> SpectralResult<()> {
        validate_non_negative("initial_scatter", self.initial_scatter)?;
        validate_positive("tol", self.tol)?;
        validate_positive("root.tol", self.root.tol)?;
        validate_positive("rcond", self.rcond)?;
        if let Some(upper) = self.upper_bound {
            validate_positive("upper_bound", upper)?;
        }
        if self.max_iter == 0 {
            return Err(SpectralError::InvalidOption {
                name: "max_iter",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.root.max_iter == 0 {
            return Err(SpectralError::InvalidOption {
                name: "root.max_iter",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for ScatterOptions {
    fn default() -> Self {
        Self {
            initial_scatter: 0.01,
            tol: 1e-6,
            max_iter: 50,
            root: RootOptions::default(),
            upper_bound: None,
            rcond: 1e-10,
        }
    }
}

/// Training configuration.
///
/// - `scatter`: fixed-point settings for every pixel.
/// - `fixed_scatter`: per-pixel scatter to use as-is; skips scatter
///   estimation (one weighted solve per pixel).
/// - `parallel`: fit pixels on the rayon pool.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub scatter: ScatterOptions,
    pub fixed_scatter: Option<Array1<f64>>,
    pub parallel: bool,
}

impl TrainOptions {
    /// Construct validated training options.
    ///
    /// Errors
    /// ------
    /// Same as [`TrainOptions::validate`].
    pub fn new(
        scatter: ScatterOptions, fixed_scatter: Option<Array1<f64>>, parallel: bool,
    ) -> SpectralResult<Self> {
        let options = Self { scatter, fixed_scatter, parallel };
        options.validate()?;
        Ok(options)
    }

    /// Re-check options whose public fields were set directly.
    ///
    /// Errors
    /// ------
    /// - Any error from [`ScatterOptions::validate`].
    /// - `SpectralError::InvalidOption` for a negative or non-finite entry
    ///   in `fixed_scatter`.
    pub fn validate(&self) -> SpectralResult<()> {
        self.scatter.validate()?;
        if let Some(s) = &self.fixed_scatter {
            for &value in s.iter() {
                validate_non_negative("fixed_scatter", value)?;
            }
        }
        Ok(())
    }
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self { scatter: ScatterOptions::default(), fixed_scatter: None, parallel: true }
    }
}

/// Inference configuration.
///
/// - `mle`: L-BFGS settings for the label search (in scaled label
///   coordinates).
/// - `parallel`: run batch inference on the rayon pool.
///
/// Default
/// -------
/// - `tol_grad = 1e-6`, `tol_cost = 1e-12`, `max_iter = 500`, More–Thuente
///   line search, default L-BFGS memory, not verbose; `parallel = true`.
#[derive(Debug, Clone, PartialEq)]
pub struct InferOptions {
    pub mle: MLEOptions,
    pub parallel: bool,
}

impl InferOptions {
    pub fn new(mle: MLEOptions, parallel: bool) -> Self {
        Self { mle, parallel }
    }
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            mle: MLEOptions {
                tols: Tolerances { tol_grad: Some(1e-6), tol_cost: Some(1e-12), max_iter: Some(500) },
                line_searcher: LineSearcher::MoreThuente,
                verbose: false,
                lbfgs_mem: None,
            },
            parallel: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_options_default_is_valid() {
        let d = ScatterOptions::default();

        let rebuilt = ScatterOptions::new(
            d.initial_scatter,
            d.tol,
            d.max_iter,
            d.root,
            d.upper_bound,
            d.rcond,
        );

        assert_eq!(rebuilt, Ok(d));
    }

    #[test]
    fn scatter_options_reject_bad_values() {
        let root = RootOptions::default();

        assert!(matches!(
            ScatterOptions::new(-0.1, 1e-6, 10, root, None, 1e-12),
            Err(SpectralError::InvalidOption { name: "initial_scatter", .. })
        ));
        assert!(matches!(
            ScatterOptions::new(0.0, 1e-6, 0, root, None, 1e-12),
            Err(SpectralError::InvalidOption { name: "max_iter", .. })
        ));
        assert!(matches!(
            ScatterOptions::new(0.0, 1e-6, 10, root, Some(0.0), 1e-12),
            Err(SpectralError::InvalidOption { name: "upper_bound", .. })
        ));
    }

    #[test]
    fn validate_catches_fields_set_directly() {
        let nan_start = ScatterOptions { initial_scatter: f64::NAN, ..ScatterOptions::default() };
        let no_root_budget = ScatterOptions {
            root: RootOptions { max_iter: 0, ..RootOptions::default() },
            ..ScatterOptions::default()
        };
        let bad_fixed = TrainOptions {
            fixed_scatter: Some(Array1::from(vec![f64::INFINITY])),
            ..TrainOptions::default()
        };

        assert!(matches!(
            nan_start.validate(),
            Err(SpectralError::InvalidOption { name: "initial_scatter", .. })
        ));
        assert!(matches!(
            no_root_budget.validate(),
            Err(SpectralError::InvalidOption { name: "root.max_iter", .. })
        ));
        assert!(matches!(
            bad_fixed.validate(),
            Err(SpectralError::InvalidOption { name: "fixed_scatter", .. })
        ));
        assert_eq!(TrainOptions::default().validate(), Ok(()));
    }

    #[test]
    fn train_options_reject_negative_fixed_scatter() {
        let res = TrainOptions::new(
            ScatterOptions::default(),
            Some(Array1::from(vec![0.0, -1.0])),
            false,
        );

        assert!(matches!(res, Err(SpectralError::InvalidOption { name: "fixed_scatter", .. })));
    }
}
