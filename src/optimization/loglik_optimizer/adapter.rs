//! Adapter that exposes a user `LogLikelihood` as an `argmin` problem.
//!
//! We convert a *maximization* of a log-likelihood `ℓ(θ)` into a *minimization*
//! problem by defining the cost as `c(θ) = -ℓ(θ)`. Analytic gradients (if
//! provided by the user) are negated accordingly. If a gradient is not
//! provided, we finite-difference the **cost** closure, so no sign flip is
//! needed in that branch.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::run_fd_diff,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Bridges a user `LogLikelihood` to `argmin`'s `CostFunction` and `Gradient`.
///
/// - `CostFunction::cost` returns `-ℓ(θ)`.
/// - `Gradient::gradient` returns `-∇ℓ(θ)` for analytic gradients, or a
///   finite-difference gradient of the cost otherwise.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    /// Construct a new adapter over a user `LogLikelihood` and its data.
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate the cost `c(θ) = -ℓ(θ)`.
    ///
    /// # Errors
    /// Propagates any `OptError` from the user’s `value`, and reports a
    /// non-finite value as `OptError::NonFiniteCost`.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate the gradient of the cost at `θ`.
    ///
    /// - Analytic gradients are validated and negated.
    /// - Without one, central differences of the cost are tried first; if a
    ///   cost evaluation failed or the result is not finite, the gradient is
    ///   recomputed once with forward differences and validated again.
    ///
    /// # Errors
    /// - Propagates user errors from `grad` other than `GradientNotImplemented`.
    /// - Propagates cost errors captured during finite differencing.
    /// - Returns validation errors for wrong dimension or non-finite entries.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = theta.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                Ok(run_fd_diff(theta, &cost_func, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use ndarray::array;

    // Concave quadratic ℓ(θ) = -½‖θ - c‖² with an optional analytic gradient.
    struct Quadratic {
        analytic: bool,
    }

    impl LogLikelihood for Quadratic {
        type Data = Theta;

        fn value(&self, theta: &Theta, center: &Theta) -> OptResult<f64> {
            let d = theta - center;
            Ok(-0.5 * d.dot(&d))
        }

        fn check(&self, _theta: &Theta, _center: &Theta) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, center: &Theta) -> OptResult<Grad> {
            if self.analytic {
                Ok(center - theta)
            } else {
                Err(OptError::GradientNotImplemented)
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // The adapter negates both the objective and the analytic gradient.
    fn adapter_flips_signs_for_analytic_gradient() {
        // Arrange
        let model = Quadratic { analytic: true };
        let center = array![1.0, -1.0];
        let adapter = ArgMinAdapter::new(&model, &center);
        let theta = array![0.0, 0.0];

        // Act
        let cost = adapter.cost(&theta).expect("cost");
        let grad = adapter.gradient(&theta).expect("gradient");

        // Assert
        assert!((cost - 1.0).abs() < 1e-12);
        assert_eq!(grad, array![-1.0, 1.0]);
    }

    #[test]
    // Purpose
    // -------
    // Without an analytic gradient the finite-difference path must agree with
    // the analytic cost gradient.
    fn adapter_falls_back_to_finite_differences() {
        // Arrange
        let model = Quadratic { analytic: false };
        let center = array![1.0, -1.0];
        let adapter = ArgMinAdapter::new(&model, &center);
        let theta = array![0.0, 0.0];

        // Act
        let grad = adapter.gradient(&theta).expect("fd gradient");

        // Assert
        assert!((grad[0] + 1.0).abs() < 1e-6);
        assert!((grad[1] - 1.0).abs() < 1e-6);
    }
}
