//! loglik_optimizer::finite_diff — finite-difference gradient fallback.
//!
//! Purpose
//! -------
//! Approximate the gradient of an objective that has no analytic one, with
//! error capture and validation, so the optimizer adapter does not depend
//! directly on the `finitediff` API.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`]: forward-difference gradient with error capture and
//!   post-hoc validation. The optimizer adapter falls back to it when an
//!   objective has no analytic gradient.
//!
//! Invariants & assumptions
//! ------------------------
//! - Errors raised by the objective during differencing are routed into a
//!   shared `closure_err` cell (the FD closure must return `f64`) and treated
//!   as a hard failure.
//! - Returned gradients always satisfy [`validate_grad`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover the happy path, closure-error propagation and
//!   non-finite rejection.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{validation::validate_grad, Grad, Theta},
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// run_fd_diff — forward-difference gradient with error capture and validation.
///
/// Parameters
/// ----------
/// - `theta`: `&Theta`
///   Point at which the gradient is approximated; its length is the
///   expected gradient dimension.
/// - `func`: `&G`
///   Scalar objective. It is expected to store any evaluation error in
///   `closure_err` and return `NaN` in that case.
/// - `closure_err`: `&RefCell<Option<Error>>`
///   Shared error slot; cleared on entry and inspected afterwards.
///
/// Errors
/// ------
/// - Any error captured in `closure_err` (converted into `OptError`).
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` from
///   [`validate_grad`].
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    let dim = theta.len();
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, dim)?;
    Ok(fd_grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use argmin::core::ArgminError;
    use ndarray::Array1;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Forward-difference gradients with and without closure errors.
    // - Rejection of non-finite gradients.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `run_fd_diff` returns a finite gradient close to the analytic one for a
    // smooth quadratic.
    fn run_fd_diff_quadratic_matches_analytic_gradient() {
        // Arrange
        let theta: Theta = Array1::from(vec![0.5_f64, -1.0]);
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |x: &Theta| x.dot(x);

        // Act
        let grad = run_fd_diff(&theta, &f, &closure_err).expect("quadratic gradient");

        // Assert
        assert_eq!(grad.len(), 2);
        assert!((grad[0] - 1.0).abs() < 1e-5);
        assert!((grad[1] + 2.0).abs() < 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // An error stored by the objective in `closure_err` must surface as an
    // `OptError` instead of a NaN-filled gradient.
    fn run_fd_diff_closure_error_is_propagated() {
        // Arrange
        let theta: Theta = Array1::from(vec![1.0_f64]);
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |_: &Theta| {
            let argmin_err = ArgminError::NotImplemented { text: "fd test".to_string() };
            closure_err.replace(Some(argmin_err.into()));
            f64::NAN
        };

        // Act
        let err = run_fd_diff(&theta, &f, &closure_err).expect_err("closure error must fail");

        // Assert
        assert_eq!(err, OptError::NotImplemented { text: "fd test".to_string() });
    }

    #[test]
    fn run_fd_diff_non_finite_gradient_yields_invalid_gradient_error() {
        let theta: Theta = Array1::from(vec![0.0_f64, 1.0]);
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |_x: &Theta| f64::NAN;

        let err = run_fd_diff(&theta, &f, &closure_err).expect_err("NaN objective must fail");

        assert!(matches!(err, OptError::InvalidGradient { .. }));
    }
}
