//! root_finding — bounded one-dimensional root finding.
//!
//! Purpose
//! -------
//! Solve `g(x) = 0` for a continuous scalar function on a closed interval
//! `[lower, upper]` with argmin's Brent solver, returning an answer that is
//! guaranteed to lie inside the interval. The intrinsic-scatter update of a
//! pixel fit is the main client.
//!
//! Key behaviors
//! -------------
//! - [`find_root`] validates the bracket, evaluates both endpoints, returns
//!   an endpoint directly when it is already a root, and otherwise runs
//!   `BrentRoot` under an iteration budget.
//! - Exhausting the budget is not an error: the outcome carries the best
//!   point found with `converged == false`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `lower < upper`, both finite, and `g(lower)`, `g(upper)` of opposite
//!   sign (or one of them zero). Violations are reported as `OptError`.
//! - The returned root always satisfies `lower <= root <= upper`.
use argmin::{
    core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus},
    solver::brent::BrentRoot,
};

use crate::optimization::errors::{OptError, OptResult};

/// Result of a bracketed root search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOutcome {
    /// Best root estimate, always inside the search interval.
    pub root: f64,
    /// `g(root)` as last evaluated.
    pub residual: f64,
    /// Brent iterations performed (0 when an endpoint was already a root).
    pub iterations: u64,
    /// `true` unless the iteration budget ran out.
    pub converged: bool,
}

/// Settings for [`find_root`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOptions {
    /// Absolute tolerance on the root location.
    pub tol: f64,
    /// Maximum number of Brent iterations.
    pub max_iter: u64,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self { tol: 1e-10, max_iter: 100 }
    }
}

struct ScalarProblem<'a, G: Fn(f64) -> f64> {
    g: &'a G,
}

impl<G: Fn(f64) -> f64> CostFunction for ScalarProblem<'_, G> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &f64) -> Result<f64, Error> {
        let value = (self.g)(*x);
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value }.into());
        }
        Ok(value)
    }
}

/// find_root — locate a sign change of `g` inside `[lower, upper]`.
///
/// Parameters
/// ----------
/// - `g`: continuous scalar function; must be finite on the interval.
/// - `lower`, `upper`: search interval with `lower < upper`.
/// - `opts`: tolerance and iteration budget.
///
/// Returns
/// -------
/// [`RootOutcome`] whose `root` lies in `[lower, upper]`.
///
/// Errors
/// ------
/// - `OptError::InvalidBracket` for a non-finite or empty interval.
/// - `OptError::InvalidRootTol` for a non-positive or non-finite tolerance.
/// - `OptError::InvalidMaxIter` for a zero iteration budget.
/// - `OptError::RootNotBracketed` when `g(lower)` and `g(upper)` share a
///   strict sign.
/// - `OptError::NonFiniteCost` when `g` is not finite at an evaluated point.
pub fn find_root<G: Fn(f64) -> f64>(
    g: &G, lower: f64, upper: f64, opts: &RootOptions,
) -> OptResult<RootOutcome> {
    if !lower.is_finite() || !upper.is_finite() || lower >= upper {
        return Err(OptError::InvalidBracket { lower, upper });
    }
    if !opts.tol.is_finite() || opts.tol <= 0.0 {
        return Err(OptError::InvalidRootTol { tol: opts.tol });
    }
    if opts.max_iter == 0 {
        return Err(OptError::InvalidMaxIter {
            max_iter: 0,
            reason: "Root finding needs at least one iteration.",
        });
    }

    let problem = ScalarProblem { g };
    let f_lower = problem.cost(&lower)?;
    let f_upper = problem.cost(&upper)?;
    if f_lower == 0.0 {
        return Ok(RootOutcome { root: lower, residual: 0.0, iterations: 0, converged: true });
    }
    if f_upper == 0.0 {
        return Ok(RootOutcome { root: upper, residual: 0.0, iterations: 0, converged: true });
    }
    if f_lower.signum() == f_upper.signum() {
        return Err(OptError::RootNotBracketed { f_lower, f_upper });
    }

    let solver = BrentRoot::new(lower, upper, opts.tol);
    let result =
        Executor::new(problem, solver).configure(|state| state.max_iters(opts.max_iter)).run()?;
    let state = result.state();
    let iterations = state.get_iter();
    let converged = !matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::MaxItersReached)
    );
    let root = state
        .get_param()
        .or_else(|| state.get_best_param())
        .copied()
        .unwrap_or(0.5 * (lower + upper))
        .clamp(lower, upper);
    Ok(RootOutcome { root, residual: g(root), iterations, converged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Accuracy on smooth monotone functions.
    // - Endpoint roots and bracket validation.
    // - Budget exhaustion reported through `converged`.
    // -------------------------------------------------------------------------

    #[test]
    fn find_root_solves_cubic_inside_interval() {
        let g = |x: f64| x * x * x - 2.0;

        let out = find_root(&g, 0.0, 4.0, &RootOptions::default()).expect("bracketed root");

        assert!(out.converged);
        assert_abs_diff_eq!(out.root, 2.0_f64.cbrt(), epsilon = 1e-8);
    }

    #[test]
    // Purpose
    // -------
    // A root sitting exactly on an endpoint is returned without iterating.
    fn find_root_returns_endpoint_roots_directly() {
        let g = |x: f64| x;

        let out = find_root(&g, 0.0, 1.0, &RootOptions::default()).expect("endpoint root");

        assert_eq!(out.root, 0.0);
        assert_eq!(out.iterations, 0);
    }

    #[test]
    fn find_root_rejects_unbracketed_and_empty_intervals() {
        let g = |x: f64| x * x + 1.0;

        assert!(matches!(
            find_root(&g, -1.0, 1.0, &RootOptions::default()),
            Err(OptError::RootNotBracketed { .. })
        ));
        assert!(matches!(
            find_root(&g, 1.0, 1.0, &RootOptions::default()),
            Err(OptError::InvalidBracket { .. })
        ));
        assert!(matches!(
            find_root(&g, 0.0, 1.0, &RootOptions { tol: 0.0, max_iter: 10 }),
            Err(OptError::InvalidRootTol { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A one-iteration budget on a hard problem stops early but still returns
    // a point inside the interval.
    fn find_root_exhausted_budget_stays_in_bounds() {
        let g = |x: f64| (x - 0.123_456_789).powi(3);

        let out = find_root(&g, -10.0, 10.0, &RootOptions { tol: 1e-14, max_iter: 1 })
            .expect("a truncated search still returns an outcome");

        assert!(!out.converged);
        assert!((-10.0..=10.0).contains(&out.root));
    }
}
