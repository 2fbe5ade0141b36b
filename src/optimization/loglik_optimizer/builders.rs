//! loglik_optimizer::builders — L-BFGS solver construction helpers.
//!
//! Small builders that hide argmin's generic wiring and apply the crate's
//! [`MLEOptions`] (memory size, gradient and cost tolerances). Initial
//! parameters and iteration limits are runtime concerns applied by the
//! runner ([`run_lbfgs`](super::run::run_lbfgs)), so these builders stay
//! side-effect free. Invalid tolerances rejected by argmin surface as
//! [`OptError`](crate::optimization::errors::OptError) through the crate's
//! `From<argmin::core::Error>` conversion.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente, MoreThuenteLS, Theta,
            DEFAULT_LBFGS_MEM,
        },
    },
};

/// Build an L-BFGS solver with Hager–Zhang line search.
///
/// Uses `opts.lbfgs_mem` (or [`DEFAULT_LBFGS_MEM`]) as the history size and
/// applies any configured tolerances via [`configure_lbfgs`].
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let hager_zhang = HagerZhangLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsHagerZhang::new(hager_zhang, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Build an L-BFGS solver with More–Thuente line search.
///
/// Uses `opts.lbfgs_mem` (or [`DEFAULT_LBFGS_MEM`]) as the history size and
/// applies any configured tolerances via [`configure_lbfgs`].
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let more_thuente = MoreThuenteLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsMoreThuente::new(more_thuente, mem);
    configure_lbfgs(lbfgs, opts)
}

/// configure_lbfgs — apply optional tolerances to an L-BFGS solver.
///
/// Parameters
/// ----------
/// - `solver`: `LBFGS<L, Theta, Grad, Cost>`
///   Pre-constructed solver using any line-search type `L`.
/// - `opts`: `&MLEOptions`
///   Source of `tols.tol_grad` and `tols.tol_cost`. A `None` tolerance
///   leaves argmin's default in place.
///
/// Errors
/// ------
/// - `OptError` (via `From<argmin::core::Error>`) when argmin rejects a
///   tolerance.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
