//! loglik_optimizer — argmin-powered log-likelihood maximizer.
//!
//! Purpose
//! -------
//! Provide a high-level, argmin-backed optimization layer for **maximizing
//! log-likelihoods** `ℓ(θ)`. Callers implement a single trait,
//! [`LogLikelihood`], and invoke [`maximize`] to run L-BFGS with a
//! configurable line search, tolerances, and finite-difference fallbacks.
//! Label inference is the main client: its objective is `ℓ(θ) = -χ²(θ)/2`
//! over scaled labels.
//!
//! Key behaviors
//! -------------
//! - Convert `ℓ(θ)` into the argmin cost `c(θ) = -ℓ(θ)` via
//!   [`adapter::ArgMinAdapter`].
//! - [`maximize`] validates the start with [`LogLikelihood::check`], picks a
//!   solver from [`builders`] according to [`traits::LineSearcher`], runs it
//!   through [`run::run_lbfgs`] and normalizes the result into an
//!   [`OptimOutcome`].
//! - [`finite_diff`] supplies gradients when analytic derivatives are
//!   missing, with post-hoc validation and error capture.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer **always maximizes** `ℓ(θ)`; implementors never write the
//!   cost directly.
//! - [`LogLikelihood::value`] and [`LogLikelihood::grad`] report invalid
//!   inputs as [`OptError`](crate::optimization::errors::OptError) values,
//!   not panics.
//! - Exhausting the iteration budget is not an error; it is reported through
//!   [`OptimOutcome::converged`].
//!
//! Conventions
//! -----------
//! - Parameters live in an unconstrained space as [`Theta`]; any scaling
//!   into model space happens in the model layer.
//! - Gradients from [`LogLikelihood::grad`] are `∇ℓ(θ)`; the adapter flips
//!   signs for the cost.
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover sign conventions in [`adapter`], solver
//!   wiring in [`builders`], finite differences in [`finite_diff`],
//!   configuration invariants in [`traits`], and end-to-end runs on toy
//!   objectives in [`api`].

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, FnEvalMap, Grad, Theta, DEFAULT_LBFGS_MEM};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
