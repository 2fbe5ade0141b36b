//! optimization — MLE stack, root finding, numerical helpers and errors.
//!
//! Purpose
//! -------
//! Provide the numerical engines used by the spectral model without tying
//! them to spectra: an argmin-backed log-likelihood maximizer used for label
//! inference, a bracketed one-dimensional root finder used for intrinsic
//! scatter, shared tolerances, and one error surface for all of them.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer`: maximize `ℓ(θ)` with L-BFGS (More–Thuente or
//!   Hager–Zhang line search) and finite-difference fallbacks.
//! - `root_finding`: Brent root search that never leaves its bracket.
//! - `numerical_stability`: inverse-variance weights, relative-change
//!   measures, eigenvalue cutoffs.
//! - `errors`: `OptError` / `OptResult<T>`; argmin errors are converted at
//!   this boundary.
//!
//! Conventions
//! -----------
//! - Solvers conceptually maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`;
//!   outcomes are reported in terms of `ℓ`.
//! - This layer does not log outside the optional `obs_slog` observer;
//!   callers report progress.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;
pub mod root_finding;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
    pub use super::root_finding::{find_root, RootOptions, RootOutcome};
}
