//! rust_spectra — data-driven spectral label model.
//!
//! Purpose
//! -------
//! Learn a pixel-wise polynomial mapping from stellar labels (temperature,
//! surface gravity, abundances, ...) to normalized flux from a reference set
//! of spectra, and invert it to infer labels, with uncertainties, for new
//! spectra on the same wavelength grid.
//!
//! Key behaviors
//! -------------
//! - `spectral`: inputs, the label vectorizer, per-pixel training with
//!   intrinsic scatter and censoring, the trained model and label inference.
//! - `optimization`: the L-BFGS maximizer used for label inference and the
//!   bracketed root finder used for pixel scatter, plus numerical helpers.
//! - `inference`: covariance from the information matrix and χ² fit
//!   statistics.
//! - `store`: bit-exact persistence of trained models as Arrow IPC streams.
//!
//! Invariants & assumptions
//! ------------------------
//! - All spectra handled by one model share its wavelength grid exactly.
//! - Pixels with `ivar == 0` are masked: they carry no weight in training or
//!   inference.
//! - A trained model is immutable; inference borrows it and may run from many
//!   threads at once.
//!
//! Conventions
//! -----------
//! - Fatal input and configuration problems are returned as typed errors
//!   before any fitting starts; per-pixel and per-star problems are recorded
//!   on the results.
//! - Diagnostics go through the `log` facade; the crate installs no logger.
//!
//! Downstream usage
//! ----------------
//! - Build a `TrainingSet`, call `Trainer::train`, persist with
//!   `store::save`, then run `Inferencer::infer` / `infer_batch` on new
//!   spectra.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; `tests/spectral_pipeline.rs` runs
//!   the train → persist → infer flow on synthetic spectra.

pub mod inference;
pub mod optimization;
pub mod spectral;
pub mod store;
