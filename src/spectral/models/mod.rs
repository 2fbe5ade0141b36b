//! spectral::models — training and inference engines.
//!
//! - [`pixel`]: weighted least squares and the intrinsic-scatter fixed point
//!   for one pixel.
//! - [`trainer`]: runs pixel fits over a training set and assembles a
//!   [`trained::Model`].
//! - [`trained`]: the immutable trained model and per-pixel results.
//! - [`inferencer`]: label optimization for new spectra.
//! - [`estimate`]: inference results and advisory warnings.

pub mod estimate;
pub mod inferencer;
pub mod pixel;
pub mod trained;
pub mod trainer;
