//! spectral — data-driven spectral model: training and label inference.
//!
//! Purpose
//! -------
//! Learn, from reference spectra with known labels, a per-pixel polynomial
//! mapping from labels to flux plus an intrinsic scatter per pixel, then use
//! it to infer labels of new spectra.
//!
//! Key behaviors
//! -------------
//! - `core`: validated inputs, term specification, the frozen
//!   `LabelVectorizer`, censoring and options.
//! - `models`: pixel fits, the `Trainer`, the trained `Model` and the
//!   `Inferencer`.
//! - `errors`: `SpectralError` / `SpectralResult<T>` and the per-pixel
//!   `PixelFitError`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Specification and configuration problems are fatal and raised before
//!   any fit starts.
//! - Per-pixel and per-star problems never abort a batch; they are recorded
//!   as pixel status or estimate warnings.
//!
//! Downstream usage
//! ----------------
//! - Typical flow: build a `TrainingSet`, call `Trainer::train`, persist the
//!   `Model` with `store::save`, and run `Inferencer::infer` on new spectra.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::core::{
    censoring::CensoringMask,
    data::{LabelSet, Spectrum, TrainingSet},
    options::{InferOptions, ScatterOptions, TrainOptions},
    terms::{CrossTerms, LabelVectorSpec, Term},
    vectorizer::LabelVectorizer,
};
pub use self::errors::{PixelFitError, SpectralError, SpectralResult};
pub use self::models::{
    estimate::{InferenceWarning, LabelEstimate},
    inferencer::Inferencer,
    trained::{Model, PixelCoefficients, PixelStatus, TrainingSummary},
    trainer::Trainer,
};

pub mod prelude {
    pub use super::{
        CensoringMask, CrossTerms, InferOptions, Inferencer, LabelEstimate, LabelSet,
        LabelVectorSpec, Model, Spectrum, SpectralError, SpectralResult, TrainOptions, Trainer,
        TrainingSet,
    };
}
