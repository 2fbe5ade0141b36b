//! Trainer — fit every pixel of a training set into a [`Model`].
//!
//! Purpose
//! -------
//! Freeze a [`LabelVectorizer`] from the training set (or accept one whose
//! pivots match it), build the shared design matrix once, and run an
//! independent pixel fit per wavelength pixel.
//!
//! Key behaviors
//! -------------
//! - Censored labels remove their design columns for that pixel only; the
//!   removed coefficients are stored as `0`.
//! - A singular pixel becomes [`PixelStatus::Unfit`]; a pixel whose scatter
//!   did not converge becomes [`PixelStatus::LowConfidence`]. Neither aborts
//!   training.
//! - With `TrainOptions::parallel` the pixel loop runs on the rayon pool;
//!   results are collected in pixel order either way.
//!
//! Invariants & assumptions
//! ------------------------
//! - The training set is read only; each pixel fit reads its own flux and
//!   inverse-variance column plus the shared design matrix.
//! - Specification, censoring and option errors are raised before any pixel
//!   is fit.
use crate::spectral::{
    core::{
        censoring::CensoringMask, data::TrainingSet, options::TrainOptions,
        terms::LabelVectorSpec, vectorizer::LabelVectorizer,
    },
    errors::{SpectralError, SpectralResult},
    models::{
        pixel::{fit_pixel, fit_pixel_fixed, PixelData, PixelFit},
        trained::{Model, PixelCoefficients, PixelStatus},
    },
};
use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;

/// Drives pixel fits over a training set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trainer {
    options: TrainOptions,
}

impl Trainer {
    pub fn new(options: TrainOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    /// train — fit a model with a vectorizer frozen from `training_set`.
    ///
    /// Parameters
    /// ----------
    /// - `training_set`: reference spectra and labels.
    /// - `spec`: label-vector specification; its label names must match the
    ///   training set's in order.
    /// - `censoring`: optional per-pixel label censoring.
    ///
    /// Errors
    /// ------
    /// - Specification errors from [`LabelVectorSpec::expand`].
    /// - `SpectralError::LabelNameMismatch` for mismatched label names.
    /// - `SpectralError::InvalidCensoring` / `UnknownLabel` for a bad mask.
    /// - `SpectralError::LengthMismatch` when `fixed_scatter` does not have
    ///   one entry per pixel.
    pub fn train(
        &self, training_set: &TrainingSet, spec: &LabelVectorSpec,
        censoring: Option<&CensoringMask>,
    ) -> SpectralResult<Model> {
        let vectorizer = LabelVectorizer::from_training_set(spec.clone(), training_set)?;
        self.fit_all(training_set, vectorizer, censoring)
    }

    /// train_with_vectorizer — fit a model with a caller-supplied vectorizer.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::LabelNameMismatch` when the vectorizer's labels
    ///   differ from the training set's.
    /// - `SpectralError::PivotMismatch` when its pivots are not exactly the
    ///   training-set label means.
    /// - Any error listed for [`Trainer::train`].
    pub fn train_with_vectorizer(
        &self, training_set: &TrainingSet, vectorizer: LabelVectorizer,
        censoring: Option<&CensoringMask>,
    ) -> SpectralResult<Model> {
        if vectorizer.label_names() != training_set.label_names() {
            return Err(SpectralError::LabelNameMismatch {
                expected: vectorizer.label_names().to_vec(),
                found: training_set.label_names().to_vec(),
            });
        }
        vectorizer.ensure_pivots(&training_set.label_means().to_vec())?;
        self.fit_all(training_set, vectorizer, censoring)
    }

    fn fit_all(
        &self, training_set: &TrainingSet, vectorizer: LabelVectorizer,
        censoring: Option<&CensoringMask>,
    ) -> SpectralResult<Model> {
        self.options.validate()?;
        let n_pixels = training_set.n_pixels();
        if let Some(mask) = censoring {
            mask.validate(&vectorizer, n_pixels)?;
        }
        if let Some(fixed) = &self.options.fixed_scatter {
            if fixed.len() != n_pixels {
                return Err(SpectralError::LengthMismatch {
                    what: "fixed scatter",
                    expected: n_pixels,
                    found: fixed.len(),
                });
            }
        }

        let design = vectorizer.design_matrix(training_set);
        let job = PixelJob { training_set, vectorizer: &vectorizer, design: &design, censoring };
        let pixels: Vec<PixelCoefficients> = if self.options.parallel {
            (0..n_pixels)
                .into_par_iter()
                .map(|p| job.fit(p, &self.options))
                .collect::<SpectralResult<_>>()?
        } else {
            (0..n_pixels).map(|p| job.fit(p, &self.options)).collect::<SpectralResult<_>>()?
        };

        let model = Model::new(training_set.wavelength().to_owned(), vectorizer, pixels)?;
        info!(
            "trained {} stars x {} terms: {}",
            training_set.n_stars(),
            model.vectorizer().n_terms(),
            model.summary()
        );
        Ok(model)
    }
}

// Shared, read-only inputs of the pixel loop.
struct PixelJob<'a> {
    training_set: &'a TrainingSet,
    vectorizer: &'a LabelVectorizer,
    design: &'a Array2<f64>,
    censoring: Option<&'a CensoringMask>,
}

impl PixelJob<'_> {
    fn fit(&self, pixel: usize, options: &TrainOptions) -> SpectralResult<PixelCoefficients> {
        let n_terms = self.vectorizer.n_terms();
        let active: Vec<usize> = match self.censoring {
            Some(mask) => mask.active_columns(pixel, self.vectorizer),
            None => (0..n_terms).collect(),
        };
        let design = self.design.select(Axis(1), &active);
        let data = PixelData::new(
            design.view(),
            self.training_set.pixel_flux(pixel),
            self.training_set.pixel_ivar(pixel),
        )?;

        let result = match &options.fixed_scatter {
            Some(fixed) => fit_pixel_fixed(&data, fixed[pixel], options.scatter.rcond),
            None => fit_pixel(&data, &options.scatter),
        };
        Ok(match result {
            Ok(fit) => expand(fit, &active, n_terms),
            Err(err) => {
                debug!("pixel {pixel} unfit: {err}");
                PixelCoefficients::unfit(n_terms)
            }
        })
    }
}

// Scatter active-column coefficients back to the full term list.
fn expand(fit: PixelFit, active: &[usize], n_terms: usize) -> PixelCoefficients {
    let mut coefficients = Array1::zeros(n_terms);
    for (&column, &value) in active.iter().zip(fit.coefficients.iter()) {
        coefficients[column] = value;
    }
    let status =
        if fit.is_low_confidence() { PixelStatus::LowConfidence } else { PixelStatus::Fit };
    PixelCoefficients { coefficients, scatter: fit.scatter, status, iterations: fit.iterations }
}
