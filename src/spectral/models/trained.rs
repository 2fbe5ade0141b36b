//! Trained model: wavelength grid, frozen vectorizer and per-pixel
//! coefficients.
//!
//! A [`Model`] is produced once by the trainer (or rebuilt by the store) and
//! never mutated afterwards; inference borrows it immutably, so any number
//! of threads can share one instance.
//!
//! Pixel `i` of the model always corresponds to `wavelength[i]`. Unfit
//! pixels keep a zero coefficient vector and carry no weight in inference.
use crate::spectral::{
    core::{data::LabelSet, vectorizer::LabelVectorizer},
    errors::{SpectralError, SpectralResult},
};
use ndarray::{Array1, Array2, ArrayView1};

/// Outcome class of one pixel fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelStatus {
    /// Coefficients and scatter converged.
    Fit,
    /// Usable, but the scatter estimate did not converge or hit its upper
    /// bound.
    LowConfidence,
    /// Singular design; excluded from inference.
    Unfit,
}

impl PixelStatus {
    /// Stable one-byte code used by the model store.
    pub fn code(self) -> u8 {
        match self {
            PixelStatus::Fit => 0,
            PixelStatus::LowConfidence => 1,
            PixelStatus::Unfit => 2,
        }
    }

    /// Inverse of [`PixelStatus::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PixelStatus::Fit),
            1 => Some(PixelStatus::LowConfidence),
            2 => Some(PixelStatus::Unfit),
            _ => None,
        }
    }

    /// Whether the pixel takes part in inference.
    pub fn is_usable(self) -> bool {
        self != PixelStatus::Unfit
    }
}

impl std::fmt::Display for PixelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            PixelStatus::Fit => "fit",
            PixelStatus::LowConfidence => "low-confidence",
            PixelStatus::Unfit => "unfit",
        };
        f.write_str(text)
    }
}

/// Trained state of one pixel.
///
/// - `coefficients`: one per vectorizer term; censored and unfit columns are
///   exactly `0`.
/// - `scatter`: intrinsic scatter, `>= 0`.
/// - `status`: see [`PixelStatus`].
/// - `iterations`: fixed-point iterations used (0 for fixed scatter or unfit
///   pixels).
#[derive(Debug, Clone, PartialEq)]
pub struct PixelCoefficients {
    pub coefficients: Array1<f64>,
    pub scatter: f64,
    pub status: PixelStatus,
    pub iterations: usize,
}

impl PixelCoefficients {
    /// Placeholder for a pixel whose design was singular.
    pub fn unfit(n_terms: usize) -> Self {
        Self {
            coefficients: Array1::zeros(n_terms),
            scatter: 0.0,
            status: PixelStatus::Unfit,
            iterations: 0,
        }
    }
}

/// Counts of pixel outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrainingSummary {
    pub n_pixels: usize,
    pub n_fit: usize,
    pub n_low_confidence: usize,
    pub n_unfit: usize,
}

impl std::fmt::Display for TrainingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pixels: {} fit, {} low-confidence, {} unfit",
            self.n_pixels, self.n_fit, self.n_low_confidence, self.n_unfit
        )
    }
}

/// Trained spectral model.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    wavelength: Array1<f64>,
    vectorizer: LabelVectorizer,
    pixels: Vec<PixelCoefficients>,
}

impl Model {
    /// Assemble a model and check its internal consistency.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::PixelCountMismatch` when `pixels` and `wavelength`
    ///   differ in length.
    /// - `SpectralError::LengthMismatch` when a coefficient vector does not
    ///   have one entry per vectorizer term.
    /// - `SpectralError::InvalidOption` for a negative or non-finite scatter
    ///   or non-finite coefficient.
    pub fn new(
        wavelength: Array1<f64>, vectorizer: LabelVectorizer, pixels: Vec<PixelCoefficients>,
    ) -> SpectralResult<Self> {
        if pixels.len() != wavelength.len() {
            return Err(SpectralError::PixelCountMismatch {
                expected: wavelength.len(),
                found: pixels.len(),
            });
        }
        let k = vectorizer.n_terms();
        for pixel in &pixels {
            if pixel.coefficients.len() != k {
                return Err(SpectralError::LengthMismatch {
                    what: "pixel coefficients",
                    expected: k,
                    found: pixel.coefficients.len(),
                });
            }
            if !pixel.scatter.is_finite() || pixel.scatter < 0.0 {
                return Err(SpectralError::InvalidOption {
                    name: "scatter",
                    value: pixel.scatter,
                    reason: "must be finite and >= 0",
                });
            }
            if let Some(&c) = pixel.coefficients.iter().find(|c| !c.is_finite()) {
                return Err(SpectralError::InvalidOption {
                    name: "coefficient",
                    value: c,
                    reason: "must be finite",
                });
            }
        }
        Ok(Self { wavelength, vectorizer, pixels })
    }

    pub fn wavelength(&self) -> ArrayView1<'_, f64> {
        self.wavelength.view()
    }

    pub fn vectorizer(&self) -> &LabelVectorizer {
        &self.vectorizer
    }

    pub fn pixels(&self) -> &[PixelCoefficients] {
        &self.pixels
    }

    pub fn n_pixels(&self) -> usize {
        self.pixels.len()
    }

    /// Coefficients as an `n_pixels × n_terms` matrix.
    pub fn coefficient_matrix(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.n_pixels(), self.vectorizer.n_terms()));
        for (mut row, pixel) in out.outer_iter_mut().zip(self.pixels.iter()) {
            row.assign(&pixel.coefficients);
        }
        out
    }

    /// Per-pixel intrinsic scatter.
    pub fn scatter(&self) -> Array1<f64> {
        self.pixels.iter().map(|p| p.scatter).collect()
    }

    /// predict — model spectrum at `labels`.
    ///
    /// Unfit pixels are returned as `NaN`.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::LabelNameMismatch` when `labels` does not match the
    ///   vectorizer's label names.
    pub fn predict(&self, labels: &LabelSet) -> SpectralResult<Array1<f64>> {
        let row = self.vectorizer.design_row(labels)?;
        Ok(self
            .pixels
            .iter()
            .map(|p| if p.status.is_usable() { p.coefficients.dot(&row) } else { f64::NAN })
            .collect())
    }

    /// Check that `other` would build the same design rows as this model's
    /// vectorizer.
    ///
    /// Errors
    /// ------
    /// - See [`LabelVectorizer::ensure_compatible`].
    pub fn ensure_compatible(&self, other: &LabelVectorizer) -> SpectralResult<()> {
        self.vectorizer.ensure_compatible(other)
    }

    pub fn summary(&self) -> TrainingSummary {
        let mut summary = TrainingSummary { n_pixels: self.n_pixels(), ..Default::default() };
        for pixel in &self.pixels {
            match pixel.status {
                PixelStatus::Fit => summary.n_fit += 1,
                PixelStatus::LowConfidence => summary.n_low_confidence += 1,
                PixelStatus::Unfit => summary.n_unfit += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::core::terms::LabelVectorSpec;
    use ndarray::array;

    fn vectorizer() -> LabelVectorizer {
        LabelVectorizer::new(
            LabelVectorSpec::quadratic(&["teff"]),
            vec![5000.0],
            vec![500.0],
            vec![4000.0],
            vec![6000.0],
        )
        .expect("valid vectorizer")
    }

    fn pixel(c: [f64; 3], status: PixelStatus) -> PixelCoefficients {
        PixelCoefficients { coefficients: Array1::from(c.to_vec()), scatter: 0.01, status, iterations: 3 }
    }

    #[test]
    // Purpose
    // -------
    // Prediction evaluates each pixel polynomial on centered labels and
    // leaves unfit pixels undefined.
    fn predict_evaluates_pixel_polynomials() {
        // Arrange
        let model = Model::new(
            array![5000.0, 5001.0, 5002.0],
            vectorizer(),
            vec![
                pixel([1.0, 1e-4, 0.0], PixelStatus::Fit),
                pixel([0.5, 0.0, 1e-8], PixelStatus::LowConfidence),
                PixelCoefficients::unfit(3),
            ],
        )
        .expect("consistent model");
        let labels = LabelSet::from_pairs(&[("teff", 5100.0)]).expect("valid labels");

        // Act
        let flux = model.predict(&labels).expect("matching names");

        // Assert
        assert!((flux[0] - 1.01).abs() < 1e-12);
        assert!((flux[1] - 0.5001).abs() < 1e-12);
        assert!(flux[2].is_nan());
    }

    #[test]
    fn new_rejects_inconsistent_shapes() {
        let short = Model::new(array![1.0, 2.0], vectorizer(), vec![PixelCoefficients::unfit(3)]);
        let wrong_k = Model::new(array![1.0], vectorizer(), vec![PixelCoefficients::unfit(2)]);

        assert_eq!(short, Err(SpectralError::PixelCountMismatch { expected: 2, found: 1 }));
        assert!(matches!(wrong_k, Err(SpectralError::LengthMismatch { expected: 3, found: 2, .. })));
    }

    #[test]
    fn summary_counts_statuses() {
        let model = Model::new(
            array![1.0, 2.0, 3.0, 4.0],
            vectorizer(),
            vec![
                pixel([1.0, 0.0, 0.0], PixelStatus::Fit),
                pixel([1.0, 0.0, 0.0], PixelStatus::Fit),
                pixel([1.0, 0.0, 0.0], PixelStatus::LowConfidence),
                PixelCoefficients::unfit(3),
            ],
        )
        .expect("consistent model");

        let summary = model.summary();

        assert_eq!(summary, TrainingSummary { n_pixels: 4, n_fit: 2, n_low_confidence: 1, n_unfit: 1 });
        assert_eq!(summary.to_string(), "4 pixels: 2 fit, 1 low-confidence, 1 unfit");
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [PixelStatus::Fit, PixelStatus::LowConfidence, PixelStatus::Unfit] {
            assert_eq!(PixelStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(PixelStatus::from_code(7), None);
    }
}
