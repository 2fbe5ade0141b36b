//! Spectral data containers for training and inference.
//!
//! Purpose
//! -------
//! Provide small, validated containers for the inputs of the spectral model:
//! a single observed [`Spectrum`], the named labels of one star
//! ([`LabelSet`]), and a dense reference [`TrainingSet`]. Validation happens
//! once, at construction, so fits and inference can index without checks.
//!
//! Key behaviors
//! -------------
//! - [`Spectrum::new`] checks that wavelength, flux and inverse variance are
//!   aligned, that inverse variances are finite and `>= 0`, and that
//!   unmasked flux is finite.
//! - [`LabelSet::new`] checks unique names and finite values.
//! - [`TrainingSet`] stores flux and inverse variance as `stars × pixels`
//!   matrices and labels as a `stars × labels` matrix; it is built either
//!   from `(Spectrum, LabelSet)` pairs or directly from arrays.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every spectrum in a training set shares the same wavelength grid
//!   (compared exactly) and pixel count.
//! - Every label set in a training set has the same names in the same order.
//! - Inputs are continuum-normalized upstream; no physical plausibility
//!   checks are performed on flux values.
//!
//! Conventions
//! -----------
//! - Pixel `i` always corresponds to `wavelength[i]`; ordering is never
//!   changed by any operation in this crate.
//! - An inverse variance of `0` marks a masked pixel.
use crate::spectral::{
    core::validation::{
        validate_flux, validate_ivar, validate_label_names, validate_label_values,
        validate_wavelength,
    },
    errors::{SpectralError, SpectralResult},
};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// One observed spectrum on a fixed wavelength grid.
///
/// Fields
/// ------
/// - `wavelength`: grid positions, finite.
/// - `flux`: normalized flux; finite wherever `ivar > 0`.
/// - `ivar`: inverse variance `1/σ²`, finite and `>= 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    wavelength: Array1<f64>,
    flux: Array1<f64>,
    ivar: Array1<f64>,
}

impl Spectrum {
    /// Construct a validated spectrum.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::LengthMismatch` when the three arrays differ in
    ///   length.
    /// - `SpectralError::NonFiniteWavelength`,
    ///   `SpectralError::InvalidInverseVariance`, `SpectralError::NonFiniteFlux`
    ///   from the element checks.
    pub fn new(
        wavelength: Array1<f64>, flux: Array1<f64>, ivar: Array1<f64>,
    ) -> SpectralResult<Self> {
        if flux.len() != wavelength.len() {
            return Err(SpectralError::LengthMismatch {
                what: "flux",
                expected: wavelength.len(),
                found: flux.len(),
            });
        }
        validate_wavelength(wavelength.view())?;
        validate_ivar(ivar.view())?;
        validate_flux(flux.view(), ivar.view())?;
        Ok(Self { wavelength, flux, ivar })
    }

    pub fn wavelength(&self) -> ArrayView1<'_, f64> {
        self.wavelength.view()
    }

    pub fn flux(&self) -> ArrayView1<'_, f64> {
        self.flux.view()
    }

    pub fn ivar(&self) -> ArrayView1<'_, f64> {
        self.ivar.view()
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    /// Number of unmasked pixels (`ivar > 0`).
    pub fn n_unmasked(&self) -> usize {
        self.ivar.iter().filter(|&&w| w > 0.0).count()
    }
}

/// Named label values for one star.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    names: Vec<String>,
    values: Array1<f64>,
}

impl LabelSet {
    /// Construct a validated label set.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::DuplicateLabel` / `InvalidSpecification` for bad
    ///   names.
    /// - `SpectralError::LengthMismatch` when `values.len() != names.len()`.
    /// - `SpectralError::NonFiniteLabel` for NaN or infinite values.
    pub fn new(names: Vec<String>, values: Array1<f64>) -> SpectralResult<Self> {
        validate_label_names(&names)?;
        validate_label_values(&names, values.view())?;
        Ok(Self { names, values })
    }

    /// Wrap names and values that were validated elsewhere.
    pub(crate) fn from_validated(names: Vec<String>, values: Array1<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    /// Build a label set from `(name, value)` pairs, keeping their order.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[(S, f64)]) -> SpectralResult<Self> {
        let names = pairs.iter().map(|(n, _)| n.as_ref().to_string()).collect();
        let values = pairs.iter().map(|(_, v)| *v).collect();
        Self::new(names, values)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// Value of the label called `name`, if declared.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| n == name).map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check that names and order match `expected`.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::LabelNameMismatch` otherwise.
    pub fn ensure_names(&self, expected: &[String]) -> SpectralResult<()> {
        if self.names.as_slice() != expected {
            return Err(SpectralError::LabelNameMismatch {
                expected: expected.to_vec(),
                found: self.names.clone(),
            });
        }
        Ok(())
    }
}

/// Dense reference set of labeled spectra on a shared grid.
///
/// Fields
/// ------
/// - `wavelength`: shared grid (`n_pixels`).
/// - `flux`, `ivar`: `n_stars × n_pixels`.
/// - `label_names`: declared label order.
/// - `labels`: `n_stars × n_labels`.
///
/// Invariants
/// ----------
/// - `n_stars >= 1`, `n_pixels >= 1`.
/// - All element-level invariants of [`Spectrum`] and [`LabelSet`] hold row
///   by row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    wavelength: Array1<f64>,
    flux: Array2<f64>,
    ivar: Array2<f64>,
    label_names: Vec<String>,
    labels: Array2<f64>,
}

impl TrainingSet {
    /// Assemble a training set from `(Spectrum, LabelSet)` pairs.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::EmptyTrainingSet` for an empty list.
    /// - `SpectralError::PixelCountMismatch` / `WavelengthMismatch` when a
    ///   spectrum is not on the first spectrum's grid.
    /// - `SpectralError::LabelNameMismatch` when a label set disagrees with
    ///   the first one.
    pub fn from_pairs(pairs: &[(Spectrum, LabelSet)]) -> SpectralResult<Self> {
        let (first_spec, first_labels) = pairs.first().ok_or(SpectralError::EmptyTrainingSet)?;
        let n_stars = pairs.len();
        let n_pixels = first_spec.len();
        let n_labels = first_labels.len();
        let wavelength = first_spec.wavelength.clone();
        let label_names = first_labels.names.clone();

        let mut flux = Array2::zeros((n_stars, n_pixels));
        let mut ivar = Array2::zeros((n_stars, n_pixels));
        let mut labels = Array2::zeros((n_stars, n_labels));
        for (star, (spectrum, label_set)) in pairs.iter().enumerate() {
            ensure_same_grid(wavelength.view(), spectrum.wavelength())?;
            label_set.ensure_names(&label_names)?;
            flux.row_mut(star).assign(&spectrum.flux);
            ivar.row_mut(star).assign(&spectrum.ivar);
            labels.row_mut(star).assign(&label_set.values);
        }
        Self::from_parts(wavelength, flux, ivar, label_names, labels)
    }

    /// Assemble a training set from dense arrays.
    ///
    /// Parameters
    /// ----------
    /// - `wavelength`: `n_pixels` grid.
    /// - `flux`, `ivar`: `n_stars × n_pixels`.
    /// - `label_names`: `n_labels` unique names.
    /// - `labels`: `n_stars × n_labels`.
    ///
    /// Errors
    /// ------
    /// - Shape mismatches as `SpectralError::LengthMismatch` or
    ///   `PixelCountMismatch`; element errors as in [`Spectrum::new`] and
    ///   [`LabelSet::new`].
    pub fn from_arrays(
        wavelength: Array1<f64>, flux: Array2<f64>, ivar: Array2<f64>, label_names: Vec<String>,
        labels: Array2<f64>,
    ) -> SpectralResult<Self> {
        Self::from_parts(wavelength, flux, ivar, label_names, labels)
    }

    fn from_parts(
        wavelength: Array1<f64>, flux: Array2<f64>, ivar: Array2<f64>, label_names: Vec<String>,
        labels: Array2<f64>,
    ) -> SpectralResult<Self> {
        let n_stars = flux.nrows();
        if n_stars == 0 {
            return Err(SpectralError::EmptyTrainingSet);
        }
        if wavelength.is_empty() {
            return Err(SpectralError::PixelCountMismatch { expected: 1, found: 0 });
        }
        if flux.ncols() != wavelength.len() {
            return Err(SpectralError::PixelCountMismatch {
                expected: wavelength.len(),
                found: flux.ncols(),
            });
        }
        if ivar.dim() != flux.dim() {
            return Err(SpectralError::LengthMismatch {
                what: "inverse variance rows",
                expected: n_stars,
                found: ivar.nrows(),
            });
        }
        if labels.nrows() != n_stars {
            return Err(SpectralError::LengthMismatch {
                what: "label rows",
                expected: n_stars,
                found: labels.nrows(),
            });
        }
        validate_wavelength(wavelength.view())?;
        validate_label_names(&label_names)?;
        for star in 0..n_stars {
            validate_ivar(ivar.row(star))?;
            validate_flux(flux.row(star), ivar.row(star))?;
            validate_label_values(&label_names, labels.row(star))?;
        }
        Ok(Self { wavelength, flux, ivar, label_names, labels })
    }

    pub fn n_stars(&self) -> usize {
        self.flux.nrows()
    }

    pub fn n_pixels(&self) -> usize {
        self.flux.ncols()
    }

    pub fn n_labels(&self) -> usize {
        self.label_names.len()
    }

    pub fn wavelength(&self) -> ArrayView1<'_, f64> {
        self.wavelength.view()
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// `n_stars × n_labels` label matrix.
    pub fn labels(&self) -> &Array2<f64> {
        &self.labels
    }

    /// Flux of every star at one pixel.
    pub fn pixel_flux(&self, pixel: usize) -> ArrayView1<'_, f64> {
        self.flux.column(pixel)
    }

    /// Inverse variance of every star at one pixel.
    pub fn pixel_ivar(&self, pixel: usize) -> ArrayView1<'_, f64> {
        self.ivar.column(pixel)
    }

    /// Label set of one star.
    ///
    /// # Panics
    /// - If `star >= n_stars()`.
    pub fn star_labels(&self, star: usize) -> LabelSet {
        LabelSet::from_validated(self.label_names.clone(), self.labels.row(star).to_owned())
    }

    /// Per-label mean over stars.
    pub fn label_means(&self) -> Array1<f64> {
        self.labels.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(self.n_labels()))
    }
}

/// Check that `found` is the same grid as `expected`, value by value.
///
/// Errors
/// ------
/// - `SpectralError::PixelCountMismatch` for different lengths.
/// - `SpectralError::WavelengthMismatch` at the first differing pixel.
pub fn ensure_same_grid(expected: ArrayView1<f64>, found: ArrayView1<f64>) -> SpectralResult<()> {
    if expected.len() != found.len() {
        return Err(SpectralError::PixelCountMismatch {
            expected: expected.len(),
            found: found.len(),
        });
    }
    for (pixel, (&e, &f)) in expected.iter().zip(found.iter()).enumerate() {
        if e != f {
            return Err(SpectralError::WavelengthMismatch { pixel, expected: e, found: f });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `Spectrum::new` alignment and element checks.
    // - `LabelSet` construction and lookups.
    // - `TrainingSet::from_pairs` grid and label-name consistency.
    // -------------------------------------------------------------------------

    fn spectrum(flux: Array1<f64>) -> Spectrum {
        let n = flux.len();
        let wl = Array1::from_iter((0..n).map(|i| 5000.0 + i as f64));
        Spectrum::new(wl, flux, Array1::from_elem(n, 100.0)).expect("valid spectrum")
    }

    #[test]
    fn spectrum_rejects_misaligned_arrays() {
        let res = Spectrum::new(array![1.0, 2.0], array![1.0], array![1.0, 1.0]);

        assert!(matches!(res, Err(SpectralError::LengthMismatch { what: "flux", .. })));
    }

    #[test]
    fn spectrum_counts_unmasked_pixels() {
        let s = Spectrum::new(array![1.0, 2.0, 3.0], array![1.0, f64::NAN, 1.0], array![
            4.0, 0.0, 1.0
        ])
        .expect("masked NaN flux is allowed");

        assert_eq!(s.len(), 3);
        assert_eq!(s.n_unmasked(), 2);
    }

    #[test]
    fn label_set_lookup_by_name() {
        let labels = LabelSet::from_pairs(&[("teff", 4800.0), ("logg", 2.5)]).expect("valid");

        assert_eq!(labels.get("logg"), Some(2.5));
        assert_eq!(labels.get("feh"), None);
        assert_eq!(labels.names(), &["teff".to_string(), "logg".to_string()]);
    }

    #[test]
    // Purpose
    // -------
    // Pairs must share one grid and one label order.
    //
    // Expect
    // ------
    // - A shifted grid yields `WavelengthMismatch` at the first pixel.
    // - Reordered labels yield `LabelNameMismatch`.
    fn training_set_from_pairs_checks_consistency() {
        // Arrange
        let a = (spectrum(array![1.0, 0.9]), LabelSet::from_pairs(&[("x", 1.0)]).expect("ok"));
        let shifted = Spectrum::new(array![1.0, 2.0], array![1.0, 1.0], array![1.0, 1.0])
            .expect("valid spectrum");
        let b = (shifted, LabelSet::from_pairs(&[("x", 2.0)]).expect("ok"));
        let c = (spectrum(array![1.0, 0.8]), LabelSet::from_pairs(&[("y", 2.0)]).expect("ok"));

        // Act / Assert
        assert!(matches!(
            TrainingSet::from_pairs(&[a.clone(), b]),
            Err(SpectralError::WavelengthMismatch { pixel: 0, .. })
        ));
        assert!(matches!(
            TrainingSet::from_pairs(&[a.clone(), c]),
            Err(SpectralError::LabelNameMismatch { .. })
        ));
        assert_eq!(TrainingSet::from_pairs(&[]), Err(SpectralError::EmptyTrainingSet));
    }

    #[test]
    fn training_set_exposes_pixel_columns_and_means() {
        let pairs = vec![
            (spectrum(array![1.0, 0.5]), LabelSet::from_pairs(&[("x", 1.0)]).expect("ok")),
            (spectrum(array![0.8, 0.7]), LabelSet::from_pairs(&[("x", 3.0)]).expect("ok")),
        ];

        let ts = TrainingSet::from_pairs(&pairs).expect("valid training set");

        assert_eq!(ts.n_stars(), 2);
        assert_eq!(ts.n_pixels(), 2);
        assert_eq!(ts.pixel_flux(1), array![0.5, 0.7]);
        assert_eq!(ts.label_means(), array![2.0]);
        assert_eq!(ts.star_labels(1).get("x"), Some(3.0));
    }
}
