//! Spectral validation helpers — reusable checks for spectra, labels and
//! option values.
//!
//! Purpose
//! -------
//! Centralize the small checks that every boundary constructor needs, so
//! [`Spectrum`](super::data::Spectrum), [`LabelSet`](super::data::LabelSet),
//! [`TrainingSet`](super::data::TrainingSet) and the option builders fail
//! fast with structured [`SpectralError`] values.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inverse variances are finite and `>= 0`; `0` marks a masked pixel.
//! - Flux only has to be finite where the inverse variance is positive.
//!   Masked pixels may carry NaN flux and are never read by a fit.
//! - Wavelengths and label values are finite.
//!
//! Conventions
//! -----------
//! - Helpers return `SpectralResult<()>` and never panic on invalid inputs.
//! - No I/O, no logging.
use crate::spectral::errors::{SpectralError, SpectralResult};
use ndarray::ArrayView1;
use std::collections::HashSet;

/// Validate an inverse-variance vector.
///
/// Errors
/// ------
/// - `SpectralError::InvalidInverseVariance` for the first entry that is
///   negative or non-finite.
pub fn validate_ivar(ivar: ArrayView1<f64>) -> SpectralResult<()> {
    for (index, &value) in ivar.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(SpectralError::InvalidInverseVariance { index, value });
        }
    }
    Ok(())
}

/// Validate flux against its inverse variance: unmasked flux must be finite.
///
/// Errors
/// ------
/// - `SpectralError::LengthMismatch` if the two vectors differ in length.
/// - `SpectralError::NonFiniteFlux` for the first unmasked non-finite entry.
pub fn validate_flux(flux: ArrayView1<f64>, ivar: ArrayView1<f64>) -> SpectralResult<()> {
    if flux.len() != ivar.len() {
        return Err(SpectralError::LengthMismatch {
            what: "inverse variance",
            expected: flux.len(),
            found: ivar.len(),
        });
    }
    for (index, (&value, &w)) in flux.iter().zip(ivar.iter()).enumerate() {
        if w > 0.0 && !value.is_finite() {
            return Err(SpectralError::NonFiniteFlux { index, value });
        }
    }
    Ok(())
}

/// Validate a wavelength grid: every entry finite.
pub fn validate_wavelength(wavelength: ArrayView1<f64>) -> SpectralResult<()> {
    for (index, &value) in wavelength.iter().enumerate() {
        if !value.is_finite() {
            return Err(SpectralError::NonFiniteWavelength { index, value });
        }
    }
    Ok(())
}

/// Validate label names: non-empty and unique.
///
/// Errors
/// ------
/// - `SpectralError::InvalidSpecification` for an empty list or an empty
///   name.
/// - `SpectralError::DuplicateLabel` for a repeated name.
pub fn validate_label_names(names: &[String]) -> SpectralResult<()> {
    if names.is_empty() {
        return Err(SpectralError::InvalidSpecification {
            reason: "at least one label must be declared".to_string(),
        });
    }
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if name.trim().is_empty() {
            return Err(SpectralError::InvalidSpecification {
                reason: "label names must be non-empty".to_string(),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(SpectralError::DuplicateLabel { name: name.clone() });
        }
    }
    Ok(())
}

/// Validate label values: one per name, all finite.
pub fn validate_label_values(names: &[String], values: ArrayView1<f64>) -> SpectralResult<()> {
    if names.len() != values.len() {
        return Err(SpectralError::LengthMismatch {
            what: "label values",
            expected: names.len(),
            found: values.len(),
        });
    }
    for (name, &value) in names.iter().zip(values.iter()) {
        if !value.is_finite() {
            return Err(SpectralError::NonFiniteLabel { name: name.clone(), value });
        }
    }
    Ok(())
}

/// Validate a tolerance-like option: finite and strictly positive.
pub fn validate_positive(name: &'static str, value: f64) -> SpectralResult<()> {
    if !value.is_finite() {
        return Err(SpectralError::InvalidOption { name, value, reason: "must be finite" });
    }
    if value <= 0.0 {
        return Err(SpectralError::InvalidOption { name, value, reason: "must be > 0" });
    }
    Ok(())
}

/// Validate a scatter-like option: finite and `>= 0`.
pub fn validate_non_negative(name: &'static str, value: f64) -> SpectralResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SpectralError::InvalidOption {
            name,
            value,
            reason: "must be finite and >= 0",
        });
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
    // - Inverse-variance, flux and wavelength checks, including masked NaN
    //   flux being accepted.
    // - Label name uniqueness and label value finiteness.
    // - Option range checks.
    // -------------------------------------------------------------------------

    #[test]
    fn validate_ivar_rejects_negative_and_nan() {
        assert!(validate_ivar(array![0.0, 1.0, 4.0].view()).is_ok());
        assert_eq!(
            validate_ivar(array![1.0, -1.0].view()),
            Err(SpectralError::InvalidInverseVariance { index: 1, value: -1.0 })
        );
        assert!(matches!(
            validate_ivar(array![f64::NAN].view()),
            Err(SpectralError::InvalidInverseVariance { index: 0, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // NaN flux is tolerated on masked pixels and rejected on unmasked ones.
    fn validate_flux_only_checks_unmasked_pixels() {
        let flux = array![1.0, f64::NAN, 0.9];

        assert!(validate_flux(flux.view(), array![1.0, 0.0, 1.0].view()).is_ok());
        assert!(matches!(
            validate_flux(flux.view(), array![1.0, 1.0, 1.0].view()),
            Err(SpectralError::NonFiniteFlux { index: 1, .. })
        ));
    }

    #[test]
    fn validate_label_names_rejects_duplicates_and_empty_lists() {
        let dup = vec!["teff".to_string(), "logg".to_string(), "teff".to_string()];

        assert_eq!(
            validate_label_names(&dup),
            Err(SpectralError::DuplicateLabel { name: "teff".into() })
        );
        assert!(matches!(
            validate_label_names(&[]),
            Err(SpectralError::InvalidSpecification { .. })
        ));
    }

    #[test]
    fn validate_label_values_checks_length_and_finiteness() {
        let names = vec!["teff".to_string(), "logg".to_string()];

        assert!(validate_label_values(&names, array![5000.0, 4.4].view()).is_ok());
        assert!(matches!(
            validate_label_values(&names, array![5000.0].view()),
            Err(SpectralError::LengthMismatch { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            validate_label_values(&names, array![5000.0, f64::INFINITY].view()),
            Err(SpectralError::NonFiniteLabel { .. })
        ));
    }

    #[test]
    fn option_checks_enforce_sign() {
        assert!(validate_positive("tol", 1e-8).is_ok());
        assert!(validate_positive("tol", 0.0).is_err());
        assert!(validate_non_negative("scatter", 0.0).is_ok());
        assert!(validate_non_negative("scatter", f64::NAN).is_err());
    }
}
