//! LabelVectorizer — labels to design-matrix rows.
//!
//! Purpose
//! -------
//! Turn a label tuple into the ordered feature vector used by every pixel
//! model. The vectorizer owns the expanded term list and the statistics it
//! froze from the training set: pivots (label means) for centering, scales
//! (standard deviations) for conditioning the inference optimizer, and the
//! per-label training range for extrapolation checks.
//!
//! Key behaviors
//! -------------
//! - [`LabelVectorizer::from_training_set`] validates the specification,
//!   checks label names against the training set and freezes the
//!   statistics.
//! - [`LabelVectorizer::design_row`] / [`LabelVectorizer::design_matrix`]
//!   evaluate the terms on centered labels.
//! - [`LabelVectorizer::design_jacobian`] returns `∂row/∂label`, the local
//!   linearization used by label inference.
//! - [`LabelVectorizer::ensure_pivots`] / [`LabelVectorizer::ensure_compatible`]
//!   detect a vectorizer reused with different pivots (`PivotMismatch`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Pivots, scales and bounds have one entry per label; all finite; scales
//!   strictly positive; `lower <= upper`.
//! - Nothing is recomputed after construction: the same vectorizer yields
//!   the same row for the same labels in training and inference.
//!
//! Conventions
//! -----------
//! - Column `0` is always the bias and columns `1..=n_labels` the linear
//!   terms in declared label order.
//! - Scales are not applied to design rows; they only define the
//!   optimizer's working coordinates `(label - pivot) / scale`.
use crate::spectral::{
    core::{
        data::{LabelSet, TrainingSet},
        terms::{LabelVectorSpec, Term},
    },
    errors::{SpectralError, SpectralResult},
};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as degenerate and replaced by
/// a unit scale.
const MIN_LABEL_SCALE: f64 = 1e-12;

/// Frozen label vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelVectorizer {
    spec: LabelVectorSpec,
    terms: Vec<Term>,
    pivots: Vec<f64>,
    scales: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl LabelVectorizer {
    /// Construct a vectorizer from explicit statistics.
    ///
    /// Parameters
    /// ----------
    /// - `spec`: label-vector specification, expanded and validated here.
    /// - `pivots`: per-label centering values.
    /// - `scales`: per-label working scales, `> 0`.
    /// - `lower`, `upper`: per-label range used for extrapolation flags.
    ///
    /// Errors
    /// ------
    /// - Any error from [`LabelVectorSpec::expand`].
    /// - `SpectralError::LengthMismatch` when a statistic has the wrong
    ///   length.
    /// - `SpectralError::NonFiniteLabel` for non-finite statistics.
    /// - `SpectralError::InvalidOption` for a non-positive scale or
    ///   `lower > upper`.
    pub fn new(
        spec: LabelVectorSpec, pivots: Vec<f64>, scales: Vec<f64>, lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> SpectralResult<Self> {
        let terms = spec.expand()?;
        let n = spec.label_names.len();
        for (what, values) in
            [("pivots", &pivots), ("scales", &scales), ("lower bounds", &lower), ("upper bounds", &upper)]
        {
            if values.len() != n {
                return Err(SpectralError::LengthMismatch { what, expected: n, found: values.len() });
            }
            for (name, &value) in spec.label_names.iter().zip(values.iter()) {
                if !value.is_finite() {
                    return Err(SpectralError::NonFiniteLabel { name: name.clone(), value });
                }
            }
        }
        for i in 0..n {
            if scales[i] <= 0.0 {
                return Err(SpectralError::InvalidOption {
                    name: "label scale",
                    value: scales[i],
                    reason: "must be > 0",
                });
            }
            if lower[i] > upper[i] {
                return Err(SpectralError::InvalidOption {
                    name: "label lower bound",
                    value: lower[i],
                    reason: "must not exceed the upper bound",
                });
            }
        }
        Ok(Self { spec, terms, pivots, scales, lower, upper })
    }

    /// from_training_set — freeze statistics from a training set.
    ///
    /// Pivots are the label means, scales the population standard deviations
    /// (`1` when a label is constant), bounds the per-label min and max.
    ///
    /// Errors
    /// ------
    /// - Any error from [`LabelVectorSpec::expand`].
    /// - `SpectralError::LabelNameMismatch` when the specification's labels differ
    ///   from the training set's (names or order).
    pub fn from_training_set(
        spec: LabelVectorSpec, training_set: &TrainingSet,
    ) -> SpectralResult<Self> {
        spec.expand()?;
        if spec.label_names.as_slice() != training_set.label_names() {
            return Err(SpectralError::LabelNameMismatch {
                expected: spec.label_names.clone(),
                found: training_set.label_names().to_vec(),
            });
        }
        let labels = training_set.labels();
        let pivots = training_set.label_means();
        let scales = labels
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s.is_finite() && s > MIN_LABEL_SCALE { s } else { 1.0 });
        let lower = labels.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let upper = labels.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));
        Self::new(spec, pivots.to_vec(), scales.to_vec(), lower.to_vec(), upper.to_vec())
    }

    pub fn spec(&self) -> &LabelVectorSpec {
        &self.spec
    }

    pub fn label_names(&self) -> &[String] {
        &self.spec.label_names
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn n_labels(&self) -> usize {
        self.spec.label_names.len()
    }

    pub fn pivots(&self) -> &[f64] {
        &self.pivots
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Per-label `(min, max)` seen in training.
    pub fn label_bounds(&self) -> (&[f64], &[f64]) {
        (&self.lower, &self.upper)
    }

    /// Pivot labels as a [`LabelSet`] (the default inference start).
    pub fn pivot_labels(&self) -> LabelSet {
        LabelSet::from_validated(self.spec.label_names.clone(), Array1::from(self.pivots.clone()))
    }

    /// Human-readable term names in column order.
    pub fn term_names(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.display_with(&self.spec.label_names)).collect()
    }

    /// design_row — feature vector for one label set.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::LabelNameMismatch` if the label names or their order
    ///   differ from the vectorizer's.
    pub fn design_row(&self, labels: &LabelSet) -> SpectralResult<Array1<f64>> {
        labels.ensure_names(self.label_names())?;
        Ok(self.design_row_values(labels.values()))
    }

    /// Feature vector for raw label values in declared order.
    ///
    /// # Panics
    /// - If `values.len() != n_labels()`.
    pub fn design_row_values(&self, values: ArrayView1<f64>) -> Array1<f64> {
        let x = self.centered(values);
        self.terms.iter().map(|t| t.evaluate(x.view())).collect()
    }

    /// design_jacobian — `∂row_k / ∂label_j` as an `n_terms × n_labels`
    /// matrix, evaluated at raw label values.
    pub fn design_jacobian(&self, values: ArrayView1<f64>) -> Array2<f64> {
        let x = self.centered(values);
        let mut jac = Array2::zeros((self.n_terms(), self.n_labels()));
        for (k, term) in self.terms.iter().enumerate() {
            jac.row_mut(k).assign(&term.gradient(x.view()));
        }
        jac
    }

    /// Design matrix (`n_stars × n_terms`) of a training set.
    pub fn design_matrix(&self, training_set: &TrainingSet) -> Array2<f64> {
        let labels = training_set.labels();
        let mut design = Array2::zeros((labels.nrows(), self.n_terms()));
        for (star, row) in labels.outer_iter().enumerate() {
            design.row_mut(star).assign(&self.design_row_values(row));
        }
        design
    }

    /// Whether design column `term` depends on label `label`.
    pub fn involves(&self, term: usize, label: usize) -> bool {
        self.terms.get(term).is_some_and(|t| t.involves(label))
    }

    /// Labels `label - pivot`.
    pub fn centered(&self, values: ArrayView1<f64>) -> Array1<f64> {
        assert_eq!(values.len(), self.n_labels(), "label vector has the wrong length");
        values.iter().zip(self.pivots.iter()).map(|(v, p)| v - p).collect()
    }

    /// Map raw labels to working coordinates `(label - pivot) / scale`.
    pub fn to_working(&self, values: ArrayView1<f64>) -> Array1<f64> {
        self.centered(values).iter().zip(self.scales.iter()).map(|(c, s)| c / s).collect()
    }

    /// Inverse of [`LabelVectorizer::to_working`].
    pub fn from_working(&self, theta: ArrayView1<f64>) -> Array1<f64> {
        theta
            .iter()
            .zip(self.scales.iter().zip(self.pivots.iter()))
            .map(|(t, (s, p))| p + s * t)
            .collect()
    }

    /// Indices of labels outside the training range.
    pub fn outside_bounds(&self, values: ArrayView1<f64>) -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter(|&(i, &v)| v < self.lower[i] || v > self.upper[i])
            .map(|(i, _)| i)
            .collect()
    }

    /// ensure_pivots — check pivots against expected values, exactly.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::LengthMismatch` for the wrong number of pivots.
    /// - `SpectralError::PivotMismatch` at the first label whose pivot
    ///   differs.
    pub fn ensure_pivots(&self, expected: &[f64]) -> SpectralResult<()> {
        if expected.len() != self.pivots.len() {
            return Err(SpectralError::LengthMismatch {
                what: "pivots",
                expected: self.pivots.len(),
                found: expected.len(),
            });
        }
        for ((name, &exp), &found) in
            self.spec.label_names.iter().zip(expected.iter()).zip(self.pivots.iter())
        {
            if exp.to_bits() != found.to_bits() {
                return Err(SpectralError::PivotMismatch {
                    label: name.clone(),
                    expected: exp,
                    found,
                });
            }
        }
        Ok(())
    }

    /// ensure_compatible — check that `other` builds identical design rows.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::LabelNameMismatch` for different labels.
    /// - `SpectralError::InvalidSpecification` for different term lists.
    /// - `SpectralError::PivotMismatch` for different pivots.
    pub fn ensure_compatible(&self, other: &LabelVectorizer) -> SpectralResult<()> {
        if self.label_names() != other.label_names() {
            return Err(SpectralError::LabelNameMismatch {
                expected: self.label_names().to_vec(),
                found: other.label_names().to_vec(),
            });
        }
        if self.terms != other.terms {
            return Err(SpectralError::InvalidSpecification {
                reason: format!(
                    "term lists differ: expected {:?}, found {:?}",
                    self.term_names(),
                    other.term_names()
                ),
            });
        }
        other.ensure_pivots(&self.pivots)
    }
}
