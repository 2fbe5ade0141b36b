//! Label-vector terms — closed polynomial term type and its specification.
//!
//! Purpose
//! -------
//! Describe which polynomial features of the labels enter the design matrix.
//! A [`Term`] is a validated monomial in centered labels; a
//! [`LabelVectorSpec`] declares label names, a maximum total degree and a
//! cross-term policy, and expands into the ordered term list used by the
//! vectorizer.
//!
//! Key behaviors
//! -------------
//! - [`Term`] is a tagged variant (bias / linear / power / cross) built in
//!   canonical form by [`Term::monomial`] and parsed from strings such as
//!   `"teff"`, `"teff^2"`, `"teff*logg"` or `"logg^2*feh"` by [`Term::parse`].
//! - [`LabelVectorSpec::expand`] validates the specification once and returns
//!   the term list: bias first, then one linear term per label in declared
//!   order, then higher-order terms by increasing degree.
//!
//! Invariants & assumptions
//! ------------------------
//! - Label indices inside a [`Term`] always refer to the declaring spec's
//!   label list; exponents are `>= 1`; `Cross` holds at least two distinct
//!   labels sorted by index.
//! - The declared degree is a `usize`, so a negative degree cannot be
//!   expressed; a degree of `0` is rejected because linear terms are always
//!   present.
//!
//! Conventions
//! -----------
//! - Terms are evaluated on centered labels `x = label - pivot`.
//! - Higher-order terms of equal degree are ordered by descending exponent
//!   vector, e.g. `a^2, a*b, b^2` for labels `(a, b)`.
use crate::spectral::{
    core::validation::validate_label_names,
    errors::{SpectralError, SpectralResult},
};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One column of the design matrix: a monomial in centered labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    /// Constant `1`.
    Bias,
    /// `x[label]`.
    Linear { label: usize },
    /// `x[label]^exponent` with `exponent >= 2`.
    Power { label: usize, exponent: u32 },
    /// `Π x[label]^exponent` over at least two distinct labels.
    Cross { factors: Vec<(usize, u32)> },
}

impl Term {
    /// Build a term in canonical form from `(label, exponent)` factors.
    ///
    /// Repeated labels are merged, zero exponents dropped and factors sorted
    /// by label; the variant follows from what remains.
    pub fn monomial(factors: &[(usize, u32)]) -> Self {
        let mut merged: Vec<(usize, u32)> = Vec::with_capacity(factors.len());
        for &(label, exponent) in factors {
            if exponent == 0 {
                continue;
            }
            match merged.iter_mut().find(|(l, _)| *l == label) {
                Some((_, e)) => *e += exponent,
                None => merged.push((label, exponent)),
            }
        }
        merged.sort_unstable_by_key(|&(l, _)| l);
        match merged.as_slice() {
            [] => Term::Bias,
            [(label, 1)] => Term::Linear { label: *label },
            [(label, exponent)] => Term::Power { label: *label, exponent: *exponent },
            _ => Term::Cross { factors: merged },
        }
    }

    /// Parse a term such as `"teff^2*logg"` against declared label names.
    ///
    /// Factors are separated by `*`; each is a label name optionally followed
    /// by `^k` with `k >= 1`. Whitespace around tokens is ignored, and `"1"`
    /// denotes the bias.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::InvalidTerm` for empty factors or bad exponents.
    /// - `SpectralError::UnknownLabel` for names not in `label_names`.
    pub fn parse(text: &str, label_names: &[String]) -> SpectralResult<Self> {
        let trimmed = text.trim();
        if trimmed == "1" {
            return Ok(Term::Bias);
        }
        let mut factors = Vec::new();
        for raw in trimmed.split('*') {
            let factor = raw.trim();
            let (name, exponent) = match factor.split_once('^') {
                Some((name, exp)) => {
                    let exponent = exp.trim().parse::<u32>().map_err(|_| {
                        SpectralError::InvalidTerm {
                            term: text.to_string(),
                            reason: "exponents must be positive integers",
                        }
                    })?;
                    (name.trim(), exponent)
                }
                None => (factor, 1),
            };
            if name.is_empty() {
                return Err(SpectralError::InvalidTerm {
                    term: text.to_string(),
                    reason: "empty factor",
                });
            }
            if exponent == 0 {
                return Err(SpectralError::InvalidTerm {
                    term: text.to_string(),
                    reason: "exponents must be positive integers",
                });
            }
            let label = label_names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| SpectralError::UnknownLabel { name: name.to_string() })?;
            factors.push((label, exponent));
        }
        Ok(Term::monomial(&factors))
    }

    /// Factors as `(label, exponent)` pairs; empty for the bias.
    pub fn factors(&self) -> Vec<(usize, u32)> {
        match self {
            Term::Bias => Vec::new(),
            Term::Linear { label } => vec![(*label, 1)],
            Term::Power { label, exponent } => vec![(*label, *exponent)],
            Term::Cross { factors } => factors.clone(),
        }
    }

    /// Total polynomial degree.
    pub fn degree(&self) -> u32 {
        match self {
            Term::Bias => 0,
            Term::Linear { .. } => 1,
            Term::Power { exponent, .. } => *exponent,
            Term::Cross { factors } => factors.iter().map(|(_, e)| e).sum(),
        }
    }

    /// Whether `label` appears in this term.
    pub fn involves(&self, label: usize) -> bool {
        match self {
            Term::Bias => false,
            Term::Linear { label: l } | Term::Power { label: l, .. } => *l == label,
            Term::Cross { factors } => factors.iter().any(|(l, _)| *l == label),
        }
    }

    /// Largest label index referenced, if any.
    fn max_label(&self) -> Option<usize> {
        self.factors().iter().map(|(l, _)| *l).max()
    }

    /// Value of the term at centered labels `x`.
    pub fn evaluate(&self, x: ArrayView1<f64>) -> f64 {
        match self {
            Term::Bias => 1.0,
            Term::Linear { label } => x[*label],
            Term::Power { label, exponent } => x[*label].powi(*exponent as i32),
            Term::Cross { factors } => {
                factors.iter().map(|&(l, e)| x[l].powi(e as i32)).product()
            }
        }
    }

    /// Partial derivatives of the term with respect to each centered label.
    pub fn gradient(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let mut grad = Array1::zeros(x.len());
        let factors = self.factors();
        for (i, &(label, exponent)) in factors.iter().enumerate() {
            let mut d = exponent as f64 * x[label].powi(exponent as i32 - 1);
            for (j, &(other, e)) in factors.iter().enumerate() {
                if i != j {
                    d *= x[other].powi(e as i32);
                }
            }
            grad[label] = d;
        }
        grad
    }

    /// Human-readable form using label names, e.g. `"teff^2*logg"`.
    pub fn display_with(&self, label_names: &[String]) -> String {
        let factors = self.factors();
        if factors.is_empty() {
            return "1".to_string();
        }
        factors
            .iter()
            .map(|&(l, e)| {
                let name = label_names.get(l).map(String::as_str).unwrap_or("?");
                if e == 1 {
                    name.to_string()
                } else {
                    format!("{name}^{e}")
                }
            })
            .collect::<Vec<_>>()
            .join("*")
    }
}

/// Which higher-order terms a specification includes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "terms", rename_all = "snake_case")]
pub enum CrossTerms {
    /// Every monomial of total degree `2..=degree`.
    All,
    /// Pure powers `x^2..=x^degree` of each label only.
    None,
    /// Exactly the listed terms (strings parsed with [`Term::parse`]).
    Explicit(Vec<String>),
}

/// Declared label-vector specification.
///
/// Fields
/// ------
/// - `label_names`: label order used everywhere downstream.
/// - `degree`: maximum total degree of any term (`>= 1`).
/// - `cross_terms`: policy for terms of degree `>= 2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVectorSpec {
    pub label_names: Vec<String>,
    pub degree: usize,
    pub cross_terms: CrossTerms,
}

impl LabelVectorSpec {
    pub fn new<S: AsRef<str>>(label_names: &[S], degree: usize, cross_terms: CrossTerms) -> Self {
        Self {
            label_names: label_names.iter().map(|s| s.as_ref().to_string()).collect(),
            degree,
            cross_terms,
        }
    }

    /// Full quadratic model: all terms up to degree 2.
    pub fn quadratic<S: AsRef<str>>(label_names: &[S]) -> Self {
        Self::new(label_names, 2, CrossTerms::All)
    }

    /// expand — validate the specification and list its terms in order.
    ///
    /// Returns
    /// -------
    /// `Vec<Term>` starting with `Term::Bias`, then `Term::Linear` for each
    /// label in declared order, then the higher-order terms.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::InvalidSpecification` for `degree == 0` or an empty
    ///   label list.
    /// - `SpectralError::DuplicateLabel` for repeated names.
    /// - `SpectralError::UnknownLabel` / `InvalidTerm` from parsing explicit
    ///   terms, `TermDegreeExceeded` when one exceeds `degree`, and
    ///   `InvalidTerm` when one is listed twice or duplicates the bias or a
    ///   linear term.
    pub fn expand(&self) -> SpectralResult<Vec<Term>> {
        validate_label_names(&self.label_names)?;
        if self.degree == 0 {
            return Err(SpectralError::InvalidSpecification {
                reason: "degree must be at least 1".to_string(),
            });
        }
        let n_labels = self.label_names.len();
        let mut terms = Vec::with_capacity(1 + n_labels);
        terms.push(Term::Bias);
        terms.extend((0..n_labels).map(|label| Term::Linear { label }));

        match &self.cross_terms {
            CrossTerms::All => {
                for degree in 2..=self.degree {
                    for exponents in exponent_vectors(n_labels, degree as u32) {
                        let factors: Vec<(usize, u32)> =
                            exponents.iter().copied().enumerate().collect();
                        terms.push(Term::monomial(&factors));
                    }
                }
            }
            CrossTerms::None => {
                for degree in 2..=self.degree {
                    for label in 0..n_labels {
                        terms.push(Term::Power { label, exponent: degree as u32 });
                    }
                }
            }
            CrossTerms::Explicit(list) => {
                let mut seen: HashSet<Term> = terms.iter().cloned().collect();
                for text in list {
                    let term = Term::parse(text, &self.label_names)?;
                    let degree = term.degree() as usize;
                    if degree > self.degree {
                        return Err(SpectralError::TermDegreeExceeded {
                            term: text.clone(),
                            degree,
                            max_degree: self.degree,
                        });
                    }
                    if !seen.insert(term.clone()) {
                        return Err(SpectralError::InvalidTerm {
                            term: text.clone(),
                            reason: "term is already part of the label vector",
                        });
                    }
                    terms.push(term);
                }
            }
        }
        debug_assert!(terms.iter().all(|t| t.max_label().map_or(true, |l| l < n_labels)));
        Ok(terms)
    }
}

/// All exponent vectors of length `n` summing to `degree`, in descending
/// lexicographic order.
fn exponent_vectors(n: usize, degree: u32) -> Vec<Vec<u32>> {
    fn fill(pos: usize, remaining: u32, current: &mut Vec<u32>, out: &mut Vec<Vec<u32>>) {
        if pos + 1 == current.len() {
            current[pos] = remaining;
            out.push(current.clone());
            return;
        }
        for e in (0..=remaining).rev() {
            current[pos] = e;
            fill(pos + 1, remaining - e, current, out);
        }
    }
    let mut out = Vec::new();
    if n == 0 {
        return out;
    }
    let mut current = vec![0; n];
    fill(0, degree, &mut current, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Canonical construction and string parsing of terms.
    // - Term evaluation and analytic gradients.
    // - Expansion of each cross-term policy and its validation errors.
    // -------------------------------------------------------------------------

    fn names() -> Vec<String> {
        vec!["teff".to_string(), "logg".to_string(), "feh".to_string()]
    }

    #[test]
    fn monomial_canonicalizes_factors() {
        assert_eq!(Term::monomial(&[]), Term::Bias);
        assert_eq!(Term::monomial(&[(1, 1)]), Term::Linear { label: 1 });
        assert_eq!(Term::monomial(&[(0, 1), (0, 1)]), Term::Power { label: 0, exponent: 2 });
        assert_eq!(
            Term::monomial(&[(2, 1), (0, 0), (1, 2)]),
            Term::Cross { factors: vec![(1, 2), (2, 1)] }
        );
    }

    #[test]
    // Purpose
    // -------
    // Parsing accepts the documented syntax and maps names to indices.
    fn parse_reads_powers_and_products() {
        let names = names();

        assert_eq!(Term::parse("logg", &names), Ok(Term::Linear { label: 1 }));
        assert_eq!(Term::parse(" teff ^ 2 ", &names), Ok(Term::Power { label: 0, exponent: 2 }));
        assert_eq!(
            Term::parse("logg^2*teff", &names),
            Ok(Term::Cross { factors: vec![(0, 1), (1, 2)] })
        );
        assert_eq!(Term::parse("1", &names), Ok(Term::Bias));
    }

    #[test]
    fn parse_rejects_unknown_labels_and_bad_exponents() {
        let names = names();

        assert_eq!(
            Term::parse("alpha", &names),
            Err(SpectralError::UnknownLabel { name: "alpha".into() })
        );
        assert!(matches!(Term::parse("teff^0", &names), Err(SpectralError::InvalidTerm { .. })));
        assert!(matches!(Term::parse("teff^x", &names), Err(SpectralError::InvalidTerm { .. })));
        assert!(matches!(Term::parse("teff**logg", &names), Err(SpectralError::InvalidTerm { .. })));
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient of x0^2 * x1 must match the closed form.
    fn cross_term_value_and_gradient() {
        let term = Term::monomial(&[(0, 2), (1, 1)]);
        let x = array![3.0, -2.0, 5.0];

        assert_relative_eq!(term.evaluate(x.view()), -18.0);
        assert_eq!(term.gradient(x.view()), array![-12.0, 9.0, 0.0]);
        assert!(term.involves(1));
        assert!(!term.involves(2));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let names = names();
        let term = Term::monomial(&[(2, 1), (1, 2)]);

        let text = term.display_with(&names);

        assert_eq!(text, "logg^2*feh");
        assert_eq!(Term::parse(&text, &names), Ok(term));
    }

    #[test]
    // Purpose
    // -------
    // A full quadratic in three labels has 1 + 3 + 6 = 10 terms in the
    // documented order.
    fn expand_quadratic_all_orders_terms() {
        let spec = LabelVectorSpec::quadratic(&["a", "b", "c"]);

        let terms = spec.expand().expect("valid spec");

        let shown: Vec<String> =
            terms.iter().map(|t| t.display_with(&spec.label_names)).collect();
        assert_eq!(shown, vec!["1", "a", "b", "c", "a^2", "a*b", "a*c", "b^2", "b*c", "c^2"]);
    }

    #[test]
    fn expand_pure_powers_skip_cross_products() {
        let spec = LabelVectorSpec::new(&["a", "b"], 3, CrossTerms::None);

        let terms = spec.expand().expect("valid spec");

        assert_eq!(terms.len(), 1 + 2 + 2 + 2);
        assert!(terms.iter().all(|t| !matches!(t, Term::Cross { .. })));
    }

    #[test]
    fn expand_explicit_validates_each_term() {
        let ok = LabelVectorSpec::new(&["a", "b"], 2, CrossTerms::Explicit(vec!["a*b".into()]));
        let too_high =
            LabelVectorSpec::new(&["a", "b"], 2, CrossTerms::Explicit(vec!["a^2*b".into()]));
        let repeated =
            LabelVectorSpec::new(&["a", "b"], 2, CrossTerms::Explicit(vec!["a".into()]));

        assert_eq!(ok.expand().expect("valid").len(), 4);
        assert!(matches!(
            too_high.expand(),
            Err(SpectralError::TermDegreeExceeded { degree: 3, max_degree: 2, .. })
        ));
        assert!(matches!(repeated.expand(), Err(SpectralError::InvalidTerm { .. })));
    }

    #[test]
    fn expand_rejects_degree_zero_and_duplicate_labels() {
        assert!(matches!(
            LabelVectorSpec::new(&["a"], 0, CrossTerms::All).expand(),
            Err(SpectralError::InvalidSpecification { .. })
        ));
        assert!(matches!(
            LabelVectorSpec::new(&["a", "a"], 2, CrossTerms::All).expand(),
            Err(SpectralError::DuplicateLabel { .. })
        ));
    }
}
