//! Per-pixel censoring of labels.
//!
//! A [`CensoringMask`] maps a pixel index to the labels whose contribution
//! that pixel's fit must ignore. Censoring a label removes every design
//! column that involves it (linear, power and cross terms); the bias and
//! all terms built only from other labels stay. Coefficients of removed
//! columns are stored as exactly `0`, so the trained pixel function does not
//! depend on the censored labels at all.
use crate::spectral::{
    core::vectorizer::LabelVectorizer,
    errors::{SpectralError, SpectralResult},
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CensoringMask {
    censored: BTreeMap<usize, BTreeSet<String>>,
}

impl CensoringMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Censor `labels` at `pixel` (adds to any labels already censored
    /// there).
    pub fn censor<S: AsRef<str>>(&mut self, pixel: usize, labels: &[S]) -> &mut Self {
        let entry = self.censored.entry(pixel).or_default();
        entry.extend(labels.iter().map(|l| l.as_ref().to_string()));
        self
    }

    /// Builder form of [`CensoringMask::censor`].
    pub fn with<S: AsRef<str>>(mut self, pixel: usize, labels: &[S]) -> Self {
        self.censor(pixel, labels);
        self
    }

    /// Labels censored at `pixel`.
    pub fn labels_for(&self, pixel: usize) -> Option<&BTreeSet<String>> {
        self.censored.get(&pixel)
    }

    pub fn is_empty(&self) -> bool {
        self.censored.values().all(BTreeSet::is_empty)
    }

    /// Check every entry against the grid size and the declared labels.
    ///
    /// Errors
    /// ------
    /// - `SpectralError::InvalidCensoring` for a pixel `>= n_pixels`.
    /// - `SpectralError::UnknownLabel` for a label the vectorizer does not
    ///   declare.
    pub fn validate(&self, vectorizer: &LabelVectorizer, n_pixels: usize) -> SpectralResult<()> {
        for (&pixel, labels) in &self.censored {
            if pixel >= n_pixels {
                return Err(SpectralError::InvalidCensoring { pixel, n_pixels });
            }
            for name in labels {
                if !vectorizer.label_names().contains(name) {
                    return Err(SpectralError::UnknownLabel { name: name.clone() });
                }
            }
        }
        Ok(())
    }

    /// Design columns that remain active at `pixel`, in column order.
    ///
    /// Labels unknown to the vectorizer are ignored here; call
    /// [`CensoringMask::validate`] first to reject them.
    pub fn active_columns(&self, pixel: usize, vectorizer: &LabelVectorizer) -> Vec<usize> {
        let censored: Vec<usize> = match self.labels_for(pixel) {
            Some(labels) => vectorizer
                .label_names()
                .iter()
                .enumerate()
                .filter(|(_, n)| labels.contains(*n))
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };
        (0..vectorizer.n_terms())
            .filter(|&k| !censored.iter().any(|&l| vectorizer.involves(k, l)))
            .collect()
    }
}
