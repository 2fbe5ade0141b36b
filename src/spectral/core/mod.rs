//! spectral::core — data containers, term specification and configuration.
//!
//! Purpose
//! -------
//! Hold everything the spectral model needs before any fitting happens:
//! validated inputs ([`data`]), the closed term type and label-vector
//! specification ([`terms`]), the frozen [`vectorizer`], per-pixel
//! [`censoring`], option structs ([`options`]) and shared checks
//! ([`validation`]).
//!
//! Conventions
//! -----------
//! - Pixel ordering is load-bearing and never changed: pixel `i` of every
//!   spectrum, training column and trained model is `wavelength[i]`.
//! - Label order is the order declared in the [`terms::LabelVectorSpec`].

pub mod censoring;
pub mod data;
pub mod options;
pub mod terms;
pub mod validation;
pub mod vectorizer;
