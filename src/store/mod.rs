//! store — persistence of trained models.
//!
//! Purpose
//! -------
//! Write a [`Model`](crate::spectral::Model) to a self-describing Arrow IPC
//! stream and read it back, so a model trained once can be reused for
//! inference elsewhere.
//!
//! Key behaviors
//! -------------
//! - [`save`]/[`load`] work on byte buffers; [`save_to`]/[`load_from`] on
//!   any `Write`/`Read`.
//! - Decoding is bit-identical: wavelengths, coefficients, scatters, pivots,
//!   scales and label ranges come back with the same IEEE-754 bits.
//!
//! Invariants & assumptions
//! ------------------------
//! - Streams carry a format tag and version in the schema metadata; any
//!   other tag or version is rejected rather than guessed at.
//! - Decoded models pass through [`Model::new`](crate::spectral::Model::new)
//!   and so satisfy the same checks as freshly trained ones.
//!
//! Testing notes
//! -------------
//! - Round trips compare `f64::to_bits`, not approximate equality.

pub mod errors;
pub mod ipc;

pub use self::errors::{StoreError, StoreResult};
pub use self::ipc::{load, load_from, save, save_to, FORMAT_TAG, FORMAT_VERSION};
