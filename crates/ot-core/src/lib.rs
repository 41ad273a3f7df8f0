//! # ot-core
//!
//! Core types for OrthoStat: the shared error type, the model contracts
//! (trait seams) the estimation engine drives, and the dense array
//! vocabulary (design matrices, vector-or-matrix targets, effect tensors).
//!
//! ## Architecture
//!
//! Estimation logic (ot-dml) depends on the traits defined here, never on
//! concrete model implementations — callers plug arbitrary models into the
//! cross-fitting engine through these contracts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{CoefTensor, DesignMatrix, EffectTensor, TargetArray};
