//! # ot-dml
//!
//! Double (orthogonalized) machine learning for heterogeneous treatment
//! effects.
//!
//! The engine cross-fits caller-supplied nuisance models — outcome given
//! controls, treatment given controls — to produce out-of-fold residuals,
//! fits a restricted (typically linear) final model on those residuals,
//! and reconstructs a per-sample `(m, d_y, d_t)` effect tensor from
//! ordinary predict calls.
//!
//! ## Architecture
//!
//! This crate depends on the model contracts in ot-core, NOT on concrete
//! model implementations; the bundled regressors in [`regression`] are
//! defaults, not requirements.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Design-matrix assembly: stacking, cross products, identity expansion.
pub mod design;
/// Wired estimator configurations (dense, sparse-linear, kernel).
pub mod dml;
/// Built-in featurizers: polynomial and random Fourier.
pub mod featurize;
/// Final-stage adapter with effect-tensor reconstruction.
pub mod final_stage;
/// First-stage (nuisance) adapter and design combination policies.
pub mod first_stage;
/// K-fold sample splitting.
pub mod kfold;
/// Bundled regression models (OLS, lasso, mean baseline).
pub mod regression;
/// The cross-fitting orthogonal learner.
pub mod rlearner;

pub use dml::{
    double_ml, double_ml_default, kernel_double_ml, kernel_double_ml_default,
    sparse_linear_double_ml, sparse_linear_double_ml_default, WiredLearner,
};
pub use featurize::{PolynomialFeatures, RandomFourierFeatures};
pub use final_stage::{FinalStageSpec, FinalStageWrapper};
pub use first_stage::{CombinePolicy, FirstStageSpec, FirstStageWrapper};
pub use kfold::{Fold, KFold};
pub use regression::{Lasso, LinearRegressor, MeanRegressor};
pub use rlearner::RLearner;
