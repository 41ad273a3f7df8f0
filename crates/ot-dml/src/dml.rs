//! Double ML estimator configurations.
//!
//! Each constructor wires a fixed combination of nuisance design policy,
//! featurizer and final model behind an [`RLearner`]:
//!
//! - [`double_ml`] — dense nuisance designs on both targets.
//! - [`sparse_linear_double_ml`] — cross-product (high-dimensional,
//!   structured) design on the outcome nuisance only, for linear-true
//!   relationships with many controls and sparsity-seeking models.
//! - [`kernel_double_ml`] — random Fourier featurization everywhere,
//!   approximating a Gaussian-kernel effect model.
//!
//! The `_default` variants supply the conventional defaults: a
//! no-intercept linear final model and a degree-1 polynomial featurizer
//! with bias.

use ot_core::traits::{Featurizer, Regressor};
use ot_core::Result;

use crate::featurize::{PolynomialFeatures, RandomFourierFeatures};
use crate::final_stage::FinalStageSpec;
use crate::first_stage::{CombinePolicy, FirstStageSpec};
use crate::kfold::KFold;
use crate::regression::{Lasso, LinearRegressor};
use crate::rlearner::RLearner;

/// Default random Fourier feature count for the kernel configuration.
const DEFAULT_RFF_DIM: usize = 20;

/// Default Gaussian bandwidth for the kernel configuration.
const DEFAULT_RFF_BANDWIDTH: f64 = 1.0;

/// A learner whose stages are all wired through one featurizer type.
pub type WiredLearner<MY, MT, MF, Z> =
    RLearner<FirstStageSpec<MY, Z>, FirstStageSpec<MT, Z>, FinalStageSpec<MF, Z>>;

/// The dense Double ML configuration: `[featurize(X) | W]` nuisance
/// designs for both targets, the given featurizer shared with the final
/// stage.
pub fn double_ml<MY, MT, MF, Z>(
    model_y: MY,
    model_t: MT,
    model_final: MF,
    featurizer: Z,
    folds: KFold,
) -> WiredLearner<MY, MT, MF, Z>
where
    MY: Regressor + Clone,
    MT: Regressor + Clone,
    MF: Regressor + Clone,
    Z: Featurizer + Clone,
{
    RLearner::new(
        FirstStageSpec::new(model_y, featurizer.clone(), CombinePolicy::Dense),
        FirstStageSpec::new(model_t, featurizer.clone(), CombinePolicy::Dense),
        FinalStageSpec::new(model_final, featurizer),
        folds,
    )
}

/// [`double_ml`] with the conventional defaults: no-intercept linear
/// final model, degree-1 polynomial featurizer with bias.
pub fn double_ml_default<MY, MT>(
    model_y: MY,
    model_t: MT,
    folds: KFold,
) -> WiredLearner<MY, MT, LinearRegressor, PolynomialFeatures>
where
    MY: Regressor + Clone,
    MT: Regressor + Clone,
{
    double_ml(
        model_y,
        model_t,
        LinearRegressor::new(false),
        PolynomialFeatures::default(),
        folds,
    )
}

/// The sparse-linear configuration: identical to [`double_ml`] except the
/// outcome nuisance design is the cross product of `[X | W]` with
/// `[1 | featurize(X) | W]`.
///
/// Intended for outcome and treatment relationships that are linear in
/// many controls with sparse coefficients; the supplied nuisance models
/// should be sparsity-seeking linear models for correctness.
pub fn sparse_linear_double_ml<MY, MT, MF, Z>(
    model_y: MY,
    model_t: MT,
    model_final: MF,
    featurizer: Z,
    folds: KFold,
) -> WiredLearner<MY, MT, MF, Z>
where
    MY: Regressor + Clone,
    MT: Regressor + Clone,
    MF: Regressor + Clone,
    Z: Featurizer + Clone,
{
    RLearner::new(
        FirstStageSpec::new(model_y, featurizer.clone(), CombinePolicy::CrossProduct),
        FirstStageSpec::new(model_t, featurizer.clone(), CombinePolicy::Dense),
        FinalStageSpec::new(model_final, featurizer),
        folds,
    )
}

/// [`sparse_linear_double_ml`] with lasso nuisance models at the given
/// penalty and the conventional final-model/featurizer defaults.
pub fn sparse_linear_double_ml_default(
    alpha: f64,
    folds: KFold,
) -> Result<WiredLearner<Lasso, Lasso, LinearRegressor, PolynomialFeatures>> {
    Ok(sparse_linear_double_ml(
        Lasso::new(alpha)?,
        Lasso::new(alpha)?,
        LinearRegressor::new(false),
        PolynomialFeatures::default(),
        folds,
    ))
}

/// The kernel configuration: dense nuisance designs with a random Fourier
/// featurizer of `dim` features and the given Gaussian bandwidth.
///
/// All stages are built with the same `(seed, dim, bandwidth)`, so every
/// stage applies the identical projection for a given input width.
pub fn kernel_double_ml<MY, MT, MF>(
    model_y: MY,
    model_t: MT,
    model_final: MF,
    dim: usize,
    bandwidth: f64,
    seed: u64,
    folds: KFold,
) -> Result<WiredLearner<MY, MT, MF, RandomFourierFeatures>>
where
    MY: Regressor + Clone,
    MT: Regressor + Clone,
    MF: Regressor + Clone,
{
    let featurizer = RandomFourierFeatures::new(dim, bandwidth, seed)?;
    Ok(double_ml(model_y, model_t, model_final, featurizer, folds))
}

/// [`kernel_double_ml`] with 20 random features, unit bandwidth and a
/// no-intercept linear final model.
pub fn kernel_double_ml_default<MY, MT>(
    model_y: MY,
    model_t: MT,
    seed: u64,
    folds: KFold,
) -> Result<WiredLearner<MY, MT, LinearRegressor, RandomFourierFeatures>>
where
    MY: Regressor + Clone,
    MT: Regressor + Clone,
{
    kernel_double_ml(
        model_y,
        model_t,
        LinearRegressor::new(false),
        DEFAULT_RFF_DIM,
        DEFAULT_RFF_BANDWIDTH,
        seed,
        folds,
    )
}
