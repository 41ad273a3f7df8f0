//! Model contracts for OrthoStat
//!
//! This module defines the trait seams between the cross-fitting engine
//! and the caller-supplied models: the engine depends only on these
//! contracts, never on concrete estimator implementations.

use crate::types::{CoefTensor, DesignMatrix, EffectTensor, TargetArray};
use crate::{Error, Result};

/// A native single-design-matrix regression model.
///
/// This is the contract the stage wrappers adapt: `fit` consumes one
/// assembled design matrix and a target, `predict` returns per-row
/// predictions with the target's shape.
pub trait Regressor {
    /// Fit the model on a design matrix and target.
    fn fit(&mut self, design: &DesignMatrix, target: &TargetArray) -> Result<()>;

    /// Predict one row per design row, matching the training target's shape.
    fn predict(&self, design: &DesignMatrix) -> Result<TargetArray>;

    /// Fitted coefficients as a `(targets × design width)` matrix, when the
    /// model exposes them. `None` for models without direct coefficient
    /// access (the capability check callers must make before reshaping).
    fn coefficients(&self) -> Option<DesignMatrix> {
        None
    }
}

/// The two-argument nuisance contract driven by the cross-fitting loop.
///
/// Implementations combine features and controls into whatever design their
/// underlying model expects; the loop itself never assembles designs.
pub trait NuisanceModel {
    /// Fit on features, controls and the nuisance target (outcome or treatment).
    fn fit(&mut self, x: &DesignMatrix, w: &DesignMatrix, target: &TargetArray) -> Result<()>;

    /// Predict the nuisance target for held-out rows.
    fn predict(&self, x: &DesignMatrix, w: &DesignMatrix) -> Result<TargetArray>;
}

/// Produces fresh, independent nuisance model instances.
///
/// One instance is built per fold, so no fitted parameters can leak between
/// folds. Any `Fn() -> M` closure is a factory, which is how arbitrary
/// caller-supplied models plug in.
pub trait NuisanceFactory {
    /// The model type this factory produces.
    type Model: NuisanceModel;

    /// Build a fresh, unfitted instance.
    fn build(&self) -> Self::Model;
}

impl<M: NuisanceModel, F: Fn() -> M> NuisanceFactory for F {
    type Model = M;

    fn build(&self) -> M {
        self()
    }
}

/// The final-stage contract: fit on features and pooled residuals, answer
/// effect queries from features alone.
pub trait EffectModel {
    /// Fit on the full feature matrix and the pooled treatment/outcome
    /// residuals. Implementations must record the residuals' trailing
    /// shapes; those decide the effect tensor's rank at prediction time.
    fn fit(&mut self, x: &DesignMatrix, t_res: &TargetArray, y_res: &TargetArray) -> Result<()>;

    /// The constant marginal effect tensor for the given query features.
    fn predict(&self, x: &DesignMatrix) -> Result<EffectTensor>;

    /// Coefficients reshaped to `(d_y, d_t, feature_width)`, when the
    /// underlying model exposes them.
    fn coefficients(&self) -> Result<CoefTensor> {
        Err(Error::Unsupported("final model does not expose coefficients".to_string()))
    }
}

/// Produces fresh, independent effect model instances (one per `fit` call,
/// so re-fitting an estimator never reuses stale final-model state).
pub trait EffectFactory {
    /// The model type this factory produces.
    type Model: EffectModel;

    /// Build a fresh, unfitted instance.
    fn build(&self) -> Self::Model;
}

impl<M: EffectModel, F: Fn() -> M> EffectFactory for F {
    type Model = M;

    fn build(&self) -> M {
        self()
    }
}

/// A feature transform applied before a design matrix enters a model.
///
/// `fit_transform` may lazily draw and cache internal parameters (keyed by
/// input width) and must be idempotent on equal input; `transform` is the
/// read-only variant used on prediction paths and fails on an input width
/// `fit_transform` has never seen.
pub trait Featurizer {
    /// Transform features, drawing/caching any parameters on first use.
    fn fit_transform(&mut self, x: &DesignMatrix) -> Result<DesignMatrix>;

    /// Transform features using only already-cached parameters.
    fn transform(&self, x: &DesignMatrix) -> Result<DesignMatrix>;
}
