//! First-stage (nuisance) model adapter.
//!
//! Adapts a native single-design-matrix [`Regressor`] to the two-argument
//! (features, controls) contract the cross-fitting loop drives, assembling
//! the design under one of two combination policies.

use serde::{Deserialize, Serialize};

use ot_core::traits::{Featurizer, NuisanceFactory, NuisanceModel, Regressor};
use ot_core::{DesignMatrix, Result, TargetArray};

use crate::design::{cross_product, hstack};

/// How features and controls combine into the nuisance design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinePolicy {
    /// `[featurize(X) | W]` — the dense default.
    Dense,
    /// `cross_product([X | W], [1 | featurize(X) | W])` — every feature and
    /// control interacted with every other and with a bias term. A
    /// high-dimensional but structured design suited to sparsity-seeking
    /// models; used on the outcome side of the sparse configuration.
    CrossProduct,
}

/// A fold's nuisance model: a fresh regressor plus the featurizer and
/// combination policy it assembles designs with.
#[derive(Debug, Clone)]
pub struct FirstStageWrapper<R, Z> {
    model: R,
    featurizer: Z,
    policy: CombinePolicy,
}

impl<R: Regressor, Z: Featurizer> FirstStageWrapper<R, Z> {
    fn combine_fit(&mut self, x: &DesignMatrix, w: &DesignMatrix) -> Result<DesignMatrix> {
        match self.policy {
            CombinePolicy::Dense => {
                let f = self.featurizer.fit_transform(x)?;
                hstack(&[&f, w])
            }
            CombinePolicy::CrossProduct => {
                let xw = hstack(&[x, w])?;
                let f = self.featurizer.fit_transform(x)?;
                let ones = DesignMatrix::ones(x.nrows());
                cross_product(&xw, &hstack(&[&ones, &f, w])?)
            }
        }
    }

    fn combine_predict(&self, x: &DesignMatrix, w: &DesignMatrix) -> Result<DesignMatrix> {
        match self.policy {
            CombinePolicy::Dense => {
                let f = self.featurizer.transform(x)?;
                hstack(&[&f, w])
            }
            CombinePolicy::CrossProduct => {
                let xw = hstack(&[x, w])?;
                let f = self.featurizer.transform(x)?;
                let ones = DesignMatrix::ones(x.nrows());
                cross_product(&xw, &hstack(&[&ones, &f, w])?)
            }
        }
    }
}

impl<R: Regressor, Z: Featurizer> NuisanceModel for FirstStageWrapper<R, Z> {
    fn fit(&mut self, x: &DesignMatrix, w: &DesignMatrix, target: &TargetArray) -> Result<()> {
        let design = self.combine_fit(x, w)?;
        self.model.fit(&design, target)
    }

    fn predict(&self, x: &DesignMatrix, w: &DesignMatrix) -> Result<TargetArray> {
        let design = self.combine_predict(x, w)?;
        self.model.predict(&design)
    }
}

/// Specification of a first-stage model: an unfitted regressor prototype,
/// a featurizer, and the combination policy.
///
/// Implements [`NuisanceFactory`] by cloning the prototypes into a fresh
/// wrapper, so every fold starts from an independent, freshly-initialized
/// model and no fitted parameters can leak between folds.
#[derive(Debug, Clone)]
pub struct FirstStageSpec<R, Z> {
    model: R,
    featurizer: Z,
    policy: CombinePolicy,
}

impl<R: Regressor + Clone, Z: Featurizer + Clone> FirstStageSpec<R, Z> {
    /// New specification around an unfitted regressor prototype.
    pub fn new(model: R, featurizer: Z, policy: CombinePolicy) -> Self {
        Self { model, featurizer, policy }
    }
}

impl<R: Regressor + Clone, Z: Featurizer + Clone> NuisanceFactory for FirstStageSpec<R, Z> {
    type Model = FirstStageWrapper<R, Z>;

    fn build(&self) -> Self::Model {
        FirstStageWrapper {
            model: self.model.clone(),
            featurizer: self.featurizer.clone(),
            policy: self.policy,
        }
    }
}
