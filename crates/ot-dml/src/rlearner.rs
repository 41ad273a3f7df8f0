//! The cross-fitting orthogonal learner.
//!
//! Splits the sample into folds, drives out-of-fold nuisance fitting to
//! produce residualized outcome and treatment signals, fits the final
//! effect model on the pooled residuals, and answers effect queries from
//! the persisted trained state.
//!
//! # References
//!
//! - Chernozhukov et al. (2018), "Double/debiased machine learning for
//!   treatment and structural parameters." *The Econometrics Journal*.

use std::fmt;

use ot_core::traits::{EffectFactory, EffectModel, NuisanceFactory, NuisanceModel};
use ot_core::{CoefTensor, DesignMatrix, EffectTensor, Error, Result, TargetArray};

use crate::kfold::KFold;

/// Trained state persisted by a successful `fit`.
#[derive(Debug)]
struct FittedState<MY, MT, MF> {
    models_y: Vec<MY>,
    models_t: Vec<MT>,
    model_final: MF,
    x_width: usize,
}

/// Orthogonal learner: cross-fitted nuisance residualization with a final
/// effect model on the pooled residuals.
///
/// The three factories supply fresh model instances — one outcome and one
/// treatment nuisance per fold, one final model per `fit`. Any
/// `Fn() -> M` closure over a model type is a factory, so arbitrary
/// caller-supplied models plug in without wrapper types.
pub struct RLearner<NY, NT, EF>
where
    NY: NuisanceFactory,
    NT: NuisanceFactory,
    EF: EffectFactory,
{
    nuisance_y: NY,
    nuisance_t: NT,
    effect: EF,
    folds: KFold,
    state: Option<FittedState<NY::Model, NT::Model, EF::Model>>,
}

impl<NY, NT, EF> RLearner<NY, NT, EF>
where
    NY: NuisanceFactory,
    NT: NuisanceFactory,
    EF: EffectFactory,
{
    /// New, unfitted learner.
    pub fn new(nuisance_y: NY, nuisance_t: NT, effect: EF, folds: KFold) -> Self {
        Self { nuisance_y, nuisance_t, effect, folds, state: None }
    }

    /// The fold-splitting configuration.
    pub fn folds(&self) -> &KFold {
        &self.folds
    }

    /// Cross-fit the nuisance models and fit the final effect model.
    ///
    /// `x` defaults to a single constant column (one global stratum) and
    /// `w` to an empty column set. Row counts of `y`, `t`, `x`, `w` must
    /// agree. Any failure — validation or a delegate model error — leaves
    /// the learner unfitted; there is no partial fit.
    pub fn fit(
        &mut self,
        y: &TargetArray,
        t: &TargetArray,
        x: Option<&DesignMatrix>,
        w: Option<&DesignMatrix>,
    ) -> Result<()> {
        self.state = None;
        let n = y.nrows();

        let x_default;
        let x = match x {
            Some(x) => x,
            None => {
                x_default = DesignMatrix::ones(n);
                &x_default
            }
        };
        let w_default;
        let w = match w {
            Some(w) => w,
            None => {
                w_default = DesignMatrix::empty(n);
                &w_default
            }
        };
        if t.nrows() != n || x.nrows() != n || w.nrows() != n {
            return Err(Error::Validation(format!(
                "row counts disagree: Y has {}, T has {}, X has {}, W has {}",
                n,
                t.nrows(),
                x.nrows(),
                w.nrows()
            )));
        }

        let folds = self.folds.split(n)?;

        // Out-of-fold residualization: each fold's freshly-built models are
        // fit on the training rows and predict only the held-out rows, so
        // every sample gets exactly one residual pair from models that
        // never saw its fold.
        let mut y_res = y.zeros_like();
        let mut t_res = t.zeros_like();
        let mut models_y = Vec::with_capacity(folds.len());
        let mut models_t = Vec::with_capacity(folds.len());
        for (f, fold) in folds.iter().enumerate() {
            let x_train = x.select_rows(&fold.train);
            let w_train = w.select_rows(&fold.train);
            let x_test = x.select_rows(&fold.test);
            let w_test = w.select_rows(&fold.test);

            let mut model_t = self.nuisance_t.build();
            model_t
                .fit(&x_train, &w_train, &t.select_rows(&fold.train))
                .map_err(|e| e.in_fold(f, "treatment"))?;
            let t_hat =
                model_t.predict(&x_test, &w_test).map_err(|e| e.in_fold(f, "treatment"))?;
            let t_fold_res = t
                .select_rows(&fold.test)
                .residual(&t_hat)
                .map_err(|e| e.in_fold(f, "treatment"))?;
            t_res.set_rows(&fold.test, &t_fold_res);

            let mut model_y = self.nuisance_y.build();
            model_y
                .fit(&x_train, &w_train, &y.select_rows(&fold.train))
                .map_err(|e| e.in_fold(f, "outcome"))?;
            let y_hat = model_y.predict(&x_test, &w_test).map_err(|e| e.in_fold(f, "outcome"))?;
            let y_fold_res = y
                .select_rows(&fold.test)
                .residual(&y_hat)
                .map_err(|e| e.in_fold(f, "outcome"))?;
            y_res.set_rows(&fold.test, &y_fold_res);

            models_t.push(model_t);
            models_y.push(model_y);
        }

        // Join barrier: the final model sees the full feature matrix with
        // the pooled residuals only after every fold has written its rows.
        let mut model_final = self.effect.build();
        model_final.fit(x, &t_res, &y_res)?;

        self.state =
            Some(FittedState { models_y, models_t, model_final, x_width: x.ncols() });
        Ok(())
    }

    /// The constant marginal effect tensor θ(·) for the query features.
    ///
    /// With `x` omitted, a single constant row is used (matching the fit-time
    /// default when `x` was omitted there). Read-only; may be called
    /// repeatedly and concurrently.
    pub fn const_marginal_effect(&self, x: Option<&DesignMatrix>) -> Result<EffectTensor> {
        let state = self.not_fitted_guard("const_marginal_effect")?;
        let x_default;
        let x = match x {
            Some(x) => x,
            None => {
                x_default = DesignMatrix::ones(1);
                &x_default
            }
        };
        if x.ncols() != state.x_width {
            return Err(Error::Validation(format!(
                "query features have width {}, fit used width {}",
                x.ncols(),
                state.x_width
            )));
        }
        state.model_final.predict(x)
    }

    /// Final-model coefficients reshaped to `(d_y, d_t, feature_width)`,
    /// when the wrapped final model exposes them.
    pub fn coef(&self) -> Result<CoefTensor> {
        self.not_fitted_guard("coef")?.model_final.coefficients()
    }

    /// The per-fold outcome nuisance models (inspection only).
    pub fn outcome_models(&self) -> Result<&[NY::Model]> {
        Ok(&self.not_fitted_guard("outcome_models")?.models_y)
    }

    /// The per-fold treatment nuisance models (inspection only).
    pub fn treatment_models(&self) -> Result<&[NT::Model]> {
        Ok(&self.not_fitted_guard("treatment_models")?.models_t)
    }

    fn not_fitted_guard(&self, op: &str) -> Result<&FittedState<NY::Model, NT::Model, EF::Model>> {
        self.state
            .as_ref()
            .ok_or_else(|| Error::NotFitted(format!("call fit before {op}")))
    }
}

impl<NY, NT, EF> fmt::Debug for RLearner<NY, NT, EF>
where
    NY: NuisanceFactory,
    NT: NuisanceFactory,
    EF: EffectFactory,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RLearner")
            .field("folds", &self.folds)
            .field("fitted", &self.state.is_some())
            .finish()
    }
}
