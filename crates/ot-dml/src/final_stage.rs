//! Final-stage (effect) model adapter.
//!
//! Fits the wrapped linear model on the cross product of featurized
//! features with the treatment residuals, and reconstructs the full
//! `(m, d_y, d_t)` effect tensor at prediction time from ordinary predict
//! calls — the wrapped model never needs to expose its coefficients for
//! effect queries, so composite final models remain usable. Coefficient
//! access itself is a separate, capability-checked operation.

use ot_core::traits::{EffectFactory, EffectModel, Featurizer, Regressor};
use ot_core::{CoefTensor, DesignMatrix, EffectTensor, Error, Result, TargetArray};

use crate::design::{cross_product, kron_identity_rows};

/// Shapes recorded at fit time; they, not the query input, decide the
/// rank of every later effect tensor.
#[derive(Debug, Clone)]
struct FitShapes {
    d_t: Option<usize>,
    d_y: Option<usize>,
    x_width: usize,
    feature_width: usize,
}

/// The final-stage model: a regressor, the featurizer it shares with its
/// configuration, and the shapes recorded at fit time.
#[derive(Debug, Clone)]
pub struct FinalStageWrapper<R, Z> {
    model: R,
    featurizer: Z,
    shapes: Option<FitShapes>,
}

impl<R: Regressor, Z: Featurizer> EffectModel for FinalStageWrapper<R, Z> {
    fn fit(&mut self, x: &DesignMatrix, t_res: &TargetArray, y_res: &TargetArray) -> Result<()> {
        let f = self.featurizer.fit_transform(x)?;
        let design = cross_product(&f, &t_res.to_design())?;
        self.model.fit(&design, y_res)?;
        self.shapes = Some(FitShapes {
            d_t: t_res.dim(),
            d_y: y_res.dim(),
            x_width: x.ncols(),
            feature_width: f.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: &DesignMatrix) -> Result<EffectTensor> {
        let shapes = self
            .shapes
            .as_ref()
            .ok_or_else(|| Error::NotFitted("final model has not been fit".to_string()))?;
        if x.ncols() != shapes.x_width {
            return Err(Error::Validation(format!(
                "query features have width {}, fit used width {}",
                x.ncols(),
                shapes.x_width
            )));
        }

        let m = x.nrows();
        let d_t_eff = shapes.d_t.unwrap_or(1);
        let d_y_eff = shapes.d_y.unwrap_or(1);

        // One synthetic row per (sample, treatment dimension): the identity
        // matrix of size d_t, flattened and Kronecker-expanded against the
        // featurized query, then predicted in a single batch.
        let f = self.featurizer.transform(x)?;
        let synthetic = kron_identity_rows(&f, d_t_eff)?;
        let pred = self.model.predict(&synthetic)?;
        if pred.nrows() != m * d_t_eff || pred.width() != d_y_eff {
            return Err(Error::Validation(format!(
                "final model returned shape {} × {}, expected {} × {}",
                pred.nrows(),
                pred.width(),
                m * d_t_eff,
                d_y_eff
            )));
        }

        // Raw batch order is (sample, treatment, outcome); transpose the
        // trailing axes so the public layout is (sample, outcome, treatment).
        let mut data = vec![0.0; m * d_y_eff * d_t_eff];
        for i in 0..m {
            for j in 0..d_t_eff {
                let row = pred.row(i * d_t_eff + j);
                for (yk, &v) in row.iter().enumerate() {
                    data[(i * d_y_eff + yk) * d_t_eff + j] = v;
                }
            }
        }
        EffectTensor::new(m, shapes.d_y, shapes.d_t, data)
    }

    fn coefficients(&self) -> Result<CoefTensor> {
        let shapes = self
            .shapes
            .as_ref()
            .ok_or_else(|| Error::NotFitted("final model has not been fit".to_string()))?;
        let coef = self.model.coefficients().ok_or_else(|| {
            Error::Unsupported("wrapped final model does not expose coefficients".to_string())
        })?;

        let d_t_eff = shapes.d_t.unwrap_or(1);
        let d_y_eff = shapes.d_y.unwrap_or(1);
        if coef.nrows() != d_y_eff || coef.ncols() != d_t_eff * shapes.feature_width {
            return Err(Error::Unsupported(format!(
                "coefficients of shape {} × {} are not broadcastable to ({}, {}, {})",
                coef.nrows(),
                coef.ncols(),
                d_y_eff,
                d_t_eff,
                shapes.feature_width
            )));
        }
        // The training design's block layout (treatment-major, feature-minor)
        // is already the row-major (d_y, d_t, feature) order.
        CoefTensor::new(shapes.d_y, shapes.d_t, shapes.feature_width, coef.as_slice().to_vec())
    }
}

/// Specification of the final-stage model: unfitted regressor prototype
/// plus featurizer. Implements [`EffectFactory`] so each `fit` of the
/// learner starts from a fresh final model.
#[derive(Debug, Clone)]
pub struct FinalStageSpec<R, Z> {
    model: R,
    featurizer: Z,
}

impl<R: Regressor + Clone, Z: Featurizer + Clone> FinalStageSpec<R, Z> {
    /// New specification around an unfitted regressor prototype.
    pub fn new(model: R, featurizer: Z) -> Self {
        Self { model, featurizer }
    }
}

impl<R: Regressor + Clone, Z: Featurizer + Clone> EffectFactory for FinalStageSpec<R, Z> {
    type Model = FinalStageWrapper<R, Z>;

    fn build(&self) -> Self::Model {
        FinalStageWrapper {
            model: self.model.clone(),
            featurizer: self.featurizer.clone(),
            shapes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::featurize::PolynomialFeatures;
    use crate::regression::LinearRegressor;

    fn mat(rows: Vec<Vec<f64>>) -> DesignMatrix {
        DesignMatrix::from_rows(rows).unwrap()
    }

    fn spec() -> FinalStageSpec<LinearRegressor, PolynomialFeatures> {
        FinalStageSpec::new(LinearRegressor::new(false), PolynomialFeatures::default())
    }

    /// Deterministic residual fixture: Y_res = Θ · T_res exactly, so the
    /// final linear model must reproduce Θ.
    fn fit_exact(
        theta: &[Vec<f64>], // d_y × d_t
        t_rows: Vec<Vec<f64>>,
        x_rows: Vec<Vec<f64>>,
        y_dim: Option<usize>,
        t_dim: Option<usize>,
    ) -> FinalStageWrapper<LinearRegressor, PolynomialFeatures> {
        let n = t_rows.len();
        let d_y = theta.len();
        let mut y_rows = Vec::with_capacity(n);
        for t in &t_rows {
            let mut y = vec![0.0; d_y];
            for (yk, row) in theta.iter().enumerate() {
                y[yk] = dot_slice(row, t);
            }
            y_rows.push(y);
        }

        let x = mat(x_rows);
        let t_res = match t_dim {
            Some(_) => TargetArray::matrix(t_rows).unwrap(),
            None => TargetArray::vector(t_rows.into_iter().map(|r| r[0]).collect()).unwrap(),
        };
        let y_res = match y_dim {
            Some(_) => TargetArray::matrix(y_rows).unwrap(),
            None => TargetArray::vector(y_rows.into_iter().map(|r| r[0]).collect()).unwrap(),
        };

        let mut model = spec().build();
        model.fit(&x, &t_res, &y_res).unwrap();
        model
    }

    fn dot_slice(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(&x, &y)| x * y).sum()
    }

    #[test]
    fn test_matrix_matrix_effect_shape_and_values() {
        let theta = vec![vec![1.0, 2.0, 3.0], vec![-1.0, 0.5, 0.0]]; // 2×3
        let t_rows = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
            vec![0.5, -0.5, 2.0],
            vec![-1.0, 2.0, 1.0],
        ];
        let x_rows = vec![vec![0.0]; 6];
        let model = fit_exact(&theta, t_rows, x_rows, Some(2), Some(3));

        let q = mat(vec![vec![0.0], vec![0.0]]);
        let eff = model.predict(&q).unwrap();
        assert_eq!(eff.nrows(), 2);
        assert_eq!(eff.d_y(), Some(2));
        assert_eq!(eff.d_t(), Some(3));
        for i in 0..2 {
            for y in 0..2 {
                for t in 0..3 {
                    assert!(
                        (eff.value(i, y, t) - theta[y][t]).abs() < 1e-6,
                        "effect[{i},{y},{t}] = {} vs {}",
                        eff.value(i, y, t),
                        theta[y][t]
                    );
                }
            }
        }
    }

    #[test]
    fn test_vector_vector_effect_collapses() {
        let theta = vec![vec![4.0]];
        let t_rows = vec![vec![1.0], vec![-1.0], vec![0.5], vec![2.0]];
        let x_rows = vec![vec![0.0]; 4];
        let model = fit_exact(&theta, t_rows, x_rows, None, None);

        let q = mat(vec![vec![0.0], vec![0.0], vec![0.0]]);
        let eff = model.predict(&q).unwrap();
        assert_eq!(eff.nrows(), 3);
        assert_eq!(eff.d_y(), None);
        assert_eq!(eff.d_t(), None);
        assert_eq!(eff.as_slice().len(), 3);
        for i in 0..3 {
            assert!((eff.value(i, 0, 0) - 4.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_vector_y_matrix_t_collapses_outcome_axis() {
        let theta = vec![vec![1.0, -2.0]];
        let t_rows =
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, -1.0]];
        let x_rows = vec![vec![0.0]; 4];
        let model = fit_exact(&theta, t_rows, x_rows, None, Some(2));

        let eff = model.predict(&mat(vec![vec![0.0]])).unwrap();
        assert_eq!(eff.d_y(), None);
        assert_eq!(eff.d_t(), Some(2));
        assert!((eff.value(0, 0, 0) - 1.0).abs() < 1e-6);
        assert!((eff.value(0, 0, 1) + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_heterogeneous_effect_depends_on_features() {
        // effect(x) = 1 + 2x on a scalar treatment
        let n = 8;
        let xs: Vec<f64> = (0..n).map(|i| i as f64 / 4.0).collect();
        let ts: Vec<f64> = (0..n).map(|i| ((i * 7 + 3) % 5) as f64 - 2.0).collect();
        let ys: Vec<f64> = xs.iter().zip(&ts).map(|(&x, &t)| (1.0 + 2.0 * x) * t).collect();

        let x = mat(xs.iter().map(|&v| vec![v]).collect());
        let t_res = TargetArray::vector(ts).unwrap();
        let y_res = TargetArray::vector(ys).unwrap();
        let mut model = spec().build();
        model.fit(&x, &t_res, &y_res).unwrap();

        let q = mat(vec![vec![0.0], vec![1.0], vec![3.0]]);
        let eff = model.predict(&q).unwrap();
        for (i, expect) in [1.0, 3.0, 7.0].iter().enumerate() {
            assert!((eff.value(i, 0, 0) - expect).abs() < 1e-6);
        }
    }

    #[test]
    fn test_predict_is_idempotent() {
        let theta = vec![vec![2.5]];
        let t_rows = vec![vec![1.0], vec![2.0], vec![-1.0]];
        let model = fit_exact(&theta, t_rows, vec![vec![0.0]; 3], None, None);
        let q = mat(vec![vec![0.0], vec![0.0]]);
        let a = model.predict(&q).unwrap();
        let b = model.predict(&q).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_coefficients_reshape() {
        let theta = vec![vec![1.0, 2.0], vec![3.0, 4.0]]; // 2×2
        let t_rows = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![-1.0, 0.5],
            vec![2.0, 2.0],
        ];
        let model = fit_exact(&theta, t_rows, vec![vec![0.0]; 5], Some(2), Some(2));
        let coef = model.coefficients().unwrap();
        assert_eq!(coef.d_y(), Some(2));
        assert_eq!(coef.d_t(), Some(2));
        assert_eq!(coef.feature_width(), 2); // [1, x]
        for y in 0..2 {
            for t in 0..2 {
                // bias coefficient carries the constant effect; x slope ≈ 0
                assert!((coef.value(y, t, 0) - theta[y][t]).abs() < 1e-6);
                assert!(coef.value(y, t, 1).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_coefficients_unsupported_without_access() {
        #[derive(Debug, Clone)]
        struct Opaque(LinearRegressor);

        impl Regressor for Opaque {
            fn fit(&mut self, design: &DesignMatrix, target: &TargetArray) -> Result<()> {
                self.0.fit(design, target)
            }

            fn predict(&self, design: &DesignMatrix) -> Result<TargetArray> {
                self.0.predict(design)
            }
        }

        let x = mat(vec![vec![0.0], vec![1.0], vec![2.0]]);
        let t_res = TargetArray::vector(vec![1.0, -1.0, 0.5]).unwrap();
        let y_res = TargetArray::vector(vec![2.0, -2.0, 1.0]).unwrap();
        let mut model =
            FinalStageSpec::new(Opaque(LinearRegressor::new(false)), PolynomialFeatures::default())
                .build();
        model.fit(&x, &t_res, &y_res).unwrap();

        assert!(model.predict(&x).is_ok(), "effect queries must not need coefficients");
        assert!(matches!(model.coefficients(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = spec().build();
        assert!(matches!(model.predict(&DesignMatrix::ones(1)), Err(Error::NotFitted(_))));
    }

    #[test]
    fn test_predict_rejects_width_mismatch() {
        let theta = vec![vec![1.0]];
        let model = fit_exact(&theta, vec![vec![1.0], vec![2.0]], vec![vec![0.0]; 2], None, None);
        let wide = mat(vec![vec![0.0, 1.0]]);
        assert!(matches!(model.predict(&wide), Err(Error::Validation(_))));
    }
}
