//! Bundled regression models.
//!
//! These are the native defaults the estimator configurations wire in:
//! multi-target ordinary least squares for the final stage, a
//! coordinate-descent lasso for sparsity-seeking nuisance fitting, and a
//! mean baseline. All of them implement [`Regressor`], so they are
//! interchangeable with any caller-supplied model.

use nalgebra::DMatrix;

use ot_core::traits::Regressor;
use ot_core::{DesignMatrix, Error, Result, TargetArray};

/// Default iteration cap for lasso coordinate descent.
const DEFAULT_MAX_ITER: usize = 1000;

/// Default convergence tolerance for lasso coordinate descent
/// (L∞ of the per-sweep coefficient change).
const DEFAULT_TOL: f64 = 1e-6;

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| x * y).sum()
}

/// Fitted linear coefficients shared by the closed-form and
/// coordinate-descent models.
#[derive(Debug, Clone)]
struct LinearFit {
    /// Row-major `k × d`; when the intercept is enabled, column 0 is the
    /// intercept and the remaining `p` columns are slopes.
    coef: Vec<f64>,
    /// Raw design width the model was fit on.
    p: usize,
    /// Coefficient row width (`p`, plus one for the intercept).
    d: usize,
    /// Number of target columns.
    k: usize,
    include_intercept: bool,
    target_dim: Option<usize>,
}

impl LinearFit {
    fn predict(&self, design: &DesignMatrix) -> Result<TargetArray> {
        if design.ncols() != self.p {
            return Err(Error::Validation(format!(
                "design has {} columns, model was fit on {}",
                design.ncols(),
                self.p
            )));
        }
        let n = design.nrows();
        let mut data = Vec::with_capacity(n * self.k);
        for i in 0..n {
            let row = design.row(i);
            for t in 0..self.k {
                let c = &self.coef[t * self.d..(t + 1) * self.d];
                let eta = if self.include_intercept {
                    c[0] + dot(row, &c[1..])
                } else {
                    dot(row, c)
                };
                data.push(eta);
            }
        }
        TargetArray::from_row_major(n, self.target_dim, data)
    }

    fn coef_matrix(&self) -> Option<DesignMatrix> {
        DesignMatrix::from_row_major(self.k, self.d, self.coef.clone()).ok()
    }
}

fn check_fit_shapes(design: &DesignMatrix, target: &TargetArray) -> Result<()> {
    if design.nrows() == 0 {
        return Err(Error::Validation("design must have at least one row".to_string()));
    }
    if design.nrows() != target.nrows() {
        return Err(Error::Validation(format!(
            "design has {} rows, target has {}",
            design.nrows(),
            target.nrows()
        )));
    }
    Ok(())
}

/// Ordinary least squares, optionally with an intercept, supporting
/// vector and matrix targets.
///
/// Solves the normal equations `(XᵀX) B = XᵀY` through an SVD
/// pseudo-inverse, so rank-deficient designs (duplicated columns, a
/// constant feature meeting a bias column) yield the minimum-norm
/// solution instead of an error.
#[derive(Debug, Clone, Default)]
pub struct LinearRegressor {
    include_intercept: bool,
    fit_state: Option<LinearFit>,
}

impl LinearRegressor {
    /// New OLS model. The final stage conventionally runs without an
    /// intercept, the bias living in the featurized design instead.
    pub fn new(include_intercept: bool) -> Self {
        Self { include_intercept, fit_state: None }
    }
}

impl Regressor for LinearRegressor {
    fn fit(&mut self, design: &DesignMatrix, target: &TargetArray) -> Result<()> {
        check_fit_shapes(design, target)?;
        let n = design.nrows();
        let p = design.ncols();
        let d = p + usize::from(self.include_intercept);
        if d == 0 {
            return Err(Error::Validation(
                "design must have at least one column (or enable the intercept)".to_string(),
            ));
        }
        let k = target.width();

        // Accumulate XtX (d×d) and XtY (d×k).
        let mut xtx = vec![0.0; d * d];
        let mut xty = vec![0.0; d * k];
        for i in 0..n {
            let row = design.row(i);
            let y = target.row(i);
            if self.include_intercept {
                xtx[0] += 1.0;
                for a in 0..p {
                    let xa = row[a];
                    xtx[1 + a] += xa;
                    xtx[(1 + a) * d] += xa;
                    for b in 0..p {
                        xtx[(1 + a) * d + (1 + b)] += xa * row[b];
                    }
                }
                for t in 0..k {
                    xty[t] += y[t];
                    for a in 0..p {
                        xty[(1 + a) * k + t] += row[a] * y[t];
                    }
                }
            } else {
                for a in 0..p {
                    let xa = row[a];
                    for b in 0..p {
                        xtx[a * d + b] += xa * row[b];
                    }
                    for t in 0..k {
                        xty[a * k + t] += xa * y[t];
                    }
                }
            }
        }

        let a = DMatrix::from_row_slice(d, d, &xtx);
        let b = DMatrix::from_row_slice(d, k, &xty);
        let svd = a.svd(true, true);
        let sol = svd
            .solve(&b, 1e-10)
            .map_err(|e| Error::Computation(format!("least-squares solve failed: {e}")))?;

        let mut coef = vec![0.0; k * d];
        for t in 0..k {
            for j in 0..d {
                coef[t * d + j] = sol[(j, t)];
            }
        }
        self.fit_state = Some(LinearFit {
            coef,
            p,
            d,
            k,
            include_intercept: self.include_intercept,
            target_dim: target.dim(),
        });
        Ok(())
    }

    fn predict(&self, design: &DesignMatrix) -> Result<TargetArray> {
        let fit = self
            .fit_state
            .as_ref()
            .ok_or_else(|| Error::NotFitted("linear regressor has not been fit".to_string()))?;
        fit.predict(design)
    }

    fn coefficients(&self) -> Option<DesignMatrix> {
        self.fit_state.as_ref().and_then(LinearFit::coef_matrix)
    }
}

/// L1-penalized linear regression via cyclic coordinate descent.
///
/// Minimizes `(1/2n)·‖Y − XB‖² + alpha·‖B‖₁` per target column with
/// soft-threshold updates, sweeping until the largest coefficient change
/// falls below `tol` or `max_iter` sweeps elapse. The sparsity-seeking
/// default for high-dimensional nuisance designs.
#[derive(Debug, Clone)]
pub struct Lasso {
    alpha: f64,
    include_intercept: bool,
    max_iter: usize,
    tol: f64,
    fit_state: Option<LinearFit>,
}

impl Lasso {
    /// New lasso with the given penalty strength (`alpha ≥ 0`) and an
    /// intercept fit by target centering.
    pub fn new(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(Error::Validation(format!("alpha must be non-negative, got {alpha}")));
        }
        Ok(Self {
            alpha,
            include_intercept: true,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            fit_state: None,
        })
    }

    /// Disable the intercept.
    pub fn without_intercept(mut self) -> Self {
        self.include_intercept = false;
        self
    }

    /// Set the sweep cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

#[inline]
fn soft_threshold(rho: f64, lambda: f64) -> f64 {
    if rho > lambda {
        rho - lambda
    } else if rho < -lambda {
        rho + lambda
    } else {
        0.0
    }
}

impl Regressor for Lasso {
    fn fit(&mut self, design: &DesignMatrix, target: &TargetArray) -> Result<()> {
        check_fit_shapes(design, target)?;
        let n = design.nrows();
        let p = design.ncols();
        let k = target.width();
        let nf = n as f64;

        // Optionally center columns and targets; the intercept is recovered
        // from the means afterwards.
        let mut x_mean = vec![0.0; p];
        let mut y_mean = vec![0.0; k];
        if self.include_intercept {
            for i in 0..n {
                for (j, &v) in design.row(i).iter().enumerate() {
                    x_mean[j] += v;
                }
                for (t, &v) in target.row(i).iter().enumerate() {
                    y_mean[t] += v;
                }
            }
            for v in &mut x_mean {
                *v /= nf;
            }
            for v in &mut y_mean {
                *v /= nf;
            }
        }
        let mut xc = vec![0.0; n * p];
        for i in 0..n {
            for (j, &v) in design.row(i).iter().enumerate() {
                xc[i * p + j] = v - x_mean[j];
            }
        }
        let col_sq: Vec<f64> =
            (0..p).map(|j| (0..n).map(|i| xc[i * p + j] * xc[i * p + j]).sum()).collect();

        let d = p + usize::from(self.include_intercept);
        let mut coef = vec![0.0; k * d];
        let lambda = self.alpha * nf;

        for t in 0..k {
            let mut beta = vec![0.0; p];
            let mut resid: Vec<f64> =
                (0..n).map(|i| target.row(i)[t] - y_mean[t]).collect();

            let mut converged = false;
            let mut max_delta = 0.0;
            for _ in 0..self.max_iter {
                max_delta = 0.0_f64;
                for j in 0..p {
                    if col_sq[j] == 0.0 {
                        continue;
                    }
                    let rho: f64 =
                        (0..n).map(|i| xc[i * p + j] * resid[i]).sum::<f64>() + col_sq[j] * beta[j];
                    let new = soft_threshold(rho, lambda) / col_sq[j];
                    let delta = new - beta[j];
                    if delta != 0.0 {
                        for i in 0..n {
                            resid[i] -= xc[i * p + j] * delta;
                        }
                        beta[j] = new;
                    }
                    max_delta = max_delta.max(delta.abs());
                }
                if max_delta < self.tol {
                    converged = true;
                    break;
                }
            }
            if !converged {
                log::warn!(
                    "lasso did not converge in {} sweeps (last max coefficient change {:.2e})",
                    self.max_iter,
                    max_delta
                );
            }

            if self.include_intercept {
                coef[t * d] = y_mean[t] - dot(&beta, &x_mean);
                coef[t * d + 1..(t + 1) * d].copy_from_slice(&beta);
            } else {
                coef[t * d..(t + 1) * d].copy_from_slice(&beta);
            }
        }

        self.fit_state = Some(LinearFit {
            coef,
            p,
            d,
            k,
            include_intercept: self.include_intercept,
            target_dim: target.dim(),
        });
        Ok(())
    }

    fn predict(&self, design: &DesignMatrix) -> Result<TargetArray> {
        let fit = self
            .fit_state
            .as_ref()
            .ok_or_else(|| Error::NotFitted("lasso has not been fit".to_string()))?;
        fit.predict(design)
    }

    fn coefficients(&self) -> Option<DesignMatrix> {
        self.fit_state.as_ref().and_then(LinearFit::coef_matrix)
    }
}

/// Predicts the per-column training mean regardless of the design: the
/// trivial nuisance baseline for targets independent of features and
/// controls.
#[derive(Debug, Clone, Default)]
pub struct MeanRegressor {
    fit_state: Option<(Vec<f64>, Option<usize>)>,
}

impl Regressor for MeanRegressor {
    fn fit(&mut self, design: &DesignMatrix, target: &TargetArray) -> Result<()> {
        check_fit_shapes(design, target)?;
        let n = target.nrows();
        let k = target.width();
        let mut means = vec![0.0; k];
        for i in 0..n {
            for (t, &v) in target.row(i).iter().enumerate() {
                means[t] += v;
            }
        }
        for m in &mut means {
            *m /= n as f64;
        }
        self.fit_state = Some((means, target.dim()));
        Ok(())
    }

    fn predict(&self, design: &DesignMatrix) -> Result<TargetArray> {
        let (means, dim) = self
            .fit_state
            .as_ref()
            .ok_or_else(|| Error::NotFitted("mean regressor has not been fit".to_string()))?;
        let n = design.nrows();
        let mut data = Vec::with_capacity(n * means.len());
        for _ in 0..n {
            data.extend_from_slice(means);
        }
        TargetArray::from_row_major(n, *dim, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat(rows: Vec<Vec<f64>>) -> DesignMatrix {
        DesignMatrix::from_rows(rows).unwrap()
    }

    fn assert_vec_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (i, (&ai, &bi)) in a.iter().zip(b.iter()).enumerate() {
            assert!(
                (ai - bi).abs() <= tol,
                "index {i}: {ai} vs {bi} (tol={tol})"
            );
        }
    }

    #[test]
    fn test_ols_exact_on_noiseless_data() {
        // y = 2·x0 − 3·x1
        let x = mat(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
        ]);
        let y = TargetArray::vector(vec![2.0, -3.0, -1.0, 1.0]).unwrap();
        let mut model = LinearRegressor::new(false);
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients().unwrap();
        assert_vec_close(coef.row(0), &[2.0, -3.0], 1e-8);

        let pred = model.predict(&x).unwrap();
        assert_vec_close(pred.as_slice(), y.as_slice(), 1e-8);
    }

    #[test]
    fn test_ols_intercept() {
        // y = 5 + 2·x
        let x = mat(vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]]);
        let y = TargetArray::vector(vec![5.0, 7.0, 9.0, 11.0]).unwrap();
        let mut model = LinearRegressor::new(true);
        model.fit(&x, &y).unwrap();
        let coef = model.coefficients().unwrap();
        assert_vec_close(coef.row(0), &[5.0, 2.0], 1e-8);
    }

    #[test]
    fn test_ols_matrix_target() {
        let x = mat(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 2.0]]);
        // column 0: x0 + x1; column 1: 2·x0
        let y = TargetArray::matrix(vec![
            vec![1.0, 2.0],
            vec![1.0, 0.0],
            vec![3.0, 2.0],
        ])
        .unwrap();
        let mut model = LinearRegressor::new(false);
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients().unwrap();
        assert_vec_close(coef.row(0), &[1.0, 1.0], 1e-8);
        assert_vec_close(coef.row(1), &[2.0, 0.0], 1e-8);

        let pred = model.predict(&x).unwrap();
        assert_eq!(pred.dim(), Some(2));
        assert_vec_close(pred.as_slice(), y.as_slice(), 1e-8);
    }

    #[test]
    fn test_ols_handles_duplicated_columns() {
        // Two identical columns: minimum-norm solution splits the weight,
        // predictions stay exact.
        let x = mat(vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]);
        let y = TargetArray::vector(vec![2.0, 4.0, 6.0]).unwrap();
        let mut model = LinearRegressor::new(false);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        assert_vec_close(pred.as_slice(), y.as_slice(), 1e-8);
    }

    #[test]
    fn test_ols_predict_before_fit_fails() {
        let model = LinearRegressor::new(false);
        assert!(matches!(model.predict(&DesignMatrix::ones(2)), Err(Error::NotFitted(_))));
    }

    #[test]
    fn test_ols_predict_rejects_width_mismatch() {
        let x = mat(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let y = TargetArray::vector(vec![1.0, 2.0]).unwrap();
        let mut model = LinearRegressor::new(false);
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&DesignMatrix::ones(2)).is_err());
    }

    #[test]
    fn test_lasso_zeroes_irrelevant_columns() {
        // y depends on x0 only; a strong penalty must zero the noise column.
        let x = mat(vec![
            vec![1.0, 0.3],
            vec![2.0, -0.2],
            vec![3.0, 0.1],
            vec![4.0, -0.4],
            vec![5.0, 0.2],
            vec![6.0, -0.1],
        ]);
        let y = TargetArray::vector(vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]).unwrap();
        let mut model = Lasso::new(0.05).unwrap();
        model.fit(&x, &y).unwrap();
        let coef = model.coefficients().unwrap();
        // [intercept, beta0, beta1]
        assert!((coef.row(0)[1] - 2.0).abs() < 0.1, "slope shrunk too far: {:?}", coef.row(0));
        assert!(coef.row(0)[2].abs() < 0.05, "noise column not zeroed: {:?}", coef.row(0));
    }

    #[test]
    fn test_lasso_zero_alpha_matches_ols() {
        let x = mat(vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]]);
        let y = TargetArray::vector(vec![5.0, 7.0, 9.0, 11.0]).unwrap();
        let mut lasso = Lasso::new(0.0).unwrap().with_tol(1e-10);
        lasso.fit(&x, &y).unwrap();
        let coef = lasso.coefficients().unwrap();
        assert_vec_close(coef.row(0), &[5.0, 2.0], 1e-6);
    }

    #[test]
    fn test_lasso_rejects_negative_alpha() {
        assert!(Lasso::new(-0.1).is_err());
    }

    #[test]
    fn test_mean_regressor() {
        let x = mat(vec![vec![1.0], vec![2.0], vec![3.0]]);
        let y = TargetArray::matrix(vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]])
            .unwrap();
        let mut model = MeanRegressor::default();
        model.fit(&x, &y).unwrap();

        let q = DesignMatrix::ones(2);
        let pred = model.predict(&q).unwrap();
        assert_eq!(pred.dim(), Some(2));
        assert_vec_close(pred.as_slice(), &[2.0, 20.0, 2.0, 20.0], 1e-12);
    }
}
