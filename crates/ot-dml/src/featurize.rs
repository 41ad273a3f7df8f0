//! Built-in featurizers: polynomial expansion and random Fourier features.

use std::collections::HashMap;

use rand::Rng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use ot_core::traits::Featurizer;
use ot_core::{DesignMatrix, Error, Result};

/// Polynomial feature expansion: all monomials of total degree up to
/// `degree`, with an optional leading bias column.
///
/// The default (degree 1 with bias) prepends a constant column to the raw
/// features, which is what lets a linear final model carry a constant
/// effect alongside feature-dependent terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    /// Maximum total degree of the generated monomials (≥ 1).
    pub degree: usize,
    /// Whether to prepend a constant 1.0 column.
    pub include_bias: bool,
}

impl Default for PolynomialFeatures {
    fn default() -> Self {
        Self { degree: 1, include_bias: true }
    }
}

impl PolynomialFeatures {
    /// New expansion with the given degree and a bias column.
    pub fn new(degree: usize, include_bias: bool) -> Result<Self> {
        if degree == 0 {
            return Err(Error::Validation("polynomial degree must be at least 1".to_string()));
        }
        Ok(Self { degree, include_bias })
    }

    /// Column-index multisets for every monomial, in degree order.
    fn monomials(&self, p: usize) -> Vec<Vec<usize>> {
        let mut all: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<Vec<usize>> = (0..p).map(|j| vec![j]).collect();
        for _ in 0..self.degree {
            all.extend(current.iter().cloned());
            let mut next = Vec::new();
            for c in &current {
                let last = *c.last().unwrap_or(&0);
                for j in last..p {
                    let mut ext = c.clone();
                    ext.push(j);
                    next.push(ext);
                }
            }
            current = next;
        }
        all
    }

    fn expand(&self, x: &DesignMatrix) -> Result<DesignMatrix> {
        let n = x.nrows();
        let monomials = self.monomials(x.ncols());
        let width = monomials.len() + usize::from(self.include_bias);
        if width == 0 {
            return Err(Error::Validation(
                "polynomial expansion of a zero-column matrix without bias is empty".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(n * width);
        for i in 0..n {
            let row = x.row(i);
            if self.include_bias {
                data.push(1.0);
            }
            for m in &monomials {
                data.push(m.iter().map(|&j| row[j]).product());
            }
        }
        DesignMatrix::from_row_major(n, width, data)
    }
}

impl Featurizer for PolynomialFeatures {
    fn fit_transform(&mut self, x: &DesignMatrix) -> Result<DesignMatrix> {
        self.expand(x)
    }

    fn transform(&self, x: &DesignMatrix) -> Result<DesignMatrix> {
        self.expand(x)
    }
}

/// One random projection: frequencies (`d_x × dim`, row-major) and phase
/// offsets (`dim`).
#[derive(Debug, Clone)]
struct Projection {
    omegas: Vec<f64>,
    phases: Vec<f64>,
}

/// Random Fourier featurizer approximating a Gaussian kernel:
/// `sqrt(2/dim) · cos(X·Ω + φ)` with `Ω ~ Normal(0, 1/bandwidth)` and
/// `φ ~ Uniform(0, 2π)`.
///
/// A projection is drawn lazily the first time `fit_transform` sees an
/// input width and cached for every later call with that width; the cache
/// is owned by the instance. Draws are deterministic in `(seed, width)`,
/// so independently-built instances sharing a seed produce the identical
/// projection — one configuration can featurize its nuisance and final
/// stages consistently without sharing mutable state.
#[derive(Debug, Clone)]
pub struct RandomFourierFeatures {
    dim: usize,
    freq: Normal<f64>,
    seed: u64,
    cache: HashMap<usize, Projection>,
}

impl RandomFourierFeatures {
    /// New featurizer with `dim` output features and the given kernel
    /// bandwidth (frequency scale `1/bandwidth`).
    pub fn new(dim: usize, bandwidth: f64, seed: u64) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Validation("random feature dimension must be at least 1".to_string()));
        }
        if !(bandwidth > 0.0) || !bandwidth.is_finite() {
            return Err(Error::Validation(format!("bandwidth must be positive, got {bandwidth}")));
        }
        let freq = Normal::new(0.0, 1.0 / bandwidth)
            .map_err(|e| Error::Validation(format!("invalid frequency scale: {e}")))?;
        Ok(Self { dim, freq, seed, cache: HashMap::new() })
    }

    /// Deterministic per-width draw: same `(seed, width)` → same projection.
    fn draw(&self, width: usize) -> Projection {
        let mix = (width as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed ^ mix);
        let omegas = (0..width * self.dim).map(|_| self.freq.sample(&mut rng)).collect();
        let phases =
            (0..self.dim).map(|_| rng.random_range(0.0..std::f64::consts::TAU)).collect();
        Projection { omegas, phases }
    }

    fn apply(&self, proj: &Projection, x: &DesignMatrix) -> Result<DesignMatrix> {
        let (n, p) = (x.nrows(), x.ncols());
        let scale = (2.0 / self.dim as f64).sqrt();
        let mut data = Vec::with_capacity(n * self.dim);
        for i in 0..n {
            let row = x.row(i);
            for k in 0..self.dim {
                let mut arg = proj.phases[k];
                for (j, &v) in row.iter().enumerate() {
                    arg += v * proj.omegas[j * self.dim + k];
                }
                data.push(scale * arg.cos());
            }
        }
        DesignMatrix::from_row_major(n, self.dim, data)
    }
}

impl Featurizer for RandomFourierFeatures {
    fn fit_transform(&mut self, x: &DesignMatrix) -> Result<DesignMatrix> {
        let width = x.ncols();
        if !self.cache.contains_key(&width) {
            let proj = self.draw(width);
            self.cache.insert(width, proj);
        }
        let proj = &self.cache[&width];
        self.apply(proj, x)
    }

    fn transform(&self, x: &DesignMatrix) -> Result<DesignMatrix> {
        let proj = self.cache.get(&x.ncols()).ok_or_else(|| {
            Error::Validation(format!(
                "no random projection drawn for input width {}; fit first",
                x.ncols()
            ))
        })?;
        self.apply(proj, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat(rows: Vec<Vec<f64>>) -> DesignMatrix {
        DesignMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_polynomial_degree_one_with_bias() {
        let mut f = PolynomialFeatures::default();
        let out = f.fit_transform(&mat(vec![vec![2.0, 3.0]])).unwrap();
        assert_eq!(out.row(0), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_polynomial_degree_two() {
        let mut f = PolynomialFeatures::new(2, false).unwrap();
        let out = f.fit_transform(&mat(vec![vec![2.0, 3.0]])).unwrap();
        // x0, x1, x0², x0·x1, x1²
        assert_eq!(out.row(0), &[2.0, 3.0, 4.0, 6.0, 9.0]);
    }

    #[test]
    fn test_polynomial_is_idempotent() {
        let mut f = PolynomialFeatures::new(3, true).unwrap();
        let x = mat(vec![vec![0.5], vec![-1.5]]);
        let a = f.fit_transform(&x).unwrap();
        let b = f.fit_transform(&x).unwrap();
        assert_eq!(a, b);
        assert_eq!(f.transform(&x).unwrap(), a);
    }

    #[test]
    fn test_polynomial_rejects_degree_zero() {
        assert!(PolynomialFeatures::new(0, true).is_err());
    }

    #[test]
    fn test_rff_draw_once_per_width() {
        let mut f = RandomFourierFeatures::new(16, 1.0, 7).unwrap();
        let x = mat(vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        let a = f.fit_transform(&x).unwrap();
        let b = f.fit_transform(&x).unwrap();
        assert_eq!(a, b, "projection must be reused for a seen width");
        assert_eq!(f.transform(&x).unwrap(), a);
    }

    #[test]
    fn test_rff_values_bounded() {
        let mut f = RandomFourierFeatures::new(8, 0.5, 3).unwrap();
        let x = mat(vec![vec![1.0, -2.0, 3.0]]);
        let out = f.fit_transform(&x).unwrap();
        let bound = (2.0_f64 / 8.0).sqrt() + 1e-12;
        assert!(out.as_slice().iter().all(|v| v.abs() <= bound));
    }

    #[test]
    fn test_rff_same_seed_shares_projection() {
        let x = mat(vec![vec![0.4], vec![0.9]]);
        let mut a = RandomFourierFeatures::new(12, 1.0, 42).unwrap();
        let mut b = RandomFourierFeatures::new(12, 1.0, 42).unwrap();
        assert_eq!(a.fit_transform(&x).unwrap(), b.fit_transform(&x).unwrap());

        let mut c = RandomFourierFeatures::new(12, 1.0, 43).unwrap();
        assert_ne!(a.fit_transform(&x).unwrap(), c.fit_transform(&x).unwrap());
    }

    #[test]
    fn test_rff_distinct_widths_get_distinct_projections() {
        let mut f = RandomFourierFeatures::new(4, 1.0, 5).unwrap();
        let x1 = mat(vec![vec![0.3]]);
        let x2 = mat(vec![vec![0.3, 0.0]]);
        f.fit_transform(&x1).unwrap();
        f.fit_transform(&x2).unwrap();
        assert_eq!(f.cache.len(), 2);
    }

    #[test]
    fn test_rff_transform_rejects_unseen_width() {
        let f = RandomFourierFeatures::new(4, 1.0, 5).unwrap();
        let x = mat(vec![vec![0.3]]);
        assert!(f.transform(&x).is_err());
    }
}
