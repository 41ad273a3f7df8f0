//! Dense array types shared across the estimation crates.
//!
//! Everything is stored row-major in flat `Vec<f64>` buffers with explicit
//! dimensions, so per-sample rows are contiguous slices and fold selection
//! is a gather over row indices.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Dense row-major design matrix (n samples × p columns).
///
/// Used for raw features, controls, and every assembled design. A zero-column
/// matrix is legal (an empty control set) and is produced by [`DesignMatrix::empty`];
/// [`DesignMatrix::from_rows`] requires at least one column.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    n: usize,
    p: usize,
    data: Vec<f64>, // length n*p, row-major
}

impl DesignMatrix {
    /// Build from per-sample rows, validating rectangularity and finiteness.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        let p = rows.first().map(|r| r.len()).unwrap_or(0);
        if n == 0 || p == 0 {
            return Err(Error::Validation("matrix must be non-empty (n>0, p>0)".to_string()));
        }
        let mut data = Vec::with_capacity(n * p);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != p {
                return Err(Error::Validation(format!(
                    "matrix must be rectangular: row {} has len {}, expected {}",
                    i,
                    row.len(),
                    p
                )));
            }
            for v in row {
                if !v.is_finite() {
                    return Err(Error::Validation(
                        "matrix must contain only finite values".to_string(),
                    ));
                }
                data.push(v);
            }
        }
        Ok(Self { n, p, data })
    }

    /// Build from a flat row-major buffer of length `n * p`.
    pub fn from_row_major(n: usize, p: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n * p {
            return Err(Error::Validation(format!(
                "buffer has wrong length: expected n*p={}, got {}",
                n * p,
                data.len()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation("matrix must contain only finite values".to_string()));
        }
        Ok(Self { n, p, data })
    }

    /// A single constant column of ones (the one-stratum default for X).
    pub fn ones(n: usize) -> Self {
        Self { n, p: 1, data: vec![1.0; n] }
    }

    /// An `n × 0` matrix (the empty default for W).
    pub fn empty(n: usize) -> Self {
        Self { n, p: 0, data: Vec::new() }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.n
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.p
    }

    /// Row `i` as a contiguous slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.p;
        &self.data[start..start + self.p]
    }

    /// Gather the given rows into a new matrix (fold selection).
    pub fn select_rows(&self, idx: &[usize]) -> Self {
        let mut data = Vec::with_capacity(idx.len() * self.p);
        for &i in idx {
            data.extend_from_slice(self.row(i));
        }
        Self { n: idx.len(), p: self.p, data }
    }

    /// Flat row-major view of the data.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Per-sample outcome or treatment values: either a *vector* (one value per
/// sample, no trailing dimension) or an *n × d matrix* (`d ≥ 1`).
///
/// The distinction is load-bearing: the rank observed at fit time decides
/// which axes of the effect tensor collapse, so it is carried through
/// residualization rather than normalized away.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetArray {
    n: usize,
    dim: Option<usize>, // None = vector, Some(d) = matrix with d columns
    data: Vec<f64>,     // length n * width, row-major
}

impl TargetArray {
    /// A rank-1 target: one value per sample.
    pub fn vector(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::Validation("target must be non-empty".to_string()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation("target must contain only finite values".to_string()));
        }
        Ok(Self { n: values.len(), dim: None, data: values })
    }

    /// A rank-2 target: `d ≥ 1` values per sample.
    pub fn matrix(rows: Vec<Vec<f64>>) -> Result<Self> {
        let m = DesignMatrix::from_rows(rows)
            .map_err(|_| Error::Validation("target matrix must be rectangular, non-empty and finite".to_string()))?;
        Ok(Self { n: m.n, dim: Some(m.p), data: m.data })
    }

    /// Build from a flat row-major buffer with an explicit rank.
    pub fn from_row_major(n: usize, dim: Option<usize>, data: Vec<f64>) -> Result<Self> {
        let w = dim.unwrap_or(1);
        if dim == Some(0) {
            return Err(Error::Validation("target matrix must have at least one column".to_string()));
        }
        if data.len() != n * w {
            return Err(Error::Validation(format!(
                "target buffer has wrong length: expected {}, got {}",
                n * w,
                data.len()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation("target must contain only finite values".to_string()));
        }
        Ok(Self { n, dim, data })
    }

    /// Number of samples.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.n
    }

    /// Trailing dimension: `None` for a vector, `Some(d)` for a matrix.
    #[inline]
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    /// Storage width: `d` for a matrix, 1 for a vector.
    #[inline]
    pub fn width(&self) -> usize {
        self.dim.unwrap_or(1)
    }

    /// Row `i` as a contiguous slice of length `width()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let w = self.width();
        &self.data[i * w..(i + 1) * w]
    }

    /// Gather the given rows, preserving rank.
    pub fn select_rows(&self, idx: &[usize]) -> Self {
        let w = self.width();
        let mut data = Vec::with_capacity(idx.len() * w);
        for &i in idx {
            data.extend_from_slice(self.row(i));
        }
        Self { n: idx.len(), dim: self.dim, data }
    }

    /// An all-zero array with this array's shape (residual scaffold).
    pub fn zeros_like(&self) -> Self {
        Self { n: self.n, dim: self.dim, data: vec![0.0; self.data.len()] }
    }

    /// `self − prediction`, preserving this array's rank.
    ///
    /// The prediction may be a vector where the target is an `n × 1` matrix
    /// (or vice versa); only row count and width must agree.
    pub fn residual(&self, prediction: &Self) -> Result<Self> {
        if prediction.n != self.n || prediction.width() != self.width() {
            return Err(Error::Validation(format!(
                "prediction shape ({} × {}) does not match target shape ({} × {})",
                prediction.n,
                prediction.width(),
                self.n,
                self.width()
            )));
        }
        let data = self.data.iter().zip(prediction.data.iter()).map(|(&a, &b)| a - b).collect();
        Ok(Self { n: self.n, dim: self.dim, data })
    }

    /// Scatter `values` into the given rows (fold residual assembly).
    /// Each row index must be in range and `values` must have matching width.
    pub fn set_rows(&mut self, idx: &[usize], values: &Self) {
        debug_assert_eq!(idx.len(), values.n);
        debug_assert_eq!(self.width(), values.width());
        let w = self.width();
        for (k, &i) in idx.iter().enumerate() {
            self.data[i * w..(i + 1) * w].copy_from_slice(values.row(k));
        }
    }

    /// View as a design matrix of shape `n × width()` (rank discarded).
    pub fn to_design(&self) -> DesignMatrix {
        DesignMatrix { n: self.n, p: self.width(), data: self.data.clone() }
    }

    /// Flat row-major view of the data.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Constant marginal effect of each treatment on each outcome, per sample.
///
/// Logical shape is `(m, d_y, d_t)`; an axis whose target was a vector at
/// fit time is collapsed and reported as `None`. Data is stored row-major
/// over the *effective* (non-collapsed) shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTensor {
    m: usize,
    d_y: Option<usize>,
    d_t: Option<usize>,
    data: Vec<f64>,
}

impl EffectTensor {
    /// Assemble from row-major data laid out as `(m, d_y_eff, d_t_eff)`.
    pub fn new(m: usize, d_y: Option<usize>, d_t: Option<usize>, data: Vec<f64>) -> Result<Self> {
        let expect = m * d_y.unwrap_or(1) * d_t.unwrap_or(1);
        if data.len() != expect {
            return Err(Error::Validation(format!(
                "effect buffer has wrong length: expected {}, got {}",
                expect,
                data.len()
            )));
        }
        Ok(Self { m, d_y, d_t, data })
    }

    /// Number of query samples.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.m
    }

    /// Outcome axis: `None` when the outcome was a vector at fit time.
    #[inline]
    pub fn d_y(&self) -> Option<usize> {
        self.d_y
    }

    /// Treatment axis: `None` when the treatment was a vector at fit time.
    #[inline]
    pub fn d_t(&self) -> Option<usize> {
        self.d_t
    }

    /// Effect of treatment dimension `t` on outcome dimension `y` for sample
    /// `i`. A collapsed axis is addressed with index 0.
    #[inline]
    pub fn value(&self, i: usize, y: usize, t: usize) -> f64 {
        let wy = self.d_y.unwrap_or(1);
        let wt = self.d_t.unwrap_or(1);
        self.data[(i * wy + y) * wt + t]
    }

    /// Flat row-major view over the effective shape.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Final-model coefficients reshaped to `(d_y, d_t, feature_width)`, with
/// the same axis-collapsing convention as [`EffectTensor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefTensor {
    d_y: Option<usize>,
    d_t: Option<usize>,
    width: usize,
    data: Vec<f64>,
}

impl CoefTensor {
    /// Assemble from row-major data laid out as `(d_y_eff, d_t_eff, width)`.
    pub fn new(
        d_y: Option<usize>,
        d_t: Option<usize>,
        width: usize,
        data: Vec<f64>,
    ) -> Result<Self> {
        let expect = d_y.unwrap_or(1) * d_t.unwrap_or(1) * width;
        if data.len() != expect {
            return Err(Error::Validation(format!(
                "coefficient buffer has wrong length: expected {}, got {}",
                expect,
                data.len()
            )));
        }
        Ok(Self { d_y, d_t, width, data })
    }

    /// Outcome axis: `None` when the outcome was a vector at fit time.
    #[inline]
    pub fn d_y(&self) -> Option<usize> {
        self.d_y
    }

    /// Treatment axis: `None` when the treatment was a vector at fit time.
    #[inline]
    pub fn d_t(&self) -> Option<usize> {
        self.d_t
    }

    /// Width of the featurized design each coefficient block spans.
    #[inline]
    pub fn feature_width(&self) -> usize {
        self.width
    }

    /// Coefficient of featurized column `j` in the `(y, t)` block.
    /// A collapsed axis is addressed with index 0.
    #[inline]
    pub fn value(&self, y: usize, t: usize, j: usize) -> f64 {
        let wt = self.d_t.unwrap_or(1);
        self.data[(y * wt + t) * self.width + j]
    }

    /// Flat row-major view over the effective shape.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}
