//! Design-matrix assembly: stacking, row-wise cross products, and the
//! identity expansion the final stage uses to query one treatment
//! dimension at a time.

use ot_core::{DesignMatrix, Error, Result};

/// Concatenate matrices column-wise. All parts must share a row count;
/// zero-column parts are legal and contribute nothing.
pub fn hstack(parts: &[&DesignMatrix]) -> Result<DesignMatrix> {
    let Some(first) = parts.first() else {
        return Err(Error::Validation("hstack needs at least one matrix".to_string()));
    };
    let n = first.nrows();
    let mut p = 0;
    for m in parts {
        if m.nrows() != n {
            return Err(Error::Validation(format!(
                "hstack row mismatch: {} vs {}",
                m.nrows(),
                n
            )));
        }
        p += m.ncols();
    }
    let mut data = Vec::with_capacity(n * p);
    for i in 0..n {
        for m in parts {
            data.extend_from_slice(m.row(i));
        }
    }
    DesignMatrix::from_row_major(n, p, data)
}

/// Row-wise cross product of two matrices: every column of `a` interacted
/// with every column of `b`.
///
/// Output column `jb · p_a + ja` holds `a[i, ja] · b[i, jb]` — columns of
/// `b` index the blocks, columns of `a` run within a block. The final
/// stage relies on this layout: training designs built as
/// `cross_product(features, treatment)` put treatment dimension `j`'s
/// coefficients in block `j`, which is exactly the block
/// [`kron_identity_rows`] isolates at prediction time.
pub fn cross_product(a: &DesignMatrix, b: &DesignMatrix) -> Result<DesignMatrix> {
    let n = a.nrows();
    if b.nrows() != n {
        return Err(Error::Validation(format!(
            "cross product row mismatch: {} vs {}",
            n,
            b.nrows()
        )));
    }
    let (pa, pb) = (a.ncols(), b.ncols());
    let mut data = Vec::with_capacity(n * pa * pb);
    for i in 0..n {
        let (ra, rb) = (a.row(i), b.row(i));
        for &vb in rb {
            for &va in ra {
                data.push(va * vb);
            }
        }
    }
    DesignMatrix::from_row_major(n, pa * pb, data)
}

/// The prediction-time expansion: the Kronecker product of the row-wise
/// flattened `d_t × d_t` identity with the featurized query matrix,
/// reshaped to `(m · d_t) × (d_t · p)` rows.
///
/// Row `i · d_t + j` places sample `i`'s feature row in block `j` and
/// zeros elsewhere, so a single batched predict over these rows reads off
/// each treatment dimension's coefficient block without touching the
/// model's coefficients directly.
pub fn kron_identity_rows(f: &DesignMatrix, d_t: usize) -> Result<DesignMatrix> {
    let (m, p) = (f.nrows(), f.ncols());
    let mut data = vec![0.0; m * d_t * d_t * p];
    let width = d_t * p;
    for i in 0..m {
        let row = f.row(i);
        for j in 0..d_t {
            let start = (i * d_t + j) * width + j * p;
            data[start..start + p].copy_from_slice(row);
        }
    }
    DesignMatrix::from_row_major(m * d_t, width, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat(rows: Vec<Vec<f64>>) -> DesignMatrix {
        DesignMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_hstack_concatenates_columns() {
        let a = mat(vec![vec![1.0], vec![2.0]]);
        let b = mat(vec![vec![3.0, 4.0], vec![5.0, 6.0]]);
        let h = hstack(&[&a, &b]).unwrap();
        assert_eq!(h.ncols(), 3);
        assert_eq!(h.row(0), &[1.0, 3.0, 4.0]);
        assert_eq!(h.row(1), &[2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_hstack_with_empty_part() {
        let a = mat(vec![vec![1.0], vec![2.0]]);
        let w = DesignMatrix::empty(2);
        let h = hstack(&[&a, &w]).unwrap();
        assert_eq!(h.ncols(), 1);
        assert_eq!(h.row(1), &[2.0]);
    }

    #[test]
    fn test_hstack_rejects_row_mismatch() {
        let a = mat(vec![vec![1.0]]);
        let b = mat(vec![vec![1.0], vec![2.0]]);
        assert!(hstack(&[&a, &b]).is_err());
    }

    #[test]
    fn test_cross_product_block_layout() {
        let a = mat(vec![vec![1.0, 2.0]]);
        let b = mat(vec![vec![10.0, 100.0]]);
        let c = cross_product(&a, &b).unwrap();
        // b-major blocks: [a*10, a*100]
        assert_eq!(c.row(0), &[10.0, 20.0, 100.0, 200.0]);
    }

    #[test]
    fn test_kron_identity_rows_isolates_blocks() {
        let f = mat(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let k = kron_identity_rows(&f, 3).unwrap();
        assert_eq!(k.nrows(), 6);
        assert_eq!(k.ncols(), 6);
        // sample 0, treatment dim 1 → features in the middle block
        assert_eq!(k.row(1), &[0.0, 0.0, 1.0, 2.0, 0.0, 0.0]);
        // sample 1, treatment dim 2 → features in the last block
        assert_eq!(k.row(5), &[0.0, 0.0, 0.0, 0.0, 3.0, 4.0]);
    }

    #[test]
    fn test_kron_matches_cross_product_layout() {
        // A unit-vector treatment row through cross_product must equal the
        // corresponding kron row.
        let f = mat(vec![vec![1.0, 2.0]]);
        let e1 = mat(vec![vec![0.0, 1.0]]);
        let via_cross = cross_product(&f, &e1).unwrap();
        let via_kron = kron_identity_rows(&f, 2).unwrap();
        assert_eq!(via_cross.row(0), via_kron.row(1));
    }

    #[test]
    fn test_kron_scalar_treatment_is_identity() {
        let f = mat(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let k = kron_identity_rows(&f, 1).unwrap();
        assert_eq!(k.nrows(), 2);
        assert_eq!(k.row(0), f.row(0));
        assert_eq!(k.row(1), f.row(1));
    }
}
