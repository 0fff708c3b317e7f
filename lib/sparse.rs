//! Minimal compressed-sparse-row matrices.
//!
//! The discretized operators built here are overwhelmingly sparse (a
//! tridiagonal band in 1D, a 5-point stencil in 2D), so they are stored in
//! CSR form and only ever touched through matrix-vector products, banded
//! factorization, and the small algebra needed to assemble them
//! (diagonal stacking, Kronecker products, sums, scalar maps).

use std::ops::{ Add, Mul };
use ndarray as nd;
use num_traits::{ One, Zero };
use crate::Arr1;

/// A sparse matrix in compressed-sparse-row form.
///
/// Column indices are strictly ascending within each row. Explicitly
/// stored zeros are allowed; they keep the structural symmetry of the
/// clamped-boundary operators intact.
#[derive(Clone, Debug, PartialEq)]
pub struct CsMat<T> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T> CsMat<T> {
    /// Assemble a matrix from raw CSR storage.
    ///
    /// *Panics if the storage is inconsistent: `row_ptr` must hold
    /// `nrows + 1` monotone offsets ending at `col_idx.len()`, and column
    /// indices must be strictly ascending within each row.*
    pub fn from_parts(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert_eq!(row_ptr.len(), nrows + 1);
        assert_eq!(col_idx.len(), values.len());
        assert_eq!(*row_ptr.last().unwrap(), col_idx.len());
        for i in 0..nrows {
            assert!(row_ptr[i] <= row_ptr[i + 1]);
            let row = &col_idx[row_ptr[i]..row_ptr[i + 1]];
            assert!(row.windows(2).all(|w| w[0] < w[1]));
            assert!(row.last().map(|&j| j < ncols).unwrap_or(true));
        }
        Self { nrows, ncols, row_ptr, col_idx, values }
    }

    pub fn nrows(&self) -> usize { self.nrows }

    pub fn ncols(&self) -> usize { self.ncols }

    pub fn shape(&self) -> (usize, usize) { (self.nrows, self.ncols) }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize { self.values.len() }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let span = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[span.clone()], &self.values[span])
    }

    /// Largest stored distance from the main diagonal.
    pub fn bandwidth(&self) -> usize {
        let mut kb: usize = 0;
        for i in 0..self.nrows {
            for &j in self.row(i).0 {
                kb = kb.max(i.abs_diff(j));
            }
        }
        kb
    }
}

impl<T: Copy> CsMat<T> {
    /// Stored value at `(i, j)`, or `None` outside the sparsity pattern.
    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        let (cols, vals) = self.row(i);
        cols.binary_search(&j).ok().map(|k| vals[k])
    }

    /// Apply a function to every stored value.
    pub fn mapv<U, F>(&self, f: F) -> CsMat<U>
    where F: FnMut(T) -> U
    {
        CsMat {
            nrows: self.nrows,
            ncols: self.ncols,
            row_ptr: self.row_ptr.clone(),
            col_idx: self.col_idx.clone(),
            values: self.values.iter().copied().map(f).collect(),
        }
    }

    /// Stack diagonals into a square matrix of size `n`.
    ///
    /// Each `(offset, values)` pair places `values` on the diagonal
    /// `offset` columns right (positive) or left (negative) of the main
    /// one, exactly like `scipy.sparse.diags`.
    ///
    /// *Panics if a value slice does not have length `n − |offset|`, or
    /// if two diagonals share an offset.*
    pub fn from_diags(n: usize, diags: &[(isize, &[T])]) -> Self {
        for &(k, vals) in diags {
            assert!(k.unsigned_abs() < n);
            assert_eq!(vals.len(), n - k.unsigned_abs());
        }
        let mut order: Vec<usize> = (0..diags.len()).collect();
        order.sort_by_key(|&d| diags[d].0);
        assert!(order.windows(2).all(|w| diags[w[0]].0 < diags[w[1]].0));

        let mut row_ptr: Vec<usize> = Vec::with_capacity(n + 1);
        let mut col_idx: Vec<usize> = Vec::new();
        let mut values: Vec<T> = Vec::new();
        row_ptr.push(0);
        for i in 0..n {
            for &d in &order {
                let (k, vals) = diags[d];
                let j = i as isize + k;
                if (0..n as isize).contains(&j) {
                    let j = j as usize;
                    col_idx.push(j);
                    values.push(if k >= 0 { vals[i] } else { vals[j] });
                }
            }
            row_ptr.push(col_idx.len());
        }
        Self { nrows: n, ncols: n, row_ptr, col_idx, values }
    }

    /// Multiply every stored value by `s`.
    pub fn scale(&self, s: T) -> Self
    where T: Mul<Output = T>
    {
        self.mapv(|v| v * s)
    }

    /// Kronecker (tensor) product `self ⊗ other`.
    pub fn kron(&self, other: &Self) -> Self
    where T: Mul<Output = T>
    {
        let nrows = self.nrows * other.nrows;
        let ncols = self.ncols * other.ncols;
        let mut row_ptr: Vec<usize> = Vec::with_capacity(nrows + 1);
        let mut col_idx: Vec<usize> = Vec::new();
        let mut values: Vec<T> = Vec::new();
        row_ptr.push(0);
        for i1 in 0..self.nrows {
            let (ca, va) = self.row(i1);
            for i2 in 0..other.nrows {
                let (cb, vb) = other.row(i2);
                for (&j1, &a) in ca.iter().zip(va) {
                    for (&j2, &b) in cb.iter().zip(vb) {
                        col_idx.push(j1 * other.ncols + j2);
                        values.push(a * b);
                    }
                }
                row_ptr.push(col_idx.len());
            }
        }
        Self { nrows, ncols, row_ptr, col_idx, values }
    }

    /// Entrywise sum, merging the two sparsity patterns.
    ///
    /// *Panics if the shapes differ.*
    pub fn add(&self, other: &Self) -> Self
    where T: Add<Output = T>
    {
        assert_eq!(self.shape(), other.shape());
        let mut row_ptr: Vec<usize> = Vec::with_capacity(self.nrows + 1);
        let mut col_idx: Vec<usize> = Vec::new();
        let mut values: Vec<T> = Vec::new();
        row_ptr.push(0);
        for i in 0..self.nrows {
            let (ca, va) = self.row(i);
            let (cb, vb) = other.row(i);
            let (mut p, mut q) = (0, 0);
            while p < ca.len() || q < cb.len() {
                if q == cb.len() || (p < ca.len() && ca[p] < cb[q]) {
                    col_idx.push(ca[p]);
                    values.push(va[p]);
                    p += 1;
                } else if p == ca.len() || cb[q] < ca[p] {
                    col_idx.push(cb[q]);
                    values.push(vb[q]);
                    q += 1;
                } else {
                    col_idx.push(ca[p]);
                    values.push(va[p] + vb[q]);
                    p += 1;
                    q += 1;
                }
            }
            row_ptr.push(col_idx.len());
        }
        Self { nrows: self.nrows, ncols: self.ncols, row_ptr, col_idx, values }
    }
}

impl<T: Copy + Zero + One> CsMat<T> {
    /// The `n × n` identity.
    pub fn eye(n: usize) -> Self {
        Self {
            nrows: n,
            ncols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![T::one(); n],
        }
    }
}

impl<T> CsMat<T>
where T: Copy + Zero + Add<Output = T> + Mul<Output = T>
{
    /// Matrix-vector product `self · x`.
    ///
    /// *Panics if `x` does not have `ncols` elements.*
    pub fn dot<S>(&self, x: &Arr1<S>) -> nd::Array1<T>
    where S: nd::Data<Elem = T>
    {
        assert_eq!(x.len(), self.ncols);
        let mut y: Vec<T> = Vec::with_capacity(self.nrows);
        for i in 0..self.nrows {
            let (cols, vals) = self.row(i);
            let mut acc = T::zero();
            for (&j, &v) in cols.iter().zip(vals) {
                acc = acc + v * x[j];
            }
            y.push(acc);
        }
        nd::Array1::from_vec(y)
    }

    /// Expand to a dense array.
    pub fn to_dense(&self) -> nd::Array2<T> {
        let mut dense: nd::Array2<T>
            = nd::Array2::from_elem((self.nrows, self.ncols), T::zero());
        for i in 0..self.nrows {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                dense[[i, j]] = v;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_dot() {
        let id: CsMat<f64> = CsMat::eye(3);
        let x = nd::array![3.0, 5.0, 7.0];
        let y = id.dot(&x);
        assert_eq!(y, x);
        assert_eq!(id.nnz(), 3);
    }

    #[test]
    fn diags_tridiagonal() {
        // d=2, e=-1: the 1D kinetic block
        let d = vec![2.0; 4];
        let e = vec![-1.0; 3];
        let k = CsMat::from_diags(4, &[(0, &d), (1, &e), (-1, &e)]);
        assert_eq!(k.nnz(), 10);
        assert_eq!(k.get(0, 0), Some(2.0));
        assert_eq!(k.get(2, 1), Some(-1.0));
        assert_eq!(k.get(0, 2), None);
        assert_eq!(k.bandwidth(), 1);
        let y = k.dot(&nd::array![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(y, nd::array![2.0, -1.0, 0.0, 0.0]);
    }

    #[test]
    fn diags_offset_indexing() {
        // off-diagonals index from the top of each diagonal run
        let d = vec![1.0, 2.0, 3.0];
        let e = vec![10.0, 20.0];
        let m = CsMat::from_diags(3, &[(0, &d), (-1, &e)]);
        assert_eq!(m.get(1, 0), Some(10.0));
        assert_eq!(m.get(2, 1), Some(20.0));
    }

    #[test]
    fn kron_against_dense() {
        let a = CsMat::from_diags(2, &[(0, [1.0, 2.0].as_slice())]);
        let b = CsMat::from_diags(
            2,
            &[(0, [0.0, 3.0].as_slice()), (1, [1.0].as_slice())],
        );
        let k = a.kron(&b);
        assert_eq!(k.shape(), (4, 4));
        let dense = k.to_dense();
        let expected = nd::array![
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 3.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 2.0],
            [0.0, 0.0, 0.0, 6.0],
        ];
        assert_eq!(dense, expected);
    }

    #[test]
    fn add_merges_patterns() {
        let d = vec![1.0; 3];
        let e = vec![5.0; 2];
        let a = CsMat::from_diags(3, &[(0, &d)]);
        let b = CsMat::from_diags(3, &[(0, &d), (1, &e)]);
        let s = a.add(&b);
        assert_eq!(s.get(0, 0), Some(2.0));
        assert_eq!(s.get(0, 1), Some(5.0));
        assert_eq!(s.get(2, 2), Some(2.0));
        assert_eq!(s.nnz(), 5);
    }

    #[test]
    fn kron_sum_is_2d_laplacian() {
        // I⊗K + K⊗I on a 2×2 interior grid
        let d = vec![2.0; 2];
        let e = vec![-1.0; 1];
        let k = CsMat::from_diags(2, &[(0, &d), (1, &e), (-1, &e)]);
        let id: CsMat<f64> = CsMat::eye(2);
        let lap = id.kron(&k).add(&k.kron(&id));
        assert_eq!(lap.get(0, 0), Some(4.0));
        assert_eq!(lap.get(0, 1), Some(-1.0));
        assert_eq!(lap.get(0, 2), Some(-1.0));
        assert_eq!(lap.get(0, 3), None);
        assert_eq!(lap.bandwidth(), 2);
    }
}
