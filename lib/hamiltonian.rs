//! Finite-difference discretization of the Hamiltonian −∇² + V.
//!
//! Works in units where ħ = 2m = 1, so the kinetic stencil is the plain
//! second difference scaled by 1/h². The four combinations of dimension
//! and boundary mode are a closed set:
//!
//! - 1D free: tridiagonal over the `N − 1` interior nodes.
//! - 1D fixed: `N + 1` nodes with the two edge rows clamped to the
//!   identity (Dirichlet).
//! - 2D free: Kronecker sum `I⊗K + K⊗I` of the 1D kinetic block, with
//!   the potential sampled over the full plane folded into the diagonal.
//! - 2D fixed: 5-point stencil on interior nodes, identity rows on edge
//!   nodes, couplings into edge columns dropped on both sides so the
//!   operator stays symmetric.

use ndarray as nd;
use crate::{
    error::BuildError,
    grid::{ BoundaryMode, Domain, Grid },
    sparse::CsMat,
};

/// A scalar potential supplied by the caller, sampled once per grid node
/// while the Hamiltonian is assembled.
///
/// The engine treats the function as a pure, stateless oracle: it is
/// called element-wise over the node coordinates and never stored.
pub enum PotentialField {
    One(Box<dyn Fn(f64) -> f64>),
    Two(Box<dyn Fn(f64, f64) -> f64>),
}

impl PotentialField {
    /// Wrap a potential over a line.
    pub fn line<F>(v: F) -> Self
    where F: Fn(f64) -> f64 + 'static
    {
        Self::One(Box::new(v))
    }

    /// Wrap a potential over a plane.
    pub fn plane<F>(v: F) -> Self
    where F: Fn(f64, f64) -> f64 + 'static
    {
        Self::Two(Box::new(v))
    }

    /// Number of coordinates the field consumes.
    pub fn dim(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Two(_) => 2,
        }
    }
}

fn check_sample(v: f64, index: usize) -> Result<f64, BuildError> {
    v.is_finite().then_some(v).ok_or(BuildError::NonFiniteSample(index))
}

// sample V over the axis nodes of a line
fn sample_line<F>(grid: &Grid, v: F) -> Result<Vec<f64>, BuildError>
where F: Fn(f64) -> f64
{
    grid.axis().iter().enumerate()
        .map(|(i, &x)| check_sample(v(x), i))
        .collect()
}

// sample V over the Kronecker-expanded plane nodes, row-major with x as
// the slow axis
fn sample_plane<F>(grid: &Grid, v: F) -> Result<Vec<f64>, BuildError>
where F: Fn(f64, f64) -> f64
{
    let x = grid.axis();
    let y = grid.axis_y().unwrap();
    let m = grid.nodes();
    let mut samples: Vec<f64> = Vec::with_capacity(m * m);
    for (ix, &xi) in x.iter().enumerate() {
        for (iy, &yi) in y.iter().enumerate() {
            samples.push(check_sample(v(xi, yi), ix * m + iy)?);
        }
    }
    Ok(samples)
}

// the unscaled tridiagonal second-difference block; a single-node grid
// degenerates to its bare diagonal
fn tridiag(m: usize, a: &[f64], b: &[f64]) -> CsMat<f64> {
    if m == 1 {
        CsMat::from_diags(m, &[(0, a)])
    } else {
        CsMat::from_diags(m, &[(0, a), (1, b), (-1, b)])
    }
}

// tridiagonal 1D operator over the interior nodes only; no boundary rows
fn line_free(grid: &Grid, v: &[f64]) -> CsMat<f64> {
    let m = grid.nodes();
    let h = grid.spacing();
    let a: Vec<f64> = v.iter().map(|vi| 2.0 + h.powi(2) * vi).collect();
    let b = vec![-1.0; m - 1];
    tridiag(m, &a, &b).scale(h.powi(-2))
}

// 1D operator with Dirichlet clamping: edge rows become the identity and
// the couplings next to them are zeroed symmetrically
fn line_fixed(grid: &Grid, v: &[f64]) -> CsMat<f64> {
    let m = grid.nodes();
    let h = grid.spacing();
    let mut a: Vec<f64> = v.iter().map(|vi| 2.0 + h.powi(2) * vi).collect();
    a[0] = h.powi(2);
    a[m - 1] = h.powi(2);
    let mut b = vec![-1.0; m - 1];
    b[0] = 0.0;
    b[m - 2] = 0.0;
    tridiag(m, &a, &b).scale(h.powi(-2))
}

// Kronecker sum of the 1D kinetic block over the interior plane, plus the
// sampled potential on the diagonal
fn plane_free(grid: &Grid, v: &[f64]) -> CsMat<f64> {
    let m = grid.nodes();
    let h = grid.spacing();
    let d = vec![2.0; m];
    let e = vec![-1.0; m - 1];
    let k = tridiag(m, &d, &e);
    let id: CsMat<f64> = CsMat::eye(m);
    let kinetic = id.kron(&k).add(&k.kron(&id)).scale(h.powi(-2));
    kinetic.add(&CsMat::from_diags(m * m, &[(0, v)]))
}

// 5-point stencil on interior nodes, identity rows on edge nodes
fn plane_fixed(grid: &Grid, v: &[f64]) -> CsMat<f64> {
    let m = grid.nodes();
    let h = grid.spacing();
    let hinv2 = h.powi(-2);
    let mut row_ptr: Vec<usize> = Vec::with_capacity(m * m + 1);
    let mut col_idx: Vec<usize> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    row_ptr.push(0);
    for ix in 0..m {
        for iy in 0..m {
            let flat = ix * m + iy;
            if grid.on_edge(ix) || grid.on_edge(iy) {
                col_idx.push(flat);
                values.push(1.0);
            } else {
                if ix > 1 {
                    col_idx.push(flat - m);
                    values.push(-hinv2);
                }
                if iy > 1 {
                    col_idx.push(flat - 1);
                    values.push(-hinv2);
                }
                col_idx.push(flat);
                values.push(4.0 * hinv2 + v[flat]);
                if iy < m - 2 {
                    col_idx.push(flat + 1);
                    values.push(-hinv2);
                }
                if ix < m - 2 {
                    col_idx.push(flat + m);
                    values.push(-hinv2);
                }
            }
            row_ptr.push(col_idx.len());
        }
    }
    CsMat::from_parts(m * m, m * m, row_ptr, col_idx, values)
}

/// Sample the potential over the grid and assemble the discretized
/// Hamiltonian.
///
/// The result is real-symmetric with diagonal `2/h² + V` (1D) or
/// `4/h² + V` (2D) on interior nodes. Fails if the field's arity does not
/// match the grid or if any sample is non-finite.
pub fn discretize(grid: &Grid, field: &PotentialField)
    -> Result<CsMat<f64>, BuildError>
{
    match (grid.domain(), field) {
        (Domain::One { .. }, PotentialField::One(v)) => {
            let samples = sample_line(grid, v)?;
            Ok(match grid.boundary() {
                BoundaryMode::Free => line_free(grid, &samples),
                BoundaryMode::Fixed => line_fixed(grid, &samples),
            })
        }
        (Domain::Two { .. }, PotentialField::Two(v)) => {
            let samples = sample_plane(grid, v)?;
            Ok(match grid.boundary() {
                BoundaryMode::Free => plane_free(grid, &samples),
                BoundaryMode::Fixed => plane_fixed(grid, &samples),
            })
        }
        _ => Err(BuildError::PotentialArity {
            expected: grid.dim(),
            got: field.dim(),
        }),
    }
}

/// Sorted eigenvalues of the densified Hamiltonian.
///
/// Exact diagonalization is only meant for modest grids (spectral
/// diagnostics, discretization-convergence studies); the propagation path
/// never densifies anything.
pub fn spectrum(h: &CsMat<f64>)
    -> Result<nd::Array1<f64>, ndarray_linalg::error::LinalgError>
{
    use ndarray_linalg::{ EigValshInto, UPLO };
    h.to_dense().eigvalsh_into(UPLO::Lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BoundaryMode;

    fn line_grid(boundary: BoundaryMode) -> Grid {
        Grid::line(0.0, 8, 4.0, boundary).unwrap()
    }

    #[test]
    fn line_free_structure() {
        let g = line_grid(BoundaryMode::Free);
        let h = discretize(&g, &PotentialField::line(|_| 0.0)).unwrap();
        let hinv2 = g.spacing().powi(-2);
        assert_eq!(h.shape(), (7, 7));
        assert!((h.get(3, 3).unwrap() - 2.0 * hinv2).abs() < 1e-12);
        assert!((h.get(3, 4).unwrap() + hinv2).abs() < 1e-12);
        assert_eq!(h.get(0, 2), None);
    }

    #[test]
    fn line_free_carries_potential() {
        let g = line_grid(BoundaryMode::Free);
        let h = discretize(&g, &PotentialField::line(|x| 10.0 * x)).unwrap();
        let x = g.axis();
        let hinv2 = g.spacing().powi(-2);
        for i in 0..g.nodes() {
            let expected = 2.0 * hinv2 + 10.0 * x[i];
            assert!((h.get(i, i).unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn line_fixed_clamps_edges() {
        let g = line_grid(BoundaryMode::Fixed);
        let h = discretize(&g, &PotentialField::line(|_| 3.0)).unwrap();
        let m = g.nodes();
        assert_eq!(h.shape(), (9, 9));
        assert!((h.get(0, 0).unwrap() - 1.0).abs() < 1e-12);
        assert!((h.get(m - 1, m - 1).unwrap() - 1.0).abs() < 1e-12);
        // stored couplings next to the edges are structurally present but
        // numerically zero, both directions
        assert_eq!(h.get(0, 1), Some(0.0));
        assert_eq!(h.get(1, 0), Some(0.0));
        assert_eq!(h.get(m - 2, m - 1), Some(0.0));
    }

    #[test]
    fn plane_free_diagonal() {
        let g = Grid::plane((0.0, 0.0), 6, 3.0, BoundaryMode::Free).unwrap();
        let h = discretize(&g, &PotentialField::plane(|x, y| x + 100.0 * y))
            .unwrap();
        let m = g.nodes();
        let x = g.axis();
        let y = g.axis_y().unwrap();
        let hinv2 = g.spacing().powi(-2);
        assert_eq!(h.shape(), (m * m, m * m));
        for ix in 0..m {
            for iy in 0..m {
                let expected = 4.0 * hinv2 + x[ix] + 100.0 * y[iy];
                let got = h.get(ix * m + iy, ix * m + iy).unwrap();
                assert!(
                    (got - expected).abs() < 1e-9,
                    "diagonal mismatch at ({ix}, {iy}): {got} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn plane_fixed_symmetric_with_identity_edges() {
        let g = Grid::plane((0.0, 0.0), 4, 2.0, BoundaryMode::Fixed).unwrap();
        let h = discretize(&g, &PotentialField::plane(|x, y| x * y)).unwrap();
        let m = g.nodes();
        let dense = h.to_dense();
        for i in 0..m * m {
            for j in 0..m * m {
                assert!(
                    (dense[[i, j]] - dense[[j, i]]).abs() < 1e-12,
                    "asymmetry at ({i}, {j})"
                );
            }
        }
        // corner and edge nodes are bare identity rows
        for ix in 0..m {
            for iy in 0..m {
                if ix == 0 || ix == m - 1 || iy == 0 || iy == m - 1 {
                    let flat = ix * m + iy;
                    assert_eq!(h.row(flat).0.len(), 1);
                    assert!((dense[[flat, flat]] - 1.0).abs() < 1e-12);
                }
            }
        }
        // an interior node carries the full 5-point stencil
        let hinv2 = g.spacing().powi(-2);
        let c = 2 * m + 2;
        assert!((dense[[c, c - m]] + hinv2).abs() < 1e-12);
        assert!((dense[[c, c - 1]] + hinv2).abs() < 1e-12);
        assert!((dense[[c, c + 1]] + hinv2).abs() < 1e-12);
        assert!((dense[[c, c + m]] + hinv2).abs() < 1e-12);
    }

    #[test]
    fn arity_mismatch_rejected() {
        let g = line_grid(BoundaryMode::Free);
        let err = discretize(&g, &PotentialField::plane(|_, _| 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::PotentialArity { expected: 1, got: 2 },
        ));
    }

    #[test]
    fn non_finite_sample_rejected() {
        let g = line_grid(BoundaryMode::Free);
        let err = discretize(
            &g,
            &PotentialField::line(|x| if x > 2.0 { f64::NAN } else { 0.0 }),
        ).unwrap_err();
        assert!(matches!(err, BuildError::NonFiniteSample(_)));
    }
}
