//! Uniform discretization domains for the propagation engine.
//!
//! A [`Grid`] describes where the wavefunction lives: a line or a plane,
//! the number of subdivisions per axis, and whether the domain edges are
//! clamped (Dirichlet) or excluded entirely. Everything downstream (the
//! Hamiltonian, the propagators, the state vector) derives its size from
//! the grid and never mutates it.

use ndarray as nd;
use crate::error::BuildError;

/// How the edges of the domain are treated.
///
/// `Free` drops the edge nodes from the discretization altogether, so the
/// operator carries no boundary rows. `Fixed` keeps them and clamps the
/// wavefunction to zero there (Dirichlet).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryMode {
    Free,
    Fixed,
}

/// The spatial layout of the domain: a line segment or a square plane.
///
/// The extent is shared by both axes in 2D, so only the origin differs
/// between the variants.
#[derive(Clone, Copy, Debug)]
pub enum Domain {
    One { origin: f64 },
    Two { origin: (f64, f64) },
}

/// Grid coordinates as exposed to callers: the x axis alone, or the x and
/// y axes of a plane.
#[derive(Clone, Debug)]
pub enum Coordinates {
    One(nd::Array1<f64>),
    Two(nd::Array1<f64>, nd::Array1<f64>),
}

/// A uniform 1D or 2D discretization domain.
///
/// Holds the subdivision count `N`, the extent `L`, and the boundary
/// mode; the spacing is `h = L/N` and each axis carries
/// `M = N − 1` (free) or `M = N + 1` (fixed) nodes, evenly spread from
/// the origin to `origin + L` inclusive. Immutable once built.
#[derive(Clone, Copy, Debug)]
pub struct Grid {
    domain: Domain,
    npoints: usize,
    extent: f64,
    boundary: BoundaryMode,
}

impl Grid {
    /// Create a new grid.
    ///
    /// Fails if `npoints < 2` or `extent ≤ 0`.
    pub fn new(
        domain: Domain,
        npoints: usize,
        extent: f64,
        boundary: BoundaryMode,
    ) -> Result<Self, BuildError> {
        BuildError::check_npoints(npoints)?;
        BuildError::check_extent(extent)?;
        Ok(Self { domain, npoints, extent, boundary })
    }

    /// Shorthand for a one-dimensional grid.
    pub fn line(
        origin: f64,
        npoints: usize,
        extent: f64,
        boundary: BoundaryMode,
    ) -> Result<Self, BuildError> {
        Self::new(Domain::One { origin }, npoints, extent, boundary)
    }

    /// Shorthand for a two-dimensional grid.
    pub fn plane(
        origin: (f64, f64),
        npoints: usize,
        extent: f64,
        boundary: BoundaryMode,
    ) -> Result<Self, BuildError> {
        Self::new(Domain::Two { origin }, npoints, extent, boundary)
    }

    pub fn domain(&self) -> Domain { self.domain }

    pub fn boundary(&self) -> BoundaryMode { self.boundary }

    /// Number of subdivisions `N` per axis.
    pub fn npoints(&self) -> usize { self.npoints }

    /// Domain extent `L`, shared by both axes in 2D.
    pub fn extent(&self) -> f64 { self.extent }

    /// Spatial dimension, 1 or 2.
    pub fn dim(&self) -> usize {
        match self.domain {
            Domain::One { .. } => 1,
            Domain::Two { .. } => 2,
        }
    }

    /// Node spacing `h = L/N`.
    pub fn spacing(&self) -> f64 {
        self.extent / self.npoints as f64
    }

    /// Number of nodes per axis, `M = N − 1` (free) or `N + 1` (fixed).
    pub fn nodes(&self) -> usize {
        match self.boundary {
            BoundaryMode::Free => self.npoints - 1,
            BoundaryMode::Fixed => self.npoints + 1,
        }
    }

    /// Total number of nodes, `M` in 1D and `M²` in 2D.
    pub fn size(&self) -> usize {
        self.nodes().pow(self.dim() as u32)
    }

    /// Whether a per-axis node index sits on the clamped edge of a fixed
    /// grid. Always `false` for free grids, which carry no edge nodes.
    pub fn on_edge(&self, index: usize) -> bool {
        self.boundary == BoundaryMode::Fixed
            && (index == 0 || index == self.nodes() - 1)
    }

    fn axis_from(&self, origin: f64) -> nd::Array1<f64> {
        nd::Array1::linspace(origin, origin + self.extent, self.nodes())
    }

    /// Node coordinates along the x axis.
    pub fn axis(&self) -> nd::Array1<f64> {
        match self.domain {
            Domain::One { origin } => self.axis_from(origin),
            Domain::Two { origin } => self.axis_from(origin.0),
        }
    }

    /// Node coordinates along the y axis of a plane.
    pub fn axis_y(&self) -> Option<nd::Array1<f64>> {
        match self.domain {
            Domain::One { .. } => None,
            Domain::Two { origin } => Some(self.axis_from(origin.1)),
        }
    }

    /// Node coordinates for callers: x alone in 1D, the (x, y) axis pair
    /// in 2D. Flattened quantities over a plane are row-major with x as
    /// the slow axis.
    pub fn coordinates(&self) -> Coordinates {
        match self.axis_y() {
            None => Coordinates::One(self.axis()),
            Some(y) => Coordinates::Two(self.axis(), y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_counts() {
        let free = Grid::line(0.0, 256, 10.0, BoundaryMode::Free).unwrap();
        assert_eq!(free.nodes(), 255);
        assert_eq!(free.size(), 255);
        let fixed = Grid::plane((0.0, 0.0), 64, 2.0, BoundaryMode::Fixed)
            .unwrap();
        assert_eq!(fixed.nodes(), 65);
        assert_eq!(fixed.size(), 65 * 65);
    }

    #[test]
    fn axis_endpoints() {
        let g = Grid::line(1.0, 10, 4.0, BoundaryMode::Fixed).unwrap();
        let x = g.axis();
        assert_eq!(x.len(), 11);
        assert!((x[0] - 1.0).abs() < 1e-15);
        assert!((x[10] - 5.0).abs() < 1e-15);
        assert!((g.spacing() - 0.4).abs() < 1e-15);
    }

    #[test]
    fn rejects_degenerate_domains() {
        assert!(matches!(
            Grid::line(0.0, 1, 1.0, BoundaryMode::Free),
            Err(BuildError::BadPointCount(1)),
        ));
        assert!(matches!(
            Grid::line(0.0, 16, 0.0, BoundaryMode::Free),
            Err(BuildError::BadExtent(_)),
        ));
    }
}
