//! Gaussian wave-packet initial conditions.
//!
//! A packet is a plane wave `exp(i·v·k·x)` under a Gaussian envelope,
//! with the wavenumber taken from the packet energy as `k = √E`
//! (ħ = 2m = 1, so E = k²). A plane packet modulates the x axis only and
//! is constant along y on a plane; a circular packet is the outer product
//! of two such profiles with per-axis velocities.
//!
//! Packets are always returned with unit Euclidean norm; superposing and
//! renormalizing the combined state is the caller's business.

use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::One;
use crate::{
    error::PulseError,
    grid::{ Domain, Grid },
    utils::{ kron, renormalize },
};

/// A Gaussian wave-packet configuration.
///
/// `Plane` runs along the x axis (on a plane it extends uniformly along
/// y); `Circular` carries an independent velocity component per axis and
/// only exists on a plane.
#[derive(Clone, Copy, Debug)]
pub enum Pulse {
    Plane {
        energy: f64,
        center: f64,
        velocity: f64,
        width: f64,
    },
    Circular {
        energy: f64,
        center: (f64, f64),
        velocity: (f64, f64),
        width: f64,
    },
}

impl Pulse {
    /// A plane packet with unit velocity.
    pub fn plane(energy: f64, center: f64, width: f64) -> Self {
        Self::Plane { energy, center, velocity: 1.0, width }
    }

    /// A circular packet.
    pub fn circular(
        energy: f64,
        center: (f64, f64),
        velocity: (f64, f64),
        width: f64,
    ) -> Self {
        Self::Circular { energy, center, velocity, width }
    }

    fn energy(&self) -> f64 {
        match self {
            Self::Plane { energy, .. } => *energy,
            Self::Circular { energy, .. } => *energy,
        }
    }

    fn width(&self) -> f64 {
        match self {
            Self::Plane { width, .. } => *width,
            Self::Circular { width, .. } => *width,
        }
    }

    /// Sample the packet over a grid, normalized to unit Euclidean norm.
    ///
    /// Fails on non-positive energy or width, and on a circular packet
    /// over a line.
    pub fn build(&self, grid: &Grid) -> Result<nd::Array1<C64>, PulseError> {
        PulseError::check_energy(self.energy())?;
        PulseError::check_width(self.width())?;
        let k = self.energy().sqrt();
        let mut packet = match (self, grid.domain()) {
            (&Self::Plane { center, velocity, width, .. }, Domain::One { .. }) => {
                profile(&grid.axis(), k, center, velocity, width)
            }
            (&Self::Plane { center, velocity, width, .. }, Domain::Two { .. }) => {
                let qx = profile(&grid.axis(), k, center, velocity, width);
                let line: nd::Array1<C64>
                    = nd::Array1::from_elem(grid.nodes(), C64::one());
                kron(&qx, &line)
            }
            (&Self::Circular { center, velocity, width, .. }, Domain::Two { .. }) => {
                let qx = profile(&grid.axis(), k, center.0, velocity.0, width);
                let qy = profile(
                    &grid.axis_y().unwrap(), k, center.1, velocity.1, width,
                );
                kron(&qx, &qy)
            }
            (&Self::Circular { .. }, Domain::One { .. }) => {
                return Err(PulseError::NeedsPlane);
            }
        };
        renormalize(&mut packet);
        Ok(packet)
    }
}

// Gaussian-modulated plane wave along one axis
fn profile(
    axis: &nd::Array1<f64>,
    k: f64,
    center: f64,
    velocity: f64,
    width: f64,
) -> nd::Array1<C64> {
    axis.mapv(|x| {
        C64::cis(velocity * k * x)
            * (-0.5 * ((x - center) / width).powi(2)).exp()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BoundaryMode;
    use crate::utils::vec_norm;

    fn line_grid() -> Grid {
        Grid::line(0.0, 64, 10.0, BoundaryMode::Free).unwrap()
    }

    fn plane_grid() -> Grid {
        Grid::plane((0.0, 0.0), 16, 2.0, BoundaryMode::Free).unwrap()
    }

    #[test]
    fn plane_packet_is_normalized_and_centered() {
        let g = line_grid();
        let q = Pulse::plane(500.0, 4.0, 0.3).build(&g).unwrap();
        assert_eq!(q.len(), g.size());
        assert!((vec_norm(&q) - 1.0).abs() < 1e-12);
        let x = g.axis();
        let peak = q.iter().enumerate()
            .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
            .map(|(i, _)| x[i])
            .unwrap();
        assert!((peak - 4.0).abs() < 2.0 * g.spacing());
    }

    #[test]
    fn plane_packet_extends_along_y() {
        let g = plane_grid();
        let m = g.nodes();
        let q = Pulse::plane(100.0, 1.0, 0.2).build(&g).unwrap();
        assert_eq!(q.len(), m * m);
        // constant modulus along y within each x slice
        for ix in 0..m {
            let first = q[ix * m].norm();
            for iy in 1..m {
                assert!((q[ix * m + iy].norm() - first).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn circular_packet_separates() {
        let g = plane_grid();
        let m = g.nodes();
        let q = Pulse::circular(100.0, (1.0, 1.2), (2.0, -1.0), 0.2)
            .build(&g)
            .unwrap();
        assert_eq!(q.len(), m * m);
        assert!((vec_norm(&q) - 1.0).abs() < 1e-12);
        // outer-product structure: q[ix, iy] * q[jx, jy] = q[ix, jy] * q[jx, iy]
        let (ix, iy, jx, jy) = (2, 3, 10, 12);
        let lhs = q[ix * m + iy] * q[jx * m + jy];
        let rhs = q[ix * m + jy] * q[jx * m + iy];
        assert!((lhs - rhs).norm() < 1e-12);
    }

    #[test]
    fn circular_needs_a_plane() {
        let g = line_grid();
        let err = Pulse::circular(100.0, (1.0, 1.0), (1.0, 0.0), 0.2)
            .build(&g)
            .unwrap_err();
        assert!(matches!(err, PulseError::NeedsPlane));
    }

    #[test]
    fn rejects_degenerate_parameters() {
        let g = line_grid();
        assert!(matches!(
            Pulse::plane(0.0, 1.0, 0.2).build(&g),
            Err(PulseError::BadEnergy(_)),
        ));
        assert!(matches!(
            Pulse::plane(10.0, 1.0, -0.5).build(&g),
            Err(PulseError::BadWidth(_)),
        ));
    }
}
