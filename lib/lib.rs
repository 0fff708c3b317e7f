//! Provides constructs for automated numerical integration of the
//! time-dependent Schrödinger equation on uniform one- and
//! two-dimensional grids via the implicit Crank–Nicolson scheme.
//!
//! The engine discretizes the Hamiltonian −∇² + V (ħ = 2m = 1) with
//! second-order finite differences under free or clamped (Dirichlet)
//! boundaries, assembles the fixed pair of Crank–Nicolson operators
//! `A = I + iHΔt/2` and `B = I − iHΔt/2`, seeds Gaussian wave packets,
//! and advances the state by solving `A·ψ' = B·ψ`, either exactly through
//! a prefactored banded LU or approximately through one of several Krylov
//! methods:
//!
//! - conjugate-gradient-squared
//! - stabilized biconjugate gradients
//! - restarted GMRES, plain or augmented (LGMRES)
//! - transpose-free QMR
//!
//! Potentials are supplied by the caller as plain functions; rendering,
//! potential libraries, and driver scripts live outside this crate and
//! consume the engine through [`sim::Simulation`] and its observables.

pub mod error;
pub mod grid;
pub mod sparse;
pub mod hamiltonian;
pub mod propagator;
pub mod pulse;
pub mod krylov;
pub mod state;
pub mod sim;
pub mod utils;

pub(crate) const DEF_EPSILON: f64 = 1e-6;
pub(crate) const DEF_MAXITERS: usize = 1000;

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;
