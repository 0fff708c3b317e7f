//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use ndarray as nd;
use num_complex::Complex64 as C64;
use thiserror::Error;
use crate::krylov::Method;

/// Returned from constructors of the grid, Hamiltonian, and propagators.
///
/// All of these are fatal: a failed constructor leaves nothing behind.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Returned when the configured spatial dimension is not 1 or 2.
    #[error("spatial dimension must be 1 or 2; got {0}")]
    BadDimension(usize),

    /// Returned when the arity of the potential field does not match the
    /// dimension of the grid it is sampled on.
    #[error("potential field arity does not match the grid; expected {expected} coordinate(s), got {got}")]
    PotentialArity { expected: usize, got: usize },

    /// Returned when the potential field produces a NaN or infinite value
    /// at some grid node.
    #[error("potential field produced a non-finite sample at flat node index {0}")]
    NonFiniteSample(usize),

    /// Returned when the per-axis point count is too small to leave at
    /// least one node after the boundary adjustment.
    #[error("point count must be at least 2; got {0}")]
    BadPointCount(usize),

    /// Returned when a non-positive domain extent is encountered.
    #[error("domain extent must be greater than 0; got {0}")]
    BadExtent(f64),

    /// Returned when a non-positive time step is encountered.
    #[error("time step must be greater than 0; got {0}")]
    BadTimeStep(f64),

    /// Returned when LU factorization of the implicit propagator hits a
    /// zero pivot. Cannot happen for a real-symmetric Hamiltonian and
    /// indicates a construction defect upstream.
    #[error("implicit propagator is singular; zero pivot at row {0}")]
    Singular(usize),
}

impl BuildError {
    pub(crate) fn check_npoints(n: usize) -> Result<(), Self> {
        (n >= 2).then_some(()).ok_or(Self::BadPointCount(n))
    }

    pub(crate) fn check_extent(extent: f64) -> Result<(), Self> {
        (extent > 0.0).then_some(()).ok_or(Self::BadExtent(extent))
    }

    pub(crate) fn check_dt(dt: f64) -> Result<(), Self> {
        (dt > 0.0).then_some(()).ok_or(Self::BadTimeStep(dt))
    }
}

/// Returned when a wave-packet pulse is rejected.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Returned when a non-positive packet energy is encountered.
    #[error("pulse energy must be greater than 0; got {0}")]
    BadEnergy(f64),

    /// Returned when a non-positive packet width is encountered.
    #[error("pulse width must be greater than 0; got {0}")]
    BadWidth(f64),

    /// Returned when a circular pulse is requested on a one-dimensional
    /// grid. Circular packets are outer products of two axis profiles and
    /// only make sense on a plane.
    #[error("circular pulses require a two-dimensional grid")]
    NeedsPlane,
}

impl PulseError {
    pub(crate) fn check_energy(energy: f64) -> Result<(), Self> {
        (energy > 0.0).then_some(()).ok_or(Self::BadEnergy(energy))
    }

    pub(crate) fn check_width(width: f64) -> Result<(), Self> {
        (width > 0.0).then_some(()).ok_or(Self::BadWidth(width))
    }
}

/// Returned from time-stepping operations.
#[derive(Debug, Error)]
pub enum StepError {
    /// Returned when an iterative solve fails to reach its residual target
    /// within its iteration budget.
    ///
    /// The wavefunction and the simulation clock are left at their
    /// pre-step values; `best` is the closest approximate solution the
    /// method produced, so the caller may retry, fall back to the exact
    /// solve, or accept the approximation.
    #[error("{method} stalled after {iterations} iterations; residual {residual:.3e}")]
    NotConverged {
        method: Method,
        iterations: usize,
        residual: f64,
        best: nd::Array1<C64>,
    },

    /// Returned when a non-positive residual target is encountered.
    #[error("epsilon values must be greater than 0; got {0}")]
    BadEpsilon(f64),

    /// Returned when a non-positive `maxiters` value is encountered.
    #[error("maxiters must be greater than 0; got {0}")]
    BadMaxiters(usize),

    /// Returned when a zero re-injection period is passed to a pulsed
    /// step.
    #[error("pulse re-injection period must be greater than 0")]
    BadPeriod,
}

impl StepError {
    pub(crate) fn check_epsilon(epsilon: f64) -> Result<(), Self> {
        (epsilon > 0.0).then_some(()).ok_or(Self::BadEpsilon(epsilon))
    }

    pub(crate) fn check_maxiters(maxiters: usize) -> Result<(), Self> {
        (maxiters != 0).then_some(()).ok_or(Self::BadMaxiters(maxiters))
    }

    pub(crate) fn check_period(period: usize) -> Result<(), Self> {
        (period != 0).then_some(()).ok_or(Self::BadPeriod)
    }
}
