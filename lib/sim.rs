//! The simulation driver: one owned instance per run.
//!
//! A [`Simulation`] exclusively owns its grid, the discretized
//! Hamiltonian, the prefactored Crank–Nicolson propagator pair, and the
//! evolving wavefunction. Construction samples the caller's potential and
//! does all the expensive assembly up front; after that a run is a loop
//! of `step` calls handing observables to whatever renders them.
//!
//! Everything is synchronous and run-to-completion. Independent instances
//! share nothing, so running several side by side (e.g. to compare step
//! methods) is just a matter of building several.

use std::f64::consts::TAU;
use ndarray as nd;
use ndarray_linalg::error::LinalgError;
use num_complex::Complex64 as C64;
use crate::{
    DEF_EPSILON,
    DEF_MAXITERS,
    error::{ BuildError, PulseError, StepError },
    grid::{ BoundaryMode, Coordinates, Domain, Grid },
    hamiltonian::{ self, PotentialField },
    krylov::Method,
    propagator::Propagator,
    pulse::Pulse,
    sparse::CsMat,
    state::WaveFunction,
    utils::{ fft_freq, fft_inplace, fft_shift },
};

/// Accepted deviation of the total probability from 1 in
/// [`Simulation::consistency_check`].
pub const CONSISTENCY_TOL: f64 = 1e-3;

/// Plain-data construction parameters, for callers that drive the engine
/// from configuration rather than through [`Grid`] values.
///
/// The second origin coordinate is ignored on a line, mirroring the
/// scalar-or-pair start point of script-driven use.
#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    /// Spatial dimension, 1 or 2.
    pub dimension: usize,
    pub boundary: BoundaryMode,
    /// Subdivision count `N` per axis.
    pub npoints: usize,
    pub origin: [f64; 2],
    /// Domain extent `L`, shared by both axes in 2D.
    pub extent: f64,
    /// Time step Δt.
    pub dt: f64,
}

/// A Crank–Nicolson evolution of one wavefunction under one potential.
pub struct Simulation {
    grid: Grid,
    hamiltonian: CsMat<f64>,
    propagator: Propagator,
    wf: WaveFunction,
    dt: f64,
    pulsed_calls: usize,
}

impl Simulation {
    /// Sample the potential over the grid, assemble the Hamiltonian and
    /// the propagator pair, and start from an all-zero wavefunction.
    ///
    /// Fails on a non-positive Δt, a potential that does not fit the
    /// grid, or a singular implicit operator; nothing partial survives a
    /// failure.
    pub fn new(grid: Grid, potential: &PotentialField, dt: f64)
        -> Result<Self, BuildError>
    {
        BuildError::check_dt(dt)?;
        let h = hamiltonian::discretize(&grid, potential)?;
        let propagator = Propagator::new(&h, dt)?;
        let wf = WaveFunction::zero(grid.size());
        Ok(Self {
            grid,
            hamiltonian: h,
            propagator,
            wf,
            dt,
            pulsed_calls: 0,
        })
    }

    /// Like [`Self::new`], but from plain configuration data.
    pub fn from_config(cfg: &SimConfig, potential: &PotentialField)
        -> Result<Self, BuildError>
    {
        let domain = match cfg.dimension {
            1 => Domain::One { origin: cfg.origin[0] },
            2 => Domain::Two { origin: (cfg.origin[0], cfg.origin[1]) },
            d => return Err(BuildError::BadDimension(d)),
        };
        let grid = Grid::new(domain, cfg.npoints, cfg.extent, cfg.boundary)?;
        Self::new(grid, potential, cfg.dt)
    }

    pub fn grid(&self) -> &Grid { &self.grid }

    pub fn hamiltonian(&self) -> &CsMat<f64> { &self.hamiltonian }

    pub fn propagator(&self) -> &Propagator { &self.propagator }

    pub fn state(&self) -> &WaveFunction { &self.wf }

    /// The raw amplitude vector, row-major over the grid.
    pub fn psi(&self) -> &nd::Array1<C64> { self.wf.amplitudes() }

    pub fn dt(&self) -> f64 { self.dt }

    /// Superpose a Gaussian packet onto the state and cache it for
    /// re-injection.
    ///
    /// Repeated calls superpose; the state is deliberately not
    /// renormalized here so that several packets can be layered before a
    /// single [`Self::renormalize`].
    pub fn add_pulse(&mut self, pulse: &Pulse) -> Result<(), PulseError> {
        let packet = pulse.build(&self.grid)?;
        self.wf.deposit(packet);
        Ok(())
    }

    /// Rescale the state to unit Euclidean norm.
    pub fn renormalize(&mut self) {
        self.wf.renormalize();
    }

    /// Advance one step through the exact banded solve of
    /// `A·ψ' = B·ψ` and move the clock by Δt.
    ///
    /// Deterministic and norm-preserving up to round-off.
    pub fn step(&mut self) {
        let next = self.propagator.advance(self.wf.amplitudes());
        self.wf.advance(next, self.dt);
    }

    /// Advance one step through an iterative Krylov solve with the
    /// default budget (`ε = 1e-6`, 1000 products), warm-started from the
    /// current state.
    pub fn step_iterative(&mut self, method: Method) -> Result<(), StepError> {
        self.step_iterative_with(method, DEF_EPSILON, DEF_MAXITERS)
    }

    /// Advance one step through an iterative Krylov solve with an
    /// explicit budget.
    ///
    /// On non-convergence the state and the clock are left untouched and
    /// the error carries the method's best approximation, so the caller
    /// may retry, fall back to [`Self::step`], or abort.
    pub fn step_iterative_with(
        &mut self,
        method: Method,
        epsilon: f64,
        maxiters: usize,
    ) -> Result<(), StepError> {
        StepError::check_epsilon(epsilon)?;
        StepError::check_maxiters(maxiters)?;
        let rhs = self.propagator.rhs(self.wf.amplitudes());
        match method.solve(
            self.propagator.implicit(),
            &rhs,
            self.wf.amplitudes(),
            epsilon,
            maxiters,
        ) {
            Ok(next) => {
                self.wf.advance(next, self.dt);
                Ok(())
            }
            Err(stall) => Err(StepError::NotConverged {
                method,
                iterations: stall.iterations,
                residual: stall.residual,
                best: stall.best,
            }),
        }
    }

    /// Like [`Self::step`], but on every `period`-th call the cached
    /// pulse is superposed back onto the state (renormalizing the
    /// combination) before stepping, modeling a driven, periodically
    /// reseeded system.
    pub fn step_pulsed(&mut self, period: usize) -> Result<(), StepError> {
        StepError::check_period(period)?;
        self.pulsed_calls += 1;
        if self.pulsed_calls % period == 0 {
            self.wf.reinject();
        }
        self.step();
        Ok(())
    }

    /// Whether the total probability is still within
    /// [`CONSISTENCY_TOL`] of 1.
    ///
    /// Purely advisory; nothing in the engine acts on it.
    pub fn consistency_check(&self) -> bool {
        (self.wf.total_probability() - 1.0).abs() < CONSISTENCY_TOL
    }

    /// Probability density |ψᵢ|² per node, row-major in 2D.
    pub fn probability_density(&self) -> nd::Array1<f64> {
        self.wf.probability_density()
    }

    /// Real part of the amplitude per node, row-major in 2D.
    pub fn real_part(&self) -> nd::Array1<f64> {
        self.wf.real_part()
    }

    /// Simulation time accumulated over successful steps.
    pub fn elapsed_time(&self) -> f64 { self.wf.elapsed() }

    /// Node coordinates: the x axis on a line, the (x, y) axis pair on a
    /// plane.
    pub fn coordinates(&self) -> Coordinates {
        self.grid.coordinates()
    }

    /// Probability density over wavenumber, centered on k = 0, normalized
    /// so it sums to the same total as [`Self::probability_density`]
    /// (Parseval).
    pub fn momentum_density(&self) -> nd::Array1<f64> {
        let m = self.grid.nodes();
        match self.grid.domain() {
            Domain::One { .. } => {
                let mut q = self.wf.amplitudes().to_owned();
                fft_inplace(&mut q);
                let density = q.mapv(|qk| qk.norm_sqr() / m as f64);
                fft_shift(&density)
            }
            Domain::Two { .. } => {
                let mut plane = self.wf.amplitudes()
                    .to_owned()
                    .into_shape((m, m))
                    .unwrap();
                for mut row in plane.rows_mut() {
                    fft_inplace(&mut row);
                }
                let mut buf: nd::Array1<C64> = nd::Array1::zeros(m);
                for j in 0..m {
                    buf.assign(&plane.column(j));
                    fft_inplace(&mut buf);
                    plane.column_mut(j).assign(&buf);
                }
                let density
                    = plane.mapv(|qk| qk.norm_sqr() / (m * m) as f64);
                let mut shifted: nd::Array2<f64> = nd::Array2::zeros((m, m));
                for (i, row) in density.rows().into_iter().enumerate() {
                    shifted.row_mut(i).assign(&fft_shift(&row));
                }
                let mut out: nd::Array2<f64> = nd::Array2::zeros((m, m));
                for (j, col) in shifted.columns().into_iter().enumerate() {
                    out.column_mut(j).assign(&fft_shift(&col));
                }
                out.into_shape(m * m).unwrap()
            }
        }
    }

    /// Wavenumber coordinates accompanying [`Self::momentum_density`],
    /// ascending through k = 0.
    pub fn momentum_coordinates(&self) -> Coordinates {
        let m = self.grid.nodes();
        let k: nd::Array1<f64>
            = fft_shift(&fft_freq(m, self.grid.spacing()))
            .mapv(|f| TAU * f);
        match self.grid.domain() {
            Domain::One { .. } => Coordinates::One(k),
            Domain::Two { .. } => Coordinates::Two(k.clone(), k),
        }
    }

    /// Sorted eigenvalues of the densified Hamiltonian.
    ///
    /// Meant for spectral diagnostics on modest grids; the stepping path
    /// never goes through this.
    pub fn energy_spectrum(&self) -> Result<nd::Array1<f64>, LinalgError> {
        hamiltonian::spectrum(&self.hamiltonian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_line_config() -> SimConfig {
        SimConfig {
            dimension: 1,
            boundary: BoundaryMode::Free,
            npoints: 64,
            origin: [0.0, 0.0],
            extent: 10.0,
            dt: 1e-3,
        }
    }

    #[test]
    fn config_validation() {
        let v = PotentialField::line(|_| 0.0);
        let mut cfg = free_line_config();
        cfg.dimension = 3;
        assert!(matches!(
            Simulation::from_config(&cfg, &v),
            Err(BuildError::BadDimension(3)),
        ));
        let mut cfg = free_line_config();
        cfg.dt = 0.0;
        assert!(matches!(
            Simulation::from_config(&cfg, &v),
            Err(BuildError::BadTimeStep(_)),
        ));
        let cfg = free_line_config();
        assert!(matches!(
            Simulation::from_config(&cfg, &PotentialField::plane(|_, _| 0.0)),
            Err(BuildError::PotentialArity { expected: 1, got: 2 }),
        ));
    }

    #[test]
    fn seeded_step_keeps_consistency() {
        let cfg = free_line_config();
        let mut sim
            = Simulation::from_config(&cfg, &PotentialField::line(|_| 0.0))
            .unwrap();
        sim.add_pulse(&Pulse::plane(500.0, 2.0, 0.3)).unwrap();
        assert!(sim.consistency_check());
        sim.step();
        assert!(sim.consistency_check());
        assert!((sim.elapsed_time() - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn failed_iterative_step_leaves_state_alone() {
        let cfg = free_line_config();
        let mut sim
            = Simulation::from_config(&cfg, &PotentialField::line(|_| 0.0))
            .unwrap();
        sim.add_pulse(&Pulse::plane(500.0, 2.0, 0.3)).unwrap();
        let before = sim.psi().clone();
        let err = sim
            .step_iterative_with(Method::Cgs, 1e-30, 4)
            .unwrap_err();
        match err {
            StepError::NotConverged { best, residual, .. } => {
                assert_eq!(best.len(), before.len());
                assert!(residual.is_finite());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(sim.psi(), &before);
        assert_eq!(sim.elapsed_time(), 0.0);
    }

    #[test]
    fn pulsed_step_reinjects_periodically() {
        let cfg = free_line_config();
        let mut sim
            = Simulation::from_config(&cfg, &PotentialField::line(|_| 0.0))
            .unwrap();
        sim.add_pulse(&Pulse::plane(300.0, 2.0, 0.3)).unwrap();
        assert!(matches!(sim.step_pulsed(0), Err(StepError::BadPeriod)));
        for _ in 0..10 {
            sim.step_pulsed(3).unwrap();
            assert!(sim.consistency_check());
        }
        assert!((sim.elapsed_time() - 10.0 * 1e-3).abs() < 1e-12);
    }

    #[test]
    fn zero_origin_momentum_for_even_packet() {
        // a resting packet has a symmetric momentum distribution
        let g = Grid::line(-5.0, 128, 10.0, BoundaryMode::Free).unwrap();
        let mut sim
            = Simulation::new(g, &PotentialField::line(|_| 0.0), 1e-3)
            .unwrap();
        sim.add_pulse(&Pulse::Plane {
            energy: 100.0,
            center: 0.0,
            velocity: 0.0,
            width: 0.5,
        }).unwrap();
        let density = sim.momentum_density();
        let k = match sim.momentum_coordinates() {
            Coordinates::One(k) => k,
            _ => unreachable!(),
        };
        let total: f64 = density.sum();
        assert!((total - 1.0).abs() < 1e-9);
        let mean: f64 = k.iter().zip(&density).map(|(ki, di)| ki * di).sum();
        assert!(mean.abs() < 1e-6, "drifting rest packet: <k> = {mean:.3e}");
    }
}
