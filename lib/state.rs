//! Ownership of the evolving complex amplitude vector and its derived
//! observables.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::utils::{ renormalize, total_probability };

/// The wavefunction of one simulation run: the dense amplitude vector ψ,
/// the most recently built wave packet (kept for periodic re-injection),
/// and the elapsed simulation time.
///
/// Amplitudes start at zero and are only ever touched by pulse deposits
/// and step results; the clock only ever advances with a successful step.
#[derive(Clone, Debug)]
pub struct WaveFunction {
    psi: nd::Array1<C64>,
    pulse: nd::Array1<C64>,
    t: f64,
}

impl WaveFunction {
    pub(crate) fn zero(n: usize) -> Self {
        Self {
            psi: nd::Array1::zeros(n),
            pulse: nd::Array1::zeros(n),
            t: 0.0,
        }
    }

    /// The raw amplitude vector, row-major over the grid.
    pub fn amplitudes(&self) -> &nd::Array1<C64> { &self.psi }

    /// The cached packet from the last pulse deposit.
    pub fn pulse(&self) -> &nd::Array1<C64> { &self.pulse }

    /// Simulation time accumulated over successful steps.
    pub fn elapsed(&self) -> f64 { self.t }

    /// Probability density |ψᵢ|² per grid node.
    pub fn probability_density(&self) -> nd::Array1<f64> {
        self.psi.mapv(|qk| qk.norm_sqr())
    }

    /// Real part of the amplitude per grid node.
    pub fn real_part(&self) -> nd::Array1<f64> {
        self.psi.mapv(|qk| qk.re)
    }

    /// Total probability Σ|ψᵢ|².
    pub fn total_probability(&self) -> f64 {
        total_probability(&self.psi)
    }

    /// Rescale ψ back to unit Euclidean norm, e.g. after superposing
    /// several packets.
    pub fn renormalize(&mut self) {
        renormalize(&mut self.psi);
    }

    // superpose a freshly built packet and cache it for re-injection
    pub(crate) fn deposit(&mut self, packet: nd::Array1<C64>) {
        self.psi += &packet;
        self.pulse = packet;
    }

    // superpose the cached packet and renormalize the combined state
    pub(crate) fn reinject(&mut self) {
        self.psi += &self.pulse;
        self.renormalize();
    }

    // install a step result and advance the clock
    pub(crate) fn advance(&mut self, psi: nd::Array1<C64>, dt: f64) {
        self.psi = psi;
        self.t += dt;
    }
}
