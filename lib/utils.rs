//! Miscellaneous tools.

use std::ops::Mul;
use ndarray::{ self as nd, Ix1, concatenate };
use num_complex::Complex64 as C64;
use rustfft as fft;
use crate::Arr1;

/// Euclidean norm of an amplitude vector.
pub fn vec_norm<S>(q: &nd::ArrayBase<S, Ix1>) -> f64
where S: nd::Data<Elem = C64>
{
    q.iter().map(|qk| qk.norm_sqr()).sum::<f64>().sqrt()
}

/// Total probability carried by an amplitude vector, Σ|ψᵢ|².
pub fn total_probability<S>(q: &nd::ArrayBase<S, Ix1>) -> f64
where S: nd::Data<Elem = C64>
{
    q.iter().map(|qk| qk.norm_sqr()).sum()
}

/// Rescale a vector to unit Euclidean norm in place.
///
/// An all-zero vector is left untouched.
pub fn renormalize<S>(q: &mut nd::ArrayBase<S, Ix1>)
where S: nd::DataMut<Elem = C64>
{
    let norm = vec_norm(q);
    if norm > 0.0 {
        q.map_inplace(|qk| { *qk /= norm; });
    }
}

/// Kronecker product of two dense vectors.
pub fn kron<S, T, A>(a: &Arr1<S>, b: &Arr1<T>) -> nd::Array1<A>
where
    S: nd::Data<Elem = A>,
    T: nd::Data<Elem = A>,
    A: Mul<Output = A> + Copy,
{
    let mut out: Vec<A> = Vec::with_capacity(a.len() * b.len());
    for &ak in a {
        for &bk in b {
            out.push(ak * bk);
        }
    }
    nd::Array1::from_vec(out)
}

/// Generate an array of frequency-space coordinates to accompany a FFT of
/// `n` points for sampling interval `d`.
pub fn fft_freq(n: usize, d: f64) -> nd::Array1<f64> {
    if n % 2 == 0 {
        let fp: nd::Array1<f64>
            = (0..n / 2)
            .map(|k| k as f64 / (n as f64 * d))
            .collect();
        let fm: nd::Array1<f64>
            = (1..n / 2 + 1).rev()
            .map(|k| -(k as f64) / (n as f64 * d))
            .collect();
        concatenate!(nd::Axis(0), fp, fm)
    } else {
        let fp: nd::Array1<f64>
            = (0..(n + 1) / 2)
            .map(|k| k as f64 / (n as f64 * d))
            .collect();
        let fm: nd::Array1<f64>
            = (1..(n + 1) / 2).rev()
            .map(|k| -(k as f64) / (n as f64 * d))
            .collect();
        concatenate!(nd::Axis(0), fp, fm)
    }
}

/// Perform the one-dimensional, complex-valued FFT in place.
pub fn fft_inplace<S>(f: &mut nd::ArrayBase<S, Ix1>)
where S: nd::DataMut<Elem = C64>
{
    let n: usize = f.len();
    let mut plan = fft::FftPlanner::new();
    let fft_plan = plan.plan_fft_forward(n);
    fft_plan.process(f.as_slice_mut().unwrap());
}

/// Return a copy of `x` with indices shifted to map super-Nyquist
/// frequency components to negative frequencies.
pub fn fft_shift<S, A>(x: &nd::ArrayBase<S, Ix1>) -> nd::Array1<A>
where
    S: nd::Data<Elem = A>,
    A: Clone,
{
    let n = x.len();
    let (p, m)
        = if n % 2 == 0 {
            x.view().split_at(nd::Axis(0), n / 2)
        } else {
            x.view().split_at(nd::Axis(0), n / 2 + 1)
        };
    concatenate!(nd::Axis(0), m.into_owned(), p.into_owned())
}
