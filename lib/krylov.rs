//! Iterative Krylov solvers for the per-step linear system.
//!
//! The Crank–Nicolson step is a solve against the fixed implicit operator
//! `A = I + iHΔt/2`. The exact banded solve is cheap but scales with the
//! band; these methods trade exactness for matrix-vector products and are
//! warm-started from the current state, which is already close to the
//! solution for small Δt.
//!
//! Provided variants:
//! - [`Method::Cgs`]: conjugate-gradient-squared (Sonneveld)
//! - [`Method::BiCgStab`]: stabilized biconjugate gradients
//!   (van der Vorst)
//! - [`Method::Gmres`]: restarted GMRES with Givens-rotation least
//!   squares
//! - [`Method::Lgmres`]: GMRES augmented with the previous restart
//!   corrections (Baker, Jessup & Manteuffel)
//! - [`Method::Qmr`]: the transpose-free quasi-minimal-residual variant
//!   (Freund)
//!
//! All of them touch the operator only through [`CsMat::dot`], converge
//! on `‖r‖ ≤ ε·‖b‖`, and on failure hand back the best approximation
//! they reached together with the true residual at that point.

use std::collections::VecDeque;
use std::fmt;
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use crate::{ sparse::CsMat, utils::vec_norm };

pub(crate) const GMRES_RESTART: usize = 30;
pub(crate) const LGMRES_AUGMENT: usize = 3;

/// Selects the iterative method used for a step solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Cgs,
    BiCgStab,
    Gmres,
    Lgmres,
    Qmr,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cgs => write!(f, "cgs"),
            Self::BiCgStab => write!(f, "bicgstab"),
            Self::Gmres => write!(f, "gmres"),
            Self::Lgmres => write!(f, "lgmres"),
            Self::Qmr => write!(f, "qmr"),
        }
    }
}

/// Best effort left behind by a solver that missed its residual target.
#[derive(Clone, Debug)]
pub struct Stalled {
    /// Closest approximate solution reached.
    pub best: nd::Array1<C64>,
    /// True residual norm `‖b − A·best‖`.
    pub residual: f64,
    /// Matrix-vector products spent.
    pub iterations: usize,
}

pub type KrylovResult = Result<nd::Array1<C64>, Stalled>;

impl Method {
    /// Solve `A·x = b` starting from `x0`.
    ///
    /// Stops when the residual norm falls below `epsilon · ‖b‖` or after
    /// roughly `maxiters` matrix-vector products, whichever comes first.
    pub fn solve(
        self,
        a: &CsMat<C64>,
        b: &nd::Array1<C64>,
        x0: &nd::Array1<C64>,
        epsilon: f64,
        maxiters: usize,
    ) -> KrylovResult {
        let tol = epsilon * vec_norm(b).max(f64::MIN_POSITIVE);
        match self {
            Self::Cgs => cgs(a, b, x0, tol, maxiters),
            Self::BiCgStab => bicgstab(a, b, x0, tol, maxiters),
            Self::Gmres => gmres_like(a, b, x0, tol, maxiters, 0),
            Self::Lgmres => gmres_like(a, b, x0, tol, maxiters, LGMRES_AUGMENT),
            Self::Qmr => tfqmr(a, b, x0, tol, maxiters),
        }
    }
}

fn cdot(a: &nd::Array1<C64>, b: &nd::Array1<C64>) -> C64 {
    a.iter().zip(b).map(|(ak, bk)| ak.conj() * bk).sum()
}

// y ← y + c·x
fn axpy(y: &mut nd::Array1<C64>, c: C64, x: &nd::Array1<C64>) {
    nd::Zip::from(y).and(x).for_each(|yk, xk| { *yk += c * xk; });
}

// failure report with the true residual of the best point reached
fn stalled(
    a: &CsMat<C64>,
    b: &nd::Array1<C64>,
    best: nd::Array1<C64>,
    iterations: usize,
) -> Stalled {
    let residual = vec_norm(&(b - &a.dot(&best)));
    Stalled { best, residual, iterations }
}

// conjugate-gradient-squared (Sonneveld 1989)
fn cgs(
    a: &CsMat<C64>,
    b: &nd::Array1<C64>,
    x0: &nd::Array1<C64>,
    tol: f64,
    maxiters: usize,
) -> KrylovResult {
    let mut x = x0.to_owned();
    let mut r = b - &a.dot(&x);
    let mut iters = 1;
    if vec_norm(&r) <= tol {
        return Ok(x);
    }
    let rt = r.clone();
    let mut rho_prev = C64::one();
    let mut p: nd::Array1<C64> = nd::Array1::zeros(r.len());
    let mut q: nd::Array1<C64> = nd::Array1::zeros(r.len());
    let mut first = true;
    while iters < maxiters {
        let rho = cdot(&rt, &r);
        if rho.norm() == 0.0 {
            break;
        }
        let u: nd::Array1<C64>;
        if first {
            u = r.clone();
            p = u.clone();
            first = false;
        } else {
            let beta = rho / rho_prev;
            u = &r + &(&q * beta);
            p = &u + &((&q + &(&p * beta)) * beta);
        }
        let vhat = a.dot(&p);
        iters += 1;
        let sigma = cdot(&rt, &vhat);
        if sigma.norm() == 0.0 {
            break;
        }
        let alpha = rho / sigma;
        q = &u - &(&vhat * alpha);
        let uq = &u + &q;
        let qhat = a.dot(&uq);
        iters += 1;
        axpy(&mut x, alpha, &uq);
        axpy(&mut r, -alpha, &qhat);
        rho_prev = rho;
        if vec_norm(&r) <= tol {
            return Ok(x);
        }
    }
    Err(stalled(a, b, x, iters))
}

// stabilized biconjugate gradients (van der Vorst 1992)
fn bicgstab(
    a: &CsMat<C64>,
    b: &nd::Array1<C64>,
    x0: &nd::Array1<C64>,
    tol: f64,
    maxiters: usize,
) -> KrylovResult {
    let mut x = x0.to_owned();
    let mut r = b - &a.dot(&x);
    let mut iters = 1;
    if vec_norm(&r) <= tol {
        return Ok(x);
    }
    let rt = r.clone();
    let mut rho_prev = C64::one();
    let mut alpha = C64::one();
    let mut omega = C64::one();
    let mut v: nd::Array1<C64> = nd::Array1::zeros(r.len());
    let mut p: nd::Array1<C64> = nd::Array1::zeros(r.len());
    let mut first = true;
    while iters < maxiters {
        let rho = cdot(&rt, &r);
        if rho.norm() == 0.0 || (!first && omega.norm() == 0.0) {
            break;
        }
        if first {
            p = r.clone();
            first = false;
        } else {
            let beta = (rho / rho_prev) * (alpha / omega);
            p = &r + &((&p - &(&v * omega)) * beta);
        }
        v = a.dot(&p);
        iters += 1;
        let denom = cdot(&rt, &v);
        if denom.norm() == 0.0 {
            break;
        }
        alpha = rho / denom;
        let s = &r - &(&v * alpha);
        if vec_norm(&s) <= tol {
            axpy(&mut x, alpha, &p);
            return Ok(x);
        }
        let t = a.dot(&s);
        iters += 1;
        let tt = cdot(&t, &t);
        if tt.norm() == 0.0 {
            break;
        }
        omega = cdot(&t, &s) / tt;
        axpy(&mut x, alpha, &p);
        axpy(&mut x, omega, &s);
        r = &s - &(&t * omega);
        rho_prev = rho;
        if vec_norm(&r) <= tol {
            return Ok(x);
        }
    }
    Err(stalled(a, b, x, iters))
}

// complex Givens rotation zeroing g against f; returns (c, s) with c real
fn givens(f: C64, g: C64) -> (f64, C64) {
    if g.norm() == 0.0 {
        (1.0, C64::zero())
    } else if f.norm() == 0.0 {
        (0.0, g.conj() / g.norm())
    } else {
        let d = (f.norm_sqr() + g.norm_sqr()).sqrt();
        (f.norm() / d, (f / f.norm()) * (g.conj() / d))
    }
}

// apply [c, s; -s*, c] to the pair (f, g)
fn rotate(c: f64, s: C64, f: C64, g: C64) -> (C64, C64) {
    (f * c + s * g, g * c - s.conj() * f)
}

// One flexible-Arnoldi cycle: the first `inner` expansion directions come
// from the orthonormal basis itself (plain GMRES); any further directions
// are the fixed augmentation vectors. Returns the correction, the
// estimated residual norm, and the matrix-vector products spent.
fn fgmres_cycle(
    a: &CsMat<C64>,
    r0: &nd::Array1<C64>,
    inner: usize,
    aug: &[nd::Array1<C64>],
    tol: f64,
    budget: usize,
) -> (nd::Array1<C64>, f64, usize) {
    let n = r0.len();
    let beta = vec_norm(r0);
    let total = (inner + aug.len()).min(budget);
    let mut vs: Vec<nd::Array1<C64>> = vec![r0.mapv(|rk| rk / beta)];
    let mut zs: Vec<nd::Array1<C64>> = Vec::with_capacity(total);
    let mut cols: Vec<Vec<C64>> = Vec::with_capacity(total);
    let mut rots: Vec<(f64, C64)> = Vec::with_capacity(total);
    let mut g: Vec<C64> = vec![C64::from(beta)];
    let mut est = beta;
    let mut matvecs = 0;
    for j in 0..total {
        let z = if j < inner { vs[j].clone() } else { aug[j - inner].clone() };
        let mut w = a.dot(&z);
        matvecs += 1;
        let scale = vec_norm(&w);
        let mut col: Vec<C64> = Vec::with_capacity(j + 2);
        for vi in vs.iter() {
            let hij = cdot(vi, &w);
            nd::Zip::from(&mut w).and(vi)
                .for_each(|wk, vk| { *wk -= hij * vk; });
            col.push(hij);
        }
        let hnext = vec_norm(&w);
        col.push(C64::from(hnext));
        for (t, &(c, s)) in rots.iter().enumerate() {
            let (ft, gt) = rotate(c, s, col[t], col[t + 1]);
            col[t] = ft;
            col[t + 1] = gt;
        }
        let (c, s) = givens(col[j], col[j + 1]);
        let (diag, _) = rotate(c, s, col[j], col[j + 1]);
        col[j] = diag;
        col[j + 1] = C64::zero();
        rots.push((c, s));
        let (gj, gnext) = rotate(c, s, g[j], C64::zero());
        g[j] = gj;
        g.push(gnext);
        est = gnext.norm();
        zs.push(z);
        cols.push(col);
        // a vanishing next basis vector means the subspace is invariant
        let exhausted = hnext <= 1e-14 * scale.max(f64::MIN_POSITIVE);
        if exhausted || est <= tol {
            break;
        }
        vs.push(w.mapv(|wk| wk / hnext));
    }
    // back-substitute the triangularized least-squares system
    let k = zs.len();
    let mut y: Vec<C64> = vec![C64::zero(); k];
    for i in (0..k).rev() {
        let mut acc = g[i];
        for j in (i + 1)..k {
            acc -= cols[j][i] * y[j];
        }
        let rii = cols[i][i];
        y[i] = if rii.norm() == 0.0 { C64::zero() } else { acc / rii };
    }
    let mut dx: nd::Array1<C64> = nd::Array1::zeros(n);
    for (yj, zj) in y.iter().zip(&zs) {
        axpy(&mut dx, *yj, zj);
    }
    (dx, est, matvecs)
}

// restarted GMRES (Saad & Schultz 1986); with `augment > 0`, each
// restart's correction is recycled into the next cycle's expansion set
// (LGMRES)
fn gmres_like(
    a: &CsMat<C64>,
    b: &nd::Array1<C64>,
    x0: &nd::Array1<C64>,
    tol: f64,
    maxiters: usize,
    augment: usize,
) -> KrylovResult {
    let mut x = x0.to_owned();
    let mut aug: VecDeque<nd::Array1<C64>> = VecDeque::new();
    let mut iters = 0;
    loop {
        let r = b - &a.dot(&x);
        iters += 1;
        let rnorm = vec_norm(&r);
        if rnorm <= tol {
            return Ok(x);
        }
        if iters >= maxiters {
            return Err(Stalled { best: x, residual: rnorm, iterations: iters });
        }
        let inner = GMRES_RESTART.saturating_sub(aug.len()).max(1);
        let (dx, _, used) = fgmres_cycle(
            a, &r, inner, aug.make_contiguous(), tol, maxiters - iters,
        );
        iters += used;
        if vec_norm(&dx) == 0.0 {
            return Err(Stalled { best: x, residual: rnorm, iterations: iters });
        }
        if augment > 0 {
            aug.push_front(dx.clone());
            aug.truncate(augment);
        }
        x += &dx;
    }
}

// transpose-free QMR (Freund 1993)
fn tfqmr(
    a: &CsMat<C64>,
    b: &nd::Array1<C64>,
    x0: &nd::Array1<C64>,
    tol: f64,
    maxiters: usize,
) -> KrylovResult {
    let mut x = x0.to_owned();
    let r0 = b - &a.dot(&x);
    let mut iters = 1;
    if vec_norm(&r0) <= tol {
        return Ok(x);
    }
    let rt = r0.clone();
    let mut w = r0.clone();
    let mut y1 = r0.clone();
    let mut u1 = a.dot(&y1);
    iters += 1;
    let mut v = u1.clone();
    let mut d: nd::Array1<C64> = nd::Array1::zeros(r0.len());
    let mut tau = vec_norm(&r0);
    let mut theta: f64 = 0.0;
    let mut eta = C64::zero();
    let mut rho = cdot(&rt, &r0);
    let mut halfsteps: usize = 0;
    while iters < maxiters {
        let sigma = cdot(&rt, &v);
        if sigma.norm() == 0.0 || rho.norm() == 0.0 {
            break;
        }
        let alpha = rho / sigma;
        let y2 = &y1 - &(&v * alpha);
        let u2 = a.dot(&y2);
        iters += 1;
        for half in 0..2 {
            let (y, u) = if half == 0 { (&y1, &u1) } else { (&y2, &u2) };
            axpy(&mut w, -alpha, u);
            let shrink = theta.powi(2) * eta / alpha;
            d = y + &(&d * shrink);
            theta = vec_norm(&w) / tau;
            let c = (1.0 + theta.powi(2)).sqrt().recip();
            tau *= theta * c;
            eta = alpha * c.powi(2);
            axpy(&mut x, eta, &d);
            halfsteps += 1;
            // quasi-minimal residual bound; confirm with the true
            // residual before declaring victory
            if tau * ((halfsteps + 1) as f64).sqrt() <= tol {
                let true_res = vec_norm(&(b - &a.dot(&x)));
                iters += 1;
                if true_res <= tol {
                    return Ok(x);
                }
            }
        }
        let rho_next = cdot(&rt, &w);
        let beta = rho_next / rho;
        rho = rho_next;
        y1 = &w + &(&y2 * beta);
        u1 = a.dot(&y1);
        iters += 1;
        v = &u1 + &((&u2 + &(&v * beta)) * beta);
    }
    Err(stalled(a, b, x, iters))
}
