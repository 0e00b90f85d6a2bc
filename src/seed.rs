//! Closed-form seed strips: `psi(x, 0)` on the solved window and `psi(x, t)`
//! left of the emitter, where only the incident field and the emitter's
//! delayed re-emission series contribute.
//!
//! Both boundary generators sum a series with one term per completed delay
//! round trip (`n <= t / td`). Terms shrink quickly, so the sum is cut at the
//! first term below machine precision relative to the partial sum, or at the
//! first non-finite term. A non-finite final value means the series diverged
//! and is reported as a numerical fault.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;
use tracing::info;

use crate::error::{FdtdError, Result};
use crate::grid::{zeroed, Geometry, Physics};
use crate::params::InputCondition;
use crate::special::{ln_factorial, lower_incomplete_gamma};

/// Exponential single-photon wavepacket with a sharp wavefront at `x = -a`.
///
/// `x` is in grid units relative to the origin; the packet vanishes for
/// `x > -nx/2` and decays as `exp(alpha Gamma (x + nx/2) Delta / 2)` behind the
/// front.
pub fn one_photon_exponential(geometry: &Geometry, gamma: f64, x: f64, k: f64, alpha: f64) -> Complex64 {
    let front = 0.5 * geometry.nx as f64;
    if x > -front {
        return Complex64::new(0.0, 0.0);
    }

    let a_g = alpha * gamma;
    let exponent = Complex64::new(0.5 * a_g * (x + front), k * x) * geometry.delta;
    Complex64::new(0.0, a_g.sqrt()) * exponent.exp()
}

/// Initial condition on the solved window, indexed `0..=2Nx` (coordinate `i - Nx`).
pub fn initial_strip(geometry: &Geometry, physics: &Physics) -> Result<Array1<Complex64>> {
    let size = 2 * geometry.half_width + 1;
    let mut psit0 = Array1::from_vec(zeroed("initial_condition", size)?);

    if let InputCondition::SinglePhotonExponential { alpha } = physics.input {
        for (i, cell) in psit0.iter_mut().enumerate() {
            let x = i as f64 - geometry.half_width as f64;
            *cell = one_photon_exponential(geometry, physics.gamma, x, physics.k, alpha);
        }
    }

    Ok(psit0)
}

/// Boundary condition on columns `0..=nx` for every time row.
pub fn boundary_strip(geometry: &Geometry, physics: &Physics) -> Result<Array2<Complex64>> {
    let rows = geometry.ny;
    let cols = geometry.nx + 1;
    let cells = rows.checked_mul(cols).ok_or(FdtdError::Allocation {
        op: "boundary_condition",
        cells: usize::MAX,
    })?;
    let mut psix0 = Array2::from_shape_vec((rows, cols), zeroed("boundary_condition", cells)?)?;

    let report_every = (rows / 10).max(1);
    for j in 0..rows {
        for i in 0..cols {
            psix0[[j, i]] = match physics.input {
                InputCondition::TwoPhotonPlaneWave => plane_wave_boundary(geometry, physics, j, i)?,
                InputCondition::SinglePhotonExponential { alpha } => {
                    exponential_boundary(geometry, physics, alpha, j, i)?
                }
                InputCondition::TwoPhotonExponential(_) => {
                    return Err(FdtdError::UnsupportedInput {
                        op: "boundary_condition",
                        init_cond: physics.input.id(),
                    })
                }
            };
        }

        if j % report_every == 0 {
            info!("boundary_condition: {}% prepared", 100 * j / rows);
        }
    }

    Ok(psix0)
}

/// Adds `term` to `sum` unless it is negligible or non-finite; returns false
/// when the series should stop.
#[inline]
fn accumulate(sum: &mut Complex64, term: Complex64) -> bool {
    if !term.is_finite() || term.norm() < f64::EPSILON * sum.norm() {
        return false;
    }
    *sum += term;
    true
}

fn finite_or_fault(op: &'static str, value: Complex64, j: usize, i: usize) -> Result<Complex64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FdtdError::NonFinite { op, t: j, x: i })
    }
}

/// `psi[j][i]` left of the emitter for an incident plane wave.
///
/// `psi(x, t) = sqrt(2) e^{ik(x-t)} e(t)` with `e(t)` the emitter amplitude
/// including every completed delay round trip.
pub fn plane_wave_boundary(geometry: &Geometry, physics: &Physics, j: usize, i: usize) -> Result<Complex64> {
    let x = geometry.coordinate(i) as f64 * geometry.delta;
    let t = j as f64 * geometry.delta;
    let td = geometry.nx as f64 * geometry.delta;
    let Physics { k, w0, gamma, .. } = *physics;
    let i_unit = Complex64::i();
    let p = Complex64::new(k - w0, 0.5 * gamma);
    let half_gamma = 0.5 * gamma;
    let delay_phase = (-0.5 * i_unit * k * td).exp();

    let mut e_t = i_unit * half_gamma.sqrt() * delay_phase
        * ((-i_unit * k * t).exp() - Complex64::new(-half_gamma * t, -w0 * t).exp())
        / p;

    let ln_i = Complex64::new(0.0, FRAC_PI_2);
    let ln_p = p.ln();
    let mut sum = Complex64::new(0.0, 0.0);
    for n in 1..=(j / geometry.nx) {
        let nf = n as f64;
        let tau = t - nf * td;

        let decay = (nf * tau.ln()
            + nf * Complex64::new(half_gamma * td, w0 * td)
            + Complex64::new(-half_gamma * t, -w0 * t)
            - ln_factorial(n))
        .exp();
        let drive = (k - w0)
            * lower_incomplete_gamma(nf + 1.0, -i_unit * p * tau)
            * (nf * ln_i + i_unit * nf * k * td - i_unit * k * t - (nf + 1.0) * ln_p).exp();
        let term = half_gamma.powf(nf - 0.5) * (decay + drive);

        if !accumulate(&mut sum, term) {
            break;
        }
    }
    e_t -= delay_phase * sum;
    e_t *= 2f64.sqrt() * (i_unit * k * (x - t)).exp();

    finite_or_fault("plane_wave_BC", e_t, j, i)
}

/// `psi[j][i]` left of the emitter for a single-photon exponential wavepacket:
/// the packet shifted to the retarded coordinate times the emitter series.
pub fn exponential_boundary(
    geometry: &Geometry,
    physics: &Physics,
    alpha: f64,
    j: usize,
    i: usize,
) -> Result<Complex64> {
    let t = j as f64 * geometry.delta;
    let td = geometry.nx as f64 * geometry.delta;
    let w = physics.decay_rate();
    let ratio = 0.5 * physics.gamma * (w * td).exp();

    let mut sum = Complex64::new(0.0, 0.0);
    for n in 1..=(j / geometry.nx) {
        let term = (ratio * (t - n as f64 * td)).powi(n as i32) * (-ln_factorial(n)).exp();
        if !accumulate(&mut sum, term) {
            break;
        }
    }

    let retarded = (geometry.coordinate(i) - j as isize) as f64;
    let e_t = (-w * t).exp()
        * (1.0 + sum)
        * one_photon_exponential(geometry, physics.gamma, retarded, physics.k, alpha);

    finite_or_fault("exponential_BC", e_t, j, i)
}
