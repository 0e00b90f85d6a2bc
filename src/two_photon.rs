//! Two-photon input correlation `chi(x1, x2, 0)`.

use num_complex::Complex64;
use std::f64::consts::SQRT_2;

use crate::error::{FdtdError, Result};
use crate::grid::{Geometry, Physics};
use crate::params::{InputCondition, PhotonPair};
use crate::seed::one_photon_exponential;

/// Evaluate `chi(x1, x2, 0)`.
///
/// `x1` and `x2` are unit-less coordinates relative to the origin (the true
/// position is `x * Delta`); half-integer values are expected, the recurrence
/// samples at the centre of a grid square.
pub fn two_photon_input(geometry: &Geometry, physics: &Physics, x1: f64, x2: f64) -> Result<Complex64> {
    let gamma = physics.gamma;
    match physics.input {
        InputCondition::TwoPhotonPlaneWave => {
            Ok(Complex64::new(0.0, physics.k * (x1 + x2) * geometry.delta).exp())
        }
        InputCondition::TwoPhotonExponential(PhotonPair::Identical { k, alpha }) => {
            Ok(one_photon_exponential(geometry, gamma, x1, k, alpha)
                * one_photon_exponential(geometry, gamma, x2, k, alpha))
        }
        InputCondition::TwoPhotonExponential(PhotonPair::Distinguishable {
            k1,
            alpha1,
            k2,
            alpha2,
            normalization,
        }) => {
            let phi1 = |x| one_photon_exponential(geometry, gamma, x, k1, alpha1);
            let phi2 = |x| one_photon_exponential(geometry, gamma, x, k2, alpha2);
            Ok(normalization / SQRT_2 * (phi1(x1) * phi2(x2) + phi1(x2) * phi2(x1)))
        }
        InputCondition::SinglePhotonExponential { .. } => Err(FdtdError::UnsupportedInput {
            op: "two_photon_input",
            init_cond: physics.input.id(),
        }),
    }
}
