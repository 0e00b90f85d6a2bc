//! Simulation parameters and their validation.
//!
//! The parameter file is a flat `key = value` list (TOML syntax), e.g.
//!
//! ```text
//! nx = 200
//! Nx = 400
//! Ny = 1000
//! Delta = 0.01
//! k = 3.14159
//! w0 = 3.14159
//! Gamma = 1.0
//! init_cond = 1
//! save_chi = 1
//! save_psi = 0
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use crate::error::{FdtdError, Result};

/// Raw parameter set as read from the input file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Delay-arm length in grid units, `nx = 2a/Delta`.
    pub nx: usize,
    /// Spatial half-extent of the solved window; the window has `2Nx+1` columns.
    #[serde(rename = "Nx")]
    pub half_width: usize,
    /// Number of time rows.
    #[serde(rename = "Ny")]
    pub steps: usize,
    #[serde(rename = "Delta")]
    pub delta: f64,
    /// Incident wavenumber.
    pub k: f64,
    /// Emitter resonance.
    pub w0: f64,
    #[serde(rename = "Gamma")]
    pub gamma: f64,
    /// 1: two-photon plane wave, 2: single-photon exponential, 3: two-photon exponential.
    #[serde(default)]
    pub init_cond: u32,
    /// Envelope decay of the exponential wavepacket, in units of `Gamma`.
    #[serde(default)]
    pub alpha: Option<f64>,

    #[serde(default, deserialize_with = "flag")]
    pub save_chi: bool,
    #[serde(default, deserialize_with = "flag")]
    pub save_psi: bool,
    #[serde(default, deserialize_with = "flag")]
    pub save_psi_square_integral: bool,
    #[serde(default, deserialize_with = "flag")]
    pub save_psi_binary: bool,

    // two-photon exponential wavepacket
    #[serde(default = "default_true", deserialize_with = "flag")]
    pub identical_photons: bool,
    #[serde(default)]
    pub k1: Option<f64>,
    #[serde(default)]
    pub k2: Option<f64>,
    #[serde(default)]
    pub alpha1: Option<f64>,
    #[serde(default)]
    pub alpha2: Option<f64>,
    #[serde(default, rename = "A")]
    pub normalization: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// Accepts `0/1` as well as `true/false`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}

/// Photon pair shape for the two-photon exponential input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhotonPair {
    Identical {
        k: f64,
        alpha: f64,
    },
    Distinguishable {
        k1: f64,
        alpha1: f64,
        k2: f64,
        alpha2: f64,
        normalization: f64,
    },
}

/// Incident field selected by `init_cond`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputCondition {
    TwoPhotonPlaneWave,
    SinglePhotonExponential { alpha: f64 },
    TwoPhotonExponential(PhotonPair),
}

impl InputCondition {
    /// Numeric selector used in parameter files.
    pub fn id(&self) -> u32 {
        match self {
            InputCondition::TwoPhotonPlaneWave => 1,
            InputCondition::SinglePhotonExponential { .. } => 2,
            InputCondition::TwoPhotonExponential(_) => 3,
        }
    }

    /// Whether the recurrence receives the two-photon injection term.
    pub fn is_two_photon(&self) -> bool {
        matches!(
            self,
            InputCondition::TwoPhotonPlaneWave | InputCondition::TwoPhotonExponential(_)
        )
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            nx: 2,
            half_width: 1,
            steps: 1,
            delta: 0.1,
            k: 0.0,
            w0: 0.0,
            gamma: 1.0,
            init_cond: 1,
            alpha: None,
            save_chi: false,
            save_psi: true,
            save_psi_square_integral: false,
            save_psi_binary: false,
            identical_photons: true,
            k1: None,
            k2: None,
            alpha1: None,
            alpha2: None,
            normalization: None,
        }
    }
}

impl Parameters {
    /// Parse parameters from `key = value` text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load parameters from file.
    pub fn load(filepath: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(filepath)?;
        Self::parse(&text)
    }

    /// Decode `init_cond` and its shape parameters.
    pub fn input_condition(&self) -> Result<InputCondition> {
        match self.init_cond {
            1 => Ok(InputCondition::TwoPhotonPlaneWave),
            2 => {
                let alpha = self.alpha.ok_or(FdtdError::MissingParameter("alpha"))?;
                Ok(InputCondition::SinglePhotonExponential { alpha })
            }
            3 => {
                let pair = if self.identical_photons {
                    PhotonPair::Identical {
                        k: self.k,
                        alpha: self.alpha.ok_or(FdtdError::MissingParameter("alpha"))?,
                    }
                } else {
                    PhotonPair::Distinguishable {
                        k1: self.k1.ok_or(FdtdError::MissingParameter("k1"))?,
                        alpha1: self.alpha1.ok_or(FdtdError::MissingParameter("alpha1"))?,
                        k2: self.k2.ok_or(FdtdError::MissingParameter("k2"))?,
                        alpha2: self.alpha2.ok_or(FdtdError::MissingParameter("alpha2"))?,
                        normalization: self.normalization.ok_or(FdtdError::MissingParameter("A"))?,
                    }
                };
                Ok(InputCondition::TwoPhotonExponential(pair))
            }
            other => Err(FdtdError::config(format!(
                "init_cond has to be 1 or 2 (got {other})"
            ))),
        }
    }

    /// Check every grid invariant, stopping at the first violation.
    ///
    /// Runs before any array is allocated. Returns the decoded input
    /// condition, which is guaranteed to have closed-form seed strips.
    pub fn sanity_check(&self) -> Result<InputCondition> {
        if self.nx % 2 != 0 {
            return Err(FdtdError::config("nx must be an integer multiple of 2"));
        }
        if self.nx == 0 {
            return Err(FdtdError::config("nx must be positive"));
        }
        let window = self
            .half_width
            .checked_mul(2)
            .filter(|w| w.checked_add(self.nx).and_then(|n| n.checked_add(2)).is_some())
            .ok_or_else(|| FdtdError::config("Nx is too large: 2Nx+nx+2 columns overflow"))?;
        if self.nx > window {
            return Err(FdtdError::config(
                "nx must be smaller than, or at most equal to, twice of Nx (nx<=2Nx)",
            ));
        }
        if self.steps == 0 {
            return Err(FdtdError::config("Ny must be at least 1"));
        }
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(FdtdError::config("Delta must be a positive number"));
        }
        let nyquist = PI / self.delta;
        if self.k >= nyquist || self.w0 >= nyquist {
            return Err(FdtdError::config(
                "k or w0 must be smaller than pi/Delta in order not to reach the Nyquist limit",
            ));
        }
        if !self.save_chi && !self.save_psi {
            return Err(FdtdError::config("either save_chi or save_psi has to be 1"));
        }

        match self.input_condition()? {
            InputCondition::TwoPhotonExponential(_) => Err(FdtdError::config(
                "init_cond has to be 1 or 2 (no closed-form boundary strip for init_cond=3)",
            )),
            cond => Ok(cond),
        }
    }
}
