//! Delay-feedback waveguide QED solver
//!
//! Explicit finite-difference time-domain integration of the 1+1D delay PDE
//! for a photon wavepacket scattering off a two-level emitter that sees its
//! own mirror image across a fixed delay. The grid is seeded from closed-form
//! initial and boundary strips and advanced cell by cell, either sequentially
//! or as a staggered wavefront over a worker pool.

pub mod average;
pub mod error;
pub mod export;
pub mod grid;
pub mod params;
pub mod seed;
pub mod solver;
pub mod special;
pub mod two_photon;
pub mod wavefront;

pub use average::{bar_average, square_average, Amplitudes};
pub use error::{FdtdError, Result};
pub use export::{Component, RunSummary};
pub use grid::{Geometry, Grid, Physics};
pub use params::{InputCondition, Parameters, PhotonPair};
pub use solver::Recurrence;
pub use two_photon::two_photon_input;
pub use wavefront::WavefrontSchedule;
