//! Space-time grid holding the wavefunction `psi(x, t)`.
//!
//! Column layout (array index `i`, grid-unit coordinate `i - origin`):
//!
//! ```text
//!   i = 0 ........... nx | nx+1 ...... minus_a ...... origin ...... plus_a ...... Ntotal-1
//!   x = -(Nx+nx+1) .. -(Nx+1) | -Nx ... -nx/2 ........... 0 ......... +nx/2 ......... Nx
//!       <-- boundary strip --> <------------------- solved window ------------------->
//! ```
//!
//! Row 0 of the solved window is the initial strip; columns `0..=nx` of every
//! row are the boundary strip. The emitter sits at `x = -a` (`minus_a`), its
//! mirror image at `x = +a` (`plus_a`), which is why `nx` has to be even.

use ndarray::{s, Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::info;

use crate::average::Amplitudes;
use crate::error::{FdtdError, Result};
use crate::params::{InputCondition, Parameters};
use crate::seed;

/// Grid dimensions and derived indices. Fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Delay length in grid units (`2a / Delta`).
    pub nx: usize,
    /// Half-extent of the solved window (`Nx`).
    pub half_width: usize,
    /// Total columns, `2Nx + nx + 2`.
    pub ntotal: usize,
    /// Total time rows.
    pub ny: usize,
    pub delta: f64,
    pub lx: f64,
    pub ly: f64,
    pub plus_a_index: usize,
    pub minus_a_index: usize,
    pub origin_index: usize,
}

impl Geometry {
    /// Derive the column layout. The sizes must already have passed
    /// [`Parameters::sanity_check`], which rules out overflow.
    pub fn new(nx: usize, half_width: usize, ny: usize, delta: f64) -> Self {
        Self {
            nx,
            half_width,
            ntotal: 2 * half_width + nx + 2,
            ny,
            delta,
            lx: 2.0 * half_width as f64 * delta,
            ly: ny.saturating_sub(1) as f64 * delta,
            plus_a_index: half_width + 3 * nx / 2 + 1,
            minus_a_index: half_width + nx / 2 + 1,
            origin_index: half_width + nx + 1,
        }
    }

    /// Columns advanced by the recurrence.
    #[inline]
    pub fn window(&self) -> Range<usize> {
        self.nx + 1..self.ntotal
    }

    /// Grid-unit coordinate of column `x` relative to the origin.
    #[inline]
    pub fn coordinate(&self, x: usize) -> isize {
        x as isize - self.origin_index as isize
    }

    /// Number of cells in `psi`, `None` on overflow.
    pub fn cells(&self) -> Option<usize> {
        self.ny.checked_mul(self.ntotal)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nx = {}, Nx = {}, Ntotal = {}, Ny = {}, Delta = {:.3}, Lx = {:.3}, Ly = {:.3}",
            self.nx, self.half_width, self.ntotal, self.ny, self.delta, self.lx, self.ly
        )
    }
}

/// Physical constants of the emitter and the incident field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Physics {
    pub k: f64,
    pub w0: f64,
    pub gamma: f64,
    pub input: InputCondition,
}

impl Physics {
    /// Complex decay/drive rate `W = i w0 + Gamma/2`.
    #[inline]
    pub fn decay_rate(&self) -> Complex64 {
        Complex64::new(0.5 * self.gamma, self.w0)
    }
}

/// Owner of the wavefunction and its seed strips.
pub struct Grid {
    geometry: Geometry,
    physics: Physics,
    parameters: Parameters,
    /// Initial condition `psi(x, 0)` on the solved window.
    psit0: Array1<Complex64>,
    /// Boundary condition on the first `nx+1` columns, `psix0[t][x]`.
    psix0: Array2<Complex64>,
    psi: Array2<Complex64>,
}

impl Grid {
    /// Validate, allocate and seed a grid.
    pub fn new(parameters: Parameters) -> Result<Self> {
        let mut grid = Self::allocate(parameters)?;
        grid.seed()?;
        Ok(grid)
    }

    /// Validate and allocate a zero-filled grid without computing the strips.
    pub fn allocate(parameters: Parameters) -> Result<Self> {
        let input = parameters.sanity_check()?;

        let geometry = Geometry::new(
            parameters.nx,
            parameters.half_width,
            parameters.steps,
            parameters.delta,
        );
        let physics = Physics {
            k: parameters.k,
            w0: parameters.w0,
            gamma: parameters.gamma,
            input,
        };

        let cells = geometry.cells().ok_or(FdtdError::Allocation {
            op: "initialize_psi",
            cells: usize::MAX,
        })?;
        let psi = Array2::from_shape_vec(
            (geometry.ny, geometry.ntotal),
            zeroed("initialize_psi", cells)?,
        )?;

        Ok(Self {
            geometry,
            physics,
            parameters,
            psit0: Array1::zeros(0),
            psix0: Array2::zeros((0, 0)),
            psi,
        })
    }

    /// Compute the initial and boundary strips and copy them into `psi`.
    pub fn seed(&mut self) -> Result<()> {
        info!("preparing the grid: {}", self.geometry);
        self.psit0 = seed::initial_strip(&self.geometry, &self.physics)?;
        self.psix0 = seed::boundary_strip(&self.geometry, &self.physics)?;
        self.initialize_psi();
        Ok(())
    }

    fn initialize_psi(&mut self) {
        let nx = self.geometry.nx;
        self.psi.slice_mut(s![.., ..=nx]).assign(&self.psix0);
        self.psi.slice_mut(s![0, nx + 1..]).assign(&self.psit0);
    }

    /// Free the seed strips once they have been copied into `psi`.
    pub fn release_strips(&mut self) {
        self.psit0 = Array1::zeros(0);
        self.psix0 = Array2::zeros((0, 0));
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn psi(&self) -> &Array2<Complex64> {
        &self.psi
    }

    pub fn psi_mut(&mut self) -> &mut Array2<Complex64> {
        &mut self.psi
    }

    pub fn psit0(&self) -> &Array1<Complex64> {
        &self.psit0
    }

    pub fn psix0(&self) -> &Array2<Complex64> {
        &self.psix0
    }

    #[inline]
    pub fn get(&self, t: usize, x: usize) -> Complex64 {
        self.psi[[t, x]]
    }

    #[inline]
    pub fn set(&mut self, t: usize, x: usize, value: Complex64) {
        self.psi[[t, x]] = value;
    }
}

impl Amplitudes for Grid {
    #[inline]
    fn width(&self) -> usize {
        self.geometry.ntotal
    }

    #[inline]
    fn amplitude(&self, t: usize, x: usize) -> Complex64 {
        self.psi[[t, x]]
    }
}

/// Zero-filled buffer whose allocation failure is reported instead of aborting.
pub(crate) fn zeroed(op: &'static str, cells: usize) -> Result<Vec<Complex64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(cells)
        .map_err(|_| FdtdError::Allocation { op, cells })?;
    buf.resize(cells, Complex64::new(0.0, 0.0));
    Ok(buf)
}
