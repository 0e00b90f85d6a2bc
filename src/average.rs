//! First-order interpolation of `psi` at half-integer offsets.
//!
//! The delay and mirror terms of the recurrence land between grid points; these
//! averages evaluate them at the centre of a unit square or a unit bar. Indices
//! are signed because retarded time indices routinely fall below zero, where
//! the field vanishes.

use num_complex::Complex64;

use crate::error::{FdtdError, Result};

/// Read access to a time-major complex field.
pub trait Amplitudes {
    /// Number of columns.
    fn width(&self) -> usize;

    /// Value at time row `t`, column `x`.
    fn amplitude(&self, t: usize, x: usize) -> Complex64;
}

#[inline]
fn check_column<A: Amplitudes + ?Sized>(op: &'static str, field: &A, x: isize) -> Result<usize> {
    let max = field.width() - 1;
    if x < 1 {
        return Err(FdtdError::OutOfBounds { op, x, max, side: "left" });
    }
    if x as usize > max {
        return Err(FdtdError::OutOfBounds { op, x, max, side: "right" });
    }
    Ok(x as usize)
}

/// Mean of the four points of the unit square whose upper-right corner is `(t, x)`.
///
/// Zero for `t < 1`: nothing exists before the initial row.
pub fn square_average<A: Amplitudes + ?Sized>(field: &A, t: isize, x: isize) -> Result<Complex64> {
    let x = check_column("square_average", field, x)?;
    if t < 1 {
        return Ok(Complex64::new(0.0, 0.0));
    }
    let t = t as usize;

    let square = field.amplitude(t - 1, x - 1)
        + field.amplitude(t - 1, x)
        + field.amplitude(t, x - 1)
        + field.amplitude(t, x);
    Ok(square / 4.0)
}

/// Mean of the two points of the unit bar whose right end is `(t, x)`.
///
/// Zero for `t < 0`.
pub fn bar_average<A: Amplitudes + ?Sized>(field: &A, t: isize, x: isize) -> Result<Complex64> {
    let x = check_column("bar_average", field, x)?;
    if t < 0 {
        return Ok(Complex64::new(0.0, 0.0));
    }
    let t = t as usize;

    Ok((field.amplitude(t, x) + field.amplitude(t, x - 1)) / 2.0)
}
