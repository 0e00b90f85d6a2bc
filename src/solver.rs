//! Explicit update rule for the delay PDE and the sequential driver.
//!
//! Each interior cell `(t, x)` is obtained from causally earlier cells:
//!
//! * free propagation with decay from `(t-1, x-1)`, `(t-1, x)`, `(t, x-1)`;
//! * the emitter's retarded image `Gamma/2 * square(t-nx, x-nx)` once `t > nx`;
//! * two light-cone corrections for each mirror (`x = -a` and `x = +a`),
//!   sampled with `bar_average` at the reflected column;
//! * for two-photon inputs, the injection of `chi(x-t, -/+a-t, 0)`;
//!
//! and the sum is divided by the implicit prefactor `1/Delta + W/4`. A cell
//! exactly on a light cone gets half of the correction a cell inside it gets.

use num_complex::Complex64;
use tracing::info;

use crate::average::{bar_average, square_average, Amplitudes};
use crate::error::{FdtdError, Result};
use crate::grid::{Geometry, Grid, Physics};
use crate::two_photon::two_photon_input;

/// Weight of a cell on a light-cone boundary (a step function at its jump).
pub const ON_LIGHT_CONE: f64 = 0.5;

/// Weight of a cell strictly inside a light cone.
pub const INSIDE_LIGHT_CONE: f64 = 1.0;

/// Light-cone weight of `(t, x)` for the cone emanating from column `mirror`:
/// zero unless `x > mirror` and `t - x >= -mirror`.
#[inline]
pub fn light_cone_weight(t: usize, x: usize, mirror: usize) -> f64 {
    let (t, x, mirror) = (t as isize, x as isize, mirror as isize);
    if x <= mirror || t - x < -mirror {
        0.0
    } else if t - x == -mirror {
        ON_LIGHT_CONE
    } else {
        INSIDE_LIGHT_CONE
    }
}

/// Constants of the update rule, computed once per run.
#[derive(Clone, Copy, Debug)]
pub struct Recurrence {
    geometry: Geometry,
    physics: Physics,
    /// `W = i w0 + Gamma/2`.
    w: Complex64,
    /// Weight of `psi[t-1][x-1]`: `1/Delta - W/4`.
    diagonal_weight: Complex64,
    /// Weight of `psi[t-1][x]` and `psi[t][x-1]`: `W/4`.
    neighbour_weight: Complex64,
    /// `1/Delta + W/4`.
    prefactor: Complex64,
    half_gamma: f64,
    sqrt_gamma: f64,
}

impl Recurrence {
    pub fn new(geometry: Geometry, physics: Physics) -> Self {
        let w = physics.decay_rate();
        let inv_delta = 1.0 / geometry.delta;
        Self {
            geometry,
            physics,
            w,
            diagonal_weight: inv_delta - 0.25 * w,
            neighbour_weight: 0.25 * w,
            prefactor: inv_delta + 0.25 * w,
            half_gamma: 0.5 * physics.gamma,
            sqrt_gamma: physics.gamma.sqrt(),
        }
    }

    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(*grid.geometry(), *grid.physics())
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn decay_rate(&self) -> Complex64 {
        self.w
    }

    /// Cells left untouched at zero: immediately right of the second light
    /// cone, and right of the first one while `t < nx`. The stencil straddles
    /// the discontinuity there.
    #[inline]
    pub fn is_skipped(&self, t: usize, x: usize) -> bool {
        let g = &self.geometry;
        (t < g.nx && x == t + g.minus_a_index + 1) || x == t + g.plus_a_index + 1
    }

    /// New value of `(t, x)`, or `None` for a skipped cell.
    ///
    /// Requires `t >= 1` and `x` inside the solved window, and every cell the
    /// stencil reads to hold its final value.
    pub fn advance<A: Amplitudes + ?Sized>(&self, field: &A, t: usize, x: usize) -> Result<Option<Complex64>> {
        if self.is_skipped(t, x) {
            return Ok(None);
        }
        let nx = self.geometry.nx;

        let mut value = self.diagonal_weight * field.amplitude(t - 1, x - 1)
            - self.neighbour_weight * (field.amplitude(t - 1, x) + field.amplitude(t, x - 1));

        if t > nx {
            value += self.half_gamma
                * square_average(field, (t - nx) as isize, (x - nx) as isize)?;
        }

        value += self.light_cone_terms(field, t, x)?;
        value += self.injection(t, x)?;
        value /= self.prefactor;

        if !value.is_finite() {
            return Err(FdtdError::NonFinite {
                op: "recurrence",
                t,
                x,
            });
        }
        Ok(Some(value))
    }

    /// Mirror-image corrections of the left (`x = -a`) and right (`x = +a`)
    /// light cones, including their `Gamma/2` coupling.
    pub fn light_cone_terms<A: Amplitudes + ?Sized>(&self, field: &A, t: usize, x: usize) -> Result<Complex64> {
        let g = &self.geometry;
        let (ti, xi) = (t as isize, x as isize);
        let origin = g.origin_index as isize;
        let half_delay = (g.nx / 2) as isize;
        let reflected = 2 * origin - xi + 1;
        let mut correction = Complex64::new(0.0, 0.0);

        let left = light_cone_weight(t, x, g.minus_a_index);
        if left > 0.0 {
            let tl = ti - (xi - origin) - half_delay;
            correction -= bar_average(field, tl, reflected - g.nx as isize)? * left;
            correction += bar_average(field, tl, reflected)? * left;
        }

        let right = light_cone_weight(t, x, g.plus_a_index);
        if right > 0.0 {
            let tr = ti - (xi - origin) + half_delay;
            correction -= bar_average(field, tr, reflected + g.nx as isize)? * right;
            correction += bar_average(field, tr, reflected)? * right;
        }

        Ok(self.half_gamma * correction)
    }

    /// Two-photon injection `sqrt(Gamma) [chi(x-t, -a-t) - chi(x-t, a-t) theta(t - 2a)]`,
    /// nonzero once `t - x - a >= 0`. Sampled half a cell up, at the centre of
    /// the stencil square.
    pub fn injection(&self, t: usize, x: usize) -> Result<Complex64> {
        let g = &self.geometry;
        if !self.physics.input.is_two_photon() || t + g.minus_a_index < x {
            return Ok(Complex64::new(0.0, 0.0));
        }
        let weight = if t + g.minus_a_index == x {
            ON_LIGHT_CONE
        } else {
            INSIDE_LIGHT_CONE
        };

        let x1 = (g.coordinate(x) - t as isize) as f64;
        let half_delay = 0.5 * g.nx as f64;
        let t = t as f64;

        let mut chi = two_photon_input(g, &self.physics, x1, -half_delay - t + 0.5)?;
        if t > g.nx as f64 {
            chi -= two_photon_input(g, &self.physics, x1, half_delay - t + 0.5)?;
        }
        Ok(self.sqrt_gamma * weight * chi)
    }
}

impl Grid {
    /// Fill the solved window row by row on the calling thread.
    pub fn solve_sequential(&mut self) -> Result<()> {
        let recurrence = Recurrence::for_grid(self);
        let geometry = *self.geometry();
        info!("simulation starts (sequential, {} rows)", geometry.ny);

        for t in 1..geometry.ny {
            for x in geometry.window() {
                if let Some(value) = recurrence.advance(&*self, t, x)? {
                    self.set(t, x, value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameters;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    struct ColumnField {
        width: usize,
    }

    impl Amplitudes for ColumnField {
        fn width(&self) -> usize {
            self.width
        }

        fn amplitude(&self, _t: usize, x: usize) -> Complex64 {
            Complex64::new(x as f64, 0.0)
        }
    }

    fn scenario() -> Parameters {
        Parameters {
            nx: 2,
            half_width: 5,
            steps: 5,
            delta: 0.1,
            k: 0.0,
            w0: 0.0,
            gamma: 1.0,
            init_cond: 1,
            save_psi: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_light_cone_weight() {
        // mirror at column 7
        assert_eq!(light_cone_weight(5, 7, 7), 0.0);
        assert_eq!(light_cone_weight(0, 8, 7), 0.0);
        assert_eq!(light_cone_weight(1, 8, 7), ON_LIGHT_CONE);
        assert_eq!(light_cone_weight(2, 8, 7), INSIDE_LIGHT_CONE);
        assert_eq!(light_cone_weight(3, 11, 7), 0.0);
    }

    #[test]
    fn test_on_cone_gets_half_correction() {
        let geometry = Geometry::new(4, 8, 10, 0.1);
        let physics = Physics {
            k: 0.0,
            w0: 0.0,
            gamma: 2.0,
            input: crate::params::InputCondition::SinglePhotonExponential { alpha: 1.0 },
        };
        let rec = Recurrence::new(geometry, physics);
        let field = ColumnField { width: geometry.ntotal };
        let t = 2;

        // on the left cone: t - x == -minus_a; one column left is strictly inside
        let on = rec.light_cone_terms(&field, t, t + geometry.minus_a_index).unwrap();
        let inside = rec.light_cone_terms(&field, t, t + geometry.minus_a_index - 1).unwrap();

        // with psi = column index the two bars differ by nx, for any cell
        assert_relative_eq!(inside.re, 0.5 * physics.gamma * geometry.nx as f64, epsilon = 1e-12);
        assert_relative_eq!(on.re, 0.5 * inside.re, epsilon = 1e-12);
    }

    #[test]
    fn test_right_cone_gets_half_correction() {
        let geometry = Geometry::new(2, 8, 10, 0.1);
        let physics = Physics {
            k: 0.0,
            w0: 0.0,
            gamma: 1.0,
            input: crate::params::InputCondition::SinglePhotonExponential { alpha: 1.0 },
        };
        let rec = Recurrence::new(geometry, physics);
        let field = ColumnField { width: geometry.ntotal };
        let t = 3;
        let on_right = t + geometry.plus_a_index;
        let inside_right = on_right - 1;

        // right of t + minus_a, so the left cone does not reach either cell
        assert_eq!(light_cone_weight(t, inside_right, geometry.minus_a_index), 0.0);

        let on = rec.light_cone_terms(&field, t, on_right).unwrap();
        let inside = rec.light_cone_terms(&field, t, inside_right).unwrap();

        // right cone bars differ by -nx
        assert_relative_eq!(inside.re, -0.5 * physics.gamma * geometry.nx as f64, epsilon = 1e-12);
        assert_relative_eq!(on.re, 0.5 * inside.re, epsilon = 1e-12);
    }

    #[test]
    fn test_injection_half_weight_on_cone() {
        let geometry = Geometry::new(2, 5, 5, 0.1);
        let physics = Physics {
            k: 0.0,
            w0: 0.0,
            gamma: 4.0,
            input: crate::params::InputCondition::TwoPhotonPlaneWave,
        };
        let rec = Recurrence::new(geometry, physics);

        // k = 0: chi = 1, so the injection is sqrt(Gamma) * weight for t <= nx
        let inside = rec.injection(1, 3).unwrap();
        let on = rec.injection(1, 1 + geometry.minus_a_index).unwrap();
        let outside = rec.injection(1, 2 + geometry.minus_a_index).unwrap();
        assert_relative_eq!(inside.re, 2.0, epsilon = 1e-14);
        assert_relative_eq!(on.re, 1.0, epsilon = 1e-14);
        assert_eq!(outside, Complex64::new(0.0, 0.0));

        // after one delay the second photon term cancels the first at k = 0
        assert_eq!(rec.injection(3, 3).unwrap(), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_skipped_cells() {
        let geometry = Geometry::new(2, 5, 5, 0.1);
        let physics = Physics {
            k: 0.0,
            w0: 0.0,
            gamma: 1.0,
            input: crate::params::InputCondition::TwoPhotonPlaneWave,
        };
        let rec = Recurrence::new(geometry, physics);
        assert!(rec.is_skipped(1, 9));
        assert!(rec.is_skipped(1, 11));
        assert!(!rec.is_skipped(2, 10));
        assert!(rec.is_skipped(2, 12));
    }

    #[test]
    fn test_hand_derived_cells() {
        let mut grid = Grid::new(scenario()).unwrap();
        grid.solve_sequential().unwrap();

        // boundary before the first round trip: b = 2 (1 - e^{-Gamma t / 2}), real
        let b = 2.0 * (1.0 - (-0.05f64).exp());
        assert_relative_eq!(grid.get(1, 2).re, b, epsilon = 1e-14);

        // (1, 3): -W/4 * b from the boundary, +1 from the injection, / (1/Delta + W/4)
        let c13 = (1.0 - 0.125 * b) / 10.125;
        assert_relative_eq!(grid.get(1, 3).re, c13, epsilon = 1e-12);
        assert_relative_eq!(grid.get(1, 3).im, 0.0, epsilon = 1e-12);

        // (1, 4): the left neighbour is now (1, 3)
        let c14 = (1.0 - 0.125 * c13) / 10.125;
        assert_relative_eq!(grid.get(1, 4).re, c14, epsilon = 1e-12);

        // skipped cells stay zero
        assert_eq!(grid.get(1, 9), Complex64::new(0.0, 0.0));
        assert_eq!(grid.get(1, 11), Complex64::new(0.0, 0.0));
        assert_eq!(grid.get(3, 13), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_zero_coupling_is_free_propagation() {
        let p = Parameters {
            nx: 4,
            half_width: 6,
            steps: 9,
            delta: 0.05,
            k: 1.0,
            w0: 0.0,
            gamma: 0.0,
            init_cond: 2,
            alpha: Some(1.0),
            ..Default::default()
        };
        let mut grid = Grid::allocate(p).unwrap();
        let g = *grid.geometry();

        // seed along characteristics: psi(t, x) = f(x - t), zero on the two
        // diagonals that hold skipped cells
        let f = |d: isize| -> Complex64 {
            let d_skip_left = (g.minus_a_index + 1) as isize;
            let d_skip_right = (g.plus_a_index + 1) as isize;
            if d == d_skip_left || d == d_skip_right {
                Complex64::new(0.0, 0.0)
            } else {
                Complex64::new((0.3 * d as f64).cos(), (0.7 * d as f64).sin())
            }
        };
        for t in 0..g.ny {
            for x in 0..=g.nx {
                grid.set(t, x, f(x as isize - t as isize));
            }
        }
        for x in g.window() {
            grid.set(0, x, f(x as isize));
        }

        grid.solve_sequential().unwrap();

        let expected = Array2::from_shape_fn((g.ny, g.ntotal), |(t, x)| f(x as isize - t as isize));
        for ((t, x), value) in grid.psi().indexed_iter() {
            assert!(
                (value - expected[[t, x]]).norm() < 1e-12,
                "({}, {}): {} vs {}",
                t,
                x,
                value,
                expected[[t, x]]
            );
        }
    }

    #[test]
    fn test_infinite_neighbour_is_reported_at_cell() {
        let mut grid = Grid::new(scenario()).unwrap();
        let first = grid.geometry().window().start;
        // boundary cell on the diagonal of the first window cell
        grid.set(0, first - 1, Complex64::new(f64::INFINITY, 0.0));

        let rec = Recurrence::for_grid(&grid);
        match rec.advance(&grid, 1, first) {
            Err(FdtdError::NonFinite { op, t, x }) => {
                assert_eq!(op, "recurrence");
                assert_eq!((t, x), (1, first));
            }
            other => panic!("expected NonFinite, got {:?}", other),
        }

        assert!(matches!(
            grid.solve_sequential(),
            Err(FdtdError::NonFinite { op: "recurrence", t: 1, x }) if x == first
        ));
    }
}
