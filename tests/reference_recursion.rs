//! End-to-end comparison against a direct, index-for-index transcription of the
//! update rule on nested vectors.

use num_complex::Complex64;
use waveguide_fdtd::{Geometry, Grid, Parameters};

type Field = Vec<Vec<Complex64>>;

fn zero() -> Complex64 {
    Complex64::new(0.0, 0.0)
}

fn square(psi: &Field, j: i64, i: i64) -> Complex64 {
    assert!(i >= 1 && (i as usize) < psi[0].len(), "square at column {}", i);
    if j < 1 {
        return zero();
    }
    let (j, i) = (j as usize, i as usize);
    (psi[j - 1][i - 1] + psi[j - 1][i] + psi[j][i - 1] + psi[j][i]) / 4.0
}

fn bar(psi: &Field, j: i64, i: i64) -> Complex64 {
    assert!(i >= 1 && (i as usize) < psi[0].len(), "bar at column {}", i);
    if j < 0 {
        return zero();
    }
    let (j, i) = (j as usize, i as usize);
    (psi[j][i] + psi[j][i - 1]) / 2.0
}

/// Plane-wave pair `exp(i k (x1 + x2) Delta)`.
fn chi(k: f64, delta: f64, x1: f64, x2: f64) -> Complex64 {
    Complex64::new(0.0, k * (x1 + x2) * delta).exp()
}

struct Physics {
    k: f64,
    w0: f64,
    gamma: f64,
    two_photon: bool,
}

fn reference(seeded: &Grid, p: &Physics) -> Field {
    let g: Geometry = *seeded.geometry();
    let mut psi: Field = seeded.psi().rows().into_iter().map(|r| r.to_vec()).collect();

    let nx = g.nx as i64;
    let minus_a = g.minus_a_index as i64;
    let plus_a = g.plus_a_index as i64;
    let origin = g.origin_index as i64;
    let w = Complex64::new(0.5 * p.gamma, p.w0);
    let delta = g.delta;

    for j in 1..g.ny as i64 {
        for i in (nx + 1)..g.ntotal as i64 {
            if (j < nx && i == j + minus_a + 1) || i == j + plus_a + 1 {
                continue;
            }
            let (ju, iu) = (j as usize, i as usize);

            let mut v = (1.0 / delta - 0.25 * w) * psi[ju - 1][iu - 1] - 0.25 * w * (psi[ju - 1][iu] + psi[ju][iu - 1]);

            if j > nx {
                v += 0.5 * p.gamma * square(&psi, j - nx, i - nx);
            }

            if i > minus_a && j - i >= -minus_a {
                let c = if j - i == -minus_a { 0.5 } else { 1.0 };
                let tl = j - (i - origin) - nx / 2;
                v -= 0.5 * p.gamma * bar(&psi, tl, 2 * origin - i - nx + 1) * c;
                v += 0.5 * p.gamma * bar(&psi, tl, 2 * origin - i + 1) * c;
            }

            if i > plus_a && j - i >= -plus_a {
                let c = if j - i == -plus_a { 0.5 } else { 1.0 };
                let tr = j - (i - origin) + nx / 2;
                v -= 0.5 * p.gamma * bar(&psi, tr, 2 * origin - i + nx + 1) * c;
                v += 0.5 * p.gamma * bar(&psi, tr, 2 * origin - i + 1) * c;
            }

            if p.two_photon && j - i >= -minus_a {
                let c = if j - i == -minus_a { 0.5 } else { 1.0 };
                let x1 = ((i - origin) - j) as f64;
                v += p.gamma.sqrt() * c * chi(p.k, delta, x1, (-nx / 2 - j) as f64 + 0.5);
                if j > nx {
                    v -= p.gamma.sqrt() * c * chi(p.k, delta, x1, (nx / 2 - j) as f64 + 0.5);
                }
            }

            psi[ju][iu] = v / (1.0 / delta + 0.25 * w);
        }
    }
    psi
}

fn max_deviation(grid: &Grid, expected: &Field) -> f64 {
    grid.psi()
        .indexed_iter()
        .map(|((t, x), v)| (v - expected[t][x]).norm())
        .fold(0.0, f64::max)
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
fn test_small_plane_wave_scenario() {
    let params = scenario();
    let physics = Physics {
        k: 0.0,
        w0: 0.0,
        gamma: 1.0,
        two_photon: true,
    };

    let mut grid = Grid::new(params).unwrap();
    let expected = reference(&grid, &physics);
    grid.solve_sequential().unwrap();

    assert_eq!(grid.geometry().ntotal, 14);
    assert!(max_deviation(&grid, &expected) < 1e-5);

    // skipped cells stay zero
    let g = *grid.geometry();
    for t in 1..g.ny {
        let x = t + g.plus_a_index + 1;
        if x < g.ntotal {
            assert_eq!(grid.get(t, x), Complex64::new(0.0, 0.0));
        }
    }
    assert_eq!(grid.get(1, 1 + g.minus_a_index + 1), Complex64::new(0.0, 0.0));
}

#[test]
fn test_detuned_plane_wave_long_run() {
    let params = Parameters {
        nx: 4,
        half_width: 8,
        steps: 40,
        delta: 0.05,
        k: 1.2,
        w0: 0.7,
        gamma: 0.8,
        ..scenario()
    };
    let physics = Physics {
        k: 1.2,
        w0: 0.7,
        gamma: 0.8,
        two_photon: true,
    };

    let mut grid = Grid::new(params).unwrap();
    let expected = reference(&grid, &physics);
    grid.solve_sequential().unwrap();

    assert!(max_deviation(&grid, &expected) < 1e-10);
}

#[test]
fn test_single_photon_exponential() {
    let params = Parameters {
        nx: 6,
        half_width: 10,
        steps: 30,
        delta: 0.1,
        k: 0.5,
        w0: 0.5,
        gamma: 1.0,
        init_cond: 2,
        alpha: Some(1.5),
        ..scenario()
    };
    let physics = Physics {
        k: 0.5,
        w0: 0.5,
        gamma: 1.0,
        two_photon: false,
    };

    let mut grid = Grid::new(params).unwrap();
    assert!(grid.psit0().iter().any(|z| z.norm() > 0.0));
    let expected = reference(&grid, &physics);
    grid.solve_sequential().unwrap();

    assert!(max_deviation(&grid, &expected) < 1e-10);
}

#[test]
fn test_wavefront_against_reference() {
    let params = Parameters {
        nx: 2,
        half_width: 12,
        steps: 50,
        delta: 0.05,
        k: 0.3,
        w0: 0.0,
        gamma: 1.0,
        ..scenario()
    };
    let physics = Physics {
        k: 0.3,
        w0: 0.0,
        gamma: 1.0,
        two_photon: true,
    };

    let mut grid = Grid::new(params).unwrap();
    let expected = reference(&grid, &physics);
    grid.solve_wavefront(4).unwrap();

    assert!(max_deviation(&grid, &expected) < 1e-10);
}
