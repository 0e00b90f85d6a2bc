//! Special functions needed by the closed-form seed strips.

use num_complex::Complex64;
use statrs::function::gamma::ln_gamma;

/// Iteration cap for the incomplete gamma power series.
const MAX_SERIES_TERMS: usize = 10_000;

/// `ln(n!)`.
#[inline]
pub fn ln_factorial(n: usize) -> f64 {
    ln_gamma(n as f64 + 1.0)
}

/// Lower incomplete gamma function `γ(s, z) = ∫_0^z u^(s-1) e^(-u) du` for real
/// `s > 0` and complex `z`.
///
/// Uses the power series `z^s e^(-z) Σ z^k / (s (s+1) ... (s+k))`, switching to
/// the finite closed form for integer `s` once `|z|` is large enough that the
/// series would need many terms.
pub fn lower_incomplete_gamma(s: f64, z: Complex64) -> Complex64 {
    if z == Complex64::new(0.0, 0.0) {
        return Complex64::new(0.0, 0.0);
    }

    let integral_s = s.fract() == 0.0 && s >= 1.0;
    if integral_s && z.norm() > s + 30.0 {
        return integer_lower_incomplete_gamma(s as usize, z);
    }

    let mut term = Complex64::new(1.0 / s, 0.0);
    let mut sum = term;
    for k in 1..MAX_SERIES_TERMS {
        term = term * z / (s + k as f64);
        sum += term;
        if term.norm() < f64::EPSILON * sum.norm() {
            break;
        }
    }

    (s * z.ln() - z).exp() * sum
}

/// `γ(n, z) = (n-1)! (1 - e^(-z) Σ_{k<n} z^k / k!)`.
fn integer_lower_incomplete_gamma(n: usize, z: Complex64) -> Complex64 {
    let mut term = Complex64::new(1.0, 0.0);
    let mut partial = term;
    for k in 1..n {
        term = term * z / k as f64;
        partial += term;
    }
    let factorial = ln_factorial(n - 1).exp();
    factorial * (1.0 - (-z).exp() * partial)
}
