//! Reliability factors and goodness of fit
//!
//! All functions return `None` when the denominator vanishes or the inputs
//! differ in length.

use ndarray::Array1;

fn same_length(a: &Array1<f64>, b: &Array1<f64>) -> bool {
    a.len() == b.len() && !a.is_empty()
}

/// R = Σ|obs - calc| / Σ|obs|
pub fn r_factor(obs: &Array1<f64>, calc: &Array1<f64>) -> Option<f64> {
    if !same_length(obs, calc) {
        return None;
    }
    let numerator = (obs - calc).mapv(f64::abs).sum();
    let denominator = obs.mapv(f64::abs).sum();
    (denominator != 0.0).then(|| numerator / denominator)
}

/// R² = sqrt(Σ(obs - calc)² / Σobs²)
pub fn r_factor_squared(obs: &Array1<f64>, calc: &Array1<f64>) -> Option<f64> {
    if !same_length(obs, calc) {
        return None;
    }
    let numerator = (obs - calc).mapv(|d| d * d).sum();
    let denominator = obs.mapv(|o| o * o).sum();
    (denominator != 0.0).then(|| (numerator / denominator).sqrt())
}

/// wR = sqrt(Σw(obs - calc)² / Σw·obs²) with w = 1/su²
///
/// Non-positive uncertainties count as 1.
pub fn weighted_r_factor(obs: &Array1<f64>, calc: &Array1<f64>, su: &Array1<f64>) -> Option<f64> {
    if !same_length(obs, calc) || su.len() != obs.len() {
        return None;
    }
    let w = su.mapv(|s| if s > 0.0 { 1.0 / (s * s) } else { 1.0 });
    let numerator = (&w * &(obs - calc).mapv(|d| d * d)).sum();
    let denominator = (&w * &obs.mapv(|o| o * o)).sum();
    (denominator != 0.0).then(|| (numerator / denominator).sqrt())
}

/// χ²ᵣ = Σr² / (N_points - N_free), absent without degrees of freedom
pub fn reduced_chi_square(residuals: &[f64], n_free: usize) -> Option<f64> {
    let dof = residuals.len() as i64 - n_free as i64;
    (dof > 0).then(|| residuals.iter().map(|r| r * r).sum::<f64>() / dof as f64)
}
