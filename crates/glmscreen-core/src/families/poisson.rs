// Poisson family for count data: V(μ) = μ, μ > 0.

use ndarray::Array1;
use statrs::function::gamma::ln_gamma;

use super::Family;
use crate::constants::MU_MIN_POSITIVE;

#[derive(Debug, Clone, Copy, Default)]
pub struct PoissonFamily;

impl Family for PoissonFamily {
    fn name(&self) -> &str {
        "Poisson"
    }

    fn variance(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.clone()
    }

    /// d(y, μ) = 2 [y log(y/μ) - (y - μ)], with y log(y/μ) = 0 when y = 0.
    fn unit_deviance(&self, y: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64> {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mui)| {
                let m = mui.max(MU_MIN_POSITIVE);
                let term = if yi > 0.0 { yi * (yi / m).ln() } else { 0.0 };
                2.0 * (term - (yi - m))
            })
            .collect()
    }

    fn log_likelihood(&self, y: &Array1<f64>, mu: &Array1<f64>, _scale: f64) -> f64 {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mui)| {
                let m = mui.max(MU_MIN_POSITIVE);
                yi * m.ln() - m - ln_gamma(yi + 1.0)
            })
            .sum()
    }

    fn initialize_mu(&self, y: &Array1<f64>) -> Array1<f64> {
        let mean = y.mean().unwrap_or(1.0).max(0.1);
        y.mapv(|yi| (yi + mean) / 2.0)
    }

    fn is_valid_mu(&self, mu: &Array1<f64>) -> bool {
        mu.iter().all(|&m| m.is_finite() && m > 0.0)
    }

    fn clamp_mu(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| m.max(MU_MIN_POSITIVE))
    }

    fn is_valid_response(&self, y: &Array1<f64>) -> bool {
        y.iter().all(|&v| v.is_finite() && v >= 0.0)
    }
}
