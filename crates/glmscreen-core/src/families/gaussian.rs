// Gaussian family: V(μ) = 1, unit deviance (y - μ)².

use ndarray::Array1;
use std::f64::consts::PI;

use super::Family;

#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianFamily;

impl Family for GaussianFamily {
    fn name(&self) -> &str {
        "Gaussian"
    }

    fn variance(&self, mu: &Array1<f64>) -> Array1<f64> {
        Array1::ones(mu.len())
    }

    fn unit_deviance(&self, y: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64> {
        y.iter().zip(mu.iter()).map(|(&yi, &mi)| (yi - mi).powi(2)).collect()
    }

    /// Normal log-likelihood with variance `scale`.
    fn log_likelihood(&self, y: &Array1<f64>, mu: &Array1<f64>, scale: f64) -> f64 {
        let n = y.len() as f64;
        let rss: f64 = self.unit_deviance(y, mu).sum();
        -0.5 * n * (2.0 * PI * scale).ln() - rss / (2.0 * scale)
    }

    fn initialize_mu(&self, y: &Array1<f64>) -> Array1<f64> {
        y.clone()
    }

    fn is_valid_mu(&self, mu: &Array1<f64>) -> bool {
        mu.iter().all(|m| m.is_finite())
    }

    fn clamp_mu(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.clone()
    }

    fn has_free_dispersion(&self) -> bool {
        true
    }
}
