// Binomial family for 0/1 (or proportion) responses: V(μ) = μ(1 - μ).

use ndarray::Array1;

use super::Family;
use crate::constants::{MU_MAX_PROBABILITY, MU_MIN_PROBABILITY};

#[derive(Debug, Clone, Copy, Default)]
pub struct BinomialFamily;

fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

impl Family for BinomialFamily {
    fn name(&self) -> &str {
        "Binomial"
    }

    fn variance(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| {
            let p = m.clamp(MU_MIN_PROBABILITY, MU_MAX_PROBABILITY);
            p * (1.0 - p)
        })
    }

    fn unit_deviance(&self, y: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64> {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mi)| {
                let p = mi.clamp(MU_MIN_PROBABILITY, MU_MAX_PROBABILITY);
                2.0 * (xlogy(yi, yi / p) + xlogy(1.0 - yi, (1.0 - yi) / (1.0 - p)))
            })
            .collect()
    }

    fn log_likelihood(&self, y: &Array1<f64>, mu: &Array1<f64>, _scale: f64) -> f64 {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mi)| {
                let p = mi.clamp(MU_MIN_PROBABILITY, MU_MAX_PROBABILITY);
                yi * p.ln() + (1.0 - yi) * (1.0 - p).ln()
            })
            .sum()
    }

    fn initialize_mu(&self, y: &Array1<f64>) -> Array1<f64> {
        y.mapv(|yi| (yi + 0.5) / 2.0)
    }

    fn is_valid_mu(&self, mu: &Array1<f64>) -> bool {
        mu.iter().all(|&m| m > 0.0 && m < 1.0)
    }

    fn clamp_mu(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| m.clamp(MU_MIN_PROBABILITY, MU_MAX_PROBABILITY))
    }

    fn is_valid_response(&self, y: &Array1<f64>) -> bool {
        y.iter().all(|&v| (0.0..=1.0).contains(&v))
    }
}
