// =============================================================================
// Link Functions
// =============================================================================
//
// A link function g connects the mean μ to the linear predictor η:
//
//     η = g(μ)        μ = g⁻¹(η)
//
// IRLS needs three things from a link: the forward map, the inverse, and
// the derivative dη/dμ (used in the working weights and working response).
//
//   - IdentityLink: η = μ                 (Gaussian)
//   - LogLink:      η = log(μ)            (Poisson, counts)
//   - LogitLink:    η = log(μ / (1 - μ))  (Binomial)
//
// =============================================================================

use ndarray::Array1;

use crate::constants::{ETA_CLIP, MU_MAX_PROBABILITY, MU_MIN_POSITIVE, MU_MIN_PROBABILITY};

/// A GLM link function.
pub trait Link: Send + Sync {
    /// Short name, e.g. "log".
    fn name(&self) -> &str;

    /// η = g(μ)
    fn link(&self, mu: &Array1<f64>) -> Array1<f64>;

    /// μ = g⁻¹(η)
    fn inverse(&self, eta: &Array1<f64>) -> Array1<f64>;

    /// dη/dμ evaluated at μ
    fn derivative(&self, mu: &Array1<f64>) -> Array1<f64>;
}

/// η = μ
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLink;

impl Link for IdentityLink {
    fn name(&self) -> &str {
        "identity"
    }

    fn link(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.clone()
    }

    fn inverse(&self, eta: &Array1<f64>) -> Array1<f64> {
        eta.clone()
    }

    fn derivative(&self, mu: &Array1<f64>) -> Array1<f64> {
        Array1::ones(mu.len())
    }
}

/// η = log(μ). Keeps predictions positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLink;

impl Link for LogLink {
    fn name(&self) -> &str {
        "log"
    }

    fn link(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| m.max(MU_MIN_POSITIVE).ln())
    }

    fn inverse(&self, eta: &Array1<f64>) -> Array1<f64> {
        eta.mapv(|e| e.clamp(-ETA_CLIP, ETA_CLIP).exp())
    }

    fn derivative(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| 1.0 / m.max(MU_MIN_POSITIVE))
    }
}

/// η = log(μ / (1 - μ)). Maps probabilities to log-odds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogitLink;

impl Link for LogitLink {
    fn name(&self) -> &str {
        "logit"
    }

    fn link(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| {
            let p = m.clamp(MU_MIN_PROBABILITY, MU_MAX_PROBABILITY);
            (p / (1.0 - p)).ln()
        })
    }

    fn inverse(&self, eta: &Array1<f64>) -> Array1<f64> {
        eta.mapv(|e| 1.0 / (1.0 + (-e.clamp(-ETA_CLIP, ETA_CLIP)).exp()))
    }

    fn derivative(&self, mu: &Array1<f64>) -> Array1<f64> {
        mu.mapv(|m| {
            let p = m.clamp(MU_MIN_PROBABILITY, MU_MAX_PROBABILITY);
            1.0 / (p * (1.0 - p))
        })
    }
}
