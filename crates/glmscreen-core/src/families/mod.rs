// =============================================================================
// Distribution Families
// =============================================================================
//
// A family describes the distribution of the response given its mean μ.
// IRLS only needs a handful of things from it:
//
//   - variance(μ):        V(μ), the variance function
//   - unit_deviance(y,μ): per-observation contribution to the deviance
//   - initialize_mu(y):   a starting value for μ
//   - clamp_mu(μ):        keep μ inside the valid domain
//
// The log-likelihood is used by the diagnostics (AIC/BIC) only.
//
//   Family     V(μ)        Domain of μ    Canonical link
//   --------   ---------   ------------   --------------
//   Gaussian   1           (-∞, ∞)        identity
//   Poisson    μ           (0, ∞)         log
//   Binomial   μ(1 - μ)    (0, 1)         logit
//
// =============================================================================

mod binomial;
mod gaussian;
mod poisson;

pub use binomial::BinomialFamily;
pub use gaussian::GaussianFamily;
pub use poisson::PoissonFamily;

use ndarray::Array1;

/// A GLM distribution family.
pub trait Family: Send + Sync {
    /// Display name, e.g. "Poisson".
    fn name(&self) -> &str;

    /// Variance function V(μ).
    fn variance(&self, mu: &Array1<f64>) -> Array1<f64>;

    /// Unit deviance d(y, μ) for each observation.
    fn unit_deviance(&self, y: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64>;

    /// Total deviance Σ wᵢ d(yᵢ, μᵢ).
    fn deviance(&self, y: &Array1<f64>, mu: &Array1<f64>, weights: Option<&Array1<f64>>) -> f64 {
        let unit = self.unit_deviance(y, mu);
        match weights {
            Some(w) => unit.iter().zip(w.iter()).map(|(&d, &wi)| d * wi).sum(),
            None => unit.sum(),
        }
    }

    /// Log-likelihood at μ. `scale` is only used by families with a free
    /// dispersion parameter.
    fn log_likelihood(&self, y: &Array1<f64>, mu: &Array1<f64>, scale: f64) -> f64;

    /// Starting values for μ.
    fn initialize_mu(&self, y: &Array1<f64>) -> Array1<f64>;

    /// True if every μᵢ is inside the family's domain.
    fn is_valid_mu(&self, mu: &Array1<f64>) -> bool;

    /// Clamp μ into the family's domain.
    fn clamp_mu(&self, mu: &Array1<f64>) -> Array1<f64>;

    /// True if the dispersion φ is estimated rather than fixed at 1.
    fn has_free_dispersion(&self) -> bool {
        false
    }

    /// True if the response values are admissible for this family.
    fn is_valid_response(&self, y: &Array1<f64>) -> bool {
        y.iter().all(|v| v.is_finite())
    }
}
