use ndarray::Array1;

use crate::families::Family;

/// Log-likelihood at the fitted means.
///
/// For the Gaussian family the variance is the ML estimate deviance / n.
pub fn log_likelihood(y: &Array1<f64>, mu: &Array1<f64>, family: &dyn Family, deviance: f64) -> f64 {
    let scale = if y.is_empty() { 1.0 } else { deviance / y.len() as f64 };
    family.log_likelihood(y, mu, scale.max(f64::MIN_POSITIVE))
}

/// AIC = -2ℓ + 2k
pub fn aic(llf: f64, n_params: usize) -> f64 {
    -2.0 * llf + 2.0 * n_params as f64
}

/// BIC = -2ℓ + k log(n)
pub fn bic(llf: f64, n_params: usize, n_obs: usize) -> f64 {
    -2.0 * llf + n_params as f64 * (n_obs as f64).ln()
}
