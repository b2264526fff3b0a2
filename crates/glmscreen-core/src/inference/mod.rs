// =============================================================================
// Statistical Inference for the Final Refit
// =============================================================================
//
// The screening rounds use penalized fits whose standard errors mean nothing.
// The final refit is an ordinary unpenalized GLM on the selected columns, so
// the usual Wald machinery applies to it:
//
//     se(β̂ⱼ) = √(φ × [(X'WX)⁻¹]ⱼⱼ)
//     zⱼ     = β̂ⱼ / se(β̂ⱼ)
//     pⱼ     = 2 × (1 - Φ(|zⱼ|))
//
// For Poisson and Binomial φ = 1.
//
// Keep in mind that these p-values ignore the selection step: the columns
// were chosen because they looked strong on this very data.
//
// =============================================================================

use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, Normal};

/// Standard errors from an unscaled covariance matrix and a dispersion φ.
pub fn standard_errors(covariance_unscaled: &Array2<f64>, scale: f64) -> Array1<f64> {
    covariance_unscaled
        .diag()
        .mapv(|v| if v > 0.0 { (scale * v).sqrt() } else { f64::NAN })
}

/// Two-tailed p-value of a z-statistic.
pub fn pvalue_z(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        // P(|Z| > |z|) = 2 × (1 - Φ(|z|))
        Ok(normal) => 2.0 * (1.0 - normal.cdf(z.abs())),
        Err(_) => f64::NAN,
    }
}

/// Wald confidence interval estimate ± z_{1-α/2} × se.
pub fn confidence_interval_z(estimate: f64, std_error: f64, confidence: f64) -> (f64, f64) {
    if !estimate.is_finite() || !std_error.is_finite() || std_error <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let normal = match Normal::new(0.0, 1.0) {
        Ok(n) => n,
        Err(_) => return (f64::NAN, f64::NAN),
    };
    let alpha = 1.0 - confidence;
    let margin = normal.inverse_cdf(1.0 - alpha / 2.0) * std_error;
    (estimate - margin, estimate + margin)
}
