// =============================================================================
// Coefficient Penalties
// =============================================================================
//
// The screening estimator maximizes a penalized log-likelihood:
//
//     ℓ(β) - pen_weight × Σⱼ wⱼ P(βⱼ)
//
// where wⱼ = 0 for columns that are already in the model (the initial exog
// and everything selected so far) and wⱼ = 1 for candidates.
//
// PENALTIES
// ---------
//   - SCAD (Fan & Li): behaves like the lasso near zero, flattens out for
//     large |β|, so strong signals end up nearly unbiased.
//
//         P(x) = τx                                  x ≤ τ
//              = -(x² - 2aτx + τ²) / (2(a - 1))      τ < x < aτ
//              = (a + 1)τ² / 2                       x ≥ aτ
//
//   - Smoothed SCAD: SCAD with the kink at zero replaced by a quadratic on
//     |β| < c0. Zero coefficients stay in the quadratic region, shrunk to a
//     tiny but nonzero value, which is what the inclusion threshold looks at.
//
//   - L2: P(x) = x², plain ridge shrinkage.
//
// LOCAL QUADRATIC APPROXIMATION
// -----------------------------
// IRLS handles the penalty by replacing P around the current β with a
// quadratic whose curvature is P'(|β|) / |β|. That turns each IRLS step into
//
//     (X'WX + pen_weight × diag(wⱼ P'(|βⱼ|)/|βⱼ|)) β = X'Wz
//
// For smoothed SCAD the curvature at zero is finite (2 × aq2); for plain SCAD
// |β| is floored at LQA_EPS, so a coefficient that reaches zero stays there.
//
// =============================================================================

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{GlmScreenError, Result};

/// Floor for |β| in the local quadratic weights of the non-smoothed SCAD.
const LQA_EPS: f64 = 1e-8;

/// A separable coefficient penalty P(β).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Penalty {
    /// Smoothly clipped absolute deviation.
    Scad { tau: f64, a: f64 },
    /// SCAD with a quadratic patch on |β| < c0.
    ScadSmoothed { tau: f64, a: f64, c0: f64 },
    /// Ridge, P(β) = β².
    L2,
}

impl Default for Penalty {
    fn default() -> Self {
        Penalty::ScadSmoothed {
            tau: 0.1,
            a: 3.7,
            c0: 1e-4,
        }
    }
}

fn scad_value(x: f64, tau: f64, a: f64) -> f64 {
    if x <= tau {
        tau * x
    } else if x < a * tau {
        -(x * x - 2.0 * a * tau * x + tau * tau) / (2.0 * (a - 1.0))
    } else {
        (a + 1.0) * tau * tau / 2.0
    }
}

// Derivative with respect to x = |β| ≥ 0.
fn scad_deriv(x: f64, tau: f64, a: f64) -> f64 {
    if x <= tau {
        tau
    } else if x < a * tau {
        (a * tau - x) / (a - 1.0)
    } else {
        0.0
    }
}

impl Penalty {
    pub fn scad(tau: f64) -> Self {
        Penalty::Scad { tau, a: 3.7 }
    }

    pub fn scad_smoothed(tau: f64, c0: f64) -> Self {
        Penalty::ScadSmoothed { tau, a: 3.7, c0 }
    }

    /// Check the parameters are in range.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Penalty::Scad { tau, a } => check_scad(tau, a),
            Penalty::ScadSmoothed { tau, a, c0 } => {
                check_scad(tau, a)?;
                if !(c0 > 0.0 && c0 <= tau) {
                    return Err(GlmScreenError::InvalidValue(format!(
                        "smoothed SCAD needs 0 < c0 <= tau, got c0 = {} and tau = {}",
                        c0, tau
                    )));
                }
                Ok(())
            }
            Penalty::L2 => Ok(()),
        }
    }

    /// Penalty value P(β) for a single coefficient.
    pub fn value(&self, beta: f64) -> f64 {
        let x = beta.abs();
        match *self {
            Penalty::Scad { tau, a } => scad_value(x, tau, a),
            Penalty::ScadSmoothed { tau, a, c0 } => {
                if x < c0 {
                    let (aq1, aq2) = smoothing_coefficients(tau, a, c0);
                    aq1 + aq2 * x * x
                } else {
                    scad_value(x, tau, a)
                }
            }
            Penalty::L2 => x * x,
        }
    }

    /// Curvature of the local quadratic approximation, P'(|β|) / |β|.
    pub fn lqa_weight(&self, beta: f64) -> f64 {
        let x = beta.abs();
        match *self {
            Penalty::Scad { tau, a } => scad_deriv(x, tau, a) / x.max(LQA_EPS),
            Penalty::ScadSmoothed { tau, a, c0 } => {
                if x < c0 {
                    2.0 * smoothing_coefficients(tau, a, c0).1
                } else {
                    scad_deriv(x, tau, a) / x
                }
            }
            Penalty::L2 => 2.0,
        }
    }

    /// Σⱼ P(βⱼ) over the penalized coefficients (index ≥ n_unpenalized).
    pub fn total(&self, params: &Array1<f64>, n_unpenalized: usize) -> f64 {
        params.iter().skip(n_unpenalized).map(|&b| self.value(b)).sum()
    }

    /// Diagonal of pen_weight × diag(wⱼ P'(|βⱼ|)/|βⱼ|).
    pub fn lqa_diagonal(&self, params: &Array1<f64>, n_unpenalized: usize, pen_weight: f64) -> Array1<f64> {
        params
            .iter()
            .enumerate()
            .map(|(j, &b)| {
                if j < n_unpenalized {
                    0.0
                } else {
                    pen_weight * self.lqa_weight(b)
                }
            })
            .collect()
    }
}

fn check_scad(tau: f64, a: f64) -> Result<()> {
    if !(tau > 0.0) || !tau.is_finite() {
        return Err(GlmScreenError::InvalidValue(format!("SCAD tau must be positive, got {}", tau)));
    }
    if !(a > 2.0) {
        return Err(GlmScreenError::InvalidValue(format!("SCAD a must exceed 2, got {}", a)));
    }
    Ok(())
}

/// (aq1, aq2) of the quadratic patch, matching SCAD's value and slope at c0.
fn smoothing_coefficients(tau: f64, a: f64, c0: f64) -> (f64, f64) {
    let value_c0 = scad_value(c0, tau, a);
    let deriv_c0 = scad_deriv(c0, tau, a);
    let aq1 = value_c0 - 0.5 * deriv_c0 * c0;
    let aq2 = 0.5 * deriv_c0 / c0;
    (aq1, aq2)
}
