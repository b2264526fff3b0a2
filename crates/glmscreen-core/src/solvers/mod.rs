// =============================================================================
// GLM Solvers
// =============================================================================
//
// We want coefficients β for
//
//     g(E[Y]) = Xβ
//
// where g is the link function. The likelihood has no closed-form maximizer,
// so we iterate: IRLS linearizes around the current estimate and solves a
// weighted least squares problem, over and over, until the objective stops
// moving.
//
// The screening rounds need a *penalized* version of the same thing: the
// candidate coefficients carry a SCAD-type penalty so that uninformative
// columns are shrunk to (almost) zero. That is handled inside the same loop
// by adding the penalty's local quadratic approximation to X'WX.
//
// =============================================================================

mod irls;

pub use irls::{fit_glm, fit_glm_penalized, solve_weighted_least_squares, IRLSConfig, IRLSResult, PenaltyTerm};

use ndarray::Array1;
use crate::families::Family;

/// Safe initialization of μ that works for any family.
///
/// Used as fallback when `family.initialize_mu(y)` produces invalid values.
/// Averages each yᵢ with the global mean, then clamps to the family's range.
pub(crate) fn initialize_mu_safe(y: &Array1<f64>, family: &dyn Family) -> Array1<f64> {
    let y_mean = y.mean().unwrap_or(1.0).max(0.01);
    let raw: Array1<f64> = y.mapv(|yi| (yi + y_mean) / 2.0);
    family.clamp_mu(&raw)
}
