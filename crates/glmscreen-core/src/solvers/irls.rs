// =============================================================================
// IRLS: Iteratively Reweighted Least Squares (with coefficient penalties)
// =============================================================================
//
// THE BIG PICTURE
// ---------------
// We want β that maximizes the (penalized) likelihood. IRLS linearizes the
// problem around the current estimate and solves a weighted least squares
// problem at each step:
//
//     Start with μ⁰ (from the family or from start parameters)
//     Repeat:
//         1. Working weights   W = 1 / (V(μ) × g'(μ)²)
//         2. Working response  z = η + (y - μ) × g'(μ)
//         3. Penalty curvature Λ = pen_weight × diag(wⱼ P'(|βⱼ|)/|βⱼ|)
//         4. Solve             (X'WX + Λ) β = X'Wz
//         5. Step halving if the penalized objective went up
//         6. Stop when the objective stops changing
//
// Without a penalty Λ = 0 and this is textbook IRLS (Newton's method for
// canonical links).
//
// THE OBJECTIVE
// -------------
// Everything is measured on the deviance scale:
//
//     Q(β) = deviance(β) / 2 + pen_weight × Σⱼ wⱼ P(βⱼ)
//
// The local quadratic approximation of a SCAD-type penalty is a majorizer,
// so a full step rarely increases Q. When it does (bad starting values,
// extreme weights) the step is halved towards the previous β.
//
// CONVERGENCE
// -----------
// |Q_old - Q_new| / (|Q_new| + 0.1) < tolerance. The +0.1 keeps the
// criterion meaningful when the deviance is close to zero.
//
// =============================================================================

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use super::initialize_mu_safe;
use crate::constants::MAX_IRLS_WEIGHT;
use crate::convert::solve_and_invert;
use crate::error::{GlmScreenError, Result};
use crate::families::Family;
use crate::links::Link;
use crate::regularization::Penalty;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration options for the IRLS algorithm.
#[derive(Debug, Clone)]
pub struct IRLSConfig {
    /// Maximum number of iterations before giving up.
    /// Default: 25
    pub max_iterations: usize,

    /// Convergence tolerance for the relative change of the objective.
    /// Default: 1e-8
    pub tolerance: f64,

    /// Minimum value for working weights.
    /// Default: 1e-10
    pub min_weight: f64,

    /// How many times a step may be halved in one iteration.
    /// Default: 20
    pub max_step_halvings: usize,
}

impl Default for IRLSConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            tolerance: 1e-8,
            min_weight: 1e-10,
            max_step_halvings: 20,
        }
    }
}

impl IRLSConfig {
    /// Settings for penalized fits. The local quadratic approximation moves
    /// coefficients across penalty regions one step at a time, so it needs
    /// more iterations than a plain GLM.
    pub fn penalized() -> Self {
        Self {
            max_iterations: 200,
            ..Self::default()
        }
    }
}

/// The penalty part of a penalized fit.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyTerm<'a> {
    pub penalty: &'a Penalty,
    /// Overall strength; 0 disables the penalty.
    pub pen_weight: f64,
    /// The leading `n_unpenalized` coefficients carry no penalty.
    pub n_unpenalized: usize,
}

impl PenaltyTerm<'_> {
    fn objective(&self, params: &Array1<f64>) -> f64 {
        self.pen_weight * self.penalty.total(params, self.n_unpenalized)
    }
}

// =============================================================================
// Result Structure
// =============================================================================

/// Results from an IRLS fit.
#[derive(Debug, Clone)]
pub struct IRLSResult {
    /// The fitted coefficients β
    pub coefficients: Array1<f64>,

    /// Fitted values μ = g⁻¹(Xβ)
    pub fitted_values: Array1<f64>,

    /// Linear predictor η = Xβ
    pub linear_predictor: Array1<f64>,

    /// Final (unpenalized) deviance
    pub deviance: f64,

    /// deviance / 2 + penalty; equals deviance / 2 for unpenalized fits
    pub penalized_objective: f64,

    /// Number of iterations run
    pub iterations: usize,

    /// Did the algorithm converge?
    pub converged: bool,

    /// (X'WX + Λ)⁻¹ from the last iteration
    pub covariance_unscaled: Array2<f64>,

    /// Final IRLS working weights
    pub irls_weights: Array1<f64>,
}

// =============================================================================
// Main Fitting Functions
// =============================================================================

/// Fit an unpenalized GLM by IRLS.
pub fn fit_glm(
    y: &Array1<f64>,
    x: &Array2<f64>,
    family: &dyn Family,
    link: &dyn Link,
    config: &IRLSConfig,
) -> Result<IRLSResult> {
    fit_glm_penalized(y, x, family, link, config, None, None)
}

/// Fit a GLM by IRLS with an optional coefficient penalty.
///
/// # Arguments
/// * `y` - Response variable (n)
/// * `x` - Design matrix (n × p), including the intercept column if any
/// * `family` / `link` - model specification
/// * `config` - iteration settings
/// * `penalty` - penalty strength and which leading columns are exempt
/// * `start_params` - warm start; μ is built from Xβ instead of the family
///
/// # Returns
/// * `Ok(IRLSResult)` - also when the iteration limit was hit (`converged = false`)
/// * `Err(GlmScreenError)` - bad shapes/values or a singular system
pub fn fit_glm_penalized(
    y: &Array1<f64>,
    x: &Array2<f64>,
    family: &dyn Family,
    link: &dyn Link,
    config: &IRLSConfig,
    penalty: Option<&PenaltyTerm<'_>>,
    start_params: Option<&Array1<f64>>,
) -> Result<IRLSResult> {
    // -------------------------------------------------------------------------
    // Step 0: Validate inputs
    // -------------------------------------------------------------------------
    let n = y.len();
    let p = x.ncols();

    if n == 0 {
        return Err(GlmScreenError::EmptyInput("y is empty".to_string()));
    }
    if p == 0 {
        return Err(GlmScreenError::EmptyInput("X has no columns".to_string()));
    }
    if x.nrows() != n {
        return Err(GlmScreenError::DimensionMismatch(format!(
            "X has {} rows but y has {} elements",
            x.nrows(),
            n
        )));
    }
    if !family.is_valid_response(y) {
        return Err(GlmScreenError::InvalidValue(format!(
            "response contains values outside the {} domain",
            family.name()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(GlmScreenError::InvalidValue("X contains non-finite values".to_string()));
    }
    let penalty = penalty.filter(|t| t.pen_weight > 0.0);
    if let Some(term) = penalty {
        term.penalty.validate()?;
    }

    // -------------------------------------------------------------------------
    // Step 1: Starting point
    // -------------------------------------------------------------------------
    // With start parameters we can evaluate the objective right away, which
    // lets the very first step be checked (and halved) like any other.
    let mut beta: Option<Array1<f64>> = match start_params {
        Some(b) if b.len() != p => {
            return Err(GlmScreenError::DimensionMismatch(format!(
                "start_params has {} elements but X has {} columns",
                b.len(),
                p
            )));
        }
        Some(b) => Some(b.clone()),
        None => None,
    };

    let (mut eta, mut mu) = match &beta {
        Some(b) => {
            let eta = x.dot(b);
            let mu = family.clamp_mu(&link.inverse(&eta));
            (eta, mu)
        }
        None => {
            let mut mu = family.initialize_mu(y);
            if !family.is_valid_mu(&mu) {
                mu = initialize_mu_safe(y, family);
            }
            (link.link(&mu), mu)
        }
    };

    let mut deviance = family.deviance(y, &mu, None);
    let mut objective = deviance / 2.0
        + match (penalty, &beta) {
            (Some(term), Some(b)) => term.objective(b),
            _ => 0.0,
        };

    // -------------------------------------------------------------------------
    // Step 2: IRLS iteration loop
    // -------------------------------------------------------------------------
    let mut converged = false;
    let mut iteration = 0;
    let mut cov_unscaled = Array2::zeros((p, p));
    let mut final_weights = Array1::zeros(n);

    while iteration < config.max_iterations {
        iteration += 1;

        // Step 2a: working weights and working response
        let variance = family.variance(&mu);
        let link_deriv = link.derivative(&mu);

        let irls_weights: Array1<f64> = variance
            .iter()
            .zip(link_deriv.iter())
            .map(|(&v, &d)| (1.0 / (v * d * d)).clamp(config.min_weight, MAX_IRLS_WEIGHT))
            .collect();

        let working_response = compute_working_response(y, &mu, &eta, &link_deriv);

        // Step 2b: penalty curvature at the current β
        let penalty_diag = match penalty {
            Some(term) => {
                let at = beta.clone().unwrap_or_else(|| Array1::zeros(p));
                Some(term.penalty.lqa_diagonal(&at, term.n_unpenalized, term.pen_weight))
            }
            None => None,
        };

        // Step 2c: (X'WX + Λ) β = X'Wz
        let (mut beta_new, xtwinv) =
            solve_weighted_least_squares(x, &working_response, &irls_weights, penalty_diag.as_ref())?;

        let mut eta_new = x.dot(&beta_new);
        let mut mu_new = family.clamp_mu(&link.inverse(&eta_new));
        let mut deviance_new = family.deviance(y, &mu_new, None);
        let mut objective_new = deviance_new / 2.0 + penalty.map_or(0.0, |t| t.objective(&beta_new));

        // Step 2d: step halving
        if let Some(beta_old) = &beta {
            let mut halvings = 0;
            while (!objective_new.is_finite() || objective_new > objective + 1e-10 * objective.abs())
                && halvings < config.max_step_halvings
            {
                halvings += 1;
                beta_new = (&beta_new + beta_old) / 2.0;
                eta_new = x.dot(&beta_new);
                mu_new = family.clamp_mu(&link.inverse(&eta_new));
                deviance_new = family.deviance(y, &mu_new, None);
                objective_new = deviance_new / 2.0 + penalty.map_or(0.0, |t| t.objective(&beta_new));
            }
            if halvings > 0 {
                log::debug!(
                    "IRLS iteration {}: step halved {} times, objective {:.6} -> {:.6}",
                    iteration,
                    halvings,
                    objective,
                    objective_new
                );
            }
        }

        if !objective_new.is_finite() {
            return Err(GlmScreenError::InvalidValue(format!(
                "objective became non-finite at iteration {}",
                iteration
            )));
        }

        // Step 2e: convergence check
        let rel_change = (objective - objective_new).abs() / (objective_new.abs() + 0.1);

        log::debug!(
            "IRLS iteration {}: deviance = {:.6}, objective = {:.6}, rel_change = {:.2e}",
            iteration,
            deviance_new,
            objective_new,
            rel_change
        );

        beta = Some(beta_new);
        eta = eta_new;
        mu = mu_new;
        deviance = deviance_new;
        objective = objective_new;
        cov_unscaled = xtwinv;
        final_weights = irls_weights;

        // A warm start has a meaningful objective from iteration 0; a cold
        // start needs one full step before the change means anything.
        let comparable = start_params.is_some() || iteration > 1;
        if comparable && rel_change < config.tolerance {
            converged = true;
            break;
        }
    }

    let coefficients = beta.unwrap_or_else(|| Array1::zeros(p));

    Ok(IRLSResult {
        coefficients,
        fitted_values: mu,
        linear_predictor: eta,
        deviance,
        penalized_objective: objective,
        iterations: iteration,
        converged,
        covariance_unscaled: cov_unscaled,
        irls_weights: final_weights,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Solve the (optionally ridge-augmented) weighted least squares problem
///
/// ```text
/// minimize Σ wᵢ (zᵢ - xᵢ'β)² + Σⱼ λⱼ βⱼ²
/// ```
///
/// Returns (β, (X'WX + diag(λ))⁻¹).
pub fn solve_weighted_least_squares(
    x: &Array2<f64>,
    z: &Array1<f64>,
    w: &Array1<f64>,
    penalty_diag: Option<&Array1<f64>>,
) -> Result<(Array1<f64>, Array2<f64>)> {
    let n = x.nrows();
    let p = x.ncols();

    // X_w = W^(1/2) X and z_w = W^(1/2) z, so X_w'X_w = X'WX
    let sqrt_w: Vec<f64> = w.iter().map(|&wi| wi.sqrt()).collect();
    let x_weighted = DMatrix::from_fn(n, p, |i, j| x[[i, j]] * sqrt_w[i]);
    let z_weighted = DVector::from_iterator(n, z.iter().zip(sqrt_w.iter()).map(|(&zi, &s)| zi * s));

    let mut xtx = x_weighted.transpose() * &x_weighted;
    let xtz = x_weighted.transpose() * z_weighted;

    if let Some(diag) = penalty_diag {
        for j in 0..p {
            xtx[(j, j)] += diag[j];
        }
    }

    solve_and_invert(&xtx, &xtz).ok_or_else(|| {
        GlmScreenError::LinearAlgebraError(
            "failed to solve weighted least squares - matrix may be singular. \
             This often indicates collinear or constant predictors."
                .to_string(),
        )
    })
}

/// z = η + (y - μ) × g'(μ)
fn compute_working_response(
    y: &Array1<f64>,
    mu: &Array1<f64>,
    eta: &Array1<f64>,
    link_deriv: &Array1<f64>,
) -> Array1<f64> {
    eta.iter()
        .zip(y.iter())
        .zip(mu.iter())
        .zip(link_deriv.iter())
        .map(|(((&e, &yi), &mui), &d)| e + (yi - mui) * d)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
