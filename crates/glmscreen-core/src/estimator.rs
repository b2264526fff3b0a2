// =============================================================================
// Estimator Adapter
// =============================================================================
//
// The screening loop never touches an optimizer directly. It asks an
// `Estimator` for one fit at a time through a narrow contract:
//
//     fit(endog, exog, pen_weight | none, n_unpenalized, start_params)
//         -> { params, converged, diagnostics }
//
// - `pen_weight = None` means an ordinary maximum-likelihood fit.
// - `n_unpenalized` leading columns are exempt from the penalty (the
//   initial model and the columns already admitted).
// - A fit that runs out of iterations is still a result (`converged = false`);
//   only a fit that produces no coefficients at all is an error.
//
// Estimators must not carry state between calls: every call gets everything
// it needs through the request.
//
// `GlmEstimator` is the implementation that ships with the crate: IRLS for
// any family/link pair, with a smoothed SCAD penalty by default.
//
// =============================================================================

use ndarray::{Array1, Array2};

use crate::diagnostics::{aic, bic, log_likelihood, resid_pearson};
use crate::error::Result;
use crate::families::{Family, PoissonFamily};
use crate::inference::{pvalue_z, standard_errors};
use crate::links::{Link, LogLink};
use crate::regularization::Penalty;
use crate::solvers::{fit_glm_penalized, IRLSConfig, PenaltyTerm};

/// One call to the estimator.
#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    pub endog: &'a Array1<f64>,
    pub exog: &'a Array2<f64>,
    /// Penalty strength; `None` for an unpenalized fit.
    pub pen_weight: Option<f64>,
    /// Number of leading columns without penalty.
    pub n_unpenalized: usize,
    pub start_params: Option<&'a Array1<f64>>,
}

impl<'a> FitRequest<'a> {
    pub fn unpenalized(endog: &'a Array1<f64>, exog: &'a Array2<f64>) -> Self {
        Self {
            endog,
            exog,
            pen_weight: None,
            n_unpenalized: exog.ncols(),
            start_params: None,
        }
    }

    pub fn penalized(endog: &'a Array1<f64>, exog: &'a Array2<f64>, pen_weight: f64, n_unpenalized: usize) -> Self {
        Self {
            endog,
            exog,
            pen_weight: Some(pen_weight),
            n_unpenalized,
            start_params: None,
        }
    }

    pub fn with_start_params(mut self, start: &'a Array1<f64>) -> Self {
        self.start_params = Some(start);
        self
    }
}

/// Fit statistics that travel with the coefficients.
#[derive(Debug, Clone)]
pub struct FitDiagnostics {
    pub deviance: f64,
    /// deviance / 2 + penalty
    pub penalized_objective: f64,
    /// Unpenalized log-likelihood at the estimate.
    pub llf: f64,
    pub iterations: usize,
    pub fitted_values: Array1<f64>,
    pub resid_pearson: Array1<f64>,
    pub covariance_unscaled: Array2<f64>,
    /// Dispersion φ (1 for Poisson/Binomial).
    pub scale: f64,
    /// Penalty strength used (None for unpenalized fits).
    pub pen_weight: Option<f64>,
}

/// Output of one estimator call.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// One value per design column, in design order.
    pub params: Array1<f64>,
    pub converged: bool,
    pub diagnostics: FitDiagnostics,
}

impl FitResult {
    pub fn n_params(&self) -> usize {
        self.params.len()
    }

    /// Standard errors. Only meaningful for unpenalized fits.
    pub fn bse(&self) -> Array1<f64> {
        standard_errors(&self.diagnostics.covariance_unscaled, self.diagnostics.scale)
    }

    pub fn zvalues(&self) -> Array1<f64> {
        let bse = self.bse();
        self.params
            .iter()
            .zip(bse.iter())
            .map(|(&b, &se)| b / se)
            .collect()
    }

    pub fn pvalues(&self) -> Array1<f64> {
        self.zvalues().mapv(pvalue_z)
    }

    pub fn aic(&self) -> f64 {
        aic(self.diagnostics.llf, self.n_params())
    }

    pub fn bic(&self) -> f64 {
        bic(self.diagnostics.llf, self.n_params(), self.diagnostics.fitted_values.len())
    }
}

/// The fitting contract the screening loop depends on.
pub trait Estimator {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitResult>;
}

impl<E: Estimator + ?Sized> Estimator for &E {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitResult> {
        (**self).fit(request)
    }
}

impl<E: Estimator + ?Sized> Estimator for Box<E> {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitResult> {
        (**self).fit(request)
    }
}

// =============================================================================
// GlmEstimator
// =============================================================================

/// IRLS-based GLM estimator with a coefficient penalty for screening rounds.
pub struct GlmEstimator {
    family: Box<dyn Family>,
    link: Box<dyn Link>,
    penalty: Penalty,
    /// Settings for unpenalized fits.
    config: IRLSConfig,
    /// Settings for penalized fits.
    penalized_config: IRLSConfig,
}

impl GlmEstimator {
    pub fn new(family: Box<dyn Family>, link: Box<dyn Link>) -> Self {
        Self {
            family,
            link,
            penalty: Penalty::default(),
            config: IRLSConfig::default(),
            penalized_config: IRLSConfig::penalized(),
        }
    }

    /// Poisson regression with a log link, the usual count-data screen.
    pub fn poisson() -> Self {
        Self::new(Box::new(PoissonFamily), Box::new(LogLink))
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_config(mut self, config: IRLSConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_penalized_config(mut self, config: IRLSConfig) -> Self {
        self.penalized_config = config;
        self
    }

    pub fn family(&self) -> &dyn Family {
        self.family.as_ref()
    }

    pub fn link(&self) -> &dyn Link {
        self.link.as_ref()
    }

    pub fn penalty(&self) -> &Penalty {
        &self.penalty
    }
}

impl Estimator for GlmEstimator {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitResult> {
        let family = self.family.as_ref();
        let term = request.pen_weight.map(|pen_weight| PenaltyTerm {
            penalty: &self.penalty,
            pen_weight,
            n_unpenalized: request.n_unpenalized,
        });
        let config = if term.is_some() { &self.penalized_config } else { &self.config };

        let result = fit_glm_penalized(
            request.endog,
            request.exog,
            family,
            self.link.as_ref(),
            config,
            term.as_ref(),
            request.start_params,
        )?;

        let n = request.endog.len();
        let p = request.exog.ncols();
        let scale = if family.has_free_dispersion() && n > p {
            result.deviance / (n - p) as f64
        } else {
            1.0
        };
        let llf = log_likelihood(request.endog, &result.fitted_values, family, result.deviance);
        let resid = resid_pearson(request.endog, &result.fitted_values, family);

        Ok(FitResult {
            params: result.coefficients,
            converged: result.converged,
            diagnostics: FitDiagnostics {
                deviance: result.deviance,
                penalized_objective: result.penalized_objective,
                llf,
                iterations: result.iterations,
                fitted_values: result.fitted_values,
                resid_pearson: resid,
                covariance_unscaled: result.covariance_unscaled,
                scale,
                pen_weight: request.pen_weight,
            },
        })
    }
}
