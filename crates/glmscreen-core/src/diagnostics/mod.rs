// =============================================================================
// Model Diagnostics
// =============================================================================
//
// - RESIDUALS: Pearson residuals
// - MODEL FIT: log-likelihood, AIC, BIC
//
// Pearson residuals also drive the optional candidate ranking in the
// screening loop: a candidate whose column correlates with the Pearson
// residuals of the current fit would improve the score the most.
//
// Method names follow statsmodels conventions (resid_pearson, llf, aic, ...).
//
// =============================================================================

mod model_fit;
mod residuals;

pub use model_fit::{aic, bic, log_likelihood};
pub use residuals::resid_pearson;
