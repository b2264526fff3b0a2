// =============================================================================
// Numeric Constants
// =============================================================================

/// Smallest fitted mean allowed for families with μ > 0 (Poisson).
pub const MU_MIN_POSITIVE: f64 = 1e-10;

/// Lower clamp for probabilities (Binomial).
pub const MU_MIN_PROBABILITY: f64 = 1e-10;

/// Upper clamp for probabilities (Binomial).
pub const MU_MAX_PROBABILITY: f64 = 1.0 - 1e-10;

/// Largest IRLS working weight; bigger values are clipped.
pub const MAX_IRLS_WEIGHT: f64 = 1e10;

/// Linear predictors are clipped to ±this before exponentiating.
pub const ETA_CLIP: f64 = 700.0;

/// Default absolute threshold for "effectively nonzero" coefficients.
pub const DEFAULT_ZERO_TOLERANCE: f64 = 1e-4;

/// Default screening penalty weight per observation (pen_weight = nobs × this).
pub const DEFAULT_PEN_WEIGHT_PER_OBS: f64 = 5.0;
