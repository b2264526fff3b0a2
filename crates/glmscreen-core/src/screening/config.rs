// =============================================================================
// Screening Configuration
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PEN_WEIGHT_PER_OBS, DEFAULT_ZERO_TOLERANCE};
use crate::error::{GlmScreenError, Result};

/// What each batch of a streaming run is screened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchContext {
    /// The initial model plus every column selected from earlier batches.
    /// One pass; admitted columns are final.
    #[default]
    Selected,
    /// The initial model alone. Each batch is screened on its own, the
    /// survivors of all batches are kept, and one in-memory screen over the
    /// kept columns makes the final choice.
    Initial,
}

/// Settings for one screening run.
///
/// Passed to `Screener::new`; nothing here is global, so independent runs
/// with different settings can live side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Penalty strength for the screening fits. Larger values shrink harder
    /// and admit fewer columns per round.
    /// Default: None, meaning nobs × 5.
    pub pen_weight: Option<f64>,

    /// Round budget of the in-memory loop.
    /// Default: 10
    pub max_rounds: usize,

    /// Total number of columns that may be added over the whole run
    /// (spans all batches in streaming mode).
    /// Default: None (no limit beyond the number of candidates)
    pub k_max_add: Option<usize>,

    /// Absolute threshold above which a penalized coefficient counts as
    /// nonzero.
    /// Default: 1e-4
    pub zero_tolerance: f64,

    /// If set, only the `k_add` best-ranked unselected candidates (by
    /// |x'r| with r the Pearson residuals of the current model) enter each
    /// round's penalized fit.
    /// Default: None (all unselected candidates)
    pub k_add: Option<usize>,

    /// Penalized fit + inclusion passes per batch in streaming mode.
    /// Default: 1
    pub rounds_per_batch: usize,

    /// Run the unpenalized refit at the end of a streaming run.
    /// Default: true
    pub refit_final: bool,

    /// Streaming only: what each batch is screened against. With
    /// `Initial`, the closing screen over the kept columns runs for up to
    /// `max_rounds` rounds and `k_max_add` bounds that screen.
    /// Default: Selected
    pub batch_context: BatchContext,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            pen_weight: None,
            max_rounds: 10,
            k_max_add: None,
            zero_tolerance: DEFAULT_ZERO_TOLERANCE,
            k_add: None,
            rounds_per_batch: 1,
            refit_final: true,
            batch_context: BatchContext::Selected,
        }
    }
}

impl ScreeningConfig {
    pub fn with_pen_weight(mut self, pen_weight: f64) -> Self {
        self.pen_weight = Some(pen_weight);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_k_max_add(mut self, k_max_add: usize) -> Self {
        self.k_max_add = Some(k_max_add);
        self
    }

    pub fn with_zero_tolerance(mut self, zero_tolerance: f64) -> Self {
        self.zero_tolerance = zero_tolerance;
        self
    }

    pub fn with_k_add(mut self, k_add: usize) -> Self {
        self.k_add = Some(k_add);
        self
    }

    pub fn with_rounds_per_batch(mut self, rounds: usize) -> Self {
        self.rounds_per_batch = rounds;
        self
    }

    pub fn with_refit_final(mut self, refit: bool) -> Self {
        self.refit_final = refit;
        self
    }

    pub fn with_batch_context(mut self, context: BatchContext) -> Self {
        self.batch_context = context;
        self
    }

    /// The penalty strength actually used for `nobs` observations.
    pub fn resolved_pen_weight(&self, nobs: usize) -> f64 {
        self.pen_weight
            .unwrap_or(nobs as f64 * DEFAULT_PEN_WEIGHT_PER_OBS)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(w) = self.pen_weight {
            if !(w.is_finite() && w > 0.0) {
                return Err(GlmScreenError::InvalidValue(format!(
                    "pen_weight must be positive and finite, got {}",
                    w
                )));
            }
        }
        if !(self.zero_tolerance.is_finite() && self.zero_tolerance > 0.0) {
            return Err(GlmScreenError::InvalidValue(format!(
                "zero_tolerance must be positive, got {}",
                self.zero_tolerance
            )));
        }
        if self.max_rounds == 0 {
            return Err(GlmScreenError::InvalidValue("max_rounds must be at least 1".to_string()));
        }
        if self.rounds_per_batch == 0 {
            return Err(GlmScreenError::InvalidValue(
                "rounds_per_batch must be at least 1".to_string(),
            ));
        }
        if self.k_max_add == Some(0) {
            return Err(GlmScreenError::InvalidValue("k_max_add must be at least 1".to_string()));
        }
        if self.k_add == Some(0) {
            return Err(GlmScreenError::InvalidValue("k_add must be at least 1".to_string()));
        }
        Ok(())
    }
}
