// =============================================================================
// Forward Variable Screening
// =============================================================================
//
// Given a response, an initial model (usually just an intercept) and a large
// pool of candidate columns, find the few candidates that clearly improve
// the fit:
//
//   1. Fit the initial model.
//   2. Fit [model | candidates] with a penalty on the candidates only.
//      Irrelevant candidates are shrunk to (numerically) zero.
//   3. Candidates whose coefficient is clearly nonzero join the model.
//   4. Repeat until nothing new joins, then refit the model unpenalized.
//
// Candidates come either as one in-memory pool (`Screener::screen`) or as a
// single-pass stream of batches (`Screener::screen_iter`). Streaming never
// holds more than one batch plus the selected columns.
//
// Parts:
//   config     run settings
//   state      selected columns, their retained data, and the budget
//   inclusion  the "clearly nonzero" rule
//   ranking    optional |x'r| pre-ranking of candidates
//   source     candidate pools, batches and batch sources
//   screener   the loops and the final refit
//   results    what a run returns
//
// =============================================================================

mod config;
mod inclusion;
mod ranking;
mod results;
mod screener;
mod source;
mod state;

pub use config::{BatchContext, ScreeningConfig};
pub use inclusion::InclusionRule;
pub use ranking::{ranking_scores, top_k};
pub use results::{IteratorScreeningResult, RoundRecord, ScreeningResult, ScreeningStatus, Termination};
pub use screener::Screener;
pub use source::{BatchSource, CandidateBatch, CandidatePool, IterSource, PoolBatches, ResultIterSource};
pub use state::{ColumnId, SelectionState};

use ndarray::{Array1, Array2};

use crate::error::{GlmScreenError, Result};

/// The model screening starts from. Its columns are never penalized.
#[derive(Debug, Clone)]
pub struct InitialModel {
    endog: Array1<f64>,
    exog: Array2<f64>,
    names: Vec<String>,
}

impl InitialModel {
    /// Default labels are `const` for a column of ones, `x{j}` otherwise.
    /// A second column of ones is a duplicate `const` and is rejected.
    pub fn new(endog: Array1<f64>, exog: Array2<f64>) -> Result<Self> {
        let names = exog
            .columns()
            .into_iter()
            .enumerate()
            .map(|(j, col)| {
                if col.iter().all(|&v| v == 1.0) {
                    "const".to_string()
                } else {
                    format!("x{}", j)
                }
            })
            .collect();
        Self::with_labels(endog, exog, names)
    }

    /// Initial model with caller-supplied labels, one per exog column.
    pub fn with_labels(endog: Array1<f64>, exog: Array2<f64>, names: Vec<String>) -> Result<Self> {
        if endog.is_empty() {
            return Err(GlmScreenError::EmptyInput("response is empty".to_string()));
        }
        if exog.ncols() == 0 {
            return Err(GlmScreenError::EmptyInput("initial model has no columns".to_string()));
        }
        if exog.nrows() != endog.len() {
            return Err(GlmScreenError::DimensionMismatch(format!(
                "initial exog has {} rows but the response has {} values",
                exog.nrows(),
                endog.len()
            )));
        }
        Self { endog, exog, names: Vec::new() }.with_names(names)
    }

    pub fn intercept_only(endog: Array1<f64>) -> Result<Self> {
        let n = endog.len();
        Self::new(endog, Array2::ones((n, 1)))
    }

    pub fn with_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.exog.ncols() {
            return Err(GlmScreenError::DimensionMismatch(format!(
                "{} names for {} initial columns",
                names.len(),
                self.exog.ncols()
            )));
        }
        self.names = names;
        self.check_disjoint(&[])?;
        Ok(self)
    }

    pub fn endog(&self) -> &Array1<f64> {
        &self.endog
    }

    pub fn exog(&self) -> &Array2<f64> {
        &self.exog
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn nobs(&self) -> usize {
        self.endog.len()
    }

    /// Fails if a label repeats within the model or appears in `labels`.
    pub(crate) fn check_disjoint(&self, labels: &[String]) -> Result<()> {
        for (i, name) in self.names.iter().enumerate() {
            if self.names[..i].contains(name) || labels.contains(name) {
                return Err(GlmScreenError::DuplicateColumn(format!(
                    "initial model column '{}' is used more than once",
                    name
                )));
            }
        }
        Ok(())
    }
}
