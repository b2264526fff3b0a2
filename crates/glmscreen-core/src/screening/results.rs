// Screening outputs. Owned snapshots: nothing here points back into the
// running loop or into the caller's candidates.

use crate::estimator::FitResult;

use super::state::ColumnId;

/// Why a screening run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A round admitted nothing new.
    FixedPoint,
    /// The round budget ran out while columns were still being added.
    MaxRounds,
    /// `k_max_add` columns have been admitted.
    BudgetExhausted,
    /// The batch source had nothing more to give.
    SourceExhausted,
}

/// Outcome of the final refit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreeningStatus {
    Converged,
    /// The refit ran out of iterations. Its estimates are still returned.
    FinalNotConverged,
}

impl ScreeningStatus {
    pub(crate) fn from_converged(converged: bool) -> Self {
        if converged {
            ScreeningStatus::Converged
        } else {
            ScreeningStatus::FinalNotConverged
        }
    }
}

/// What happened in one screening round (or to one skipped batch).
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    /// 0-based, counted over the whole run.
    pub round: usize,
    /// Source batch, `None` for the in-memory loop.
    pub batch: Option<usize>,
    /// Candidates that entered the penalized fit.
    pub n_candidates: usize,
    /// Columns admitted in this round, in admission order.
    pub admitted: Vec<ColumnId>,
    /// Convergence flag of the penalized fit.
    pub converged: bool,
    /// True when no fit ran (budget already used up, or an empty batch).
    pub skipped: bool,
}

impl RoundRecord {
    pub(crate) fn skipped(round: usize, batch: Option<usize>) -> Self {
        Self {
            round,
            batch,
            n_candidates: 0,
            admitted: Vec::new(),
            converged: true,
            skipped: true,
        }
    }

    /// A penalized fit ran but did not converge; its inclusion decision was
    /// used anyway.
    pub fn degraded(&self) -> bool {
        !self.skipped && !self.converged
    }
}

/// Result of in-memory screening.
#[derive(Debug, Clone)]
pub struct ScreeningResult {
    /// Candidate-pool positions of the selected columns, discovery order.
    pub idx_nonzero: Vec<usize>,
    /// Labels of `idx_nonzero`.
    pub names: Vec<String>,
    /// Labels of every parameter of `results_final`: initial model first.
    pub exog_names: Vec<String>,
    /// Unpenalized refit on the initial model plus the selected columns.
    pub results_final: FitResult,
    /// Last penalized fit.
    pub results_pen: FitResult,
    pub status: ScreeningStatus,
    pub termination: Termination,
    pub history: Vec<RoundRecord>,
}

impl ScreeningResult {
    /// The run counts as successful only if the final refit converged.
    pub fn is_success(&self) -> bool {
        self.status == ScreeningStatus::Converged
    }

    pub fn n_rounds(&self) -> usize {
        self.history.len()
    }
}

/// Result of screening a batch source.
#[derive(Debug, Clone)]
pub struct IteratorScreeningResult {
    /// Labels of the selected columns, discovery order across batches.
    pub exog_final_names: Vec<String>,
    /// `[batch, local column]` for every selected column, same order.
    pub idx_nonzero_batches: Vec<[usize; 2]>,
    /// Labels of every parameter of `results_final`: initial model first.
    pub exog_names: Vec<String>,
    /// Unpenalized refit, when enabled.
    pub results_final: Option<FitResult>,
    /// Last penalized fit, `None` if no batch was ever fitted.
    pub results_pen: Option<FitResult>,
    /// Status of `results_final`, `None` when no refit ran.
    pub status: Option<ScreeningStatus>,
    pub termination: Termination,
    pub history: Vec<RoundRecord>,
    /// Batches pulled from the source, including drained ones.
    pub n_batches: usize,
}

impl IteratorScreeningResult {
    /// Successful unless a refit ran and failed to converge.
    pub fn is_success(&self) -> bool {
        self.status != Some(ScreeningStatus::FinalNotConverged)
    }
}
