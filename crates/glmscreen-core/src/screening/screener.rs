// =============================================================================
// Screener: the forward screening loops
// =============================================================================
//
// ONE ROUND
// ---------
// Every round, in memory or streaming, runs the same routine over a block of
// candidate columns:
//
//     design = [ initial exog | selected (discovery order) | candidates ]
//                \________ unpenalized ________/              penalized
//
//     1. Drop candidates that are already selected. With `k_add` set, keep
//        only the best `k_add` of the rest by |x'r|.
//     2. Penalized fit, warm-started from the current model with zeros for
//        the candidates.
//     3. Inclusion rule on the candidate block; admit up to the remaining
//        budget, lowest identity first.
//     4. Admitted columns are copied into the selection arena and move into
//        the unpenalized block of every later fit.
//
// THE TWO LOOPS
// -------------
//   screen:      the whole pool is the candidate block, round after round,
//                until a round admits nothing, `max_rounds` is reached, or
//                the budget is gone.
//   screen_iter: each batch is the candidate block for `rounds_per_batch`
//                rounds, then it is dropped for good. Once the budget is gone
//                the source is released instead of being read further.
//
// With `BatchContext::Initial` the streaming loop changes shape: every batch
// gets its own run against the initial model alone, the columns each batch
// run selects are copied into a kept set, and after the last batch one
// in-memory screen over the kept set picks the final columns.
//
// Both finish with an unpenalized refit on [initial exog | selected]. A
// streaming run that fails releases its source before returning the error.
//
// =============================================================================

use ndarray::{s, Array1, Array2, ArrayView2, Axis};

use crate::convert::column_stack;
use crate::error::{GlmScreenError, Result};
use crate::estimator::{Estimator, FitRequest, FitResult};

use super::config::{BatchContext, ScreeningConfig};
use super::inclusion::InclusionRule;
use super::ranking::{ranking_scores, top_k};
use super::results::{IteratorScreeningResult, RoundRecord, ScreeningResult, ScreeningStatus, Termination};
use super::source::{BatchSource, CandidatePool};
use super::state::{ColumnId, SelectionState};
use super::InitialModel;

/// Forward screening driver. Holds only configuration; every call to
/// `screen` / `screen_iter` is an independent run.
pub struct Screener<E> {
    estimator: E,
    config: ScreeningConfig,
}

impl<E: Estimator> Screener<E> {
    pub fn new(estimator: E, config: ScreeningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { estimator, config })
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Screen an in-memory candidate pool.
    pub fn screen(&self, initial: &InitialModel, pool: &CandidatePool) -> Result<ScreeningResult> {
        if pool.ncols() == 0 {
            return Err(GlmScreenError::EmptyInput("candidate pool has no columns".to_string()));
        }
        if pool.nobs() != initial.nobs() {
            return Err(GlmScreenError::DimensionMismatch(format!(
                "candidate pool has {} rows, response has {}",
                pool.nobs(),
                initial.nobs()
            )));
        }
        initial.check_disjoint(pool.names())?;

        let budget = self.config.k_max_add.unwrap_or(pool.ncols()).min(pool.ncols());
        let baseline = Baseline::fit(self, initial)?;
        let mut run = Run::new(self, initial, &baseline, budget, Vec::new());
        let ids: Vec<ColumnId> = (0..pool.ncols()).map(|j| ColumnId::new(0, j)).collect();

        let mut termination = Termination::MaxRounds;
        for _ in 0..self.config.max_rounds {
            let added = run.round(pool.data().view(), &ids, pool.names(), None)?;
            if run.state.budget_remaining() == 0 {
                termination = Termination::BudgetExhausted;
                break;
            }
            if added == 0 {
                termination = Termination::FixedPoint;
                break;
            }
        }
        log::info!(
            "screening stopped after {} rounds ({:?}): {} of {} candidates selected",
            run.history.len(),
            termination,
            run.state.len(),
            pool.ncols()
        );

        let results_final = run.final_refit()?;
        let status = ScreeningStatus::from_converged(results_final.converged);
        let Run { state, last_pen, history, .. } = run;
        let results_pen = last_pen.ok_or_else(|| {
            GlmScreenError::InvalidValue("screening finished without a penalized fit".to_string())
        })?;

        Ok(ScreeningResult {
            idx_nonzero: state.ids().iter().map(|id| id.local).collect(),
            names: state.names().to_vec(),
            exog_names: initial.names().iter().chain(state.names()).cloned().collect(),
            results_final,
            results_pen,
            status,
            termination,
            history,
        })
    }

    /// Screen candidates pulled batch by batch from `source`.
    ///
    /// Every batch is read exactly once. When the budget runs out the
    /// remaining batches are handed to `BatchSource::release`, and so are
    /// they when the run fails part way.
    pub fn screen_iter<S: BatchSource>(&self, initial: &InitialModel, mut source: S) -> Result<IteratorScreeningResult> {
        let streamed = match self.stream(initial, &mut source) {
            Ok(streamed) => streamed,
            Err(err) => {
                if let Err(release_err) = source.release() {
                    log::warn!("could not release batch source after a failed run: {}", release_err);
                }
                return Err(err);
            }
        };
        let Streamed {
            mut run,
            mut n_batches,
            termination,
        } = streamed;

        if termination == Termination::BudgetExhausted {
            let drained = source.release()?;
            for b in n_batches..n_batches + drained {
                let round = run.history.len();
                run.history.push(RoundRecord::skipped(round, Some(b)));
            }
            n_batches += drained;
            log::info!("selection budget used up; released source after {} more batches", drained);
        }
        log::info!(
            "stream screening stopped after {} batches ({:?}): {} columns selected",
            n_batches,
            termination,
            run.state.len()
        );

        let results_final = if self.config.refit_final {
            Some(run.final_refit()?)
        } else {
            None
        };
        let status = results_final.as_ref().map(|r| ScreeningStatus::from_converged(r.converged));
        let Run { state, last_pen, history, .. } = run;

        Ok(IteratorScreeningResult {
            exog_final_names: state.names().to_vec(),
            idx_nonzero_batches: state.ids().iter().map(|id| [id.batch, id.local]).collect(),
            exog_names: initial.names().iter().chain(state.names()).cloned().collect(),
            results_final,
            results_pen: last_pen,
            status,
            termination,
            history,
            n_batches,
        })
    }

    fn stream<'a, S: BatchSource>(&'a self, initial: &'a InitialModel, source: &mut S) -> Result<Streamed<'a, E>> {
        let baseline = Baseline::fit(self, initial)?;
        match self.config.batch_context {
            BatchContext::Selected => self.stream_with_selected(initial, &baseline, source),
            BatchContext::Initial => self.stream_against_initial(initial, &baseline, source),
        }
    }

    /// One pass; each batch is fit next to everything selected so far.
    fn stream_with_selected<'a, S: BatchSource>(
        &'a self,
        initial: &'a InitialModel,
        baseline: &Baseline,
        source: &mut S,
    ) -> Result<Streamed<'a, E>> {
        let budget = self.config.k_max_add.unwrap_or(usize::MAX);
        let mut run = Run::new(self, initial, baseline, budget, Vec::new());
        let mut n_batches = 0;

        let termination = loop {
            if run.state.budget_remaining() == 0 {
                break Termination::BudgetExhausted;
            }
            let batch = match source.next_batch()? {
                Some(batch) => batch,
                None => break Termination::SourceExhausted,
            };
            let batch_index = n_batches;
            n_batches += 1;

            let labels = batch.validate(batch_index, initial.nobs())?;
            initial.check_disjoint(&labels)?;
            let ids: Vec<ColumnId> = (0..batch.ncols()).map(|j| ColumnId::new(batch_index, j)).collect();

            for _ in 0..self.config.rounds_per_batch {
                let added = run.round(batch.data().view(), &ids, &labels, Some(batch_index))?;
                if added == 0 || run.state.budget_remaining() == 0 {
                    break;
                }
            }
        };
        Ok(Streamed {
            run,
            n_batches,
            termination,
        })
    }

    /// Screen every batch against the initial model alone, keep what each
    /// batch run selects, then screen the kept columns together.
    fn stream_against_initial<'a, S: BatchSource>(
        &'a self,
        initial: &'a InitialModel,
        baseline: &Baseline,
        source: &mut S,
    ) -> Result<Streamed<'a, E>> {
        let nobs = initial.nobs();
        let pen_weight = self.config.resolved_pen_weight(nobs);
        let mut kept = SelectionState::new(nobs, pen_weight, usize::MAX);
        let mut history = Vec::new();
        let mut last_pen = None;
        let mut n_batches = 0;

        while let Some(batch) = source.next_batch()? {
            let batch_index = n_batches;
            n_batches += 1;

            let labels = batch.validate(batch_index, nobs)?;
            initial.check_disjoint(&labels)?;
            let ids: Vec<ColumnId> = (0..batch.ncols()).map(|j| ColumnId::new(batch_index, j)).collect();

            let budget = self.config.k_max_add.unwrap_or(batch.ncols()).min(batch.ncols());
            let mut run = Run::new(self, initial, baseline, budget, history);
            for _ in 0..self.config.rounds_per_batch {
                let added = run.round(batch.data().view(), &ids, &labels, Some(batch_index))?;
                if added == 0 || run.state.budget_remaining() == 0 {
                    break;
                }
            }

            for (i, (&id, name)) in run.state.ids().iter().zip(run.state.names()).enumerate() {
                let column = run.state.column(i).ok_or_else(|| {
                    GlmScreenError::DimensionMismatch(format!("selected column {} has no retained data", name))
                })?;
                kept.admit(id, name.clone(), column)?;
            }
            log::debug!("batch {}: kept {} columns, {} kept in total", batch_index, run.state.len(), kept.len());
            if run.last_pen.is_some() {
                last_pen = run.last_pen.take();
            }
            history = std::mem::take(&mut run.history);
        }

        let budget = self.config.k_max_add.unwrap_or(kept.len()).min(kept.len());
        let mut run = Run::new(self, initial, baseline, budget, history);
        if !kept.is_empty() {
            let block = kept.design_block();
            let ids = kept.ids().to_vec();
            let labels = kept.names().to_vec();
            for _ in 0..self.config.max_rounds {
                let added = run.round(block.view(), &ids, &labels, None)?;
                if added == 0 || run.state.budget_remaining() == 0 {
                    break;
                }
            }
            log::info!(
                "screen over {} kept columns from {} batches selected {}",
                kept.len(),
                n_batches,
                run.state.len()
            );
        }
        if run.last_pen.is_none() {
            run.last_pen = last_pen;
        }
        Ok(Streamed {
            run,
            n_batches,
            termination: Termination::SourceExhausted,
        })
    }
}

/// A finished pass over a batch source.
struct Streamed<'a, E> {
    run: Run<'a, E>,
    n_batches: usize,
    termination: Termination,
}

// =============================================================================
// One screening run
// =============================================================================

struct Run<'a, E> {
    estimator: &'a E,
    config: &'a ScreeningConfig,
    rule: InclusionRule,
    initial: &'a InitialModel,
    state: SelectionState,
    /// Coefficients of [initial exog | selected] from the latest fit.
    model_params: Array1<f64>,
    /// Pearson residuals of the latest fit, for candidate ranking.
    resid_pearson: Array1<f64>,
    last_pen: Option<FitResult>,
    history: Vec<RoundRecord>,
}

/// The fitted initial model every run starts from.
struct Baseline {
    params: Array1<f64>,
    resid_pearson: Array1<f64>,
}

impl Baseline {
    fn fit<E: Estimator>(screener: &Screener<E>, initial: &InitialModel) -> Result<Self> {
        let fit = screener
            .estimator
            .fit(&FitRequest::unpenalized(initial.endog(), initial.exog()))?;
        check_param_count(&fit, initial.exog().ncols())?;
        if !fit.converged {
            log::warn!("initial model did not converge; screening from its last iterate");
        }
        log::debug!(
            "initial model: {} columns, deviance {:.6}, pen_weight {}",
            initial.exog().ncols(),
            fit.diagnostics.deviance,
            screener.config.resolved_pen_weight(initial.nobs())
        );
        Ok(Self {
            params: fit.params,
            resid_pearson: fit.diagnostics.resid_pearson,
        })
    }
}

impl<'a, E: Estimator> Run<'a, E> {
    /// An empty selection on top of the initial model. Round records are
    /// appended to `history`.
    fn new(
        screener: &'a Screener<E>,
        initial: &'a InitialModel,
        baseline: &Baseline,
        budget: usize,
        history: Vec<RoundRecord>,
    ) -> Self {
        let config = &screener.config;
        let nobs = initial.nobs();
        Self {
            estimator: &screener.estimator,
            config,
            rule: InclusionRule::new(config.zero_tolerance),
            initial,
            state: SelectionState::new(nobs, config.resolved_pen_weight(nobs), budget),
            model_params: baseline.params.clone(),
            resid_pearson: baseline.resid_pearson.clone(),
            last_pen: None,
            history,
        }
    }

    /// One penalized fit + inclusion pass over `block`. Returns the number
    /// of columns admitted.
    fn round(
        &mut self,
        block: ArrayView2<'_, f64>,
        ids: &[ColumnId],
        labels: &[String],
        batch: Option<usize>,
    ) -> Result<usize> {
        let round = self.history.len();

        let mut positions: Vec<usize> = (0..block.ncols()).filter(|&j| !self.state.contains(ids[j])).collect();
        if positions.is_empty() {
            self.history.push(RoundRecord::skipped(round, batch));
            return Ok(0);
        }
        if let Some(k) = self.config.k_add {
            if k < positions.len() {
                let scores = ranking_scores(&self.resid_pearson, block);
                positions = top_k(&scores, &positions, k);
            }
        }

        let candidates = block.select(Axis(1), &positions);
        let candidate_ids: Vec<ColumnId> = positions.iter().map(|&j| ids[j]).collect();
        let selected = self.state.design_block();
        let exog: Array2<f64> = column_stack(&[self.initial.exog().view(), selected.view(), candidates.view()])?;

        let n_unpenalized = self.initial.exog().ncols() + self.state.len();
        let mut start = Array1::<f64>::zeros(exog.ncols());
        start.slice_mut(s![..n_unpenalized]).assign(&self.model_params);

        let request = FitRequest::penalized(self.initial.endog(), &exog, self.state.pen_weight(), n_unpenalized)
            .with_start_params(&start);
        let fit = self.estimator.fit(&request)?;
        check_param_count(&fit, exog.ncols())?;
        if !fit.converged {
            log::warn!(
                "round {}: penalized fit did not converge after {} iterations; using its coefficients",
                round,
                fit.diagnostics.iterations
            );
        }

        let candidate_params = fit.params.slice(s![n_unpenalized..]);
        let admitted = self.rule.admit(
            candidate_params,
            &candidate_ids,
            &self.state,
            self.state.budget_remaining(),
        );

        let mut params: Vec<f64> = fit.params.slice(s![..n_unpenalized]).to_vec();
        for &pos in &admitted {
            let name = labels[positions[pos]].clone();
            self.state.admit(candidate_ids[pos], name, candidates.column(pos))?;
            params.push(candidate_params[pos]);
        }
        self.model_params = Array1::from(params);

        log::info!(
            "round {}{}: {} candidates, {} admitted, {} selected, {} budget left",
            round,
            batch.map(|b| format!(" (batch {})", b)).unwrap_or_default(),
            candidate_ids.len(),
            admitted.len(),
            self.state.len(),
            self.state.budget_remaining()
        );

        self.history.push(RoundRecord {
            round,
            batch,
            n_candidates: candidate_ids.len(),
            admitted: admitted.iter().map(|&pos| candidate_ids[pos]).collect(),
            converged: fit.converged,
            skipped: false,
        });
        self.resid_pearson = fit.diagnostics.resid_pearson.clone();
        self.last_pen = Some(fit);
        Ok(admitted.len())
    }

    /// Unpenalized fit on [initial exog | selected], warm-started from the
    /// current model.
    fn final_refit(&self) -> Result<FitResult> {
        let selected = self.state.design_block();
        let exog = column_stack(&[self.initial.exog().view(), selected.view()])?;
        let request = FitRequest::unpenalized(self.initial.endog(), &exog).with_start_params(&self.model_params);
        let fit = self.estimator.fit(&request)?;
        check_param_count(&fit, exog.ncols())?;

        if fit.converged {
            log::info!(
                "final refit converged in {} iterations, deviance {:.6}",
                fit.diagnostics.iterations,
                fit.diagnostics.deviance
            );
        } else {
            log::warn!(
                "final refit on {} columns did not converge after {} iterations",
                exog.ncols(),
                fit.diagnostics.iterations
            );
        }
        Ok(fit)
    }
}

/// Estimators are external; make sure one did not return a short vector.
fn check_param_count(fit: &FitResult, expected: usize) -> Result<()> {
    if fit.params.len() != expected {
        return Err(GlmScreenError::DimensionMismatch(format!(
            "estimator returned {} parameters for {} design columns",
            fit.params.len(),
            expected
        )));
    }
    Ok(())
}
