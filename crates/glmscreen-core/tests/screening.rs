// End-to-end screening on simulated Poisson data.

mod common;

use std::collections::HashSet;

use approx::assert_abs_diff_eq;
use glmscreen_core::{
    BatchContext, BatchSource, CandidateBatch, CandidatePool, Estimator, FitRequest, FitResult, GlmEstimator, GlmScreenError,
    IRLSConfig, InitialModel, IterSource, ResultIterSource, Screener, ScreeningConfig, ScreeningStatus, Termination,
};
use ndarray::Array2;

use common::{
    init_logging, simulate_correlated_pool, simulate_correlated_stream, simulate_pool, simulate_stream, tight_poisson,
    PoolData, StreamData,
};

fn recovery_data() -> PoolData {
    simulate_pool(987_865, 800, 200, 1.0, &[(20, 0.5), (75, 0.4), (140, 0.3)])
}

fn medium_data() -> PoolData {
    simulate_pool(20_240_611, 600, 100, 1.0, &[(5, 0.6), (30, 0.5), (60, 0.45)])
}

fn stream_data() -> StreamData {
    simulate_stream(987_865, 600, 1.0, &[0.5, 0.45, 0.4, 0.35])
}

fn screener(estimator: GlmEstimator, config: ScreeningConfig) -> Screener<GlmEstimator> {
    Screener::new(estimator, config).unwrap()
}

// =============================================================================
// In-memory screening
// =============================================================================

#[test]
fn test_recovers_true_set_and_matches_oracle() {
    init_logging();
    let data = recovery_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());

    let config = ScreeningConfig::default().with_pen_weight(nobs as f64 * 7.0);
    let result = screener(tight_poisson(), config).screen(&initial, &pool).unwrap();

    let mut found = result.idx_nonzero.clone();
    found.sort_unstable();
    assert_eq!(found, data.true_positions());
    assert_eq!(result.termination, Termination::FixedPoint);
    assert!(result.results_final.converged);
    assert!(result.is_success());

    let oracle = tight_poisson()
        .fit(&FitRequest::unpenalized(&data.y, &data.oracle_design()))
        .unwrap();
    assert!(oracle.converged);

    let final_params = &result.results_final.params;
    assert_abs_diff_eq!(final_params[0], oracle.params[0], epsilon = 1e-5);
    for (i, pos) in result.idx_nonzero.iter().enumerate() {
        let k = data.true_positions().iter().position(|p| p == pos).unwrap();
        assert_abs_diff_eq!(final_params[i + 1], oracle.params[k + 1], epsilon = 1e-5);
    }
}

#[test]
fn test_result_labels_follow_discovery_order() {
    let data = medium_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let config = ScreeningConfig::default().with_pen_weight(nobs as f64 * 10.0);
    let result = screener(GlmEstimator::poisson(), config).screen(&initial, &pool).unwrap();

    let expected: Vec<String> = result.idx_nonzero.iter().map(|j| format!("var{}", j)).collect();
    assert_eq!(result.names, expected);
    assert_eq!(result.exog_names[0], "const");
    assert_eq!(&result.exog_names[1..], &result.names[..]);
    assert_eq!(result.results_final.n_params(), result.exog_names.len());

    let admitted: Vec<usize> = result
        .history
        .iter()
        .flat_map(|r| r.admitted.iter().map(|id| id.local))
        .collect();
    assert_eq!(admitted, result.idx_nonzero);
}

#[test]
fn test_screening_is_deterministic() {
    let data = medium_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let s = screener(
        GlmEstimator::poisson(),
        ScreeningConfig::default().with_pen_weight(nobs as f64 * 10.0),
    );

    let first = s.screen(&initial, &pool).unwrap();
    let second = s.screen(&initial, &pool).unwrap();
    assert_eq!(first.idx_nonzero, second.idx_nonzero);
    assert_eq!(first.names, second.names);
    assert_eq!(first.results_final.params, second.results_final.params);
}

#[test]
fn test_budget_is_respected() {
    let data = medium_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let config = ScreeningConfig::default()
        .with_pen_weight(nobs as f64 * 10.0)
        .with_k_max_add(2);
    let result = screener(GlmEstimator::poisson(), config).screen(&initial, &pool).unwrap();

    assert_eq!(result.idx_nonzero.len(), 2);
    assert_eq!(result.termination, Termination::BudgetExhausted);
    let unique: HashSet<usize> = result.idx_nonzero.iter().copied().collect();
    assert_eq!(unique.len(), 2);
    assert!(result.results_final.converged);
}

#[test]
fn test_round_limit_stops_with_candidates_left() {
    let data = medium_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let config = ScreeningConfig::default()
        .with_pen_weight(nobs as f64 * 10.0)
        .with_max_rounds(1);
    let result = screener(GlmEstimator::poisson(), config).screen(&initial, &pool).unwrap();

    assert_eq!(result.termination, Termination::MaxRounds);
    assert_eq!(result.history.len(), 1);
    assert!(!result.idx_nonzero.is_empty());
    assert_eq!(result.history[0].admitted.len(), result.idx_nonzero.len());
    assert!(result.results_final.converged);
}

#[test]
fn test_pure_noise_admits_few_columns() {
    let data = simulate_pool(7, 400, 80, 1.0, &[]);
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let result = screener(GlmEstimator::poisson(), ScreeningConfig::default())
        .screen(&initial, &pool)
        .unwrap();

    assert!(result.idx_nonzero.len() <= 2, "admitted {:?}", result.idx_nonzero);
    assert!(result.results_final.converged);
}

#[test]
fn test_k_add_limits_each_round() {
    let data = medium_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let config = ScreeningConfig::default()
        .with_pen_weight(nobs as f64 * 10.0)
        .with_k_add(10);
    let result = screener(GlmEstimator::poisson(), config).screen(&initial, &pool).unwrap();

    assert!(result.history.iter().all(|r| r.n_candidates <= 10));
    let mut found = result.idx_nonzero.clone();
    found.sort_unstable();
    assert_eq!(found, data.true_positions());
}

/// 499 correlated candidates for 100 observations. Each round fits the 60
/// best-scoring candidates; pen_weight = nobs × 12.
#[test]
fn test_correlated_pool_recovers_true_set_and_matches_oracle() {
    init_logging();
    let data = simulate_correlated_pool(987_865);
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.candidates());
    let config = ScreeningConfig::default()
        .with_pen_weight(nobs as f64 * 12.0)
        .with_k_add(60)
        .with_k_max_add(30);
    let result = screener(tight_poisson(), config).screen(&initial, &pool).unwrap();

    let mut found = result.idx_nonzero.clone();
    found.sort_unstable();
    assert_eq!(found, data.true_positions());
    assert_eq!(result.termination, Termination::FixedPoint);
    assert!(result.history.iter().all(|r| r.n_candidates <= 60));
    assert!(result.results_final.converged);

    let oracle = tight_poisson()
        .fit(&FitRequest::unpenalized(&data.y, &data.oracle_design()))
        .unwrap();
    let final_params = &result.results_final.params;
    assert_abs_diff_eq!(final_params[0], oracle.params[0], epsilon = 5e-6);
    for (i, pos) in result.idx_nonzero.iter().enumerate() {
        let k = data.true_positions().iter().position(|p| p == pos).unwrap();
        assert_abs_diff_eq!(final_params[i + 1], oracle.params[k + 1], epsilon = 5e-6);
    }
}

#[test]
fn test_unconverged_rounds_are_degraded_not_fatal() {
    let data = medium_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let estimator = GlmEstimator::poisson().with_penalized_config(IRLSConfig {
        max_iterations: 1,
        ..IRLSConfig::default()
    });
    let config = ScreeningConfig::default().with_pen_weight(nobs as f64 * 10.0);
    let result = screener(estimator, config).screen(&initial, &pool).unwrap();

    assert!(result.history[0].degraded());
}

/// Delegates to a GLM estimator but reports every unpenalized fit with more
/// than one column as not converged.
struct StubbornRefit(GlmEstimator);

impl Estimator for StubbornRefit {
    fn fit(&self, request: &FitRequest<'_>) -> glmscreen_core::Result<FitResult> {
        let mut fit = self.0.fit(request)?;
        if request.pen_weight.is_none() && request.exog.ncols() > 1 {
            fit.converged = false;
        }
        Ok(fit)
    }
}

#[test]
fn test_final_non_convergence_is_reported_not_raised() {
    let data = medium_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let config = ScreeningConfig::default().with_pen_weight(nobs as f64 * 10.0);
    let result = Screener::new(StubbornRefit(GlmEstimator::poisson()), config)
        .unwrap()
        .screen(&initial, &pool)
        .unwrap();

    assert!(!result.idx_nonzero.is_empty());
    assert_eq!(result.status, ScreeningStatus::FinalNotConverged);
    assert!(!result.is_success());
    assert!(result.results_final.params.iter().all(|p| p.is_finite()));
}

#[test]
fn test_pool_with_wrong_row_count_is_rejected() {
    let data = medium_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(Array2::zeros((10, 3)));
    let err = screener(GlmEstimator::poisson(), ScreeningConfig::default()).screen(&initial, &pool);
    assert!(matches!(err, Err(GlmScreenError::DimensionMismatch(_))));
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(Screener::new(GlmEstimator::poisson(), ScreeningConfig::default().with_max_rounds(0)).is_err());
}

// =============================================================================
// Streaming screening
// =============================================================================

/// Counts every pull; optionally closes instead of draining on release.
struct CountingSource<S> {
    inner: S,
    pulls: usize,
    close_on_release: bool,
    closed: bool,
}

impl<S: BatchSource> CountingSource<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            pulls: 0,
            close_on_release: false,
            closed: false,
        }
    }
}

impl<S: BatchSource> BatchSource for CountingSource<S> {
    fn next_batch(&mut self) -> glmscreen_core::Result<Option<CandidateBatch>> {
        assert!(!self.closed, "pulled from a closed source");
        self.pulls += 1;
        self.inner.next_batch()
    }

    fn release(&mut self) -> glmscreen_core::Result<usize> {
        if self.close_on_release {
            self.closed = true;
            return Ok(0);
        }
        let mut drained = 0;
        while self.next_batch()?.is_some() {
            drained += 1;
        }
        Ok(drained)
    }
}

fn stream_config(nobs: usize) -> ScreeningConfig {
    ScreeningConfig::default()
        .with_pen_weight(nobs as f64 * 8.0)
        .with_k_max_add(30)
}

#[test]
fn test_stream_recovers_planted_columns_in_batch_order() {
    init_logging();
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let s = screener(tight_poisson(), stream_config(data.nobs));
    let result = s.screen_iter(&initial, IterSource::new(data.batches())).unwrap();

    assert_eq!(result.exog_final_names, vec!["var0_10", "var1_10", "var2_10", "var3_10"]);
    assert_eq!(result.idx_nonzero_batches, vec![[0, 10], [1, 10], [2, 10], [3, 10]]);
    assert_eq!(result.termination, Termination::SourceExhausted);
    assert_eq!(result.n_batches, 6);

    let refit = result.results_final.as_ref().unwrap();
    assert!(refit.converged);
    assert_eq!(result.status, Some(ScreeningStatus::Converged));
    assert_eq!(result.exog_names, vec!["const", "var0_10", "var1_10", "var2_10", "var3_10"]);

    // the refit on retained data equals a direct fit on the planted columns
    let mut design = Array2::ones((data.nobs, 5));
    for (j, col) in data.signal_columns.iter().enumerate() {
        design.column_mut(j + 1).assign(col);
    }
    let oracle = tight_poisson().fit(&FitRequest::unpenalized(&data.y, &design)).unwrap();
    for j in 0..5 {
        assert_abs_diff_eq!(refit.params[j], oracle.params[j], epsilon = 1e-5);
    }
}

/// Correlated batches need every batch screened against the intercept alone:
/// next to an earlier signal, the noise of a later batch still carries part
/// of the remaining signals through their shared sum. pen_weight = nobs × 12.
fn initial_context_config(nobs: usize) -> ScreeningConfig {
    ScreeningConfig::default()
        .with_pen_weight(nobs as f64 * 12.0)
        .with_k_max_add(30)
        .with_rounds_per_batch(20)
        .with_max_rounds(20)
        .with_batch_context(BatchContext::Initial)
}

#[test]
fn test_correlated_stream_recovers_planted_columns() {
    init_logging();
    let data = simulate_correlated_stream(987_865);
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let mut source = CountingSource::new(IterSource::new(data.batches()));
    let result = screener(tight_poisson(), initial_context_config(data.nobs))
        .screen_iter(&initial, &mut source)
        .unwrap();

    assert_eq!(result.exog_final_names, vec!["var0_10", "var1_10", "var2_10", "var3_10"]);
    assert_eq!(result.idx_nonzero_batches, vec![[0, 10], [1, 10], [2, 10], [3, 10]]);
    assert_eq!(result.termination, Termination::SourceExhausted);
    assert_eq!(result.n_batches, 6);
    assert_eq!(source.pulls, 7);

    // the closing screen runs after the batch rounds
    let first_closing = result.history.iter().position(|r| r.batch.is_none()).unwrap();
    assert!(result.history[..first_closing].iter().all(|r| r.batch.is_some()));
    assert!(result.history[first_closing..].iter().all(|r| r.batch.is_none()));

    let refit = result.results_final.as_ref().unwrap();
    assert!(refit.converged);
    let oracle = tight_poisson().fit(&FitRequest::unpenalized(&data.y, &data.oracle_design())).unwrap();
    for j in 0..5 {
        assert_abs_diff_eq!(refit.params[j], oracle.params[j], epsilon = 1e-5);
    }
}

#[test]
fn test_initial_context_keeps_per_batch_budget_separate() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let config = stream_config(data.nobs)
        .with_k_max_add(2)
        .with_batch_context(BatchContext::Initial);
    let mut source = CountingSource::new(IterSource::new(data.batches()));
    let result = screener(GlmEstimator::poisson(), config)
        .screen_iter(&initial, &mut source)
        .unwrap();

    // every batch is read, and each batch run may admit its own planted column
    assert_eq!(source.pulls, 7);
    assert_eq!(result.termination, Termination::SourceExhausted);
    let per_batch: Vec<usize> = result
        .history
        .iter()
        .filter(|r| r.batch.is_some())
        .flat_map(|r| r.admitted.iter().map(|id| id.batch))
        .collect();
    assert!([0, 1, 2, 3].iter().all(|b| per_batch.contains(b)));
    // the closing screen is bound by k_max_add
    assert_eq!(result.idx_nonzero_batches.len(), 2);
}

#[test]
fn test_stream_reads_every_batch_exactly_once() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let mut source = CountingSource::new(IterSource::new(data.batches()));
    let result = screener(GlmEstimator::poisson(), stream_config(data.nobs))
        .screen_iter(&initial, &mut source)
        .unwrap();

    // six batches, then the end-of-stream signal
    assert_eq!(source.pulls, 7);
    assert_eq!(result.n_batches, 6);
    assert_eq!(result.history.len(), 6);
    assert_eq!(result.exog_final_names.len(), result.idx_nonzero_batches.len());
}

#[test]
fn test_exhausted_budget_drains_remaining_batches() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let config = ScreeningConfig::default()
        .with_pen_weight(data.nobs as f64 * 8.0)
        .with_k_max_add(1);
    let mut source = CountingSource::new(IterSource::new(data.batches()));
    let result = screener(GlmEstimator::poisson(), config)
        .screen_iter(&initial, &mut source)
        .unwrap();

    assert_eq!(result.idx_nonzero_batches, vec![[0, 10]]);
    assert_eq!(result.termination, Termination::BudgetExhausted);
    assert_eq!(result.n_batches, 6);
    assert_eq!(source.pulls, 7);
    let skipped: Vec<Option<usize>> = result.history.iter().filter(|r| r.skipped).map(|r| r.batch).collect();
    assert_eq!(skipped, vec![Some(1), Some(2), Some(3), Some(4), Some(5)]);
}

#[test]
fn test_exhausted_budget_can_close_source_early() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let config = ScreeningConfig::default()
        .with_pen_weight(data.nobs as f64 * 8.0)
        .with_k_max_add(1);
    let mut source = CountingSource::new(IterSource::new(data.batches()));
    source.close_on_release = true;
    let result = screener(GlmEstimator::poisson(), config)
        .screen_iter(&initial, &mut source)
        .unwrap();

    assert!(source.closed);
    assert_eq!(source.pulls, 1);
    assert_eq!(result.n_batches, 1);
    assert_eq!(result.exog_final_names, vec!["var0_10"]);
}

#[test]
fn test_pool_streamed_in_chunks_finds_same_columns() {
    let data = recovery_data();
    let nobs = data.y.len();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let pool = CandidatePool::new(data.x.clone());
    let config = ScreeningConfig::default().with_pen_weight(nobs as f64 * 7.0);
    let result = screener(GlmEstimator::poisson(), config)
        .screen_iter(&initial, pool.batches(50))
        .unwrap();

    let found: Vec<usize> = result.idx_nonzero_batches.iter().map(|[b, j]| b * 50 + j).collect();
    assert_eq!(found, data.true_positions());
    assert_eq!(result.exog_final_names, vec!["var20", "var75", "var140"]);
    assert_eq!(result.n_batches, 4);
}

#[test]
fn test_stream_without_refit() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let config = stream_config(data.nobs).with_refit_final(false);
    let result = screener(GlmEstimator::poisson(), config)
        .screen_iter(&initial, IterSource::new(data.batches()))
        .unwrap();

    assert!(result.results_final.is_none());
    assert!(result.status.is_none());
    assert!(result.is_success());
    assert!(result.results_pen.is_some());
}

#[test]
fn test_empty_source() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let result = screener(GlmEstimator::poisson(), stream_config(data.nobs))
        .screen_iter(&initial, IterSource::new(Vec::<CandidateBatch>::new()))
        .unwrap();

    assert!(result.exog_final_names.is_empty());
    assert_eq!(result.termination, Termination::SourceExhausted);
    assert!(result.results_pen.is_none());
    assert_eq!(result.results_final.map(|r| r.n_params()), Some(1));
}

#[test]
fn test_malformed_batch_aborts() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let batches = vec![CandidateBatch::new(Array2::zeros((data.nobs - 1, 3)))];
    let err = screener(GlmEstimator::poisson(), stream_config(data.nobs))
        .screen_iter(&initial, IterSource::new(batches));
    assert!(matches!(err, Err(GlmScreenError::MalformedBatch(_))));
}

#[test]
fn test_failed_stream_releases_source() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let s = screener(GlmEstimator::poisson(), stream_config(data.nobs));

    let mut batches: Vec<CandidateBatch> = data.batches().take(1).collect();
    batches.push(CandidateBatch::new(Array2::zeros((data.nobs - 1, 3))));
    batches.extend(data.batches().skip(2).take(2));
    let mut source = CountingSource::new(IterSource::new(batches));
    let err = s.screen_iter(&initial, &mut source);
    assert!(matches!(err, Err(GlmScreenError::MalformedBatch(_))));
    // two batches read, two drained, then the end-of-stream signal
    assert_eq!(source.pulls, 5);

    let bad = vec![CandidateBatch::new(Array2::zeros((data.nobs - 1, 3)))];
    let mut closing = CountingSource::new(IterSource::new(bad));
    closing.close_on_release = true;
    assert!(s.screen_iter(&initial, &mut closing).is_err());
    assert!(closing.closed);
    assert_eq!(closing.pulls, 1);
}

#[test]
fn test_duplicate_labels_in_batch_abort() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let batch = CandidateBatch::with_names(Array2::zeros((data.nobs, 2)), vec!["a".into(), "a".into()]).unwrap();
    let err = screener(GlmEstimator::poisson(), stream_config(data.nobs))
        .screen_iter(&initial, IterSource::new(vec![batch]));
    assert!(matches!(err, Err(GlmScreenError::DuplicateColumn(_))));
}

#[test]
fn test_source_error_propagates() {
    let data = stream_data();
    let initial = InitialModel::intercept_only(data.y.clone()).unwrap();
    let items = vec![Err(GlmScreenError::Source("disk went away".into()))];
    let err = screener(GlmEstimator::poisson(), stream_config(data.nobs))
        .screen_iter(&initial, ResultIterSource::new(items));
    assert!(matches!(err, Err(GlmScreenError::Source(_))));
}
