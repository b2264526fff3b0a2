// =============================================================================
// Screening Entry Points (Python Bindings)
// =============================================================================
//
// - screen_exog_py:          in-memory screening of a candidate matrix
// - screen_exog_iterator_py: streaming screening of any Python iterable of
//                            candidate matrices (or (matrix, names) pairs)
//
// The Python iterable is wrapped as a `BatchSource`, so the core pulls from
// it one batch at a time. When the selection budget runs out, generators are
// closed instead of being read to the end, and so are they when a run fails.
// =============================================================================

use pyo3::prelude::*;
use pyo3::exceptions::PyValueError;
use pyo3::types::PyIterator;
use numpy::{PyReadonlyArray1, PyReadonlyArray2};
use ndarray::{Array1, Array2};

use glmscreen_core::error::GlmScreenError;
use glmscreen_core::estimator::GlmEstimator;
use glmscreen_core::regularization::Penalty;
use glmscreen_core::screening::{
    BatchContext, BatchSource, CandidateBatch, CandidatePool, InitialModel, Screener, ScreeningConfig,
};

use crate::fitting_py::with_iteration_limits;
use crate::families_py::{default_link_name, family_from_name, link_from_name};
use crate::results_py::{PyIteratorScreeningResults, PyScreeningResults};

fn to_py_err(e: GlmScreenError) -> PyErr {
    PyValueError::new_err(format!("screening failed: {}", e))
}

/// Build the initial model. Intercept-only when no exog is given.
fn initial_model(
    y: PyReadonlyArray1<f64>,
    exog_initial: Option<PyReadonlyArray2<f64>>,
    initial_names: Option<Vec<String>>,
) -> PyResult<InitialModel> {
    let y_array: Array1<f64> = y.as_array().to_owned();
    let model = match (exog_initial, initial_names) {
        (Some(x), Some(names)) => InitialModel::with_labels(y_array, x.as_array().to_owned(), names),
        (Some(x), None) => InitialModel::new(y_array, x.as_array().to_owned()),
        (None, Some(names)) => InitialModel::intercept_only(y_array).and_then(|m| m.with_names(names)),
        (None, None) => InitialModel::intercept_only(y_array),
    };
    model.map_err(to_py_err)
}

fn build_estimator(
    family: &str,
    link: Option<&str>,
    penalty: &str,
    max_iter: usize,
    pen_max_iter: usize,
    tol: f64,
) -> PyResult<GlmEstimator> {
    let fam = family_from_name(family)?;
    let lnk = link_from_name(link.unwrap_or(default_link_name(family)))?;
    let penalty = match penalty.to_lowercase().as_str() {
        "scad_smoothed" | "scadsmoothed" => Penalty::default(),
        "scad" => Penalty::scad(0.1),
        "l2" | "ridge" => Penalty::L2,
        other => {
            return Err(PyValueError::new_err(format!(
                "Unknown penalty '{}'. Use 'scad_smoothed', 'scad', or 'l2'.", other
            )))
        }
    };
    let estimator = GlmEstimator::new(fam, lnk).with_penalty(penalty);
    Ok(with_iteration_limits(estimator, max_iter, pen_max_iter, tol))
}

fn batch_context_from_name(name: &str) -> PyResult<BatchContext> {
    match name.to_lowercase().as_str() {
        "selected" => Ok(BatchContext::Selected),
        "initial" => Ok(BatchContext::Initial),
        other => Err(PyValueError::new_err(format!(
            "Unknown batch_context '{}'. Use 'selected' or 'initial'.", other
        ))),
    }
}

// =============================================================================
// Python iterable → BatchSource
// =============================================================================

struct PyBatchSource<'py> {
    iter: Bound<'py, PyIterator>,
}

impl PyBatchSource<'_> {
    fn extract_batch(item: &Bound<'_, PyAny>) -> PyResult<CandidateBatch> {
        if let Ok((data, names)) = item.extract::<(PyReadonlyArray2<f64>, Vec<String>)>() {
            let data: Array2<f64> = data.as_array().to_owned();
            return CandidateBatch::with_names(data, names).map_err(to_py_err);
        }
        let data: PyReadonlyArray2<f64> = item.extract()?;
        Ok(CandidateBatch::new(data.as_array().to_owned()))
    }
}

impl BatchSource for PyBatchSource<'_> {
    fn next_batch(&mut self) -> glmscreen_core::Result<Option<CandidateBatch>> {
        match self.iter.next() {
            None => Ok(None),
            Some(item) => item
                .and_then(|obj| Self::extract_batch(&obj))
                .map(Some)
                .map_err(|e| GlmScreenError::Source(e.to_string())),
        }
    }

    fn release(&mut self) -> glmscreen_core::Result<usize> {
        if self.iter.hasattr("close").unwrap_or(false) {
            self.iter
                .call_method0("close")
                .map_err(|e| GlmScreenError::Source(e.to_string()))?;
            return Ok(0);
        }
        let mut drained = 0;
        while self.next_batch()?.is_some() {
            drained += 1;
        }
        Ok(drained)
    }
}

// =============================================================================
// screen_exog_py
// =============================================================================

#[pyfunction]
#[pyo3(signature = (y, exog_candidates, exog_initial=None, names=None, initial_names=None, family="poisson", link=None, penalty="scad_smoothed", pen_weight=None, max_rounds=10, k_max_add=None, zero_tolerance=1e-4, k_add=None, max_iter=25, pen_max_iter=200, tol=1e-8))]
#[allow(clippy::too_many_arguments)]
pub fn screen_exog_py(
    py: Python<'_>,
    y: PyReadonlyArray1<f64>,
    exog_candidates: PyReadonlyArray2<f64>,
    exog_initial: Option<PyReadonlyArray2<f64>>,
    names: Option<Vec<String>>,
    initial_names: Option<Vec<String>>,
    family: &str,
    link: Option<&str>,
    penalty: &str,
    pen_weight: Option<f64>,
    max_rounds: usize,
    k_max_add: Option<usize>,
    zero_tolerance: f64,
    k_add: Option<usize>,
    max_iter: usize,
    pen_max_iter: usize,
    tol: f64,
) -> PyResult<PyScreeningResults> {
    let initial = initial_model(y, exog_initial, initial_names)?;
    let data: Array2<f64> = exog_candidates.as_array().to_owned();
    let pool = match names {
        Some(names) => CandidatePool::with_names(data, names).map_err(to_py_err)?,
        None => CandidatePool::new(data),
    };

    let config = ScreeningConfig {
        pen_weight,
        max_rounds,
        k_max_add,
        zero_tolerance,
        k_add,
        ..ScreeningConfig::default()
    };
    let estimator = build_estimator(family, link, penalty, max_iter, pen_max_iter, tol)?;
    let screener = Screener::new(estimator, config).map_err(to_py_err)?;

    // Nothing Python-side is touched while screening an in-memory pool.
    let result = py
        .allow_threads(|| screener.screen(&initial, &pool))
        .map_err(to_py_err)?;
    Ok(PyScreeningResults { inner: result })
}

// =============================================================================
// screen_exog_iterator_py
// =============================================================================

#[pyfunction]
#[pyo3(signature = (y, batches, exog_initial=None, initial_names=None, family="poisson", link=None, penalty="scad_smoothed", pen_weight=None, k_max_add=None, zero_tolerance=1e-4, k_add=None, max_rounds=10, rounds_per_batch=1, refit_final=true, batch_context="selected", max_iter=25, pen_max_iter=200, tol=1e-8))]
#[allow(clippy::too_many_arguments)]
pub fn screen_exog_iterator_py(
    y: PyReadonlyArray1<f64>,
    batches: &Bound<'_, PyAny>,
    exog_initial: Option<PyReadonlyArray2<f64>>,
    initial_names: Option<Vec<String>>,
    family: &str,
    link: Option<&str>,
    penalty: &str,
    pen_weight: Option<f64>,
    k_max_add: Option<usize>,
    zero_tolerance: f64,
    k_add: Option<usize>,
    max_rounds: usize,
    rounds_per_batch: usize,
    refit_final: bool,
    batch_context: &str,
    max_iter: usize,
    pen_max_iter: usize,
    tol: f64,
) -> PyResult<PyIteratorScreeningResults> {
    let initial = initial_model(y, exog_initial, initial_names)?;
    let config = ScreeningConfig {
        pen_weight,
        k_max_add,
        zero_tolerance,
        k_add,
        max_rounds,
        rounds_per_batch,
        refit_final,
        batch_context: batch_context_from_name(batch_context)?,
    };
    let estimator = build_estimator(family, link, penalty, max_iter, pen_max_iter, tol)?;
    let screener = Screener::new(estimator, config).map_err(to_py_err)?;

    let source = PyBatchSource { iter: batches.iter()? };
    let result = screener.screen_iter(&initial, source).map_err(to_py_err)?;
    Ok(PyIteratorScreeningResults { inner: result })
}
