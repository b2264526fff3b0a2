// =============================================================================
// Fit and Screening Results
// =============================================================================
//
// Python-side views of the core result types. They are copies: nothing here
// refers back to the screener that produced them.
// =============================================================================

use pyo3::prelude::*;
use numpy::{IntoPyArray, PyArray1, PyArray2};
use ndarray::Array2;

use glmscreen_core::estimator::FitResult;
use glmscreen_core::inference::confidence_interval_z;
use glmscreen_core::screening::{
    IteratorScreeningResult, RoundRecord, ScreeningResult, ScreeningStatus, Termination,
};

pub(crate) fn termination_name(t: Termination) -> &'static str {
    match t {
        Termination::FixedPoint => "fixed_point",
        Termination::MaxRounds => "max_rounds",
        Termination::BudgetExhausted => "budget_exhausted",
        Termination::SourceExhausted => "source_exhausted",
    }
}

fn status_name(s: ScreeningStatus) -> &'static str {
    match s {
        ScreeningStatus::Converged => "converged",
        ScreeningStatus::FinalNotConverged => "final_not_converged",
    }
}

// =============================================================================
// FitResults
// =============================================================================

/// One estimator fit: the final refit, or the last penalized screening fit.
#[pyclass(name = "FitResults")]
#[derive(Clone)]
pub struct PyFitResults {
    pub(crate) inner: FitResult,
}

impl From<FitResult> for PyFitResults {
    fn from(inner: FitResult) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyFitResults {
    /// Fitted coefficients, one per design column.
    #[getter]
    fn params<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.params.clone().into_pyarray_bound(py)
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    fn deviance(&self) -> f64 {
        self.inner.diagnostics.deviance
    }

    /// deviance / 2 plus the penalty (equals deviance / 2 when unpenalized).
    #[getter]
    fn penalized_objective(&self) -> f64 {
        self.inner.diagnostics.penalized_objective
    }

    #[getter]
    fn llf(&self) -> f64 {
        self.inner.diagnostics.llf
    }

    #[getter]
    fn iterations(&self) -> usize {
        self.inner.diagnostics.iterations
    }

    #[getter]
    fn scale(&self) -> f64 {
        self.inner.diagnostics.scale
    }

    /// Penalty strength of the fit, None for unpenalized fits.
    #[getter]
    fn pen_weight(&self) -> Option<f64> {
        self.inner.diagnostics.pen_weight
    }

    #[getter]
    fn fittedvalues<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.diagnostics.fitted_values.clone().into_pyarray_bound(py)
    }

    #[getter]
    fn resid_pearson<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.diagnostics.resid_pearson.clone().into_pyarray_bound(py)
    }

    /// Standard errors. Only meaningful for unpenalized fits.
    fn bse<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.bse().into_pyarray_bound(py)
    }

    fn tvalues<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.zvalues().into_pyarray_bound(py)
    }

    fn pvalues<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.pvalues().into_pyarray_bound(py)
    }

    /// Wald confidence intervals, shape (n_params, 2).
    #[pyo3(signature = (alpha=0.05))]
    fn conf_int<'py>(&self, py: Python<'py>, alpha: f64) -> Bound<'py, PyArray2<f64>> {
        let bse = self.inner.bse();
        let mut ci = Array2::zeros((self.inner.n_params(), 2));
        for (i, (&b, &se)) in self.inner.params.iter().zip(bse.iter()).enumerate() {
            let (lower, upper) = confidence_interval_z(b, se, 1.0 - alpha);
            ci[[i, 0]] = lower;
            ci[[i, 1]] = upper;
        }
        ci.into_pyarray_bound(py)
    }

    fn aic(&self) -> f64 {
        self.inner.aic()
    }

    fn bic(&self) -> f64 {
        self.inner.bic()
    }

    fn __repr__(&self) -> String {
        format!(
            "FitResults(n_params={}, converged={}, deviance={:.4})",
            self.inner.n_params(),
            self.inner.converged,
            self.inner.diagnostics.deviance
        )
    }
}

// =============================================================================
// Round history
// =============================================================================

fn history_to_py(py: Python<'_>, history: &[RoundRecord]) -> PyResult<Vec<PyObject>> {
    history
        .iter()
        .map(|r| {
            let dict = pyo3::types::PyDict::new_bound(py);
            dict.set_item("round", r.round)?;
            dict.set_item("batch", r.batch)?;
            dict.set_item("n_candidates", r.n_candidates)?;
            let admitted: Vec<(usize, usize)> = r.admitted.iter().map(|id| (id.batch, id.local)).collect();
            dict.set_item("admitted", admitted)?;
            dict.set_item("converged", r.converged)?;
            dict.set_item("skipped", r.skipped)?;
            Ok(dict.into_py(py))
        })
        .collect()
}

// =============================================================================
// ScreeningResults (in-memory)
// =============================================================================

#[pyclass(name = "ScreeningResults")]
#[derive(Clone)]
pub struct PyScreeningResults {
    pub(crate) inner: ScreeningResult,
}

#[pymethods]
impl PyScreeningResults {
    /// Positions of the selected candidates, discovery order.
    #[getter]
    fn idx_nonzero(&self) -> Vec<usize> {
        self.inner.idx_nonzero.clone()
    }

    #[getter]
    fn names(&self) -> Vec<String> {
        self.inner.names.clone()
    }

    /// Names of every parameter of `results_final`.
    #[getter]
    fn exog_names(&self) -> Vec<String> {
        self.inner.exog_names.clone()
    }

    #[getter]
    fn results_final(&self) -> PyFitResults {
        self.inner.results_final.clone().into()
    }

    #[getter]
    fn results_pen(&self) -> PyFitResults {
        self.inner.results_pen.clone().into()
    }

    #[getter]
    fn status(&self) -> &'static str {
        status_name(self.inner.status)
    }

    #[getter]
    fn termination(&self) -> &'static str {
        termination_name(self.inner.termination)
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.is_success()
    }

    fn history(&self, py: Python<'_>) -> PyResult<Vec<PyObject>> {
        history_to_py(py, &self.inner.history)
    }

    fn __repr__(&self) -> String {
        format!(
            "ScreeningResults(selected={}, rounds={}, termination={}, status={})",
            self.inner.idx_nonzero.len(),
            self.inner.n_rounds(),
            termination_name(self.inner.termination),
            status_name(self.inner.status)
        )
    }
}

// =============================================================================
// IteratorScreeningResults (streaming)
// =============================================================================

#[pyclass(name = "IteratorScreeningResults")]
#[derive(Clone)]
pub struct PyIteratorScreeningResults {
    pub(crate) inner: IteratorScreeningResult,
}

#[pymethods]
impl PyIteratorScreeningResults {
    #[getter]
    fn exog_final_names(&self) -> Vec<String> {
        self.inner.exog_final_names.clone()
    }

    /// (n_selected, 2) array of [batch, column within batch].
    #[getter]
    fn idx_nonzero_batches<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<i64>> {
        let pairs = &self.inner.idx_nonzero_batches;
        Array2::from_shape_fn((pairs.len(), 2), |(i, j)| pairs[i][j] as i64).into_pyarray_bound(py)
    }

    #[getter]
    fn exog_names(&self) -> Vec<String> {
        self.inner.exog_names.clone()
    }

    #[getter]
    fn results_final(&self) -> Option<PyFitResults> {
        self.inner.results_final.clone().map(Into::into)
    }

    #[getter]
    fn results_pen(&self) -> Option<PyFitResults> {
        self.inner.results_pen.clone().map(Into::into)
    }

    #[getter]
    fn status(&self) -> Option<&'static str> {
        self.inner.status.map(status_name)
    }

    #[getter]
    fn termination(&self) -> &'static str {
        termination_name(self.inner.termination)
    }

    #[getter]
    fn n_batches(&self) -> usize {
        self.inner.n_batches
    }

    fn history(&self, py: Python<'_>) -> PyResult<Vec<PyObject>> {
        history_to_py(py, &self.inner.history)
    }

    fn __repr__(&self) -> String {
        format!(
            "IteratorScreeningResults(selected={}, batches={}, termination={})",
            self.inner.exog_final_names.len(),
            self.inner.n_batches,
            termination_name(self.inner.termination)
        )
    }
}
