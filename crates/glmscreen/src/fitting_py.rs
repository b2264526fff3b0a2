// =============================================================================
// GLM Fitting (Python Bindings)
// =============================================================================
//
// Direct access to the estimator the screener uses, for oracle fits and for
// checking a screening result by hand:
// - fit_glm_py: unpenalized, or penalized on all but the leading columns
// =============================================================================

use pyo3::prelude::*;
use pyo3::exceptions::PyValueError;
use numpy::{PyReadonlyArray1, PyReadonlyArray2};
use ndarray::{Array1, Array2};

use glmscreen_core::estimator::{Estimator, FitRequest, GlmEstimator};
use glmscreen_core::solvers::IRLSConfig;

use crate::families_py::{default_link_name, family_from_name, link_from_name};
use crate::results_py::PyFitResults;

/// `max_iter` bounds unpenalized fits, `pen_max_iter` penalized ones; `tol`
/// applies to both.
pub(crate) fn with_iteration_limits(estimator: GlmEstimator, max_iter: usize, pen_max_iter: usize, tol: f64) -> GlmEstimator {
    estimator
        .with_config(IRLSConfig { max_iterations: max_iter, tolerance: tol, ..IRLSConfig::default() })
        .with_penalized_config(IRLSConfig { max_iterations: pen_max_iter, tolerance: tol, ..IRLSConfig::penalized() })
}

#[pyfunction]
#[pyo3(signature = (y, x, family="poisson", link=None, pen_weight=None, n_unpenalized=1, start_params=None, max_iter=25, pen_max_iter=200, tol=1e-8))]
#[allow(clippy::too_many_arguments)]
pub fn fit_glm_py(
    y: PyReadonlyArray1<f64>, x: PyReadonlyArray2<f64>,
    family: &str, link: Option<&str>,
    pen_weight: Option<f64>, n_unpenalized: usize,
    start_params: Option<PyReadonlyArray1<f64>>,
    max_iter: usize, pen_max_iter: usize, tol: f64,
) -> PyResult<PyFitResults> {
    let y_array: Array1<f64> = y.as_array().to_owned();
    let x_array: Array2<f64> = x.as_array().to_owned();
    let start: Option<Array1<f64>> = start_params.map(|s| s.as_array().to_owned());

    if n_unpenalized > x_array.ncols() {
        return Err(PyValueError::new_err(format!(
            "n_unpenalized = {} exceeds the {} columns of x", n_unpenalized, x_array.ncols()
        )));
    }

    let fam = family_from_name(family)?;
    let lnk = link_from_name(link.unwrap_or(default_link_name(family)))?;
    let estimator = with_iteration_limits(GlmEstimator::new(fam, lnk), max_iter, pen_max_iter, tol);

    let mut request = match pen_weight {
        Some(w) => FitRequest::penalized(&y_array, &x_array, w, n_unpenalized),
        None => FitRequest::unpenalized(&y_array, &x_array),
    };
    if let Some(s) = start.as_ref() {
        request = request.with_start_params(s);
    }

    let result = estimator
        .fit(&request)
        .map_err(|e| PyValueError::new_err(format!("GLM fitting failed: {}", e)))?;
    Ok(result.into())
}
