// =============================================================================
// glmscreen Python Bindings
// =============================================================================
//
// This module creates the bridge between Rust and Python using PyO3.
// It wraps the pure Rust code from `glmscreen-core` and exposes it as
// a Python module that can be imported with `import glmscreen`.
//
// STRUCTURE:
// ----------
// - families_py:  family / link classes and name dispatch
// - fitting_py:   single GLM fits (oracle fits, manual checks)
// - screening_py: screen_exog and screen_exog_iterator
// - results_py:   result classes
//
// FOR MAINTAINERS:
// ----------------
// When adding new functionality:
// 1. Implement the logic in `glmscreen-core` first
// 2. Create a Python wrapper here that calls the Rust code
// 3. Add it to the module in the `_glmscreen` function at the bottom
//
// =============================================================================

use pyo3::prelude::*;

mod families_py;
mod fitting_py;
mod results_py;
mod screening_py;

use families_py::{
    PyBinomialFamily, PyGaussianFamily, PyIdentityLink, PyLogLink, PyLogitLink, PyPoissonFamily,
};
use fitting_py::fit_glm_py;
use results_py::{PyFitResults, PyIteratorScreeningResults, PyScreeningResults};
use screening_py::{screen_exog_iterator_py, screen_exog_py};

// =============================================================================
// Module Registration
// =============================================================================

/// glmscreen: forward variable screening for penalized GLMs
///
/// This is the internal Rust module. Users should import from the
/// Python wrapper: `import glmscreen`
#[pymodule]
fn _glmscreen(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Links and families
    m.add_class::<PyIdentityLink>()?;
    m.add_class::<PyLogLink>()?;
    m.add_class::<PyLogitLink>()?;
    m.add_class::<PyGaussianFamily>()?;
    m.add_class::<PyPoissonFamily>()?;
    m.add_class::<PyBinomialFamily>()?;

    // Results
    m.add_class::<PyFitResults>()?;
    m.add_class::<PyScreeningResults>()?;
    m.add_class::<PyIteratorScreeningResults>()?;

    // Entry points
    m.add_function(wrap_pyfunction!(fit_glm_py, m)?)?;
    m.add_function(wrap_pyfunction!(screen_exog_py, m)?)?;
    m.add_function(wrap_pyfunction!(screen_exog_iterator_py, m)?)?;

    Ok(())
}
