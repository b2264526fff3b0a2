// =============================================================================
// Family and Link Function Python Wrappers
// =============================================================================
//
// Thin wrappers so Python can inspect the families and links the screener
// fits with, plus the name → trait object dispatch used by the entry points.
// =============================================================================

use pyo3::prelude::*;
use pyo3::exceptions::PyValueError;
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};

use glmscreen_core::families::{Family, GaussianFamily, PoissonFamily, BinomialFamily};
use glmscreen_core::links::{Link, IdentityLink, LogLink, LogitLink};

// =============================================================================
// Family and Link Helper Functions
// =============================================================================

/// Get a Family trait object from a family name string (case-insensitive).
pub(crate) fn family_from_name(name: &str) -> PyResult<Box<dyn Family>> {
    match name.to_lowercase().as_str() {
        "gaussian" | "normal" => Ok(Box::new(GaussianFamily)),
        "poisson" => Ok(Box::new(PoissonFamily)),
        "binomial" | "logistic" => Ok(Box::new(BinomialFamily)),
        _ => Err(PyValueError::new_err(format!(
            "Unknown family '{}'. Use 'gaussian', 'poisson', or 'binomial'.", name
        ))),
    }
}

/// Get a Link trait object from a link name string.
pub(crate) fn link_from_name(name: &str) -> PyResult<Box<dyn Link>> {
    match name.to_lowercase().as_str() {
        "identity" => Ok(Box::new(IdentityLink)),
        "log" => Ok(Box::new(LogLink)),
        "logit" => Ok(Box::new(LogitLink)),
        _ => Err(PyValueError::new_err(format!(
            "Unknown link '{}'. Use 'identity', 'log', or 'logit'.", name
        ))),
    }
}

/// Canonical link for a family name.
pub(crate) fn default_link_name(family: &str) -> &'static str {
    match family.to_lowercase().as_str() {
        "gaussian" | "normal" => "identity",
        "binomial" | "logistic" => "logit",
        _ => "log",
    }
}

// =============================================================================
// Link Function Wrappers (Macro-Generated)
// =============================================================================

macro_rules! impl_py_link {
    ($py_name:ident, $py_str:literal, $inner_type:ty, $inner_expr:expr) => {
        #[pyclass(name = $py_str)]
        #[derive(Clone)]
        pub struct $py_name {
            inner: $inner_type,
        }

        #[pymethods]
        impl $py_name {
            #[new]
            pub fn new() -> Self {
                Self { inner: $inner_expr }
            }

            fn name(&self) -> &str {
                self.inner.name()
            }

            fn link<'py>(&self, py: Python<'py>, mu: PyReadonlyArray1<f64>) -> Bound<'py, PyArray1<f64>> {
                self.inner.link(&mu.as_array().to_owned()).into_pyarray_bound(py)
            }

            fn inverse<'py>(&self, py: Python<'py>, eta: PyReadonlyArray1<f64>) -> Bound<'py, PyArray1<f64>> {
                self.inner.inverse(&eta.as_array().to_owned()).into_pyarray_bound(py)
            }

            fn derivative<'py>(&self, py: Python<'py>, mu: PyReadonlyArray1<f64>) -> Bound<'py, PyArray1<f64>> {
                self.inner.derivative(&mu.as_array().to_owned()).into_pyarray_bound(py)
            }
        }
    };
}

impl_py_link!(PyIdentityLink, "IdentityLink", IdentityLink, IdentityLink);
impl_py_link!(PyLogLink, "LogLink", LogLink, LogLink);
impl_py_link!(PyLogitLink, "LogitLink", LogitLink, LogitLink);

// =============================================================================
// Family Wrappers (Macro-Generated)
// =============================================================================

macro_rules! impl_py_family {
    ($py_name:ident, $py_str:literal, $inner_type:ty, $inner_expr:expr, $default_link:ty) => {
        #[pyclass(name = $py_str)]
        #[derive(Clone)]
        pub struct $py_name {
            inner: $inner_type,
        }

        #[pymethods]
        impl $py_name {
            #[new]
            fn new() -> Self {
                Self { inner: $inner_expr }
            }

            fn name(&self) -> &str {
                self.inner.name()
            }

            fn variance<'py>(&self, py: Python<'py>, mu: PyReadonlyArray1<f64>) -> Bound<'py, PyArray1<f64>> {
                self.inner.variance(&mu.as_array().to_owned()).into_pyarray_bound(py)
            }

            fn unit_deviance<'py>(&self, py: Python<'py>, y: PyReadonlyArray1<f64>, mu: PyReadonlyArray1<f64>) -> Bound<'py, PyArray1<f64>> {
                self.inner.unit_deviance(&y.as_array().to_owned(), &mu.as_array().to_owned()).into_pyarray_bound(py)
            }

            fn deviance(&self, y: PyReadonlyArray1<f64>, mu: PyReadonlyArray1<f64>) -> f64 {
                self.inner.deviance(&y.as_array().to_owned(), &mu.as_array().to_owned(), None)
            }

            fn default_link(&self) -> $default_link {
                <$default_link>::new()
            }
        }
    };
}

impl_py_family!(PyGaussianFamily, "GaussianFamily", GaussianFamily, GaussianFamily, PyIdentityLink);
impl_py_family!(PyPoissonFamily, "PoissonFamily", PoissonFamily, PoissonFamily, PyLogLink);
impl_py_family!(PyBinomialFamily, "BinomialFamily", BinomialFamily, BinomialFamily, PyLogitLink);
