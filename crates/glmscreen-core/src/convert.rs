// =============================================================================
// ndarray ↔ nalgebra Conversion and Design Assembly
// =============================================================================
//
// Data lives in ndarray (column slices, concatenation, the Python boundary);
// dense factorizations go through nalgebra. Everything that crosses between
// the two goes through this module.
//
// =============================================================================

use nalgebra::{DMatrix, DVector};
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};

use crate::error::{GlmScreenError, Result};

// =============================================================================
// nalgebra → ndarray
// =============================================================================

#[inline]
pub fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(m.shape(), |(i, j)| m[(i, j)])
}

#[inline]
pub fn to_array1(v: &DVector<f64>) -> Array1<f64> {
    v.iter().copied().collect()
}

// =============================================================================
// Linear algebra
// =============================================================================

/// Solve A x = b for symmetric A and also return A⁻¹.
///
/// Cholesky first; LU when A is not numerically positive definite.
/// Returns None if A is singular.
pub fn solve_and_invert(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
    let p = a.nrows();
    if let Some(chol) = a.clone().cholesky() {
        let x = chol.solve(b);
        let inv = chol.solve(&DMatrix::identity(p, p));
        return Some((to_array1(&x), to_array2(&inv)));
    }
    let lu = a.clone().lu();
    let x = lu.solve(b)?;
    let inv = lu.try_inverse()?;
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some((to_array1(&x), to_array2(&inv)))
}

// =============================================================================
// Design matrix assembly
// =============================================================================

/// Stack column blocks side by side: [A | B | C ...].
///
/// Empty blocks (zero columns) are allowed; all blocks must share a row count.
pub fn column_stack(blocks: &[ArrayView2<'_, f64>]) -> Result<Array2<f64>> {
    let nrows = match blocks.first() {
        Some(b) => b.nrows(),
        None => return Err(GlmScreenError::EmptyInput("no column blocks to stack".to_string())),
    };
    if let Some(bad) = blocks.iter().find(|b| b.nrows() != nrows) {
        return Err(GlmScreenError::DimensionMismatch(format!(
            "column block has {} rows, expected {}",
            bad.nrows(),
            nrows
        )));
    }
    concatenate(Axis(1), blocks).map_err(|e| GlmScreenError::DimensionMismatch(e.to_string()))
}
