use ndarray::Array1;

use crate::families::Family;

/// Pearson residuals (y - μ) / √V(μ).
pub fn resid_pearson(y: &Array1<f64>, mu: &Array1<f64>, family: &dyn Family) -> Array1<f64> {
    let variance = family.variance(mu);
    y.iter()
        .zip(mu.iter())
        .zip(variance.iter())
        .map(|((&yi, &mi), &v)| if v > 0.0 { (yi - mi) / v.sqrt() } else { 0.0 })
        .collect()
}
