// Score ranking of candidates: |x_jᵀ r| with r the Pearson residuals of the
// current model. Only used when `ScreeningConfig::k_add` limits how many
// candidates enter a round.

use ndarray::{Array1, ArrayView2};

/// |x_jᵀ r| for every column of `block`.
pub fn ranking_scores(resid_pearson: &Array1<f64>, block: ArrayView2<'_, f64>) -> Array1<f64> {
    block.t().dot(resid_pearson).mapv(f64::abs)
}

/// The `k` best of `positions` by descending score; ties go to the lower
/// position. Returned in ascending position order.
pub fn top_k(scores: &Array1<f64>, positions: &[usize], k: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = positions.to_vec();
    ranked.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    ranked.truncate(k);
    ranked.sort_unstable();
    ranked
}
