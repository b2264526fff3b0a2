// =============================================================================
// Inclusion Rule
// =============================================================================
//
// Under the screening penalty a truly irrelevant column ends up with a
// coefficient that is zero up to the smoothing of the penalty, while a column
// that carries signal ends up clearly away from zero. The rule is therefore a
// plain absolute threshold:
//
//     admit j  ⇔  |β̂ⱼ| > zero_tolerance
//
// The threshold is configuration; what counts as "clearly away from zero"
// depends on the penalty and on the scale of the columns.
//
// Admission order is the order of the candidates' identities (lowest batch,
// then lowest column first), independent of the order the working design
// happened to list them in, and is cut off when the budget runs out.
//
// =============================================================================

use ndarray::ArrayView1;

use super::state::{ColumnId, SelectionState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InclusionRule {
    zero_tolerance: f64,
}

impl InclusionRule {
    pub fn new(zero_tolerance: f64) -> Self {
        Self { zero_tolerance }
    }

    pub fn zero_tolerance(&self) -> f64 {
        self.zero_tolerance
    }

    pub fn is_nonzero(&self, coef: f64) -> bool {
        coef.abs() > self.zero_tolerance
    }

    /// Decide which working candidates enter the model.
    ///
    /// `params` holds the penalized coefficients of the candidate block,
    /// aligned with `candidates`. Returns positions into `candidates`, in
    /// admission order, at most `budget` of them. Candidates already in
    /// `state` are never returned.
    pub fn admit(
        &self,
        params: ArrayView1<'_, f64>,
        candidates: &[ColumnId],
        state: &SelectionState,
        budget: usize,
    ) -> Vec<usize> {
        let mut qualifying: Vec<usize> = candidates
            .iter()
            .zip(params.iter())
            .enumerate()
            .filter(|(_, (id, coef))| !state.contains(**id) && self.is_nonzero(**coef))
            .map(|(pos, _)| pos)
            .collect();

        qualifying.sort_by_key(|&pos| candidates[pos]);
        qualifying.truncate(budget);
        qualifying
    }
}
