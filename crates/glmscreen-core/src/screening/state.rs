// =============================================================================
// Selection State
// =============================================================================
//
// Everything the loop has decided so far: which columns are in, under which
// labels, in which order, and how much budget is left.
//
// The column DATA is kept, not just the identity. In streaming mode the batch
// a column came from is gone once it has been processed, but every later
// penalized fit and the final refit still need that column. The data lives
// in one append-only column-major arena:
//
//     arena = [ col 0 (nobs values) | col 1 (nobs values) | ... ]
//
// indexed by discovery order, so the selected block of a design matrix is a
// single reshape of the arena.
//
// =============================================================================

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ShapeBuilder};

use crate::error::{GlmScreenError, Result};

/// Global identity of a candidate column: (batch index, column within batch).
/// The in-memory pool is batch 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId {
    pub batch: usize,
    pub local: usize,
}

impl ColumnId {
    pub fn new(batch: usize, local: usize) -> Self {
        Self { batch, local }
    }
}

/// Mutable state of one screening run.
#[derive(Debug, Clone)]
pub struct SelectionState {
    nobs: usize,
    ids: Vec<ColumnId>,
    names: Vec<String>,
    arena: Vec<f64>,
    seen_ids: HashSet<ColumnId>,
    seen_names: HashSet<String>,
    pen_weight: f64,
    budget_remaining: usize,
}

impl SelectionState {
    pub fn new(nobs: usize, pen_weight: f64, budget: usize) -> Self {
        Self {
            nobs,
            ids: Vec::new(),
            names: Vec::new(),
            arena: Vec::new(),
            seen_ids: HashSet::new(),
            seen_names: HashSet::new(),
            pen_weight,
            budget_remaining: budget,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn pen_weight(&self) -> f64 {
        self.pen_weight
    }

    pub fn budget_remaining(&self) -> usize {
        self.budget_remaining
    }

    /// Identities in discovery order.
    pub fn ids(&self) -> &[ColumnId] {
        &self.ids
    }

    /// Labels in discovery order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, id: ColumnId) -> bool {
        self.seen_ids.contains(&id)
    }

    /// Retained data of the i-th selected column, if there is one.
    pub fn column(&self, i: usize) -> Option<ArrayView1<'_, f64>> {
        let start = i.checked_mul(self.nobs)?;
        self.arena.get(start..start.checked_add(self.nobs)?).map(ArrayView1::from)
    }

    /// Append a column. Fails on a repeated identity or label, a column of
    /// the wrong length, or when no budget is left; the state is unchanged
    /// on failure.
    pub fn admit(&mut self, id: ColumnId, name: String, data: ArrayView1<'_, f64>) -> Result<()> {
        if self.budget_remaining == 0 {
            return Err(GlmScreenError::InvalidValue(format!(
                "no budget left to admit column {}",
                name
            )));
        }
        if data.len() != self.nobs {
            return Err(GlmScreenError::DimensionMismatch(format!(
                "column {} has {} values, expected {}",
                name,
                data.len(),
                self.nobs
            )));
        }
        if self.seen_ids.contains(&id) {
            return Err(GlmScreenError::DuplicateColumn(format!(
                "column ({}, {}) admitted twice",
                id.batch, id.local
            )));
        }
        if self.seen_names.contains(&name) {
            return Err(GlmScreenError::DuplicateColumn(format!(
                "label '{}' is already selected",
                name
            )));
        }

        self.arena.extend(data.iter().copied());
        self.seen_ids.insert(id);
        self.seen_names.insert(name.clone());
        self.ids.push(id);
        self.names.push(name);
        self.budget_remaining -= 1;
        Ok(())
    }

    /// The selected columns as an nobs × len matrix, discovery order.
    pub fn design_block(&self) -> Array2<f64> {
        let shape = (self.nobs, self.len()).f();
        Array2::from_shape_vec(shape, self.arena.clone())
            .unwrap_or_else(|_| Array2::zeros((self.nobs, 0)))
    }
}
