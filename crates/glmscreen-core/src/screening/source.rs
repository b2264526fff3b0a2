// =============================================================================
// Candidate Supply
// =============================================================================
//
// Candidates reach the screener in one of two shapes:
//
//   - CandidatePool: one labelled nobs × k matrix, fully in memory.
//   - BatchSource:   a forward-only producer of CandidateBatch values. Each
//                    batch is pulled once, processed, and dropped. There is no
//                    lookahead and no rewind.
//
// When the screener stops early (budget used up) it hands the source back
// through `release`. The default drains the remaining batches, so producers
// that hold files or threads see a normal end of iteration; a source that can
// shut down without reading further overrides it.
//
// =============================================================================

use std::collections::HashSet;

use ndarray::{s, Array2};

use crate::error::{GlmScreenError, Result};

fn check_unique(names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(GlmScreenError::DuplicateColumn(format!(
                "label '{}' appears more than once",
                name
            )));
        }
    }
    Ok(())
}

// =============================================================================
// In-memory pool
// =============================================================================

/// All candidates at once, with one label per column.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    data: Array2<f64>,
    names: Vec<String>,
}

impl CandidatePool {
    /// Pool with default labels `var0`, `var1`, ...
    pub fn new(data: Array2<f64>) -> Self {
        let names = (0..data.ncols()).map(|j| format!("var{}", j)).collect();
        Self { data, names }
    }

    pub fn with_names(data: Array2<f64>, names: Vec<String>) -> Result<Self> {
        if names.len() != data.ncols() {
            return Err(GlmScreenError::DimensionMismatch(format!(
                "{} labels for {} candidate columns",
                names.len(),
                data.ncols()
            )));
        }
        check_unique(&names)?;
        Ok(Self { data, names })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn nobs(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Stream this pool as consecutive batches of `cols_per_batch` columns.
    pub fn batches(&self, cols_per_batch: usize) -> PoolBatches<'_> {
        PoolBatches {
            pool: self,
            cols_per_batch: cols_per_batch.max(1),
            next_col: 0,
        }
    }
}

// =============================================================================
// Batches
// =============================================================================

/// One chunk of candidates delivered by a `BatchSource`.
#[derive(Debug, Clone)]
pub struct CandidateBatch {
    data: Array2<f64>,
    names: Option<Vec<String>>,
}

impl CandidateBatch {
    /// Batch without labels; the screener names columns `var{batch}_{j}`.
    pub fn new(data: Array2<f64>) -> Self {
        Self { data, names: None }
    }

    pub fn with_names(data: Array2<f64>, names: Vec<String>) -> Result<Self> {
        if names.len() != data.ncols() {
            return Err(GlmScreenError::MalformedBatch(format!(
                "{} labels for {} columns",
                names.len(),
                data.ncols()
            )));
        }
        Ok(Self {
            data,
            names: Some(names),
        })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Labels for every column, generated when the batch has none.
    pub fn labels(&self, batch_index: usize) -> Vec<String> {
        match &self.names {
            Some(names) => names.clone(),
            None => (0..self.ncols())
                .map(|j| format!("var{}_{}", batch_index, j))
                .collect(),
        }
    }

    /// Check the batch against the response length; returns its labels.
    pub(crate) fn validate(&self, batch_index: usize, nobs: usize) -> Result<Vec<String>> {
        if self.nrows() != nobs {
            return Err(GlmScreenError::MalformedBatch(format!(
                "batch {} has {} rows, expected {}",
                batch_index,
                self.nrows(),
                nobs
            )));
        }
        if self.data.iter().any(|v| !v.is_finite()) {
            return Err(GlmScreenError::MalformedBatch(format!(
                "batch {} contains non-finite values",
                batch_index
            )));
        }
        let labels = self.labels(batch_index);
        check_unique(&labels)?;
        Ok(labels)
    }
}

// =============================================================================
// Batch sources
// =============================================================================

/// Forward-only, single-pass producer of candidate batches.
pub trait BatchSource {
    /// The next batch, or `None` once the source is exhausted.
    fn next_batch(&mut self) -> Result<Option<CandidateBatch>>;

    /// Give up on the remaining batches. Returns how many were consumed
    /// while releasing.
    fn release(&mut self) -> Result<usize> {
        let mut drained = 0;
        while self.next_batch()?.is_some() {
            drained += 1;
        }
        Ok(drained)
    }
}

impl<S: BatchSource + ?Sized> BatchSource for &mut S {
    fn next_batch(&mut self) -> Result<Option<CandidateBatch>> {
        (**self).next_batch()
    }

    fn release(&mut self) -> Result<usize> {
        (**self).release()
    }
}

impl<S: BatchSource + ?Sized> BatchSource for Box<S> {
    fn next_batch(&mut self) -> Result<Option<CandidateBatch>> {
        (**self).next_batch()
    }

    fn release(&mut self) -> Result<usize> {
        (**self).release()
    }
}

/// Any iterator of batches.
pub struct IterSource<I> {
    iter: I,
}

impl<I: Iterator<Item = CandidateBatch>> IterSource<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(iter: T) -> Self {
        Self {
            iter: iter.into_iter(),
        }
    }
}

impl<I: Iterator<Item = CandidateBatch>> BatchSource for IterSource<I> {
    fn next_batch(&mut self) -> Result<Option<CandidateBatch>> {
        Ok(self.iter.next())
    }
}

/// An iterator whose items can fail (e.g. batches parsed from a file).
pub struct ResultIterSource<I> {
    iter: I,
}

impl<I: Iterator<Item = Result<CandidateBatch>>> ResultIterSource<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(iter: T) -> Self {
        Self {
            iter: iter.into_iter(),
        }
    }
}

impl<I: Iterator<Item = Result<CandidateBatch>>> BatchSource for ResultIterSource<I> {
    fn next_batch(&mut self) -> Result<Option<CandidateBatch>> {
        self.iter.next().transpose()
    }
}

/// Consecutive column chunks of a `CandidatePool`.
pub struct PoolBatches<'a> {
    pool: &'a CandidatePool,
    cols_per_batch: usize,
    next_col: usize,
}

impl BatchSource for PoolBatches<'_> {
    fn next_batch(&mut self) -> Result<Option<CandidateBatch>> {
        let k = self.pool.ncols();
        if self.next_col >= k {
            return Ok(None);
        }
        let end = (self.next_col + self.cols_per_batch).min(k);
        let data = self.pool.data.slice(s![.., self.next_col..end]).to_owned();
        let names = self.pool.names[self.next_col..end].to_vec();
        self.next_col = end;
        CandidateBatch::with_names(data, names).map(Some)
    }

    /// Nothing to read or close; just skip to the end.
    fn release(&mut self) -> Result<usize> {
        let remaining = self.pool.ncols().saturating_sub(self.next_col);
        self.next_col = self.pool.ncols();
        Ok((remaining + self.cols_per_batch - 1) / self.cols_per_batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(k: usize) -> CandidatePool {
        CandidatePool::new(Array2::from_shape_fn((3, k), |(i, j)| (i * 10 + j) as f64))
    }

    #[test]
    fn test_pool_default_labels() {
        assert_eq!(pool(2).names(), &["var0".to_string(), "var1".to_string()]);
    }

    #[test]
    fn test_pool_rejects_duplicate_labels() {
        let data = Array2::zeros((2, 2));
        let err = CandidatePool::with_names(data, vec!["x".into(), "x".into()]);
        assert!(matches!(err, Err(GlmScreenError::DuplicateColumn(_))));
    }

    #[test]
    fn test_generated_batch_labels() {
        let batch = CandidateBatch::new(Array2::zeros((2, 2)));
        assert_eq!(batch.labels(4), vec!["var4_0".to_string(), "var4_1".to_string()]);
    }

    #[test]
    fn test_validate_row_count() {
        let batch = CandidateBatch::new(Array2::zeros((2, 3)));
        assert!(matches!(batch.validate(0, 5), Err(GlmScreenError::MalformedBatch(_))));
        assert!(batch.validate(0, 2).is_ok());
    }

    #[test]
    fn test_pool_batches_cover_all_columns_once() {
        let p = pool(5);
        let mut source = p.batches(2);
        let mut widths = Vec::new();
        while let Some(batch) = source.next_batch().unwrap() {
            widths.push(batch.ncols());
        }
        assert_eq!(widths, vec![2, 2, 1]);
        assert!(source.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_pool_batches_release_counts_skipped() {
        let p = pool(5);
        let mut source = p.batches(2);
        source.next_batch().unwrap();
        assert_eq!(source.release().unwrap(), 2);
        assert!(source.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_default_release_drains_iterator() {
        let batches = (0..4).map(|_| CandidateBatch::new(Array2::zeros((1, 1))));
        let mut source = IterSource::new(batches);
        source.next_batch().unwrap();
        assert_eq!(source.release().unwrap(), 3);
        assert!(source.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_result_source_propagates_errors() {
        let items = vec![
            Ok(CandidateBatch::new(Array2::zeros((1, 1)))),
            Err(GlmScreenError::Source("read failed".into())),
        ];
        let mut source = ResultIterSource::new(items);
        assert!(source.next_batch().unwrap().is_some());
        assert!(matches!(source.next_batch(), Err(GlmScreenError::Source(_))));
    }
}
