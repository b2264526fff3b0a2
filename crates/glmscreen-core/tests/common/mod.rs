// Shared simulation helpers for the integration tests.

#![allow(dead_code)]

use glmscreen_core::{CandidateBatch, GlmEstimator, IRLSConfig};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson, StandardNormal};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Poisson estimator with a tight tolerance, so refits and oracle fits agree
/// to well below the assertion tolerances.
pub fn tight_poisson() -> GlmEstimator {
    GlmEstimator::poisson().with_config(IRLSConfig {
        tolerance: 1e-11,
        max_iterations: 50,
        ..IRLSConfig::default()
    })
}

pub fn normal_matrix(rng: &mut StdRng, nobs: usize, k: usize) -> Array2<f64> {
    Array2::from_shape_fn((nobs, k), |_| rng.sample::<f64, _>(StandardNormal))
}

pub fn poisson_response(rng: &mut StdRng, eta: &Array1<f64>) -> Array1<f64> {
    eta.mapv(|e| {
        let mu = e.exp();
        // mu is always positive here
        Poisson::new(mu).map(|d| d.sample(&mut *rng)).unwrap_or(0.0)
    })
}

/// Candidate pool of independent standard normals. The columns listed in
/// `signals` carry the given coefficients; all others are pure noise.
pub struct PoolData {
    pub y: Array1<f64>,
    pub x: Array2<f64>,
    pub intercept: f64,
    pub signals: Vec<(usize, f64)>,
}

impl PoolData {
    pub fn true_positions(&self) -> Vec<usize> {
        self.signals.iter().map(|&(j, _)| j).collect()
    }

    /// [1 | true signal columns], in `signals` order.
    pub fn oracle_design(&self) -> Array2<f64> {
        let nobs = self.x.nrows();
        let mut design = Array2::ones((nobs, self.signals.len() + 1));
        for (i, &(j, _)) in self.signals.iter().enumerate() {
            design.column_mut(i + 1).assign(&self.x.column(j));
        }
        design
    }
}

pub fn simulate_pool(seed: u64, nobs: usize, k: usize, intercept: f64, signals: &[(usize, f64)]) -> PoolData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, nobs, k);
    let mut eta = Array1::from_elem(nobs, intercept);
    for &(j, beta) in signals {
        eta.scaled_add(beta, &x.column(j));
    }
    let y = poisson_response(&mut rng, &eta);
    PoolData {
        y,
        x,
        intercept,
        signals: signals.to_vec(),
    }
}

/// Response plus a lazy generator of `n_batches` unlabelled batches of
/// `cols_per_batch` noise columns. Batch b < signals.len() hides signal b at
/// local column `planted_at`.
pub struct StreamData {
    pub y: Array1<f64>,
    pub signal_columns: Vec<Array1<f64>>,
    pub nobs: usize,
    pub n_batches: usize,
    pub cols_per_batch: usize,
    pub planted_at: usize,
    pub seed: u64,
}

impl StreamData {
    pub fn batches(&self) -> impl Iterator<Item = CandidateBatch> + '_ {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        (0..self.n_batches).map(move |b| {
            let mut data = normal_matrix(&mut rng, self.nobs, self.cols_per_batch);
            if let Some(signal) = self.signal_columns.get(b) {
                data.column_mut(self.planted_at).assign(signal);
            }
            CandidateBatch::new(data)
        })
    }
}

pub fn simulate_stream(seed: u64, nobs: usize, intercept: f64, betas: &[f64]) -> StreamData {
    let mut rng = StdRng::seed_from_u64(seed);
    let signals = normal_matrix(&mut rng, nobs, betas.len());
    let mut eta = Array1::from_elem(nobs, intercept);
    for (j, &beta) in betas.iter().enumerate() {
        eta.scaled_add(beta, &signals.column(j));
    }
    let y = poisson_response(&mut rng, &eta);
    StreamData {
        y,
        signal_columns: signals.columns().into_iter().map(|c| c.to_owned()).collect(),
        nobs,
        n_batches: 6,
        cols_per_batch: 100,
        planted_at: 10,
        seed,
    }
}

// =============================================================================
// Correlated uniform designs
// =============================================================================

/// Center every column and scale it to unit population standard deviation.
pub fn standardize(x: &mut Array2<f64>) {
    for mut col in x.columns_mut() {
        let mean = col.mean().unwrap_or(0.0);
        col.mapv_inplace(|v| v - mean);
        let sd = (col.iter().map(|v| v * v).sum::<f64>() / col.len() as f64).sqrt();
        if sd > 0.0 {
            col.mapv_inplace(|v| v / sd);
        }
    }
}

/// Standardized `nobs × k` design of uniforms plus one row factor shared by
/// all columns, so any two columns correlate at about 0.5. `shift` is added
/// to every column before scaling.
pub fn correlated_uniform(rng: &mut StdRng, nobs: usize, k: usize, shift: Option<&Array1<f64>>) -> Array2<f64> {
    let u = Array2::from_shape_fn((nobs, k), |_| rng.gen::<f64>());
    let factor = Array1::from_shape_fn(nobs, |_| rng.gen::<f64>() - 0.5);
    let mut x = Array2::from_shape_fn((nobs, k), |(i, j)| {
        let s = shift.map_or(0.0, |s| s[i]);
        ((s + u[[i, j]] + factor[i]) * 2.0 - 1.0) * 1.2
    });
    standardize(&mut x);
    x
}

/// True coefficients 1, √(1/2), √(1/3), ..., one per true column.
pub fn decaying_betas(k: usize) -> Vec<f64> {
    (1..=k).map(|i| (1.0 / i as f64).sqrt()).collect()
}

/// 100 observations, 500 correlated columns with column 0 set to ones.
/// The response uses columns 0, 100, 300, 400 and 411; the candidate pool
/// is every column but the first.
pub struct CorrelatedPoolData {
    pub y: Array1<f64>,
    pub x: Array2<f64>,
    pub true_columns: Vec<usize>,
}

impl CorrelatedPoolData {
    pub fn candidates(&self) -> Array2<f64> {
        self.x.slice(ndarray::s![.., 1..]).to_owned()
    }

    /// Pool positions of the true non-intercept columns.
    pub fn true_positions(&self) -> Vec<usize> {
        self.true_columns[1..].iter().map(|j| j - 1).collect()
    }

    pub fn oracle_design(&self) -> Array2<f64> {
        self.x.select(ndarray::Axis(1), &self.true_columns)
    }
}

pub fn simulate_correlated_pool(seed: u64) -> CorrelatedPoolData {
    let (nobs, k) = (100, 500);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = correlated_uniform(&mut rng, nobs, k, None);
    x.column_mut(0).fill(1.0);

    let true_columns = vec![0, 100, 300, 400, 411];
    let betas = decaying_betas(true_columns.len());
    let mut eta = Array1::zeros(nobs);
    for (&j, &beta) in true_columns.iter().zip(&betas) {
        eta.scaled_add(beta, &x.column(j));
    }
    let y = poisson_response(&mut rng, &eta);
    CorrelatedPoolData { y, x, true_columns }
}

/// 100 observations from [1 | four correlated signals] with decaying
/// coefficients. Six batches of 100 correlated columns follow; every batch
/// leans on the sum of the signals, and batch b < 4 hides signal b at local
/// column 10.
pub struct CorrelatedStreamData {
    pub y: Array1<f64>,
    pub signals: Array2<f64>,
    pub nobs: usize,
    pub seed: u64,
}

impl CorrelatedStreamData {
    pub fn batches(&self) -> impl Iterator<Item = CandidateBatch> + '_ {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let common = self.signals.sum_axis(ndarray::Axis(1)).mapv(|v| 0.05 * v);
        (0..6).map(move |b| {
            let mut data = correlated_uniform(&mut rng, self.nobs, 100, Some(&common));
            if b < self.signals.ncols() {
                data.column_mut(10).assign(&self.signals.column(b));
            }
            CandidateBatch::new(data)
        })
    }

    pub fn oracle_design(&self) -> Array2<f64> {
        let mut design = Array2::ones((self.nobs, self.signals.ncols() + 1));
        design.slice_mut(ndarray::s![.., 1..]).assign(&self.signals);
        design
    }
}

pub fn simulate_correlated_stream(seed: u64) -> CorrelatedStreamData {
    let nobs = 100;
    let mut rng = StdRng::seed_from_u64(seed);
    let signals = correlated_uniform(&mut rng, nobs, 4, None);
    let betas = decaying_betas(5);
    let mut eta = Array1::from_elem(nobs, betas[0]);
    for (j, &beta) in betas[1..].iter().enumerate() {
        eta.scaled_add(beta, &signals.column(j));
    }
    let y = poisson_response(&mut rng, &eta);
    CorrelatedStreamData { y, signals, nobs, seed }
}
