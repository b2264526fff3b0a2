// =============================================================================
// glmscreen Core Library
// =============================================================================
//
// Forward variable screening for penalized GLMs, in pure Rust. The Python
// bindings in the `glmscreen` crate are a thin layer over this.
//
// STRUCTURE:
// ----------
//   - screening:      the screening loops (in-memory and streaming), the
//                     inclusion rule, selection state, candidate sources
//   - estimator:      the fitting contract the loops depend on, plus the
//                     built-in IRLS GLM estimator
//   - solvers:        penalized IRLS
//   - regularization: SCAD / smoothed SCAD / L2 penalties
//   - families:       Poisson, Gaussian, Binomial
//   - links:          identity, log, logit
//   - diagnostics:    residuals, log-likelihood, AIC/BIC
//   - inference:      standard errors, z p-values
//   - convert:        ndarray ↔ nalgebra, design assembly
//   - error:          error type used throughout the library
//
// FOR MAINTAINERS:
// ----------------
// The screening loops only talk to `Estimator`. Anything about how a model
// is fitted belongs behind that trait, not in `screening`.
//
// =============================================================================

pub mod constants;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod estimator;
pub mod families;
pub mod inference;
pub mod links;
pub mod regularization;
pub mod screening;
pub mod solvers;

pub use error::{GlmScreenError, Result};
pub use estimator::{Estimator, FitDiagnostics, FitRequest, FitResult, GlmEstimator};
pub use families::{BinomialFamily, Family, GaussianFamily, PoissonFamily};
pub use links::{IdentityLink, Link, LogLink, LogitLink};
pub use regularization::Penalty;
pub use screening::{
    BatchContext, BatchSource, CandidateBatch, CandidatePool, ColumnId, InitialModel, IterSource,
    IteratorScreeningResult, ResultIterSource, RoundRecord, Screener, ScreeningConfig, ScreeningResult,
    ScreeningStatus, Termination,
};
pub use solvers::{fit_glm, fit_glm_penalized, IRLSConfig, IRLSResult};
