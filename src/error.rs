// ============================================================
// Core error taxonomy
// ============================================================
// Typed errors returned by the embedding, clustering, scoring
// and persistence components. The application and CLI layers
// wrap these in anyhow with extra context.
//
//   ShapeMismatch     — batch/matrix dimensions break the
//                       paired-view contract (aborts the run)
//   InvalidShape      — odd row count for a paired matrix
//   ConvergenceStall  — exemplar set stopped shrinking
//   UndefinedScore    — silhouette of a degenerate clustering
//                       (absorbed by the sweep)
//   MissingRunArtifact — run directory has no result file
//                       (absorbed by the aggregator)

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Two tensors or matrices that must agree on a dimension do not.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context:  &'static str,
        expected: usize,
        found:    usize,
    },

    /// A paired (interleaved) matrix must have an even number of rows.
    #[error("invalid shape: {rows} rows cannot be split into view pairs")]
    InvalidShape { rows: usize },

    /// The hierarchical coarsening loop made no progress, or hit its pass
    /// cap. `previous -> current` is the last pass's exemplar transition.
    #[error(
        "convergence stall after {iterations} iteration(s): \
         last pass took the exemplar count from {previous} to {current}"
    )]
    ConvergenceStall {
        iterations: usize,
        previous:   usize,
        current:    usize,
    },

    /// Silhouette is undefined unless 2 <= n_clusters <= n_samples - 1.
    #[error("silhouette undefined for {n_clusters} cluster(s) over {n_samples} sample(s)")]
    UndefinedScore {
        n_clusters: usize,
        n_samples:  usize,
    },

    /// A run directory does not contain the expected artifact.
    #[error("missing run artifact '{}'", path.display())]
    MissingRunArtifact { path: PathBuf },

    #[error("empty input")]
    EmptyInput,

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        name:    &'static str,
        message: String,
    },

    /// Rows of a matrix have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Affinity Propagation found no exemplar.
    #[error("affinity propagation did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },

    #[error("tensor data conversion failed: {0}")]
    TensorData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
