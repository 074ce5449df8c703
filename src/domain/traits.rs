// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits so the
// concrete sources (files on disk, in-memory fixtures in tests)
// can be swapped without touching the workflow code.

use std::path::Path;

use anyhow::Result;

use crate::domain::run_result::RunResult;
use crate::domain::sample::Sample;
use crate::error::EvalResult;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can load skeleton samples.
///
/// Implementations:
///   - SkeletonLoader → subjects CSV + directory of .vol files
pub trait SampleSource {
    /// Load all available samples, in a stable order.
    fn load_all(&self) -> Result<Vec<Sample>>;
}

// ─── RunResultSource ──────────────────────────────────────────────────────────
/// Any component that can read back a persisted run result.
///
/// Implementations:
///   - RunStore → reads `<run_dir>/result.json`
pub trait RunResultSource {
    /// Fails with `MissingRunArtifact` if the run has no result.
    fn load_result(&self, run_dir: &Path) -> EvalResult<RunResult>;
}
