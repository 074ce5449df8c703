// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns of an evaluation run:
//
//   checkpoint.rs — RunConfig + encoder weights (CompactRecorder)
//   run_store.rs  — atomic result.json / embeddings / filenames
//                   writes, and the reader used by aggregation
//   metrics.rs    — per-run metrics.csv
//   plots.rs      — PNG artifacts (plotters)

/// Run config and model weight loading
pub mod checkpoint;

/// Run result persistence
pub mod run_store;

/// Per-run metrics CSV
pub mod metrics;

/// Scatter, curve and slice images
pub mod plots;
