// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing the evaluation pipeline:
// samples, embedding matrices, run results. No burn types,
// no file I/O here.

// A loaded skeleton volume and its subject identifier
pub mod sample;

// Embedding matrices and paired-view bookkeeping
pub mod embedding;

// Typed hyperparameters of a trained run
pub mod run_config;

// Per-run scalar results and silhouette mappings
pub mod run_result;

// Core abstractions other layers implement
pub mod traits;
