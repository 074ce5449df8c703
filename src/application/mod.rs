// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: each use case wires the data, ml,
// cluster, analysis and infra layers together for one command.
//
//   evaluate_use_case  — one run: loss, embeddings, clustering,
//                        silhouette sweeps, artifacts
//                        (plus EvaluateAllUseCase over a directory)
//   aggregate_use_case — cross-run comparison of finished runs

// Validate-and-clusterize workflow
pub mod evaluate_use_case;

// Cross-run comparison workflow
pub mod aggregate_use_case;
