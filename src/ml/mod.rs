// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that runs a network:
//
//   model.rs      — 3-D convolutional encoder + projection head
//   embeddable.rs — the Embeddable capability, the Instrumented
//                   wrapper and its observers
//   embedder.rs   — EmbeddingComputer: batched, interleaved
//                   representations over a data loader
//   loss.rs       — NT-Xent loss used as the validation loss

pub mod model;

pub mod embeddable;

pub mod embedder;

pub mod loss;
