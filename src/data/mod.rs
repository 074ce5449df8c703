// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From raw skeleton volumes on disk to paired-view tensor
// batches:
//
//   subjects.csv + <id>.vol
//       │
//       ▼
//   SkeletonLoader    → reads volumes, skips broken subjects
//       │
//       ▼
//   Preprocessor      → binarises and pads to input_size
//       │
//       ▼
//   SkeletonDataset   → Burn Dataset; Augmenter draws two views
//       │
//       ▼
//   PairedBatcher     → stacks views into [N, C, D, H, W] tensors
//       │
//       ▼
//   DataLoader        → batches in dataset order (never shuffled)

/// Reads subject ids and `.vol` volumes
pub mod loader;

/// Binarisation and centred padding
pub mod preprocessor;

/// Cutout and flip augmentations producing two views
pub mod augment;

/// Implements Burn's Dataset trait for paired samples
pub mod dataset;

/// Implements Burn's Batcher trait for paired samples
pub mod batcher;
