//! Clustering algorithms run over embedding matrices.
//!
//! All algorithms take dense rows as `&[Vec<f32>]` and return one label per row.
//!
//! ## Algorithms
//!
//! ### Affinity Propagation
//!
//! Message passing between points until a set of exemplars emerges. The number of
//! clusters is not fixed in advance and is often too large for inspection, which is
//! what [`HierarchicalAffinityClusterer`] addresses: it re-clusters the exemplars
//! themselves until at most `K_max` remain, relabelling the full dataset by nearest
//! exemplar at each level.
//!
//! ### DBSCAN
//!
//! Density clustering with noise. Swept over the neighbourhood radius during
//! evaluation.
//!
//! ### K-means
//!
//! Lloyd iterations with k-means++ seeding. Used with k = 2 for the reference
//! visualization and swept over k for silhouette scoring.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let data = vec![vec![0.0, 0.0], vec![0.1, 0.1], vec![10.0, 10.0], vec![10.1, 10.1]];
//! let outcome = HierarchicalAffinityClusterer::default().fit(&data)?;
//! assert_eq!(outcome.labels.len(), data.len());
//! ```

mod affinity;
mod dbscan;
mod hierarchical;
mod kmeans;
mod traits;
pub(crate) mod util;

pub use affinity::{AffinityFit, AffinityPropagation};
pub use dbscan::Dbscan;
pub use hierarchical::{
    HierarchicalAffinityClusterer, HierarchyOutcome, DEFAULT_MAX_CLUSTERS, DEFAULT_MAX_ITERATIONS,
};
pub use kmeans::{Kmeans, KmeansFit};
pub use traits::Clustering;
