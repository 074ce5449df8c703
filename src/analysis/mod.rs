pub mod silhouette;
pub mod tsne;

pub use silhouette::{format_eps, silhouette_score, ClusterQualityScorer, DEFAULT_DBSCAN_EPS};
pub use tsne::DimensionalityReducer;
