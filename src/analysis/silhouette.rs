// ============================================================
// Cluster Quality Scorer
// ============================================================
// Silhouette coefficient of a labelling:
//
//   a(i) = mean distance from i to the other members of its cluster
//   b(i) = lowest mean distance from i to the members of another cluster
//   s(i) = (b(i) - a(i)) / max(a(i), b(i))      (0 for singletons)
//   score = mean_i s(i)                          in [-1, 1]
//
// The score is only defined for 2 <= n_clusters <= n_samples - 1.
// Sweeps record a degenerate configuration as a "no score" entry
// (None) and move on.

use std::collections::BTreeMap;

use crate::cluster::{Clustering, Dbscan, HierarchyOutcome, Kmeans};
use crate::cluster::util;
use crate::domain::run_result::SilhouetteScores;
use crate::error::{EvalError, EvalResult};

/// Radius sweep for DBSCAN.
pub const DEFAULT_DBSCAN_EPS: [f64; 8] = [1.0, 1.5, 1.8, 2.0, 2.2, 2.5, 3.0, 3.5];

/// Silhouette coefficient averaged over all samples (Euclidean distance).
pub fn silhouette_score(data: &[Vec<f32>], labels: &[usize]) -> EvalResult<f64> {
    util::check_rows(data)?;
    if labels.len() != data.len() {
        return Err(EvalError::ShapeMismatch {
            context:  "silhouette labels",
            expected: data.len(),
            found:    labels.len(),
        });
    }

    // Dense relabelling so clusters index a Vec.
    let mut dense: BTreeMap<usize, usize> = BTreeMap::new();
    for &l in labels {
        let next = dense.len();
        dense.entry(l).or_insert(next);
    }
    let n = data.len();
    let n_clusters = dense.len();
    if n_clusters < 2 || n_clusters > n - 1 {
        return Err(EvalError::UndefinedScore { n_clusters, n_samples: n });
    }
    let labels: Vec<usize> = labels.iter().map(|l| dense[l]).collect();

    let mut sizes = vec![0usize; n_clusters];
    for &l in &labels {
        sizes[l] += 1;
    }

    let dists = util::pairwise_distances(data);
    let mut total = 0.0;
    let mut sums = vec![0.0f64; n_clusters];
    for i in 0..n {
        let own = labels[i];
        if sizes[own] == 1 {
            continue;
        }
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            sums[labels[j]] += dists[i * n + j];
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..n_clusters)
            .filter(|&c| c != own)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Ok(total / n as f64)
}

/// Runs clustering sweeps and scores each configuration.
#[derive(Debug, Clone)]
pub struct ClusterQualityScorer {
    kmeans_max_k:       usize,
    dbscan_eps:         Vec<f64>,
    dbscan_min_samples: usize,
    seed:               u64,
}

impl ClusterQualityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kmeans_max_k(mut self, max_k: usize) -> Self {
        self.kmeans_max_k = max_k;
        self
    }

    pub fn with_dbscan_eps(mut self, eps: Vec<f64>) -> Self {
        self.dbscan_eps = eps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn dbscan_eps(&self) -> &[f64] {
        &self.dbscan_eps
    }

    pub fn dbscan(&self, eps: f64) -> Dbscan {
        Dbscan::new(eps, self.dbscan_min_samples)
    }

    /// Score one labelling; degenerate clusterings become `None`.
    pub fn score_labels(&self, data: &[Vec<f32>], labels: &[usize]) -> EvalResult<Option<f64>> {
        match silhouette_score(data, labels) {
            Ok(s) => Ok(Some(s)),
            Err(EvalError::UndefinedScore { n_clusters, n_samples }) => {
                tracing::warn!(
                    "Silhouette undefined ({} cluster(s) over {} samples); recording no score",
                    n_clusters,
                    n_samples
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fit each configured clusterer and score it under its configuration key.
    pub fn sweep<C, I>(&self, data: &[Vec<f32>], configs: I) -> EvalResult<SilhouetteScores>
    where
        C: Clustering,
        I: IntoIterator<Item = (String, C)>,
    {
        let mut scores = SilhouetteScores::new();
        for (key, clusterer) in configs {
            let labels = clusterer.fit_predict(data)?;
            let score = self.score_labels(data, &labels)?;
            tracing::debug!("{} [{}] silhouette={:?}", clusterer.name(), key, score);
            scores.insert(key, score);
        }
        Ok(scores)
    }

    /// k in 2..=max_k, limited to n_samples - 1.
    pub fn sweep_kmeans(&self, data: &[Vec<f32>]) -> EvalResult<SilhouetteScores> {
        let upper = self.kmeans_max_k.min(data.len().saturating_sub(1));
        let configs = (2..=upper).map(|k| (k.to_string(), Kmeans::new(k).with_seed(self.seed)));
        self.sweep(data, configs)
    }

    pub fn sweep_dbscan(&self, data: &[Vec<f32>]) -> EvalResult<SilhouetteScores> {
        let configs = self
            .dbscan_eps
            .iter()
            .map(|&eps| (format_eps(eps), self.dbscan(eps)));
        self.sweep(data, configs)
    }

    /// Score the hierarchical Affinity Propagation result, keyed by its
    /// final cluster count.
    pub fn score_hierarchy(
        &self,
        data:    &[Vec<f32>],
        outcome: &HierarchyOutcome,
    ) -> EvalResult<SilhouetteScores> {
        let mut scores = SilhouetteScores::new();
        scores.insert(outcome.n_clusters(), self.score_labels(data, &outcome.labels)?);
        Ok(scores)
    }
}

impl Default for ClusterQualityScorer {
    fn default() -> Self {
        Self {
            kmeans_max_k:       10,
            dbscan_eps:         DEFAULT_DBSCAN_EPS.to_vec(),
            dbscan_min_samples: 5,
            seed:               0,
        }
    }
}

/// Text key for a radius: the shortest decimal that reads back as the same
/// `f64`, always with a fractional part ("1.0", "2.2", "0.01").
pub fn format_eps(eps: f64) -> String {
    format!("{eps:?}")
}
