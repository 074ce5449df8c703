//! DBSCAN: density-based clustering with noise (Ester et al., 1996).
//!
//! - **eps**: neighbourhood radius (Euclidean, inclusive).
//! - **min_samples**: neighbours within `eps`, counting the point itself, needed for a
//!   point to be a *core* point.
//!
//! Clusters grow breadth-first from core points. Non-core points reached from a core
//! point become border points; everything else is noise. The number of clusters is not
//! chosen in advance, which is why the evaluation sweeps over `eps`.

use std::collections::VecDeque;

use super::traits::Clustering;
use super::util;
use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone)]
pub struct Dbscan {
    eps:         f64,
    min_samples: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Fit and return `None` for noise points.
    pub fn fit_predict_with_noise(&self, data: &[Vec<f32>]) -> EvalResult<Vec<Option<usize>>> {
        if !(self.eps > 0.0) {
            return Err(EvalError::InvalidParameter {
                name:    "eps",
                message: format!("must be positive, got {}", self.eps),
            });
        }
        if self.min_samples == 0 {
            return Err(EvalError::InvalidParameter {
                name:    "min_samples",
                message: "must be at least 1".to_string(),
            });
        }
        util::check_rows(data)?;

        let n = data.len();
        let dists = util::pairwise_distances(data);
        let neighbourhoods: Vec<Vec<usize>> = (0..n)
            .map(|i| (0..n).filter(|&j| dists[i * n + j] <= self.eps).collect())
            .collect();
        let is_core: Vec<bool> = neighbourhoods
            .iter()
            .map(|nb| nb.len() >= self.min_samples)
            .collect();

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut next_label = 0;
        let mut queue = VecDeque::new();

        for seed in 0..n {
            if labels[seed].is_some() || !is_core[seed] {
                continue;
            }
            labels[seed] = Some(next_label);
            queue.push_back(seed);

            while let Some(p) = queue.pop_front() {
                if !is_core[p] {
                    continue;
                }
                for &q in &neighbourhoods[p] {
                    if labels[q].is_none() {
                        labels[q] = Some(next_label);
                        queue.push_back(q);
                    }
                }
            }
            next_label += 1;
        }

        Ok(labels)
    }
}

impl Default for Dbscan {
    /// eps 0.5, min_samples 5.
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

impl Clustering for Dbscan {
    /// Noise points share one trailing label after the real clusters, so the
    /// output is a partition usable by the silhouette score.
    fn fit_predict(&self, data: &[Vec<f32>]) -> EvalResult<Vec<usize>> {
        let labels = self.fit_predict_with_noise(data)?;
        let noise = labels.iter().flatten().max().map_or(0, |&m| m + 1);
        Ok(labels.into_iter().map(|l| l.unwrap_or(noise)).collect())
    }

    fn name(&self) -> &'static str {
        "DBSCAN"
    }
}
