//! K-means with k-means++ seeding and Lloyd iterations.
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! Several seeded restarts are run and the one with the lowest inertia is kept, so
//! results are reproducible for a given seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::traits::Clustering;
use super::util;
use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone)]
pub struct Kmeans {
    k:        usize,
    max_iter: usize,
    n_init:   usize,
    tol:      f64,
    seed:     u64,
}

/// A fitted k-means model.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    pub centroids: Vec<Vec<f32>>,
    pub labels:    Vec<usize>,
    pub inertia:   f64,
    pub n_iter:    usize,
}

impl Kmeans {
    pub fn new(k: usize) -> Self {
        Self { k, max_iter: 300, n_init: 10, tol: 1e-4, seed: 0 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn fit(&self, data: &[Vec<f32>]) -> EvalResult<KmeansFit> {
        util::check_rows(data)?;
        if self.k == 0 || self.k > data.len() {
            return Err(EvalError::InvalidParameter {
                name:    "k",
                message: format!("must be in 1..={}, got {}", data.len(), self.k),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KmeansFit> = None;
        for _ in 0..self.n_init {
            let fit = self.lloyd(data, self.seed_centroids(data, &mut rng));
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.ok_or(EvalError::EmptyInput)
    }

    /// k-means++: each new centroid is drawn with probability proportional to
    /// its squared distance from the closest centroid chosen so far.
    fn seed_centroids(&self, data: &[Vec<f32>], rng: &mut StdRng) -> Vec<Vec<f32>> {
        let n = data.len();
        let mut centroids = vec![data[rng.gen_range(0..n)].clone()];
        let mut closest: Vec<f64> = data
            .iter()
            .map(|p| util::squared_euclidean(p, &centroids[0]))
            .collect();

        while centroids.len() < self.k {
            let total: f64 = closest.iter().sum();
            let pick = if total > 0.0 {
                let mut target = rng.gen_range(0.0..total);
                let mut idx = n - 1;
                for (i, &d) in closest.iter().enumerate() {
                    if target < d {
                        idx = i;
                        break;
                    }
                    target -= d;
                }
                idx
            } else {
                rng.gen_range(0..n)
            };
            let c = data[pick].clone();
            for (i, p) in data.iter().enumerate() {
                closest[i] = closest[i].min(util::squared_euclidean(p, &c));
            }
            centroids.push(c);
        }
        centroids
    }

    fn lloyd(&self, data: &[Vec<f32>], mut centroids: Vec<Vec<f32>>) -> KmeansFit {
        let d = data[0].len();
        let mut labels = vec![0usize; data.len()];
        let mut n_iter = 0;

        for it in 0..self.max_iter {
            n_iter = it + 1;
            for (i, p) in data.iter().enumerate() {
                labels[i] = util::nearest(p, &centroids);
            }

            let mut sums = vec![vec![0.0f64; d]; self.k];
            let mut counts = vec![0usize; self.k];
            for (p, &l) in data.iter().zip(&labels) {
                counts[l] += 1;
                for (s, &x) in sums[l].iter_mut().zip(p) {
                    *s += f64::from(x);
                }
            }

            let mut shift = 0.0;
            for k in 0..self.k {
                // An empty cluster keeps its previous centroid.
                if counts[k] == 0 {
                    continue;
                }
                let updated: Vec<f32> = sums[k]
                    .iter()
                    .map(|s| (s / counts[k] as f64) as f32)
                    .collect();
                shift += util::squared_euclidean(&updated, &centroids[k]);
                centroids[k] = updated;
            }
            if shift <= self.tol {
                break;
            }
        }

        for (i, p) in data.iter().enumerate() {
            labels[i] = util::nearest(p, &centroids);
        }
        let inertia = data
            .iter()
            .zip(&labels)
            .map(|(p, &l)| util::squared_euclidean(p, &centroids[l]))
            .sum();
        KmeansFit { centroids, labels, inertia, n_iter }
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: &[Vec<f32>]) -> EvalResult<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    fn name(&self) -> &'static str {
        "KMeans"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_separates_two_blobs() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.2, 0.1],
            vec![0.1, 0.2],
            vec![9.0, 9.0],
            vec![9.2, 9.1],
            vec![9.1, 9.2],
        ];
        let fit = Kmeans::new(2).with_seed(0).fit(&data).unwrap();
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[0], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.inertia < 0.5);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let data: Vec<Vec<f32>> = (0..30).map(|i| vec![(i % 7) as f32, (i % 3) as f32]).collect();
        let a = Kmeans::new(3).with_seed(11).fit(&data).unwrap();
        let b = Kmeans::new(3).with_seed(11).fit(&data).unwrap();
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_k_larger_than_n_is_rejected() {
        let data = vec![vec![0.0], vec![1.0]];
        assert!(Kmeans::new(3).fit(&data).is_err());
        assert!(Kmeans::new(0).fit(&data).is_err());
    }

    proptest! {
        #[test]
        fn prop_kmeans_all_assigned(
            data in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), 1..20),
            k in 1usize..5
        ) {
            if k <= data.len() {
                let labels = Kmeans::new(k).with_seed(42).fit_predict(&data).unwrap();
                prop_assert_eq!(labels.len(), data.len());
                for &l in &labels {
                    prop_assert!(l < k);
                }
            }
        }
    }
}
