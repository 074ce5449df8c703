//! Affinity Propagation (Frey & Dueck, 2007).
//!
//! Points exchange two kinds of messages until a set of exemplars emerges:
//!
//! - **Responsibility** `r(i, k)`: how well-suited `k` is to be the exemplar of `i`,
//!   relative to the other candidates for `i`.
//! - **Availability** `a(i, k)`: how appropriate it is for `i` to pick `k`, given the
//!   support `k` receives from other points.
//!
//! ```text
//! r(i, k) <- s(i, k) - max_{k' != k} (a(i, k') + s(i, k'))
//! a(i, k) <- min(0, r(k, k) + sum_{i' not in {i, k}} max(0, r(i', k)))
//! a(k, k) <- sum_{i' != k} max(0, r(i', k))
//! ```
//!
//! Similarity is the negative squared Euclidean distance. The diagonal holds the
//! *preference*; by default the median of all similarities, which yields a moderate
//! number of clusters that is not chosen in advance.
//!
//! Messages are damped, and the loop stops once the exemplar set has been stable for
//! `convergence_iter` consecutive iterations. A tiny seeded perturbation is added to
//! the similarities so that ties between equivalent exemplars are broken
//! reproducibly.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use super::traits::Clustering;
use super::util;
use crate::error::{EvalError, EvalResult};

/// Affinity Propagation clusterer.
#[derive(Debug, Clone)]
pub struct AffinityPropagation {
    damping:          f64,
    max_iter:         usize,
    convergence_iter: usize,
    /// Self-similarity. `None` = median of the similarity matrix.
    preference:       Option<f64>,
    seed:             u64,
}

/// A fitted Affinity Propagation model.
#[derive(Debug, Clone)]
pub struct AffinityFit {
    /// Indices (into the fitted data) of the exemplars, ascending.
    pub exemplars: Vec<usize>,
    /// Per-point label: position of its exemplar in `exemplars`.
    pub labels:    Vec<usize>,
    /// Exemplar coordinates, in `exemplars` order.
    pub centers:   Vec<Vec<f32>>,
    pub n_iter:    usize,
    pub converged: bool,
}

impl AffinityFit {
    pub fn n_clusters(&self) -> usize {
        self.exemplars.len()
    }

    /// Assign every row of `data` to its nearest exemplar.
    pub fn predict(&self, data: &[Vec<f32>]) -> EvalResult<Vec<usize>> {
        let d = util::check_rows(data)?;
        let center_dim = self.centers.first().map_or(d, |c| c.len());
        if center_dim != d {
            return Err(EvalError::DimensionMismatch { expected: center_dim, found: d });
        }
        Ok(data.iter().map(|p| util::nearest(p, &self.centers)).collect())
    }
}

impl AffinityPropagation {
    /// Defaults: damping 0.5, 200 iterations, stop after 15 stable iterations,
    /// median preference, seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_convergence_iter(mut self, convergence_iter: usize) -> Self {
        self.convergence_iter = convergence_iter;
        self
    }

    pub fn with_preference(mut self, preference: f64) -> Self {
        self.preference = Some(preference);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> EvalResult<()> {
        if !(0.5..1.0).contains(&self.damping) {
            return Err(EvalError::InvalidParameter {
                name:    "damping",
                message: format!("must be in [0.5, 1.0), got {}", self.damping),
            });
        }
        if self.max_iter == 0 || self.convergence_iter == 0 {
            return Err(EvalError::InvalidParameter {
                name:    "max_iter",
                message: "iteration counts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fit the model on `data` and return exemplars plus labels.
    pub fn fit(&self, data: &[Vec<f32>]) -> EvalResult<AffinityFit> {
        self.validate()?;
        util::check_rows(data)?;
        let n = data.len();

        let mut s = vec![0.0f64; n * n];
        for i in 0..n {
            for k in (i + 1)..n {
                let v = -util::squared_euclidean(&data[i], &data[k]);
                s[i * n + k] = v;
                s[k * n + i] = v;
            }
        }
        let preference = match self.preference {
            Some(p) => p,
            None => util::median(&mut s.clone()),
        };

        if n == 1 {
            return Ok(self.single_cluster(data, 0, 0));
        }
        if let Some(fit) = self.degenerate_fit(data, &s, preference) {
            return Ok(fit);
        }

        for i in 0..n {
            s[i * n + i] = preference;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        for v in s.iter_mut() {
            let z: f64 = StandardNormal.sample(&mut rng);
            *v += (f64::EPSILON * *v + f64::MIN_POSITIVE * 100.0) * z;
        }

        let (exemplar_flags, n_iter, converged) = self.propagate(&s, n);
        let candidates: Vec<usize> = (0..n).filter(|&k| exemplar_flags[k]).collect();
        if candidates.is_empty() {
            return Err(EvalError::DidNotConverge { iterations: n_iter });
        }
        if !converged {
            tracing::warn!(
                "Affinity propagation hit max_iter={} before converging; \
                 exemplars may be degenerate",
                self.max_iter
            );
        }

        let (exemplars, labels) = refine(&s, n, candidates);
        let centers = exemplars.iter().map(|&i| data[i].clone()).collect();
        tracing::debug!(
            "Affinity propagation: {} points → {} exemplars in {} iterations",
            n,
            exemplars.len(),
            n_iter
        );
        Ok(AffinityFit { exemplars, labels, centers, n_iter, converged })
    }

    /// Message passing. Returns the exemplar flags of the last iteration,
    /// the number of iterations run and whether the stability criterion
    /// was met.
    fn propagate(&self, s: &[f64], n: usize) -> (Vec<bool>, usize, bool) {
        let damping = self.damping;
        let mut r = vec![0.0f64; n * n];
        let mut a = vec![0.0f64; n * n];
        let mut history = vec![vec![false; self.convergence_iter]; n];
        let mut flags = vec![false; n];

        for it in 0..self.max_iter {
            // Responsibilities
            for i in 0..n {
                let row = i * n;
                let mut best_k = 0;
                let mut best = f64::NEG_INFINITY;
                let mut second = f64::NEG_INFINITY;
                for k in 0..n {
                    let v = a[row + k] + s[row + k];
                    if v > best {
                        second = best;
                        best = v;
                        best_k = k;
                    } else if v > second {
                        second = v;
                    }
                }
                for k in 0..n {
                    let competitor = if k == best_k { second } else { best };
                    let update = s[row + k] - competitor;
                    r[row + k] = damping * r[row + k] + (1.0 - damping) * update;
                }
            }

            // Availabilities
            for k in 0..n {
                let mut support = 0.0;
                for i in 0..n {
                    let v = r[i * n + k];
                    support += if i == k { v } else { v.max(0.0) };
                }
                for i in 0..n {
                    let v = r[i * n + k];
                    let update = if i == k {
                        support - v
                    } else {
                        (support - v.max(0.0)).min(0.0)
                    };
                    a[i * n + k] = damping * a[i * n + k] + (1.0 - damping) * update;
                }
            }

            // Convergence bookkeeping
            let slot = it % self.convergence_iter;
            let mut n_exemplars = 0;
            for k in 0..n {
                flags[k] = a[k * n + k] + r[k * n + k] > 0.0;
                history[k][slot] = flags[k];
                if flags[k] {
                    n_exemplars += 1;
                }
            }

            if it >= self.convergence_iter {
                let stable = history.iter().all(|h| {
                    let on = h.iter().filter(|&&b| b).count();
                    on == 0 || on == self.convergence_iter
                });
                if stable && n_exemplars > 0 {
                    return (flags, it + 1, true);
                }
            }
        }
        (flags, self.max_iter, false)
    }

    /// All off-diagonal similarities equal: every point is its own cluster when
    /// the preference beats the shared similarity, otherwise one cluster.
    fn degenerate_fit(&self, data: &[Vec<f32>], s: &[f64], preference: f64) -> Option<AffinityFit> {
        let n = data.len();
        let shared = s[1];
        let all_equal = (0..n)
            .flat_map(|i| (0..n).filter(move |&k| k != i).map(move |k| i * n + k))
            .all(|idx| s[idx] == shared);
        if !all_equal {
            return None;
        }
        if preference > shared {
            let exemplars: Vec<usize> = (0..n).collect();
            let centers = data.to_vec();
            Some(AffinityFit { labels: exemplars.clone(), exemplars, centers, n_iter: 0, converged: true })
        } else {
            Some(self.single_cluster(data, 0, 0))
        }
    }

    fn single_cluster(&self, data: &[Vec<f32>], exemplar: usize, n_iter: usize) -> AffinityFit {
        AffinityFit {
            exemplars: vec![exemplar],
            labels:    vec![0; data.len()],
            centers:   vec![data[exemplar].clone()],
            n_iter,
            converged: true,
        }
    }
}

/// Assign points to candidate exemplars, then move each exemplar to the member
/// that maximises the summed similarity within its cluster, and reassign.
fn refine(s: &[f64], n: usize, mut exemplars: Vec<usize>) -> (Vec<usize>, Vec<usize>) {
    let assign = |exemplars: &[usize]| -> Vec<usize> {
        let mut c: Vec<usize> = (0..n)
            .map(|i| {
                let mut best = 0;
                let mut best_v = f64::NEG_INFINITY;
                for (j, &e) in exemplars.iter().enumerate() {
                    if s[i * n + e] > best_v {
                        best_v = s[i * n + e];
                        best = j;
                    }
                }
                best
            })
            .collect();
        for (j, &e) in exemplars.iter().enumerate() {
            c[e] = j;
        }
        c
    };

    let c = assign(&exemplars);
    for (j, exemplar) in exemplars.iter_mut().enumerate() {
        let members: Vec<usize> = (0..n).filter(|&i| c[i] == j).collect();
        let mut best = *exemplar;
        let mut best_v = f64::NEG_INFINITY;
        for &candidate in &members {
            let total: f64 = members.iter().map(|&i| s[i * n + candidate]).sum();
            if total > best_v {
                best_v = total;
                best = candidate;
            }
        }
        *exemplar = best;
    }

    let c = assign(&exemplars);
    let raw: Vec<usize> = c.iter().map(|&j| exemplars[j]).collect();

    let mut centers = raw.clone();
    centers.sort_unstable();
    centers.dedup();
    let labels = raw
        .iter()
        .map(|e| centers.binary_search(e).unwrap_or(0))
        .collect();
    (centers, labels)
}

impl Default for AffinityPropagation {
    fn default() -> Self {
        Self {
            damping:          0.5,
            max_iter:         200,
            convergence_iter: 15,
            preference:       None,
            seed:             0,
        }
    }
}

impl Clustering for AffinityPropagation {
    fn fit_predict(&self, data: &[Vec<f32>]) -> EvalResult<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    fn name(&self) -> &'static str {
        "AffinityPropagation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f32>> {
        let mut data = Vec::new();
        for i in 0..6 {
            let t = i as f32 * 0.1;
            data.push(vec![t, 0.05 * t]);
        }
        for i in 0..6 {
            let t = i as f32 * 0.1;
            data.push(vec![8.0 + t, 8.0 - 0.05 * t]);
        }
        data
    }

    #[test]
    fn test_two_blobs_give_two_exemplars() {
        let data = two_blobs();
        let fit = AffinityPropagation::new().fit(&data).unwrap();
        assert_eq!(fit.n_clusters(), 2);
        assert!(fit.labels[..6].iter().all(|&l| l == fit.labels[0]));
        assert!(fit.labels[6..].iter().all(|&l| l == fit.labels[6]));
        assert_ne!(fit.labels[0], fit.labels[6]);
    }

    #[test]
    fn test_exemplars_label_themselves() {
        let data = two_blobs();
        let fit = AffinityPropagation::new().fit(&data).unwrap();
        for (j, &e) in fit.exemplars.iter().enumerate() {
            assert_eq!(fit.labels[e], j);
        }
    }

    #[test]
    fn test_predict_uses_nearest_exemplar() {
        let data = two_blobs();
        let fit = AffinityPropagation::new().fit(&data).unwrap();
        let pred = fit.predict(&[vec![0.2, 0.0], vec![8.3, 7.9]]).unwrap();
        assert_eq!(pred[0], fit.labels[0]);
        assert_eq!(pred[1], fit.labels[6]);
    }

    #[test]
    fn test_high_preference_makes_every_point_an_exemplar() {
        let data = vec![vec![0.0], vec![3.0], vec![7.0], vec![12.0]];
        let fit = AffinityPropagation::new().with_preference(0.0).fit(&data).unwrap();
        assert_eq!(fit.n_clusters(), 4);
    }

    #[test]
    fn test_single_point() {
        let fit = AffinityPropagation::new().fit(&[vec![1.0, 2.0]]).unwrap();
        assert_eq!(fit.exemplars, vec![0]);
        assert_eq!(fit.labels, vec![0]);
    }

    #[test]
    fn test_identical_points_form_one_cluster() {
        let data = vec![vec![1.0, 1.0]; 5];
        let fit = AffinityPropagation::new().fit(&data).unwrap();
        assert_eq!(fit.n_clusters(), 1);
        assert!(fit.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_invalid_damping() {
        let data = two_blobs();
        assert!(AffinityPropagation::new().with_damping(0.2).fit(&data).is_err());
        assert!(AffinityPropagation::new().with_damping(1.0).fit(&data).is_err());
    }

    #[test]
    fn test_empty_input() {
        let data: Vec<Vec<f32>> = vec![];
        assert!(matches!(AffinityPropagation::new().fit(&data), Err(EvalError::EmptyInput)));
    }
}
