//! Hierarchical coarsening with repeated Affinity Propagation.
//!
//! Affinity Propagation on a full embedding set often returns far more clusters than
//! are useful for inspection. Instead of tuning the preference, the exemplar set is
//! coarsened level by level:
//!
//! 1. Fit on all `N` rows → exemplars `E_0`, labels `L_0`.
//! 2. While `|E_i| > K_max`: fit on the rows of `E_i` only, map the new exemplars back
//!    to dataset indices (`E_{i+1} ⊂ E_i`) and relabel the *full* dataset by
//!    nearest exemplar (`L_{i+1}`, length `N`).
//! 3. Stop once `|E_i| <= K_max`.
//!
//! Every pass must strictly shrink the exemplar set, and the number of passes is
//! capped; otherwise the loop reports [`EvalError::ConvergenceStall`].

use super::affinity::AffinityPropagation;
use super::traits::Clustering;
use super::util;
use crate::error::{EvalError, EvalResult};

/// Target maximum number of clusters after coarsening.
pub const DEFAULT_MAX_CLUSTERS: usize = 5;

/// Hard cap on coarsening passes.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

#[derive(Debug, Clone)]
pub struct HierarchicalAffinityClusterer {
    propagation:    AffinityPropagation,
    max_clusters:   usize,
    max_iterations: usize,
}

/// Result of a coarsening run.
#[derive(Debug, Clone)]
pub struct HierarchyOutcome {
    /// Final label per input row (length `N`).
    pub labels:          Vec<usize>,
    /// Final exemplar indices into the input rows.
    pub exemplars:       Vec<usize>,
    /// Exemplar count at each level, starting with the initial fit.
    pub exemplar_counts: Vec<usize>,
    /// Number of coarsening passes after the initial fit.
    pub iterations:      usize,
}

impl HierarchyOutcome {
    pub fn n_clusters(&self) -> usize {
        self.exemplars.len()
    }
}

impl HierarchicalAffinityClusterer {
    pub fn new(propagation: AffinityPropagation) -> Self {
        Self {
            propagation,
            max_clusters:   DEFAULT_MAX_CLUSTERS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn max_clusters(&self) -> usize {
        self.max_clusters
    }

    pub fn fit(&self, data: &[Vec<f32>]) -> EvalResult<HierarchyOutcome> {
        if self.max_clusters == 0 {
            return Err(EvalError::InvalidParameter {
                name:    "max_clusters",
                message: "must be at least 1".to_string(),
            });
        }
        util::check_rows(data)?;

        let initial = self.propagation.fit(data)?;
        let mut exemplars = initial.exemplars;
        let mut labels = initial.labels;
        let mut exemplar_counts = vec![exemplars.len()];
        let mut iterations = 0;

        tracing::debug!("Level 0: {} exemplars over {} rows", exemplars.len(), data.len());

        while exemplars.len() > self.max_clusters {
            if iterations >= self.max_iterations {
                return Err(stall_at_cap(iterations, &exemplar_counts));
            }

            let subset: Vec<Vec<f32>> = exemplars.iter().map(|&i| data[i].clone()).collect();
            let coarse = self.propagation.fit(&subset)?;
            iterations += 1;

            // Local exemplar positions → dataset indices. Both lists are
            // ascending, so the mapped list stays ascending.
            let next: Vec<usize> = coarse.exemplars.iter().map(|&j| exemplars[j]).collect();
            if next.len() >= exemplars.len() {
                return Err(EvalError::ConvergenceStall {
                    iterations,
                    previous: exemplars.len(),
                    current:  next.len(),
                });
            }

            labels = coarse.predict(data)?;
            tracing::debug!(
                "Level {}: {} → {} exemplars",
                iterations,
                exemplars.len(),
                next.len()
            );
            exemplars = next;
            exemplar_counts.push(exemplars.len());
        }

        Ok(HierarchyOutcome { labels, exemplars, exemplar_counts, iterations })
    }
}

/// Stall reported when the pass cap is hit; carries the last real transition
/// (`previous == current` only if no pass ran).
fn stall_at_cap(iterations: usize, exemplar_counts: &[usize]) -> EvalError {
    let (previous, current) = match exemplar_counts {
        [.., previous, current] => (*previous, *current),
        [only] => (*only, *only),
        [] => (0, 0),
    };
    EvalError::ConvergenceStall { iterations, previous, current }
}

impl Default for HierarchicalAffinityClusterer {
    fn default() -> Self {
        Self::new(AffinityPropagation::default())
    }
}

impl Clustering for HierarchicalAffinityClusterer {
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
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two visually separated groups of 10 points each.
    fn two_groups() -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut data = Vec::new();
        for center in [(0.0f32, 0.0f32), (10.0, 10.0)] {
            for _ in 0..10 {
                data.push(vec![
                    center.0 + rng.gen_range(-0.5..0.5),
                    center.1 + rng.gen_range(-0.5..0.5),
                ]);
            }
        }
        data
    }

    #[test]
    fn test_two_groups_end_to_end() {
        let data = two_groups();
        let outcome = HierarchicalAffinityClusterer::default().fit(&data).unwrap();

        assert!(outcome.iterations <= 3);
        assert_eq!(outcome.labels.len(), 20);
        assert_eq!(util::n_distinct(&outcome.labels), 2);
        assert!(outcome.labels[..10].iter().all(|&l| l == outcome.labels[0]));
        assert!(outcome.labels[10..].iter().all(|&l| l == outcome.labels[10]));
        assert_ne!(outcome.labels[0], outcome.labels[10]);
    }

    #[test]
    fn test_no_progress_is_reported_as_stall() {
        // Preference above every similarity: each point is its own exemplar at
        // every level, so the set never shrinks.
        let data: Vec<Vec<f32>> = (0..8).map(|i| vec![i as f32 * 3.0]).collect();
        let clusterer = HierarchicalAffinityClusterer::new(
            AffinityPropagation::new().with_preference(0.0),
        );
        let err = clusterer.fit(&data).unwrap_err();
        match err {
            EvalError::ConvergenceStall { iterations, previous, current } => {
                assert_eq!(iterations, 1);
                assert_eq!(previous, 8);
                assert_eq!(current, 8);
            }
            other => panic!("expected ConvergenceStall, got {other:?}"),
        }
    }

    #[test]
    fn test_iteration_cap_is_enforced() {
        let data: Vec<Vec<f32>> = (0..8).map(|i| vec![i as f32 * 3.0]).collect();
        let clusterer = HierarchicalAffinityClusterer::new(
            AffinityPropagation::new().with_preference(0.0),
        )
        .with_max_iterations(0);
        assert!(matches!(
            clusterer.fit(&data),
            Err(EvalError::ConvergenceStall { iterations: 0, .. })
        ));
    }

    #[test]
    fn test_cap_reports_last_transition() {
        match stall_at_cap(3, &[40, 21, 12, 8]) {
            EvalError::ConvergenceStall { iterations, previous, current } => {
                assert_eq!((iterations, previous, current), (3, 12, 8));
            }
            other => panic!("expected ConvergenceStall, got {other:?}"),
        }
        assert!(matches!(
            stall_at_cap(0, &[8]),
            EvalError::ConvergenceStall { iterations: 0, previous: 8, current: 8 }
        ));
    }

    #[test]
    fn test_labels_cover_input_or_stall_on_random_data() {
        for seed in 0..6u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let data: Vec<Vec<f32>> = (0..40)
                .map(|_| vec![rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)])
                .collect();
            let clusterer = HierarchicalAffinityClusterer::default();
            match clusterer.fit(&data) {
                Ok(outcome) => {
                    assert_eq!(outcome.labels.len(), data.len());
                    assert!(outcome.n_clusters() <= clusterer.max_clusters());
                    assert!(outcome.labels.iter().all(|&l| l < outcome.n_clusters()));
                    let counts = &outcome.exemplar_counts;
                    assert!(counts.windows(2).all(|w| w[1] < w[0]));
                }
                Err(EvalError::ConvergenceStall { iterations, .. }) => {
                    assert!(iterations <= DEFAULT_MAX_ITERATIONS);
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_max_clusters_is_rejected() {
        let data = two_groups();
        let clusterer = HierarchicalAffinityClusterer::default().with_max_clusters(0);
        assert!(matches!(clusterer.fit(&data), Err(EvalError::InvalidParameter { .. })));
    }
}
