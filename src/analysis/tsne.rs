// ============================================================
// Dimensionality Reducer — exact t-SNE to 2-D
// ============================================================
// Pipeline:
//   1. Squared distances → conditional affinities P(j|i), with a
//      per-point bandwidth found by binary search so that the
//      entropy of P(.|i) equals ln(perplexity)
//   2. Symmetrise: P = (P + Pᵀ) / 2N
//   3. Initialise Y with the first two principal components,
//      rescaled so column 0 has standard deviation 1e-4
//   4. Gradient descent on KL(P || Q) with a Student-t kernel,
//      early exaggeration, momentum and per-coordinate gains
//
// Deterministic: the only randomness is the power-iteration start
// vector, drawn from a seeded generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cluster::util;
use crate::error::{EvalError, EvalResult};

const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const PERPLEXITY_STEPS: usize = 100;
const MIN_PROBABILITY: f64 = 1e-12;
const MIN_GAIN: f64 = 0.01;
const EXPLORATION_ITERATIONS: usize = 250;
const INIT_STD: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct DimensionalityReducer {
    perplexity:         f64,
    early_exaggeration: f64,
    n_iter:             usize,
    seed:               u64,
}

impl DimensionalityReducer {
    /// Perplexity 5, early exaggeration 12, 1000 iterations, seed 50.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Embed `data` into two dimensions. Requires more rows than the perplexity.
    pub fn fit_transform(&self, data: &[Vec<f32>]) -> EvalResult<Vec<[f32; 2]>> {
        util::check_rows(data)?;
        let n = data.len();
        if !(self.perplexity > 0.0) || (n as f64) <= self.perplexity {
            return Err(EvalError::InvalidParameter {
                name:    "perplexity",
                message: format!(
                    "must be positive and below the sample count ({}), got {}",
                    n, self.perplexity
                ),
            });
        }

        let p = self.joint_probabilities(data);
        let init = self.pca_init(data);
        let y = self.optimize(&p, init, n);
        Ok(y.chunks_exact(2).map(|c| [c[0] as f32, c[1] as f32]).collect())
    }

    fn joint_probabilities(&self, data: &[Vec<f32>]) -> Vec<f64> {
        let n = data.len();
        let mut dist = vec![0.0f64; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = util::squared_euclidean(&data[i], &data[j]);
                dist[i * n + j] = d;
                dist[j * n + i] = d;
            }
        }

        let target = self.perplexity.ln();
        let mut conditional = vec![0.0f64; n * n];
        for i in 0..n {
            let row = &dist[i * n..(i + 1) * n];
            let out = &mut conditional[i * n..(i + 1) * n];
            conditional_row(row, i, target, out);
        }

        let denom = 2.0 * n as f64;
        let mut joint = vec![0.0f64; n * n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let v = (conditional[i * n + j] + conditional[j * n + i]) / denom;
                    joint[i * n + j] = v.max(MIN_PROBABILITY);
                }
            }
        }
        joint
    }

    /// First two principal components via power iteration with deflation.
    fn pca_init(&self, data: &[Vec<f32>]) -> Vec<f64> {
        let n = data.len();
        let d = data[0].len();

        let mut mean = vec![0.0f64; d];
        for row in data {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += f64::from(x);
            }
        }
        mean.iter_mut().for_each(|m| *m /= n as f64);
        let centered: Vec<Vec<f64>> = data
            .iter()
            .map(|row| row.iter().zip(&mean).map(|(&x, m)| f64::from(x) - m).collect())
            .collect();

        let mut cov = vec![0.0f64; d * d];
        for row in &centered {
            for a in 0..d {
                if row[a] == 0.0 {
                    continue;
                }
                for b in 0..d {
                    cov[a * d + b] += row[a] * row[b];
                }
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut components: Vec<Vec<f64>> = Vec::with_capacity(2);
        for _ in 0..2.min(d) {
            let v = power_iteration(&cov, d, &components, &mut rng);
            components.push(v);
        }

        let mut y = vec![0.0f64; n * 2];
        for (i, row) in centered.iter().enumerate() {
            for (c, comp) in components.iter().enumerate() {
                y[i * 2 + c] = row.iter().zip(comp).map(|(a, b)| a * b).sum();
            }
        }

        let col0_mean = (0..n).map(|i| y[i * 2]).sum::<f64>() / n as f64;
        let col0_std = ((0..n).map(|i| (y[i * 2] - col0_mean).powi(2)).sum::<f64>() / n as f64).sqrt();
        if col0_std > 0.0 {
            let scale = INIT_STD / col0_std;
            y.iter_mut().for_each(|v| *v *= scale);
        }
        y
    }

    fn optimize(&self, p: &[f64], mut y: Vec<f64>, n: usize) -> Vec<f64> {
        let learning_rate = (n as f64 / self.early_exaggeration / 4.0).max(50.0);
        let mut update = vec![0.0f64; n * 2];
        let mut gains = vec![1.0f64; n * 2];
        let mut grad = vec![0.0f64; n * 2];
        let mut num = vec![0.0f64; n * n];

        for it in 0..self.n_iter {
            let exploring = it < EXPLORATION_ITERATIONS;
            let exaggeration = if exploring { self.early_exaggeration } else { 1.0 };
            let momentum = if exploring { 0.5 } else { 0.8 };

            // Student-t kernel numerators and their sum.
            let mut sum_num = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    let dx = y[i * 2] - y[j * 2];
                    let dy = y[i * 2 + 1] - y[j * 2 + 1];
                    let v = 1.0 / (1.0 + dx * dx + dy * dy);
                    num[i * n + j] = v;
                    num[j * n + i] = v;
                    sum_num += 2.0 * v;
                }
            }
            let sum_num = sum_num.max(f64::MIN_POSITIVE);

            grad.iter_mut().for_each(|g| *g = 0.0);
            for i in 0..n {
                let (mut gx, mut gy) = (0.0, 0.0);
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let q = (num[i * n + j] / sum_num).max(MIN_PROBABILITY);
                    let w = (exaggeration * p[i * n + j] - q) * num[i * n + j];
                    gx += w * (y[i * 2] - y[j * 2]);
                    gy += w * (y[i * 2 + 1] - y[j * 2 + 1]);
                }
                grad[i * 2] = 4.0 * gx;
                grad[i * 2 + 1] = 4.0 * gy;
            }

            for k in 0..n * 2 {
                let same_direction = (grad[k] > 0.0) == (update[k] > 0.0);
                gains[k] = if same_direction { gains[k] * 0.8 } else { gains[k] + 0.2 };
                gains[k] = gains[k].max(MIN_GAIN);
                update[k] = momentum * update[k] - learning_rate * gains[k] * grad[k];
                y[k] += update[k];
            }
        }
        y
    }
}

impl Default for DimensionalityReducer {
    fn default() -> Self {
        Self {
            perplexity:         5.0,
            early_exaggeration: 12.0,
            n_iter:             1000,
            seed:               50,
        }
    }
}

/// Binary search on the precision beta = 1 / (2σ²) for one row.
fn conditional_row(dist: &[f64], self_idx: usize, target_entropy: f64, out: &mut [f64]) {
    let mut beta = 1.0;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;

    for _ in 0..PERPLEXITY_STEPS {
        let mut sum = 0.0;
        for (j, (&d, o)) in dist.iter().zip(out.iter_mut()).enumerate() {
            *o = if j == self_idx { 0.0 } else { (-d * beta).exp() };
            sum += *o;
        }
        if sum == 0.0 {
            sum = 1e-8;
        }
        let mut weighted = 0.0;
        for (o, &d) in out.iter_mut().zip(dist) {
            *o /= sum;
            weighted += d * *o;
        }
        let entropy = sum.ln() + beta * weighted;
        let diff = entropy - target_entropy;
        if diff.abs() <= PERPLEXITY_TOLERANCE {
            break;
        }

        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_infinite() { beta * 2.0 } else { (beta + beta_max) / 2.0 };
        } else {
            beta_max = beta;
            beta = if beta_min.is_infinite() { beta / 2.0 } else { (beta + beta_min) / 2.0 };
        }
    }
}

fn power_iteration(cov: &[f64], d: usize, previous: &[Vec<f64>], rng: &mut StdRng) -> Vec<f64> {
    let mut v: Vec<f64> = (0..d).map(|_| rng.gen_range(-1.0..1.0)).collect();
    orthogonalize(&mut v, previous);
    normalize(&mut v);

    let mut next = vec![0.0f64; d];
    for _ in 0..300 {
        for a in 0..d {
            next[a] = (0..d).map(|b| cov[a * d + b] * v[b]).sum();
        }
        orthogonalize(&mut next, previous);
        if normalize(&mut next) == 0.0 {
            return vec![0.0; d];
        }
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut v, &mut next);
        if delta < 1e-10 {
            break;
        }
    }
    v
}

fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for b in basis {
        let dot: f64 = v.iter().zip(b).map(|(x, y)| x * y).sum();
        v.iter_mut().zip(b).for_each(|(x, y)| *x -= dot * y);
    }
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::Distribution;
    use rand_distr::Normal;

    fn blobs(per_blob: usize) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(3);
        let noise = Normal::new(0.0f32, 0.3).unwrap();
        let mut data = Vec::new();
        for center in [0.0f32, 8.0] {
            for _ in 0..per_blob {
                data.push((0..6).map(|_| center + noise.sample(&mut rng)).collect());
            }
        }
        data
    }

    fn dist(a: [f32; 2], b: [f32; 2]) -> f32 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
    }

    #[test]
    fn test_same_seed_same_output() {
        let data = blobs(10);
        let reducer = DimensionalityReducer::new().with_n_iter(300);
        let a = reducer.fit_transform(&data).unwrap();
        let b = reducer.fit_transform(&data).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), data.len());
    }

    #[test]
    fn test_separated_blobs_stay_separated() {
        let data = blobs(12);
        let y = DimensionalityReducer::new().with_n_iter(400).fit_transform(&data).unwrap();
        let (left, right) = y.split_at(12);

        let mean_within = |pts: &[[f32; 2]]| {
            let mut total = 0.0;
            let mut count = 0;
            for i in 0..pts.len() {
                for j in (i + 1)..pts.len() {
                    total += dist(pts[i], pts[j]);
                    count += 1;
                }
            }
            total / count as f32
        };
        let mut between = 0.0;
        for a in left {
            for b in right {
                between += dist(*a, *b);
            }
        }
        between /= (left.len() * right.len()) as f32;

        assert!(y.iter().all(|p| p[0].is_finite() && p[1].is_finite()));
        assert!(between > mean_within(left));
        assert!(between > mean_within(right));
    }

    #[test]
    fn test_too_few_samples_for_perplexity() {
        let data: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32, 0.0]).collect();
        assert!(matches!(
            DimensionalityReducer::new().fit_transform(&data),
            Err(EvalError::InvalidParameter { name: "perplexity", .. })
        ));
    }

    #[test]
    fn test_conditional_row_matches_perplexity() {
        let dist: Vec<f64> = (0..20).map(|j| (j as f64).powi(2) * 0.1).collect();
        let mut out = vec![0.0; 20];
        conditional_row(&dist, 0, 5.0f64.ln(), &mut out);
        assert_eq!(out[0], 0.0);
        let sum: f64 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        let entropy: f64 = -out.iter().filter(|&&p| p > 0.0).map(|p| p * p.ln()).sum::<f64>();
        assert!((entropy.exp() - 5.0).abs() < 1e-3);
    }
}
