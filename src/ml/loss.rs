// ============================================================
// Layer 5 — NT-Xent validation loss
// ============================================================
// Normalised temperature-scaled cross entropy over a batch of
// B view pairs:
//
//   z      = L2-normalise(cat([forward(view_0), forward(view_1)]))   [2B, P]
//   logits = z · zᵀ / τ, with the diagonal masked out                [2B, 2B]
//   target(k) = k + B for k < B, k - B otherwise
//   loss   = mean_k cross_entropy(logits[k], target(k))
//
// The evaluation reports the mean of the per-batch losses.

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*, tensor::TensorData};

use crate::data::batcher::PairedBatch;
use crate::error::{EvalError, EvalResult};
use crate::ml::embeddable::Embeddable;

const MASK_VALUE: f32 = -1.0e9;

#[derive(Debug, Clone)]
pub struct NtXentLoss {
    temperature: f64,
}

impl NtXentLoss {
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }

    /// Loss of one batch of projection outputs.
    pub fn forward<B: Backend>(&self, z_i: Tensor<B, 2>, z_j: Tensor<B, 2>) -> Tensor<B, 1> {
        let device = z_i.device();
        let [batch, _] = z_i.dims();
        let n = 2 * batch;

        let z = normalize_rows(Tensor::cat(vec![z_i, z_j], 0));
        let sim = z.clone().matmul(z.transpose()).div_scalar(self.temperature);

        let mut mask = vec![0.0f32; n * n];
        for k in 0..n {
            mask[k * n + k] = MASK_VALUE;
        }
        let logits = sim + Tensor::from_data(TensorData::new(mask, [n, n]), &device);

        let targets: Vec<i32> = (0..n)
            .map(|k| (if k < batch { k + batch } else { k - batch }) as i32)
            .collect();
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &device);

        CrossEntropyLossConfig::new().init(&device).forward(logits, targets)
    }

    /// Mean loss over batches; `None` when there are no batches.
    pub fn evaluate<B, M, I>(&self, model: &M, batches: I) -> EvalResult<Option<f64>>
    where
        B: Backend,
        M: Embeddable<B>,
        I: IntoIterator<Item = PairedBatch<B>>,
    {
        let mut total = 0.0;
        let mut count = 0usize;
        for batch in batches {
            let n0 = batch.view_0.dims()[0];
            let n1 = batch.view_1.dims()[0];
            if n0 != n1 {
                return Err(EvalError::ShapeMismatch {
                    context:  "view pair batch",
                    expected: n0,
                    found:    n1,
                });
            }
            let loss = self.forward(model.forward(batch.view_0), model.forward(batch.view_1));
            total += scalar(loss)?;
            count += 1;
        }
        Ok((count > 0).then(|| total / count as f64))
    }
}

fn normalize_rows<B: Backend>(z: Tensor<B, 2>) -> Tensor<B, 2> {
    let norm = z.clone().powf_scalar(2.0).sum_dim(1).sqrt().clamp_min(1e-12);
    z / norm
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> EvalResult<f64> {
    let values: Vec<f32> = t
        .into_data()
        .to_vec()
        .map_err(|e| EvalError::TensorData(format!("{e:?}")))?;
    values
        .first()
        .map(|&v| f64::from(v))
        .ok_or(EvalError::EmptyInput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::backend::NdArray;

    fn tensor(values: Vec<f32>, shape: [usize; 2]) -> Tensor<NdArray, 2> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn test_single_pair_has_zero_loss() {
        let z = tensor(vec![0.3, -0.7], [1, 2]);
        let loss = scalar(NtXentLoss::new(0.5).forward(z.clone(), z)).unwrap();
        assert_relative_eq!(loss, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_matches_closed_form_for_orthogonal_pairs() {
        // Two orthogonal unit vectors, each view identical to its partner:
        // every row sees logits {1/τ (positive), 0, 0}.
        let z = tensor(vec![1.0, 0.0, 0.0, 1.0], [2, 2]);
        let t = 0.5;
        let loss = scalar(NtXentLoss::new(t).forward(z.clone(), z)).unwrap();
        let e = (1.0f64 / t).exp();
        assert_relative_eq!(loss, -(e / (e + 2.0)).ln(), epsilon = 1e-4);
    }

    #[test]
    fn test_aligned_views_beat_swapped_views() {
        let a = tensor(vec![1.0, 0.0, 0.0, 1.0], [2, 2]);
        let swapped = tensor(vec![0.0, 1.0, 1.0, 0.0], [2, 2]);
        let loss = NtXentLoss::new(0.1);
        let aligned = scalar(loss.forward(a.clone(), a.clone())).unwrap();
        let crossed = scalar(loss.forward(a, swapped)).unwrap();
        assert!(aligned < crossed);
    }
}
