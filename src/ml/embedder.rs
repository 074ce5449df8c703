// ============================================================
// Layer 5 — Embedding Computer
// ============================================================
// Runs a frozen model over paired-view batches and accumulates
// the representations:
//
//   for each batch (view_0 [B,...], view_1 [B,...], ids [B]):
//     r0 = represent(view_0)                   [B, d]
//     r1 = represent(view_1)                   [B, d]
//     cat([r0, r1], feature axis)              [B, 2d]
//     reshape → rows 2k / 2k+1 = views of k    [2B, d]
//     append to the accumulator                [rows so far + 2B, d]
//
// The accumulator starts as an empty [0, d] matrix. Batch tensors
// are dropped at the end of each iteration, so only the
// accumulator grows with the dataset. Evaluation backends carry no
// autodiff, so no gradients are tracked.

use burn::prelude::*;

use crate::data::batcher::PairedBatch;
use crate::domain::embedding::PairedEmbeddings;
use crate::error::{EvalError, EvalResult};
use crate::ml::embeddable::Embeddable;

pub struct EmbeddingComputer<'a, M> {
    model: &'a M,
}

impl<'a, M> EmbeddingComputer<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }

    pub fn compute<B, I>(&self, batches: I) -> EvalResult<PairedEmbeddings>
    where
        B: Backend,
        M: Embeddable<B>,
        I: IntoIterator<Item = PairedBatch<B>>,
    {
        let dim = self.model.representation_dim();
        let mut accumulated = PairedEmbeddings::new(dim);

        for (index, batch) in batches.into_iter().enumerate() {
            let n0 = batch.view_0.dims()[0];
            let n1 = batch.view_1.dims()[0];
            if n0 != n1 {
                return Err(EvalError::ShapeMismatch {
                    context:  "view pair batch",
                    expected: n0,
                    found:    n1,
                });
            }
            if batch.ids.len() != n0 {
                return Err(EvalError::ShapeMismatch {
                    context:  "identifiers per batch",
                    expected: n0,
                    found:    batch.ids.len(),
                });
            }

            let r0 = self.model.represent(batch.view_0);
            let r1 = self.model.represent(batch.view_1);
            let [_, d] = r0.dims();
            if d != dim {
                return Err(EvalError::ShapeMismatch {
                    context:  "representation width",
                    expected: dim,
                    found:    d,
                });
            }

            let interleaved: Tensor<B, 2> = Tensor::cat(vec![r0, r1], 1).reshape([2 * n0, d]);
            let block: Vec<f32> = interleaved
                .into_data()
                .to_vec()
                .map_err(|e| EvalError::TensorData(format!("{e:?}")))?;
            accumulated.push_interleaved(&block, &batch.ids)?;

            tracing::debug!("Batch {}: {} samples, {} rows total", index, n0, accumulated.matrix().n_rows());
        }

        Ok(accumulated)
    }
}
