// ============================================================
// Layer 5 — Embeddable capability
// ============================================================
// Anything that maps a batch of volumes to vectors can feed the
// embedding pipeline. Two implementations:
//
//   SkeletonEncoder   — the plain model
//   Instrumented<B,M> — wraps any Embeddable and notifies an
//                       optional ForwardObserver of every input
//
// SampleRecorder is the observer used during evaluation: it keeps
// the first sample of the first two inputs it sees, which are the
// view-0 and view-1 batches of the first evaluation batch.

use std::cell::RefCell;
use std::rc::Rc;

use burn::prelude::*;

use crate::data::batcher::PairedBatch;
use crate::domain::embedding::PairedEmbeddings;
use crate::domain::sample::Volume;
use crate::error::EvalResult;
use crate::ml::embedder::EmbeddingComputer;
use crate::ml::model::SkeletonEncoder;

pub trait Embeddable<B: Backend> {
    /// Full model output (after the projection head).
    fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 2>;

    /// Encoder representation (before the projection head).
    fn represent(&self, input: Tensor<B, 5>) -> Tensor<B, 2>;

    /// Width of `represent`'s output.
    fn representation_dim(&self) -> usize;

    /// Interleaved view-pair representations over every batch.
    fn compute_representations<I>(&self, batches: I) -> EvalResult<PairedEmbeddings>
    where
        Self: Sized,
        I: IntoIterator<Item = PairedBatch<B>>,
    {
        EmbeddingComputer::new(self).compute(batches)
    }
}

impl<B: Backend> Embeddable<B> for SkeletonEncoder<B> {
    fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 2> {
        SkeletonEncoder::forward(self, input)
    }

    fn represent(&self, input: Tensor<B, 5>) -> Tensor<B, 2> {
        SkeletonEncoder::represent(self, input)
    }

    fn representation_dim(&self) -> usize {
        self.num_representation_features
    }
}

// ─── Instrumentation ──────────────────────────────────────────────────────────

pub trait ForwardObserver<B: Backend> {
    fn observe(&self, input: &Tensor<B, 5>);
}

pub struct Instrumented<B: Backend, M> {
    inner:    M,
    observer: Option<Rc<dyn ForwardObserver<B>>>,
}

impl<B: Backend, M: Embeddable<B>> Instrumented<B, M> {
    pub fn new(inner: M) -> Self {
        Self { inner, observer: None }
    }

    pub fn with_observer(mut self, observer: Rc<dyn ForwardObserver<B>>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    fn notify(&self, input: &Tensor<B, 5>) {
        if let Some(observer) = &self.observer {
            observer.observe(input);
        }
    }
}

impl<B: Backend, M: Embeddable<B>> Embeddable<B> for Instrumented<B, M> {
    fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 2> {
        self.notify(&input);
        self.inner.forward(input)
    }

    fn represent(&self, input: Tensor<B, 5>) -> Tensor<B, 2> {
        self.notify(&input);
        self.inner.represent(input)
    }

    fn representation_dim(&self) -> usize {
        self.inner.representation_dim()
    }
}

/// Keeps the first sample of the first `capacity` observed inputs.
pub struct SampleRecorder {
    capacity: usize,
    samples:  RefCell<Vec<Volume>>,
}

impl SampleRecorder {
    /// Records one view pair.
    pub fn new() -> Self {
        Self::with_capacity(2)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, samples: RefCell::new(Vec::new()) }
    }

    pub fn samples(&self) -> Vec<Volume> {
        self.samples.borrow().clone()
    }

    pub fn is_full(&self) -> bool {
        self.samples.borrow().len() >= self.capacity
    }
}

impl Default for SampleRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> ForwardObserver<B> for SampleRecorder {
    fn observe(&self, input: &Tensor<B, 5>) {
        if self.is_full() {
            return;
        }
        let [n, c, d, h, w] = input.dims();
        if n == 0 {
            return;
        }
        let first = input.clone().slice([0..1, 0..c, 0..d, 0..h, 0..w]);
        match first.into_data().to_vec::<f32>() {
            Ok(voxels) => {
                if let Some(volume) = Volume::new([c, d, h, w], voxels) {
                    self.samples.borrow_mut().push(volume);
                }
            }
            Err(e) => tracing::warn!("Could not record input sample: {:?}", e),
        }
    }
}
