// ============================================================
// Layer 4 — Paired View Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<PairedSample>
// into two 5-D tensors, one per view.
//
//   Input:  N PairedSamples, each view shaped [C, D, H, W]
//   Output: PairedBatch { view_0: [N, C, D, H, W],
//                         view_1: [N, C, D, H, W],
//                         ids:    N identifiers }
//
// Row k of view_0 and row k of view_1 come from the same
// sample, whose identifier is ids[k].

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::PairedSample;
use crate::domain::sample::Volume;

#[derive(Debug, Clone)]
pub struct PairedBatch<B: Backend> {
    pub view_0: Tensor<B, 5>,
    pub view_1: Tensor<B, 5>,
    pub ids:    Vec<String>,
}

impl<B: Backend> PairedBatch<B> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct PairedBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PairedBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack(&self, views: Vec<&Volume>) -> Tensor<B, 5> {
        let n = views.len();
        let [c, d, h, w] = views.first().map_or([0; 4], |v| v.shape);
        let flat: Vec<f32> = views
            .iter()
            .flat_map(|v| v.voxels.iter().copied())
            .collect();
        Tensor::from_data(TensorData::new(flat, [n, c, d, h, w]), &self.device)
    }
}

// All views share one shape because the dataset pads every sample
// to the configured input size.
impl<B: Backend> Batcher<PairedSample, PairedBatch<B>> for PairedBatcher<B> {
    fn batch(&self, items: Vec<PairedSample>) -> PairedBatch<B> {
        let view_0 = self.stack(items.iter().map(|s| &s.view_0).collect());
        let view_1 = self.stack(items.iter().map(|s| &s.view_1).collect());
        let ids = items.into_iter().map(|s| s.id).collect();
        PairedBatch { view_0, view_1, ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes_and_ids() {
        let items: Vec<PairedSample> = (0..3)
            .map(|i| PairedSample {
                id:     format!("s{i}"),
                view_0: Volume::new([1, 2, 2, 2], vec![i as f32; 8]).unwrap(),
                view_1: Volume::new([1, 2, 2, 2], vec![-(i as f32); 8]).unwrap(),
            })
            .collect();
        let batch: PairedBatch<NdArray> = PairedBatcher::new(Default::default()).batch(items);

        assert_eq!(batch.view_0.dims(), [3, 1, 2, 2, 2]);
        assert_eq!(batch.view_1.dims(), [3, 1, 2, 2, 2]);
        assert_eq!(batch.ids, vec!["s0", "s1", "s2"]);

        let v1: Vec<f32> = batch.view_1.into_data().to_vec().unwrap();
        assert_eq!(v1[8], -1.0);
    }
}
