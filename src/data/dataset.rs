use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::augment::Augmenter;
use crate::data::preprocessor::Preprocessor;
use crate::domain::sample::{Sample, Volume};
use crate::error::EvalResult;

/// Two augmented views of one preprocessed sample.
/// View order is fixed: `view_0` first, `view_1` second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedSample {
    pub id:     String,
    pub view_0: Volume,
    pub view_1: Volume,
}

pub struct SkeletonDataset {
    samples:   Vec<Sample>,
    augmenter: Augmenter,
}

impl SkeletonDataset {
    /// Preprocess every sample up front; views are drawn lazily in `get`.
    pub fn new(
        samples:      Vec<Sample>,
        preprocessor: &Preprocessor,
        augmenter:    Augmenter,
    ) -> EvalResult<Self> {
        let samples = samples
            .iter()
            .map(|s| preprocessor.apply(s))
            .collect::<EvalResult<Vec<_>>>()?;
        Ok(Self { samples, augmenter })
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<PairedSample> for SkeletonDataset {
    fn get(&self, index: usize) -> Option<PairedSample> {
        let sample = self.samples.get(index)?;
        let (view_0, view_1) = self.augmenter.views(index, &sample.volume);
        Some(PairedSample { id: sample.id.clone(), view_0, view_1 })
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_padded_pair() {
        let samples = vec![
            Sample::new("a", Volume::new([1, 1, 1, 1], vec![4.0]).unwrap()),
            Sample::new("b", Volume::new([1, 2, 2, 2], vec![1.0; 8]).unwrap()),
        ];
        let ds = SkeletonDataset::new(samples, &Preprocessor::new([1, 2, 2, 2]), Augmenter::new(0)).unwrap();
        assert_eq!(ds.len(), 2);
        let pair = ds.get(1).unwrap();
        assert_eq!(pair.id, "b");
        assert_eq!(pair.view_0.shape, [1, 2, 2, 2]);
        assert_eq!(pair.view_1.shape, [1, 2, 2, 2]);
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_oversized_sample_fails_construction() {
        let samples = vec![Sample::new("big", Volume::zeros([1, 3, 1, 1]))];
        assert!(SkeletonDataset::new(samples, &Preprocessor::new([1, 2, 2, 2]), Augmenter::new(0)).is_err());
    }
}
