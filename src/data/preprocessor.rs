// ============================================================
// Layer 4 — Volume Preprocessor
// ============================================================
// Brings every raw volume to the model's input layout.
//
// Steps (applied in order):
//   1. Normalise: every voxel > 0 becomes 1, everything else 0
//   2. Pad: centre the volume inside a zero volume of
//      `input_size` = [channels, depth, height, width]
//
// Padding is split evenly, with the odd voxel going after the
// data. A volume larger than the target on any axis, or with a
// different channel count, is rejected.

use crate::domain::sample::{Sample, Volume};
use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone)]
pub struct Preprocessor {
    input_size: [usize; 4],
}

impl Preprocessor {
    pub fn new(input_size: [usize; 4]) -> Self {
        Self { input_size }
    }

    pub fn input_size(&self) -> [usize; 4] {
        self.input_size
    }

    /// Binarise voxel values.
    pub fn normalize(&self, volume: &Volume) -> Volume {
        let voxels = volume
            .voxels
            .iter()
            .map(|&v| if v > 0.0 { 1.0 } else { 0.0 })
            .collect();
        Volume { shape: volume.shape, voxels }
    }

    /// Centre `volume` inside a zero volume of the target size.
    pub fn pad(&self, volume: &Volume) -> EvalResult<Volume> {
        const AXES: [&str; 4] = ["pad channels", "pad depth", "pad height", "pad width"];

        if volume.shape[0] != self.input_size[0] {
            return Err(EvalError::ShapeMismatch {
                context:  AXES[0],
                expected: self.input_size[0],
                found:    volume.shape[0],
            });
        }
        for axis in 1..4 {
            if volume.shape[axis] > self.input_size[axis] {
                return Err(EvalError::ShapeMismatch {
                    context:  AXES[axis],
                    expected: self.input_size[axis],
                    found:    volume.shape[axis],
                });
            }
        }

        let [c, d, h, w] = volume.shape;
        let offset = |axis: usize| (self.input_size[axis] - volume.shape[axis]) / 2;
        let (oz, oy, ox) = (offset(1), offset(2), offset(3));

        let mut out = Volume::zeros(self.input_size);
        for ch in 0..c {
            for z in 0..d {
                for y in 0..h {
                    let src = volume.index(ch, z, y, 0);
                    let dst = out.index(ch, z + oz, y + oy, ox);
                    out.voxels[dst..dst + w].copy_from_slice(&volume.voxels[src..src + w]);
                }
            }
        }
        Ok(out)
    }

    pub fn apply(&self, sample: &Sample) -> EvalResult<Sample> {
        let padded = self.pad(&self.normalize(&sample.volume))?;
        Ok(Sample::new(sample.id.clone(), padded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_binarises() {
        let v = Volume::new([1, 1, 1, 4], vec![0.0, 3.0, 255.0, 0.0]).unwrap();
        let n = Preprocessor::new([1, 1, 1, 4]).normalize(&v);
        assert_eq!(n.voxels, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_pad_centres_volume() {
        let v = Volume::new([1, 1, 1, 2], vec![1.0, 1.0]).unwrap();
        let p = Preprocessor::new([1, 3, 3, 4]).pad(&v).unwrap();
        assert_eq!(p.shape, [1, 3, 3, 4]);
        assert_eq!(p.foreground(), 2);
        assert_eq!(p.voxels[p.index(0, 1, 1, 1)], 1.0);
        assert_eq!(p.voxels[p.index(0, 1, 1, 2)], 1.0);
    }

    #[test]
    fn test_pad_rejects_oversized_volume() {
        let v = Volume::zeros([1, 4, 2, 2]);
        let err = Preprocessor::new([1, 3, 3, 3]).pad(&v).unwrap_err();
        assert!(matches!(
            err,
            EvalError::ShapeMismatch { context: "pad depth", expected: 3, found: 4 }
        ));
    }

    #[test]
    fn test_apply_keeps_id() {
        let s = Sample::new("sub-07", Volume::new([1, 1, 1, 1], vec![9.0]).unwrap());
        let out = Preprocessor::new([1, 2, 2, 2]).apply(&s).unwrap();
        assert_eq!(out.id, "sub-07");
        assert_eq!(out.volume.foreground(), 1);
    }
}
