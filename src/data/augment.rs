// ============================================================
// Layer 4 — View Augmenter
// ============================================================
// Produces the two augmented views of a sample that the
// contrastive model compares:
//   - cutout: zero a random box covering `cutout_fraction` of
//     each spatial axis
//   - flip: mirror along the width axis with probability
//     `flip_probability`
//
// The generator is seeded from (seed, sample index), so the same
// sample always yields the same pair of views.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::sample::Volume;

#[derive(Debug, Clone)]
pub struct Augmenter {
    seed:             u64,
    cutout_fraction:  f64,
    flip_probability: f64,
}

impl Augmenter {
    pub fn new(seed: u64) -> Self {
        Self { seed, cutout_fraction: 0.3, flip_probability: 0.5 }
    }

    pub fn with_cutout_fraction(mut self, fraction: f64) -> Self {
        self.cutout_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_flip_probability(mut self, probability: f64) -> Self {
        self.flip_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// (view 0, view 1) for the sample at `index`.
    pub fn views(&self, index: usize, volume: &Volume) -> (Volume, Volume) {
        let mixed = self.seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut rng = StdRng::seed_from_u64(mixed);
        let first = self.augment(volume, &mut rng);
        let second = self.augment(volume, &mut rng);
        (first, second)
    }

    fn augment(&self, volume: &Volume, rng: &mut StdRng) -> Volume {
        let mut out = volume.clone();
        self.cutout(&mut out, rng);
        if rng.gen_bool(self.flip_probability) {
            flip_width(&mut out);
        }
        out
    }

    fn cutout(&self, volume: &mut Volume, rng: &mut StdRng) {
        if self.cutout_fraction == 0.0 || volume.is_empty() {
            return;
        }
        let [c, d, h, w] = volume.shape;
        let mut span = |extent: usize| {
            let size = ((extent as f64 * self.cutout_fraction).round() as usize).clamp(1, extent);
            let start = rng.gen_range(0..=extent - size);
            start..start + size
        };
        let (zs, ys, xs) = (span(d), span(h), span(w));
        for ch in 0..c {
            for z in zs.clone() {
                for y in ys.clone() {
                    let row = volume.index(ch, z, y, 0);
                    volume.voxels[row + xs.start..row + xs.end].fill(0.0);
                }
            }
        }
    }
}

fn flip_width(volume: &mut Volume) {
    let w = volume.shape[3];
    if w == 0 {
        return;
    }
    for row in volume.voxels.chunks_exact_mut(w) {
        row.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(shape: [usize; 4]) -> Volume {
        Volume::new(shape, vec![1.0; shape.iter().product()]).unwrap()
    }

    #[test]
    fn test_same_index_same_views() {
        let v = ones([1, 4, 4, 4]);
        let aug = Augmenter::new(3);
        assert_eq!(aug.views(5, &v), aug.views(5, &v));
    }

    #[test]
    fn test_cutout_removes_a_box() {
        let v = ones([1, 10, 10, 10]);
        let aug = Augmenter::new(0).with_flip_probability(0.0);
        let (a, b) = aug.views(0, &v);
        // A 3x3x3 box is zeroed in each view.
        assert_eq!(a.foreground(), 1000 - 27);
        assert_eq!(b.foreground(), 1000 - 27);
    }

    #[test]
    fn test_flip_mirrors_width() {
        let mut v = Volume::new([1, 1, 2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        flip_width(&mut v);
        assert_eq!(v.voxels, vec![3.0, 2.0, 1.0, 6.0, 5.0, 4.0]);
    }

    #[test]
    fn test_no_augmentation_is_identity() {
        let v = Volume::new([1, 1, 1, 3], vec![1.0, 0.0, 1.0]).unwrap();
        let aug = Augmenter::new(9).with_cutout_fraction(0.0).with_flip_probability(0.0);
        let (a, b) = aug.views(1, &v);
        assert_eq!(a, v);
        assert_eq!(b, v);
    }
}
