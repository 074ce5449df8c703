// ============================================================
// Layer 3 — Sample Domain Type
// ============================================================
// One binary skeleton volume plus the subject identifier it
// was loaded for. Immutable once built by the data layer.

use serde::{Deserialize, Serialize};

/// A dense 4D volume laid out as [channels, depth, height, width],
/// row-major, one f32 per voxel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub shape:  [usize; 4],
    pub voxels: Vec<f32>,
}

impl Volume {
    /// Build a volume, returning None if the voxel count does not
    /// match the shape.
    pub fn new(shape: [usize; 4], voxels: Vec<f32>) -> Option<Self> {
        if shape.iter().product::<usize>() != voxels.len() {
            return None;
        }
        Some(Self { shape, voxels })
    }

    pub fn zeros(shape: [usize; 4]) -> Self {
        Self { shape, voxels: vec![0.0; shape.iter().product()] }
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Flat index of voxel (c, z, y, x).
    #[inline]
    pub fn index(&self, c: usize, z: usize, y: usize, x: usize) -> usize {
        let [_, d, h, w] = self.shape;
        ((c * d + z) * h + y) * w + x
    }

    /// Number of foreground voxels (value > 0).
    pub fn foreground(&self) -> usize {
        self.voxels.iter().filter(|&&v| v > 0.0).count()
    }
}

/// One input image with its identifier (subject id / filename).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub id:     String,
    pub volume: Volume,
}

impl Sample {
    pub fn new(id: impl Into<String>, volume: Volume) -> Self {
        Self { id: id.into(), volume }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_rejects_wrong_voxel_count() {
        assert!(Volume::new([1, 2, 2, 2], vec![0.0; 7]).is_none());
        assert!(Volume::new([1, 2, 2, 2], vec![0.0; 8]).is_some());
    }

    #[test]
    fn test_index_is_row_major() {
        let v = Volume::zeros([2, 3, 4, 5]);
        assert_eq!(v.index(0, 0, 0, 1), 1);
        assert_eq!(v.index(0, 0, 1, 0), 5);
        assert_eq!(v.index(0, 1, 0, 0), 20);
        assert_eq!(v.index(1, 0, 0, 0), 60);
    }
}
