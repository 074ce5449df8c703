// ============================================================
// Layer 4 — Skeleton Volume Loader
// ============================================================
// Reads the subject list and one binary volume per subject.
//
// Subjects file: CSV, no header, first column = subject id.
//
// Volume file `<data_dir>/<id>.vol`:
//   bytes 0..12   three little-endian u32: depth, height, width
//   bytes 12..    depth * height * width u8 voxels, row-major
//
// A subject whose volume is missing or corrupt is skipped with a
// warning; the remaining subjects still load.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::sample::{Sample, Volume};
use crate::domain::traits::SampleSource;

/// File extension of a skeleton volume.
pub const VOLUME_EXTENSION: &str = "vol";

const HEADER_LEN: usize = 12;

pub struct SkeletonLoader {
    subjects: PathBuf,
    data_dir: PathBuf,
}

impl SkeletonLoader {
    pub fn new(subjects: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self { subjects: subjects.into(), data_dir: data_dir.into() }
    }

    /// Subject ids in file order, blank lines dropped.
    pub fn subject_ids(&self) -> Result<Vec<String>> {
        let text = fs::read_to_string(&self.subjects)
            .with_context(|| format!("Cannot read subjects file '{}'", self.subjects.display()))?;
        Ok(text
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect())
    }

    fn volume_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{id}.{VOLUME_EXTENSION}"))
    }
}

impl SampleSource for SkeletonLoader {
    fn load_all(&self) -> Result<Vec<Sample>> {
        let ids = self.subject_ids()?;
        let mut samples = Vec::with_capacity(ids.len());

        for id in ids {
            let path = self.volume_path(&id);
            match read_volume(&path) {
                Ok(volume) => {
                    tracing::debug!("Loaded: {} {:?}", id, volume.shape);
                    samples.push(Sample::new(id, volume));
                }
                Err(e) => {
                    tracing::warn!("Skipping subject '{}': {:#}", id, e);
                }
            }
        }

        tracing::info!("Successfully loaded {} skeleton volumes", samples.len());
        Ok(samples)
    }
}

/// Parse one `.vol` file into a single-channel volume.
pub fn read_volume(path: &Path) -> Result<Volume> {
    let bytes = fs::read(path).with_context(|| format!("Cannot read '{}'", path.display()))?;
    decode_volume(&bytes).with_context(|| format!("Corrupt volume '{}'", path.display()))
}

fn decode_volume(bytes: &[u8]) -> Result<Volume> {
    if bytes.len() < HEADER_LEN {
        bail!("header truncated ({} bytes)", bytes.len());
    }
    let dim = |i: usize| -> usize {
        let mut b = [0u8; 4];
        b.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
        u32::from_le_bytes(b) as usize
    };
    let (depth, height, width) = (dim(0), dim(1), dim(2));
    let expected = depth
        .checked_mul(height)
        .and_then(|n| n.checked_mul(width))
        .with_context(|| format!("volume dimensions {depth}x{height}x{width} overflow"))?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != expected {
        bail!(
            "expected {} voxels for {}x{}x{}, found {}",
            expected,
            depth,
            height,
            width,
            payload.len()
        );
    }

    let voxels = payload.iter().map(|&v| f32::from(v)).collect();
    Volume::new([1, depth, height, width], voxels)
        .context("voxel count does not match header")
}

/// Serialise a volume in `.vol` layout. Used to build fixtures.
pub fn encode_volume(depth: usize, height: usize, width: usize, voxels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + voxels.len());
    for d in [depth, height, width] {
        out.extend_from_slice(&(d as u32).to_le_bytes());
    }
    out.extend_from_slice(voxels);
    out
}
