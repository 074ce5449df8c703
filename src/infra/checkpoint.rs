// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Restores a trained run from its directory using Burn's
// CompactRecorder.
//
// Run directory layout:
//   <run_dir>/
//     config.json     ← RunConfig (architecture + temperature)
//     model.mpk.gz    ← encoder weights
//
// The config is read first so the encoder can be rebuilt with the
// same architecture before the weights are loaded into it.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::run_config::RunConfig;
use crate::ml::model::{SkeletonEncoder, SkeletonEncoderConfig};

pub const CONFIG_FILE: &str = "config.json";

/// Recorder path without extension; CompactRecorder adds `.mpk.gz`.
pub const MODEL_STEM: &str = "model";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and validate `<run_dir>/config.json`.
    pub fn load_config(&self) -> Result<RunConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read run config '{}'", path.display()))?;
        let cfg: RunConfig = serde_json::from_str(&json)
            .with_context(|| format!("Invalid run config '{}'", path.display()))?;
        cfg.validate()
            .with_context(|| format!("Rejected run config '{}'", path.display()))?;
        Ok(cfg)
    }

    pub fn save_config(&self, cfg: &RunConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    /// Rebuild the encoder described by `cfg` and load its weights.
    pub fn load_model<B: Backend>(
        &self,
        cfg:    &RunConfig,
        device: &B::Device,
    ) -> Result<SkeletonEncoder<B>> {
        let model = SkeletonEncoderConfig::from(cfg).init::<B>(device);
        let path = self.dir.join(MODEL_STEM);

        tracing::info!("Loading weights from '{}'", path.display());

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    pub fn save_model<B: Backend>(&self, model: &SkeletonEncoder<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(MODEL_STEM);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Saved checkpoint to '{}'", path.display());
        Ok(())
    }
}
