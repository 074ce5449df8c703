// ============================================================
// Layer 2 — AggregateUseCase
// ============================================================
// Compares finished runs side by side:
//
//   Step 1: Read result.json of every immediate subdirectory
//   Step 2: One point per run (latent size, val_loss, best
//           silhouette of the chosen method)
//   Step 3: Sort by latent size and draw the dual-axis plot
//
// A directory without a readable result is skipped with a
// warning; the scan continues over the remaining runs.

use anyhow::Result;
use std::path::PathBuf;

use crate::application::evaluate_use_case::{run_directories, METHOD_AFFINITY};
use crate::domain::traits::RunResultSource;
use crate::error::EvalError;
use crate::infra::{
    plots::{self, AggregatePoint},
    run_store::RunStore,
};

pub const AGGREGATE_PLOT: &str = "loss_silhouette.png";

#[derive(Debug, Clone)]
pub struct AggregateConfig {
    pub source_dir: PathBuf,
    /// Defaults to `<source_dir>/loss_silhouette.png`.
    pub output:     Option<PathBuf>,
    pub method:     String,
}

impl AggregateConfig {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self { source_dir: source_dir.into(), output: None, method: METHOD_AFFINITY.to_string() }
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| self.source_dir.join(AGGREGATE_PLOT))
    }
}

pub struct CrossRunAggregator<S: RunResultSource = RunStore> {
    config: AggregateConfig,
    source: S,
}

impl CrossRunAggregator<RunStore> {
    pub fn new(config: AggregateConfig) -> Self {
        Self::with_source(config, RunStore)
    }
}

impl<S: RunResultSource> CrossRunAggregator<S> {
    pub fn with_source(config: AggregateConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Points for every readable run, sorted by latent space size.
    pub fn collect(&self) -> Result<Vec<AggregatePoint>> {
        let mut points = Vec::new();
        for run_dir in run_directories(&self.config.source_dir)? {
            let result = match self.source.load_result(&run_dir) {
                Ok(result) => result,
                Err(EvalError::MissingRunArtifact { path }) => {
                    tracing::warn!("Skipping '{}': no result at '{}'", run_dir.display(), path.display());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Skipping '{}': {}", run_dir.display(), e);
                    continue;
                }
            };
            let silhouette = result.best_score(&self.config.method).unwrap_or(f64::NAN);
            tracing::debug!(
                "{}: latent={} val_loss={:.6} silhouette={:.4}",
                result.run_id,
                result.latent_space_size,
                result.val_loss,
                silhouette
            );
            points.push(AggregatePoint {
                run_id: result.run_id,
                latent_space_size: result.latent_space_size,
                val_loss: result.val_loss,
                silhouette,
            });
        }
        points.sort_by(|a, b| {
            a.latent_space_size
                .cmp(&b.latent_space_size)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(points)
    }

    pub fn execute(&self) -> Result<Vec<AggregatePoint>> {
        let points = self.collect()?;
        tracing::info!(
            "Aggregated {} run(s) from '{}'",
            points.len(),
            self.config.source_dir.display()
        );
        if points.is_empty() {
            tracing::warn!("No run results found; nothing to plot");
            return Ok(points);
        }

        let output = self.config.output_path();
        match plots::render_loss_silhouette(&output, &points) {
            Ok(()) => tracing::info!("Saved comparison plot to '{}'", output.display()),
            Err(e) => tracing::warn!("Could not render '{}': {:#}", output.display(), e),
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::EmbeddingMatrix;
    use crate::domain::run_result::{RunResult, SilhouetteScores};
    use crate::infra::run_store::RunResultWriter;
    use std::fs;
    use tempfile::tempdir;

    fn write_run(root: &std::path::Path, name: &str, latent: usize, loss: f64, score: Option<f64>) {
        let mut scores = SilhouetteScores::new();
        scores.insert(3, score);
        let result = RunResult::new(name, loss, latent, 0.5).with_scores(METHOD_AFFINITY, scores);
        let matrix = EmbeddingMatrix::from_rows(&[vec![0.0; latent]]).unwrap();
        RunResultWriter::new(root.join(name))
            .write(&result, &matrix, &["sub-01".to_string()])
            .unwrap();
    }

    #[test]
    fn test_skips_missing_runs_and_sorts_by_latent_size() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "c", 32, 0.4, Some(0.2));
        write_run(dir.path(), "a", 8, 0.5, Some(0.6));
        write_run(dir.path(), "b", 16, 0.3, None);
        fs::create_dir(dir.path().join("unfinished")).unwrap();

        let points = CrossRunAggregator::new(AggregateConfig::new(dir.path())).collect().unwrap();

        let pairs: Vec<(usize, f64)> = points.iter().map(|p| (p.latent_space_size, p.val_loss)).collect();
        assert_eq!(pairs, vec![(8, 0.5), (16, 0.3), (32, 0.4)]);
        assert_eq!(points[0].silhouette, 0.6);
        assert!(points[1].silhouette.is_nan());
        assert_eq!(points[2].run_id, "c");
    }

    #[test]
    fn test_corrupt_result_is_skipped() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "good", 4, 1.0, Some(0.1));
        let bad = dir.path().join("bad");
        fs::create_dir(&bad).unwrap();
        fs::write(bad.join("result.json"), "{ not json").unwrap();

        let points = CrossRunAggregator::new(AggregateConfig::new(dir.path())).collect().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].run_id, "good");
    }

    #[test]
    fn test_empty_directory_yields_no_points() {
        let dir = tempdir().unwrap();
        let points = CrossRunAggregator::new(AggregateConfig::new(dir.path())).execute().unwrap();
        assert!(points.is_empty());
        assert!(!dir.path().join(AGGREGATE_PLOT).exists());
    }

    #[test]
    fn test_missing_source_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let config = AggregateConfig::new(dir.path().join("nope"));
        assert!(CrossRunAggregator::new(config).collect().is_err());
    }
}
