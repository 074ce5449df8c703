// ============================================================
// Layer 6 — Run Metrics
// ============================================================
// Records the scalar metrics of one evaluation run to
// `<run_dir>/metrics.csv`. One RunMetrics exists per run and is
// passed explicitly to the steps that record metrics; nothing is
// shared between runs.
//
// Example CSV output:
//   stage,key,value
//   validation,val_loss,0.412300
//   hierarchy,level_0,37
//   hierarchy,level_1,6
//   silhouette_DBSCAN,1.5,0.318000
//   silhouette_DBSCAN,1.0,
//
// An empty value means "no score".

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::run_result::SilhouetteScores;

/// File name of the metrics log inside a run directory.
pub const METRICS_FILE: &str = "metrics.csv";

pub struct RunMetrics {
    csv_path: PathBuf,
}

impl RunMetrics {
    /// Start a fresh log for the run, replacing any previous one.
    pub fn create(run_dir: &Path) -> Result<Self> {
        fs::create_dir_all(run_dir)
            .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;

        let csv_path = run_dir.join(METRICS_FILE);
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "stage,key,value")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one row; `None` is written as an empty value.
    pub fn record(&self, stage: &str, key: &str, value: Option<f64>) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        match value {
            Some(v) => writeln!(f, "{stage},{key},{v:.6}")?,
            None => writeln!(f, "{stage},{key},")?,
        }
        Ok(())
    }

    pub fn record_count(&self, stage: &str, key: &str, count: usize) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{stage},{key},{count}")?;
        Ok(())
    }

    /// One row per configuration of a silhouette sweep.
    pub fn record_scores(&self, method: &str, scores: &SilhouetteScores) -> Result<()> {
        let stage = format!("silhouette_{method}");
        for (config, score) in scores.iter() {
            self.record(&stage, config, score)?;
        }
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rows_are_appended_after_header() {
        let dir = tempdir().unwrap();
        let metrics = RunMetrics::create(dir.path()).unwrap();
        metrics.record("validation", "val_loss", Some(0.25)).unwrap();
        metrics.record_count("hierarchy", "level_0", 12).unwrap();

        let mut scores = SilhouetteScores::new();
        scores.insert("1.0", None);
        scores.insert("1.5", Some(0.5));
        metrics.record_scores("DBSCAN", &scores).unwrap();

        let text = fs::read_to_string(metrics.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "stage,key,value",
                "validation,val_loss,0.250000",
                "hierarchy,level_0,12",
                "silhouette_DBSCAN,1.0,",
                "silhouette_DBSCAN,1.5,0.500000",
            ]
        );
    }

    #[test]
    fn test_create_replaces_previous_log() {
        let dir = tempdir().unwrap();
        RunMetrics::create(dir.path()).unwrap().record("a", "b", Some(1.0)).unwrap();
        let fresh = RunMetrics::create(dir.path()).unwrap();
        let text = fs::read_to_string(fresh.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
