// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Validates a trained run and clusters its embeddings:
//
//   Step 1: Load RunConfig + weights      (Layer 6 - infra)
//   Step 2: Load, pad and pair samples    (Layer 4 - data)
//   Step 3: Validation loss (NT-Xent)     (Layer 5 - ml)
//   Step 4: Interleaved representations   (Layer 5 - ml)
//   Step 5: t-SNE of all rows, then keep  (analysis)
//           the first view of each sample
//   Step 6: KMeans / DBSCAN / hierarchical
//           Affinity Propagation + plots  (cluster, infra)
//   Step 7: Silhouette sweeps             (analysis)
//   Step 8: result.json, embeddings,      (Layer 6 - infra)
//           filenames, input view images
//
// EvaluateAllUseCase runs the same flow for every immediate
// subdirectory of a source directory; a failing run is logged
// and skipped.

use anyhow::{bail, Context, Result};
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};
use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::analysis::{format_eps, ClusterQualityScorer, DimensionalityReducer};
use crate::cluster::{
    Clustering, HierarchicalAffinityClusterer, Kmeans, DEFAULT_MAX_CLUSTERS,
};
use crate::data::{
    augment::Augmenter,
    batcher::PairedBatcher,
    dataset::SkeletonDataset,
    loader::SkeletonLoader,
    preprocessor::Preprocessor,
};
use crate::domain::run_result::{RunResult, SilhouetteScores};
use crate::domain::traits::SampleSource;
use crate::error::EvalError;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::RunMetrics,
    plots,
    run_store::RunResultWriter,
};
use crate::ml::{
    embeddable::{Embeddable, Instrumented, SampleRecorder},
    loss::NtXentLoss,
};

pub const METHOD_KMEANS: &str = "KMeans";
pub const METHOD_DBSCAN: &str = "DBSCAN";
pub const METHOD_AFFINITY: &str = "AffinityPropagation";

type EvalBackend = burn::backend::Wgpu;

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    /// Holds config.json and the weights; artifacts are written here.
    pub run_dir:      PathBuf,
    pub subjects:     PathBuf,
    pub data_dir:     PathBuf,
    pub max_clusters: usize,
    pub kmeans_max_k: usize,
    pub plots:        bool,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            run_dir:      PathBuf::from("runs/latest"),
            subjects:     PathBuf::from("data/subjects.csv"),
            data_dir:     PathBuf::from("data/volumes"),
            max_clusters: DEFAULT_MAX_CLUSTERS,
            kmeans_max_k: 10,
            plots:        true,
        }
    }
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<RunResult> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        self.run::<EvalBackend>(&device)
    }

    pub fn run<B: Backend>(&self, device: &B::Device) -> Result<RunResult> {
        let cfg = &self.config;
        let run_id = run_id_of(&cfg.run_dir);
        let span = tracing::info_span!("evaluate", run = %run_id);
        let _guard = span.enter();

        // ── Step 1: Restore the trained run ──────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.run_dir);
        let run_cfg = ckpt.load_config()?;
        let model = ckpt.load_model::<B>(&run_cfg, device)?;
        let metrics = RunMetrics::create(&cfg.run_dir)?;

        // ── Step 2: Samples → paired views → batches ─────────────────────────
        let samples = SkeletonLoader::new(&cfg.subjects, &cfg.data_dir).load_all()?;
        if samples.is_empty() {
            bail!("No samples could be loaded from '{}'", cfg.data_dir.display());
        }
        let dataset = SkeletonDataset::new(
            samples,
            &Preprocessor::new(run_cfg.input_size),
            Augmenter::new(run_cfg.seed),
        )
        .context("Cannot preprocess samples")?;
        tracing::info!("Evaluating {} samples", dataset.sample_count());

        let loader = DataLoaderBuilder::new(PairedBatcher::<B>::new(device.clone()))
            .batch_size(run_cfg.batch_size)
            .build(dataset);

        let recorder = Rc::new(SampleRecorder::new());
        let model: Instrumented<B, _> = Instrumented::new(model).with_observer(recorder.clone());

        // ── Step 3: Validation loss ──────────────────────────────────────────
        let val_loss = NtXentLoss::new(run_cfg.temperature)
            .evaluate(&model, loader.iter())?
            .ok_or(EvalError::EmptyInput)?;
        metrics.record("validation", "val_loss", Some(val_loss))?;
        tracing::info!("val_loss = {:.6}", val_loss);

        // ── Step 4: Interleaved representations ──────────────────────────────
        let paired = model.compute_representations(loader.iter())?;
        tracing::info!(
            "Computed {} x {} representations",
            paired.matrix().n_rows(),
            paired.matrix().dim()
        );

        // ── Step 5: t-SNE over all rows, first views kept ────────────────────
        let tsne_all = DimensionalityReducer::new()
            .fit_transform(&paired.matrix().to_rows())
            .context("t-SNE failed")?;
        let tsne: Vec<[f32; 2]> = tsne_all.into_iter().step_by(2).collect();
        let (embeddings, ids) = paired.first_views()?;
        let data = embeddings.to_rows();

        // ── Step 6: Clusterings for visualisation ────────────────────────────
        let kmeans = Kmeans::new(2.min(data.len())).with_seed(0).fit_predict(&data)?;
        self.plot("tsne_kmeans.png", |p| {
            plots::render_scatter(p, "t-SNE / KMeans (k = 2)", &tsne, &kmeans)
        });

        let scorer = ClusterQualityScorer::new().with_kmeans_max_k(cfg.kmeans_max_k);
        for &eps in scorer.dbscan_eps() {
            let labels = scorer.dbscan(eps).fit_predict(&data)?;
            let eps = format_eps(eps);
            self.plot(&format!("tsne_dbscan_{eps}.png"), |p| {
                plots::render_scatter(p, &format!("t-SNE / DBSCAN (eps = {eps})"), &tsne, &labels)
            });
        }

        let hierarchy = HierarchicalAffinityClusterer::default().with_max_clusters(cfg.max_clusters);
        let affinity_scores = match hierarchy.fit(&data) {
            Ok(outcome) => {
                for (level, count) in outcome.exemplar_counts.iter().enumerate() {
                    metrics.record_count("hierarchy", &format!("level_{level}"), *count)?;
                }
                tracing::info!(
                    "Affinity Propagation: {} clusters after {} coarsening pass(es)",
                    outcome.n_clusters(),
                    outcome.iterations
                );
                self.plot("tsne_af.png", |p| {
                    plots::render_scatter(p, "t-SNE / Affinity Propagation", &tsne, &outcome.labels)
                });
                scorer.score_hierarchy(&data, &outcome)?
            }
            Err(e) => absorb_hierarchy_failure(&metrics, e)?,
        };

        // ── Step 7: Silhouette sweeps ────────────────────────────────────────
        let kmeans_scores = scorer.sweep_kmeans(&data)?;
        let dbscan_scores = scorer.sweep_dbscan(&data)?;
        for (method, scores) in [
            (METHOD_KMEANS, &kmeans_scores),
            (METHOD_DBSCAN, &dbscan_scores),
            (METHOD_AFFINITY, &affinity_scores),
        ] {
            metrics.record_scores(method, scores)?;
            match scores.best() {
                Some((config, score)) => tracing::info!("{}: best silhouette {:.4} at {}", method, score, config),
                None => tracing::info!("{}: no defined silhouette score", method),
            }
            self.plot(&format!("silhouette_{method}.png"), |p| {
                plots::render_silhouette_curve(p, method, &scores.numeric_curve())
            });
        }

        // ── Step 8: Persist ──────────────────────────────────────────────────
        let result = RunResult::new(run_id, val_loss, run_cfg.num_representation_features, run_cfg.temperature)
            .with_scores(METHOD_KMEANS, kmeans_scores)
            .with_scores(METHOD_DBSCAN, dbscan_scores)
            .with_scores(METHOD_AFFINITY, affinity_scores);
        RunResultWriter::new(&cfg.run_dir)
            .write(&result, &embeddings, &ids)
            .with_context(|| format!("Cannot save results to '{}'", cfg.run_dir.display()))?;

        for (i, volume) in recorder.samples().iter().enumerate() {
            self.plot(&format!("input_view_{i}.png"), |p| plots::render_volume_slice(p, volume));
        }

        Ok(result)
    }

    /// Render one image into the run directory; failures are logged only.
    fn plot(&self, name: &str, render: impl FnOnce(&Path) -> Result<()>) {
        if !self.config.plots {
            return;
        }
        let path = self.config.run_dir.join(name);
        if let Err(e) = render(&path) {
            tracing::warn!("Could not render '{}': {:#}", path.display(), e);
        }
    }
}

/// A hierarchy that stalls or finds no exemplar leaves an empty
/// AffinityPropagation mapping; input errors still abort the run.
fn absorb_hierarchy_failure(metrics: &RunMetrics, err: EvalError) -> Result<SilhouetteScores> {
    match err {
        EvalError::ConvergenceStall { iterations, previous, current } => {
            tracing::warn!(
                "Affinity Propagation stalled after {} pass(es) ({} → {} exemplars); no score recorded",
                iterations,
                previous,
                current
            );
            metrics.record_count("hierarchy", "stalled_at", iterations)?;
        }
        EvalError::DidNotConverge { iterations } => {
            tracing::warn!(
                "Affinity Propagation found no exemplar after {} iterations; no score recorded",
                iterations
            );
            metrics.record_count("hierarchy", "no_exemplars_after", iterations)?;
        }
        other => return Err(other.into()),
    }
    Ok(SilhouetteScores::new())
}

fn run_id_of(run_dir: &Path) -> String {
    run_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| run_dir.display().to_string())
}

// ─── EvaluateAllUseCase ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EvaluateAllConfig {
    pub source_dir: PathBuf,
    /// Template for every run; `run_dir` is replaced per subdirectory.
    pub template:   EvaluateConfig,
}

/// Outcome of an `evaluate-all` sweep.
#[derive(Debug, Default)]
pub struct EvaluateAllSummary {
    pub completed: Vec<RunResult>,
    pub failed:    Vec<PathBuf>,
}

pub struct EvaluateAllUseCase {
    config: EvaluateAllConfig,
}

impl EvaluateAllUseCase {
    pub fn new(config: EvaluateAllConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvaluateAllSummary> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        self.run::<EvalBackend>(&device)
    }

    pub fn run<B: Backend>(&self, device: &B::Device) -> Result<EvaluateAllSummary> {
        let mut summary = EvaluateAllSummary::default();
        for run_dir in run_directories(&self.config.source_dir)? {
            let config = EvaluateConfig { run_dir: run_dir.clone(), ..self.config.template.clone() };
            match EvaluateUseCase::new(config).run::<B>(device) {
                Ok(result) => summary.completed.push(result),
                Err(e) => {
                    tracing::warn!("Skipping run '{}': {:#}", run_dir.display(), e);
                    summary.failed.push(run_dir);
                }
            }
        }
        tracing::info!(
            "Evaluated {} run(s), {} failed",
            summary.completed.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}

/// Immediate subdirectories, sorted by name.
pub fn run_directories(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(source_dir)
        .with_context(|| format!("Cannot read directory '{}'", source_dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
