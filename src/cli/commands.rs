// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `evaluate`, `evaluate-all`
// and `aggregate`, with all their configurable flags.
//
// Every Args struct converts into its application-layer config
// through `From`, so Layer 2 never sees clap types.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::aggregate_use_case::AggregateConfig;
use crate::application::evaluate_use_case::{EvaluateAllConfig, EvaluateConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate one trained run and cluster its embeddings
    Evaluate(EvaluateArgs),

    /// Run `evaluate` for every run directory under a source directory
    EvaluateAll(EvaluateAllArgs),

    /// Plot loss and silhouette score against latent space size
    Aggregate(AggregateArgs),
}

/// Flags shared by `evaluate` and `evaluate-all`.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Subjects CSV; the first column is the subject id
    #[arg(long, default_value = "data/subjects.csv")]
    pub subjects: PathBuf,

    /// Directory holding one `<id>.vol` skeleton volume per subject
    #[arg(long, default_value = "data/volumes")]
    pub data_dir: PathBuf,

    /// Upper bound on Affinity Propagation clusters; exemplars are
    /// re-clustered until at most this many remain
    #[arg(long, default_value_t = 5)]
    pub max_clusters: usize,

    /// Largest k in the KMeans silhouette sweep
    #[arg(long, default_value_t = 10)]
    pub kmeans_max_k: usize,

    /// Skip PNG rendering
    #[arg(long)]
    pub no_plots: bool,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Run directory with config.json and model.mpk.gz;
    /// all artifacts are written here
    #[arg(long)]
    pub run_dir: PathBuf,

    #[command(flatten)]
    pub data: DataArgs,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            run_dir:      a.run_dir,
            subjects:     a.data.subjects,
            data_dir:     a.data.data_dir,
            max_clusters: a.data.max_clusters,
            kmeans_max_k: a.data.kmeans_max_k,
            plots:        !a.data.no_plots,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateAllArgs {
    /// Directory whose immediate subdirectories are run directories
    #[arg(long)]
    pub source_dir: PathBuf,

    #[command(flatten)]
    pub data: DataArgs,
}

impl From<EvaluateAllArgs> for EvaluateAllConfig {
    fn from(a: EvaluateAllArgs) -> Self {
        let template = EvaluateArgs { run_dir: a.source_dir.clone(), data: a.data }.into();
        EvaluateAllConfig { source_dir: a.source_dir, template }
    }
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Directory whose immediate subdirectories hold result.json files
    #[arg(long)]
    pub source_dir: PathBuf,

    /// Output image (default: <source-dir>/loss_silhouette.png)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Clustering method whose best silhouette score is plotted
    #[arg(long, default_value = "AffinityPropagation")]
    pub method: String,
}

impl From<AggregateArgs> for AggregateConfig {
    fn from(a: AggregateArgs) -> Self {
        AggregateConfig { source_dir: a.source_dir, output: a.output, method: a.method }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_evaluate_args_convert() {
        let cli = Cli::parse_from(["skeleton-embed-eval", "evaluate", "--run-dir", "runs/r1", "--no-plots"]);
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        let config = EvaluateConfig::from(args);
        assert_eq!(config.run_dir, PathBuf::from("runs/r1"));
        assert_eq!(config.max_clusters, 5);
        assert!(!config.plots);
    }

    #[test]
    fn test_evaluate_all_uses_shared_flags() {
        let cli = Cli::parse_from([
            "skeleton-embed-eval", "evaluate-all", "--source-dir", "runs", "--kmeans-max-k", "4",
        ]);
        let Commands::EvaluateAll(args) = cli.command else { panic!("expected evaluate-all") };
        let config = EvaluateAllConfig::from(args);
        assert_eq!(config.source_dir, PathBuf::from("runs"));
        assert_eq!(config.template.kmeans_max_k, 4);
        assert!(config.template.plots);
    }

    #[test]
    fn test_aggregate_defaults_to_affinity_propagation() {
        let cli = Cli::parse_from(["skeleton-embed-eval", "aggregate", "--source-dir", "runs"]);
        let Commands::Aggregate(args) = cli.command else { panic!("expected aggregate") };
        let config = AggregateConfig::from(args);
        assert_eq!(config.method, "AffinityPropagation");
        assert_eq!(config.output, None);
    }
}
