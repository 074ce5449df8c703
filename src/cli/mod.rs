// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Arguments are parsed with
// `clap`; all work is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `evaluate`     — validate and cluster one run directory
//   2. `evaluate-all` — the same for every run under a directory
//   3. `aggregate`    — compare finished runs by latent size

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{AggregateArgs, Commands, EvaluateAllArgs, EvaluateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "skeleton-embed-eval",
    version = "0.1.0",
    about = "Evaluate contrastive skeleton encoders: embeddings, clustering and silhouette scores."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Evaluate(args)    => run_evaluate(args),
            Commands::EvaluateAll(args) => run_evaluate_all(args),
            Commands::Aggregate(args)   => run_aggregate(args),
        }
    }
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    tracing::info!("Evaluating run in: {}", args.run_dir.display());
    let result = EvaluateUseCase::new(args.into()).execute()?;

    println!("val_loss: {:.6}", result.val_loss);
    for (method, scores) in &result.silhouette {
        match scores.best() {
            Some((config, score)) => println!("{method}: best silhouette {score:.4} ({config})"),
            None => println!("{method}: no defined silhouette score"),
        }
    }
    Ok(())
}

fn run_evaluate_all(args: EvaluateAllArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateAllUseCase;

    tracing::info!("Evaluating every run in: {}", args.source_dir.display());
    let summary = EvaluateAllUseCase::new(args.into()).execute()?;

    println!("{} run(s) evaluated, {} failed", summary.completed.len(), summary.failed.len());
    for path in &summary.failed {
        println!("  failed: {}", path.display());
    }
    Ok(())
}

fn run_aggregate(args: AggregateArgs) -> Result<()> {
    use crate::application::aggregate_use_case::CrossRunAggregator;

    let points = CrossRunAggregator::new(args.into()).execute()?;

    println!("{:<24} {:>8} {:>12} {:>12}", "run", "latent", "val_loss", "silhouette");
    for p in &points {
        println!(
            "{:<24} {:>8} {:>12.6} {:>12.4}",
            p.run_id, p.latent_space_size, p.val_loss, p.silhouette
        );
    }
    Ok(())
}
