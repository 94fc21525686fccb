//! Furlong - main entry point
//!
//! Single-run CLI: fit on a training CSV, predict win probabilities for
//! a test CSV, write the output table.

use clap::{Parser, Subcommand};
use furlong::data::loader;
use furlong::pipeline::{PipelineConfig, RacePipeline};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "furlong")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Race win-probability estimation from historical performance data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit on training data and write test-set win probabilities
    Run {
        /// Training partition CSV
        #[arg(long)]
        train: PathBuf,

        /// Test partition CSV
        #[arg(long)]
        test: PathBuf,

        /// Output CSV: race_id, horse_id, win_prob
        #[arg(short, long)]
        output: PathBuf,

        /// Seed for splits, permutation importance, and simulation
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Monte Carlo draws per race
        #[arg(long, default_value = "50000")]
        simulations: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "furlong=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            train,
            test,
            output,
            seed,
            simulations,
        } => {
            let train_entries = loader::load_entries(&train)?;
            let test_entries = loader::load_entries(&test)?;

            let pipeline = RacePipeline::new(PipelineConfig {
                seed,
                n_simulations: simulations,
                ..PipelineConfig::default()
            });
            let outcome = pipeline.run(train_entries, test_entries)?;

            loader::write_probabilities(&output, &outcome.probabilities)?;
            info!(
                rows = outcome.probabilities.len(),
                output = %output.display(),
                "wrote win probabilities"
            );
            info!(
                rmse = outcome.regression.rmse,
                mae = outcome.regression.mae,
                r2 = outcome.regression.r2,
                log_loss = outcome.probability.log_loss,
                brier = outcome.probability.brier_score,
                spearman = outcome.probability.mean_spearman,
                champion_model = outcome.probability.champion_model,
                champion_market = outcome.probability.champion_market,
                champion_uniform = outcome.probability.champion_uniform,
                "run summary"
            );
        }
    }

    Ok(())
}
