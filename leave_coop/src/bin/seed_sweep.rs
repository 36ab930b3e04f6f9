//! Monte Carlo runner: one configuration, many seeds, run in parallel.
//!
//! Usage:
//!   cargo run --release --bin seed_sweep -- --config configs/baseline.toml --runs 32

use anyhow::{Context as _, Result};
use clap::Parser;
use des::parallel::{simple_progress_reporter, ParallelRunner};
use leave_coop::driver::build_event_loop;
use leave_coop::output::RunSummary;
use leave_coop::{SimulationConfig, StrategySpace};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "seed_sweep")]
#[command(about = "Run one configuration across many seeds in parallel")]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of seeds, starting at the configured seed
    #[arg(long, default_value = "16")]
    runs: usize,

    #[arg(long)]
    threads: Option<usize>,

    /// Steps averaged per run
    #[arg(long, default_value = "200")]
    tail: usize,

    /// Write all run summaries as a JSON array
    #[arg(long)]
    output: Option<PathBuf>,
}

struct MeanStd {
    mean: f64,
    std: f64,
}

fn mean_std(values: &[f64]) -> MeanStd {
    if values.is_empty() {
        return MeanStd { mean: 0.0, std: 0.0 };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    MeanStd {
        mean,
        std: variance.sqrt(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let base = match &cli.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SimulationConfig::from_toml_str(&source)?
        }
        None => SimulationConfig::baseline(),
    };
    base.validate()?;
    let space = StrategySpace::new(base.alphabet());

    println!("=== Leave Option Seed Sweep ===\n");
    println!(
        "Configuration: {} runs × {} steps, seeds {}..{}\n",
        cli.runs,
        base.steps,
        base.seed,
        base.seed + cli.runs as u64
    );

    let start = Instant::now();
    let builder = |scenario_id: usize| {
        let config = SimulationConfig {
            seed: base.seed + scenario_id as u64,
            ..base.clone()
        };
        build_event_loop(config, Vec::new()).expect("configuration validated before the sweep")
    };
    let mut runner = ParallelRunner::new(cli.runs, builder)
        .progress(simple_progress_reporter((cli.runs / 10).max(1)));
    if let Some(threads) = cli.threads {
        runner = runner.num_threads(threads);
    }
    let results = runner.run(base.steps);

    let mut summaries = Vec::new();
    for (scenario_id, result) in results.into_iter().enumerate() {
        match result {
            Ok(mut reports) => match reports.pop() {
                Some(report) => summaries.push(RunSummary::from_report(&report, &space, cli.tail)),
                None => warn!(scenario_id, "run produced no report"),
            },
            Err(e) => warn!(scenario_id, error = %e, "run failed"),
        }
    }

    println!("\nCompleted {}/{} runs in {:.1?}\n", summaries.len(), cli.runs, start.elapsed());

    let cc: Vec<f64> = summaries.iter().map(|s| s.mean_share_cc).collect();
    let dd: Vec<f64> = summaries.iter().map(|s| s.mean_share_dd).collect();
    let payoff: Vec<f64> = summaries.iter().map(|s| s.mean_payoff).collect();
    let single: Vec<f64> = summaries.iter().map(|s| s.mean_unpartnered_share).collect();

    println!("Means over the last {} steps of each run:", cli.tail);
    for (label, values) in [
        ("%CC", &cc),
        ("%DD", &dd),
        ("Payoff", &payoff),
        ("Unpartnered", &single),
    ] {
        let MeanStd { mean, std } = mean_std(values);
        println!("  {:<12} {:>8.4} ± {:.4}", label, mean, std);
    }

    if let Some(path) = &cli.output {
        fs::write(path, serde_json::to_string_pretty(&summaries)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("\nWrote {} summaries to {}", summaries.len(), path.display());
    }

    Ok(())
}
