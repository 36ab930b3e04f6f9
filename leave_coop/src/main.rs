use anyhow::{Context as _, Result};
use clap::Parser;
use leave_coop::driver::build_event_loop;
use leave_coop::output::{write_csv, RunSummary, StepRow};
use leave_coop::{Context, SimulationConfig, StrategySpace};
use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "leave_coop")]
#[command(about = "Evolution of cooperation with an endogenous leave option")]
struct Cli {
    /// TOML configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    steps: Option<usize>,

    #[arg(long)]
    population: Option<usize>,

    /// Restrict strategies to cooperate/defect responses
    #[arg(long)]
    no_leave: bool,

    /// "random", a strategy alias such as tit-for-tat, or a genome like C-C-D-C-D
    #[arg(long)]
    initial_strategy: Option<String>,

    /// List the named strategies available under this configuration and exit
    #[arg(long)]
    list_strategies: bool,

    /// Print a progress line every N steps
    #[arg(long, default_value = "100")]
    report_every: usize,

    /// Write per-step statistics as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write a JSON run summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Steps averaged in the summary
    #[arg(long, default_value = "200")]
    tail: usize,
}

fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SimulationConfig::from_toml_str(&source)?
        }
        None => SimulationConfig::baseline(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(steps) = cli.steps {
        config.steps = steps;
    }
    if let Some(population) = cli.population {
        config.population_size = population;
    }
    if cli.no_leave {
        config.leave_option = false;
    }
    if let Some(initial) = &cli.initial_strategy {
        config.initial_strategy = initial.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let space = StrategySpace::new(config.alphabet());

    if cli.list_strategies {
        println!("Named strategies ({} strategies in total):", space.len());
        for (alias, id) in space.aliases() {
            let name = space.name_of(id)?;
            println!("  {:<20} {:<10} (id {})", alias, name, id);
        }
        return Ok(());
    }

    println!("Evolution of Cooperation with a Leave Option");
    println!("============================================\n");
    println!("Parameters:");
    println!("  Seed: {}", config.seed);
    println!("  Steps: {}", config.steps);
    println!("  Population size: {}", config.population_size);
    println!(
        "  Payoffs (CC/CD/DC/DD): {}/{}/{}/{}",
        config.payoffs.cc, config.payoffs.cd, config.payoffs.dc, config.payoffs.dd
    );
    println!("  Action error: {}", config.action_error);
    println!("  Mean interactions: {}", config.mean_interactions);
    println!("  Revision probability: {}", config.prob_revision);
    println!("  Experimentation probability: {}", config.prob_experimentation);
    println!("  Leave option: {}", config.leave_option);
    println!("  Initial strategy: {}", config.initial_strategy);
    println!("  Strategy space: {} strategies\n", space.len());

    let steps = config.steps;
    let mut event_loop = build_event_loop(config, Vec::new())?;
    event_loop.run(steps);
    let report = event_loop
        .stats()
        .pop()
        .context("event loop returned no report")?;

    println!(
        "{:<6} | {:<6} | {:<6} | {:<6} | {:<8} | {:<8} | {:<10}",
        "Step", "%CC", "%CD", "%DD", "Payoff", "Single", "Dominant"
    );
    println!("{}", "-".repeat(72));
    for stats in report
        .series
        .iter()
        .filter(|s| cli.report_every > 0 && (s.step % cli.report_every == 0 || s.step + 1 == steps))
    {
        let dominant = stats
            .dominant_strategy()
            .and_then(|(id, _)| space.name_of(id).ok())
            .unwrap_or_default();
        println!(
            "{:<6} | {:<6.1} | {:<6.1} | {:<6.1} | {:<8.3} | {:<8.3} | {:<10}",
            stats.step,
            stats.outcomes.cc * 100.0,
            stats.outcomes.cd * 100.0,
            stats.outcomes.dd * 100.0,
            stats.mean_payoff.unwrap_or(0.0),
            stats.unpartnered_share,
            dominant
        );
    }

    if let Some(last) = report.series.last() {
        println!("\nFinal response profile (share of population):");
        println!("  {:<4} | {:<6} | {:<6} | {:<6}", "Ctx", "C", "D", "L");
        for context in Context::ALL {
            let (c, d, l) = last.context(context).shares(last.population);
            println!("  {:<4} | {:<6.3} | {:<6.3} | {:<6.3}", context.label(), c, d, l);
        }
    }

    println!("\nMost common strategies:");
    for (rank, (name, count)) in report.top_strategies.iter().enumerate() {
        println!("  {}. {} ({} agents)", rank + 1, name, count);
    }

    if let Some(path) = &cli.csv {
        let rows: Vec<StepRow> = report
            .series
            .iter()
            .map(|s| StepRow::from_stats(s, &space))
            .collect();
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_csv(file, &rows)?;
        println!("\nWrote {} rows to {}", rows.len(), path.display());
    }

    if let Some(path) = &cli.summary {
        let summary = RunSummary::from_report(&report, &space, cli.tail);
        fs::write(path, summary.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote run summary to {}", path.display());
    }

    Ok(())
}
