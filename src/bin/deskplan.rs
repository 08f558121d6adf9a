use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use deskplan::application::check_scenarios;
use deskplan::{PlanningInput, SweepOrchestrator, SweepReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about = "Plan hybrid-office desk allocation scenarios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve every scenario of a snapshot
    Solve {
        /// Snapshot file (.toml or .json)
        snapshot: PathBuf,

        /// Print the full report as JSON instead of a summary table
        #[arg(long)]
        json: bool,

        /// Solve scenarios on parallel workers (bounded by `max_workers`)
        #[arg(long)]
        concurrent: bool,
    },
    /// Build every scenario without solving and report problems
    Validate {
        snapshot: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Solve {
            snapshot,
            json,
            concurrent,
        } => solve(snapshot, json, concurrent).await,
        Commands::Validate { snapshot } => validate(snapshot),
    }
}

fn load(snapshot: &Path) -> anyhow::Result<PlanningInput> {
    PlanningInput::load(snapshot)
        .with_context(|| format!("failed to load snapshot {}", snapshot.display()))
}

async fn solve(snapshot: PathBuf, json: bool, concurrent: bool) -> anyhow::Result<()> {
    let input = load(&snapshot)?;
    let orchestrator = SweepOrchestrator::new(input)?;
    let plan = orchestrator.plan();

    let report = if concurrent {
        orchestrator.run_plan_concurrent(&plan, None).await
    } else {
        tokio::task::spawn_blocking(move || orchestrator.run_plan(&plan)).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }
    Ok(())
}

fn print_table(report: &SweepReport) {
    println!(
        "{:<4} {:<24} {:<11} {:>10} {:>9} {:>8} {:>10} {:>10}",
        "#", "scenario", "status", "objective", "occupied", "rate", "penalty", "time(ms)"
    );
    for result in &report.results {
        let objective = result
            .solution
            .objective_value
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<24} {:<11} {:>10} {:>9} {:>7.1}% {:>10.2} {:>10.1}",
            result.index,
            result.scenario.name,
            result.status.to_string(),
            objective,
            result.summary.total_occupancy,
            result.summary.weekly_occupancy_rate * 100.0,
            result.summary.fragmentation_penalty,
            result.summary.solve_time_ms,
        );
        if let Some(message) = &result.message {
            println!("     {message}");
        }
        for cause in &result.diagnosis {
            println!("     - {}", cause.detail);
        }
    }
    if let Some(best) = report.best() {
        println!("\nbest: {} ({})", best.scenario.name, best.status);
    }
}

fn validate(snapshot: PathBuf) -> anyhow::Result<()> {
    let input = PlanningInput::load(&snapshot);
    let input = match input {
        Ok(input) => input,
        Err(err) => {
            println!("{}: {}", snapshot.display(), err);
            anyhow::bail!("snapshot is invalid");
        }
    };

    let checks = check_scenarios(&input);
    let mut invalid = 0;
    for check in &checks {
        if check.is_valid() {
            println!(
                "ok       {} ({} variables, {} constraints)",
                check.name, check.num_variables, check.num_constraints
            );
        } else {
            invalid += 1;
            println!("invalid  {}", check.name);
            for error in &check.errors {
                println!("         - {error}");
            }
        }
        for warning in &check.warnings {
            println!("         ! {warning}");
        }
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} of {} scenarios are invalid", checks.len());
    }
    Ok(())
}
