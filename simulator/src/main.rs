//! Tokenkit Simulator
//!
//! Drives polls, shareholder assemblies and permission passes against the
//! tokenkit engines and reports what happened.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod metrics;
mod scenario;

use controller::SimulationController;
use scenario::{Scenario, ScenarioSize};

/// Tokenkit Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Tokenkit scenario runner")]
struct Args {
    /// Scenario to run (poll, full-turnout, shares, door-pass, tickets); all when omitted
    #[arg(short, long)]
    scenario: Option<String>,

    /// Number of voters, shareholders or users
    #[arg(short, long, default_value = "100")]
    participants: usize,

    /// Number of poll candidates
    #[arg(short, long, default_value = "3")]
    candidates: usize,

    /// Share of voters who cast their ballot before the referee interrupts
    #[arg(long, default_value = "0.7")]
    turnout: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Log as JSON lines
    #[arg(long)]
    json: bool,

    /// Print the scenario reports as JSON on stdout
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(args.json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!("Starting Tokenkit Simulator");
    info!("Participants: {}", args.participants);

    let size = ScenarioSize {
        participants: args.participants,
        candidates: args.candidates,
        turnout: args.turnout,
    };
    let scenarios = match &args.scenario {
        Some(name) => vec![Scenario::load(name, size)?],
        None => Scenario::all(size)?,
    };

    let mut controller = SimulationController::new(args.seed);
    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        reports.push(controller.run_scenario(scenario).await?);
    }

    // Print metrics
    let metrics = controller.get_metrics().await;
    info!("Simulation complete");
    info!("Total operations: {}", metrics.total_operations);
    info!("Applied: {}", metrics.applied_operations);
    info!("Refused: {}", metrics.refused_operations);
    info!("Failed: {}", metrics.failed_operations);
    info!("Events observed: {}", metrics.total_events());
    info!("Average latency: {}µs", metrics.average_latency_us());
    info!("p99 latency: {}µs", metrics.p99_latency_us());
    info!("Success rate: {:.1}%", metrics.success_rate() * 100.0);

    if args.report {
        let output = serde_json::json!({
            "scenarios": reports,
            "metrics": metrics,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}
