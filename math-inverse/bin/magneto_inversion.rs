//! Synthetic permeability inversion driver
//!
//! Reads a scenario (grid, true anomalies, sources, sensors, options),
//! synthesises observations from the true model and inverts them starting
//! from a uniform background. The report is written as JSON.
//!
//! Usage:
//!   cargo run --release --bin magneto-inversion -- --scenario scenario.json
//!   RUST_LOG=debug cargo run --release --bin magneto-inversion -- --scenario scenario.json --method born

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use math_magneto_inverse::{
    InversionMethod, InversionReport, IterationRecord, LogObserver, IterationObserver,
    ObserverAction, Scenario,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "magneto-inversion", about = "Invert cell permeability from synthetic magnetostatic data")]
struct Args {
    /// Path to JSON scenario file
    #[arg(short, long)]
    scenario: PathBuf,

    /// Output JSON file path
    #[arg(short, long, default_value = "inversion_report.json")]
    output: PathBuf,

    /// Override inversion method
    #[arg(short, long)]
    method: Option<CliMethod>,

    /// Override maximum outer iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Number of Jacobian workers (default: all cores)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Print one line per iteration to stdout
    #[arg(long)]
    progress: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMethod {
    GaussNewton,
    Born,
}

impl From<CliMethod> for InversionMethod {
    fn from(method: CliMethod) -> Self {
        match method {
            CliMethod::GaussNewton => InversionMethod::GaussNewton,
            CliMethod::Born => InversionMethod::Born,
        }
    }
}

#[derive(Serialize)]
struct Output<'a> {
    true_mu: &'a [f64],
    report: &'a InversionReport,
}

struct ProgressObserver {
    print: bool,
}

impl IterationObserver for ProgressObserver {
    fn on_iteration(&mut self, record: &IterationRecord) -> ObserverAction {
        if self.print {
            println!(
                "{:>4}  Φ = {:>14.6e}  Φ/Φ₀ = {:>10.3e}{}",
                record.iteration,
                record.functional,
                record.relative_functional,
                if record.stagnated { "  (stagnated)" } else { "" }
            );
        }
        LogObserver.on_iteration(record)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut scenario = Scenario::from_file(&args.scenario)
        .with_context(|| format!("failed to load scenario {}", args.scenario.display()))?;
    if let Some(method) = args.method {
        scenario.inverse.method = method.into();
    }
    if let Some(max_iterations) = args.max_iterations {
        scenario.inverse.max_iterations = max_iterations;
    }
    if args.threads.is_some() {
        scenario.inverse.jacobian.threads = args.threads;
    }

    let mut observer = ProgressObserver {
        print: args.progress,
    };
    let (truth, report) = scenario.run(&mut observer).context("inversion failed")?;

    println!(
        "Stopped after {} iterations ({:?}): Φ {:.6e} -> {:.6e}",
        report.iterations(),
        report.stop_reason,
        report.initial_functional().unwrap_or(report.final_functional),
        report.final_functional
    );

    let output = Output {
        true_mu: truth.mu_values(),
        report: &report,
    };
    fs::write(&args.output, serde_json::to_string_pretty(&output)?)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Report written to {}", args.output.display());

    Ok(())
}
