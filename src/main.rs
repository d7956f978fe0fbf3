use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mass_driver::io::csv::write_axis_trace_file;
use mass_driver::io::json::{write_report_file, LaunchReport};
use mass_driver::sim::{Scenario, Simulation};
use mass_driver::{ControlConfig, OperationState};

/// Ticks allowed for acquisition and for the whole launch.
const ACQUIRE_TICKS: u64 = 100;
const LAUNCH_TICKS: u64 = 200_000;

/// Run the reference mass driver launch and print the result.
#[derive(Parser, Debug)]
#[command(version, about = "Mass driver launch on the reference world")]
struct Cli {
    /// Controller configuration (TOML); defaults apply when omitted
    config: Option<PathBuf>,

    /// Write the per-axis controller trace as CSV
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Write the launch report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ControlConfig::load(path)?,
        None => ControlConfig::default(),
    };

    // -----------------------------------------------------------------------
    // Scenario: 5 t payload, 50 m/s prograde node ten minutes out
    // -----------------------------------------------------------------------
    let scenario = Scenario::default();
    let mut sim = Simulation::new(scenario.clone().build(), config)?;
    if cli.trace.is_some() {
        sim = sim.with_trace();
    }
    let started = sim.world.now();

    let acquired = |s: &Simulation| {
        s.accelerator.state() == OperationState::TargetPresent
            && s.accelerator.sequencer().plan().is_some()
    };
    sim.run_until(acquired, ACQUIRE_TICKS).ok_or("payload was not acquired")?;

    let plan = sim.accelerator.sequencer().plan().cloned().ok_or("no launch plan")?;

    println!();
    println!("====================================================================");
    println!("  MASS DRIVER LAUNCH: {}", plan.target_name);
    println!("====================================================================");
    println!();
    println!("  Launch Plan");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Host mass:     {:>8.0} kg    Payload:      {:>8.0} kg",
        scenario.host_mass, scenario.payload_mass
    );
    println!(
        "  Required dV:   {:>8.2} m/s   Max dV:       {:>8.2} m/s",
        plan.node_delta_v, plan.max_delta_v
    );
    println!(
        "  Acceleration:  {:>8.2} m/s^2 Duration:     {:>8.2} s",
        plan.acceleration, plan.duration
    );
    println!(
        "  Energy:        {:>8.1}       Launch in:    {:>8.1} s",
        plan.energy,
        plan.launch_ut - sim.world.now()
    );
    println!("  Feasible:      {:>8}       Partial:      {:>8}", plan.is_valid(), plan.partial);
    println!();

    if !sim.launch() {
        println!("  Launch refused: {:?}", sim.world.status().messages);
        return Ok(());
    }

    let finished = |s: &Simulation| {
        s.accelerator.state() == OperationState::Idle
            && s.world.status().visited(OperationState::Launching)
    };
    sim.run_until(finished, LAUNCH_TICKS);

    let report = LaunchReport::from_simulation(&sim, started);

    println!("  Sequence");
    println!("  ──────────────────────────────────────────────────────────────────");
    for state in &report.states {
        println!("  {state}");
    }
    println!();
    println!("  Messages");
    println!("  ──────────────────────────────────────────────────────────────────");
    for message in &report.messages {
        println!("  {message}");
    }
    println!();
    println!("  Result");
    println!("  ──────────────────────────────────────────────────────────────────");
    if let Some(speed) = report.payload_relative_speed {
        println!("  Payload relative speed: {:>8.3} m/s", speed);
    }
    if let Some(dv) = report.host_node_delta_v {
        println!("  Host recoil node:       {:>8.3} m/s", dv);
    }
    println!("  Energy left:            {:>8.1}", report.energy_left);
    println!("  Final state:            {}", report.final_state);
    println!();
    println!("  Simulation: {} ticks, dt={} s", sim.ticks(), sim.world.dt());
    println!("====================================================================");
    println!();

    if let Some(path) = cli.trace {
        write_axis_trace_file(&path, sim.trace())?;
    }
    if let Some(path) = cli.report {
        write_report_file(&path, &report)?;
    }
    Ok(())
}
