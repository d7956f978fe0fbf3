use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::ops::OperationState;
use crate::sim::runner::Simulation;
use crate::status::{PayloadReadout, PlanSummary};

/// Summary of one simulated session.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub final_state: OperationState,
    pub states: Vec<OperationState>,
    pub elapsed_s: f64,
    pub plan: Option<PlanSummary>,
    pub payload: Option<PayloadReadout>,
    /// Payload speed relative to the host at the end, m/s.
    pub payload_relative_speed: Option<f64>,
    /// Δv of the reconciliation node left on the host, m/s.
    pub host_node_delta_v: Option<f64>,
    pub energy_left: f64,
    pub messages: Vec<String>,
}

impl LaunchReport {
    pub fn from_simulation(sim: &Simulation, started_at: f64) -> Self {
        let world = &sim.world;
        let status = world.status();
        let payload_relative_speed = world
            .payload_id()
            .and_then(|id| world.relative_velocity(id))
            .map(|v| v.norm());
        let host_node_delta_v = world
            .nodes(world.host_id())
            .first()
            .map(|n| n.delta_v_magnitude());
        LaunchReport {
            final_state: sim.accelerator.state(),
            states: status.history.clone(),
            elapsed_s: world.now() - started_at,
            plan: status.plan.clone(),
            payload: status.payload,
            payload_relative_speed,
            host_node_delta_v,
            energy_left: world.host_energy(),
            messages: status.journal.clone(),
        }
    }
}

/// Write the report as pretty-printed JSON.
pub fn write_report<W: Write>(writer: &mut W, report: &LaunchReport) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

/// Write the report JSON to a file.
pub fn write_report_file<P: AsRef<Path>>(path: P, report: &LaunchReport) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_report(&mut file, report)
}
