use serde::Serialize;
use tracing::info;

use crate::control::attitude::AttitudeError;
use crate::interfaces::{BodyId, StatusSink};
use crate::launch::plan::LaunchPlan;
use crate::ops::state::OperationState;

/// Condensed view of a launch plan for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub target: BodyId,
    pub target_name: String,
    pub required_delta_v: f64,
    pub planned_delta_v: f64,
    pub max_delta_v: f64,
    pub acceleration: f64,
    pub duration: f64,
    pub energy: f64,
    pub launch_ut: f64,
    pub partial: bool,
    pub valid: bool,
}

impl From<&LaunchPlan> for PlanSummary {
    fn from(plan: &LaunchPlan) -> Self {
        PlanSummary {
            target: plan.target,
            target_name: plan.target_name.clone(),
            required_delta_v: plan.node_delta_v,
            planned_delta_v: plan.planned_delta_v,
            max_delta_v: plan.max_delta_v,
            acceleration: plan.acceleration,
            duration: plan.duration,
            energy: plan.energy,
            launch_ut: plan.launch_ut,
            partial: plan.partial,
            valid: plan.is_valid(),
        }
    }
}

/// Payload state against the launch limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayloadReadout {
    pub max_delta_v: f64,
    pub relative_speed: f64, // m/s
    pub angular_speed: f64,  // deg/s
    /// Distance from the capture point, m.
    pub distance: f64,
    pub delta_v_ok: bool,
    pub speed_ok: bool,
    pub rotation_ok: bool,
    pub distance_ok: bool,
}

/// Records everything published by the accelerator.
///
/// Messages are mirrored to `tracing`; `journal` keeps them after a clear.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    pub state: OperationState,
    pub history: Vec<OperationState>,
    pub messages: Vec<String>,
    pub journal: Vec<String>,
    pub attitude: Option<(AttitudeError, bool)>,
    pub countdown: Option<f64>,
    pub plan: Option<PlanSummary>,
    pub payload: Option<PayloadReadout>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_message(&self, text: &str) -> bool {
        self.journal.iter().any(|m| m.contains(text))
    }

    pub fn visited(&self, state: OperationState) -> bool {
        self.history.contains(&state)
    }
}

impl StatusSink for StatusBoard {
    fn state_changed(&mut self, state: OperationState) {
        self.state = state;
        self.history.push(state);
    }

    fn message(&mut self, text: &str) {
        info!(target: "status", "{text}");
        self.messages.push(text.to_owned());
        self.journal.push(text.to_owned());
    }

    fn clear_messages(&mut self) {
        self.messages.clear();
    }

    fn attitude(&mut self, error: &AttitudeError, aligned: bool) {
        self.attitude = Some((*error, aligned));
    }

    fn countdown(&mut self, seconds: f64) {
        self.countdown = Some(seconds);
    }

    fn plan_summary(&mut self, summary: Option<PlanSummary>) {
        self.plan = summary;
    }

    fn payload_readout(&mut self, readout: PayloadReadout) {
        self.payload = Some(readout);
    }
}
