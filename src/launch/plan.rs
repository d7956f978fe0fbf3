use nalgebra::Vector3;

use crate::interfaces::BodyId;
use crate::orbital::{ManeuverNode, OrbitalState};

/// Everything known about the maneuver being prepared or executed.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub target: BodyId,
    pub target_name: String,
    pub node: Option<ManeuverNode>,
    /// |Δv| of the target's node, m/s.
    pub node_delta_v: f64,
    /// Δv the burn is sized for; below `node_delta_v` for partial launches.
    pub planned_delta_v: f64,
    pub acceleration: f64, // m/s^2
    pub raw_duration: f64, // s
    pub duration: f64,     // s, quantized to physics steps
    pub middle_duration: f64,
    pub launch_ut: f64,
    /// Seconds past `launch_ut` the ignition may still happen.
    pub launch_window: f64,
    pub energy: f64,
    pub max_acceleration_time: f64,
    pub max_delta_v: f64,
    pub partial: bool,
    pub maneuver_valid: bool,
    pub burn_started: bool,
}

impl LaunchPlan {
    pub fn new(target: BodyId, target_name: impl Into<String>) -> Self {
        Self {
            target,
            target_name: target_name.into(),
            node: None,
            node_delta_v: 0.0,
            planned_delta_v: 0.0,
            acceleration: 0.0,
            raw_duration: 0.0,
            duration: 0.0,
            middle_duration: 0.0,
            launch_ut: 0.0,
            launch_window: 0.0,
            energy: 0.0,
            max_acceleration_time: 0.0,
            max_delta_v: 0.0,
            partial: false,
            maneuver_valid: false,
            burn_started: false,
        }
    }

    /// Feasible and the node's post-maneuver trajectory is known.
    ///
    /// Presence of the target body is checked by the caller.
    pub fn is_valid(&self) -> bool {
        self.maneuver_valid && self.node.as_ref().is_some_and(|n| n.next_patch.is_some())
    }

    /// Inertial Δv still to deliver, given the target's state at the node time.
    pub fn burn_vector(&self, target_at_node: &OrbitalState) -> Vector3<f64> {
        self.node
            .as_ref()
            .and_then(|n| n.burn_vector(target_at_node))
            .unwrap_or_else(Vector3::zeros)
    }

    pub fn node_ut(&self) -> Option<f64> {
        self.node.as_ref().map(|n| n.ut)
    }

    pub fn apply_timing(&mut self, timing: &LaunchTiming, node_ut: f64, window_fraction: f64) {
        self.raw_duration = timing.raw_duration;
        self.duration = timing.duration;
        self.middle_duration = timing.middle_duration;
        self.launch_ut = node_ut - timing.middle_duration;
        self.launch_window = timing.middle_duration * window_fraction;
    }

    /// Ignition is no longer possible at `now`.
    pub fn missed_window(&self, now: f64) -> bool {
        now > self.launch_ut + self.launch_window
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchTiming {
    /// `delta_v / acceleration`.
    pub raw_duration: f64,
    /// Whole physics steps at full power.
    pub full_power_duration: f64,
    /// Full-power part plus the tapering steps.
    pub duration: f64,
    /// Time from ignition until half of the Δv is delivered.
    pub middle_duration: f64,
}

/// Burn timing on a clock that only changes power once per physics step.
///
/// The last `fine_tune_frames` steps are reserved for tapering: each one
/// delivers `remaining / (fine_tune_frames + 1)` until less than `tolerance`
/// is left.
pub fn calculate_timing(
    delta_v: f64,
    acceleration: f64,
    dt: f64,
    fine_tune_frames: u32,
    tolerance: f64,
) -> LaunchTiming {
    let raw_duration = delta_v / acceleration;
    if !(dt > 0.0) || !raw_duration.is_finite() {
        return LaunchTiming {
            raw_duration,
            full_power_duration: raw_duration,
            duration: raw_duration,
            middle_duration: raw_duration / 2.0,
        };
    }
    let frames = fine_tune_frames as f64;
    let half = delta_v / 2.0;
    // guard against 4997.000000000001 rounding up a whole extra step
    let full_steps = ((raw_duration / dt - frames).max(0.0) - 1e-9).ceil().max(0.0);
    let full_power_duration = full_steps * dt;

    let mut remaining = delta_v - acceleration * full_power_duration;
    let mut middle_duration =
        if remaining < half { raw_duration / 2.0 } else { full_power_duration };
    let mut duration = full_power_duration;
    let tolerance = tolerance.max(1e-9);
    while remaining > tolerance {
        let power = remaining / dt / (frames + 1.0);
        remaining -= power * dt;
        if remaining > half {
            middle_duration += dt;
        }
        duration += dt;
    }
    LaunchTiming { raw_duration, full_power_duration, duration, middle_duration }
}
