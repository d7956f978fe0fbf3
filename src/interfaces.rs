//! Seams between the flight core and the simulation hosting it.
//!
//! Everything the accelerator reads or drives outside of its own state goes
//! through one of these traits. `sim::world::SimWorld` implements all of them
//! for tests and the demo binary.

use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;

use crate::control::attitude::AttitudeError;
use crate::control::torque::TorqueSource;
use crate::ops::state::OperationState;
use crate::orbital::{propagate_kepler, ManeuverNode, OrbitalState};
use crate::status::{PayloadReadout, PlanSummary};

/// Persistent identifier of a simulated body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BodyId(pub u32);

/// Read-only view of a body at the current instant.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub name: String,
    pub mass: f64,                     // kg
    pub position: Vector3<f64>,        // m, world (centre of mass)
    pub velocity: Vector3<f64>,        // m/s, orbital
    pub angular_velocity: Vector3<f64>, // rad/s
    /// Trailing point of the body's bounds; the launch path is measured from here.
    pub rear_point: Vector3<f64>,
    /// Weakest structural tolerance among the body's parts, in g.
    pub min_part_g_tolerance: f64,
    /// Sustained g tolerance of each crew member.
    pub crew_g_tolerances: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub trait SimClock {
    /// Universal time, s.
    fn now(&self) -> f64;
    /// Fixed physics step, s.
    fn fixed_dt(&self) -> f64;
    fn warp_to(&mut self, ut: f64);
    fn stop_warp(&mut self);
}

// ---------------------------------------------------------------------------
// Force actuators (capture and acceleration zones)
// ---------------------------------------------------------------------------

pub trait ForceActuator {
    fn enable(&mut self, on: bool);
    fn is_enabled(&self) -> bool;
    /// Commanded acceleration, m/s^2.
    fn power(&self) -> f64;
    fn set_power(&mut self, power: f64);
    fn max_power(&self) -> f64;
    /// `true` pushes bodies away from the attractor, `false` pulls and damps.
    fn set_inverted(&mut self, inverted: bool);
    fn is_inverted(&self) -> bool;
    /// Force (N) applied to a body of `mass` at `accel`, and the energy drawn per second.
    fn force_for_acceleration(&self, mass: f64, accel: f64) -> (f64, f64);
    fn bodies_in_zone(&self) -> Vec<BodyId>;
    /// Unit axis of the zone in world coordinates.
    fn axis_direction_world(&self) -> Vector3<f64>;
    fn attractor_position(&self) -> Vector3<f64>;
    /// Far end of the acceleration channel, when the structure has one.
    fn channel_end(&self) -> Option<Vector3<f64>>;
}

// ---------------------------------------------------------------------------
// Orbits and maneuver nodes
// ---------------------------------------------------------------------------

pub trait OrbitProvider {
    fn body(&self, id: BodyId) -> Option<BodySnapshot>;
    /// Orbital state of `id` propagated to `ut` along its current trajectory.
    fn state_at(&self, id: BodyId, ut: f64) -> Option<OrbitalState>;
    /// Nodes from the planning solver; `None` when no solver is attached to the body.
    fn planned_nodes(&self, id: BodyId) -> Option<Vec<ManeuverNode>>;
    /// Nodes stored in the body's flight plan.
    fn flight_plan_nodes(&self, id: BodyId) -> Vec<ManeuverNode>;
    fn clear_nodes(&mut self, id: BodyId);
    fn add_node(&mut self, id: BodyId, node: ManeuverNode);

    fn propagate(&self, state: &OrbitalState, ut: f64) -> OrbitalState {
        propagate_kepler(state, ut)
    }
}

// ---------------------------------------------------------------------------
// Host craft
// ---------------------------------------------------------------------------

/// Pilot stick deflection and trim, each in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PilotInput {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    pub pitch_trim: f64,
    pub roll_trim: f64,
    pub yaw_trim: f64,
}

impl PilotInput {
    /// Any axis further than `tolerance` from its trim.
    pub fn deviates(&self, tolerance: f64) -> bool {
        (self.pitch - self.pitch_trim).abs() > tolerance
            || (self.roll - self.roll_trim).abs() > tolerance
            || (self.yaw - self.yaw_trim).abs() > tolerance
    }
}

pub trait HostCraft {
    fn id(&self) -> BodyId;
    /// Local-to-world rotation. Local x is pitch, y is roll (the channel axis), z is yaw.
    fn rotation(&self) -> UnitQuaternion<f64>;
    /// rad/s, local frame.
    fn angular_velocity(&self) -> Vector3<f64>;
    /// Principal moments of inertia about the local axes, kg m^2.
    fn inertia(&self) -> Vector3<f64>;
    fn center_of_mass(&self) -> Vector3<f64>;
    fn shielded(&self) -> bool;
    fn pilot_input(&self) -> PilotInput;
    /// Per-axis command in [-1, 1] for the next actuation pass.
    fn set_attitude_command(&mut self, command: Vector3<f64>);
    fn stored_energy(&self) -> f64;
}

pub trait ActuatorInventory {
    fn torque_sources(&self) -> Vec<&dyn TorqueSource>;
}

// ---------------------------------------------------------------------------
// Status reporting
// ---------------------------------------------------------------------------

pub trait StatusSink {
    fn state_changed(&mut self, state: OperationState);
    fn message(&mut self, text: &str);
    fn clear_messages(&mut self);
    fn attitude(&mut self, error: &AttitudeError, aligned: bool);
    fn countdown(&mut self, seconds: f64);
    fn plan_summary(&mut self, summary: Option<PlanSummary>);
    fn payload_readout(&mut self, readout: PayloadReadout);
}

/// Borrowed collaborators for one callback.
pub struct Env<'a> {
    pub clock: &'a mut dyn SimClock,
    pub host: &'a mut dyn HostCraft,
    pub orbits: &'a mut dyn OrbitProvider,
    pub loading: &'a mut dyn ForceActuator,
    pub launching: &'a mut dyn ForceActuator,
    pub inventory: &'a dyn ActuatorInventory,
    pub status: &'a mut dyn StatusSink,
}
