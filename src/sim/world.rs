//! Reference world implementing every collaborator the accelerator needs.
//!
//! Point-mass bodies in Earth orbit, a rigid host with reaction wheels, and
//! two force zones laid out along the host's local y axis:
//!
//! ```text
//!   capture zone         acceleration zone
//!   |s| < 3 m            -3 m <= s <= barrel length
//!   ----[ attractor ]===================================> +y (local)
//! ```
//!
//! Zone occupancy and geometry are cached at the end of every physics step so
//! the actuators can answer queries without borrowing the body list.

use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use crate::control::torque::{ReactionWheel, TorqueEnvelope, TorqueFrame, TorqueSource};
use crate::interfaces::{
    ActuatorInventory, BodyId, BodySnapshot, Env, ForceActuator, HostCraft, OrbitProvider,
    PilotInput,
    SimClock,
};
use crate::orbital::{
    propagate_kepler, rk4_orbital_step, KeplerianElements, ManeuverNode, NodeFrame, OrbitalState,
};
use crate::physics::MU_EARTH;
use crate::status::StatusBoard;

/// Radius of both zones around the channel axis, m.
pub const ZONE_RADIUS: f64 = 3.0;
/// Half-length of the capture zone along the axis, m.
pub const CAPTURE_HALF_LENGTH: f64 = 3.0;

/// Spring and damping of the capture hold, 1/s^2 and 1/s.
const HOLD_STIFFNESS: f64 = 1.0;
const HOLD_DAMPING: f64 = 2.0;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorldClock {
    now: f64,
    dt: f64,
    warp_target: Option<f64>,
}

impl SimClock for WorldClock {
    fn now(&self) -> f64 {
        self.now
    }

    fn fixed_dt(&self) -> f64 {
        self.dt
    }

    fn warp_to(&mut self, ut: f64) {
        if ut > self.now {
            self.warp_target = Some(ut);
        }
    }

    fn stop_warp(&mut self) {
        self.warp_target = None;
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimBody {
    pub id: BodyId,
    pub name: String,
    pub mass: f64,
    pub state: OrbitalState,
    pub angular_velocity: Vector3<f64>,
    /// Distance from the centre of mass to the trailing end, m.
    pub half_length: f64,
    pub g_tolerance: f64,
    pub crew_g_tolerances: Vec<f64>,
    /// Solver nodes; `None` when the body has no planner attached.
    pub planned: Option<Vec<ManeuverNode>>,
    pub flight_plan: Vec<ManeuverNode>,
}

impl SimBody {
    fn nodes(&self) -> Vec<ManeuverNode> {
        match &self.planned {
            Some(nodes) => nodes.clone(),
            None => self.flight_plan.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BodyRegistry {
    bodies: Vec<SimBody>,
    /// Channel axis, for trailing points.
    axis: Vector3<f64>,
}

impl BodyRegistry {
    pub fn get(&self, id: BodyId) -> Option<&SimBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BodyId) -> Option<&mut SimBody> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimBody> {
        self.bodies.iter()
    }
}

impl OrbitProvider for BodyRegistry {
    fn body(&self, id: BodyId) -> Option<BodySnapshot> {
        self.get(id).map(|b| BodySnapshot {
            id: b.id,
            name: b.name.clone(),
            mass: b.mass,
            position: b.state.pos,
            velocity: b.state.vel,
            angular_velocity: b.angular_velocity,
            rear_point: b.state.pos - self.axis * b.half_length,
            min_part_g_tolerance: b.g_tolerance,
            crew_g_tolerances: b.crew_g_tolerances.clone(),
        })
    }

    fn state_at(&self, id: BodyId, ut: f64) -> Option<OrbitalState> {
        self.get(id).map(|b| propagate_kepler(&b.state, ut))
    }

    fn planned_nodes(&self, id: BodyId) -> Option<Vec<ManeuverNode>> {
        self.get(id).and_then(|b| b.planned.clone())
    }

    fn flight_plan_nodes(&self, id: BodyId) -> Vec<ManeuverNode> {
        self.get(id).map(|b| b.flight_plan.clone()).unwrap_or_default()
    }

    fn clear_nodes(&mut self, id: BodyId) {
        if let Some(b) = self.get_mut(id) {
            if let Some(planned) = b.planned.as_mut() {
                planned.clear();
            }
            b.flight_plan.clear();
        }
    }

    fn add_node(&mut self, id: BodyId, node: ManeuverNode) {
        if let Some(b) = self.get_mut(id) {
            match b.planned.as_mut() {
                Some(planned) => planned.push(node),
                None => b.flight_plan.push(node),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimHost {
    id: BodyId,
    rotation: UnitQuaternion<f64>,
    /// rad/s, local.
    omega: Vector3<f64>,
    inertia: Vector3<f64>,
    shielded: bool,
    pilot: PilotInput,
    command: Vector3<f64>,
    energy: f64,
    com: Vector3<f64>,
}

impl HostCraft for SimHost {
    fn id(&self) -> BodyId {
        self.id
    }

    fn rotation(&self) -> UnitQuaternion<f64> {
        self.rotation
    }

    fn angular_velocity(&self) -> Vector3<f64> {
        self.omega
    }

    fn inertia(&self) -> Vector3<f64> {
        self.inertia
    }

    fn center_of_mass(&self) -> Vector3<f64> {
        self.com
    }

    fn shielded(&self) -> bool {
        self.shielded
    }

    fn pilot_input(&self) -> PilotInput {
        self.pilot
    }

    fn set_attitude_command(&mut self, command: Vector3<f64>) {
        self.command = command;
    }

    fn stored_energy(&self) -> f64 {
        self.energy
    }
}

// ---------------------------------------------------------------------------
// Force zones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneShape {
    Capture,
    Acceleration,
}

#[derive(Debug, Clone)]
pub struct ZoneActuator {
    shape: ZoneShape,
    enabled: bool,
    power: f64,
    max_power: f64,
    inverted: bool,
    /// Energy drawn per newton of force per second.
    energy_factor: f64,
    length: Option<f64>,
    inside: Vec<BodyId>,
    axis: Vector3<f64>,
    attractor: Vector3<f64>,
}

impl ZoneActuator {
    fn new(shape: ZoneShape, max_power: f64, length: Option<f64>, energy_factor: f64) -> Self {
        ZoneActuator {
            shape,
            enabled: false,
            power: max_power,
            max_power,
            inverted: false,
            energy_factor,
            length,
            inside: Vec::new(),
            axis: Vector3::y(),
            attractor: Vector3::zeros(),
        }
    }

    fn contains(&self, position: &Vector3<f64>) -> bool {
        let d = position - self.attractor;
        let s = d.dot(&self.axis);
        let lateral = (d - self.axis * s).norm();
        if lateral >= ZONE_RADIUS {
            return false;
        }
        match self.shape {
            ZoneShape::Capture => s.abs() < CAPTURE_HALF_LENGTH,
            ZoneShape::Acceleration => s >= -CAPTURE_HALF_LENGTH && s <= self.length.unwrap_or(0.0),
        }
    }
}

impl ForceActuator for ZoneActuator {
    fn enable(&mut self, on: bool) {
        self.enabled = on;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn power(&self) -> f64 {
        self.power
    }

    fn set_power(&mut self, power: f64) {
        self.power = power.clamp(0.0, self.max_power);
    }

    fn max_power(&self) -> f64 {
        self.max_power
    }

    fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn force_for_acceleration(&self, mass: f64, accel: f64) -> (f64, f64) {
        let force = mass * accel.min(self.max_power);
        (force, force * self.energy_factor)
    }

    fn bodies_in_zone(&self) -> Vec<BodyId> {
        self.inside.clone()
    }

    fn axis_direction_world(&self) -> Vector3<f64> {
        self.axis
    }

    fn attractor_position(&self) -> Vector3<f64> {
        self.attractor
    }

    fn channel_end(&self) -> Option<Vector3<f64>> {
        self.length.map(|l| self.attractor + self.axis * l)
    }
}

#[derive(Default)]
pub struct Inventory {
    sources: Vec<Box<dyn TorqueSource>>,
}

impl Inventory {
    pub fn push(&mut self, source: Box<dyn TorqueSource>) {
        self.sources.push(source);
    }
}

impl ActuatorInventory for Inventory {
    fn torque_sources(&self) -> Vec<&dyn TorqueSource> {
        self.sources.iter().map(|s| s.as_ref()).collect()
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

pub struct SimWorld {
    clock: WorldClock,
    host: SimHost,
    orbits: BodyRegistry,
    loading: ZoneActuator,
    launching: ZoneActuator,
    inventory: Inventory,
    status: StatusBoard,
    payload: Option<BodyId>,
    next_id: u32,
}

impl SimWorld {
    /// Borrow every collaborator for one callback.
    pub fn env(&mut self) -> Env<'_> {
        Env {
            clock: &mut self.clock,
            host: &mut self.host,
            orbits: &mut self.orbits,
            loading: &mut self.loading,
            launching: &mut self.launching,
            inventory: &self.inventory,
            status: &mut self.status,
        }
    }

    pub fn now(&self) -> f64 {
        self.clock.now
    }

    pub fn dt(&self) -> f64 {
        self.clock.dt
    }

    pub fn host_id(&self) -> BodyId {
        self.host.id
    }

    /// Body loaded when the scenario was built.
    pub fn payload_id(&self) -> Option<BodyId> {
        self.payload
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn body(&self, id: BodyId) -> Option<&SimBody> {
        self.orbits.get(id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &SimBody> {
        self.orbits.iter()
    }

    /// Nodes as the planner reports them.
    pub fn nodes(&self, id: BodyId) -> Vec<ManeuverNode> {
        self.orbits.get(id).map(SimBody::nodes).unwrap_or_default()
    }

    pub fn set_planned_nodes(&mut self, id: BodyId, nodes: Option<Vec<ManeuverNode>>) {
        if let Some(b) = self.orbits.get_mut(id) {
            b.planned = nodes;
        }
    }

    pub fn set_pilot_input(&mut self, input: PilotInput) {
        self.host.pilot = input;
    }

    pub fn host_rotation(&self) -> UnitQuaternion<f64> {
        self.host.rotation
    }

    /// rad/s, local.
    pub fn host_angular_velocity(&self) -> Vector3<f64> {
        self.host.omega
    }

    pub fn host_energy(&self) -> f64 {
        self.host.energy
    }

    pub fn host_velocity(&self) -> Vector3<f64> {
        self.orbits.get(self.host.id).map(|b| b.state.vel).unwrap_or_else(Vector3::zeros)
    }

    pub fn axis(&self) -> Vector3<f64> {
        self.launching.axis
    }

    /// World point `s` metres along the channel axis from the attractor.
    pub fn point_on_axis(&self, s: f64) -> Vector3<f64> {
        self.launching.attractor + self.launching.axis * s
    }

    pub fn loading_enabled(&self) -> bool {
        self.loading.enabled
    }

    pub fn launching_enabled(&self) -> bool {
        self.launching.enabled
    }

    pub fn launching_power(&self) -> f64 {
        self.launching.power
    }

    /// Velocity of `id` relative to the host.
    pub fn relative_velocity(&self, id: BodyId) -> Option<Vector3<f64>> {
        self.orbits.get(id).map(|b| b.state.vel - self.host_velocity())
    }

    pub fn spawn_body(
        &mut self,
        name: &str,
        mass: f64,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    ) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.orbits.bodies.push(SimBody {
            id,
            name: name.to_owned(),
            mass,
            state: OrbitalState { time: self.clock.now, pos: position, vel: velocity },
            angular_velocity: Vector3::zeros(),
            half_length: 1.0,
            g_tolerance: 10.0,
            crew_g_tolerances: Vec::new(),
            planned: None,
            flight_plan: Vec::new(),
        });
        self.refresh();
        id
    }

    pub fn remove_body(&mut self, id: BodyId) -> bool {
        let before = self.orbits.bodies.len();
        self.orbits.bodies.retain(|b| b.id != id || b.id == self.host.id);
        self.refresh();
        self.orbits.bodies.len() != before
    }

    pub fn set_body_angular_velocity(&mut self, id: BodyId, omega: Vector3<f64>) {
        if let Some(b) = self.orbits.get_mut(id) {
            b.angular_velocity = omega;
        }
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Advance one fixed physics step, or complete a pending time warp.
    pub fn physics_step(&mut self) {
        if let Some(target) = self.clock.warp_target.take() {
            self.warp(target);
            return;
        }
        let dt = self.clock.dt;
        self.apply_zone_forces(dt);

        let now = self.clock.now + dt;
        for body in &mut self.orbits.bodies {
            body.state = rk4_orbital_step(&body.state, dt, MU_EARTH);
            body.state.time = now;
        }
        self.integrate_attitude(dt);
        self.clock.now = now;
        self.refresh();
    }

    /// Jump on rails to `target`.
    fn warp(&mut self, target: f64) {
        let span = target - self.clock.now;
        debug!(from = self.clock.now, to = target, "time warp");
        for body in &mut self.orbits.bodies {
            body.state = propagate_kepler(&body.state, target);
        }
        self.host.rotation *= UnitQuaternion::from_scaled_axis(self.host.omega * span);
        self.host.command = Vector3::zeros();
        self.clock.now = target;
        self.refresh();
    }

    fn apply_zone_forces(&mut self, dt: f64) {
        let host_id = self.host.id;
        let Some(host) = self.orbits.get(host_id).cloned() else {
            return;
        };
        let axis = self.launching.axis;
        let mut kicks: Vec<(BodyId, Vector3<f64>)> = Vec::new();

        if self.loading.enabled {
            for id in &self.loading.inside {
                let Some(body) = self.orbits.get(*id) else { continue };
                let accel = if self.loading.inverted {
                    -axis * self.loading.max_power
                } else {
                    let offset = body.state.pos - self.loading.attractor;
                    let rel_vel = body.state.vel - host.state.vel;
                    let a = -offset * HOLD_STIFFNESS - rel_vel * HOLD_DAMPING;
                    let limit = self.loading.max_power;
                    if a.norm() > limit { a.normalize() * limit } else { a }
                };
                kicks.push((*id, accel));
            }
        }

        if self.launching.enabled {
            for id in &self.launching.inside {
                let Some(body) = self.orbits.get(*id) else { continue };
                let power = self.launching.power.min(self.launching.max_power);
                let accel = if self.launching.inverted {
                    if self.host.energy <= 0.0 {
                        continue;
                    }
                    let (force, energy_rate) =
                        self.launching.force_for_acceleration(body.mass, power);
                    self.host.energy = (self.host.energy - energy_rate * dt).max(0.0);
                    axis * (force / body.mass)
                } else {
                    let along = (body.state.vel - host.state.vel).dot(&axis);
                    let brake = power.min(along.abs() / dt);
                    -axis * along.signum() * brake
                };
                kicks.push((*id, accel));
            }
        }

        let mut recoil = Vector3::zeros();
        for (id, accel) in kicks {
            if let Some(body) = self.orbits.get_mut(id) {
                body.state.vel += accel * dt;
                recoil -= accel * (body.mass / host.mass) * dt;
            }
        }
        if let Some(h) = self.orbits.get_mut(host_id) {
            h.state.vel += recoil;
        }
    }

    fn integrate_attitude(&mut self, dt: f64) {
        let frame = TorqueFrame {
            to_local: self.host.rotation.inverse(),
            com: self.host.com,
            shielded: self.host.shielded,
        };
        let mut envelope = TorqueEnvelope::default();
        for source in self.inventory.torque_sources() {
            envelope.add_source(source, &frame);
        }
        let inertia = self.host.inertia;
        let command = self.host.command;
        let alpha = Vector3::from_fn(|i, _| {
            let torque =
                if command[i] >= 0.0 { envelope.positive[i] } else { -envelope.negative[i] };
            if inertia[i] > 0.0 { command[i] * torque / inertia[i] } else { 0.0 }
        });
        self.host.omega += alpha * dt;
        self.host.rotation *= UnitQuaternion::from_scaled_axis(self.host.omega * dt);
        self.host.command = Vector3::zeros();
    }

    /// Recompute geometry and zone occupancy from the body states.
    fn refresh(&mut self) {
        let host_id = self.host.id;
        let com = self.orbits.get(host_id).map(|b| b.state.pos).unwrap_or_else(Vector3::zeros);
        let axis = self.host.rotation * Vector3::y();
        self.host.com = com;
        self.orbits.axis = axis;
        for zone in [&mut self.loading, &mut self.launching] {
            zone.axis = axis;
            zone.attractor = com;
            zone.inside = self
                .orbits
                .bodies
                .iter()
                .filter(|b| b.id != host_id && zone.contains(&b.state.pos))
                .map(|b| b.id)
                .collect();
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// Parameters of a loaded accelerator in a circular orbit.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub dt: f64,
    pub altitude: f64,    // m
    pub inclination: f64, // rad
    pub host_mass: f64,
    pub host_inertia: Vector3<f64>,
    pub wheel_torque: f64, // N m per axis
    pub payload_mass: f64,
    pub payload_g_tolerance: f64,
    pub crew_g_tolerances: Vec<f64>,
    /// Payload position along the axis from the capture point, m.
    pub payload_offset: f64,
    pub max_power: f64,
    /// `None` leaves the structure without a channel end.
    pub barrel_length: Option<f64>,
    pub stored_energy: f64,
    pub energy_factor: f64,
    /// Prograde Δv of the payload's node; `None` for no node.
    pub node_delta_v: Option<f64>,
    /// Seconds from the start to the node.
    pub node_lead: f64,
    /// Initial pitch error of the host, deg.
    pub misalignment: f64,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario {
            dt: 0.02,
            altitude: 400e3,
            inclination: 51.6_f64.to_radians(),
            host_mass: 50_000.0,
            host_inertia: Vector3::new(2.0e6, 2.0e5, 2.0e6),
            wheel_torque: 5.0e4,
            payload_mass: 5_000.0,
            payload_g_tolerance: 6.0,
            crew_g_tolerances: Vec::new(),
            payload_offset: 0.0,
            max_power: 20.0,
            barrel_length: Some(150.0),
            stored_energy: 1_000.0,
            energy_factor: 0.001,
            node_delta_v: Some(50.0),
            node_lead: 600.0,
            misalignment: 0.0,
        }
    }
}

impl Scenario {
    pub fn build(self) -> SimWorld {
        let host_state =
            KeplerianElements::circular(self.altitude, self.inclination).state_at_epoch(0.0);
        let node_ut = host_state.time + self.node_lead;
        let at_node = propagate_kepler(&host_state, node_ut);
        let node_dv = Vector3::new(0.0, 0.0, self.node_delta_v.unwrap_or(0.0));
        let burn = NodeFrame::at(&at_node).map_or(at_node.vel, |frame| frame.to_orbital(&node_dv));
        let direction = if burn.norm() > 0.0 { burn } else { at_node.vel };
        let aligned = UnitQuaternion::rotation_between(&Vector3::y(), &direction)
            .unwrap_or_else(UnitQuaternion::identity);
        let tilt_angle = self.misalignment.to_radians();
        let tilt = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), tilt_angle);
        let rotation = aligned * tilt;
        let axis = rotation * Vector3::y();

        let host_id = BodyId(1);
        let payload_id = BodyId(2);
        let host_body = SimBody {
            id: host_id,
            name: "accelerator".into(),
            mass: self.host_mass,
            state: host_state.clone(),
            angular_velocity: Vector3::zeros(),
            half_length: 10.0,
            g_tolerance: 20.0,
            crew_g_tolerances: Vec::new(),
            planned: None,
            flight_plan: Vec::new(),
        };
        let payload_body = SimBody {
            id: payload_id,
            name: "payload".into(),
            mass: self.payload_mass,
            state: OrbitalState {
                time: host_state.time,
                pos: host_state.pos + axis * self.payload_offset,
                vel: host_state.vel,
            },
            angular_velocity: Vector3::zeros(),
            half_length: 2.0,
            g_tolerance: self.payload_g_tolerance,
            crew_g_tolerances: self.crew_g_tolerances,
            planned: None,
            flight_plan: self
                .node_delta_v
                .map(|_| vec![ManeuverNode::new(node_ut, node_dv)])
                .unwrap_or_default(),
        };

        let mut inventory = Inventory::default();
        inventory.push(Box::new(ReactionWheel::new("wheels", Vector3::repeat(self.wheel_torque))));

        let mut world = SimWorld {
            clock: WorldClock { now: host_state.time, dt: self.dt, warp_target: None },
            host: SimHost {
                id: host_id,
                rotation,
                omega: Vector3::zeros(),
                inertia: self.host_inertia,
                shielded: true,
                pilot: PilotInput::default(),
                command: Vector3::zeros(),
                energy: self.stored_energy,
                com: host_state.pos,
            },
            orbits: BodyRegistry { bodies: vec![host_body, payload_body], axis },
            loading: ZoneActuator::new(ZoneShape::Capture, self.max_power, None, 0.0),
            launching: ZoneActuator::new(
                ZoneShape::Acceleration,
                self.max_power,
                self.barrel_length,
                self.energy_factor,
            ),
            inventory,
            status: StatusBoard::new(),
            payload: Some(payload_id),
            next_id: 3,
        };
        world.refresh();
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_starts_in_both_zones() {
        let world = Scenario::default().build();
        let payload = world.payload_id().unwrap();
        assert_eq!(world.loading.inside, vec![payload]);
        assert_eq!(world.launching.inside, vec![payload]);
    }

    #[test]
    fn host_starts_aligned_with_burn() {
        let world = Scenario::default().build();
        let payload = world.payload_id().unwrap();
        let node = world.nodes(payload)[0].clone();
        let at_node = world.orbits.state_at(payload, node.ut).unwrap();
        let burn = node.resolved(&at_node).burn_vector(&at_node).unwrap();
        assert!(world.axis().angle(&burn).to_degrees() < 1e-6);
        assert!((burn.norm() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn push_conserves_momentum() {
        let mut world = Scenario::default().build();
        let payload = world.payload_id().unwrap();
        let host = world.host_id();
        let momentum = |w: &SimWorld| {
            w.body(host).unwrap().state.vel * w.body(host).unwrap().mass
                + w.body(payload).unwrap().state.vel * w.body(payload).unwrap().mass
        };
        let before = momentum(&world);
        world.launching.enable(true);
        world.launching.set_inverted(true);
        world.launching.set_power(10.0);
        world.apply_zone_forces(0.02);
        let after = momentum(&world);
        assert!((after - before).norm() < 1e-6);
        let rel = world.relative_velocity(payload).unwrap().dot(&world.axis());
        assert!((rel - 0.2 * 1.1).abs() < 1e-9);
        assert!(world.host_energy() < 1_000.0);
    }

    #[test]
    fn commanded_wheels_spin_the_host() {
        let mut world = Scenario::default().build();
        world.host.set_attitude_command(Vector3::new(1.0, 0.0, 0.0));
        world.physics_step();
        // 5e4 N m / 2e6 kg m^2 for one step
        assert!((world.host_angular_velocity().x - 0.025 * 0.02).abs() < 1e-12);
        assert_eq!(world.host.command, Vector3::zeros());
    }

    #[test]
    fn warp_lands_on_target_time() {
        let mut world = Scenario::default().build();
        let start = world.now();
        world.clock.warp_to(start + 300.0);
        world.physics_step();
        assert_eq!(world.now(), start + 300.0);
        let payload = world.payload_id().unwrap();
        assert_eq!(world.loading.inside, vec![payload]);
    }

    #[test]
    fn nodes_follow_the_planner_when_present() {
        let mut world = Scenario::default().build();
        let host = world.host_id();
        world.orbits.add_node(host, ManeuverNode::new(5.0, Vector3::x()));
        assert_eq!(world.nodes(host).len(), 1);
        world.set_planned_nodes(host, Some(Vec::new()));
        world.orbits.add_node(host, ManeuverNode::new(6.0, Vector3::x()));
        assert_eq!(world.nodes(host)[0].ut, 6.0);
        assert_eq!(world.orbits.flight_plan_nodes(host).len(), 1);
    }
}
