use nalgebra::Vector3;

use crate::orbital::propagator::OrbitalState;
use crate::physics::gravity::MU_EARTH;

// ---------------------------------------------------------------------------
// Node frame
// ---------------------------------------------------------------------------

/// Orbit-relative basis at a state.
///
/// Node Δv components are stored as `(radial, normal, prograde)`.
#[derive(Debug, Clone, Copy)]
pub struct NodeFrame {
    pub radial: Vector3<f64>,
    pub normal: Vector3<f64>,
    pub prograde: Vector3<f64>,
}

impl NodeFrame {
    /// `None` for a degenerate (radial or zero-velocity) state.
    pub fn at(state: &OrbitalState) -> Option<Self> {
        let prograde = state.vel.try_normalize(1e-12)?;
        let normal = state.pos.cross(&state.vel).try_normalize(1e-12)?;
        let radial = normal.cross(&prograde);
        Some(NodeFrame { radial, normal, prograde })
    }

    pub fn to_orbital(&self, node_dv: &Vector3<f64>) -> Vector3<f64> {
        self.radial * node_dv.x + self.normal * node_dv.y + self.prograde * node_dv.z
    }

    pub fn to_node(&self, orbital_dv: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            self.radial.dot(orbital_dv),
            self.normal.dot(orbital_dv),
            self.prograde.dot(orbital_dv),
        )
    }
}

/// Node-frame Δv to inertial Δv at `state`; identity for a degenerate state.
pub fn node_to_orbital_delta_v(state: &OrbitalState, node_dv: &Vector3<f64>) -> Vector3<f64> {
    NodeFrame::at(state).map_or(*node_dv, |f| f.to_orbital(node_dv))
}

/// Inertial Δv to node-frame Δv at `state`; identity for a degenerate state.
pub fn orbital_to_node_delta_v(state: &OrbitalState, orbital_dv: &Vector3<f64>) -> Vector3<f64> {
    NodeFrame::at(state).map_or(*orbital_dv, |f| f.to_node(orbital_dv))
}

// ---------------------------------------------------------------------------
// Maneuver node
// ---------------------------------------------------------------------------

/// A planned instantaneous velocity change.
#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverNode {
    pub ut: f64,
    /// Node frame, m/s.
    pub delta_v: Vector3<f64>,
    /// Post-maneuver state at `ut`, when known.
    pub next_patch: Option<OrbitalState>,
}

impl ManeuverNode {
    pub fn new(ut: f64, delta_v: Vector3<f64>) -> Self {
        ManeuverNode { ut, delta_v, next_patch: None }
    }

    /// Node delivering the inertial `orbital_dv` to `pre` (the state at the node time).
    pub fn from_orbital(pre: &OrbitalState, orbital_dv: &Vector3<f64>) -> Self {
        ManeuverNode {
            ut: pre.time,
            delta_v: orbital_to_node_delta_v(pre, orbital_dv),
            next_patch: Some(OrbitalState {
                time: pre.time,
                pos: pre.pos,
                vel: pre.vel + orbital_dv,
            }),
        }
    }

    /// Resolve the post-maneuver trajectory from the pre-maneuver state at `ut`.
    pub fn resolved(mut self, pre: &OrbitalState) -> Self {
        let dv = node_to_orbital_delta_v(pre, &self.delta_v);
        self.next_patch = Some(OrbitalState { time: self.ut, pos: pre.pos, vel: pre.vel + dv });
        self
    }

    pub fn delta_v_magnitude(&self) -> f64 {
        self.delta_v.norm()
    }

    /// Inertial Δv still required, given the body's state at `ut`.
    pub fn burn_vector(&self, current_at_ut: &OrbitalState) -> Option<Vector3<f64>> {
        self.next_patch.as_ref().map(|patch| patch.vel - current_at_ut.vel)
    }
}

/// Circular orbit speed at radius `r` (Earth).
pub fn circular_velocity(r: f64) -> f64 {
    circular_velocity_mu(r, MU_EARTH)
}

pub fn circular_velocity_mu(r: f64, mu: f64) -> f64 {
    (mu / r).sqrt()
}
