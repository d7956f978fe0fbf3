use std::f64::consts::PI;

use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::Serialize;
use tracing::debug;

use crate::config::ControlConfig;
use crate::control::axis::{AxisControl, AxisSample, PositionRateController, RateDampingController};
use crate::control::torque::{angular_acceleration_deg, TorqueEnvelope, TorqueFrame};
use crate::interfaces::{ActuatorInventory, HostCraft};

/// Orientation error between the channel axis and the burn vector, degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttitudeError {
    /// Angle between the axis and the burn vector.
    pub direct: f64,
    /// Rotation still required about local x.
    pub pitch: f64,
    /// Rotation still required about local z.
    pub yaw: f64,
}

/// Decompose the rotation taking `axis` onto `burn` in the craft frame.
///
/// `rotation` is the craft's local-to-world rotation. Pitch and yaw are in
/// (-180, 180]. A zero burn vector gives a zero error.
pub fn compute_attitude_error(
    axis: &Vector3<f64>,
    burn: &Vector3<f64>,
    rotation: &UnitQuaternion<f64>,
) -> AttitudeError {
    if burn.norm_squared() == 0.0 || axis.norm_squared() == 0.0 {
        return AttitudeError::default();
    }
    let direct = axis.angle(burn).to_degrees();
    let to_local = rotation.inverse();
    let from = to_local * axis;
    let to = to_local * burn;
    let rot = UnitQuaternion::rotation_between(&from, &to).unwrap_or_else(|| half_turn(&from));
    let (w, x, y, z) = (rot.w, rot.i, rot.j, rot.k);
    let pitch = (2.0 * (w * x + z * y)).atan2(2.0 * (w * w + z * z) - 1.0);
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
    AttitudeError { direct, pitch: pitch.to_degrees(), yaw: yaw.to_degrees() }
}

/// Rotation by pi about some axis perpendicular to `v`.
fn half_turn(v: &Vector3<f64>) -> UnitQuaternion<f64> {
    let helper = if v.x.abs() < v.y.abs() { Vector3::x() } else { Vector3::y() };
    let perpendicular = Unit::new_normalize(v.cross(&helper));
    UnitQuaternion::from_axis_angle(&perpendicular, PI)
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Three-axis controller pointing the channel axis along the burn vector.
///
/// `compute` runs on the frame callback and `apply` on the post-frame
/// callback; the command computed in between is held here.
#[derive(Debug, Clone)]
pub struct AttitudeController {
    pitch: PositionRateController,
    roll: RateDampingController,
    yaw: PositionRateController,
    max_attitude_error: f64,
    user_input_tolerance: f64,
    error: AttitudeError,
    aligned: bool,
    has_user_input: bool,
    steering: Option<Vector3<f64>>,
}

impl AttitudeController {
    pub fn new(cfg: &ControlConfig) -> Self {
        Self {
            pitch: PositionRateController::new("pitch", &cfg.pitch_yaw),
            roll: RateDampingController::new("roll", &cfg.roll),
            yaw: PositionRateController::new("yaw", &cfg.pitch_yaw),
            max_attitude_error: cfg.max_attitude_error,
            user_input_tolerance: cfg.user_input_tolerance,
            error: AttitudeError::default(),
            aligned: false,
            has_user_input: false,
            steering: None,
        }
    }

    /// Rebuild the axis controllers from new parameters.
    pub fn reload(&mut self, cfg: &ControlConfig) {
        let (error, aligned) = (self.error, self.aligned);
        *self = Self::new(cfg);
        self.error = error;
        self.aligned = aligned;
        debug!("attitude controller reloaded");
    }

    pub fn reset(&mut self) {
        self.pitch.reset();
        self.roll.reset();
        self.yaw.reset();
        self.steering = None;
        self.has_user_input = false;
    }

    pub fn error(&self) -> AttitudeError {
        self.error
    }

    pub fn aligned(&self) -> bool {
        self.aligned
    }

    pub fn has_user_input(&self) -> bool {
        self.has_user_input
    }

    /// Command waiting for the next actuation pass.
    pub fn steering(&self) -> Option<Vector3<f64>> {
        self.steering
    }

    /// Latest pitch, roll and yaw controller samples.
    pub fn samples(&self) -> [(&str, AxisSample); 3] {
        [
            (self.pitch.name(), self.pitch.last_sample()),
            (self.roll.name(), self.roll.last_sample()),
            (self.yaw.name(), self.yaw.last_sample()),
        ]
    }

    pub fn update_error(
        &mut self,
        axis: &Vector3<f64>,
        burn: &Vector3<f64>,
        rotation: &UnitQuaternion<f64>,
    ) -> AttitudeError {
        self.error = compute_attitude_error(axis, burn, rotation);
        self.aligned = self.error.direct < self.max_attitude_error;
        self.error
    }

    /// Compute the steering command for this frame.
    ///
    /// Returns `None`, and publishes nothing, while the pilot is flying.
    pub fn compute(
        &mut self,
        axis: &Vector3<f64>,
        burn: &Vector3<f64>,
        host: &dyn HostCraft,
        inventory: &dyn ActuatorInventory,
        dt: f64,
    ) -> Option<Vector3<f64>> {
        self.steering = None;
        self.has_user_input = host.pilot_input().deviates(self.user_input_tolerance);
        if self.has_user_input {
            return None;
        }
        let rotation = host.rotation();
        self.update_error(axis, burn, &rotation);

        let frame = TorqueFrame {
            to_local: rotation.inverse(),
            com: host.center_of_mass(),
            shielded: host.shielded(),
        };
        let mut envelope = TorqueEnvelope::default();
        for source in inventory.torque_sources() {
            envelope.add_source(source, &frame);
        }
        let max_aa = angular_acceleration_deg(&envelope.max(), &host.inertia());
        let av = host.angular_velocity().map(f64::to_degrees);

        let command = Vector3::new(
            self.pitch.update(self.error.pitch, -av.x, max_aa.x, dt),
            self.roll.update(0.0, -av.y, max_aa.y, dt),
            self.yaw.update(self.error.yaw, -av.z, max_aa.z, dt),
        )
        .map(|c| c.clamp(-1.0, 1.0));
        self.steering = Some(command);
        self.steering
    }

    /// Hand the pending command to the craft. Returns whether one was applied.
    pub fn apply(&mut self, host: &mut dyn HostCraft) -> bool {
        if self.has_user_input {
            return false;
        }
        match self.steering.take() {
            Some(command) => {
                host.set_attitude_command(command);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::torque::{ReactionWheel, TorqueSource};
    use crate::interfaces::{BodyId, PilotInput};

    struct TestHost {
        rotation: UnitQuaternion<f64>,
        omega: Vector3<f64>,
        pilot: PilotInput,
        command: Option<Vector3<f64>>,
    }

    impl TestHost {
        fn new(rotation: UnitQuaternion<f64>) -> Self {
            Self { rotation, omega: Vector3::zeros(), pilot: PilotInput::default(), command: None }
        }
    }

    impl HostCraft for TestHost {
        fn id(&self) -> BodyId {
            BodyId(1)
        }
        fn rotation(&self) -> UnitQuaternion<f64> {
            self.rotation
        }
        fn angular_velocity(&self) -> Vector3<f64> {
            self.omega
        }
        fn inertia(&self) -> Vector3<f64> {
            Vector3::new(200.0, 100.0, 200.0)
        }
        fn center_of_mass(&self) -> Vector3<f64> {
            Vector3::zeros()
        }
        fn shielded(&self) -> bool {
            false
        }
        fn pilot_input(&self) -> PilotInput {
            self.pilot
        }
        fn set_attitude_command(&mut self, command: Vector3<f64>) {
            self.command = Some(command);
        }
        fn stored_energy(&self) -> f64 {
            0.0
        }
    }

    struct Wheels(Vec<ReactionWheel>);

    impl ActuatorInventory for Wheels {
        fn torque_sources(&self) -> Vec<&dyn TorqueSource> {
            self.0.iter().map(|w| w as &dyn TorqueSource).collect()
        }
    }

    fn wheels() -> Wheels {
        Wheels(vec![ReactionWheel::new("rw", Vector3::new(10.0, 10.0, 10.0))])
    }

    fn tilted(pitch_deg: f64, yaw_deg: f64) -> Vector3<f64> {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch_deg.to_radians())
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw_deg.to_radians());
        q * Vector3::y()
    }

    #[test]
    fn pure_pitch_and_yaw_errors() {
        let id = UnitQuaternion::identity();
        let e = compute_attitude_error(&Vector3::y(), &tilted(10.0, 0.0), &id);
        assert!((e.pitch - 10.0).abs() < 1e-9 && e.yaw.abs() < 1e-9, "{e:?}");
        assert!((e.direct - 10.0).abs() < 1e-9);

        let e = compute_attitude_error(&Vector3::y(), &tilted(0.0, -7.0), &id);
        assert!((e.yaw + 7.0).abs() < 1e-9 && e.pitch.abs() < 1e-9, "{e:?}");
    }

    #[test]
    fn error_is_expressed_in_craft_frame() {
        // craft rolled 90 deg about its axis: a world pitch error becomes yaw
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI / 2.0);
        let axis = rotation * Vector3::y();
        let e = compute_attitude_error(&axis, &tilted(5.0, 0.0), &rotation);
        assert!(e.pitch.abs() < 1e-9, "{e:?}");
        assert!((e.yaw.abs() - 5.0).abs() < 1e-9, "{e:?}");
    }

    #[test]
    fn identical_geometry_is_bit_identical() {
        let rotation = UnitQuaternion::from_euler_angles(0.1, -0.4, 0.7);
        let axis = rotation * Vector3::y();
        let burn = Vector3::new(-3.0, 120.0, 45.5);
        let a = compute_attitude_error(&axis, &burn, &rotation);
        let b = compute_attitude_error(&axis, &burn, &rotation);
        assert_eq!(a.direct.to_bits(), b.direct.to_bits());
        assert_eq!(a.pitch.to_bits(), b.pitch.to_bits());
        assert_eq!(a.yaw.to_bits(), b.yaw.to_bits());
    }

    #[test]
    fn opposite_burn_is_finite() {
        let e = compute_attitude_error(&Vector3::y(), &-Vector3::y(), &UnitQuaternion::identity());
        assert!((e.direct - 180.0).abs() < 1e-9);
        assert!(e.pitch.is_finite() && e.yaw.is_finite());
        assert!(e.pitch.abs() > 90.0 || e.yaw.abs() > 90.0);
    }

    #[test]
    fn pilot_input_suspends_control() {
        let mut ctrl = AttitudeController::new(&ControlConfig::default());
        let mut host = TestHost::new(UnitQuaternion::identity());
        host.pilot.pitch = 0.5;
        assert!(ctrl.compute(&Vector3::y(), &tilted(3.0, 0.0), &host, &wheels(), 0.02).is_none());
        assert!(ctrl.has_user_input());
        assert!(!ctrl.apply(&mut host));
        assert!(host.command.is_none());
    }

    #[test]
    fn zero_torque_gives_zero_command() {
        let mut ctrl = AttitudeController::new(&ControlConfig::default());
        let host = TestHost::new(UnitQuaternion::identity());
        let cmd = ctrl.compute(&Vector3::y(), &tilted(3.0, 2.0), &host, &Wheels(vec![]), 0.02);
        assert_eq!(cmd, Some(Vector3::zeros()));
    }

    #[test]
    fn aligns_rigid_body() {
        let dt = 0.02;
        let cfg = ControlConfig::default();
        let mut ctrl = AttitudeController::new(&cfg);
        let mut host = TestHost::new(UnitQuaternion::identity());
        host.omega = Vector3::new(0.0, 0.01, 0.0);
        let burn = tilted(5.0, -3.0) * 50.0;
        let inventory = wheels();
        let inertia = host.inertia();
        for _ in 0..3000 {
            let axis = host.rotation * Vector3::y();
            ctrl.compute(&axis, &burn, &host, &inventory, dt);
            assert!(ctrl.apply(&mut host));
            let cmd = host.command.unwrap_or_default();
            let max_aa = Vector3::new(10.0, 10.0, 10.0).component_div(&inertia);
            host.omega += cmd.component_mul(&max_aa) * dt;
            host.rotation *= UnitQuaternion::from_scaled_axis(host.omega * dt);
        }
        assert!(ctrl.aligned(), "residual {:?}", ctrl.error());
        assert!(host.omega.norm().to_degrees() < cfg.max_angular_velocity);
    }

    #[test]
    fn reset_drops_pending_command() {
        let mut ctrl = AttitudeController::new(&ControlConfig::default());
        let host = TestHost::new(UnitQuaternion::identity());
        ctrl.compute(&Vector3::y(), &tilted(3.0, 0.0), &host, &wheels(), 0.02);
        assert!(ctrl.steering().is_some());
        ctrl.reset();
        assert!(ctrl.steering().is_none());
    }
}
