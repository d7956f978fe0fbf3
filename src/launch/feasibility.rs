//! Acceleration, travel, time and energy budgets of a launch.

use nalgebra::Vector3;
use tracing::warn;

use crate::config::ControlConfig;
use crate::error::LaunchError;
use crate::interfaces::BodySnapshot;
use crate::launch::plan::{calculate_timing, LaunchPlan, LaunchTiming};
use crate::physics::gravity::g_to_accel;

/// Highest acceleration the payload tolerates, m/s^2.
pub fn tolerated_acceleration(payload: &BodySnapshot, crew_limits: bool, margin: f64) -> f64 {
    let mut g = payload.min_part_g_tolerance;
    if crew_limits {
        g = payload.crew_g_tolerances.iter().copied().fold(g, f64::min);
    }
    g_to_accel(g) * margin
}

/// Distance from the payload's trailing point to the end of the channel.
pub fn launch_distance(
    payload: &BodySnapshot,
    axis: &Vector3<f64>,
    channel_end: Option<Vector3<f64>>,
) -> Result<f64, LaunchError> {
    let end = channel_end.ok_or(LaunchError::LaunchPathUnavailable)?;
    Ok((end - payload.rear_point).dot(axis))
}

/// Inputs of one feasibility assessment.
#[derive(Debug, Clone, Copy)]
pub struct LaunchBudget {
    pub required_delta_v: f64,
    pub payload_mass: f64,
    pub host_mass: f64,
    /// Tolerated acceleration before the actuator limit, m/s^2.
    pub tolerated_acceleration: f64,
    pub max_power: f64,
    pub distance: f64,
    pub stored_energy: f64,
    pub dt: f64,
}

#[derive(Debug, Clone)]
pub struct Assessment {
    pub acceleration: f64,
    pub energy_rate: f64,
    pub max_acceleration_time: f64,
    pub max_delta_v: f64,
    pub planned_delta_v: f64,
    pub timing: LaunchTiming,
    pub energy: f64,
    pub partial: bool,
    /// Shortfalls accepted because partial launches are allowed.
    pub warnings: Vec<LaunchError>,
}

impl Assessment {
    /// Copy the budgets into `plan` and mark it valid.
    pub fn apply(&self, plan: &mut LaunchPlan, node_ut: f64, window_fraction: f64) {
        plan.acceleration = self.acceleration;
        plan.max_acceleration_time = self.max_acceleration_time;
        plan.max_delta_v = self.max_delta_v;
        plan.planned_delta_v = self.planned_delta_v;
        plan.apply_timing(&self.timing, node_ut, window_fraction);
        plan.energy = self.energy;
        plan.partial = self.partial;
        plan.maneuver_valid = true;
    }
}

/// Check that the structure can deliver `budget.required_delta_v`.
///
/// `force_for(mass, accel)` returns the actuator force and its energy rate.
/// With `cfg.partial_launch` shortfalls become warnings and the burn is
/// clipped to what the structure can deliver.
pub fn assess<F>(
    budget: &LaunchBudget,
    force_for: F,
    cfg: &ControlConfig,
) -> Result<Assessment, LaunchError>
where
    F: Fn(f64, f64) -> (f64, f64),
{
    let mut warnings = Vec::new();
    let mut shortfall = |err: LaunchError| -> Result<(), LaunchError> {
        if cfg.partial_launch {
            warn!(reason = %err, "accepting partial launch");
            warnings.push(err);
            Ok(())
        } else {
            Err(err)
        }
    };

    let tolerated = budget.tolerated_acceleration;
    let accel = tolerated.min(budget.max_power);
    if !(accel > 0.0) {
        return Err(LaunchError::InsufficientStrength { tolerance: tolerated });
    }
    if !(budget.distance > 0.0) {
        return Err(LaunchError::InsufficientTravel { distance: budget.distance });
    }
    let (force, energy_rate) = force_for(budget.payload_mass, accel);
    if !(force > 0.0) {
        return Err(LaunchError::InsufficientStrength { tolerance: tolerated });
    }

    // two bodies pushed apart by one force along the channel
    let inv_mass = 1.0 / budget.host_mass + 1.0 / budget.payload_mass;
    let max_acceleration_time = (2.0 * budget.distance / force / inv_mass).sqrt();
    let acceleration = force / budget.payload_mass;
    let max_delta_v = acceleration * max_acceleration_time;

    let mut partial = budget.required_delta_v > max_delta_v;
    let planned_delta_v = if partial {
        shortfall(LaunchError::InsufficientDeltaV {
            max_delta_v,
            shortage: budget.required_delta_v - max_delta_v,
        })?;
        max_delta_v
    } else {
        budget.required_delta_v
    };

    let mut timing = calculate_timing(
        planned_delta_v,
        acceleration,
        budget.dt,
        cfg.fine_tune_frames,
        cfg.maneuver_delta_v_tolerance,
    );
    if timing.duration > max_acceleration_time {
        shortfall(LaunchError::InsufficientTime {
            max_time: max_acceleration_time,
            shortage: timing.duration - max_acceleration_time,
        })?;
        timing.duration = max_acceleration_time;
        timing.raw_duration = timing.raw_duration.min(max_acceleration_time);
        partial = true;
    }

    let energy = timing.raw_duration * energy_rate;
    if budget.stored_energy < energy {
        shortfall(LaunchError::InsufficientEnergy {
            required: energy,
            shortage: energy - budget.stored_energy,
        })?;
        partial = true;
    }

    Ok(Assessment {
        acceleration,
        energy_rate,
        max_acceleration_time,
        max_delta_v,
        planned_delta_v,
        timing,
        energy,
        partial,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::BodyId;
    use crate::physics::G0;

    fn linear_actuator(mass: f64, accel: f64) -> (f64, f64) {
        let force = mass * accel;
        (force, force * 1e-3)
    }

    fn budget(required: f64) -> LaunchBudget {
        LaunchBudget {
            required_delta_v: required,
            payload_mass: 1_000.0,
            host_mass: 1_000.0,
            tolerated_acceleration: 10.0,
            max_power: 20.0,
            distance: 16_000.0,
            stored_energy: 1e6,
            dt: 0.02,
        }
    }

    #[test]
    fn max_delta_v_is_acceleration_times_time() {
        let a = assess(&budget(100.0), linear_actuator, &ControlConfig::default()).unwrap();
        assert!((a.max_acceleration_time - 40.0).abs() < 1e-9);
        assert_eq!(a.max_delta_v, a.acceleration * a.max_acceleration_time);
        assert!((a.max_delta_v - 400.0).abs() < 1e-9);
        assert!(!a.partial && a.warnings.is_empty());
    }

    #[test]
    fn excessive_delta_v_fails_without_partial() {
        let err = assess(&budget(600.0), linear_actuator, &ControlConfig::default()).unwrap_err();
        match err {
            LaunchError::InsufficientDeltaV { max_delta_v, shortage } => {
                assert!((max_delta_v - 400.0).abs() < 1e-9);
                assert!((shortage - 200.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn excessive_delta_v_is_clipped_with_partial() {
        let cfg = ControlConfig { partial_launch: true, ..Default::default() };
        let a = assess(&budget(600.0), linear_actuator, &cfg).unwrap();
        assert!(a.partial);
        assert!((a.planned_delta_v - 400.0).abs() < 1e-9);
        assert!(a.timing.duration <= a.max_acceleration_time);
        assert!(matches!(a.warnings[0], LaunchError::InsufficientDeltaV { .. }));
    }

    #[test]
    fn actuator_caps_acceleration() {
        let b = LaunchBudget { max_power: 4.0, ..budget(10.0) };
        let a = assess(&b, linear_actuator, &ControlConfig::default()).unwrap();
        assert!((a.acceleration - 4.0).abs() < 1e-12);
    }

    #[test]
    fn energy_shortage() {
        let b = LaunchBudget { stored_energy: 1.0, ..budget(100.0) };
        let err = assess(&b, linear_actuator, &ControlConfig::default()).unwrap_err();
        // 10 s at 10 energy units per second
        assert!(matches!(
            err,
            LaunchError::InsufficientEnergy { required, .. } if (required - 100.0).abs() < 1e-9
        ));
    }

    #[test]
    fn structural_and_travel_limits() {
        let b = LaunchBudget { tolerated_acceleration: 0.0, ..budget(10.0) };
        assert!(matches!(
            assess(&b, linear_actuator, &ControlConfig::default()),
            Err(LaunchError::InsufficientStrength { .. })
        ));
        let b = LaunchBudget { distance: -2.0, ..budget(10.0) };
        assert!(matches!(
            assess(&b, linear_actuator, &ControlConfig::default()),
            Err(LaunchError::InsufficientTravel { .. })
        ));
    }

    fn payload() -> BodySnapshot {
        BodySnapshot {
            id: BodyId(2),
            name: "payload".into(),
            mass: 5_000.0,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            rear_point: Vector3::new(0.0, -2.0, 0.0),
            min_part_g_tolerance: 6.0,
            crew_g_tolerances: vec![4.5],
        }
    }

    #[test]
    fn crew_limits_tighten_tolerance() {
        let p = payload();
        assert!((tolerated_acceleration(&p, false, 1.0) - 6.0 * G0).abs() < 1e-9);
        assert!((tolerated_acceleration(&p, true, 0.98) - 4.5 * G0 * 0.98).abs() < 1e-9);
    }

    #[test]
    fn distance_from_trailing_point() {
        let p = payload();
        let d = launch_distance(&p, &Vector3::y(), Some(Vector3::new(0.0, 150.0, 0.0))).unwrap();
        assert!((d - 152.0).abs() < 1e-12);
        let distance = launch_distance(&p, &Vector3::y(), None);
        assert_eq!(distance, Err(LaunchError::LaunchPathUnavailable));
    }
}
