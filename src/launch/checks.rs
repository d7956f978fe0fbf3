//! Gates evaluated before ignition.

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::ControlConfig;
use crate::control::attitude::AttitudeController;
use crate::error::LaunchError;
use crate::interfaces::{BodySnapshot, Env, HostCraft};

/// Host angular speed, deg/s.
pub fn host_angular_speed(host: &dyn HostCraft) -> f64 {
    host.angular_velocity().norm().to_degrees()
}

pub fn check_host_steady(host: &dyn HostCraft, cfg: &ControlConfig) -> Result<(), LaunchError> {
    if host_angular_speed(host) > cfg.max_angular_velocity {
        return Err(LaunchError::CraftRotating);
    }
    Ok(())
}

/// With auto-alignment the controller already refreshed the error this frame.
pub fn check_alignment(
    attitude: &mut AttitudeController,
    auto_align: bool,
    axis: &Vector3<f64>,
    burn: &Vector3<f64>,
    rotation: &UnitQuaternion<f64>,
) -> Result<(), LaunchError> {
    if !auto_align {
        attitude.update_error(axis, burn, rotation);
    }
    if attitude.aligned() {
        Ok(())
    } else {
        Err(LaunchError::Misaligned)
    }
}

/// Distance of `point` from the line through `origin` along unit `axis`.
pub fn lateral_offset(point: &Vector3<f64>, origin: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let d = point - origin;
    (d - axis * d.dot(axis)).norm()
}

/// Payload at rest in the channel relative to the host.
pub fn check_payload_steady(
    payload: &BodySnapshot,
    host_velocity: &Vector3<f64>,
    attractor: &Vector3<f64>,
    axis: &Vector3<f64>,
    cfg: &ControlConfig,
) -> Result<(), LaunchError> {
    if payload.angular_velocity.norm().to_degrees() > cfg.max_angular_velocity {
        return Err(LaunchError::TargetRotating);
    }
    if (payload.velocity - host_velocity).norm() > cfg.max_relative_velocity {
        return Err(LaunchError::TargetMoving);
    }
    if lateral_offset(&payload.position, attractor, axis) > cfg.max_displacement {
        return Err(LaunchError::TargetOffCenter);
    }
    Ok(())
}

/// Every readiness gate, in the order they are reported.
pub fn readiness(
    env: &Env<'_>,
    attitude: &mut AttitudeController,
    auto_align: bool,
    payload: &BodySnapshot,
    burn: &Vector3<f64>,
    cfg: &ControlConfig,
) -> Result<(), LaunchError> {
    check_host_steady(&*env.host, cfg)?;
    let axis = env.launching.axis_direction_world();
    check_alignment(attitude, auto_align, &axis, burn, &env.host.rotation())?;
    let host_velocity = env
        .orbits
        .body(env.host.id())
        .map(|b| b.velocity)
        .unwrap_or(payload.velocity);
    check_payload_steady(payload, &host_velocity, &env.launching.attractor_position(), &axis, cfg)
}
