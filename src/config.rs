//! Tunable parameters for the attitude controllers and the launch sequence.
//!
//! Everything is loaded from TOML; every field has a default so a partial
//! file only overrides what it names.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Controller sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Integrator clamp (absolute).
    pub integral_limit: f64,
    /// Derivative low-pass time constant as a multiple of the step.
    pub derivative_smoothing: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self { kp: 1.0, ki: 0.0, kd: 0.0, integral_limit: 1.0, derivative_smoothing: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OscillationConfig {
    /// Number of samples kept for detection.
    pub window: usize,
    /// Sign changes below this count are not considered oscillation.
    pub min_crossings: usize,
    /// Samples smaller than this (absolute) do not count as crossings.
    pub amplitude: f64,
    /// Per-sample decay of the detected level, in (0, 1).
    pub decay: f64,
    /// Fraction of the output removed at full severity.
    pub damping: f64,
}

impl Default for OscillationConfig {
    fn default() -> Self {
        Self { window: 40, min_crossings: 6, amplitude: 0.01, decay: 0.98, damping: 0.5 }
    }
}

/// Position + rate controller used on the pitch and yaw axes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PositionRateConfig {
    pub angle_tolerance: f64,          // deg
    pub max_angular_velocity: f64,     // deg/s
    pub max_angular_acceleration: f64, // deg/s^2
    /// Low-pass time constant as a multiple of the step.
    pub smoothing: f64,
    pub position_gain: f64,
    pub rate_gain: f64,
    /// Gain of the accelerate-toward-target action, 1/deg.
    pub approach_gain: f64,
    /// Brake when required deceleration exceeds this fraction of the cap
    /// and the previous output was near zero.
    pub brake_threshold: f64,
    /// Keep braking while above this fraction once braking started.
    pub brake_hold_threshold: f64,
    /// Accelerate toward the target below this fraction of the cap.
    pub coast_threshold: f64,
    /// Outputs smaller than this count as "near zero".
    pub near_zero: f64,
    pub rate_pid: PidConfig,
    pub oscillation: OscillationConfig,
}

impl Default for PositionRateConfig {
    fn default() -> Self {
        Self {
            angle_tolerance: 0.001,
            max_angular_velocity: 1.0,
            max_angular_acceleration: 0.5,
            smoothing: 1.0,
            position_gain: 1.0,
            rate_gain: 2.0,
            approach_gain: 1.0,
            brake_threshold: 0.8,
            brake_hold_threshold: 0.5,
            coast_threshold: 0.3,
            near_zero: 1e-3,
            rate_pid: PidConfig { kp: 2.0, ki: 0.0, kd: 0.1, ..PidConfig::default() },
            oscillation: OscillationConfig::default(),
        }
    }
}

/// Rate-only damping controller used on the free (roll) axis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateDampingConfig {
    pub pid: PidConfig,
}

impl Default for RateDampingConfig {
    fn default() -> Self {
        Self { pid: PidConfig { kp: 1.0, ki: 0.0, kd: 0.0, ..PidConfig::default() } }
    }
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub pitch_yaw: PositionRateConfig,
    pub roll: RateDampingConfig,

    /// Pilot input further than this from trim suspends auto-alignment.
    pub user_input_tolerance: f64,
    pub max_attitude_error: f64,    // deg
    pub max_angular_velocity: f64,  // deg/s, craft and target
    pub max_relative_velocity: f64, // m/s
    pub max_displacement: f64,      // m, lateral, from the channel axis
    pub maneuver_delta_v_tolerance: f64,
    pub fine_tune_frames: u32,
    /// Fraction of the middle duration the launch may still start late.
    pub launch_window: f64,
    /// Seconds before ignition at which the readiness checks are repeated.
    pub control_points: Vec<f64>,
    /// Extra seconds required before warping to the next control point.
    pub warp_margin: f64,
    pub partial_launch: bool,
    pub crew_g_limits: bool,
    /// Safety factor applied to the weakest g-tolerance.
    pub g_tolerance_margin: f64,
    /// Relative speed along the axis under which an abort has settled.
    pub abort_settle_speed: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            pitch_yaw: PositionRateConfig::default(),
            roll: RateDampingConfig::default(),
            user_input_tolerance: 0.01,
            max_attitude_error: 0.05,
            max_angular_velocity: 0.18,
            max_relative_velocity: 0.05,
            max_displacement: 0.1,
            maneuver_delta_v_tolerance: 0.01,
            fine_tune_frames: 3,
            launch_window: 0.2,
            control_points: vec![180.0, 30.0, 10.0],
            warp_margin: 10.0,
            partial_launch: false,
            crew_g_limits: true,
            g_tolerance_margin: 0.98,
            abort_settle_speed: 0.1,
        }
    }
}

impl ControlConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ControlConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_attitude_error", self.max_attitude_error),
            ("max_angular_velocity", self.max_angular_velocity),
            ("max_relative_velocity", self.max_relative_velocity),
            ("max_displacement", self.max_displacement),
            ("maneuver_delta_v_tolerance", self.maneuver_delta_v_tolerance),
            ("g_tolerance_margin", self.g_tolerance_margin),
            ("pitch_yaw.max_angular_velocity", self.pitch_yaw.max_angular_velocity),
            ("pitch_yaw.max_angular_acceleration", self.pitch_yaw.max_angular_acceleration),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::invalid(name, format!("must be positive, got {value}")));
            }
        }
        if !(0.0..=1.0).contains(&self.launch_window) {
            return Err(ConfigError::invalid("launch_window", "must be within [0, 1]"));
        }
        if self.control_points.windows(2).any(|w| w[0] <= w[1]) {
            return Err(ConfigError::invalid("control_points", "must be strictly descending"));
        }
        if self.control_points.iter().any(|&t| t < 0.0) {
            return Err(ConfigError::invalid("control_points", "must not be negative"));
        }
        let osc = &self.pitch_yaw.oscillation;
        if osc.window < 2 || osc.min_crossings * 2 >= osc.window {
            return Err(ConfigError::invalid(
                "pitch_yaw.oscillation",
                "window must exceed twice the minimum crossing count",
            ));
        }
        if !(0.0..1.0).contains(&osc.decay) {
            return Err(ConfigError::invalid(
                "pitch_yaw.oscillation.decay",
                "must be within [0, 1)",
            ));
        }
        let py = &self.pitch_yaw;
        if py.brake_hold_threshold > py.brake_threshold
            || py.coast_threshold > py.brake_hold_threshold
        {
            return Err(ConfigError::invalid(
                "pitch_yaw",
                "thresholds must satisfy coast <= brake_hold <= brake",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        ControlConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = ControlConfig::from_toml_str(
            r#"
            fine_tune_frames = 5
            partial_launch = true

            [pitch_yaw]
            max_angular_acceleration = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fine_tune_frames, 5);
        assert!(cfg.partial_launch);
        assert!((cfg.pitch_yaw.max_angular_acceleration - 0.25).abs() < 1e-12);
        assert_eq!(cfg.control_points, vec![180.0, 30.0, 10.0]);
    }

    #[test]
    fn rejects_ascending_control_points() {
        let err = ControlConfig::from_toml_str("control_points = [10.0, 30.0]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { name: "control_points", .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "launch_window = 0.5").unwrap();
        let cfg = ControlConfig::load(file.path()).unwrap();
        assert!((cfg.launch_window - 0.5).abs() < 1e-12);
    }
}
