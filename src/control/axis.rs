use crate::config::{PositionRateConfig, RateDampingConfig};
use crate::control::filter::LowPassFilter;
use crate::control::oscillation::OscillationGuard;
use crate::control::pid::Pid;

/// One controller update, kept for tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisSample {
    pub error: f64,
    pub rate: f64,
    pub action: f64,
    pub output: f64,
}

/// Single-axis attitude controller.
///
/// `error` is the angle still to go (deg), `rate` its rate of change (deg/s,
/// the negated angular velocity about the axis) and `max_accel` the angular
/// acceleration (deg/s^2) a full command would produce. A positive command
/// produces a positive angular acceleration.
pub trait AxisControl {
    fn update(&mut self, error: f64, rate: f64, max_accel: f64, dt: f64) -> f64;

    fn reset(&mut self);

    fn last_sample(&self) -> AxisSample;

    fn name(&self) -> &str {
        "unnamed"
    }
}

// ---------------------------------------------------------------------------
// Position + rate (constrained axes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PositionRateController {
    name: String,
    cfg: PositionRateConfig,
    rate_pid: Pid,
    filter: LowPassFilter,
    guard: OscillationGuard,
    prev_action: f64,
    last: AxisSample,
}

impl PositionRateController {
    pub fn new(name: impl Into<String>, cfg: &PositionRateConfig) -> Self {
        Self {
            name: name.into(),
            cfg: cfg.clone(),
            rate_pid: Pid::from_config(&cfg.rate_pid),
            filter: LowPassFilter::default(),
            guard: OscillationGuard::new(&cfg.oscillation),
            prev_action: 0.0,
            last: AxisSample::default(),
        }
    }

    /// Desired rate-of-change of `rate` (deg/s^2) away from the tolerance band.
    fn position_action(&self, error: f64, rate: f64, cap: f64) -> f64 {
        let cfg = &self.cfg;
        // rate and error of opposite signs: the error is already shrinking
        if error != 0.0 && rate * error < 0.0 {
            let required = rate * rate / (2.0 * error.abs());
            let threshold = if self.prev_action.abs() < cfg.near_zero {
                cfg.brake_threshold
            } else {
                cfg.brake_hold_threshold
            } * cap;
            if required > threshold {
                -rate.signum() * required.min(cap)
            } else if required < cfg.coast_threshold * cap
                && rate.abs() < cfg.max_angular_velocity
            {
                -error.signum() * (cfg.approach_gain * error.abs()).min(1.0) * cap
            } else {
                0.0
            }
        } else {
            let blended = -(cfg.position_gain * error + cfg.rate_gain * rate) / cap;
            blended.clamp(-1.0, 1.0) * cap
        }
    }
}

impl AxisControl for PositionRateController {
    fn update(&mut self, error: f64, rate: f64, max_accel: f64, dt: f64) -> f64 {
        if !(max_accel > 0.0 && max_accel.is_finite()) {
            self.last = AxisSample { error, rate, action: 0.0, output: 0.0 };
            return 0.0;
        }
        let cap = self.cfg.max_angular_acceleration.min(max_accel);
        let cap_norm = (cap / max_accel).min(1.0);

        let raw = if error.abs() < self.cfg.angle_tolerance {
            self.rate_pid.set_limits(-cap, cap);
            self.rate_pid.update(-rate, dt)
        } else {
            self.position_action(error, rate, cap)
        };

        self.filter.set_tau(self.cfg.smoothing * dt);
        let filtered = self.filter.update(raw, dt);
        let severity = self.guard.update(filtered);
        let action = filtered * (1.0 - self.cfg.oscillation.damping * severity);
        self.prev_action = action;

        let mut output = -(action / max_accel).clamp(-cap_norm, cap_norm);
        if !output.is_finite() {
            output = 0.0;
        }
        self.last = AxisSample { error, rate, action, output };
        output
    }

    fn reset(&mut self) {
        self.rate_pid.reset();
        self.filter.reset();
        self.guard.reset();
        self.prev_action = 0.0;
        self.last = AxisSample::default();
    }

    fn last_sample(&self) -> AxisSample {
        self.last
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Rate damping (free axis)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RateDampingController {
    name: String,
    pid: Pid,
    last: AxisSample,
}

impl RateDampingController {
    pub fn new(name: impl Into<String>, cfg: &RateDampingConfig) -> Self {
        Self { name: name.into(), pid: Pid::from_config(&cfg.pid), last: AxisSample::default() }
    }
}

impl AxisControl for RateDampingController {
    /// Ignores `error`; only the rate is driven to zero.
    fn update(&mut self, error: f64, rate: f64, max_accel: f64, dt: f64) -> f64 {
        if !(max_accel > 0.0 && max_accel.is_finite()) {
            self.last = AxisSample { error, rate, action: 0.0, output: 0.0 };
            return 0.0;
        }
        let action = self.pid.update(-rate, dt);
        let mut output = -(action / max_accel).clamp(-1.0, 1.0);
        if !output.is_finite() {
            output = 0.0;
        }
        self.last = AxisSample { error, rate, action, output };
        output
    }

    fn reset(&mut self) {
        self.pid.reset();
        self.last = AxisSample::default();
    }

    fn last_sample(&self) -> AxisSample {
        self.last
    }

    fn name(&self) -> &str {
        &self.name
    }
}
