use crate::config::PidConfig;
use crate::control::filter::LowPassFilter;

// ---------------------------------------------------------------------------
// PID controller (single axis)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Pid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    integral_limit: f64,
    derivative_smoothing: f64,
    min: f64,
    max: f64,
    integral: f64,
    prev_error: Option<f64>,
    derivative: LowPassFilter,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limit: 1.0,
            derivative_smoothing: 0.0,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            integral: 0.0,
            prev_error: None,
            derivative: LowPassFilter::default(),
        }
    }

    pub fn from_config(cfg: &PidConfig) -> Self {
        Self {
            integral_limit: cfg.integral_limit,
            derivative_smoothing: cfg.derivative_smoothing,
            ..Self::new(cfg.kp, cfg.ki, cfg.kd)
        }
    }

    /// Clamp the output to `[min, max]`.
    pub fn set_limits(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        let limit = self.integral_limit;
        self.integral = (self.integral + error * dt).clamp(-limit, limit);
        let raw_derivative = match self.prev_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => 0.0,
        };
        self.prev_error = Some(error);
        let derivative = if self.derivative_smoothing > 0.0 {
            self.derivative.set_tau(self.derivative_smoothing * dt);
            self.derivative.update(raw_derivative, dt)
        } else {
            raw_derivative
        };
        let out = self.kp * error + self.ki * self.integral + self.kd * derivative;
        out.clamp(self.min, self.max)
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.derivative.reset();
    }
}
