/// First-order low-pass filter, `y += alpha * (x - y)` with `alpha = dt / (tau + dt)`.
#[derive(Debug, Clone, Default)]
pub struct LowPassFilter {
    tau: f64,
    value: f64,
}

impl LowPassFilter {
    pub fn new(tau: f64) -> Self {
        Self { tau, value: 0.0 }
    }

    pub fn set_tau(&mut self, tau: f64) {
        self.tau = tau.max(0.0);
    }

    pub fn update(&mut self, input: f64, dt: f64) -> f64 {
        let denom = self.tau + dt;
        let alpha = if denom > 0.0 { dt / denom } else { 1.0 };
        self.value += alpha * (input - self.value);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tau_passes_through() {
        let mut f = LowPassFilter::new(0.0);
        assert_eq!(f.update(2.5, 0.02), 2.5);
    }

    #[test]
    fn step_response_converges() {
        let mut f = LowPassFilter::new(0.02);
        assert!((f.update(1.0, 0.02) - 0.5).abs() < 1e-12);
        for _ in 0..60 {
            f.update(1.0, 0.02);
        }
        assert!((f.value() - 1.0).abs() < 1e-9);
    }
}
