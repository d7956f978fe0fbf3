use std::collections::VecDeque;

use crate::config::OscillationConfig;

/// Detects sustained oscillation in a control signal.
///
/// Keeps a sliding window of samples and counts sign changes between
/// consecutive samples above the amplitude threshold. The returned severity
/// in [0, 1] decays exponentially once the oscillation stops.
#[derive(Debug, Clone)]
pub struct OscillationGuard {
    window: usize,
    min_crossings: usize,
    amplitude: f64,
    decay: f64,
    samples: VecDeque<f64>,
    level: f64,
}

impl OscillationGuard {
    pub fn new(cfg: &OscillationConfig) -> Self {
        Self {
            window: cfg.window.max(2),
            min_crossings: cfg.min_crossings,
            amplitude: cfg.amplitude,
            decay: cfg.decay,
            samples: VecDeque::with_capacity(cfg.window),
            level: 0.0,
        }
    }

    /// Push a sample and return the current severity.
    pub fn update(&mut self, sample: f64) -> f64 {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);

        let crossings = self.crossings();
        let span = (self.window / 2).saturating_sub(self.min_crossings).max(1) as f64;
        let severity = ((crossings as f64 - self.min_crossings as f64) / span).clamp(0.0, 1.0);
        self.level = severity.max(self.level * self.decay);
        self.level
    }

    fn crossings(&self) -> usize {
        let mut count = 0;
        let mut last_sign = 0.0;
        for &x in &self.samples {
            if x.abs() <= self.amplitude {
                continue;
            }
            let sign = x.signum();
            if last_sign != 0.0 && sign != last_sign {
                count += 1;
            }
            last_sign = sign;
        }
        count
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.level = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> OscillationGuard {
        OscillationGuard::new(&OscillationConfig::default())
    }

    #[test]
    fn monotone_signal_is_not_oscillation() {
        let mut g = guard();
        for i in 0..200 {
            assert_eq!(g.update(0.1 + i as f64 * 1e-3), 0.0);
        }
    }

    #[test]
    fn alternating_signal_saturates() {
        let mut g = guard();
        let mut severity = 0.0;
        for i in 0..40 {
            severity = g.update(if i % 2 == 0 { 0.3 } else { -0.3 });
        }
        assert!((severity - 1.0).abs() < 1e-12, "got {severity}");
    }

    #[test]
    fn small_chatter_below_amplitude_is_ignored() {
        let mut g = guard();
        for i in 0..100 {
            g.update(if i % 2 == 0 { 0.005 } else { -0.005 });
        }
        assert_eq!(g.level(), 0.0);
    }

    #[test]
    fn severity_decays_after_oscillation_stops() {
        let mut g = guard();
        for i in 0..40 {
            g.update(if i % 2 == 0 { 0.3 } else { -0.3 });
        }
        let mut last = g.level();
        for _ in 0..200 {
            let now = g.update(0.2);
            assert!(now <= last);
            last = now;
        }
        assert!(last < 0.1, "got {last}");
        g.reset();
        assert_eq!(g.level(), 0.0);
    }
}
