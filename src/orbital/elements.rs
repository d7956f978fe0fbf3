use std::f64::consts::TAU;

use nalgebra::{UnitQuaternion, Vector3};

use crate::orbital::propagator::OrbitalState;
use crate::physics::gravity::{MU_EARTH, R_EARTH_ECI};

/// Classical Keplerian orbital elements (angles in radians).
#[derive(Debug, Clone, Copy)]
pub struct KeplerianElements {
    pub sma: f64,       // m
    pub ecc: f64,
    pub inc: f64,
    pub raan: f64,
    pub argp: f64,
    pub true_anom: f64,
}

impl KeplerianElements {
    /// Circular Earth orbit at `altitude` (m) and inclination `inc` (rad).
    pub fn circular(altitude: f64, inc: f64) -> Self {
        KeplerianElements {
            sma: R_EARTH_ECI + altitude,
            ecc: 0.0,
            inc,
            raan: 0.0,
            argp: 0.0,
            true_anom: 0.0,
        }
    }

    pub fn with_true_anomaly(mut self, true_anom: f64) -> Self {
        self.true_anom = true_anom;
        self
    }

    /// ECI state at `epoch` (Earth).
    pub fn state_at_epoch(&self, epoch: f64) -> OrbitalState {
        self.state_at_epoch_mu(epoch, MU_EARTH)
    }

    pub fn state_at_epoch_mu(&self, epoch: f64, mu: f64) -> OrbitalState {
        let p = self.sma * (1.0 - self.ecc * self.ecc);
        let (sin_nu, cos_nu) = self.true_anom.sin_cos();
        let r = p / (1.0 + self.ecc * cos_nu);
        let k = (mu / p).sqrt();

        // perifocal -> ECI: Rz(raan) * Rx(inc) * Rz(argp)
        let to_eci = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.raan)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.inc)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.argp);

        OrbitalState {
            time: epoch,
            pos: to_eci * Vector3::new(r * cos_nu, r * sin_nu, 0.0),
            vel: to_eci * Vector3::new(-k * sin_nu, k * (self.ecc + cos_nu), 0.0),
        }
    }

    /// Elements of a bound Earth orbit.
    pub fn from_state(state: &OrbitalState) -> Self {
        Self::from_state_mu(state, MU_EARTH)
    }

    pub fn from_state_mu(state: &OrbitalState, mu: f64) -> Self {
        let (pos, vel) = (state.pos, state.vel);
        let r = pos.norm();
        let h = pos.cross(&vel);
        let node = Vector3::z().cross(&h);
        let e_vec = vel.cross(&h) / mu - pos / r;
        let ecc = e_vec.norm();
        let sma = 1.0 / (2.0 / r - vel.norm_squared() / mu);
        let inc = h.xy().norm().atan2(h.z);

        let wrap = |a: f64| a.rem_euclid(TAU);
        let raan = if node.norm() > 1e-9 { wrap(node.y.atan2(node.x)) } else { 0.0 };

        // Reference direction for angles measured in the orbital plane.
        let h_hat = h / h.norm();
        let reference = if node.norm() > 1e-9 { node.normalize() } else { Vector3::x() };
        let angle_from = |from: &Vector3<f64>, to: &Vector3<f64>| {
            wrap(h_hat.dot(&from.cross(to)).atan2(from.dot(to)))
        };

        let (argp, true_anom) = if ecc > 1e-10 {
            let periapsis = e_vec / ecc;
            (angle_from(&reference, &periapsis), angle_from(&periapsis, &pos))
        } else {
            (0.0, angle_from(&reference, &pos))
        };

        KeplerianElements { sma, ecc, inc, raan, argp, true_anom }
    }

    pub fn period(&self) -> f64 {
        self.period_mu(MU_EARTH)
    }

    pub fn period_mu(&self, mu: f64) -> f64 {
        TAU * (self.sma.powi(3) / mu).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclined_orbit_survives_state_conversion() {
        let orbit = KeplerianElements {
            ecc: 0.05,
            raan: 0.7,
            argp: 1.1,
            ..KeplerianElements::circular(800_000.0, 51.6_f64.to_radians())
        }
        .with_true_anomaly(2.0);
        let recovered = KeplerianElements::from_state(&orbit.state_at_epoch(0.0));
        assert!((recovered.sma - orbit.sma).abs() < 1e-3, "sma {}", recovered.sma);
        assert!((recovered.ecc - orbit.ecc).abs() < 1e-9);
        assert!((recovered.inc - orbit.inc).abs() < 1e-9);
        assert!((recovered.raan - orbit.raan).abs() < 1e-9);
        assert!((recovered.argp - orbit.argp).abs() < 1e-9);
        assert!((recovered.true_anom - orbit.true_anom).abs() < 1e-9);
    }

    #[test]
    fn circular_orbit_speed() {
        let alt = 400_000.0;
        let state = KeplerianElements::circular(alt, 0.0).state_at_epoch(0.0);
        let expected = (MU_EARTH / (R_EARTH_ECI + alt)).sqrt();
        assert!((state.speed() - expected).abs() < 1e-6);
        assert!((state.altitude() - alt).abs() < 1e-6);
    }

    #[test]
    fn leo_period() {
        let period = KeplerianElements::circular(400_000.0, 0.0).period();
        // ~92 min
        assert!(period > 5400.0 && period < 5700.0, "got {:.0} s", period);
    }
}
