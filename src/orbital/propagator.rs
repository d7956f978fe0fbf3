use nalgebra::Vector3;

use crate::physics::gravity::{gravity_pointmass_mu, MU_EARTH, R_EARTH_ECI};

/// Point-mass orbital state (no attitude).
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalState {
    pub time: f64,          // s, universal time
    pub pos: Vector3<f64>,  // m, ECI
    pub vel: Vector3<f64>,  // m/s, ECI
}

impl OrbitalState {
    pub fn altitude(&self) -> f64 {
        self.pos.norm() - R_EARTH_ECI
    }

    pub fn speed(&self) -> f64 {
        self.vel.norm()
    }
}

/// RK4 step under point-mass gravity.
pub fn rk4_orbital_step(state: &OrbitalState, dt: f64, mu: f64) -> OrbitalState {
    let deriv = |pos: &Vector3<f64>, vel: &Vector3<f64>| -> (Vector3<f64>, Vector3<f64>) {
        (*vel, gravity_pointmass_mu(pos, mu))
    };

    let (k1_dr, k1_dv) = deriv(&state.pos, &state.vel);
    let (k2_dr, k2_dv) = deriv(
        &(state.pos + k1_dr * dt * 0.5),
        &(state.vel + k1_dv * dt * 0.5),
    );
    let (k3_dr, k3_dv) = deriv(
        &(state.pos + k2_dr * dt * 0.5),
        &(state.vel + k2_dv * dt * 0.5),
    );
    let (k4_dr, k4_dv) = deriv(
        &(state.pos + k3_dr * dt),
        &(state.vel + k3_dv * dt),
    );

    OrbitalState {
        time: state.time + dt,
        pos: state.pos + (k1_dr + 2.0 * k2_dr + 2.0 * k3_dr + k4_dr) * (dt / 6.0),
        vel: state.vel + (k1_dv + 2.0 * k2_dv + 2.0 * k3_dv + k4_dv) * (dt / 6.0),
    }
}

/// Numerically propagate to `ut` with steps no longer than `max_dt`.
pub fn propagate_numeric(state: &OrbitalState, ut: f64, max_dt: f64, mu: f64) -> OrbitalState {
    let span = ut - state.time;
    if span == 0.0 || max_dt <= 0.0 {
        return state.clone();
    }
    let n_steps = (span.abs() / max_dt).ceil().max(1.0) as usize;
    let dt = span / n_steps as f64;
    let mut s = state.clone();
    for _ in 0..n_steps {
        s = rk4_orbital_step(&s, dt, mu);
    }
    s.time = ut;
    s
}

// ---------------------------------------------------------------------------
// Two-body analytic propagation (Lagrange f and g)
// ---------------------------------------------------------------------------

/// Propagate a bound Earth orbit to `ut`.
pub fn propagate_kepler(state: &OrbitalState, ut: f64) -> OrbitalState {
    propagate_kepler_mu(state, ut, MU_EARTH)
}

/// Propagate with an explicit gravitational parameter.
///
/// Unbound or degenerate states fall back to RK4 with 1 s steps.
pub fn propagate_kepler_mu(state: &OrbitalState, ut: f64, mu: f64) -> OrbitalState {
    let dt = ut - state.time;
    if dt == 0.0 {
        return state.clone();
    }
    let r0_vec = state.pos;
    let v0_vec = state.vel;
    let r0 = r0_vec.norm();
    let energy = 0.5 * v0_vec.norm_squared() - mu / r0;
    if r0 < 1.0 || energy >= 0.0 {
        return propagate_numeric(state, ut, 1.0, mu);
    }

    let sma = -mu / (2.0 * energy);
    let mean_motion = (mu / sma.powi(3)).sqrt();
    let sqrt_mu_a = (mu * sma).sqrt();

    // e*cos(E0), e*sin(E0)
    let e_cos = 1.0 - r0 / sma;
    let e_sin = r0_vec.dot(&v0_vec) / sqrt_mu_a;
    let ecc = e_cos.hypot(e_sin);
    let ecc_anom0 = e_sin.atan2(e_cos);

    let mean_anom = ecc_anom0 - e_sin + mean_motion * dt;
    let ecc_anom = solve_kepler(mean_anom, ecc);
    let d_e = ecc_anom - ecc_anom0;
    let (sin_de, cos_de) = d_e.sin_cos();

    let f = 1.0 - sma / r0 * (1.0 - cos_de);
    let g = dt - (d_e - sin_de) / mean_motion;
    let pos = f * r0_vec + g * v0_vec;
    let r = pos.norm();
    let f_dot = -sqrt_mu_a / (r * r0) * sin_de;
    let g_dot = 1.0 - sma / r * (1.0 - cos_de);

    OrbitalState {
        time: ut,
        pos,
        vel: f_dot * r0_vec + g_dot * v0_vec,
    }
}

/// Newton iteration on `M = E - e sin E` (elliptic).
fn solve_kepler(mean_anom: f64, ecc: f64) -> f64 {
    let mut e_anom = mean_anom + ecc * mean_anom.sin();
    for _ in 0..50 {
        let step = (e_anom - ecc * e_anom.sin() - mean_anom) / (1.0 - ecc * e_anom.cos());
        e_anom -= step;
        if step.abs() < 1e-14 {
            break;
        }
    }
    e_anom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbital::KeplerianElements;

    fn leo() -> OrbitalState {
        let r = R_EARTH_ECI + 400_000.0;
        let v = (MU_EARTH / r).sqrt();
        OrbitalState {
            time: 0.0,
            pos: Vector3::new(r, 0.0, 0.0),
            vel: Vector3::new(0.0, v, 0.0),
        }
    }

    #[test]
    fn kepler_matches_rk4_over_short_arc() {
        let initial = leo();
        let numeric = propagate_numeric(&initial, 300.0, 0.05, MU_EARTH);
        let analytic = propagate_kepler(&initial, 300.0);
        assert!(
            (numeric.pos - analytic.pos).norm() < 1e-3,
            "position mismatch {:.3e} m",
            (numeric.pos - analytic.pos).norm()
        );
        assert!((numeric.vel - analytic.vel).norm() < 1e-6);
    }

    #[test]
    fn kepler_returns_after_one_period() {
        let initial = leo();
        let period = KeplerianElements::from_state(&initial).period();
        let last = propagate_kepler(&initial, period);
        assert!((last.pos - initial.pos).norm() < 1e-2);
    }

    #[test]
    fn kepler_handles_eccentric_orbit_backwards() {
        let mut initial = leo();
        initial.vel *= 1.2;
        let back = propagate_kepler(&initial, -600.0);
        let forth = propagate_kepler(&back, 0.0);
        assert!((forth.pos - initial.pos).norm() < 1e-3);
        assert!((forth.vel - initial.vel).norm() < 1e-6);
    }

    #[test]
    fn zero_span_is_identity() {
        let initial = leo();
        assert_eq!(propagate_kepler(&initial, 0.0), initial);
    }
}
