use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;                 // standard gravity, m/s^2
pub const MU_EARTH: f64 = 3.986_004_418e14;  // m^3/s^2
pub const R_EARTH_ECI: f64 = 6_378_137.0;    // equatorial radius, m

/// Point-mass gravity in ECI.
pub fn gravity_pointmass_eci(pos: &Vector3<f64>) -> Vector3<f64> {
    gravity_pointmass_mu(pos, MU_EARTH)
}

pub fn gravity_pointmass_mu(pos: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let r = pos.norm();
    if r < 1.0 {
        return Vector3::zeros();
    }
    -mu / (r * r * r) * pos
}

/// Convert a g-load to acceleration.
pub fn g_to_accel(g: f64) -> f64 {
    g * G0
}
