pub mod gravity;

pub use gravity::{gravity_pointmass_eci, G0, MU_EARTH, R_EARTH_ECI};
