pub mod elements;
pub mod maneuvers;
pub mod propagator;

pub use elements::KeplerianElements;
pub use maneuvers::{
    circular_velocity, node_to_orbital_delta_v, orbital_to_node_delta_v, ManeuverNode, NodeFrame,
};
pub use propagator::{propagate_kepler, propagate_numeric, rk4_orbital_step, OrbitalState};
