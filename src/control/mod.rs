pub mod attitude;
pub mod axis;
pub mod filter;
pub mod oscillation;
pub mod pid;
pub mod torque;

pub use attitude::{compute_attitude_error, AttitudeController, AttitudeError};
pub use axis::{AxisControl, AxisSample, PositionRateController, RateDampingController};
pub use filter::LowPassFilter;
pub use oscillation::OscillationGuard;
pub use pid::Pid;
pub use torque::{Nozzle, ReactionWheel, ThrusterCluster, TorqueEnvelope, TorqueFrame, TorqueSource};
