pub mod config;
pub mod control;
pub mod error;
pub mod interfaces;
pub mod io;
pub mod launch;
pub mod ops;
pub mod orbital;
pub mod physics;
pub mod sim;
pub mod status;

pub use config::ControlConfig;
pub use error::{ConfigError, FailureKind, LaunchError};
pub use ops::{Accelerator, OperationState};
