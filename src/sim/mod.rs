pub mod runner;
pub mod scheduler;
pub mod world;

pub use runner::Simulation;
pub use scheduler::{Phase, Scheduler, SubscriptionHandle, TickScheduler};
pub use world::{Scenario, SimWorld};
