pub mod checks;
pub mod feasibility;
pub mod plan;
pub mod run;
pub mod sequencer;

pub use feasibility::{assess, Assessment, LaunchBudget};
pub use plan::{calculate_timing, LaunchPlan, LaunchTiming};
pub use run::{LaunchRun, Stage, Tick};
pub use sequencer::{LaunchSequencer, Steering};
