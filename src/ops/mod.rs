pub mod machine;
pub mod state;

pub use machine::Accelerator;
pub use state::OperationState;
