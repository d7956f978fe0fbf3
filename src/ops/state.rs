use std::fmt;

use serde::Serialize;

/// Top-level operating mode of the accelerator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum OperationState {
    #[default]
    Idle,
    /// A body sits in the capture zone.
    TargetPresent,
    Acquiring,
    Ejecting,
    Launching,
    /// Braking the target after a cancelled burn.
    Aborting,
    FinishingLaunch,
    UnderConstruction,
}

impl OperationState {
    /// A launch run may be in flight.
    pub fn is_launching(self) -> bool {
        matches!(self, OperationState::Launching)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationState::Idle => "idle",
            OperationState::TargetPresent => "target present",
            OperationState::Acquiring => "acquiring",
            OperationState::Ejecting => "ejecting",
            OperationState::Launching => "launching",
            OperationState::Aborting => "aborting",
            OperationState::FinishingLaunch => "finishing launch",
            OperationState::UnderConstruction => "under construction",
        };
        f.write_str(name)
    }
}
