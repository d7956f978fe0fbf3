//! Resumable launch run.
//!
//! A run is a list of stages, each of which waits for one kind of tick. The
//! sequencer drives the current stage whenever that tick arrives and keeps
//! going within the same tick until a stage has to wait.

use crate::ops::state::OperationState;

/// Callback the run is being driven from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Frame,
    PhysicsStep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckpointPhase {
    /// Re-read the node and re-check feasibility.
    Validate,
    /// Wait for the craft and payload to settle.
    AwaitReady,
    /// Time warp in progress toward `until`.
    Warping { until: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Start,
    Checkpoint { index: usize, phase: CheckpointPhase },
    /// Counting physics steps down to ignition.
    FinalWait,
    Burn,
}

impl Stage {
    /// Tick on which this stage makes progress.
    pub fn wakes_on(&self) -> Tick {
        match self {
            Stage::Checkpoint { phase: CheckpointPhase::Warping { .. }, .. }
            | Stage::FinalWait
            | Stage::Burn => Tick::PhysicsStep,
            Stage::Start | Stage::Checkpoint { .. } => Tick::Frame,
        }
    }
}

/// Outcome of driving one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Flow {
    /// Stage changed, try the next one within this tick.
    Next(Stage),
    Wait,
    /// Run completed; the machine moves to the given state.
    Finish(OperationState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRun {
    stage: Stage,
    started_at: f64,
}

impl LaunchRun {
    pub fn new(now: f64) -> Self {
        LaunchRun { stage: Stage::Start, started_at: now }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn burning(&self) -> bool {
        self.stage == Stage::Burn
    }
}

/// Stage following checkpoint `index` once it is cleared.
pub(crate) fn after_checkpoint(index: usize) -> Stage {
    Stage::Checkpoint { index: index + 1, phase: CheckpointPhase::Validate }
}
