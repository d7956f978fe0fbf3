use tracing::debug;

use crate::config::ControlConfig;
use crate::error::ConfigError;
use crate::io::csv::AxisTraceRow;
use crate::ops::Accelerator;
use super::scheduler::{Phase, TickScheduler};
use super::world::SimWorld;

// ---------------------------------------------------------------------------
// Tick loop
// ---------------------------------------------------------------------------

/// A world, an accelerator attached to it, and the scheduler between them.
///
/// Each tick runs the physics step, then the subscribed physics-step, frame
/// and post-frame callbacks in that order.
pub struct Simulation {
    pub world: SimWorld,
    pub accelerator: Accelerator,
    pub scheduler: TickScheduler,
    trace: Option<Vec<AxisTraceRow>>,
    ticks: u64,
}

impl Simulation {
    pub fn new(mut world: SimWorld, cfg: ControlConfig) -> Result<Self, ConfigError> {
        let mut scheduler = TickScheduler::new();
        let mut accelerator = Accelerator::new(cfg)?;
        accelerator.attach(&world.env(), &mut scheduler)?;
        Ok(Simulation { world, accelerator, scheduler, trace: None, ticks: 0 })
    }

    /// Record the attitude controller samples every frame.
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(Vec::new());
        self
    }

    pub fn trace(&self) -> &[AxisTraceRow] {
        self.trace.as_deref().unwrap_or(&[])
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self) {
        self.world.physics_step();
        if self.scheduler.is_subscribed(Phase::PhysicsStep) {
            self.accelerator.on_physics_step(&mut self.world.env());
        }
        if self.scheduler.is_subscribed(Phase::Frame) {
            self.accelerator.on_frame(&mut self.world.env());
        }
        if self.scheduler.is_subscribed(Phase::PostFrame) {
            self.accelerator.on_post_frame(&mut self.world.env());
        }
        if let Some(trace) = self.trace.as_mut() {
            let time = self.world.now();
            for (axis, sample) in self.accelerator.attitude().samples() {
                trace.push(AxisTraceRow::new(time, axis, &sample));
            }
        }
        self.ticks += 1;
    }

    pub fn run_ticks(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Tick until `done` holds. Returns the ticks taken, or `None` past `max_ticks`.
    pub fn run_until<F>(&mut self, mut done: F, max_ticks: u64) -> Option<u64>
    where
        F: FnMut(&Simulation) -> bool,
    {
        let start = self.ticks;
        while self.ticks - start < max_ticks {
            if done(self) {
                return Some(self.ticks - start);
            }
            self.tick();
        }
        debug!(max_ticks, "run_until gave up");
        done(self).then_some(self.ticks - start)
    }

    // -----------------------------------------------------------------------
    // Operator controls
    // -----------------------------------------------------------------------

    pub fn acquire_target(&mut self) -> bool {
        self.accelerator.acquire_target(&mut self.world.env())
    }

    pub fn eject(&mut self) -> bool {
        self.accelerator.eject(&mut self.world.env())
    }

    pub fn launch(&mut self) -> bool {
        self.accelerator.launch(&mut self.world.env())
    }

    pub fn abort(&mut self) -> bool {
        self.accelerator.abort(&mut self.world.env())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
