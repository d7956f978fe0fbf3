use std::collections::BTreeMap;

/// Callback slots of one simulation tick, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    PhysicsStep,
    Frame,
    PostFrame,
}

/// Opaque token returned by [`Scheduler::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

pub trait Scheduler {
    fn subscribe(&mut self, phase: Phase) -> SubscriptionHandle;
    /// Returns `false` for unknown or already released handles.
    fn release(&mut self, handle: SubscriptionHandle) -> bool;
}

/// In-process scheduler used by the runner.
#[derive(Debug, Default)]
pub struct TickScheduler {
    next: u64,
    active: BTreeMap<SubscriptionHandle, Phase>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, phase: Phase) -> bool {
        self.active.values().any(|p| *p == phase)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Scheduler for TickScheduler {
    fn subscribe(&mut self, phase: Phase) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next);
        self.next += 1;
        self.active.insert(handle, phase);
        handle
    }

    fn release(&mut self, handle: SubscriptionHandle) -> bool {
        self.active.remove(&handle).is_some()
    }
}
