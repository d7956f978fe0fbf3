//! Top-level accelerator state machine.
//!
//! The machine is the only writer of `OperationState`. It owns the attitude
//! controller and the launch sequencer and is driven by three callbacks per
//! tick: physics step, frame and post-frame.

use tracing::{debug, error, info, warn};

use crate::config::ControlConfig;
use crate::control::attitude::AttitudeController;
use crate::error::{ConfigError, LaunchError};
use crate::interfaces::Env;
use crate::launch::checks::lateral_offset;
use crate::launch::sequencer::{LaunchSequencer, Steering};
use crate::ops::state::OperationState;
use crate::sim::scheduler::{Phase, Scheduler, SubscriptionHandle};
use crate::status::{PayloadReadout, PlanSummary};

pub struct Accelerator {
    cfg: ControlConfig,
    state: OperationState,
    auto_align: bool,
    attitude: AttitudeController,
    sequencer: LaunchSequencer,
    handles: Vec<SubscriptionHandle>,
    /// Set by a failed attach; nothing runs afterwards.
    disabled: bool,
    /// Identification failed with a body still loaded; retried once the capture zone empties.
    auto_acquire_suppressed: bool,
}

impl Accelerator {
    pub fn new(cfg: ControlConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Accelerator {
            attitude: AttitudeController::new(&cfg),
            sequencer: LaunchSequencer::new(cfg.clone()),
            cfg,
            state: OperationState::Idle,
            auto_align: true,
            handles: Vec::new(),
            disabled: false,
            auto_acquire_suppressed: false,
        })
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn auto_align(&self) -> bool {
        self.auto_align
    }

    pub fn attitude(&self) -> &AttitudeController {
        &self.attitude
    }

    pub fn sequencer(&self) -> &LaunchSequencer {
        &self.sequencer
    }

    pub fn config(&self) -> &ControlConfig {
        &self.cfg
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Check the collaborators and subscribe to the tick phases.
    ///
    /// A failure disables the accelerator for the rest of the session.
    pub fn attach(
        &mut self,
        env: &Env<'_>,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), ConfigError> {
        let host = env.host.id();
        let checked = if env.orbits.body(host).is_none() {
            Err(ConfigError::MissingCollaborator(format!("host body {host:?} is not tracked")))
        } else if env.launching.channel_end().is_none() {
            Err(ConfigError::MissingCollaborator("acceleration channel end".into()))
        } else {
            Ok(())
        };
        if let Err(err) = checked {
            error!(%err, "accelerator disabled");
            self.disabled = true;
            return Err(err);
        }
        for phase in [Phase::PhysicsStep, Phase::Frame, Phase::PostFrame] {
            self.handles.push(scheduler.subscribe(phase));
        }
        info!(?host, "accelerator attached");
        Ok(())
    }

    /// Release the callbacks. A launch in progress is cancelled first.
    pub fn detach(&mut self, env: &mut Env<'_>, scheduler: &mut dyn Scheduler) {
        if self.state.is_launching() {
            self.sequencer.cancel(env);
            env.launching.enable(false);
            self.change_state(env, OperationState::Idle);
        }
        for handle in self.handles.drain(..) {
            scheduler.release(handle);
        }
        debug!("accelerator detached");
    }

    fn change_state(&mut self, env: &mut Env<'_>, next: OperationState) {
        if next == self.state {
            return;
        }
        info!(from = %self.state, to = %next, "state change");
        self.state = next;
        env.status.state_changed(next);
    }

    /// The capture zone may have emptied since the last frame.
    fn loaded(env: &mut Env<'_>) -> bool {
        if env.loading.bodies_in_zone().is_empty() {
            Self::report(env, &LaunchError::CaptureZoneEmpty);
            return false;
        }
        true
    }

    fn report(env: &mut Env<'_>, err: &LaunchError) {
        warn!(reason = %err, "launch check failed");
        env.status.message(&err.to_string());
    }

    // -----------------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------------

    pub fn on_frame(&mut self, env: &mut Env<'_>) {
        if self.disabled {
            return;
        }
        if self.auto_align {
            match self.sequencer.burn_vector(env) {
                Some(burn) => {
                    let axis = env.launching.axis_direction_world();
                    let dt = env.clock.fixed_dt();
                    self.attitude.compute(&axis, &burn, &*env.host, env.inventory, dt);
                }
                None => self.attitude.reset(),
            }
        }
        env.loading.set_inverted(false);
        env.launching.set_inverted(true);

        match self.state {
            OperationState::UnderConstruction => {
                env.loading.enable(false);
                env.launching.enable(false);
            }
            OperationState::Idle => {
                self.sequencer.clear();
                env.launching.enable(false);
                env.loading.enable(true);
                if env.loading.bodies_in_zone().is_empty() {
                    self.auto_acquire_suppressed = false;
                } else {
                    self.change_state(env, OperationState::TargetPresent);
                }
            }
            OperationState::TargetPresent => {
                if env.loading.bodies_in_zone().is_empty() {
                    self.change_state(env, OperationState::Idle);
                } else if self.sequencer.plan().is_none() && !self.auto_acquire_suppressed {
                    self.change_state(env, OperationState::Acquiring);
                }
            }
            OperationState::Acquiring => self.acquire(env),
            OperationState::Ejecting => {
                if env.loading.bodies_in_zone().is_empty() {
                    self.change_state(env, OperationState::Idle);
                } else {
                    env.loading.set_inverted(true);
                }
            }
            OperationState::Launching => {
                let mut steering =
                    Steering { attitude: &mut self.attitude, auto_align: self.auto_align };
                if let Some(next) = self.sequencer.on_frame(env, &mut steering) {
                    self.change_state(env, next);
                }
            }
            OperationState::Aborting => {
                if !env.launching.is_enabled() || env.launching.bodies_in_zone().is_empty() {
                    env.launching.enable(false);
                    self.change_state(env, OperationState::Idle);
                } else {
                    let brake = self
                        .sequencer
                        .plan()
                        .map_or_else(|| env.launching.max_power(), |p| p.acceleration);
                    env.launching.set_power(brake);
                    env.launching.set_inverted(false);
                }
            }
            OperationState::FinishingLaunch => {
                env.launching.enable(false);
                if env.launching.bodies_in_zone().is_empty() {
                    self.change_state(env, OperationState::Idle);
                }
            }
        }
    }

    pub fn on_physics_step(&mut self, env: &mut Env<'_>) {
        if self.disabled {
            return;
        }
        match self.state {
            OperationState::Launching => {
                let mut steering =
                    Steering { attitude: &mut self.attitude, auto_align: self.auto_align };
                if let Some(next) = self.sequencer.on_physics_step(env, &mut steering) {
                    self.change_state(env, next);
                }
            }
            OperationState::Aborting => {
                if self.abort_settled(env) {
                    env.launching.enable(false);
                    self.change_state(env, OperationState::Idle);
                }
            }
            _ => {}
        }
    }

    /// Apply the steering command and publish status.
    pub fn on_post_frame(&mut self, env: &mut Env<'_>) {
        if self.disabled {
            return;
        }
        if self.auto_align {
            self.attitude.apply(env.host);
        }
        self.publish(env);
    }

    fn acquire(&mut self, env: &mut Env<'_>) {
        match LaunchSequencer::identify_loaded_target(env) {
            Ok(Some(id)) => {
                if let Err(err) = self.sequencer.acquire_target(env, id) {
                    Self::report(env, &err);
                }
                self.change_state(env, OperationState::TargetPresent);
            }
            Ok(None) => {
                self.auto_acquire_suppressed = true;
                self.change_state(env, OperationState::Idle);
            }
            Err(err) => {
                Self::report(env, &err);
                self.auto_acquire_suppressed = true;
                self.change_state(env, OperationState::Idle);
            }
        }
    }

    /// Target stopped moving along the axis relative to the host.
    fn abort_settled(&self, env: &Env<'_>) -> bool {
        let inside = env.launching.bodies_in_zone();
        let target = self
            .sequencer
            .plan()
            .map(|p| p.target)
            .filter(|id| inside.contains(id))
            .or_else(|| inside.first().copied());
        let Some(target) = target else {
            return true;
        };
        let host = env.orbits.body(env.host.id());
        let (Some(body), Some(host)) = (env.orbits.body(target), host) else {
            return true;
        };
        let axis = env.launching.axis_direction_world();
        (body.velocity - host.velocity).dot(&axis).abs() < self.cfg.abort_settle_speed
    }

    fn publish(&mut self, env: &mut Env<'_>) {
        let burn = self.sequencer.burn_vector(env);
        if !self.auto_align || self.attitude.has_user_input() {
            if let Some(burn) = &burn {
                let axis = env.launching.axis_direction_world();
                self.attitude.update_error(&axis, burn, &env.host.rotation());
            }
        }
        env.status.attitude(&self.attitude.error(), self.attitude.aligned());

        let now = env.clock.now();
        if let Some(countdown) = self.sequencer.countdown(now) {
            env.status.countdown(countdown);
        }
        env.status.plan_summary(self.sequencer.plan().map(PlanSummary::from));

        let Some(plan) = self.sequencer.plan() else {
            return;
        };
        let host = env.orbits.body(env.host.id());
        let (Some(payload), Some(host)) = (env.orbits.body(plan.target), host) else {
            return;
        };
        let attractor = env.loading.attractor_position();
        let relative_speed = (payload.velocity - host.velocity).norm();
        let angular_speed = payload.angular_velocity.norm().to_degrees();
        let axis = env.loading.axis_direction_world();
        let offset = lateral_offset(&payload.position, &attractor, &axis);
        let readout = PayloadReadout {
            max_delta_v: plan.max_delta_v,
            relative_speed,
            angular_speed,
            distance: (payload.position - attractor).norm(),
            delta_v_ok: plan.max_delta_v >= plan.node_delta_v,
            speed_ok: relative_speed <= self.cfg.max_relative_velocity,
            rotation_ok: angular_speed <= self.cfg.max_angular_velocity,
            distance_ok: offset <= self.cfg.max_displacement,
        };
        env.status.payload_readout(readout);
    }

    // -----------------------------------------------------------------------
    // Operator controls
    // -----------------------------------------------------------------------

    /// Re-acquire the loaded body. Only while a target is present.
    pub fn acquire_target(&mut self, env: &mut Env<'_>) -> bool {
        if self.disabled || self.state != OperationState::TargetPresent {
            return false;
        }
        self.sequencer.clear();
        self.auto_acquire_suppressed = false;
        self.change_state(env, OperationState::Acquiring);
        true
    }

    pub fn eject(&mut self, env: &mut Env<'_>) -> bool {
        if self.disabled || self.state != OperationState::TargetPresent {
            return false;
        }
        if !Self::loaded(env) {
            return false;
        }
        self.change_state(env, OperationState::Ejecting);
        true
    }

    /// Start the launch run. Needs a target present and a valid plan.
    pub fn launch(&mut self, env: &mut Env<'_>) -> bool {
        if self.disabled || self.state != OperationState::TargetPresent {
            return false;
        }
        if !Self::loaded(env) {
            return false;
        }
        if !self.sequencer.plan().is_some_and(|p| p.is_valid()) {
            env.status.message("no valid launch plan");
            return false;
        }
        self.sequencer.start(env);
        self.change_state(env, OperationState::Launching);
        true
    }

    /// Cancel ejection or a launch in progress.
    pub fn abort(&mut self, env: &mut Env<'_>) -> bool {
        match self.state {
            OperationState::Ejecting => {
                self.change_state(env, OperationState::Idle);
                true
            }
            OperationState::Launching => {
                env.clock.stop_warp();
                self.sequencer.cancel(env);
                self.change_state(env, OperationState::Aborting);
                true
            }
            _ => false,
        }
    }

    pub fn set_auto_align(&mut self, enabled: bool) {
        if enabled != self.auto_align {
            self.attitude.reset();
            self.auto_align = enabled;
            debug!(enabled, "auto-align toggled");
        }
    }

    pub fn set_partial_launch(&mut self, allowed: bool) {
        self.cfg.partial_launch = allowed;
        self.sequencer.set_partial_launch(allowed);
    }

    /// Swap in new parameters; the current plan and run are kept.
    pub fn reload_config(&mut self, cfg: ControlConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        self.attitude.reload(&cfg);
        self.sequencer.reload(cfg.clone());
        self.cfg = cfg;
        info!("configuration reloaded");
        Ok(())
    }

    /// Hand the structure to or back from the builder.
    pub fn set_under_construction(&mut self, env: &mut Env<'_>, building: bool) {
        if building {
            if self.state.is_launching() {
                self.sequencer.cancel(env);
            }
            self.change_state(env, OperationState::UnderConstruction);
        } else if self.state == OperationState::UnderConstruction {
            self.change_state(env, OperationState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scheduler::TickScheduler;
    use crate::sim::world::Scenario;

    fn attached(scenario: Scenario) -> (crate::sim::world::SimWorld, Accelerator, TickScheduler) {
        let mut world = scenario.build();
        let mut scheduler = TickScheduler::new();
        let mut accel = Accelerator::new(ControlConfig::default()).unwrap();
        accel.attach(&world.env(), &mut scheduler).unwrap();
        (world, accel, scheduler)
    }

    fn frame(world: &mut crate::sim::world::SimWorld, accel: &mut Accelerator) {
        accel.on_frame(&mut world.env());
        accel.on_post_frame(&mut world.env());
    }

    #[test]
    fn loaded_body_is_acquired_automatically() {
        let (mut world, mut accel, _) = attached(Scenario::default());
        for _ in 0..3 {
            frame(&mut world, &mut accel);
        }
        assert_eq!(accel.state(), OperationState::TargetPresent);
        assert!(accel.sequencer().plan().is_some_and(|p| p.is_valid()));
        assert!(world.status().visited(OperationState::Acquiring));
        assert!(world.status().plan.as_ref().is_some_and(|p| p.valid));
    }

    #[test]
    fn failed_identification_does_not_spin() {
        let (mut world, mut accel, _) = attached(Scenario::default());
        let near = world.point_on_axis(-0.5);
        let velocity = world.host_velocity();
        world.spawn_body("debris", 100.0, near, velocity);
        for _ in 0..10 {
            frame(&mut world, &mut accel);
        }
        let history = &world.status().history;
        let acquiring = history.iter().filter(|s| **s == OperationState::Acquiring).count();
        assert_eq!(acquiring, 1);
        assert_eq!(accel.state(), OperationState::TargetPresent);
        assert!(world.status().has_message("multiple bodies in the capture zone"));
    }

    #[test]
    fn controls_only_apply_with_target_present() {
        let (mut world, mut accel, _) = attached(Scenario::default());
        assert!(!accel.eject(&mut world.env()));
        assert!(!accel.launch(&mut world.env()));
        assert!(!accel.abort(&mut world.env()));
        for _ in 0..3 {
            frame(&mut world, &mut accel);
        }
        assert_eq!(accel.state(), OperationState::TargetPresent);
        assert!(accel.eject(&mut world.env()));
        assert_eq!(accel.state(), OperationState::Ejecting);
        assert!(accel.abort(&mut world.env()));
        assert_eq!(accel.state(), OperationState::Idle);
    }

    #[test]
    fn attach_requires_channel_end() {
        let mut world = Scenario { barrel_length: None, ..Scenario::default() }.build();
        let mut scheduler = TickScheduler::new();
        let mut accel = Accelerator::new(ControlConfig::default()).unwrap();
        let err = accel.attach(&world.env(), &mut scheduler).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCollaborator(_)));
        assert!(accel.is_disabled());
        assert!(!scheduler.is_subscribed(Phase::Frame));
        frame(&mut world, &mut accel);
        assert!(world.status().history.is_empty());
    }

    #[test]
    fn detach_releases_subscriptions() {
        let (mut world, mut accel, mut scheduler) = attached(Scenario::default());
        assert!(scheduler.is_subscribed(Phase::PostFrame));
        accel.detach(&mut world.env(), &mut scheduler);
        assert!(!scheduler.is_subscribed(Phase::PhysicsStep));
        assert!(!scheduler.is_subscribed(Phase::PostFrame));
        assert_eq!(accel.state(), OperationState::Idle);
    }

    #[test]
    fn detach_cancels_a_launch_in_progress() {
        let (mut world, mut accel, mut scheduler) = attached(Scenario::default());
        for _ in 0..3 {
            frame(&mut world, &mut accel);
        }
        assert!(accel.launch(&mut world.env()));
        accel.detach(&mut world.env(), &mut scheduler);
        assert!(accel.sequencer().run().is_none());
        assert_eq!(accel.state(), OperationState::Idle);
        assert!(!world.launching_enabled());
        assert!(world.status().has_message("launch aborted by operator"));
    }

    #[test]
    fn controls_report_an_emptied_capture_zone() {
        let (mut world, mut accel, _) = attached(Scenario::default());
        for _ in 0..3 {
            frame(&mut world, &mut accel);
        }
        let payload = world.payload_id().unwrap();
        assert!(world.remove_body(payload));
        assert!(!accel.launch(&mut world.env()));
        assert!(!accel.eject(&mut world.env()));
        assert_eq!(accel.state(), OperationState::TargetPresent);
        assert!(world.status().has_message("no body in the capture zone"));
    }

    #[test]
    fn under_construction_holds_actuators_off() {
        let (mut world, mut accel, _) = attached(Scenario::default());
        accel.set_under_construction(&mut world.env(), true);
        frame(&mut world, &mut accel);
        assert_eq!(accel.state(), OperationState::UnderConstruction);
        assert!(!world.loading_enabled());
        accel.set_under_construction(&mut world.env(), false);
        assert_eq!(accel.state(), OperationState::Idle);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = ControlConfig { max_attitude_error: -1.0, ..ControlConfig::default() };
        assert!(Accelerator::new(cfg).is_err());
        let mut accel = Accelerator::new(ControlConfig::default()).unwrap();
        let bad = ControlConfig { launch_window: 2.0, ..ControlConfig::default() };
        assert!(accel.reload_config(bad).is_err());
        accel.set_partial_launch(true);
        assert!(accel.config().partial_launch && accel.sequencer().config().partial_launch);
    }
}
