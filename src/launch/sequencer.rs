//! Target acquisition, feasibility and the launch run itself.

use nalgebra::Vector3;
use tracing::{debug, error, info, warn};

use crate::config::ControlConfig;
use crate::control::attitude::AttitudeController;
use crate::error::LaunchError;
use crate::interfaces::{BodyId, BodySnapshot, Env};
use crate::launch::checks::{check_alignment, check_host_steady, readiness};
use crate::launch::feasibility::{assess, launch_distance, tolerated_acceleration, LaunchBudget};
use crate::launch::plan::LaunchPlan;
use crate::launch::run::{after_checkpoint, CheckpointPhase, Flow, LaunchRun, Stage, Tick};
use crate::ops::state::OperationState;
use crate::orbital::{ManeuverNode, OrbitalState};

/// Host velocity changes below this are not worth a node, m/s.
const RECONCILE_EPSILON: f64 = 1e-6;

/// Alignment state owned by the machine and lent to the sequencer.
pub struct Steering<'a> {
    pub attitude: &'a mut AttitudeController,
    pub auto_align: bool,
}

/// Why a run stopped, and where the machine goes next.
#[derive(Debug)]
struct Abort {
    reason: LaunchError,
    next: OperationState,
}

impl Abort {
    fn new(reason: LaunchError, next: OperationState) -> Self {
        Abort { reason, next }
    }

    fn pre_launch(reason: LaunchError) -> Self {
        Abort::new(reason, OperationState::TargetPresent)
    }
}

#[derive(Debug, Clone)]
pub struct LaunchSequencer {
    cfg: ControlConfig,
    plan: Option<LaunchPlan>,
    run: Option<LaunchRun>,
    /// Host trajectory captured at ignition.
    pre_launch_host: Option<OrbitalState>,
    waiting_on: Option<LaunchError>,
}

impl LaunchSequencer {
    pub fn new(cfg: ControlConfig) -> Self {
        LaunchSequencer { cfg, plan: None, run: None, pre_launch_host: None, waiting_on: None }
    }

    pub fn plan(&self) -> Option<&LaunchPlan> {
        self.plan.as_ref()
    }

    pub fn run(&self) -> Option<&LaunchRun> {
        self.run.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn config(&self) -> &ControlConfig {
        &self.cfg
    }

    pub fn reload(&mut self, cfg: ControlConfig) {
        self.cfg = cfg;
    }

    pub fn set_partial_launch(&mut self, allowed: bool) {
        self.cfg.partial_launch = allowed;
    }

    /// Drop the plan. A run in progress keeps its own.
    pub fn clear(&mut self) {
        if self.run.is_none() {
            self.plan = None;
        }
    }

    /// Seconds until ignition.
    pub fn countdown(&self, now: f64) -> Option<f64> {
        self.plan.as_ref().filter(|p| p.is_valid()).map(|p| p.launch_ut - now)
    }

    // -----------------------------------------------------------------------
    // Acquisition
    // -----------------------------------------------------------------------

    /// The one body inside the accelerator, if any.
    ///
    /// The acceleration zone contains the capture zone, so a loaded body shows
    /// up in both.
    pub fn identify_loaded_target(env: &Env<'_>) -> Result<Option<BodyId>, LaunchError> {
        let accelerating = env.launching.bodies_in_zone();
        if accelerating.is_empty() {
            return Ok(None);
        }
        let captured = env.loading.bodies_in_zone();
        match (captured.as_slice(), accelerating.as_slice()) {
            ([], _) => Err(LaunchError::AccelerationZoneOccupied),
            ([_, _, ..], _) => Err(LaunchError::MultipleInCaptureZone),
            (_, [_, _, ..]) => Err(LaunchError::MultipleInAccelerationZone),
            ([a], [b]) if a != b => Err(LaunchError::MultipleInsideAccelerator),
            ([a], _) => Ok(Some(*a)),
        }
    }

    /// Build a fresh plan for `id` from its next maneuver node.
    ///
    /// The plan is kept even when it is not feasible so the operator can see why.
    pub fn acquire_target(&mut self, env: &mut Env<'_>, id: BodyId) -> Result<(), LaunchError> {
        env.orbits.clear_nodes(env.host.id());
        let Some(body) = env.orbits.body(id) else {
            self.plan = None;
            return Err(LaunchError::TargetNotFound(id));
        };
        self.plan = Some(LaunchPlan::new(id, body.name));
        self.update_node(env)?;
        self.check_feasibility(env)?;
        if let Some(plan) = &self.plan {
            info!(
                target = %plan.target_name,
                delta_v = plan.node_delta_v,
                launch_ut = plan.launch_ut,
                partial = plan.partial,
                "target acquired"
            );
        }
        Ok(())
    }

    /// Re-read the target's first future node.
    ///
    /// Solver nodes win over the stored flight plan; nodes without a known
    /// post-maneuver trajectory are resolved against the orbit at their time.
    pub fn update_node(&mut self, env: &Env<'_>) -> Result<(), LaunchError> {
        let plan = self.plan.as_mut().ok_or(LaunchError::TargetLost)?;
        let now = env.clock.now();
        let nodes = match env.orbits.planned_nodes(plan.target) {
            Some(nodes) if !nodes.is_empty() => nodes,
            _ => env.orbits.flight_plan_nodes(plan.target),
        };
        let node = nodes.into_iter().find(|n| n.ut > now).and_then(|node| {
            if node.next_patch.is_some() {
                Some(node)
            } else {
                env.orbits.state_at(plan.target, node.ut).map(|pre| node.resolved(&pre))
            }
        });
        match node {
            Some(node) => {
                plan.node_delta_v = node.delta_v_magnitude();
                plan.node = Some(node);
                Ok(())
            }
            None => {
                plan.node = None;
                plan.node_delta_v = 0.0;
                plan.maneuver_valid = false;
                Err(LaunchError::NoManeuverNode)
            }
        }
    }

    fn budget(&self, env: &Env<'_>, plan: &LaunchPlan) -> Result<LaunchBudget, LaunchError> {
        let payload = env.orbits.body(plan.target).ok_or(LaunchError::TargetNotFound(plan.target))?;
        let host_id = env.host.id();
        let host = env.orbits.body(host_id).ok_or(LaunchError::TargetNotFound(host_id))?;
        let axis = env.launching.axis_direction_world();
        Ok(LaunchBudget {
            required_delta_v: plan.node_delta_v,
            payload_mass: payload.mass,
            host_mass: host.mass,
            tolerated_acceleration: tolerated_acceleration(
                &payload,
                self.cfg.crew_g_limits,
                self.cfg.g_tolerance_margin,
            ),
            max_power: env.launching.max_power(),
            distance: launch_distance(&payload, &axis, env.launching.channel_end())?,
            stored_energy: env.host.stored_energy(),
            dt: env.clock.fixed_dt(),
        })
    }

    /// Size the burn against the structure, channel and energy store.
    pub fn check_feasibility(&mut self, env: &mut Env<'_>) -> Result<(), LaunchError> {
        let Some(mut plan) = self.plan.take() else {
            return Err(LaunchError::TargetLost);
        };
        let outcome = plan.node_ut().ok_or(LaunchError::NoManeuverNode).and_then(|node_ut| {
            let budget = self.budget(env, &plan)?;
            let launching = &*env.launching;
            let assessment =
                assess(&budget, |m, a| launching.force_for_acceleration(m, a), &self.cfg)?;
            Ok((node_ut, assessment))
        });
        let result = match outcome {
            Ok((node_ut, assessment)) => {
                for warning in &assessment.warnings {
                    env.status.message(&warning.to_string());
                }
                assessment.apply(&mut plan, node_ut, self.cfg.launch_window);
                Ok(())
            }
            Err(err) => {
                plan.maneuver_valid = false;
                Err(err)
            }
        };
        self.plan = Some(plan);
        result
    }

    /// Δv still to deliver to the target, inertial.
    pub fn burn_vector(&self, env: &Env<'_>) -> Option<Vector3<f64>> {
        let plan = self.plan.as_ref()?;
        let ut = plan.node_ut()?;
        let at_node = env.orbits.state_at(plan.target, ut)?;
        plan.node.as_ref()?.burn_vector(&at_node)
    }

    fn target_snapshot(&self, env: &Env<'_>) -> Option<BodySnapshot> {
        self.plan.as_ref().and_then(|p| env.orbits.body(p.target))
    }

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    pub fn start(&mut self, env: &mut Env<'_>) {
        if self.run.is_some() {
            return;
        }
        let now = env.clock.now();
        self.run = Some(LaunchRun::new(now));
        self.waiting_on = None;
        env.status.clear_messages();
        info!(now, "launch sequence started");
    }

    pub fn on_frame(
        &mut self,
        env: &mut Env<'_>,
        steering: &mut Steering<'_>,
    ) -> Option<OperationState> {
        self.advance(env, steering, Tick::Frame)
    }

    pub fn on_physics_step(
        &mut self,
        env: &mut Env<'_>,
        steering: &mut Steering<'_>,
    ) -> Option<OperationState> {
        self.advance(env, steering, Tick::PhysicsStep)
    }

    /// Operator abort. Safe to call with no run in progress.
    pub fn cancel(&mut self, env: &mut Env<'_>) {
        if self.run.take().is_none() {
            return;
        }
        env.clock.stop_warp();
        warn!("launch cancelled by operator");
        env.status.message(&LaunchError::UserAbort.to_string());
        env.status.message("launch sequence aborted");
        self.end_launch(env);
    }

    /// Turn whatever the burn did to the host into a maneuver node.
    ///
    /// Runs at most once per ignition.
    pub fn end_launch(&mut self, env: &mut Env<'_>) {
        let Some(pre) = self.pre_launch_host.take() else {
            return;
        };
        let host = env.host.id();
        let now = env.clock.now();
        let Some(after) = env.orbits.state_at(host, now) else {
            return;
        };
        let before = env.orbits.propagate(&pre, now);
        let delta_v = before.vel - after.vel;
        if delta_v.norm() <= RECONCILE_EPSILON {
            return;
        }
        env.orbits.clear_nodes(host);
        env.orbits.add_node(host, ManeuverNode::from_orbital(&after, &delta_v));
        info!(delta_v = delta_v.norm(), "host recoil recorded as maneuver node");
    }

    fn advance(
        &mut self,
        env: &mut Env<'_>,
        steering: &mut Steering<'_>,
        tick: Tick,
    ) -> Option<OperationState> {
        loop {
            let stage = self.run.as_ref()?.stage();
            if stage.wakes_on() != tick {
                return None;
            }
            match self.drive(stage, env, steering) {
                Ok(Flow::Next(next)) => {
                    if let Some(run) = self.run.as_mut() {
                        run.set_stage(next);
                    }
                }
                Ok(Flow::Wait) => return None,
                Ok(Flow::Finish(next)) => {
                    if let Some(run) = self.run.take() {
                        let elapsed = env.clock.now() - run.started_at();
                        info!(elapsed, next = %next, "launch run finished");
                    }
                    return Some(next);
                }
                Err(abort) => return Some(self.abort(env, abort)),
            }
        }
    }

    fn drive(
        &mut self,
        stage: Stage,
        env: &mut Env<'_>,
        steering: &mut Steering<'_>,
    ) -> Result<Flow, Abort> {
        match stage {
            Stage::Start => {
                let valid = self.plan.as_ref().is_some_and(LaunchPlan::is_valid);
                if !valid || self.target_snapshot(env).is_none() {
                    return Err(Abort::pre_launch(LaunchError::TargetLost));
                }
                check_host_steady(&*env.host, &self.cfg).map_err(Abort::pre_launch)?;
                Ok(Flow::Next(Stage::Checkpoint { index: 0, phase: CheckpointPhase::Validate }))
            }
            Stage::Checkpoint { index, phase: CheckpointPhase::Validate } => {
                if index >= self.cfg.control_points.len() {
                    return Ok(Flow::Next(Stage::FinalWait));
                }
                self.preflight(env, steering).map_err(Abort::pre_launch)?;
                Ok(Flow::Next(Stage::Checkpoint { index, phase: CheckpointPhase::AwaitReady }))
            }
            Stage::Checkpoint { index, phase: CheckpointPhase::AwaitReady } => {
                self.await_ready(index, env, steering)
            }
            Stage::Checkpoint { index, phase: CheckpointPhase::Warping { until } } => {
                if env.clock.now() < until {
                    Ok(Flow::Wait)
                } else {
                    Ok(Flow::Next(after_checkpoint(index)))
                }
            }
            Stage::FinalWait => {
                let now = env.clock.now();
                let Some(plan) = self.plan.as_ref() else {
                    return Err(Abort::pre_launch(LaunchError::TargetLost));
                };
                if now < plan.launch_ut {
                    return Ok(Flow::Wait);
                }
                let missed = plan.missed_window(now);
                let check = if missed {
                    Err(LaunchError::MissedLaunchWindow)
                } else {
                    self.preflight(env, steering).and_then(|()| self.ready(env, steering))
                };
                check.map_err(|e| Abort::pre_launch(LaunchError::FinalCheckFailed(Box::new(e))))?;
                self.ignite(env)?;
                Ok(Flow::Next(Stage::Burn))
            }
            Stage::Burn => self.burn_step(env),
        }
    }

    fn preflight(
        &mut self,
        env: &mut Env<'_>,
        steering: &mut Steering<'_>,
    ) -> Result<(), LaunchError> {
        let valid = self.plan.as_ref().is_some_and(LaunchPlan::is_valid);
        if !valid || self.target_snapshot(env).is_none() {
            return Err(LaunchError::TargetLost);
        }
        self.update_node(env)?;
        self.check_feasibility(env)?;
        if !steering.auto_align {
            let burn = self.burn_vector(env).unwrap_or_else(Vector3::zeros);
            let axis = env.launching.axis_direction_world();
            check_alignment(steering.attitude, false, &axis, &burn, &env.host.rotation())?;
        }
        Ok(())
    }

    fn ready(&self, env: &Env<'_>, steering: &mut Steering<'_>) -> Result<(), LaunchError> {
        let payload = self.target_snapshot(env).ok_or(LaunchError::TargetLost)?;
        let burn = self.burn_vector(env).unwrap_or_else(Vector3::zeros);
        readiness(env, steering.attitude, steering.auto_align, &payload, &burn, &self.cfg)
    }

    fn await_ready(
        &mut self,
        index: usize,
        env: &mut Env<'_>,
        steering: &mut Steering<'_>,
    ) -> Result<Flow, Abort> {
        let now = env.clock.now();
        let Some(plan) = self.plan.as_ref() else {
            return Err(Abort::pre_launch(LaunchError::TargetLost));
        };
        let (launch_ut, missed) = (plan.launch_ut, plan.missed_window(now));

        match self.ready(env, steering) {
            Ok(()) => self.waiting_on = None,
            Err(reason) => {
                if self.waiting_on.as_ref() != Some(&reason) {
                    env.status.message(&format!("waiting: {reason}"));
                    self.waiting_on = Some(reason);
                }
                if now < launch_ut {
                    return Ok(Flow::Wait);
                }
            }
        }
        if missed {
            return Err(Abort::pre_launch(LaunchError::MissedLaunchWindow));
        }
        // the checkpoint list may have shrunk on a config reload
        let Some(&lead) = self.cfg.control_points.get(index) else {
            return Ok(Flow::Next(Stage::FinalWait));
        };
        if launch_ut - now > lead + self.cfg.warp_margin {
            let until = launch_ut - lead;
            debug!(until, lead, "warping to control point");
            env.clock.warp_to(until);
            let phase = CheckpointPhase::Warping { until };
            return Ok(Flow::Next(Stage::Checkpoint { index, phase }));
        }
        Ok(Flow::Next(after_checkpoint(index)))
    }

    fn ignite(&mut self, env: &mut Env<'_>) -> Result<(), Abort> {
        let now = env.clock.now();
        self.pre_launch_host = env.orbits.state_at(env.host.id(), now);
        let Some(plan) = self.plan.as_mut() else {
            return Err(Abort::pre_launch(LaunchError::TargetLost));
        };
        plan.burn_started = true;
        env.loading.enable(false);
        env.launching.set_power(plan.acceleration);
        env.launching.set_inverted(true);
        env.launching.enable(true);
        info!(
            target = %plan.target_name,
            acceleration = plan.acceleration,
            duration = plan.duration,
            delta_v = plan.planned_delta_v,
            "ignition"
        );
        Ok(())
    }

    fn burn_step(&mut self, env: &mut Env<'_>) -> Result<Flow, Abort> {
        let Some((target, acceleration, partial)) =
            self.plan.as_ref().map(|p| (p.target, p.acceleration, p.partial))
        else {
            return Err(Abort::new(LaunchError::TargetLost, OperationState::Idle));
        };
        if env.orbits.body(target).is_none() {
            return Err(Abort::new(LaunchError::TargetLost, OperationState::Idle));
        }
        match env.launching.bodies_in_zone().as_slice() {
            // a clipped burn runs until the channel ends
            [] if partial => {
                env.launching.enable(false);
                self.leave_remaining_node(env);
                self.end_launch(env);
                info!("partial launch finished");
                env.status.message("partial launch finished, remaining maneuver left on target");
                return Ok(Flow::Finish(OperationState::Idle));
            }
            [] => {
                self.leave_remaining_node(env);
                return Err(Abort::new(LaunchError::TargetLeftEarly, OperationState::Idle));
            }
            [only] if *only == target => {}
            [_] => return Err(Abort::new(LaunchError::TargetReplaced, OperationState::Aborting)),
            _ => return Err(Abort::new(LaunchError::MultipleBodies, OperationState::Aborting)),
        }

        let axis = env.launching.axis_direction_world();
        let remaining = self.burn_vector(env).map_or(0.0, |burn| burn.dot(&axis));
        if remaining < self.cfg.maneuver_delta_v_tolerance {
            env.launching.enable(false);
            self.end_launch(env);
            info!(remaining, "burn complete");
            env.status.message("launch succeeded");
            return Ok(Flow::Finish(OperationState::FinishingLaunch));
        }
        let dt = env.clock.fixed_dt();
        let frames = f64::from(self.cfg.fine_tune_frames);
        if acceleration > 0.0 && remaining / acceleration < dt * frames {
            env.launching.set_power(remaining / dt / (frames + 1.0));
        }
        Ok(Flow::Wait)
    }

    /// Leave the undelivered Δv on the target as a node at the current time.
    fn leave_remaining_node(&self, env: &mut Env<'_>) {
        let Some(plan) = self.plan.as_ref() else {
            return;
        };
        let now = env.clock.now();
        let current = env.orbits.state_at(plan.target, now);
        let (Some(remaining), Some(current)) = (self.burn_vector(env), current) else {
            return;
        };
        env.orbits.clear_nodes(plan.target);
        env.orbits.add_node(plan.target, ManeuverNode::from_orbital(&current, &remaining));
        info!(remaining = remaining.norm(), "unfinished maneuver left on target");
    }

    fn abort(&mut self, env: &mut Env<'_>, abort: Abort) -> OperationState {
        if matches!(abort.reason, LaunchError::FinalCheckFailed(_)) {
            error!(reason = %abort.reason, next = %abort.next, "launch aborted");
        } else {
            warn!(reason = %abort.reason, next = %abort.next, "launch aborted");
        }
        env.status.message(&abort.reason.to_string());
        env.status.message("launch sequence aborted");
        self.run = None;
        env.clock.stop_warp();
        self.end_launch(env);
        abort.next
    }
}
