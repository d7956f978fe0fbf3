//! End-to-end launches on the reference world.

use nalgebra::Vector3;

use mass_driver::launch::Stage;
use mass_driver::orbital::propagate_kepler;
use mass_driver::sim::{Scenario, Simulation};
use mass_driver::{ControlConfig, OperationState};

fn simulation(scenario: Scenario, cfg: ControlConfig) -> Simulation {
    Simulation::new(scenario.build(), cfg).unwrap()
}

fn acquire(sim: &mut Simulation) {
    let acquired = |s: &Simulation| {
        s.accelerator.state() == OperationState::TargetPresent
            && s.accelerator.sequencer().plan().is_some()
    };
    sim.run_until(acquired, 20).expect("payload acquired");
}

fn loaded(scenario: Scenario) -> Simulation {
    let mut sim = simulation(scenario, ControlConfig::default());
    acquire(&mut sim);
    sim
}

fn burning(sim: &Simulation) -> bool {
    sim.accelerator.sequencer().run().is_some_and(|r| r.burning())
}

/// State entered right after the first `state` in the history.
fn after(sim: &Simulation, state: OperationState) -> Option<OperationState> {
    let history = &sim.world.status().history;
    let i = history.iter().position(|s| *s == state)?;
    history.get(i + 1).copied()
}

#[test]
fn launch_delivers_the_node() {
    let mut sim = loaded(Scenario::default());
    let host = sim.world.host_id();
    let payload = sim.world.payload_id().unwrap();
    let host_before = sim.world.body(host).unwrap().state.clone();
    let payload_before = sim.world.body(payload).unwrap().state.clone();
    let plan = sim.accelerator.sequencer().plan().cloned().unwrap();
    assert!(plan.is_valid() && !plan.partial);

    assert!(sim.launch());
    assert_eq!(sim.accelerator.state(), OperationState::Launching);
    sim.run_until(|s| s.accelerator.state() == OperationState::Idle, 5_000)
        .expect("launch finished");

    let status = sim.world.status();
    assert!(status.has_message("launch succeeded"), "{:?}", status.journal);
    assert_eq!(after(&sim, OperationState::Launching), Some(OperationState::FinishingLaunch));
    assert_eq!(after(&sim, OperationState::FinishingLaunch), Some(OperationState::Idle));

    let now = sim.world.now();
    let coasted = propagate_kepler(&payload_before, now);
    let delivered = sim.world.body(payload).unwrap().state.vel - coasted.vel;
    let delivered = delivered.norm();
    assert!((delivered - 50.0).abs() < 0.05, "delivered {delivered}");
    // the taper never overshoots the node
    assert!(delivered <= 50.0 + 0.01, "delivered {delivered}");

    // the host recoil is left as a node restoring the pre-launch orbit
    let nodes = sim.world.nodes(host);
    assert_eq!(nodes.len(), 1);
    let node = &nodes[0];
    let restored = node.next_patch.as_ref().unwrap();
    let before = propagate_kepler(&host_before, node.ut);
    assert!((restored.vel - before.vel).norm() < 1e-3);
    assert!((node.delta_v_magnitude() - 5.0).abs() < 0.1, "recoil {}", node.delta_v_magnitude());
    assert!(!sim.world.launching_enabled());
}

#[test]
fn second_body_mid_burn_aborts() {
    let mut sim = loaded(Scenario::default());
    let host = sim.world.host_id();
    assert!(sim.launch());
    sim.run_until(burning, 5_000).expect("ignition");
    sim.run_ticks(10);
    assert_eq!(sim.accelerator.state(), OperationState::Launching);

    let inside = sim.world.point_on_axis(100.0);
    let velocity = sim.world.host_velocity();
    sim.world.spawn_body("debris", 500.0, inside, velocity);
    sim.tick();

    assert_eq!(sim.accelerator.state(), OperationState::Aborting);
    let status = sim.world.status();
    assert!(status.has_message("multiple bodies detected"));
    assert!(status.has_message("launch sequence aborted"));
    assert!(!sim.world.nodes(host).is_empty());

    sim.run_until(|s| s.accelerator.state() != OperationState::Aborting, 2_000)
        .expect("abort settled");
    assert_eq!(after(&sim, OperationState::Aborting), Some(OperationState::Idle));
}

#[test]
fn operator_abort_mid_burn_reconciles_host() {
    let mut sim = loaded(Scenario::default());
    let host = sim.world.host_id();
    let host_before = sim.world.body(host).unwrap().state.clone();
    assert!(sim.launch());
    sim.run_until(burning, 5_000).expect("ignition");
    sim.run_ticks(20);

    assert!(sim.abort());
    assert_eq!(sim.accelerator.state(), OperationState::Aborting);
    assert!(sim.world.status().has_message("launch aborted by operator"));

    let nodes = sim.world.nodes(host);
    assert_eq!(nodes.len(), 1);
    let node = &nodes[0];
    let before = propagate_kepler(&host_before, node.ut);
    let restored = node.next_patch.as_ref().unwrap();
    assert!((restored.vel - before.vel).norm() < 1e-3);
    assert!(node.delta_v_magnitude() > 0.1);

    assert!(!sim.abort());
    sim.run_until(|s| s.accelerator.state() != OperationState::Aborting, 2_000)
        .expect("abort settled");
}

#[test]
fn operator_abort_before_ignition_leaves_no_node() {
    let mut sim = loaded(Scenario::default());
    let host = sim.world.host_id();
    assert!(sim.launch());
    sim.run_ticks(3);
    assert!(!burning(&sim));

    assert!(sim.abort());
    assert!(sim.world.nodes(host).is_empty());
    sim.tick();
    assert_eq!(after(&sim, OperationState::Aborting), Some(OperationState::Idle));
    assert!(!sim.world.launching_enabled());
}

#[test]
fn payload_removed_mid_burn_is_lost() {
    let mut sim = loaded(Scenario::default());
    let payload = sim.world.payload_id().unwrap();
    assert!(sim.launch());
    sim.run_until(burning, 5_000).expect("ignition");
    sim.run_ticks(5);

    assert!(sim.world.remove_body(payload));
    sim.tick();
    assert_eq!(sim.accelerator.state(), OperationState::Idle);
    assert!(sim.world.status().has_message("target lost"));
}

#[test]
fn excessive_delta_v_is_refused() {
    let mut sim = loaded(Scenario { node_delta_v: Some(100.0), ..Scenario::default() });
    let plan = sim.accelerator.sequencer().plan().unwrap();
    assert!(!plan.is_valid());
    assert!(plan.max_delta_v < 100.0);

    assert!(!sim.launch());
    assert_eq!(sim.accelerator.state(), OperationState::TargetPresent);
    let status = sim.world.status();
    assert!(status.has_message("accelerator is too short"));
    assert!(status.plan.as_ref().is_some_and(|p| !p.valid));
    assert!(status.payload.is_some_and(|p| !p.delta_v_ok));
}

#[test]
fn partial_launch_leaves_remainder_on_payload() {
    let mut sim = simulation(
        Scenario { node_delta_v: Some(100.0), ..Scenario::default() },
        ControlConfig { partial_launch: true, ..ControlConfig::default() },
    );
    acquire(&mut sim);
    let payload = sim.world.payload_id().unwrap();
    let plan = sim.accelerator.sequencer().plan().cloned().unwrap();
    assert!(plan.is_valid() && plan.partial);
    assert!(sim.world.status().has_message("maximum possible dV"));

    assert!(sim.launch());
    sim.run_until(|s| s.accelerator.state() == OperationState::Idle, 5_000)
        .expect("partial launch finished");
    assert!(sim.world.status().has_message("partial launch finished"));

    let nodes = sim.world.nodes(payload);
    assert_eq!(nodes.len(), 1);
    let remaining = nodes[0].delta_v_magnitude();
    assert!(remaining > 10.0 && remaining < 40.0, "remaining {remaining}");
}

#[test]
fn missed_window_returns_to_target_present() {
    let mut sim = loaded(Scenario { node_lead: 0.5, ..Scenario::default() });
    assert!(sim.launch());
    sim.tick();
    assert_eq!(sim.accelerator.state(), OperationState::TargetPresent);
    assert!(sim.world.status().has_message("missed launch window"));
    assert!(sim.accelerator.sequencer().run().is_none());
}

#[test]
fn rotating_payload_fails_final_check() {
    let mut sim = loaded(Scenario { node_lead: 60.0, ..Scenario::default() });
    let payload = sim.world.payload_id().unwrap();
    sim.world.set_body_angular_velocity(payload, Vector3::new(0.0, 0.0, 0.01));
    assert!(sim.launch());
    sim.run_until(|s| s.accelerator.state() != OperationState::Launching, 5_000)
        .expect("run ended");

    assert_eq!(sim.accelerator.state(), OperationState::TargetPresent);
    let status = sim.world.status();
    assert!(status.has_message("waiting: target is rotating"));
    assert!(status.has_message("pre-launch checks failed: target is rotating"));
    assert!(!sim.world.launching_enabled());
}

#[test]
fn manual_alignment_checks_attitude() {
    let scenario = Scenario { misalignment: 2.0, ..Scenario::default() };
    let mut sim = simulation(scenario, ControlConfig::default());
    sim.accelerator.set_auto_align(false);
    acquire(&mut sim);
    assert!(sim.launch());
    sim.tick();
    assert_eq!(sim.accelerator.state(), OperationState::TargetPresent);
    assert!(sim.world.status().has_message("accelerator is not aligned"));
    // nothing steered the host
    assert_eq!(sim.world.host_angular_velocity(), Vector3::zeros());
}

#[test]
fn eject_clears_the_capture_zone() {
    let mut sim = loaded(Scenario::default());
    assert!(sim.eject());
    sim.run_until(|s| s.accelerator.state() == OperationState::Idle, 2_000)
        .expect("payload ejected");
    let payload = sim.world.payload_id().unwrap();
    let rel = sim.world.relative_velocity(payload).unwrap();
    assert!(rel.dot(&sim.world.axis()) < 0.0);
}

#[test]
fn reload_with_fewer_checkpoints_keeps_the_run() {
    let mut sim = loaded(Scenario::default());
    let payload = sim.world.payload_id().unwrap();
    sim.world.set_body_angular_velocity(payload, Vector3::new(0.0, 0.0, 0.01));
    assert!(sim.launch());
    sim.run_ticks(3);
    assert_eq!(sim.accelerator.state(), OperationState::Launching);
    assert!(sim.world.status().has_message("waiting: target is rotating"));

    let cfg = ControlConfig { control_points: vec![], ..ControlConfig::default() };
    sim.accelerator.reload_config(cfg).unwrap();
    sim.world.set_body_angular_velocity(payload, Vector3::zeros());
    sim.run_ticks(2);

    assert_eq!(sim.accelerator.state(), OperationState::Launching);
    let stage = sim.accelerator.sequencer().run().map(|r| r.stage());
    assert_eq!(stage, Some(Stage::FinalWait));
}
