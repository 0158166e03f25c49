//! End-to-end sessions driven by real Rhai scripts.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use refactory_core::config::{SimulationBoundsConfig, SimulationConfig, TimingConfig};
use refactory_core::operator::{OperatorCommand, OperatorState, SimulationEndReason};
use refactory_core::runner::{Autosave, NoOpCallback, RunOptions, run_simulation};
use refactory_core::scheduler::TickScheduler;
use refactory_core::tick::{Simulation, run_tick};
use refactory_script::{RhaiScriptHost, starter_script};
use refactory_store::{SnapshotStore, WorldSnapshot};
use refactory_types::{PlayerScript, Position, RobotStatus};
use refactory_world::QuotaOutcome;

fn starter_session() -> Simulation {
    Simulation::new(&SimulationConfig::default(), vec![starter_script()]).unwrap()
}

#[test]
fn starter_script_gathers_ore_within_bounds() {
    let mut sim = starter_session();
    let mut host = RhaiScriptHost::new();
    let mut spawned_total = sim.world.spawned_resources.len();

    for _ in 0..1200 {
        let summary = run_tick(&mut sim, &mut host).unwrap();
        assert!(summary.scripts.faults.is_empty(), "{:?}", summary.scripts.faults);
        assert!(summary.energy.closing >= Decimal::ZERO);
        assert!(summary.energy.closing <= sim.world.energy.max);
        spawned_total = spawned_total.saturating_add(summary.spawned.len());
    }

    assert!(sim.world.spawned_resources.len() < spawned_total);
    assert!(sim.world.active_script().unwrap().stats.invocations >= 1200);
}

const SPLIT_SOURCE: &str = r#"
    fn update(robot) {
        let p = robot.position();
        if p.x < 150.0 {
            throw "left side robots refuse to work";
        }
        robot.move_to(p.x + 10.0, p.y);
    }
"#;

/// A floor whose first robot runs at `x = 200`, optionally joined by a
/// second robot at the start position, with a stocked assembler and a short
/// quota so production and quota phases both have work to do.
fn split_session(with_faulty: bool) -> Simulation {
    let mut sim = Simulation::new(
        &SimulationConfig::default(),
        vec![PlayerScript::new("Split", SPLIT_SOURCE)],
    )
    .unwrap();
    let faulty = sim.world.robots.first().unwrap().clone();
    sim.world.robots.first_mut().unwrap().position = Position::new(200.0, 100.0);
    if with_faulty {
        let mut faulty = faulty;
        faulty.id = refactory_types::RobotId::new();
        sim.world.robots.insert(0, faulty);
    }
    for machine in &mut sim.world.machines {
        let Some(recipe) = machine.recipe.clone() else {
            continue;
        };
        for input in recipe.inputs {
            machine
                .inventory
                .insert(input.kind, input.amount.saturating_mul(10));
        }
    }
    sim.world.current_quota.as_mut().unwrap().time_limit = 20;
    sim
}

fn healthy_robot(sim: &Simulation) -> &refactory_types::Robot {
    sim.world.robots.last().unwrap()
}

#[test]
fn broken_robot_does_not_stop_the_others() {
    let mut sim = split_session(true);
    let mut host = RhaiScriptHost::new();
    let summary = run_tick(&mut sim, &mut host).unwrap();

    assert_eq!(summary.scripts.completed, 1);
    assert_eq!(summary.scripts.faults.len(), 1);
    let statuses: Vec<RobotStatus> = sim.world.robots.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![RobotStatus::Error, RobotStatus::Moving]);
    assert_eq!(healthy_robot(&sim).position, Position::new(202.0, 100.0));
    assert_eq!(sim.world.robots.first().unwrap().position, Position::new(100.0, 100.0));
}

#[test]
fn broken_robot_leaves_production_and_quota_alone() {
    let mut faulty = split_session(true);
    let mut clean = split_session(false);
    let mut host = RhaiScriptHost::new();

    let mut quota_failures = 0_u32;
    for _ in 0..60 {
        let a = run_tick(&mut faulty, &mut host).unwrap();
        let b = run_tick(&mut clean, &mut host).unwrap();
        assert_eq!(a.scripts.faults.len(), 1);
        assert!(b.scripts.faults.is_empty());

        assert_eq!(a.production.progressed.len(), b.production.progressed.len());
        assert_eq!(a.production.completed.len(), b.production.completed.len());
        assert_eq!(a.production.energy_drawn, b.production.energy_drawn);
        assert_eq!(a.quota, b.quota);
        if matches!(a.quota, QuotaOutcome::Failed { .. }) {
            quota_failures = quota_failures.saturating_add(1);
        }
        assert_eq!(healthy_robot(&faulty).position, healthy_robot(&clean).position);
    }

    assert!(quota_failures >= 2);
    let machine_state = |s: &Simulation| {
        s.world
            .machines
            .iter()
            .map(|m| (m.progress, m.active, m.inventory.clone(), m.output_inventory.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(machine_state(&faulty), machine_state(&clean));
    assert_eq!(faulty.world.resources, clean.world.resources);
    assert_eq!(faulty.world.quota_history, clean.world.quota_history);
}

#[test]
fn runaway_script_is_cut_off_each_tick() {
    let mut sim = Simulation::new(
        &SimulationConfig::default(),
        vec![PlayerScript::new("Spin", "fn update(robot) { loop { let x = 1; } }")],
    )
    .unwrap();
    let mut host = RhaiScriptHost::new();
    for _ in 0..3 {
        let summary = run_tick(&mut sim, &mut host).unwrap();
        assert_eq!(summary.scripts.faults.len(), 1);
    }
    assert_eq!(sim.world.tick, 3);
}

#[test]
fn quota_timeout_restarts_same_quota() {
    let mut sim = starter_session();
    sim.world.current_quota.as_mut().unwrap().time_limit = 5;
    let mut host = RhaiScriptHost::new();

    let mut failed = None;
    for _ in 0..5 {
        let summary = run_tick(&mut sim, &mut host).unwrap();
        if let QuotaOutcome::Failed { entry } = summary.quota {
            failed = Some(entry);
        }
    }
    let entry = failed.unwrap();
    assert!(!entry.success);
    assert_eq!(entry.level, 1);
    assert_eq!(sim.world.quota_level, 1);
    assert_eq!(sim.world.quota_start_tick, 5);
}

#[test]
fn same_seed_same_floor() {
    let mut a = starter_session();
    let mut b = starter_session();
    let mut host_a = RhaiScriptHost::new();
    let mut host_b = RhaiScriptHost::new();
    for _ in 0..400 {
        run_tick(&mut a, &mut host_a).unwrap();
        run_tick(&mut b, &mut host_b).unwrap();
    }
    let positions = |s: &Simulation| -> Vec<Position> {
        s.world.robots.iter().map(|r| r.position).collect()
    };
    assert_eq!(positions(&a), positions(&b));
    assert_eq!(a.world.energy, b.world.energy);
    assert_eq!(
        a.world.spawned_resources.len(),
        b.world.spawned_resources.len()
    );
}

#[tokio::test]
async fn runner_autosaves_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.json");
    let timing = TimingConfig {
        ticks_per_second: 1000,
        max_ticks_per_frame: 10,
        frame_interval_ms: 1,
        ..TimingConfig::default()
    };
    let options = RunOptions {
        frame_interval: Duration::from_millis(1),
        autosave: Some(Autosave {
            store: SnapshotStore::new(path.clone()),
            interval_ticks: 10,
        }),
    };
    let operator = Arc::new(OperatorState::new(
        &timing,
        &SimulationBoundsConfig {
            max_ticks: 25,
            max_real_time_seconds: 0,
        },
    ));

    let mut sim = starter_session();
    let mut host = RhaiScriptHost::new();
    let mut scheduler = TickScheduler::new(&timing).unwrap();
    let result = run_simulation(
        &mut sim,
        &mut host,
        &mut scheduler,
        &operator,
        &options,
        &mut NoOpCallback,
    )
    .await
    .unwrap();
    assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);

    let saved = SnapshotStore::new(path).load().await.unwrap();
    assert_eq!(saved.state.tick, 20);

    // A fresh session picks up where the snapshot left off.
    let mut restored = starter_session();
    let operator = Arc::new(OperatorState::new(
        &timing,
        &SimulationBoundsConfig {
            max_ticks: 21,
            max_real_time_seconds: 0,
        },
    ));
    operator.submit(OperatorCommand::LoadSnapshot).await;
    let mut scheduler = TickScheduler::new(&timing).unwrap();
    let result = run_simulation(
        &mut restored,
        &mut host,
        &mut scheduler,
        &operator,
        &options,
        &mut NoOpCallback,
    )
    .await
    .unwrap();
    assert_eq!(result.total_ticks, 1);
    assert_eq!(restored.world.tick, 21);
}

#[test]
fn zero_time_recipe_is_switched_off_not_fatal() {
    let mut sim = starter_session();
    let assembler = sim
        .world
        .machines
        .iter_mut()
        .find(|m| m.recipe.is_some())
        .unwrap();
    assembler.recipe.as_mut().unwrap().production_time = 0;
    let assembler_id = assembler.id;
    assert!(WorldSnapshot::capture(&sim.world).validate().is_err());

    let mut host = RhaiScriptHost::new();
    let summary = run_tick(&mut sim, &mut host).unwrap();
    assert_eq!(summary.production.rejected, vec![assembler_id]);
    let assembler = sim.world.machines.iter().find(|m| m.id == assembler_id).unwrap();
    assert!(!assembler.active);

    for _ in 0..5 {
        let summary = run_tick(&mut sim, &mut host).unwrap();
        assert!(summary.production.rejected.is_empty());
    }
    assert_eq!(sim.world.tick, 6);
}

#[tokio::test]
async fn unusable_snapshot_leaves_session_running() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("world.json"));

    let mut bad = starter_session();
    bad.world.tick = 500;
    for machine in &mut bad.world.machines {
        if let Some(recipe) = machine.recipe.as_mut() {
            recipe.production_time = 0;
        }
    }
    store.save(&bad.world).await.unwrap();
    assert!(store.load().await.is_err());

    let timing = TimingConfig {
        ticks_per_second: 1000,
        frame_interval_ms: 1,
        ..TimingConfig::default()
    };
    let options = RunOptions {
        frame_interval: Duration::from_millis(1),
        autosave: Some(Autosave {
            store,
            interval_ticks: 1000,
        }),
    };
    let operator = Arc::new(OperatorState::new(
        &timing,
        &SimulationBoundsConfig {
            max_ticks: 5,
            max_real_time_seconds: 0,
        },
    ));
    operator.submit(OperatorCommand::LoadSnapshot).await;

    let mut sim = starter_session();
    let mut host = RhaiScriptHost::new();
    let mut scheduler = TickScheduler::new(&timing).unwrap();
    let result = run_simulation(
        &mut sim,
        &mut host,
        &mut scheduler,
        &operator,
        &options,
        &mut NoOpCallback,
    )
    .await
    .unwrap();

    assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
    assert_eq!(sim.world.tick, 5);
    assert!(
        sim.world
            .machines
            .iter()
            .filter_map(|m| m.recipe.as_ref())
            .all(|r| r.production_time > 0)
    );
}

#[tokio::test]
async fn restored_session_replays_the_same_spawns() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("world.json"));
    let mut host = RhaiScriptHost::new();

    let mut whole = starter_session();
    for _ in 0..400 {
        run_tick(&mut whole, &mut host).unwrap();
    }

    let mut first = starter_session();
    for _ in 0..200 {
        run_tick(&mut first, &mut host).unwrap();
    }
    store.save(&first.world).await.unwrap();

    let mut resumed = starter_session();
    resumed.replace_world(store.load().await.unwrap().state);
    for _ in 0..200 {
        run_tick(&mut resumed, &mut host).unwrap();
    }

    assert_eq!(resumed.world.tick, 400);
    assert_eq!(resumed.world.spawned_resources, whole.world.spawned_resources);
    assert_eq!(resumed.world.energy, whole.world.energy);
    let positions = |s: &Simulation| -> Vec<Position> {
        s.world.robots.iter().map(|r| r.position).collect()
    };
    assert_eq!(positions(&resumed), positions(&whole));
}
