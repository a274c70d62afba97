//! Hand-checked grids: the four reference line/generator/consumer cases,
//! degenerate inputs and structural edits, driven through the orchestrator
//! and the simulation context.

use gridflow_core::command_queue::GridCommand;
use gridflow_core::config::SimConfig;
use gridflow_core::engine::GridSimulation;
use gridflow_core::flow::EdmondsKarp;
use gridflow_core::grid::{GridModel, NodeSpec};
use gridflow_core::id::NodeId;
use gridflow_core::network::{BuildOutcome, Degenerate, NetworkBuilder};
use gridflow_core::orchestrator::{BlackoutEvent, PowerOrchestrator};
use gridflow_core::test_utils::*;

fn settle(grid: &mut GridModel) -> PowerOrchestrator {
    let mut orch = PowerOrchestrator::default();
    orch.recompute(grid, 0);
    orch
}

// ===========================================================================
// Reference cases
// ===========================================================================

#[test]
fn scenario_a_line_limited_blackout() {
    let TestGrid {
        mut grid,
        consumers,
        lines,
        ..
    } = scenario_a();
    let orch = settle(&mut grid);
    let c = grid.node(consumers[0]).unwrap();

    assert_close(orch.stats().max_flow, 5.0);
    assert_close(c.shortage, 3.0);
    assert!(c.blackout);
    assert_close(grid.edge(lines[0]).unwrap().flow, 5.0);
}

#[test]
fn scenario_b_fully_served() {
    let TestGrid {
        mut grid,
        consumers,
        ..
    } = scenario_b();
    let orch = settle(&mut grid);
    let c = grid.node(consumers[0]).unwrap();

    assert_close(orch.stats().max_flow, 15.0);
    assert_eq!(c.shortage, 0.0);
    assert!(!c.blackout);
    assert_eq!(orch.stats().blackout_count, 0);
}

#[test]
fn scenario_c_two_generators_share_demand() {
    let TestGrid {
        mut grid,
        consumers,
        lines,
        ..
    } = scenario_c();
    let orch = settle(&mut grid);

    assert_close(orch.stats().max_flow, 15.0);
    assert_eq!(grid.node(consumers[0]).unwrap().shortage, 0.0);
    let delivered: f64 = lines.iter().map(|&e| grid.edge(e).unwrap().flow).sum();
    assert_close(delivered, 15.0);
    for &e in &lines {
        assert!(grid.edge(e).unwrap().flow <= 10.0 + TOLERANCE);
    }
}

#[test]
fn scenario_d_line_not_generator_limits() {
    let TestGrid {
        mut grid,
        consumers,
        ..
    } = scenario_d();
    let orch = settle(&mut grid);
    let c = grid.node(consumers[0]).unwrap();

    assert_close(orch.stats().max_flow, 3.0);
    assert_close(c.shortage, 7.0);
    assert!(c.blackout);
}

#[test]
fn scenarios_agree_under_the_simulation_context() {
    let expected = [5.0, 15.0, 15.0, 3.0];
    let grids = [scenario_a(), scenario_b(), scenario_c(), scenario_d()];
    for (tg, want) in grids.into_iter().zip(expected) {
        let sim = GridSimulation::new(SimConfig::deterministic(), tg.grid);
        assert_close(sim.snapshot().stats.max_flow, want);
    }
}

// ===========================================================================
// Degenerate inputs
// ===========================================================================

#[test]
fn consumers_only_grid_blacks_out_everyone() {
    let mut grid = GridModel::new();
    let a = consumer(&mut grid, 4.0);
    let b = consumer(&mut grid, 6.0);
    line(&mut grid, a, b, 10.0);

    assert!(matches!(
        NetworkBuilder::build(&grid),
        BuildOutcome::Degenerate(Degenerate::NoGenerators)
    ));
    let orch = settle(&mut grid);
    assert_eq!(orch.stats().max_flow, 0.0);
    assert_eq!(orch.stats().blackout_nodes, vec![a, b]);
    assert_close(grid.node(b).unwrap().shortage, 6.0);
}

#[test]
fn generators_only_grid_is_quiet() {
    let mut grid = GridModel::new();
    let a = generator(&mut grid, 4.0);
    let b = generator(&mut grid, 6.0);
    let e = line(&mut grid, a, b, 10.0);

    let orch = settle(&mut grid);
    assert_eq!(orch.stats().max_flow, 0.0);
    assert_eq!(grid.edge(e).unwrap().flow, 0.0);
    assert!(grid.nodes().iter().all(|n| !n.blackout && n.shortage == 0.0));
}

#[test]
fn empty_grid_solves_to_zero() {
    let mut grid = GridModel::new();
    let orch = settle(&mut grid);
    assert_eq!(orch.stats().max_flow, 0.0);
    assert_eq!(orch.stats().blackout_count, 0);
}

#[test]
fn isolated_consumer_is_in_blackout() {
    let TestGrid { mut grid, .. } = scenario_b();
    let island = consumer(&mut grid, 2.0);
    settle(&mut grid);
    let node = grid.node(island).unwrap();
    assert!(node.blackout);
    assert_close(node.shortage, 2.0);
}

#[test]
fn zero_capacity_line_carries_nothing() {
    let mut grid = GridModel::new();
    let g = generator(&mut grid, 10.0);
    let c = consumer(&mut grid, 5.0);
    let e = line(&mut grid, g, c, 0.0);
    let orch = settle(&mut grid);
    assert_eq!(orch.stats().max_flow, 0.0);
    assert_eq!(grid.edge(e).unwrap().flow, 0.0);
    assert!(grid.node(c).unwrap().blackout);
}

// ===========================================================================
// Edits
// ===========================================================================

#[test]
fn relay_through_a_neutral_substation() {
    let mut grid = GridModel::new();
    let g = generator(&mut grid, 20.0);
    let sub = grid.add_node(NodeSpec::neutral());
    let c = consumer(&mut grid, 12.0);
    line(&mut grid, g, sub, 8.0);
    line(&mut grid, sub, c, 30.0);

    let orch = settle(&mut grid);
    assert_close(orch.stats().max_flow, 8.0);
    // 8 < 0.8 * 12
    assert!(grid.node(c).unwrap().blackout);
    assert_eq!(grid.node(sub).unwrap().transmitted_power, 0.0);
}

#[test]
fn removal_and_restore_round_trip() {
    let TestGrid {
        grid, generators, ..
    } = scenario_c();
    let mut sim = GridSimulation::new(SimConfig::deterministic(), grid);
    let baseline = sim.grid().state_hash();

    sim.submit(GridCommand::RemoveNode {
        node: generators[0],
    });
    let report = sim.step(&neutral_weather(1));
    assert!(report.command_results[0].is_ok());
    assert!(sim.orchestrator().stats().max_flow <= 10.0 + TOLERANCE);

    sim.submit(GridCommand::RestoreAll);
    sim.step(&neutral_weather(1));
    assert!(sim.grid().nodes().iter().all(|n| !n.removed));
    assert!(sim.grid().edges().iter().all(|e| !e.removed));
    assert_ne!(sim.grid().state_hash(), baseline, "supply follows the demand pattern");
}

#[test]
fn removed_consumer_clears_without_an_event() {
    let TestGrid {
        grid, consumers, ..
    } = scenario_a();
    let mut sim = GridSimulation::new(SimConfig::deterministic(), grid);
    assert!(sim.grid().node(consumers[0]).unwrap().blackout);

    sim.submit(GridCommand::RemoveNode { node: consumers[0] });
    let report = sim.step(&neutral_weather(1));
    assert!(
        !report
            .blackout_events
            .iter()
            .any(|e| matches!(e, BlackoutEvent::Cleared { node, .. } if *node == consumers[0]))
    );
    assert!(!sim.grid().node(consumers[0]).unwrap().blackout);
    assert_eq!(sim.orchestrator().stats().max_flow, 0.0);
}

#[test]
fn solver_is_reusable_across_builds() {
    let TestGrid { grid, .. } = scenario_c();
    let BuildOutcome::Ready(network) = NetworkBuilder::build(&grid) else {
        panic!("scenario C should build");
    };
    let first = network.solve(&EdmondsKarp);
    let second = network.solve(&EdmondsKarp);
    assert_eq!(first, second);
    assert_close(first.value(), 15.0);
    assert_eq!(network.generators().len(), 2);
    assert_eq!(network.consumers(), &[NodeId(2)]);
}
