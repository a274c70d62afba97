//! Gridflow Core -- flow computation for city-scale electricity grids.
//!
//! This crate models a grid of generators, consumers, storage and
//! transmission lines, computes how much power can actually be delivered
//! with a maximum-flow solve, and derives per-consumer shortage and
//! blackout state from the result.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::GridSimulation::step`] advances the simulation by
//! one tick:
//!
//! 1. **Commands** -- Apply queued grid edits; recompute instantly if any landed.
//! 2. **Clock** -- Advance simulated time.
//! 3. **Supply** -- Recompute every node's supply from demand patterns,
//!    weather-driven renewables and storage dispatch.
//! 4. **Flow** -- Build the augmented network, solve max flow, write line
//!    flows back and detect blackouts (every tick or throttled).
//! 5. **Events** -- Possibly inject one stochastic shock, then recompute.
//!
//! # Key Types
//!
//! - [`grid::GridModel`] -- Nodes and lines with soft deletion.
//! - [`network::NetworkBuilder`] -- Builds the super-source/super-sink network.
//! - [`flow::EdmondsKarp`] -- The [`flow::FlowSolver`] used by the orchestrator.
//! - [`orchestrator::PowerOrchestrator`] -- Supply, solve, write-back, blackouts.
//! - [`event::EventInjector`] -- Random line trips, derates, demand spikes.
//! - [`query::GridSnapshot`] -- Owned read-only view for external consumers.
//! - [`serialize`] -- Versioned binary save/load via bitcode.

pub mod command_queue;
pub mod config;
pub mod demand;
pub mod engine;
pub mod error;
pub mod event;
pub mod flow;
pub mod grid;
pub mod id;
pub mod network;
pub mod orchestrator;
pub mod query;
pub mod rng;
pub mod serialize;
pub mod sim;
pub mod storage;
pub mod weather;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use flow::EPSILON;
