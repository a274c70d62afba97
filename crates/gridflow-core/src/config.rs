//! Simulation settings. Every field has a default, so partial config files
//! load cleanly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::demand::DemandPattern;
use crate::event::EventConfig;
use crate::orchestrator::{DEFAULT_BLACKOUT_THRESHOLD, DEFAULT_THROTTLE_PROBABILITY, RecomputeMode};
use crate::sim::default_start;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for every random draw in the simulation.
    pub seed: u64,
    /// Simulated minutes covered by one step.
    pub minutes_per_tick: u32,
    pub start_time: NaiveDateTime,
    /// How the per-step flow update runs. Mutations always recompute
    /// instantly regardless.
    pub recompute: RecomputeMode,
    pub throttle_probability: f64,
    pub blackout_threshold: f64,
    pub events: EventConfig,
    pub demand: DemandPattern,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            minutes_per_tick: 10,
            start_time: default_start(),
            recompute: RecomputeMode::Throttled,
            throttle_probability: DEFAULT_THROTTLE_PROBABILITY,
            blackout_threshold: DEFAULT_BLACKOUT_THRESHOLD,
            events: EventConfig::default(),
            demand: DemandPattern::default(),
        }
    }
}

impl SimConfig {
    /// Instant recomputes, no random shocks and a flat demand pattern: the
    /// configuration for reproducible grid analysis.
    pub fn deterministic() -> Self {
        Self {
            recompute: RecomputeMode::Instant,
            events: EventConfig {
                enabled: false,
                ..EventConfig::default()
            },
            demand: DemandPattern::flat(),
            ..Self::default()
        }
    }
}
