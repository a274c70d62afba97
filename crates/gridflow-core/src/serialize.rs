//! Binary save/load of grid state via `bitcode` with a versioned header.

use serde::{Deserialize, Serialize};

use crate::event::EventInjector;
use crate::grid::GridModel;
use crate::orchestrator::PowerOrchestrator;
use crate::rng::SimRng;
use crate::sim::SimClock;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a gridflow save.
pub const SNAPSHOT_MAGIC: u32 = 0x6F1D_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("save from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Prepended to every save so format and version can be checked before the
/// payload is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick at which the save was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Everything needed to resume a run: the grid, the clock, the RNG
/// position, the orchestrator's last stats and the injector's cooldown and
/// history. Derived state (flows, blackouts) is carried as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSave {
    pub header: SnapshotHeader,
    pub grid: GridModel,
    pub clock: SimClock,
    pub rng: SimRng,
    pub orchestrator: PowerOrchestrator,
    pub injector: EventInjector,
}

impl GridSave {
    pub fn new(grid: GridModel, clock: SimClock, rng: SimRng) -> Self {
        Self {
            header: SnapshotHeader::new(clock.tick),
            grid,
            clock,
            rng,
            orchestrator: PowerOrchestrator::default(),
            injector: EventInjector::default(),
        }
    }

    pub fn with_orchestrator(mut self, orchestrator: PowerOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn with_injector(mut self, injector: EventInjector) -> Self {
        self.injector = injector;
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(self).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode and validate the header. Returns an error, never panics, on
    /// corrupt or mismatched data.
    pub fn decode(data: &[u8]) -> Result<Self, DeserializeError> {
        let save: GridSave =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        save.header.validate()?;
        Ok(save)
    }
}
