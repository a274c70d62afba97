//! Simulation clock, tick state and state hashing.
//!
//! Time advances in whole simulated minutes. Calendar fields (hour, weekday,
//! month) drive the demand pattern and renewable output; the minute counter
//! drives the event cooldown.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Ticks are the atomic unit of simulation progress.
pub type Ticks = u64;

/// Default simulation start: 2025-01-01 00:00.
pub fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Simulation clock
// ---------------------------------------------------------------------------

/// Simulated wall-clock time plus the tick counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    /// Current tick counter. Incremented by 1 for each simulation step.
    pub tick: Ticks,
    /// Current simulated time.
    pub time: NaiveDateTime,
}

impl SimClock {
    /// Create a clock at tick 0 starting at `start`.
    pub fn new(start: NaiveDateTime) -> Self {
        Self { tick: 0, time: start }
    }

    /// Advance by one tick covering `minutes` of simulated time.
    pub fn advance(&mut self, minutes: u32) {
        self.tick += 1;
        self.time += Duration::minutes(i64::from(minutes));
    }

    /// Hour of day, 0..=23.
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    /// Day of week, 0 = Monday .. 6 = Sunday.
    pub fn weekday(&self) -> u32 {
        self.time.weekday().num_days_from_monday()
    }

    /// Month, 1..=12.
    pub fn month(&self) -> u32 {
        self.time.month()
    }

    /// Day of month, 1..=31.
    pub fn day(&self) -> u32 {
        self.time.day()
    }

    /// Whole minutes elapsed since `earlier` (negative if `earlier` is later).
    pub fn minutes_since(&self, earlier: NaiveDateTime) -> i64 {
        (self.time - earlier).num_minutes()
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(default_start())
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of grid state for determinism checks.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed a u64 into the hash.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a u32 into the hash.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed an f64 into the hash by its bit pattern.
    pub fn write_f64(&mut self, v: f64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write(&[v as u8]);
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_new_year() {
        let clock = SimClock::default();
        assert_eq!(clock.tick, 0);
        assert_eq!(clock.hour(), 0);
        assert_eq!(clock.month(), 1);
        assert_eq!(clock.day(), 1);
        // 2025-01-01 is a Wednesday.
        assert_eq!(clock.weekday(), 2);
    }

    #[test]
    fn advance_moves_tick_and_time() {
        let mut clock = SimClock::default();
        let start = clock.time;
        for _ in 0..9 {
            clock.advance(10);
        }
        assert_eq!(clock.tick, 9);
        assert_eq!(clock.hour(), 1);
        assert_eq!(clock.minutes_since(start), 90);
    }

    #[test]
    fn state_hash_deterministic() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_f64(1.5);

        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_f64(1.5);

        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u32(2);

        let mut h2 = StateHash::new();
        h2.write_u32(2);
        h2.write_u32(1);

        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_sees_float_bits() {
        let mut h1 = StateHash::new();
        h1.write_f64(0.1 + 0.2);
        let mut h2 = StateHash::new();
        h2.write_f64(0.3);
        assert_ne!(h1.finish(), h2.finish());
    }
}
