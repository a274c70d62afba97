//! Consumer demand shaping.
//!
//! A consumer's demand this tick is its base demand scaled by the calendar
//! pattern (hour, weekday, month, holidays), its building type's day/night
//! profile, and weather sensitivity (temperature, humidity, particulates).
//! Smart-grid consumers shave peaks.

use serde::{Deserialize, Serialize};

use crate::grid::BuildingKind;
use crate::sim::SimClock;
use crate::weather::{PmLevel, Season, Weather};

/// Hours in which smart-grid consumers shave demand and batteries discharge.
pub const PEAK_HOURS: [u32; 7] = [9, 10, 11, 17, 18, 19, 20];

/// Demand multiplier applied to smart-grid consumers during peak hours.
pub const SMART_GRID_PEAK_FACTOR: f64 = 0.85;

pub fn is_peak_hour(hour: u32) -> bool {
    PEAK_HOURS.contains(&hour)
}

// ---------------------------------------------------------------------------
// Building profiles
// ---------------------------------------------------------------------------

/// Usage multipliers for one building type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingProfile {
    pub weekday_day: f64,
    pub weekday_night: f64,
    pub weekend_day: f64,
    pub weekend_night: f64,
    /// How strongly particulates drive extra load (filtration, ventilation).
    pub pm_sensitivity: f64,
}

impl BuildingKind {
    pub fn profile(self) -> BuildingProfile {
        let (weekday_day, weekday_night, weekend_day, weekend_night, pm_sensitivity) = match self {
            BuildingKind::Apartment => (1.0, 0.9, 1.0, 0.95, 0.8),
            BuildingKind::Office => (1.0, 0.3, 0.2, 0.1, 1.0),
            BuildingKind::School => (1.0, 0.1, 0.1, 0.05, 1.3),
            BuildingKind::Hospital => (1.0, 0.9, 1.0, 0.9, 1.5),
            BuildingKind::ShoppingMall => (0.8, 0.4, 1.2, 0.7, 1.0),
        };
        BuildingProfile {
            weekday_day,
            weekday_night,
            weekend_day,
            weekend_night,
            pm_sensitivity,
        }
    }
}

impl BuildingProfile {
    /// Night is before 06:00 or from 20:00; the weekend is Saturday and
    /// Sunday (`weekday` 5 and 6).
    pub fn usage_factor(&self, hour: u32, weekday: u32) -> f64 {
        let night = !(6..20).contains(&hour);
        let weekend = weekday >= 5;
        match (weekend, night) {
            (true, true) => self.weekend_night,
            (true, false) => self.weekend_day,
            (false, true) => self.weekday_night,
            (false, false) => self.weekday_day,
        }
    }
}

// ---------------------------------------------------------------------------
// Demand pattern
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub month: u32,
    pub day: u32,
}

/// Dominant heating technology; sets how hard cold weather drives electric
/// load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatingKind {
    #[default]
    Electric,
    Gas,
    District,
}

/// City-wide calendar demand multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandPattern {
    /// Indexed by hour of day.
    pub daily: Vec<f64>,
    /// Indexed by weekday, Monday first.
    pub weekly: Vec<f64>,
    /// Indexed by month, January first.
    pub seasonal: Vec<f64>,
    pub holidays: Vec<Holiday>,
    pub holiday_factor: f64,
    pub heating: HeatingKind,
}

impl Default for DemandPattern {
    fn default() -> Self {
        Self {
            daily: vec![
                0.6, 0.5, 0.5, 0.5, 0.6, 0.7, 0.8, 0.9, 0.9, 0.8, 0.8, 0.9, 1.0, 1.0, 0.9, 0.8,
                0.9, 1.0, 1.1, 1.1, 1.0, 0.9, 0.8, 0.7,
            ],
            weekly: vec![0.9, 1.0, 1.0, 1.0, 1.0, 1.1, 0.8],
            seasonal: vec![1.1, 1.0, 0.9, 0.9, 0.8, 0.9, 1.0, 1.1, 1.2, 1.1, 1.0, 1.1],
            holidays: vec![
                Holiday { month: 1, day: 1 },
                Holiday { month: 5, day: 5 },
                Holiday { month: 8, day: 15 },
                Holiday { month: 12, day: 25 },
            ],
            holiday_factor: 1.2,
            heating: HeatingKind::Electric,
        }
    }
}

/// Missing entries (short tables) count as 1.0.
fn lookup(table: &[f64], index: usize) -> f64 {
    table.get(index).copied().unwrap_or(1.0)
}

impl DemandPattern {
    /// A pattern that leaves demand untouched by the calendar.
    pub fn flat() -> Self {
        Self {
            daily: vec![1.0; 24],
            weekly: vec![1.0; 7],
            seasonal: vec![1.0; 12],
            holidays: Vec::new(),
            holiday_factor: 1.0,
            heating: HeatingKind::Electric,
        }
    }

    pub fn is_holiday(&self, month: u32, day: u32) -> bool {
        self.holidays
            .iter()
            .any(|h| h.month == month && h.day == day)
    }

    /// Product of the hourly, weekly, seasonal and holiday multipliers.
    pub fn calendar_factor(&self, clock: &SimClock) -> f64 {
        let holiday = if self.is_holiday(clock.month(), clock.day()) {
            self.holiday_factor
        } else {
            1.0
        };
        lookup(&self.daily, clock.hour() as usize)
            * lookup(&self.weekly, clock.weekday() as usize)
            * lookup(&self.seasonal, clock.month().saturating_sub(1) as usize)
            * holiday
    }

    /// Heating below 18 °C (per heating degree), cooling above 24 °C.
    pub fn temperature_factor(&self, temperature: f64) -> f64 {
        const COOLING_COP: f64 = 2.2;
        if temperature < 18.0 {
            let hdd = 18.0 - temperature;
            let per_degree = match self.heating {
                HeatingKind::Electric => 0.04,
                HeatingKind::Gas => 0.015,
                HeatingKind::District => 0.02,
            };
            1.0 + per_degree * hdd
        } else if temperature > 24.0 {
            1.0 + 0.05 * (temperature - 24.0) / COOLING_COP
        } else {
            1.0
        }
    }

    /// Full demand multiplier for a consumer of `building` type.
    pub fn demand_factor(&self, building: BuildingKind, clock: &SimClock, weather: &Weather) -> f64 {
        let profile = building.profile();
        self.calendar_factor(clock)
            * profile.usage_factor(clock.hour(), clock.weekday())
            * self.temperature_factor(weather.temperature)
            * humidity_factor(weather.humidity, clock.month())
            * pm_factor(weather.pm_level, profile.pm_sensitivity)
    }
}

/// Extra load from dehumidifying or humidifying away from the seasonal
/// comfort level.
pub fn humidity_factor(humidity: f64, month: u32) -> f64 {
    let optimal = match Season::from_month(month) {
        Season::Summer => 60.0,
        Season::Winter => 40.0,
        Season::Spring | Season::Autumn => 50.0,
    };
    1.0 + (humidity - optimal).abs() / 50.0 * 0.2
}

pub fn pm_factor(level: PmLevel, sensitivity: f64) -> f64 {
    1.0 + (level.demand_multiplier() - 1.0) * sensitivity
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn clock_at(y: i32, m: u32, d: u32, h: u32) -> SimClock {
        let time = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        SimClock::new(time)
    }

    #[test]
    fn flat_pattern_is_neutral() {
        let pattern = DemandPattern::flat();
        assert_eq!(pattern.calendar_factor(&clock_at(2025, 3, 12, 14)), 1.0);
    }

    #[test]
    fn default_calendar_factor() {
        let pattern = DemandPattern::default();
        // 2025-03-12 is a Wednesday; 14:00 -> 0.9, weekday 1.0, March 0.9.
        let f = pattern.calendar_factor(&clock_at(2025, 3, 12, 14));
        assert!((f - 0.81).abs() < 1e-9);
    }

    #[test]
    fn holidays_raise_demand() {
        let pattern = DemandPattern::default();
        let christmas = pattern.calendar_factor(&clock_at(2025, 12, 25, 12));
        let boxing_day = pattern.calendar_factor(&clock_at(2025, 12, 26, 12));
        // Thursday and Friday share the weekday factor of 1.0.
        assert!((christmas / boxing_day - 1.2).abs() < 1e-9);
    }

    #[test]
    fn office_is_quiet_at_weekend_nights() {
        let office = BuildingKind::Office.profile();
        assert_eq!(office.usage_factor(12, 2), 1.0);
        assert_eq!(office.usage_factor(22, 2), 0.3);
        assert_eq!(office.usage_factor(12, 6), 0.2);
        assert_eq!(office.usage_factor(3, 5), 0.1);
        assert_eq!(office.usage_factor(20, 0), 0.3);
        assert_eq!(office.usage_factor(6, 0), 1.0);
    }

    #[test]
    fn temperature_factor_by_heating() {
        let mut pattern = DemandPattern::default();
        assert!((pattern.temperature_factor(8.0) - 1.4).abs() < 1e-9);
        pattern.heating = HeatingKind::Gas;
        assert!((pattern.temperature_factor(8.0) - 1.15).abs() < 1e-9);
        assert_eq!(pattern.temperature_factor(21.0), 1.0);
        assert!((pattern.temperature_factor(35.0) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn humidity_and_particulates() {
        assert_eq!(humidity_factor(60.0, 7), 1.0);
        assert!((humidity_factor(90.0, 7) - 1.12).abs() < 1e-9);
        assert!((pm_factor(PmLevel::Hazardous, 1.5) - 1.6).abs() < 1e-9);
        assert_eq!(pm_factor(PmLevel::Good, 1.5), 1.0);
    }

    #[test]
    fn short_tables_count_as_one() {
        let pattern = DemandPattern {
            daily: vec![0.5],
            ..DemandPattern::flat()
        };
        assert_eq!(pattern.calendar_factor(&clock_at(2025, 3, 12, 0)), 0.5);
        assert_eq!(pattern.calendar_factor(&clock_at(2025, 3, 12, 5)), 1.0);
    }

    #[test]
    fn peak_hours() {
        assert!(is_peak_hour(9));
        assert!(is_peak_hour(20));
        assert!(!is_peak_hour(12));
    }
}
