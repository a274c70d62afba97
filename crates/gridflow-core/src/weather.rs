//! Weather inputs and the renewable output curves that consume them.
//!
//! Weather is supplied by the host each tick; nothing here evolves it.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    #[default]
    Clear,
    Cloudy,
    Rain,
    Snow,
}

impl WeatherCondition {
    /// Typical panel efficiency under this sky.
    pub fn solar_efficiency(self) -> f64 {
        match self {
            WeatherCondition::Clear => 1.0,
            WeatherCondition::Cloudy => 0.5,
            WeatherCondition::Rain => 0.2,
            WeatherCondition::Snow => 0.1,
        }
    }
}

/// Airborne particulate level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PmLevel {
    #[default]
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl PmLevel {
    /// Demand multiplier for a fully sensitive building (air purifiers,
    /// ventilation).
    pub fn demand_multiplier(self) -> f64 {
        match self {
            PmLevel::Good => 1.0,
            PmLevel::Moderate => 1.05,
            PmLevel::Unhealthy => 1.15,
            PmLevel::VeryUnhealthy => 1.25,
            PmLevel::Hazardous => 1.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Meteorological season for a month in `1..=12`.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}

/// Weather for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weather {
    pub condition: WeatherCondition,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Cloud cover in `[0, 1]`.
    pub cloud_cover: f64,
    /// Metres per second at hub height.
    pub wind_speed: f64,
    pub pm_level: PmLevel,
    pub solar_efficiency: f64,
}

impl Default for Weather {
    fn default() -> Self {
        Self::new(WeatherCondition::Clear)
    }
}

impl Weather {
    /// Mild weather under `condition`, with the matching panel efficiency.
    pub fn new(condition: WeatherCondition) -> Self {
        Self {
            condition,
            temperature: 20.0,
            humidity: 50.0,
            cloud_cover: 0.0,
            wind_speed: 5.0,
            pm_level: PmLevel::Good,
            solar_efficiency: condition.solar_efficiency(),
        }
    }
}

// ---------------------------------------------------------------------------
// Renewable output
// ---------------------------------------------------------------------------

pub const WIND_CUT_IN: f64 = 3.0;
pub const WIND_CUT_OUT: f64 = 25.0;
pub const WIND_RATED: f64 = 12.0;

/// Turbine output: zero outside the cut-in/cut-out band, cubic up to rated
/// speed, flat above it.
pub fn wind_output(capacity: f64, wind_speed: f64) -> f64 {
    if !(WIND_CUT_IN..=WIND_CUT_OUT).contains(&wind_speed) {
        return 0.0;
    }
    capacity * (wind_speed / WIND_RATED).powi(3).min(1.0)
}

/// Hydro output follows the reservoir: high in the summer monsoon, low in
/// the dry winter.
pub fn hydro_output(capacity: f64, month: u32) -> f64 {
    let level = match month {
        6..=8 => 1.2,
        12 | 1 | 2 => 0.7,
        _ => 1.0,
    };
    capacity * level
}

const SOLAR_HOURLY: [f64; 24] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.1, 0.3, 0.5, 0.7, 0.9, 1.0, 1.0, 1.0, 1.0, 0.9, 0.7, 0.5, 0.3,
    0.1, 0.0, 0.0, 0.0, 0.0, 0.0,
];

fn solar_season_factor(month: u32) -> f64 {
    match Season::from_month(month) {
        Season::Spring => 1.0,
        Season::Summer => 1.2,
        Season::Autumn => 0.8,
        Season::Winter => 0.6,
    }
}

/// Panel output for the given hour and month under `weather`.
pub fn solar_output(capacity: f64, hour: u32, month: u32, weather: &Weather) -> f64 {
    let daylight = SOLAR_HOURLY.get(hour as usize).copied().unwrap_or(0.0);
    if daylight <= 0.0 {
        return 0.0;
    }
    let cloud = weather.cloud_cover.clamp(0.0, 1.0);
    let cloud_effect = 1.0 - 0.75 * cloud.powf(1.5);
    let heat_derate = if weather.temperature > 25.0 {
        (1.0 - 0.005 * (weather.temperature - 25.0)).max(0.5)
    } else {
        1.0
    };
    capacity
        * daylight
        * solar_season_factor(month)
        * cloud_effect
        * heat_derate
        * weather.solar_efficiency.max(0.0)
}
