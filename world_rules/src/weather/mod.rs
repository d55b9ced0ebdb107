//! Seeded pressure-system weather and its local interpretation.
//!
//! Every value here is a pure function of `(timestamp, seed, climate,
//! previous snapshot)`. Randomness comes from [`SeededRng`], keyed per
//! sub-decision so that each step can be reproduced on its own.

mod engine;
mod local;
mod rng;

pub use engine::*;
pub use local::*;
pub use rng::SeededRng;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClimateZone {
    #[default]
    Temperate,
    Maritime,
    Continental,
    Tropical,
    Arid,
    Polar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherType {
    Clear,
    Rain,
    Storm,
    Fog,
    Snow,
}

impl WeatherType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherType::Clear => "clear",
            WeatherType::Rain => "rain",
            WeatherType::Storm => "storm",
            WeatherType::Fog => "fog",
            WeatherType::Snow => "snow",
        }
    }

    pub fn is_precipitation(&self) -> bool {
        matches!(self, WeatherType::Rain | WeatherType::Storm | WeatherType::Snow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureSystem {
    High,
    Low,
    Front,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

/// The pressure system driving the weather.
///
/// `formed_at`, `lifespan_days` and `age_days` carry the system's persistence
/// between snapshots. They are independent of the storm cycle display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pressure {
    pub system: PressureSystem,
    #[serde(rename = "hPa")]
    pub hpa: f64,
    pub trend: Trend,
    /// Strength of the system in `[0, 1]`.
    pub intensity: f64,
    pub formed_at: String,
    pub lifespan_days: f64,
    pub age_days: f64,
    /// Bearing from the observer to the system centre, degrees.
    pub center_bearing_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StormPhase {
    Building,
    Peak,
    Decaying,
    CalmBetween,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StormCycle {
    pub day_of_cycle: u32,
    pub cycle_length_days: u32,
    pub phase: StormPhase,
    /// In `[0, 1]`; zero outside rain and storms.
    pub intensity: f64,
}

/// Global weather for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    #[serde(rename = "type")]
    pub kind: WeatherType,
    /// In `[0, 5]`.
    pub intensity: f64,
    #[serde(rename = "temperatureC")]
    pub temperature_c: f64,
    pub wind_kph: f64,
    pub wind_direction_deg: f64,
    /// Relative humidity in `[0, 1]`.
    pub humidity: f64,
    pub pressure: Pressure,
    pub storm_cycle: StormCycle,
    pub signals: Vec<String>,
    pub computed_at: String,
    pub turn: u64,
}

impl WeatherSnapshot {
    pub fn has_signal(&self, signal: &str) -> bool {
        self.signals.iter().any(|s| s == signal)
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
