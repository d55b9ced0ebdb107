//! The world record - the flat, serialisable snapshot every turn is applied to.
//!
//! The record is authoritative for persistence. The world graph, time, tide
//! and weather snapshots are all derived from it.

mod geometry;

pub use geometry::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::time::TimeState;
use crate::weather::{ClimateZone, LocationWeatherMeta, WeatherSnapshot};

/// Open side map for keys the typed record does not model.
pub type Extra = serde_json::Map<String, Value>;

/// How the tide gates access to a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TideAccess {
    #[default]
    Always,
    /// Reachable only while the tide is low.
    LowTideOnly,
    /// Cut off while the tide is high.
    BlockedAtHigh,
}

/// Player position, location and inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    #[serde(default = "default_player_id")]
    pub id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub pos: Position,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

fn default_player_id() -> String {
    "player".to_string()
}

/// An authored location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Position>,
    #[serde(default)]
    pub terrain: String,
    #[serde(default)]
    pub tide_access: TideAccess,
    /// Direction name -> destination location id.
    #[serde(default)]
    pub exits: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<LocationWeatherMeta>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A non-player actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NpcRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TideConfig {
    #[serde(default = "default_tide_enabled")]
    pub enabled: bool,
    #[serde(default = "default_tide_cycle")]
    pub cycle_minutes: u32,
}

fn default_tide_enabled() -> bool {
    true
}

fn default_tide_cycle() -> u32 {
    crate::tide::DEFAULT_CYCLE_MINUTES
}

impl Default for TideConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cycle_minutes: crate::tide::DEFAULT_CYCLE_MINUTES,
        }
    }
}

/// Weather configuration plus the one-turn snapshot cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSystem {
    /// Falls back to `meta.seed` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(default)]
    pub climate: ClimateZone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<WeatherSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Systems {
    #[serde(default)]
    pub time: TimeState,
    #[serde(default)]
    pub tide: TideConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSystem>,
    #[serde(default)]
    pub economy: Extra,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub turn: u64,
    #[serde(default)]
    pub seed: String,
    /// RFC 3339 timestamp of the session start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The complete, persistable state of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorldRecord {
    #[serde(default)]
    pub player: PlayerState,
    #[serde(default)]
    pub locations: BTreeMap<String, LocationRecord>,
    #[serde(default)]
    pub npcs: BTreeMap<String, NpcRecord>,
    #[serde(default)]
    pub ledger: Vec<String>,
    #[serde(default)]
    pub systems: Systems,
    #[serde(default)]
    pub meta: Meta,
    #[serde(flatten)]
    pub extra: Extra,
}

impl WorldRecord {
    /// Create a new empty record with the given seed.
    pub fn new(seed: impl Into<String>) -> Self {
        let mut record = Self::default();
        record.player.id = default_player_id();
        record.meta.seed = seed.into();
        record
    }

    pub fn turn(&self) -> u64 {
        self.meta.turn
    }

    pub fn elapsed_minutes(&self) -> i64 {
        self.systems.time.elapsed_minutes
    }

    /// Seed for weather derivation, falling back to the session seed.
    pub fn weather_seed(&self) -> Option<&str> {
        let weather = self.systems.weather.as_ref()?;
        Some(weather.seed.as_deref().unwrap_or(&self.meta.seed))
    }

    pub fn location(&self, id: &str) -> Option<&LocationRecord> {
        self.locations.get(id)
    }

    pub fn current_location(&self) -> Option<&LocationRecord> {
        self.location(&self.player.location)
    }

    /// Add a location to the record.
    pub fn add_location(&mut self, id: impl Into<String>, location: LocationRecord) {
        self.locations.insert(id.into(), location);
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_keeps_unknown_keys() {
        let value = json!({
            "player": { "id": "p1", "location": "dock", "pos": { "x": 1.0, "y": 2.0 }, "mood": "wary" },
            "locations": { "dock": { "name": "Dock", "terrain": "wharf", "smell": "brine" } },
            "ledger": [],
            "systems": { "time": { "elapsedMinutes": 30 }, "economy": { "coins": 4 } },
            "meta": { "turn": 2, "seed": "s" },
            "quests": ["find the map"]
        });

        let record = WorldRecord::from_value(value.clone()).unwrap();
        assert_eq!(record.player.extra.get("mood"), Some(&json!("wary")));
        assert_eq!(record.locations["dock"].extra.get("smell"), Some(&json!("brine")));
        assert_eq!(record.extra.get("quests"), Some(&json!(["find the map"])));
        assert_eq!(record.elapsed_minutes(), 30);

        let again = WorldRecord::from_value(record.to_value().unwrap()).unwrap();
        assert_eq!(again, record);
    }

    #[test]
    fn test_weather_seed_fallback() {
        let mut record = WorldRecord::new("session-seed");
        assert_eq!(record.weather_seed(), None);

        record.systems.weather = Some(WeatherSystem::default());
        assert_eq!(record.weather_seed(), Some("session-seed"));

        record.systems.weather.as_mut().unwrap().seed = Some("storm-seed".into());
        assert_eq!(record.weather_seed(), Some("storm-seed"));
    }

    #[test]
    fn test_tide_access_serde() {
        let location: LocationRecord =
            serde_json::from_value(json!({ "name": "Causeway", "tideAccess": "low_tide_only" }))
                .unwrap();
        assert_eq!(location.tide_access, TideAccess::LowTideOnly);
    }
}
