use serde::{Deserialize, Serialize};

use world_rules::{LocalWeatherEffects, Position, RichTime, TideState, WeatherSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: String,
    pub location: String,
    pub pos: Position,
    pub inventory: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub id: String,
    pub name: String,
    pub terrain: String,
    /// Exit direction -> destination id.
    pub exits: Vec<(String, String)>,
}

/// A location within the nearby radius of the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyLocation {
    pub id: String,
    pub name: String,
    pub distance_m: f64,
    /// Eight-point compass bearing from the player.
    pub bearing: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TideReport {
    #[serde(flatten)]
    pub state: TideState,
    pub blocked_locations: Vec<String>,
}

/// Everything the narrative layer may know about the world this turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnTelemetry {
    pub turn: u64,
    pub player: PlayerSummary,
    pub location: Option<LocationSummary>,
    pub nearby_locations: Vec<NearbyLocation>,
    pub time: RichTime,
    pub tide: Option<TideReport>,
    pub weather: Option<WeatherSnapshot>,
    pub local_weather: Option<LocalWeatherEffects>,
    pub ledger_tail: Vec<String>,
}

impl TurnTelemetry {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Whether the tide currently cuts off `location`.
    pub fn is_tide_blocked(&self, location: &str) -> bool {
        self.tide
            .as_ref()
            .is_some_and(|t| t.blocked_locations.iter().any(|id| id == location))
    }
}
