//! Location-specific interpretation of the global weather.

use serde::{Deserialize, Serialize};

use super::{round_to, WeatherSnapshot, WeatherType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Elevation {
    Low,
    #[default]
    Mid,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Drainage {
    Poor,
    #[default]
    Average,
    Good,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Enclosure {
    #[default]
    None,
    Partial,
    High,
}

/// Static physical description of a location, authored once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationWeatherMeta {
    pub elevation: Elevation,
    pub near_ocean: bool,
    pub coastal: bool,
    pub wind_exposure: Exposure,
    pub fog_prone: bool,
    pub drainage: Drainage,
    pub indoors: bool,
    pub enclosed: Enclosure,
}

impl LocationWeatherMeta {
    /// The combination that floods first: low, badly drained, by the sea.
    pub fn is_flood_prone(&self) -> bool {
        self.elevation == Elevation::Low && self.drainage == Drainage::Poor && self.near_ocean
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Clear,
    Reduced,
    Poor,
    VeryPoor,
}

impl Visibility {
    fn from_level(level: i32) -> Self {
        match level {
            i32::MIN..=0 => Visibility::Clear,
            1 => Visibility::Reduced,
            2 => Visibility::Poor,
            _ => Visibility::VeryPoor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Footing {
    Firm,
    Slippery,
    Dangerous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comfort {
    Cozy,
    Comfortable,
    Exposed,
    Miserable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalWeatherEffects {
    pub visibility: Visibility,
    pub footing: Footing,
    pub comfort: Comfort,
    /// Scales travel distance, in `[0.3, 1.0]`.
    pub travel_multiplier: f64,
    pub local_signals: Vec<String>,
}

impl LocalWeatherEffects {
    pub fn has_signal(&self, signal: &str) -> bool {
        self.local_signals.iter().any(|s| s == signal)
    }
}

pub const MIN_TRAVEL_MULTIPLIER: f64 = 0.3;
pub const MAX_TRAVEL_MULTIPLIER: f64 = 1.0;
/// Relative humidity at which any floor, even indoors, turns slick.
const SLICK_HUMIDITY: f64 = 0.9;

/// Combine the global snapshot with a location's physical metadata.
pub fn interpret_local_weather(snapshot: &WeatherSnapshot, meta: &LocationWeatherMeta) -> LocalWeatherEffects {
    let visibility = local_visibility(snapshot, meta);
    let footing = local_footing(snapshot, meta);
    let comfort = local_comfort(snapshot, meta);
    let travel_multiplier = travel_multiplier(snapshot, meta, footing);
    let local_signals = local_signals(snapshot, meta, visibility);

    LocalWeatherEffects {
        visibility,
        footing,
        comfort,
        travel_multiplier,
        local_signals,
    }
}

fn local_visibility(snapshot: &WeatherSnapshot, meta: &LocationWeatherMeta) -> Visibility {
    if meta.indoors {
        return Visibility::Clear;
    }
    let heavy = snapshot.intensity >= 3.0;
    let level = match snapshot.kind {
        WeatherType::Fog => {
            let mut level = 1 + i32::from(snapshot.intensity >= 2.0) + i32::from(meta.fog_prone);
            // Above the fog line.
            if meta.elevation == Elevation::High {
                level -= 1;
            }
            level
        }
        WeatherType::Storm => {
            let mut level = 2 + i32::from(snapshot.intensity >= 4.0);
            // Wind on an exposed height tears the murk apart.
            if meta.elevation == Elevation::High && meta.wind_exposure == Exposure::High {
                level -= 1;
            }
            level
        }
        WeatherType::Rain | WeatherType::Snow => i32::from(heavy),
        WeatherType::Clear => 0,
    };
    Visibility::from_level(level)
}

fn local_footing(snapshot: &WeatherSnapshot, meta: &LocationWeatherMeta) -> Footing {
    let kind = snapshot.kind;
    let heavy_wet = kind == WeatherType::Storm || (kind == WeatherType::Rain && snapshot.intensity >= 3.0);

    if !meta.indoors {
        if meta.drainage == Drainage::Poor && heavy_wet {
            return Footing::Dangerous;
        }
        let strong_storm = kind == WeatherType::Storm && snapshot.intensity >= 4.0;
        if meta.elevation == Elevation::High && meta.wind_exposure == Exposure::High && strong_storm {
            return Footing::Dangerous;
        }
        if kind.is_precipitation() && snapshot.intensity >= 1.5 {
            return Footing::Slippery;
        }
    }
    if snapshot.humidity >= SLICK_HUMIDITY {
        return Footing::Slippery;
    }
    Footing::Firm
}

fn local_comfort(snapshot: &WeatherSnapshot, meta: &LocationWeatherMeta) -> Comfort {
    if meta.indoors && meta.enclosed == Enclosure::High {
        return Comfort::Cozy;
    }
    let exposure = meta.wind_exposure;
    let gale = snapshot.kind == WeatherType::Storm || snapshot.wind_kph >= 40.0;
    let gale_exposed = exposure == Exposure::High && gale;
    let cold_exposed = snapshot.temperature_c < 5.0 && exposure != Exposure::Low;
    if gale_exposed || cold_exposed {
        return Comfort::Miserable;
    }
    if meta.indoors {
        return Comfort::Comfortable;
    }
    if snapshot.kind.is_precipitation()
        || snapshot.wind_kph >= 25.0
        || snapshot.temperature_c < 10.0
        || exposure == Exposure::High
    {
        return Comfort::Exposed;
    }
    Comfort::Comfortable
}

fn travel_multiplier(snapshot: &WeatherSnapshot, meta: &LocationWeatherMeta, footing: Footing) -> f64 {
    let heavy = snapshot.intensity >= 3.0;
    let mut multiplier: f64 = match snapshot.kind {
        WeatherType::Clear => 1.0,
        WeatherType::Fog => 0.85,
        WeatherType::Rain if heavy => 0.7,
        WeatherType::Rain => 0.85,
        WeatherType::Storm => 0.6,
        WeatherType::Snow if heavy => 0.5,
        WeatherType::Snow => 0.7,
    };
    if meta.drainage == Drainage::Poor && matches!(snapshot.kind, WeatherType::Rain | WeatherType::Storm) {
        multiplier *= 0.85;
    }
    if meta.wind_exposure == Exposure::High && snapshot.wind_kph >= 30.0 {
        multiplier *= 0.85;
    }
    multiplier *= match footing {
        Footing::Dangerous => 0.6,
        Footing::Slippery => 0.8,
        Footing::Firm => 1.0,
    };
    round_to(multiplier.clamp(MIN_TRAVEL_MULTIPLIER, MAX_TRAVEL_MULTIPLIER), 3)
}

fn local_signals(snapshot: &WeatherSnapshot, meta: &LocationWeatherMeta, visibility: Visibility) -> Vec<String> {
    let kind = snapshot.kind;
    let wind = snapshot.wind_kph;
    let outdoors = !meta.indoors;
    let mut signals = Vec::new();

    let gale = kind == WeatherType::Storm || wind >= 40.0;
    if outdoors && meta.elevation == Elevation::High && meta.wind_exposure == Exposure::High && gale {
        signals.push("cliff_risk:high");
    }

    let heavy_wet = kind == WeatherType::Storm || (kind == WeatherType::Rain && snapshot.intensity >= 3.0);
    if meta.is_flood_prone() && kind == WeatherType::Storm && snapshot.intensity >= 4.0 {
        signals.push("flood_risk:extreme");
        signals.push("access:unsafe");
    } else if meta.drainage == Drainage::Poor && meta.elevation != Elevation::High && heavy_wet {
        signals.push("flood_risk:high");
    }

    let exposed = meta.wind_exposure == Exposure::High || (meta.coastal && meta.wind_exposure != Exposure::Low);
    if outdoors && exposed && wind >= 60.0 {
        signals.push("wind_risk:extreme");
    } else if outdoors && exposed && wind >= 40.0 {
        signals.push("wind_risk:high");
    }

    if kind == WeatherType::Fog && visibility >= Visibility::Poor {
        signals.push("fog:dense");
    }
    if visibility == Visibility::VeryPoor {
        signals.push("visibility:very_low");
    }

    signals.into_iter().map(String::from).collect()
}
