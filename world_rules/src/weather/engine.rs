//! The ordered weather pipeline.
//!
//! Pressure system -> hPa -> trend -> type -> wind -> intensity ->
//! temperature -> humidity -> storm cycle -> signals. Each step is public and
//! draws from its own keyed generator, so any step can be checked in
//! isolation against a literal seed and timestamp.

use chrono::{DateTime, Timelike, Utc};
use tracing::debug;

use super::{
    round_to, ClimateZone, Pressure, PressureSystem, SeededRng, StormCycle, StormPhase, Trend, WeatherSnapshot,
    WeatherType,
};
use crate::error::{Result, WorldError};
use crate::time::{format_timestamp, parse_timestamp, Season, TimeOfDay};

const MINUTES_PER_DAY: f64 = 1440.0;
/// Above this base temperature snow falls as rain.
const SNOW_MAX_BASE_C: f64 = 3.0;
const INERTIA_BONUS: f64 = 0.3;
const STORM_BOOST: f64 = 0.25;

/// Inputs to one weather computation.
#[derive(Debug, Clone, Copy)]
pub struct WeatherRequest<'a> {
    pub at: DateTime<Utc>,
    pub seed: &'a str,
    pub climate: ClimateZone,
    pub previous: Option<&'a WeatherSnapshot>,
    pub turn: u64,
}

impl<'a> WeatherRequest<'a> {
    pub fn new(at: DateTime<Utc>, seed: &'a str) -> Self {
        Self {
            at,
            seed,
            climate: ClimateZone::default(),
            previous: None,
            turn: 0,
        }
    }

    pub fn with_climate(mut self, climate: ClimateZone) -> Self {
        self.climate = climate;
        self
    }

    pub fn with_previous(mut self, previous: Option<&'a WeatherSnapshot>) -> Self {
        self.previous = previous;
        self
    }

    pub fn at_turn(mut self, turn: u64) -> Self {
        self.turn = turn;
        self
    }

    pub fn season(&self) -> Season {
        Season::of(self.at)
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_hour(self.at.hour())
    }

    fn rng(&self, decision: &str) -> SeededRng {
        SeededRng::for_decision(self.seed, decision, self.at)
    }
}

/// The pressure system selected by the first step, before hPa and trend.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemState {
    pub system: PressureSystem,
    pub intensity: f64,
    pub formed_at: DateTime<Utc>,
    pub lifespan_days: f64,
    pub age_days: f64,
    pub center_bearing_deg: f64,
    /// Carried over from the previous snapshot rather than newly drawn.
    pub persisted: bool,
}

/// Season-biased odds for a new pressure system. Cold seasons favour lows.
pub fn season_system_weights(season: Season, climate: ClimateZone) -> [(PressureSystem, f64); 4] {
    let (high, low, front, stable) = match season {
        Season::Winter => (0.20, 0.40, 0.25, 0.15),
        Season::Spring => (0.25, 0.30, 0.30, 0.15),
        Season::Summer => (0.40, 0.20, 0.15, 0.25),
        Season::Autumn => (0.25, 0.35, 0.25, 0.15),
    };
    let (high, low) = match climate {
        ClimateZone::Arid => (high * 1.5, low * 0.6),
        ClimateZone::Maritime => (high, low * 1.2),
        _ => (high, low),
    };
    [
        (PressureSystem::High, high),
        (PressureSystem::Low, low),
        (PressureSystem::Front, front),
        (PressureSystem::Stable, stable),
    ]
}

/// Step 1: keep the previous system while it is younger than its lifespan,
/// otherwise draw a new one.
pub fn pressure_continuity(req: &WeatherRequest<'_>) -> SystemState {
    if let Some(prev) = req.previous {
        if let Some(formed_at) = parse_timestamp(&prev.pressure.formed_at) {
            let age_days = (req.at - formed_at).num_minutes() as f64 / MINUTES_PER_DAY;
            if (0.0..prev.pressure.lifespan_days).contains(&age_days) {
                let drift = req.rng("pressure-drift").jitter(0.05);
                return SystemState {
                    system: prev.pressure.system,
                    intensity: round_to((prev.pressure.intensity + drift).clamp(0.0, 1.0), 3),
                    formed_at,
                    lifespan_days: prev.pressure.lifespan_days,
                    age_days,
                    center_bearing_deg: prev.pressure.center_bearing_deg,
                    persisted: true,
                };
            }
        }
    }

    let mut rng = req.rng("pressure-state");
    let weights = season_system_weights(req.season(), req.climate);
    let system = rng.pick(&weights).unwrap_or(PressureSystem::Stable);
    SystemState {
        system,
        intensity: round_to(rng.range(0.2, 1.0), 3),
        formed_at: req.at,
        lifespan_days: round_to(rng.range(3.0, 7.0), 2),
        age_days: 0.0,
        center_bearing_deg: round_to(rng.range(0.0, 360.0), 1),
        persisted: false,
    }
}

/// Step 2: sea-level pressure within the system's range. Stronger highs are
/// higher, stronger lows and fronts deeper.
pub fn pressure_hpa(req: &WeatherRequest<'_>, state: &SystemState) -> f64 {
    let (low, high) = match state.system {
        PressureSystem::High => (1020.0, 1040.0),
        PressureSystem::Low => (980.0, 1005.0),
        PressureSystem::Front => (995.0, 1012.0),
        PressureSystem::Stable => (1008.0, 1020.0),
    };
    let position = 0.6 * state.intensity + 0.4 * req.rng("pressure-hpa").next_f64();
    let hpa = match state.system {
        PressureSystem::High | PressureSystem::Stable => low + (high - low) * position,
        PressureSystem::Low | PressureSystem::Front => high - (high - low) * position,
    };
    round_to(hpa, 1)
}

/// Step 3: pressure tendency against the previous snapshot.
pub fn pressure_trend(req: &WeatherRequest<'_>, state: &SystemState, hpa: f64) -> Trend {
    let Some(prev) = req.previous else {
        return Trend::Stable;
    };
    if !state.persisted && prev.pressure.system != state.system {
        match state.system {
            PressureSystem::Low => return Trend::Falling,
            PressureSystem::High => return Trend::Rising,
            _ => {}
        }
    }
    let delta = hpa - prev.pressure.hpa;
    if delta > 0.5 {
        Trend::Rising
    } else if delta < -0.5 {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Typical air temperature before weather adjustments.
pub fn base_temperature(climate: ClimateZone, season: Season, time_of_day: TimeOfDay) -> f64 {
    // Winter, spring, summer, autumn day means.
    let means: [f64; 4] = match climate {
        ClimateZone::Temperate => [3.0, 11.0, 20.0, 12.0],
        ClimateZone::Maritime => [6.0, 10.0, 16.0, 12.0],
        ClimateZone::Continental => [-6.0, 9.0, 23.0, 8.0],
        ClimateZone::Tropical => [25.0, 27.0, 28.0, 26.0],
        ClimateZone::Arid => [14.0, 24.0, 34.0, 24.0],
        ClimateZone::Polar => [-25.0, -12.0, 2.0, -10.0],
    };
    let mean = match season {
        Season::Winter => means[0],
        Season::Spring => means[1],
        Season::Summer => means[2],
        Season::Autumn => means[3],
    };
    let diurnal = match time_of_day {
        TimeOfDay::Morning => -2.0,
        TimeOfDay::Afternoon => 3.0,
        TimeOfDay::Evening => 0.0,
        TimeOfDay::Night => -4.0,
    };
    mean + diurnal
}

fn system_base_humidity(system: PressureSystem) -> f64 {
    match system {
        PressureSystem::High => 0.60,
        PressureSystem::Low => 0.85,
        PressureSystem::Front => 0.80,
        PressureSystem::Stable => 0.78,
    }
}

/// Base odds of each weather type under a pressure system.
pub fn type_weights(system: PressureSystem) -> Vec<(WeatherType, f64)> {
    let (clear, rain, storm, fog, snow) = match system {
        PressureSystem::High => (0.70, 0.10, 0.00, 0.15, 0.05),
        PressureSystem::Low => (0.10, 0.45, 0.20, 0.10, 0.15),
        PressureSystem::Front => (0.15, 0.40, 0.25, 0.10, 0.10),
        PressureSystem::Stable => (0.45, 0.15, 0.02, 0.30, 0.08),
    };
    vec![
        (WeatherType::Clear, clear),
        (WeatherType::Rain, rain),
        (WeatherType::Storm, storm),
        (WeatherType::Fog, fog),
        (WeatherType::Snow, snow),
    ]
}

/// Step 4: weighted draw of the weather type with the storm boost, inertia
/// toward the previous type and the dawn/dusk fog override.
pub fn select_weather_type(req: &WeatherRequest<'_>, state: &SystemState) -> WeatherType {
    let mut weights = type_weights(state.system);
    let bump = |weights: &mut Vec<(WeatherType, f64)>, kind: WeatherType, by: f64| {
        if let Some(entry) = weights.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 += by;
        }
    };

    if let Some(prev) = req.previous {
        bump(&mut weights, prev.kind, INERTIA_BONUS);
    }
    if state.system == PressureSystem::Low && state.intensity > 0.7 {
        bump(&mut weights, WeatherType::Storm, STORM_BOOST);
    }
    let base_temp = base_temperature(req.climate, req.season(), req.time_of_day());
    if base_temp > SNOW_MAX_BASE_C {
        let snow = weights
            .iter_mut()
            .find(|(k, _)| *k == WeatherType::Snow)
            .map(|entry| std::mem::replace(&mut entry.1, 0.0))
            .unwrap_or(0.0);
        bump(&mut weights, WeatherType::Rain, snow);
    }

    let kind = req
        .rng("weather-type")
        .pick(&weights)
        .unwrap_or(WeatherType::Clear);

    let hour = req.at.hour();
    let dawn_or_dusk = (5..=8).contains(&hour) || (17..=20).contains(&hour);
    let calm = matches!(state.system, PressureSystem::High | PressureSystem::Stable);
    if kind == WeatherType::Clear && calm && dawn_or_dusk {
        let dew_point_spread = (1.0 - surface_humidity(req, state)) * 100.0 / 5.0;
        if dew_point_spread < 2.0 {
            return WeatherType::Fog;
        }
    }
    kind
}

/// Relative humidity near the ground. Still air cools toward its dew point
/// overnight, so the boost peaks at dawn.
fn surface_humidity(req: &WeatherRequest<'_>, state: &SystemState) -> f64 {
    let cooling = match req.at.hour() {
        5..=8 => 0.20,
        17..=20 => 0.10,
        _ => 0.0,
    };
    let jitter = req.rng("fog-humidity").jitter(0.15);
    (system_base_humidity(state.system) + cooling + jitter).clamp(0.0, 1.0)
}

/// Step 5: wind speed (kph) and direction (degrees, blowing from).
pub fn wind(req: &WeatherRequest<'_>, kind: WeatherType, state: &SystemState) -> (f64, f64) {
    let (low, high) = match kind {
        WeatherType::Clear => (0.0, 15.0),
        WeatherType::Fog => (0.0, 8.0),
        WeatherType::Rain => (10.0, 30.0),
        WeatherType::Snow => (5.0, 25.0),
        WeatherType::Storm => (40.0, 80.0),
    };
    let gradient = match state.system {
        PressureSystem::High => 0.8,
        PressureSystem::Low => 1.0 + 0.4 * state.intensity,
        PressureSystem::Front => 1.2,
        PressureSystem::Stable => 0.6,
    };
    let mut rng = req.rng("wind");
    let speed = round_to(rng.range(low, high) * gradient, 1);

    let direction = match state.system {
        // Clockwise outflow around a high, inflow around a low.
        PressureSystem::High => state.center_bearing_deg + 30.0 + rng.jitter(15.0),
        PressureSystem::Low => state.center_bearing_deg + 150.0 + rng.jitter(15.0),
        PressureSystem::Front => state.center_bearing_deg + 90.0 + rng.jitter(15.0),
        // Prevailing westerlies.
        PressureSystem::Stable => 270.0 + rng.jitter(30.0),
    };
    (speed, round_to(direction, 1).rem_euclid(360.0))
}

pub fn baseline_intensity(kind: WeatherType) -> f64 {
    match kind {
        WeatherType::Storm => 3.0,
        WeatherType::Rain | WeatherType::Snow => 2.0,
        WeatherType::Fog => 1.5,
        WeatherType::Clear => 1.0,
    }
}

/// Step 6: intensity in `[0, 5]`, moving at most one point per elapsed hour
/// from the previous snapshot.
pub fn weather_intensity(req: &WeatherRequest<'_>, kind: WeatherType) -> f64 {
    let baseline = baseline_intensity(kind);
    let mut rng = req.rng("intensity");
    match req.previous {
        Some(prev) => {
            let previous = if prev.intensity.is_finite() {
                prev.intensity.clamp(0.0, 5.0)
            } else {
                baseline
            };
            let hours = parse_timestamp(&prev.computed_at)
                .map(|t| (req.at - t).num_minutes().abs() as f64 / 60.0)
                .unwrap_or(1.0)
                .max(1.0);
            let target = round_to((previous + baseline) / 2.0 + rng.jitter(0.25), 1);
            target.clamp(previous - hours, previous + hours).clamp(0.0, 5.0)
        }
        None => round_to((baseline + rng.jitter(1.0)).clamp(0.0, 5.0), 1),
    }
}

pub fn type_temperature_delta(kind: WeatherType) -> f64 {
    match kind {
        WeatherType::Clear => 0.0,
        WeatherType::Fog => -2.0,
        WeatherType::Rain => -3.0,
        WeatherType::Storm => -6.0,
        WeatherType::Snow => -12.0,
    }
}

/// Step 7: air temperature, Celsius.
pub fn temperature(req: &WeatherRequest<'_>, kind: WeatherType) -> f64 {
    let base = base_temperature(req.climate, req.season(), req.time_of_day());
    let noise = req.rng("temperature").jitter(1.5);
    round_to(base + type_temperature_delta(kind) + noise, 1)
}

/// Step 8: relative humidity.
pub fn humidity(req: &WeatherRequest<'_>, kind: WeatherType, system: PressureSystem) -> f64 {
    let adjustment = match kind {
        WeatherType::Rain => 0.15,
        WeatherType::Storm => 0.20,
        WeatherType::Fog => 0.20,
        WeatherType::Snow => 0.10,
        WeatherType::Clear => -0.05,
    };
    let noise = req.rng("humidity").jitter(0.05);
    round_to((system_base_humidity(system) + adjustment + noise).clamp(0.0, 1.0), 2)
}

/// Step 9: storm cycle display, derived from the system's age.
pub fn storm_cycle(kind: WeatherType, intensity: f64, state: &SystemState) -> StormCycle {
    let storm_intensity = match kind {
        WeatherType::Storm => intensity / 5.0,
        WeatherType::Rain => intensity / 10.0,
        _ => 0.0,
    };
    let storm_intensity = round_to(storm_intensity.clamp(0.0, 1.0), 3);
    let lifespan = state.lifespan_days.max(1.0);
    let age_fraction = (state.age_days / lifespan).clamp(0.0, 1.0);

    let phase = if storm_intensity <= 0.0 {
        StormPhase::CalmBetween
    } else if age_fraction < 0.35 {
        StormPhase::Building
    } else if age_fraction < 0.65 {
        StormPhase::Peak
    } else {
        StormPhase::Decaying
    };
    StormCycle {
        day_of_cycle: state.age_days.max(0.0).floor() as u32 + 1,
        cycle_length_days: lifespan.ceil() as u32,
        phase,
        intensity: storm_intensity,
    }
}

/// Step 10: tags derived from the computed fields, in a fixed order.
pub fn weather_signals(snapshot: &WeatherSnapshot) -> Vec<String> {
    let mut signals = Vec::new();
    let kind = snapshot.kind;

    if kind == WeatherType::Storm || snapshot.storm_cycle.intensity >= 0.6 {
        signals.push("storm_risk:high");
    } else if snapshot.storm_cycle.intensity > 0.0 && snapshot.pressure.trend == Trend::Falling {
        signals.push("storm_risk:moderate");
    }

    if snapshot.wind_kph >= 40.0 {
        signals.push("wind:high");
    } else if snapshot.wind_kph >= 25.0 {
        signals.push("wind:moderate");
    }

    if kind.is_precipitation() && snapshot.intensity >= 2.0 {
        signals.push("terrain:slippery");
    }

    if snapshot.temperature_c <= -5.0 {
        signals.push("cold:harsh");
    } else if snapshot.temperature_c < 5.0 {
        signals.push("cold:chilly");
    }
    if snapshot.temperature_c >= 30.0 {
        signals.push("heat:high");
    }

    let obscured = matches!(kind, WeatherType::Snow | WeatherType::Storm) && snapshot.intensity >= 3.0;
    if kind == WeatherType::Fog || obscured {
        signals.push("visibility:low");
    }
    if snapshot.pressure.trend == Trend::Falling {
        signals.push("pressure:falling");
    }

    signals.into_iter().map(String::from).collect()
}

/// Run the full pipeline.
pub fn compute_weather(req: &WeatherRequest<'_>) -> WeatherSnapshot {
    let state = pressure_continuity(req);
    let hpa = pressure_hpa(req, &state);
    let trend = pressure_trend(req, &state, hpa);
    let kind = select_weather_type(req, &state);
    let (wind_kph, wind_direction_deg) = wind(req, kind, &state);
    let intensity = weather_intensity(req, kind);
    let temperature_c = temperature(req, kind);
    let humidity = humidity(req, kind, state.system);
    let storm_cycle = storm_cycle(kind, intensity, &state);

    let mut snapshot = WeatherSnapshot {
        kind,
        intensity,
        temperature_c,
        wind_kph,
        wind_direction_deg,
        humidity,
        pressure: Pressure {
            system: state.system,
            hpa,
            trend,
            intensity: state.intensity,
            formed_at: format_timestamp(state.formed_at),
            lifespan_days: state.lifespan_days,
            age_days: round_to(state.age_days, 3),
            center_bearing_deg: state.center_bearing_deg,
        },
        storm_cycle,
        signals: Vec::new(),
        computed_at: format_timestamp(req.at),
        turn: req.turn,
    };
    snapshot.signals = weather_signals(&snapshot);

    debug!(
        at = %snapshot.computed_at,
        kind = snapshot.kind.as_str(),
        intensity = snapshot.intensity,
        persisted = state.persisted,
        "weather computed"
    );
    snapshot
}

/// [`compute_weather`] for an RFC 3339 timestamp.
pub fn compute_weather_at(
    iso: &str,
    seed: &str,
    climate: ClimateZone,
    previous: Option<&WeatherSnapshot>,
    turn: u64,
) -> Result<WeatherSnapshot> {
    let at = parse_timestamp(iso).ok_or_else(|| WorldError::InvalidTimestamp(iso.to_string()))?;
    let req = WeatherRequest::new(at, seed)
        .with_climate(climate)
        .with_previous(previous)
        .at_turn(turn);
    Ok(compute_weather(&req))
}
