//! Turn telemetry - the read-only bundle handed to the narrative layer.
//!
//! Assembly runs in a fixed order:
//! 1. **Time**: anchor the clock if needed and derive the rich time
//! 2. **Tide**: phase, level and the locations it cuts off
//! 3. **Weather**: reuse the cached snapshot or recompute from the previous one
//! 4. **Local**: interpret the weather for the player's location
//! 5. **Place**: current location and everything within the nearby radius

mod report;

pub use report::*;

use chrono::{DateTime, Utc};
use tracing::debug;

use world_rules::time::format_timestamp;
use world_rules::{
    calculate_tide_state, compute_weather, derive_absolute_time, ensure_time_anchor, interpret_local_weather,
    tide_blocked_locations, RichTime, WeatherRequest, WeatherSnapshot, WorldConfig, WorldRecord,
};

/// Builds [`TurnTelemetry`] from a record under one configuration.
pub struct TelemetryAssembler<'a> {
    config: &'a WorldConfig,
}

impl<'a> TelemetryAssembler<'a> {
    pub fn new(config: &'a WorldConfig) -> Self {
        Self { config }
    }

    /// Assemble using the wall clock as the last-resort time anchor.
    pub fn assemble(&self, record: &WorldRecord) -> TurnTelemetry {
        self.assemble_at(record, Utc::now())
    }

    /// Assemble with an explicit fallback clock. `now` is consulted only when
    /// the record has neither a time anchor nor a session start.
    pub fn assemble_at(&self, record: &WorldRecord, now: DateTime<Utc>) -> TurnTelemetry {
        let time = self.derive_time(record, now);

        let tide = record.systems.tide.enabled.then(|| {
            let state = calculate_tide_state(time.elapsed_minutes, record.systems.tide.cycle_minutes);
            TideReport {
                state,
                blocked_locations: tide_blocked_locations(record, &state).into_iter().collect(),
            }
        });

        let weather = self.derive_weather(record, &time);
        let local_weather = weather.as_ref().map(|snapshot| {
            let meta = self
                .config
                .location_meta(record, &record.player.location)
                .unwrap_or_default();
            interpret_local_weather(snapshot, &meta)
        });

        let tail = self.config.telemetry.ledger_tail;
        let ledger_tail = record.ledger[record.ledger.len().saturating_sub(tail)..].to_vec();

        TurnTelemetry {
            turn: record.turn(),
            player: PlayerSummary {
                id: record.player.id.clone(),
                location: record.player.location.clone(),
                pos: record.player.pos,
                inventory: record.player.inventory.clone(),
            },
            location: self.current_location(record),
            nearby_locations: self.nearby_locations(record),
            time,
            tide,
            weather,
            local_weather,
            ledger_tail,
        }
    }

    fn derive_time(&self, record: &WorldRecord, now: DateTime<Utc>) -> RichTime {
        let anchored = ensure_time_anchor(&record.systems.time, &record.meta, now);
        derive_absolute_time(&anchored, record.turn())
    }

    /// Cached weather when it matches this turn and time, else a fresh snapshot
    /// computed with the cache as the previous state. `None` without a weather
    /// system.
    fn derive_weather(&self, record: &WorldRecord, time: &RichTime) -> Option<WeatherSnapshot> {
        let system = record.systems.weather.as_ref()?;
        let seed = record.weather_seed()?;
        let at = time.timestamp()?;

        if let Some(cache) = &system.cache {
            if cache.turn == record.turn() && cache.computed_at == format_timestamp(at) {
                debug!(turn = cache.turn, "weather cache hit");
                return Some(cache.clone());
            }
        }
        let request = WeatherRequest::new(at, seed)
            .with_climate(system.climate)
            .with_previous(system.cache.as_ref())
            .at_turn(record.turn());
        Some(compute_weather(&request))
    }

    fn current_location(&self, record: &WorldRecord) -> Option<LocationSummary> {
        let id = &record.player.location;
        let loc = record.location(id)?;
        Some(LocationSummary {
            id: id.clone(),
            name: loc.name.clone(),
            terrain: loc.terrain.clone(),
            exits: loc.exits.iter().map(|(d, t)| (d.clone(), t.clone())).collect(),
        })
    }

    /// Positioned locations within the radius, nearest first.
    fn nearby_locations(&self, record: &WorldRecord) -> Vec<NearbyLocation> {
        let here = record.player.pos;
        let radius = self.config.telemetry.nearby_radius_m;
        let mut nearby: Vec<NearbyLocation> = record
            .locations
            .iter()
            .filter(|(id, _)| **id != record.player.location)
            .filter_map(|(id, loc)| {
                let coords = loc.coords?;
                let distance_m = here.distance_to(coords);
                (distance_m <= radius).then(|| NearbyLocation {
                    id: id.clone(),
                    name: loc.name.clone(),
                    distance_m: (distance_m * 10.0).round() / 10.0,
                    bearing: here.compass_to(coords).to_string(),
                })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m).then_with(|| a.id.cmp(&b.id)));
        nearby
    }
}

/// Telemetry under the default configuration.
pub fn build_turn_telemetry(record: &WorldRecord) -> TurnTelemetry {
    build_turn_telemetry_with(record, &WorldConfig::default())
}

pub fn build_turn_telemetry_with(record: &WorldRecord, config: &WorldConfig) -> TurnTelemetry {
    TelemetryAssembler::new(config).assemble(record)
}
