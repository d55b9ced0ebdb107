//! Per-turn travel limits and soft validation of proposed patches.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use world_rules::config::ConstraintConfig;
use world_rules::{Patch, PatchOp, Position, WeatherType, WorldConfig, WorldRecord};

use crate::telemetry::TurnTelemetry;

const FLOOD_SIGNALS: [&str; 2] = ["flood_risk:extreme", "access:unsafe"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnConstraints {
    pub max_move_meters: f64,
    pub weather_multiplier: f64,
    pub tolerance_meters: f64,
    pub blocked_locations: BTreeSet<String>,
    /// Short machine tags explaining the limits above.
    pub advisories: Vec<String>,
}

impl TurnConstraints {
    pub fn is_blocked(&self, location: &str) -> bool {
        self.blocked_locations.contains(location)
    }
}

/// Travel multiplier when no location-specific effects are known.
pub fn global_weather_multiplier(kind: WeatherType) -> f64 {
    match kind {
        WeatherType::Clear => 1.0,
        WeatherType::Fog => 0.85,
        WeatherType::Rain => 0.8,
        WeatherType::Snow => 0.65,
        WeatherType::Storm => 0.55,
    }
}

pub fn build_turn_constraints(record: &WorldRecord, telemetry: &TurnTelemetry) -> TurnConstraints {
    build_turn_constraints_with(record, telemetry, &WorldConfig::default())
}

pub fn build_turn_constraints_with(
    record: &WorldRecord,
    telemetry: &TurnTelemetry,
    config: &WorldConfig,
) -> TurnConstraints {
    let limits: &ConstraintConfig = &config.constraints;
    let mut advisories = Vec::new();

    let weather_multiplier = match (&telemetry.local_weather, &telemetry.weather) {
        (Some(local), _) => local.travel_multiplier,
        (None, Some(global)) => global_weather_multiplier(global.kind),
        (None, None) => 1.0,
    };
    if weather_multiplier < 1.0 {
        let cause = telemetry.weather.as_ref().map_or("weather", |w| w.kind.as_str());
        advisories.push(format!("travel_reduced:{cause}"));
    }
    let max_move_meters = (limits.base_move_m * weather_multiplier).round().max(limits.min_move_m);

    let mut blocked_locations = BTreeSet::new();
    if let Some(tide) = &telemetry.tide {
        for id in &tide.blocked_locations {
            blocked_locations.insert(id.clone());
            advisories.push(format!("tide_blocked:{id}"));
        }
    }

    let flooding = telemetry
        .local_weather
        .as_ref()
        .is_some_and(|local| FLOOD_SIGNALS.iter().any(|s| local.has_signal(s)));
    if flooding {
        for id in record.locations.keys() {
            let flood_prone = config
                .location_meta(record, id)
                .is_some_and(|meta| meta.is_flood_prone());
            if flood_prone && blocked_locations.insert(id.clone()) {
                advisories.push(format!("flood_blocked:{id}"));
            }
        }
    }

    debug!(
        turn = telemetry.turn,
        max_move_meters,
        blocked = blocked_locations.len(),
        "turn constraints built"
    );
    TurnConstraints {
        max_move_meters,
        weather_multiplier,
        tolerance_meters: limits.tolerance_m,
        blocked_locations,
        advisories,
    }
}

/// Check proposed patches against the turn's limits.
///
/// Returns one violation string per offending patch; an empty list means the
/// batch is acceptable. Position changes accumulate across the batch and are
/// measured from the player's current position.
pub fn validate_patches_against_constraints(
    record: &WorldRecord,
    patches: &[Patch],
    constraints: &TurnConstraints,
) -> Vec<String> {
    let origin = record.player.pos;
    let limit = constraints.max_move_meters + constraints.tolerance_meters;
    let mut proposed = origin;
    let mut violations = Vec::new();

    for patch in patches {
        let change = player_change(patch, proposed);

        if let Some(pos) = change.position {
            proposed = pos;
            let distance = origin.distance_to(pos);
            if distance > limit {
                violations.push(format!(
                    "distance_exceeded: {} moves {:.1}m, limit {:.0}m",
                    patch.path, distance, constraints.max_move_meters
                ));
            }
        }
        if let Some(location) = change.location {
            if constraints.is_blocked(&location) {
                violations.push(format!("blocked_location: {} targets {location}", patch.path));
            }
        }
    }
    violations
}

#[derive(Debug, Default)]
struct PlayerChange {
    position: Option<Position>,
    location: Option<String>,
}

/// What a patch would do to the player's position and location.
fn player_change(patch: &Patch, current: Position) -> PlayerChange {
    let value = &patch.value;
    match patch.path.as_str() {
        "/player/pos" => PlayerChange {
            position: position_from(value, current, patch.op),
            location: None,
        },
        "/player/pos/x" => PlayerChange {
            position: value.as_f64().map(|x| Position::new(x, current.y)),
            location: None,
        },
        "/player/pos/y" => PlayerChange {
            position: value.as_f64().map(|y| Position::new(current.x, y)),
            location: None,
        },
        "/player/location" => PlayerChange {
            position: None,
            location: value.as_str().map(String::from),
        },
        "/player" => PlayerChange {
            // Both `set` and `merge` replace the whole `pos` field here.
            position: value.get("pos").and_then(|pos| position_from(pos, current, PatchOp::Set)),
            location: value.get("location").and_then(Value::as_str).map(String::from),
        },
        _ => PlayerChange::default(),
    }
}

fn position_from(value: &Value, current: Position, op: PatchOp) -> Option<Position> {
    let x = value.get("x").and_then(Value::as_f64);
    let y = value.get("y").and_then(Value::as_f64);
    match op {
        PatchOp::Set => Some(Position::new(x?, y?)),
        PatchOp::Merge if x.is_some() || y.is_some() => {
            Some(Position::new(x.unwrap_or(current.x), y.unwrap_or(current.y)))
        }
        PatchOp::Merge => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryAssembler;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use world_rules::{
        weather::{Drainage, Elevation},
        ClimateZone, LocationRecord, LocationWeatherMeta, TideAccess, WeatherSystem,
    };

    fn record() -> WorldRecord {
        let mut record = WorldRecord::new("constraint-seed");
        record.meta.started_at = Some("1825-05-14T06:00:00Z".into());
        record.systems.time.elapsed_minutes = 180;
        for (id, access) in [("square", TideAccess::Always), ("islet", TideAccess::LowTideOnly)] {
            record.add_location(
                id,
                LocationRecord {
                    tide_access: access,
                    ..Default::default()
                },
            );
        }
        record.player.location = "square".into();
        record
    }

    fn telemetry(record: &WorldRecord, config: &WorldConfig) -> TurnTelemetry {
        TelemetryAssembler::new(config).assemble_at(record, Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_clear_budget_without_weather() {
        let record = record();
        let constraints = build_turn_constraints(&record, &telemetry(&record, &WorldConfig::default()));

        assert_eq!(constraints.weather_multiplier, 1.0);
        assert_eq!(constraints.max_move_meters, 600.0);
        // Elapsed 180 is high water.
        assert!(constraints.is_blocked("islet"));
        assert_eq!(constraints.advisories, vec!["tide_blocked:islet"]);
    }

    #[test]
    fn test_budget_follows_local_multiplier() {
        let mut record = record();
        record.systems.weather = Some(WeatherSystem {
            seed: None,
            climate: ClimateZone::Temperate,
            cache: None,
        });
        let mut tele = telemetry(&record, &WorldConfig::default());
        let local = tele.local_weather.as_mut().unwrap();
        local.travel_multiplier = 0.3;

        let constraints = build_turn_constraints(&record, &tele);
        assert_eq!(constraints.weather_multiplier, 0.3);
        assert_eq!(constraints.max_move_meters, 180.0);

        tele.local_weather = None;
        let kind = tele.weather.as_ref().unwrap().kind;
        let constraints = build_turn_constraints(&record, &tele);
        assert_eq!(constraints.weather_multiplier, global_weather_multiplier(kind));
    }

    #[test]
    fn test_minimum_budget() {
        let record = record();
        let mut tele = telemetry(&record, &WorldConfig::default());
        tele.local_weather = None;
        let mut config = WorldConfig::default();
        config.constraints.base_move_m = 200.0;

        let mut constraints = build_turn_constraints_with(&record, &tele, &config);
        assert_eq!(constraints.max_move_meters, 200.0);

        config.constraints.base_move_m = 100.0;
        constraints = build_turn_constraints_with(&record, &tele, &config);
        assert_eq!(constraints.max_move_meters, 150.0);
    }

    #[test]
    fn test_flood_blocks_prone_locations() {
        let mut record = record();
        record.systems.weather = Some(WeatherSystem::default());
        let prone = LocationWeatherMeta {
            elevation: Elevation::Low,
            drainage: Drainage::Poor,
            near_ocean: true,
            ..Default::default()
        };
        record.add_location(
            "saltmarsh",
            LocationRecord {
                weather: Some(prone),
                ..Default::default()
            },
        );

        let mut tele = telemetry(&record, &WorldConfig::default());
        let local = tele.local_weather.as_mut().unwrap();
        local.local_signals = vec!["flood_risk:extreme".into(), "access:unsafe".into()];

        let constraints = build_turn_constraints(&record, &tele);
        assert!(constraints.is_blocked("saltmarsh"));
        assert!(!constraints.is_blocked("square"));
        assert!(constraints.advisories.contains(&"flood_blocked:saltmarsh".to_string()));
    }

    fn budget(max: f64) -> TurnConstraints {
        TurnConstraints {
            max_move_meters: max,
            weather_multiplier: 1.0,
            tolerance_meters: 5.0,
            blocked_locations: BTreeSet::from(["islet".to_string()]),
            advisories: Vec::new(),
        }
    }

    #[test]
    fn test_distance_boundary() {
        let record = record();
        let constraints = budget(420.0);

        let exact = [Patch::set("/player/pos", json!({ "x": 420.0, "y": 0.0 }))];
        assert!(validate_patches_against_constraints(&record, &exact, &constraints).is_empty());

        let within_tolerance = [Patch::set("/player/pos", json!({ "x": 425.0, "y": 0.0 }))];
        assert!(validate_patches_against_constraints(&record, &within_tolerance, &constraints).is_empty());

        let over = [Patch::set("/player/pos", json!({ "x": 426.0, "y": 0.0 }))];
        let violations = validate_patches_against_constraints(&record, &over, &constraints);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].starts_with("distance_exceeded"));
    }

    #[test]
    fn test_component_patches_accumulate() {
        let record = record();
        let constraints = budget(500.0);
        let patches = [Patch::set("/player/pos/x", 400.0), Patch::set("/player/pos/y", 400.0)];

        let violations = validate_patches_against_constraints(&record, &patches, &constraints);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("/player/pos/y"));

        let merged = [Patch::merge("/player/pos", json!({ "y": 300.0 }))];
        assert!(validate_patches_against_constraints(&record, &merged, &constraints).is_empty());
    }

    #[test]
    fn test_blocked_location_patches() {
        let record = record();
        let constraints = budget(600.0);
        let patches = [
            Patch::set("/player/location", "islet"),
            Patch::merge("/player", json!({ "location": "islet", "pos": { "x": 10.0, "y": 10.0 } })),
            Patch::set("/player/location", "square"),
            Patch::set("/ledger/-", "islet"),
        ];
        let violations = validate_patches_against_constraints(&record, &patches, &constraints);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.starts_with("blocked_location")));
    }

    proptest::proptest! {
        #[test]
        fn test_moves_within_budget_pass(angle in 0.0f64..std::f64::consts::TAU, frac in 0.0f64..=1.0) {
            let record = record();
            let constraints = budget(420.0);
            let reach = 420.0 * frac;
            let target = json!({ "x": reach * angle.cos(), "y": reach * angle.sin() });
            let patches = [Patch::set("/player/pos", target)];
            proptest::prop_assert!(validate_patches_against_constraints(&record, &patches, &constraints).is_empty());
        }

        #[test]
        fn test_moves_past_tolerance_fail(angle in 0.0f64..std::f64::consts::TAU, extra in 5.5f64..5000.0) {
            let record = record();
            let constraints = budget(420.0);
            let reach = 420.0 + extra;
            let target = json!({ "x": reach * angle.cos(), "y": reach * angle.sin() });
            let patches = [Patch::set("/player/pos", target)];
            proptest::prop_assert_eq!(validate_patches_against_constraints(&record, &patches, &constraints).len(), 1);
        }
    }
}
