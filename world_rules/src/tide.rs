//! Tide - a pure sinusoid over elapsed minutes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::TAU;

use crate::world_state::{TideAccess, WorldRecord};

/// Two tides a day.
pub const DEFAULT_CYCLE_MINUTES: u32 = 720;

const LOW_THRESHOLD: f64 = 0.25;
const HIGH_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TidePhase {
    Low,
    Rising,
    High,
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TideState {
    pub phase: TidePhase,
    /// Water level in `[0, 1]`.
    pub level: f64,
    pub minutes_until_change: u32,
}

/// Tide state `elapsed_minutes` into the simulation.
///
/// A zero cycle length falls back to the default cycle.
pub fn calculate_tide_state(elapsed_minutes: i64, cycle_minutes: u32) -> TideState {
    let cycle = if cycle_minutes == 0 {
        DEFAULT_CYCLE_MINUTES
    } else {
        cycle_minutes
    };
    let cycle_f = f64::from(cycle);
    let t = elapsed_minutes.rem_euclid(i64::from(cycle)) as f64 / cycle_f;

    let angle = TAU * t;
    let level = 0.5 + 0.5 * angle.sin();
    let phase = if level < LOW_THRESHOLD {
        TidePhase::Low
    } else if level > HIGH_THRESHOLD {
        TidePhase::High
    } else if angle.cos() > 0.0 {
        TidePhase::Rising
    } else {
        TidePhase::Falling
    };

    // Remaining time to the end of the current quarter-cycle.
    let quarter = (t * 4.0).floor() + 1.0;
    let remaining = (quarter / 4.0 - t) * cycle_f;
    let minutes_until_change = (remaining.ceil() as u32).max(1);

    TideState {
        phase,
        level,
        minutes_until_change,
    }
}

/// Locations the tide currently cuts off, by their `tideAccess` metadata.
pub fn tide_blocked_locations(record: &WorldRecord, tide: &TideState) -> BTreeSet<String> {
    record
        .locations
        .iter()
        .filter(|(_, loc)| match loc.tide_access {
            TideAccess::Always => false,
            TideAccess::LowTideOnly => tide.phase != TidePhase::Low,
            TideAccess::BlockedAtHigh => tide.phase == TidePhase::High,
        })
        .map(|(id, _)| id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_state::LocationRecord;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_tide_at_quarter_points() {
        let start = calculate_tide_state(0, DEFAULT_CYCLE_MINUTES);
        assert!((start.level - 0.5).abs() < EPS);
        assert_eq!(start.phase, TidePhase::Rising);
        assert_eq!(start.minutes_until_change, 180);

        let high = calculate_tide_state(180, DEFAULT_CYCLE_MINUTES);
        assert!((high.level - 1.0).abs() < EPS);
        assert_eq!(high.phase, TidePhase::High);

        let low = calculate_tide_state(540, DEFAULT_CYCLE_MINUTES);
        assert!(low.level.abs() < EPS);
        assert_eq!(low.phase, TidePhase::Low);

        let falling = calculate_tide_state(360, DEFAULT_CYCLE_MINUTES);
        assert_eq!(falling.phase, TidePhase::Falling);
    }

    #[test]
    fn test_negative_and_zero_cycle() {
        assert_eq!(
            calculate_tide_state(-540, DEFAULT_CYCLE_MINUTES),
            calculate_tide_state(180, DEFAULT_CYCLE_MINUTES)
        );
        assert_eq!(calculate_tide_state(180, 0), calculate_tide_state(180, DEFAULT_CYCLE_MINUTES));
    }

    #[test]
    fn test_blocked_locations() {
        let mut record = WorldRecord::new("seed");
        for (id, access) in [
            ("beach", TideAccess::Always),
            ("causeway", TideAccess::LowTideOnly),
            ("cove", TideAccess::BlockedAtHigh),
        ] {
            record.add_location(
                id,
                LocationRecord {
                    tide_access: access,
                    ..Default::default()
                },
            );
        }

        let high = calculate_tide_state(180, DEFAULT_CYCLE_MINUTES);
        let blocked: Vec<_> = tide_blocked_locations(&record, &high).into_iter().collect();
        assert_eq!(blocked, vec!["causeway".to_string(), "cove".to_string()]);

        let low = calculate_tide_state(540, DEFAULT_CYCLE_MINUTES);
        assert!(tide_blocked_locations(&record, &low).is_empty());
    }

    proptest! {
        #[test]
        fn prop_tide_is_periodic(elapsed in -100_000i64..100_000, cycle in 1u32..5_000) {
            let a = calculate_tide_state(elapsed, cycle);
            let b = calculate_tide_state(elapsed + i64::from(cycle), cycle);
            prop_assert_eq!(a, b);
            prop_assert!((0.0..=1.0).contains(&a.level));
            prop_assert!(a.minutes_until_change >= 1);
        }
    }
}
