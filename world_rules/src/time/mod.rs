//! World time - elapsed minutes, turn-scoped time patches and the calendar.
//!
//! `TimeState::elapsed_minutes` is the source of truth. Everything else,
//! including the Gregorian calendar when an anchor timestamp exists, is
//! derived from it.

mod calendar;

pub use calendar::*;

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::patch::Patch;
use crate::world_state::{Extra, Meta};

pub const MINUTES_PER_DAY: i64 = 24 * 60;
pub const DEFAULT_START_HOUR: u32 = 8;

/// A time adjustment that takes effect from a given turn on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePatch {
    pub turn: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_minutes: Option<i64>,
    /// RFC 3339 timestamp the clock jumps to. Needs an anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_absolute: Option<String>,
}

/// Persistent time state, stored at `systems.time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeState {
    #[serde(default)]
    pub elapsed_minutes: i64,
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    /// RFC 3339 timestamp that elapsed minute zero corresponds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<TimePatch>,
    #[serde(flatten)]
    pub extra: Extra,
}

fn default_start_hour() -> u32 {
    DEFAULT_START_HOUR
}

impl Default for TimeState {
    fn default() -> Self {
        Self {
            elapsed_minutes: 0,
            start_hour: DEFAULT_START_HOUR,
            anchor: None,
            patches: Vec::new(),
            extra: Extra::new(),
        }
    }
}

impl TimeState {
    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn anchor_time(&self) -> Option<DateTime<Utc>> {
        self.anchor.as_deref().and_then(parse_timestamp)
    }

    /// The patch that advances the canonical clock by `minutes`.
    pub fn advance_patch(&self, minutes: i64) -> Patch {
        let elapsed = self.elapsed_minutes.saturating_add(minutes).max(0);
        Patch::set("/systems/time/elapsedMinutes", elapsed)
            .with_note(format!("{minutes} minutes pass"))
    }
}

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// Derived time for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTime {
    /// Elapsed minutes after applying time patches.
    pub elapsed_minutes: i64,
    /// One-based day count since minute zero.
    pub day: i64,
    pub hour: u32,
    pub minute: u32,
    pub time_of_day: TimeOfDay,
    /// Present only when the state carries an anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<CalendarDate>,
}

impl RichTime {
    pub fn is_night(&self) -> bool {
        self.time_of_day == TimeOfDay::Night
    }

    /// Absolute timestamp, when anchored.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.calendar.as_ref().and_then(|c| parse_timestamp(&c.iso))
    }
}

/// Parse an RFC 3339 timestamp, also accepting one without an offset as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Elapsed minutes after folding in the patches visible at `current_turn`.
pub fn effective_elapsed(state: &TimeState, current_turn: u64) -> i64 {
    let anchor = state.anchor_time();
    let mut patches: Vec<&TimePatch> = state
        .patches
        .iter()
        .filter(|p| p.turn <= current_turn)
        .collect();
    patches.sort_by_key(|p| p.turn);

    let mut elapsed = state.elapsed_minutes;
    for patch in patches {
        if let Some(target) = &patch.set_absolute {
            match (anchor, parse_timestamp(target)) {
                (Some(anchor), Some(target)) => elapsed = (target - anchor).num_minutes(),
                _ => debug!(turn = patch.turn, target = %target, "ignoring absolute time patch"),
            }
        }
        if let Some(delta) = patch.delta_minutes {
            elapsed = elapsed.saturating_add(delta);
        }
    }
    elapsed.max(0)
}

/// Derive hour, day, bucket and (when anchored) the calendar for a turn.
///
/// An anchored clock pushed past the calendar's range falls back to the
/// unanchored fields.
pub fn derive_absolute_time(state: &TimeState, current_turn: u64) -> RichTime {
    let elapsed = effective_elapsed(state, current_turn);

    let anchored = state.anchor_time().and_then(|anchor| {
        Duration::try_minutes(elapsed).and_then(|offset| anchor.checked_add_signed(offset))
    });
    match anchored {
        Some(now) => RichTime {
            elapsed_minutes: elapsed,
            day: elapsed / MINUTES_PER_DAY + 1,
            hour: now.hour(),
            minute: now.minute(),
            time_of_day: TimeOfDay::from_hour(now.hour()),
            calendar: Some(CalendarDate::from_datetime(now)),
        },
        None => {
            if state.anchor.is_some() {
                debug!(elapsed, "anchored time unavailable");
            }
            let total = (i64::from(state.start_hour) * 60).saturating_add(elapsed);
            let hour = ((total / 60) % 24) as u32;
            RichTime {
                elapsed_minutes: elapsed,
                day: total / MINUTES_PER_DAY + 1,
                hour,
                minute: (total % 60) as u32,
                time_of_day: TimeOfDay::from_hour(hour),
                calendar: None,
            }
        }
    }
}

/// Return a state that certainly has an anchor.
///
/// A missing or unparseable anchor is replaced by the session start
/// (`meta.startedAt`) or, failing that, by `now`'s date at the configured
/// start hour.
pub fn ensure_time_anchor(state: &TimeState, meta: &Meta, now: DateTime<Utc>) -> TimeState {
    if state.anchor_time().is_some() {
        return state.clone();
    }
    let anchor = meta
        .started_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(|| {
            let start = NaiveTime::from_hms_opt(state.start_hour % 24, 0, 0).unwrap_or_default();
            now.date_naive().and_time(start).and_utc()
        });
    debug!(anchor = %anchor, "synthesised time anchor");
    state.clone().with_anchor(format_timestamp(anchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_buckets() {
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(16), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Night);
    }

    #[test]
    fn test_unanchored_cycle_fields() {
        let state = TimeState {
            elapsed_minutes: 17 * 60 + 30,
            ..TimeState::default()
        };
        let time = derive_absolute_time(&state, 0);

        // 08:00 start + 17h30 = 01:30 on day two.
        assert_eq!(time.hour, 1);
        assert_eq!(time.minute, 30);
        assert_eq!(time.day, 2);
        assert_eq!(time.time_of_day, TimeOfDay::Night);
        assert!(time.calendar.is_none());
    }

    #[test]
    fn test_patches_filtered_by_turn() {
        let state = TimeState {
            elapsed_minutes: 60,
            patches: vec![
                TimePatch {
                    turn: 5,
                    delta_minutes: Some(120),
                    set_absolute: None,
                },
                TimePatch {
                    turn: 2,
                    delta_minutes: Some(30),
                    set_absolute: None,
                },
            ],
            ..TimeState::default()
        };
        assert_eq!(effective_elapsed(&state, 1), 60);
        assert_eq!(effective_elapsed(&state, 2), 90);
        assert_eq!(effective_elapsed(&state, 9), 210);
    }

    #[test]
    fn test_negative_delta_floors_at_zero() {
        let state = TimeState {
            elapsed_minutes: 10,
            patches: vec![TimePatch {
                turn: 0,
                delta_minutes: Some(-500),
                set_absolute: None,
            }],
            ..TimeState::default()
        };
        assert_eq!(effective_elapsed(&state, 0), 0);
    }

    #[test]
    fn test_set_absolute_needs_anchor() {
        let jump = TimePatch {
            turn: 1,
            delta_minutes: None,
            set_absolute: Some("1825-05-15T06:00:00Z".into()),
        };
        let unanchored = TimeState {
            elapsed_minutes: 15,
            patches: vec![jump.clone()],
            ..TimeState::default()
        };
        assert_eq!(effective_elapsed(&unanchored, 1), 15);

        let anchored = unanchored.with_anchor("1825-05-14T06:00:00Z");
        assert_eq!(effective_elapsed(&anchored, 0), 15);
        assert_eq!(effective_elapsed(&anchored, 1), MINUTES_PER_DAY);
    }

    #[test]
    fn test_anchored_calendar() {
        let state = TimeState {
            elapsed_minutes: 8 * 60,
            ..TimeState::default()
        }
        .with_anchor("1825-05-14T06:00:00Z");
        let time = derive_absolute_time(&state, 0);

        assert_eq!(time.hour, 14);
        assert_eq!(time.time_of_day, TimeOfDay::Afternoon);
        assert_eq!(time.day, 1);
        let calendar = time.calendar.as_ref().unwrap();
        assert_eq!(calendar.iso, "1825-05-14T14:00:00Z");
        assert_eq!(calendar.month_name, "May");
        assert_eq!(calendar.weekday, "Saturday");
        assert_eq!(time.timestamp(), parse_timestamp("1825-05-14T14:00:00Z"));
    }

    #[test]
    fn test_ensure_anchor_prefers_session_start() {
        let state = TimeState::default();
        let meta = Meta {
            started_at: Some("1825-05-14T06:00:00Z".into()),
            ..Meta::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 23, 15, 0).unwrap();

        let anchored = ensure_time_anchor(&state, &meta, now);
        assert_eq!(anchored.anchor.as_deref(), Some("1825-05-14T06:00:00Z"));

        let from_clock = ensure_time_anchor(&state, &Meta::default(), now);
        assert_eq!(from_clock.anchor.as_deref(), Some("2026-01-02T08:00:00Z"));

        let kept = ensure_time_anchor(&anchored, &Meta::default(), now);
        assert_eq!(kept.anchor, anchored.anchor);
    }

    #[test]
    fn test_advance_patch() {
        let state = TimeState {
            elapsed_minutes: 90,
            ..TimeState::default()
        };
        let patch = state.advance_patch(45);
        assert_eq!(patch.path, "/systems/time/elapsedMinutes");
        assert_eq!(patch.value, serde_json::json!(135));
    }

    #[test]
    fn test_huge_elapsed_degrades() {
        let state = TimeState {
            elapsed_minutes: 1_000_000_000_000_000,
            patches: vec![TimePatch {
                turn: 0,
                delta_minutes: Some(i64::MAX),
                set_absolute: None,
            }],
            ..TimeState::default()
        }
        .with_anchor("1825-05-14T06:00:00Z");

        let time = derive_absolute_time(&state, 0);
        assert_eq!(time.elapsed_minutes, i64::MAX);
        assert!(time.calendar.is_none());
        assert!(time.timestamp().is_none());
        assert!(time.hour < 24);

        let far = TimeState {
            elapsed_minutes: 1_000_000_000_000_000,
            ..TimeState::default()
        }
        .with_anchor("1825-05-14T06:00:00Z");
        let time = derive_absolute_time(&far, 0);
        assert_eq!(time.day, 1_000_000_000_000_000 / MINUTES_PER_DAY + 1);
        assert!(time.calendar.is_none());

        assert_eq!(far.advance_patch(i64::MAX).value, serde_json::json!(i64::MAX));
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let parsed = parse_timestamp("1825-05-14T14:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(1825, 5, 14, 14, 0, 0).unwrap());
        assert!(parse_timestamp("tomorrow").is_none());
    }
}
