//! # World Rules
//!
//! The deterministic world substrate: the world record, the entity/relation
//! graph derived from it, the patch engine that is the only way to change the
//! record, and the time, tide and weather derivations computed from it.
//! Given the same record, every derivation here returns the same answer.
//! This crate knows nothing about narration.

pub mod config;
pub mod entities;
pub mod error;
pub mod graph;
pub mod patch;
pub mod tide;
pub mod time;
pub mod weather;
pub mod world_state;

pub use config::WorldConfig;
pub use entities::*;
pub use error::{Result, WorldError};
pub use graph::{OnConflict, RelationFilter, WorldGraph};
pub use patch::{apply_patches, Patch, PatchOp};
pub use tide::{calculate_tide_state, tide_blocked_locations, TidePhase, TideState};
pub use time::{derive_absolute_time, ensure_time_anchor, RichTime, TimeOfDay, TimeState};
pub use weather::{
    compute_weather, interpret_local_weather, ClimateZone, LocalWeatherEffects, LocationWeatherMeta,
    WeatherRequest, WeatherSnapshot, WeatherType,
};
pub use world_state::*;
