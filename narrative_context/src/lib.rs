//! # Narrative Context
//!
//! The read side of the world substrate. Everything the narrative layer sees
//! or is held to each turn is derived here from a `world_rules` record.
//!
//! ## Core Components
//!
//! - **telemetry**: Per-turn bundle of time, tide, weather, place and ledger tail
//! - **constraints**: Travel budget, blocked locations and soft patch validation
//! - **knowledge**: What the player knows, projected from the world graph
//! - **session**: The authoritative record, its graph and speculative shadow turns
//!
//! ## Design Philosophy
//!
//! - **Derived, not stored**: Telemetry and knowledge are recomputed from the record
//! - **Soft limits**: Constraint checks report violations; they never reject patches
//! - **Deterministic**: Same record and seed, same telemetry

pub mod constraints;
pub mod error;
pub mod knowledge;
pub mod session;
pub mod telemetry;

pub use constraints::{
    build_turn_constraints, build_turn_constraints_with, global_weather_multiplier,
    validate_patches_against_constraints, TurnConstraints,
};
pub use error::{ContextError, Result};
pub use knowledge::{project_knowledge, KnowledgeSummary, KnownActor, KnownItem, KnownPlace};
pub use session::{Session, ShadowTurn};
pub use telemetry::*;
