//! Immutable configuration tables, loaded from TOML.
//!
//! ```toml
//! [telemetry]
//! ledger_tail = 8
//! nearby_radius_m = 1500.0
//!
//! [constraints]
//! base_move_m = 600.0
//!
//! [[predicates]]
//! name = "guards"
//! subject_kinds = ["actor"]
//!
//! [locations.lighthouse]
//! elevation = "high"
//! windExposure = "high"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::entities::{PredicateRegistry, PredicateSpec};
use crate::error::{Result, WorldError};
use crate::graph::DEFAULT_LAYOUT_STEP;
use crate::weather::LocationWeatherMeta;
use crate::world_state::WorldRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Ledger lines included in each telemetry snapshot.
    pub ledger_tail: usize,
    pub nearby_radius_m: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            ledger_tail: 8,
            nearby_radius_m: 1500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintConfig {
    /// Distance budget per turn in clear weather.
    pub base_move_m: f64,
    pub min_move_m: f64,
    /// Slack allowed past the budget before a move is rejected.
    pub tolerance_m: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            base_move_m: 600.0,
            min_move_m: 150.0,
            tolerance_m: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub step_m: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            step_m: DEFAULT_LAYOUT_STEP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorldConfig {
    pub telemetry: TelemetryConfig,
    pub constraints: ConstraintConfig,
    pub layout: LayoutConfig,
    /// Replaces the standard predicate table when non-empty.
    pub predicates: Vec<PredicateSpec>,
    /// Per-location overrides of the record's authored weather metadata.
    pub locations: BTreeMap<String, LocationWeatherMeta>,
}

impl WorldConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: WorldConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), predicates = config.predicates.len(), "world config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |field: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(WorldError::InvalidConfig {
                    field,
                    reason: format!("expected a positive number, got {value}"),
                })
            }
        };
        positive("telemetry.nearby_radius_m", self.telemetry.nearby_radius_m)?;
        positive("constraints.base_move_m", self.constraints.base_move_m)?;
        positive("constraints.min_move_m", self.constraints.min_move_m)?;
        positive("layout.step_m", self.layout.step_m)?;
        if !(self.constraints.tolerance_m.is_finite() && self.constraints.tolerance_m >= 0.0) {
            return Err(WorldError::InvalidConfig {
                field: "constraints.tolerance_m",
                reason: format!("expected a non-negative number, got {}", self.constraints.tolerance_m),
            });
        }
        if self.constraints.min_move_m > self.constraints.base_move_m {
            return Err(WorldError::InvalidConfig {
                field: "constraints.min_move_m",
                reason: "must not exceed base_move_m".to_string(),
            });
        }
        Ok(())
    }

    /// The predicate table sessions should build their graphs with.
    pub fn registry(&self) -> PredicateRegistry {
        if self.predicates.is_empty() {
            PredicateRegistry::standard()
        } else {
            PredicateRegistry::from_specs(self.predicates.iter().cloned())
        }
    }

    /// Weather metadata for a location: the config override, else the record's.
    pub fn location_meta(&self, record: &WorldRecord, id: &str) -> Option<LocationWeatherMeta> {
        self.locations
            .get(id)
            .copied()
            .or_else(|| record.location(id).and_then(|loc| loc.weather))
    }
}
